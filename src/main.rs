#[macro_use]
extern crate clap;
use clap::{Arg, ArgMatches};
use colored::*;
use console::style;
use decssa::environment;
use decssa::error::Result;
use decssa::ir::simplify::StatementSimplification;
use decssa::loader;
use decssa::ssa::SSATransformation;
use decssa::util::{DumpToFile, RenderGraph, Transform};
use std::path::Path;
use std::process;

fn main() {
    let arguments = app_from_crate!()
        .arg(
            Arg::with_name("environment_file")
                .short("e")
                .long("env")
                .value_name("FILE")
                .help("Sets environment file to use")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("no_relax")
                .long("no-relax")
                .help("Disables all SSA relaxations (overwrites environment)"),
        )
        .arg(
            Arg::with_name("stack_pointer")
                .long("sp")
                .value_name("NAME")
                .help("Adds a stack pointer register")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name("cfg_file")
                .long("cfg")
                .value_name("FILE")
                .help("Prints CFG into the file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("output_file")
                .short("o")
                .long("output")
                .value_name("FILE")
                .help("Writes the function in SSA form into the file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("debug")
                .short("d")
                .long("debug")
                .help("Enables debug mode"),
        )
        .arg(
            Arg::with_name("input_file")
                .value_name("FILE")
                .help("Input file to be transformed")
                .required(true)
                .index(1),
        )
        .get_matches();

    if let Err(e) = decssa(&arguments) {
        println!("{}", style(e).bold().red());
        process::exit(-1);
    }
}

fn init_logger(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .init();
}

fn build_environment(arguments: &ArgMatches) -> Result<environment::Environment> {
    use environment::*;

    let mut env_builder = EnvironmentBuilder::default();

    if let Some(file_path) = arguments.value_of("environment_file") {
        // Load given environment file
        let env_file = Path::new(file_path);
        if !env_file.is_file() {
            return Err(format!("Environment file '{}' does not exist", file_path).into());
        }
        env_builder.from_file(env_file);
    } else if let Some(input_file) = arguments.value_of("input_file") {
        // Try to find a environment file for the current input
        let env_file = Path::new(input_file).with_extension("yaml");
        if env_file.is_file() {
            println!(
                "Using environment defined in '{}'",
                style(env_file.display()).yellow()
            );
            env_builder.from_file(&env_file);
        }
    }

    if arguments.is_present("no_relax") {
        env_builder.relax(false);
    }

    if let Some(names) = arguments.values_of("stack_pointer") {
        for name in names {
            env_builder.stack_pointer(name);
        }
    }

    if arguments.is_present("debug") {
        env_builder.debug(true);
    }

    env_builder.build()
}

fn decssa(arguments: &ArgMatches) -> Result<()> {
    let input_file = arguments
        .value_of("input_file")
        .ok_or("No input file given")?;

    let env = build_environment(arguments)?;
    init_logger(env.debug);

    if env.debug {
        println!("{}:\n{}\n---", "Environment".bold(), style(&env).cyan());
    }

    println!(
        "{} Loading function '{}'",
        style("[1/3]").bold().dim(),
        input_file.yellow()
    );
    let mut function = loader::load_function(Path::new(input_file))?;
    println!("{}", function);

    if let Some(path) = arguments.value_of("cfg_file") {
        function
            .control_flow_graph()
            .render_to_file(Path::new(path))?;
    }

    let simplification = StatementSimplification::default();
    println!(
        "{} {}",
        style("[2/3]").bold().dim(),
        simplification.description()
    );
    simplification.transform(&mut function)?;

    let ssa = SSATransformation::from_env(&env);
    println!("{} {}", style("[3/3]").bold().dim(), ssa.description());
    let def_use = ssa.construct(&mut function)?;

    println!("{}", function);
    println!("{}", def_use.table(&function));

    if !def_use.diagnostics().is_empty() {
        println!(
            "{}",
            format!("{} diagnostics, see log", def_use.diagnostics().len()).yellow()
        );
    }

    if let Some(path) = arguments.value_of("output_file") {
        function.dump_to_file(Path::new(path))?;
    }

    Ok(())
}
