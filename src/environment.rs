use crate::error::Result;
use serde::{Deserialize, Serialize};

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RelaxationSettings {
    #[serde(default = "enabled")]
    pub phi: bool,
    #[serde(default = "enabled")]
    pub stack_locations: bool,
    #[serde(default = "enabled")]
    pub dead_code: bool,
    #[serde(default = "enabled")]
    pub copy_propagation: bool,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl Default for RelaxationSettings {
    fn default() -> Self {
        Self {
            phi: true,
            stack_locations: true,
            dead_code: true,
            copy_propagation: true,
            max_rounds: default_max_rounds(),
        }
    }
}

impl RelaxationSettings {
    /// Settings with every relaxation disabled.
    pub fn disabled() -> Self {
        Self {
            phi: false,
            stack_locations: false,
            dead_code: false,
            copy_propagation: false,
            max_rounds: default_max_rounds(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    /// Registers treated as stack pointers by the stack location propagation.
    #[serde(default = "default_stack_pointers")]
    pub stack_pointers: Vec<String>,
}

impl Default for Architecture {
    fn default() -> Self {
        Self {
            stack_pointers: default_stack_pointers(),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub relaxation: RelaxationSettings,
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(default = "disabled")]
    pub debug: bool,
}

impl Environment {
    pub fn from_file(path: &Path) -> Result<Environment> {
        let file = File::open(path)
            .map_err(|_| format!("Environment file '{}' could not be loaded", path.display()))?;
        let reader = BufReader::new(file);
        Ok(serde_yaml::from_reader(reader)?)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yaml = serde_yaml::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", yaml)
    }
}

/// Collects command line overrides on top of an optional environment file.
#[derive(Default)]
pub struct EnvironmentBuilder {
    file: Option<PathBuf>,
    relax: Option<bool>,
    stack_pointers: Vec<String>,
    debug: Option<bool>,
}

impl EnvironmentBuilder {
    pub fn from_file(&mut self, path: &Path) -> &mut Self {
        self.file = Some(path.to_path_buf());
        self
    }

    /// Enables or disables all relaxations.
    pub fn relax(&mut self, relax: bool) -> &mut Self {
        self.relax = Some(relax);
        self
    }

    /// Adds a stack pointer register to the configured ones.
    pub fn stack_pointer(&mut self, name: &str) -> &mut Self {
        self.stack_pointers.push(name.to_owned());
        self
    }

    pub fn debug(&mut self, debug: bool) -> &mut Self {
        self.debug = Some(debug);
        self
    }

    pub fn build(&self) -> Result<Environment> {
        let mut env = match &self.file {
            Some(path) => Environment::from_file(path)?,
            None => Environment::default(),
        };

        if self.relax == Some(false) {
            env.relaxation = RelaxationSettings {
                max_rounds: env.relaxation.max_rounds,
                ..RelaxationSettings::disabled()
            };
        }

        for name in &self.stack_pointers {
            if !env.architecture.stack_pointers.contains(name) {
                env.architecture.stack_pointers.push(name.clone());
            }
        }

        if let Some(debug) = self.debug {
            env.debug = debug;
        }

        Ok(env)
    }
}

fn disabled() -> bool {
    false
}

fn enabled() -> bool {
    true
}

fn default_max_rounds() -> usize {
    16
}

fn default_stack_pointers() -> Vec<String> {
    vec!["sp".to_string(), "esp".to_string(), "rsp".to_string()]
}
