extern crate falcon;
#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate derive_builder;
#[macro_use]
extern crate derivative;
extern crate serde;
extern crate serde_yaml;

pub mod environment;
pub mod ir;
pub mod loader;
pub mod ssa;
pub mod util;

pub mod error {
    error_chain! {
        types {
            Error, ErrorKind, ResultExt, Result;
        }

        foreign_links {
            Falcon(::falcon::error::Error);
            IOError(::std::io::Error);
            SerdeYAML(::serde_yaml::Error);
        }

        errors {
            MalformedFunction(m: String) {
                description("Malformed function")
                display("Malformed function: {}", m)
            }
            Parse(line: usize, m: String) {
                description("Parse error")
                display("Parse error in line {}: {}", line, m)
            }
        }
    }
}
