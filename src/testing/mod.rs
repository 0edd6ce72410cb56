//! Declarative suite files
//!
//! Reads YAML suite files, builds live suites from them and reports the
//! results. Each step becomes a set of assertions against structured
//! response data rather than string matching on output.

mod config;
mod runner;

pub use config::*;
pub use runner::{build_suite, print_report, run_suite, validate_suite, RunOptions};
