//! Settings file and command line of the `grpc-broker` binary.

mod cli;
pub use clap::{Parser, Subcommand};
pub use cli::*;

mod settings;
pub use settings::*;
