//! Command-line interface for service-engine.
//!
//! Provides commands for pulling images and creating, starting, stopping,
//! removing and listing containers.

mod commands;

pub use commands::{execute, parse_cli, run, run_with_cli, Cli, Commands};
