//! CLI, configuration loading, daemon runner
//!
//! This crate provides the `onair` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
