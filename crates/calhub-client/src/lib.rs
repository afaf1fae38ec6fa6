//! CLI, configuration and commands
//!
//! This crate provides the `calhub` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
