//! CLI module for iterloop - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
