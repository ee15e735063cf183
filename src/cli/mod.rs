//! Command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Callboard - phone number administration backend
#[derive(Parser)]
#[command(name = "callboard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a config file (defaults to the usual discovery locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server (the default)
    Serve,

    /// Write a starter config.toml in the working directory
    Init,

    /// Print an Argon2id hash for the given password
    HashPassword {
        password: String,
    },
}
