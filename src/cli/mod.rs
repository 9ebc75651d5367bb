//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ConvertCommand, RunCommand};
use std::ffi::OsString;

/// Fetch a JSON document, convert it to XML and archive both
#[derive(Debug, Parser, Clone)]
#[command(name = "relay")]
#[command(author = "Relay Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Fetches JSON, converts it to XML through a throttled pipeline, archives both", long_about = None)]
pub struct Cli {
    /// Subcommand; runs the whole chain when omitted
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a YAML relay configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Fetch, convert, persist and archive
    Run(RunCommand),

    /// Convert a local JSON file to XML through the same pipeline
    Convert(ConvertCommand),
}

impl Default for Command {
    fn default() -> Self {
        Command::Run(RunCommand::default())
    }
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// The command to execute, defaulting to a full run
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }
}
