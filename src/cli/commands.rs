//! CLI command definitions

use crate::core::RelayConfig;
use clap::Args;
use std::path::PathBuf;

/// Run the whole chain: fetch, convert, persist, archive
#[derive(Debug, Args, Clone, Default, PartialEq, Eq)]
pub struct RunCommand {
    /// Directory the produced files are written to
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Override the remote host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the request path
    #[arg(long)]
    pub path: Option<String>,

    /// Print the final run state as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunCommand {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply(&self, mut config: RelayConfig) -> RelayConfig {
        if let Some(dir) = &self.output_dir {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(path) = &self.path {
            config.path = path.clone();
        }
        config
    }
}

/// Convert a local JSON file to XML
#[derive(Debug, Args, Clone)]
pub struct ConvertCommand {
    /// Path to the JSON input file
    #[arg(short, long)]
    pub input: String,

    /// Path of the XML file to write
    #[arg(short, long, default_value = "data.xml")]
    pub output: String,
}
