//! Relay configuration from YAML

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::Result;

/// Host the JSON document is fetched from
pub const DEFAULT_HOST: &str = "jsonplaceholder.typicode.com";

/// Request path on the default host
pub const DEFAULT_PATH: &str = "/todos";

/// Top-level relay configuration
///
/// Every path used by a run is derived from this struct, so no step relies
/// on the process working directory beyond the `output_dir` default of `.`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Remote host serving the JSON document
    #[serde(default = "default_host")]
    pub host: String,

    /// Request path, starting with `/`
    #[serde(default = "default_path")]
    pub path: String,

    /// Directory all produced files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File name of the converted XML document
    #[serde(default = "default_xml_file")]
    pub xml_file: String,

    /// File name of the verbatim JSON copy
    #[serde(default = "default_json_file")]
    pub json_file: String,

    /// File name of the ZIP archive
    #[serde(default = "default_archive_file")]
    pub archive_file: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_xml_file() -> String {
    "data.xml".to_string()
}

fn default_json_file() -> String {
    "data.json".to_string()
}

fn default_archive_file() -> String {
    "compressed.zip".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            path: default_path(),
            output_dir: default_output_dir(),
            xml_file: default_xml_file(),
            json_file: default_json_file(),
            archive_file: default_archive_file(),
        }
    }
}

impl RelayConfig {
    /// Load relay configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse relay configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: RelayConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the relay configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("Host must not be empty");
        }
        if !self.path.starts_with('/') {
            anyhow::bail!("Request path '{}' must start with '/'", self.path);
        }

        // The archive stores entries by base name, so they have to be plain names
        let files = [
            ("xml_file", &self.xml_file),
            ("json_file", &self.json_file),
            ("archive_file", &self.archive_file),
        ];
        for (field, name) in files {
            if name.is_empty() || name.contains('/') || name.contains('\\') {
                anyhow::bail!("{} '{}' must be a plain file name", field, name);
            }
        }

        if self.xml_file == self.json_file {
            anyhow::bail!(
                "xml_file and json_file must differ (both are '{}')",
                self.xml_file
            );
        }
        if self.archive_file == self.xml_file || self.archive_file == self.json_file {
            anyhow::bail!(
                "archive_file '{}' collides with one of its inputs",
                self.archive_file
            );
        }

        Ok(())
    }

    /// Builder-style override of the output directory
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// URL the fetcher requests
    pub fn url(&self) -> String {
        format!("https://{}{}", self.host, self.path)
    }

    /// Path of the XML sink
    pub fn xml_path(&self) -> PathBuf {
        self.output_dir.join(&self.xml_file)
    }

    /// Path of the verbatim JSON copy
    pub fn json_path(&self) -> PathBuf {
        self.output_dir.join(&self.json_file)
    }

    /// Path of the archive
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(&self.archive_file)
    }
}
