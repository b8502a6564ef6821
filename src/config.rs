//! Gateway configuration
//!
//! Settings come from built-in defaults, an optional YAML file and the
//! command line, in increasing priority. Only the merge happens in
//! `main`; this module owns the file format and validation.

use crate::error::{Error, Result};
use crate::storcli::DecodeMode;
use serde::{Deserialize, Deserializer};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

/// Default storcli binary
pub const DEFAULT_STORCLI_COMMAND: &str = "/opt/MegaRAID/storcli/storcli64";

/// Default REST listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// REST API bind address
    pub listen_addr: SocketAddr,
    /// storcli program followed by fixed leading arguments
    #[serde(deserialize_with = "deserialize_command")]
    pub storcli_command: Vec<String>,
    /// How tolerant the decoder is of non-JSON text
    pub decode_mode: DecodeMode,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            storcli_command: split_command(DEFAULT_STORCLI_COMMAND),
            decode_mode: DecodeMode::Permissive,
        }
    }
}

/// Split a command line on whitespace
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

/// Accept the command either as one string or as a list of arguments
fn deserialize_command<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CommandForm {
        Line(String),
        Argv(Vec<String>),
    }

    Ok(match CommandForm::deserialize(deserializer)? {
        CommandForm::Line(line) => split_command(&line),
        CommandForm::Argv(argv) => argv,
    })
}

impl GatewayConfig {
    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&raw)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<()> {
        match self.storcli_command.first() {
            Some(program) if !program.trim().is_empty() => Ok(()),
            _ => Err(Error::Configuration("storcli command is empty".into())),
        }
    }
}
