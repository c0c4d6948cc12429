//! Configuration handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use capwd_lattice::{CommandSet, FieldMask, RestrictionState, Uid, UserLimit};

use crate::error::NodeError;

/// Main configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unix socket the daemon listens on
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// Where passwd records come from
    #[serde(default)]
    pub source: SourceConfig,

    /// Restrictions every root channel starts from
    #[serde(default)]
    pub limits: Option<LimitsConfig>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            source: SourceConfig::default(),
            limits: None,
        }
    }
}

fn default_socket_path() -> String {
    "/var/run/capwd.sock".to_string()
}

/// Record source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// passwd(5) or master.passwd(5) file
    #[serde(default = "default_source_path")]
    pub path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
        }
    }
}

fn default_source_path() -> String {
    "/etc/passwd".to_string()
}

/// Baseline limits. Omitted dimensions stay unrestricted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Permitted command names
    #[serde(default)]
    pub commands: Option<Vec<String>>,

    /// Visible field names
    #[serde(default)]
    pub fields: Option<Vec<String>>,

    /// Visible login names
    #[serde(default)]
    pub names: Option<Vec<String>>,

    /// Visible uids
    #[serde(default)]
    pub uids: Option<Vec<Uid>>,
}

impl LimitsConfig {
    /// Build the restriction state these limits describe.
    pub fn to_state(&self) -> Result<RestrictionState, NodeError> {
        let commands = match &self.commands {
            Some(names) => CommandSet::parse_names(names).map_err(config_error)?,
            None => CommandSet::all(),
        };
        let fields = match &self.fields {
            Some(names) => FieldMask::parse_names(names).map_err(config_error)?,
            None => FieldMask::all(),
        };
        let users = if self.names.is_none() && self.uids.is_none() {
            UserLimit::Unrestricted
        } else {
            UserLimit::only(
                self.names.clone().unwrap_or_default(),
                self.uids.clone().unwrap_or_default(),
            )
        };
        Ok(RestrictionState::new(commands, fields, users))
    }
}

fn config_error(err: impl std::fmt::Display) -> NodeError {
    NodeError::Config(err.to_string())
}

impl NodeConfig {
    /// Load config from a file path
    pub fn load(path: &str) -> Result<Self, NodeError> {
        let expanded = shellexpand::tilde(path).to_string();
        let content = std::fs::read_to_string(Path::new(&expanded))?;
        Self::parse(&content)
    }

    /// Parse config text. Limit names are checked here, so a typo fails at
    /// startup rather than on the first connection.
    pub fn parse(content: &str) -> Result<Self, NodeError> {
        let config: NodeConfig = toml::from_str(content)?;
        config.initial_state()?;
        Ok(config)
    }

    /// Restriction state for new root channels.
    pub fn initial_state(&self) -> Result<RestrictionState, NodeError> {
        match &self.limits {
            Some(limits) => limits.to_state(),
            None => Ok(RestrictionState::default()),
        }
    }

    /// Socket path with `~` expanded.
    pub fn socket_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.socket_path).to_string())
    }

    /// Source path with `~` expanded.
    pub fn source_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.source.path).to_string())
    }
}
