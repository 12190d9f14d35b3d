//! Serializable dispatcher configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! settings:
//!   fallback: raise
//!   truthy: ["true", "yes", "1"]
//!   types: [hex]
//! types:
//!   - symbol: hex
//!     pattern: "^0x([0-9a-fA-F]+)$"
//! commands:
//!   - name: greet
//!     signatures: ["(str) name [(int) --times]"]
//!     aliases: { times: [n] }
//!     descriptions: { name: "Who to greet" }
//!     settings: { fallback: ignore }
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use command_signature_core::Settings;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A custom type defined by a regular expression.
///
/// The type accepts tokens the pattern matches. The cast value is the first
/// capture group, or the whole token when the pattern has no groups, as a
/// JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConfig {
    pub symbol: String,
    pub pattern: String,
}

/// One command and its overloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub name: String,
    /// Signatures in dispatch order.
    #[serde(default)]
    pub signatures: Vec<String>,
    /// Argument name to its aliases.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub descriptions: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl CommandConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signatures: Vec::new(),
            aliases: BTreeMap::new(),
            descriptions: BTreeMap::new(),
            settings: None,
        }
    }

    pub fn with_signature(mut self, source: impl Into<String>) -> Self {
        self.signatures.push(source.into());
        self
    }
}

/// Top-level configuration: global settings, custom types, and commands.
///
/// # Examples
///
/// ```no_run
/// use command_signature_config::DispatchConfig;
///
/// let config = DispatchConfig::load("commands.yml").unwrap();
/// println!("{} commands configured", config.commands.len());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub settings: Settings,
    /// Custom types in precedence order.
    pub types: Vec<TypeConfig>,
    pub commands: Vec<CommandConfig>,
}

impl DispatchConfig {
    /// Loads configuration from a file. Files ending in `.json` are read as
    /// JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ConfigError::IoError) if the file cannot
    /// be read, or a JSON/YAML error if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(std::fs::File::open(path)?);
        let config = if is_json(path) {
            serde_json::from_reader(reader)?
        } else {
            serde_yaml::from_reader(reader)?
        };
        Ok(config)
    }

    /// Saves the configuration, choosing the format like [`load`](Self::load).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let writer = BufWriter::new(std::fs::File::create(path)?);
        if is_json(path) {
            serde_json::to_writer_pretty(writer, self)?;
        } else {
            serde_yaml::to_writer(writer, self)?;
        }
        Ok(())
    }

    /// Looks up a command by name.
    pub fn command(&self, name: &str) -> Option<&CommandConfig> {
        self.commands.iter().find(|c| c.name == name)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
