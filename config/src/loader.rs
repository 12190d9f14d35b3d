//! Building a [`Dispatcher`] from a [`DispatchConfig`].
//!
//! ```
//! use command_signature_config::{build_dispatcher, CommandConfig, DispatchConfig};
//!
//! let mut config = DispatchConfig::default();
//! config.commands.push(CommandConfig::new("add").with_signature("(int) a (int) b"));
//!
//! let dispatcher = build_dispatcher(&config).unwrap();
//! let binding = dispatcher.resolve("add", "1 2").unwrap();
//! assert_eq!(binding.len(), 2);
//! ```

use std::path::Path;

use command_signature_core::{CommandBuilder, CustomType, Dispatcher};
use regex::Regex;
use tracing::info;

use crate::config::{CommandConfig, DispatchConfig, TypeConfig};
use crate::error::{ConfigError, Result};

/// Registers the configured types, then the commands, on a new dispatcher.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPattern`] for a bad type pattern and
/// [`ConfigError::Registry`] for a rejected type symbol, duplicate command, or
/// signature that does not compile.
pub fn build_dispatcher(config: &DispatchConfig) -> Result<Dispatcher> {
    let mut dispatcher = Dispatcher::new().with_settings(config.settings.clone());

    for custom in &config.types {
        dispatcher.register_type(pattern_type(custom)?)?;
    }
    for command in &config.commands {
        dispatcher.register(command_builder(command))?;
    }

    info!(
        types = config.types.len(),
        commands = config.commands.len(),
        "built dispatcher from config"
    );
    Ok(dispatcher)
}

/// Loads a config file and builds its dispatcher.
pub fn load_dispatcher(path: impl AsRef<Path>) -> Result<Dispatcher> {
    build_dispatcher(&DispatchConfig::load(path)?)
}

/// Turns a pattern type definition into a [`CustomType`].
///
/// # Examples
///
/// ```
/// use command_signature_config::{pattern_type, TypeConfig};
///
/// let hex = pattern_type(&TypeConfig {
///     symbol: "hex".into(),
///     pattern: "^0x([0-9a-f]+)$".into(),
/// })
/// .unwrap();
/// assert!(hex.accepts("0xff"));
/// assert_eq!(hex.cast("0xff").unwrap(), serde_json::json!("ff"));
/// ```
pub fn pattern_type(config: &TypeConfig) -> Result<CustomType> {
    let regex = Regex::new(&config.pattern).map_err(|source| ConfigError::InvalidPattern {
        symbol: config.symbol.clone(),
        source,
    })?;
    let matcher = regex.clone();

    Ok(CustomType::new(
        config.symbol.as_str(),
        move |token| matcher.is_match(token),
        move |token| {
            let captures = regex
                .captures(token)
                .ok_or_else(|| format!("'{token}' does not match"))?;
            let text = captures
                .get(1)
                .or_else(|| captures.get(0))
                .map_or("", |m| m.as_str());
            Ok(serde_json::Value::String(text.to_string()))
        },
    ))
}

fn command_builder(config: &CommandConfig) -> CommandBuilder {
    let mut builder = CommandBuilder::new(config.name.as_str());
    for source in &config.signatures {
        builder = builder.signature(source.as_str());
    }
    for (argument, aliases) in &config.aliases {
        builder = builder.aliases(argument, aliases);
    }
    for (argument, text) in &config.descriptions {
        builder = builder.description(argument, text.as_str());
    }
    if let Some(settings) = &config.settings {
        builder = builder.settings(settings.clone());
    }
    builder
}
