//! Commands and their registration-time configuration.
//!
//! A [`CommandBuilder`] collects signatures plus per-argument metadata
//! (aliases, validators, descriptions) and an optional local [`Settings`]
//! layer. Metadata is keyed by argument name and applied to every signature
//! that declares that argument.

use std::collections::BTreeMap;

use tracing::info;

use crate::compiler::{compile, is_identifier};
use crate::error::{ParseError, RegistryError};
use crate::registry::TypeRegistry;
use crate::settings::Settings;
use crate::types::{DEFAULT_DESCRIPTION, KEYWORD_MARKER, Signature, TypeDescriptor, Validator, Value};

/// Configuration for one command, consumed by
/// [`Dispatcher::register`](crate::Dispatcher::register).
///
/// # Examples
///
/// ```
/// use command_signature_core::{CommandBuilder, TypeRegistry};
///
/// let command = CommandBuilder::new("greet")
///     .signature("(str) name [(int) --times]")
///     .alias("times", "n")
///     .description("name", "Who to greet")
///     .validator("times", |value| Ok(value.as_int().is_some_and(|n| n > 0)))
///     .build(&TypeRegistry::new())
///     .unwrap();
///
/// assert_eq!(command.signatures().len(), 1);
/// assert_eq!(command.description("name"), "Who to greet");
/// assert!(command.signatures()[0].argument("n").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder {
    name: String,
    signatures: Vec<String>,
    aliases: BTreeMap<String, Vec<String>>,
    validators: BTreeMap<String, Validator>,
    descriptions: BTreeMap<String, String>,
    settings: Option<Settings>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds an overload. Overloads are tried in the order they are added.
    pub fn signature(mut self, source: impl Into<String>) -> Self {
        self.signatures.push(source.into());
        self
    }

    /// Adds an alias for an argument. A leading `--` is ignored.
    pub fn alias(mut self, argument: &str, alias: &str) -> Self {
        self.aliases
            .entry(argument.to_string())
            .or_default()
            .push(strip_marker(alias).to_string());
        self
    }

    /// Adds several aliases for an argument.
    pub fn aliases<I, S>(mut self, argument: &str, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for alias in aliases {
            self = self.alias(argument, alias.as_ref());
        }
        self
    }

    pub fn validator(
        mut self,
        argument: &str,
        check: impl Fn(&Value) -> Result<bool, String> + Send + Sync + 'static,
    ) -> Self {
        self.validators
            .insert(argument.to_string(), Validator::new(check));
        self
    }

    pub fn description(mut self, argument: &str, text: impl Into<String>) -> Self {
        self.descriptions.insert(argument.to_string(), text.into());
        self
    }

    /// Sets the command's local settings layer.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Compiles every signature against `types`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Signature`] for the first signature that fails
    /// to compile, names an unknown custom type, or has an invalid or
    /// conflicting alias.
    pub fn build(self, types: &TypeRegistry) -> Result<Command, RegistryError> {
        let mut command = Command {
            name: self.name,
            signatures: Vec::with_capacity(self.signatures.len()),
            settings: self.settings,
            aliases: self.aliases,
            validators: self.validators,
            descriptions: self.descriptions,
        };
        for source in &self.signatures {
            command.add_signature(source, types)?;
        }
        Ok(command)
    }
}

fn strip_marker(name: &str) -> &str {
    name.strip_prefix(KEYWORD_MARKER).unwrap_or(name)
}

/// A named entry point with one or more compiled signatures.
#[derive(Debug, Clone)]
pub struct Command {
    name: String,
    signatures: Vec<Signature>,
    settings: Option<Settings>,
    aliases: BTreeMap<String, Vec<String>>,
    validators: BTreeMap<String, Validator>,
    descriptions: BTreeMap<String, String>,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signatures in registration order.
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// The local settings layer, if any.
    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    /// Description of an argument, or the default placeholder.
    pub fn description(&self, argument: &str) -> &str {
        self.descriptions
            .get(argument)
            .map(String::as_str)
            .unwrap_or(DEFAULT_DESCRIPTION)
    }

    /// Compiles `source` with this command's metadata and appends it.
    pub(crate) fn add_signature(&mut self, source: &str, types: &TypeRegistry) -> Result<(), RegistryError> {
        let signature = self
            .compile(source, types)
            .map_err(|error| RegistryError::Signature {
                command: self.name.clone(),
                signature: source.to_string(),
                error,
            })?;
        info!(
            command = %self.name,
            signature = signature.source(),
            index = self.signatures.len(),
            "registered signature"
        );
        self.signatures.push(signature);
        Ok(())
    }

    fn compile(&self, source: &str, types: &TypeRegistry) -> Result<Signature, ParseError> {
        let mut signature = compile(source)?;

        let unknown = signature.arguments.iter().find_map(|spec| match &spec.ty {
            TypeDescriptor::Custom(symbol) if !types.contains(symbol) => Some(symbol),
            _ => None,
        });
        if let Some(symbol) = unknown {
            return Err(ParseError::UnknownType(symbol.clone()));
        }

        let invalid = self.aliases.values().flatten().find(|alias| !is_identifier(alias));
        if let Some(alias) = invalid {
            return Err(ParseError::InvalidName {
                name: alias.clone(),
                offset: 0,
            });
        }

        for index in 0..signature.arguments.len() {
            let name = signature.arguments[index].name.clone();
            for alias in self.aliases.get(&name).into_iter().flatten() {
                if signature.lookup.contains_key(alias) {
                    return Err(ParseError::DuplicateAlias {
                        alias: alias.clone(),
                        argument: name,
                    });
                }
                signature.lookup.insert(alias.clone(), index);
                signature.arguments[index].aliases.push(alias.clone());
            }

            let spec = &mut signature.arguments[index];
            spec.validator = self.validators.get(&name).cloned();
            if let Some(text) = self.descriptions.get(&name) {
                spec.description = text.clone();
            }
        }

        Ok(signature)
    }
}
