//! Overload dispatch and fallback routing.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::command::{Command, CommandBuilder};
use crate::error::{DispatchError, RegistryError};
use crate::matcher::Matcher;
use crate::registry::{CustomType, TypeRegistry};
use crate::settings::{EffectiveSettings, FallbackMode, Settings};
use crate::tokenize::TokenStream;
use crate::types::{Binding, Signature, Value};
use crate::validate::validate_values;

/// Registry of commands, custom types, and global settings.
///
/// Dispatch only needs `&self`, so a populated dispatcher can be shared
/// across threads.
///
/// # Examples
///
/// ```
/// use command_signature_core::{CommandBuilder, Dispatcher, Value};
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher
///     .register(
///         CommandBuilder::new("roll")
///             .signature("(int) count (int) sides")
///             .signature("(int) sides"),
///     )
///     .unwrap();
///
/// let binding = dispatcher.dispatch("roll", "2 6").unwrap().unwrap();
/// assert_eq!(binding.signature_index(), 0);
/// assert_eq!(binding.get("sides"), Some(&Value::Int(6)));
///
/// // Default fallback is Ignore.
/// assert!(dispatcher.dispatch("roll", "two").unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct Dispatcher {
    types: TypeRegistry,
    settings: Settings,
    commands: HashMap<String, Command>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Global settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the global settings.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Adds a custom type. Signatures registered afterwards may refer to it.
    pub fn register_type(&mut self, custom: CustomType) -> Result<(), RegistryError> {
        self.types.register(custom)
    }

    /// Compiles and registers a command.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken or any signature does not compile.
    pub fn register(&mut self, builder: CommandBuilder) -> Result<&Command, RegistryError> {
        let command = builder.build(&self.types)?;
        let name = command.name().to_string();
        if self.commands.contains_key(&name) {
            return Err(RegistryError::DuplicateCommand(name));
        }
        info!(
            command = %name,
            signatures = command.signatures().len(),
            "registered command"
        );
        Ok(&*self.commands.entry(name).or_insert(command))
    }

    /// Appends an overload to an existing command. It is tried last.
    pub fn add_signature(&mut self, command: &str, source: &str) -> Result<(), RegistryError> {
        let entry = self
            .commands
            .get_mut(command)
            .ok_or_else(|| RegistryError::UnknownCommand(command.to_string()))?;
        entry.add_signature(source, &self.types)
    }

    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Registered commands, sorted by name.
    pub fn commands(&self) -> Vec<&Command> {
        let mut commands: Vec<&Command> = self.commands.values().collect();
        commands.sort_by(|a, b| a.name().cmp(b.name()));
        commands
    }

    /// Matches `input` against `command` without applying the fallback
    /// policy.
    pub fn resolve(&self, command: &str, input: &str) -> Result<Binding, DispatchError> {
        let entry = self
            .commands
            .get(command)
            .ok_or_else(|| DispatchError::UnknownCommand(command.to_string()))?;
        let effective = EffectiveSettings::resolve(entry.settings(), &self.settings);
        self.resolve_with(entry, input, &effective)
    }

    /// Matches `input` against `command` and routes matching and validation
    /// errors through the effective fallback policy.
    ///
    /// Returns `Ok(None)` when an error was ignored or handled. Unknown
    /// commands are always returned as errors.
    pub fn dispatch(&self, command: &str, input: &str) -> Result<Option<Binding>, DispatchError> {
        let entry = self
            .commands
            .get(command)
            .ok_or_else(|| DispatchError::UnknownCommand(command.to_string()))?;
        let effective = EffectiveSettings::resolve(entry.settings(), &self.settings);

        let error = match self.resolve_with(entry, input, &effective) {
            Ok(binding) => return Ok(Some(binding)),
            Err(error) if !error.is_policy_routed() => return Err(error),
            Err(error) => error,
        };

        match effective.fallback {
            FallbackMode::Raise => Err(error),
            FallbackMode::Ignore => {
                debug!(command, %error, "ignoring dispatch error");
                Ok(None)
            }
            FallbackMode::Handle => {
                match effective.resolved_handler() {
                    Some(handler) => {
                        debug!(command, %error, "passing dispatch error to handler");
                        handler.call(&error);
                    }
                    None => warn!(command, %error, "no handler configured; ignoring dispatch error"),
                }
                Ok(None)
            }
        }
    }

    fn resolve_with(
        &self,
        command: &Command,
        input: &str,
        settings: &EffectiveSettings<'_>,
    ) -> Result<Binding, DispatchError> {
        let stream = TokenStream::parse(input);
        let name = command.name();

        for (index, signature) in command.signatures().iter().enumerate() {
            let Some(bound) = Matcher::new(signature, &stream, &self.types, settings).solve() else {
                debug!(command = name, signature = signature.source(), "signature did not match");
                continue;
            };
            let values = named(signature, bound);
            validate_values(name, signature, &values)?;
            debug!(command = name, signature = signature.source(), index, "signature matched");
            return Ok(Binding::new(name, index, signature.source(), values));
        }

        Err(DispatchError::NoMatch {
            command: name.to_string(),
            attempted: command
                .signatures()
                .iter()
                .map(|signature| signature.source().to_string())
                .collect(),
        })
    }
}

fn named(signature: &Signature, bound: Vec<(usize, Value)>) -> BTreeMap<String, Value> {
    bound
        .into_iter()
        .map(|(index, value)| (signature.arguments()[index].name.clone(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&DispatchError) + Send + Sync + 'static) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        (log, move |error: &DispatchError| {
            sink.lock().unwrap().push(error.to_string())
        })
    }

    #[test]
    fn test_dispatcher_is_send_and_sync() {
        assert_send_sync::<Dispatcher>();
    }

    #[test]
    fn test_first_registered_signature_wins() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(
                CommandBuilder::new("show")
                    .signature("(str) item")
                    .signature("(int) id"),
            )
            .unwrap();

        let binding = dispatcher.resolve("show", "42").unwrap();
        assert_eq!(binding.signature_index(), 0);
        assert_eq!(binding.signature_source(), "(str) item");
        assert_eq!(binding.get("item"), Some(&Value::Str("42".to_string())));
    }

    #[test]
    fn test_later_overload_used_when_earlier_fails() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(CommandBuilder::new("show").signature("(int) id"))
            .unwrap();
        dispatcher.add_signature("show", "(str) item").unwrap();

        let binding = dispatcher.resolve("show", "lamp").unwrap();
        assert_eq!(binding.signature_index(), 1);
        assert_eq!(binding.command(), "show");
    }

    #[test]
    fn test_no_match_lists_every_signature() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(
                CommandBuilder::new("move")
                    .signature("(int) x (int) y")
                    .signature("--home"),
            )
            .unwrap();

        let err = dispatcher.resolve("move", "left").unwrap_err();
        assert_eq!(
            err,
            DispatchError::NoMatch {
                command: "move".to_string(),
                attempted: vec!["(int) x (int) y".to_string(), "--home".to_string()],
            }
        );
    }

    #[test]
    fn test_validation_failure_does_not_try_later_signatures() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(
                CommandBuilder::new("wait")
                    .signature("(int) seconds")
                    .signature("(str) until")
                    .validator("seconds", |v| Ok(v.as_int().is_some_and(|n| n >= 0))),
            )
            .unwrap();

        let err = dispatcher.resolve("wait", "-3").unwrap_err();
        assert!(matches!(err, DispatchError::Validation { ref argument, .. } if argument == "seconds"));
    }

    #[test]
    fn test_duplicate_and_unknown_commands() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(CommandBuilder::new("ping")).unwrap();
        assert_eq!(
            dispatcher.register(CommandBuilder::new("ping")).unwrap_err(),
            RegistryError::DuplicateCommand("ping".to_string())
        );
        assert_eq!(
            dispatcher.add_signature("pong", "x").unwrap_err(),
            RegistryError::UnknownCommand("pong".to_string())
        );

        let ignoring = Dispatcher::new().with_settings(Settings::default().with_fallback(FallbackMode::Ignore));
        assert_eq!(
            ignoring.dispatch("pong", "").unwrap_err(),
            DispatchError::UnknownCommand("pong".to_string())
        );
    }

    #[test]
    fn test_fallback_modes() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(CommandBuilder::new("add").signature("(int) a (int) b"))
            .unwrap();

        assert_eq!(dispatcher.dispatch("add", "1").unwrap(), None);

        dispatcher.set_settings(Settings::default().with_fallback(FallbackMode::Raise));
        assert!(matches!(
            dispatcher.dispatch("add", "1"),
            Err(DispatchError::NoMatch { .. })
        ));
        assert!(dispatcher.dispatch("add", "1 2").unwrap().is_some());
    }

    #[test]
    fn test_handler_resolution_local_then_global_then_ignore() {
        let (global_log, global_handler) = recorder();
        let (local_log, local_handler) = recorder();

        let mut dispatcher = Dispatcher::new().with_settings(
            Settings::default()
                .with_fallback(FallbackMode::Handle)
                .with_handler(global_handler),
        );
        dispatcher
            .register(
                CommandBuilder::new("local")
                    .signature("(int) n")
                    .settings(Settings::default().with_handler(local_handler)),
            )
            .unwrap();
        dispatcher
            .register(CommandBuilder::new("global").signature("(int) n"))
            .unwrap();

        assert_eq!(dispatcher.dispatch("local", "x").unwrap(), None);
        assert_eq!(dispatcher.dispatch("global", "x").unwrap(), None);
        assert_eq!(local_log.lock().unwrap().len(), 1);
        assert_eq!(global_log.lock().unwrap().len(), 1);

        dispatcher.set_settings(Settings::default().with_fallback(FallbackMode::Handle));
        assert_eq!(dispatcher.dispatch("global", "x").unwrap(), None);
        assert_eq!(global_log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_local_settings_change_casting() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(
                CommandBuilder::new("toggle")
                    .signature("flag")
                    .settings(Settings::default().with_truthy(["1"])),
            )
            .unwrap();
        dispatcher
            .register(CommandBuilder::new("count").signature("flag"))
            .unwrap();

        let toggle = dispatcher.resolve("toggle", "1").unwrap();
        let count = dispatcher.resolve("count", "1").unwrap();
        assert_eq!(toggle.get("flag"), Some(&Value::Bool(true)));
        assert_eq!(count.get("flag"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_custom_type_registered_before_command() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register_type(CustomType::new(
                "hex",
                |t| t.starts_with("0x"),
                |t| {
                    i64::from_str_radix(&t[2..], 16)
                        .map(serde_json::Value::from)
                        .map_err(|e| e.to_string())
                },
            ))
            .unwrap();
        dispatcher
            .register(CommandBuilder::new("poke").signature("(hex) addr (any) value"))
            .unwrap();

        let binding = dispatcher.resolve("poke", "0x10 0xff").unwrap();
        assert_eq!(
            binding.get("addr"),
            Some(&Value::Custom {
                symbol: "hex".to_string(),
                data: serde_json::json!(16),
            })
        );
        assert_eq!(
            binding.get("value").map(Value::type_name),
            Some("hex")
        );
    }

    #[test]
    fn test_shared_across_threads() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(CommandBuilder::new("echo").signature("(str[]) words"))
            .unwrap();
        let dispatcher = Arc::new(dispatcher);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                std::thread::spawn(move || {
                    dispatcher
                        .resolve("echo", &format!("hello {i}"))
                        .map(|binding| binding.len())
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(1));
        }
    }
}
