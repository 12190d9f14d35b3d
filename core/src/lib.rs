//! Command signature DSL, matcher, and overload dispatcher.
//!
//! A signature such as `(str) name [(int) --times] | --all` is compiled into
//! a tree of argument leaves joined by AND, XOR (`|`), and OR (`/`) groups,
//! where `<...>` groups are required and `[...]` groups are optional. Input
//! lines are split into positional and `--keyword` tokens and matched against
//! each registered signature of a command in order; the first match yields a
//! [`Binding`] of argument names to typed [`Value`]s.
//!
//! - [`compile`] parses signature text into a [`Signature`].
//! - [`tokenize`] and [`TokenStream`] classify input tokens.
//! - [`TypeRegistry`] holds user-defined [`CustomType`]s used by explicit
//!   annotations and by `any` inference.
//! - [`Matcher`] is the backtracking solver for one signature.
//! - [`Dispatcher`] owns commands, types, and global [`Settings`], and routes
//!   failures through the [`FallbackMode`] policy.
//!
//! # Example
//!
//! ```
//! use command_signature_core::*;
//!
//! let mut dispatcher = Dispatcher::new()
//!     .with_settings(Settings::default().with_fallback(FallbackMode::Raise));
//! dispatcher
//!     .register(
//!         CommandBuilder::new("greet")
//!             .signature("(str) name [(int) --times]")
//!             .alias("times", "n"),
//!     )
//!     .unwrap();
//!
//! let binding = dispatcher.dispatch("greet", "--n=3 world").unwrap().unwrap();
//! assert_eq!(binding.get("name"), Some(&Value::Str("world".into())));
//! assert_eq!(binding.get("times"), Some(&Value::Int(3)));
//!
//! let err = dispatcher.dispatch("greet", "").unwrap_err();
//! assert!(matches!(err, DispatchError::NoMatch { .. }));
//! ```

mod command;
mod compiler;
mod dispatch;
mod error;
mod matcher;
mod registry;
mod settings;
mod tokenize;
mod types;
mod validate;

pub use command::{Command, CommandBuilder};
pub use compiler::compile;
pub use dispatch::Dispatcher;
pub use error::{DispatchError, ParseError, RegistryError};
pub use matcher::Matcher;
pub use registry::{CustomType, TypeRegistry, cast_native};
pub use settings::{DEFAULT_FALSY, DEFAULT_TRUTHY, EffectiveSettings, FallbackMode, Handler, Settings};
pub use tokenize::{KeywordMap, Token, TokenStream, classify, tokenize};
pub use types::*;
pub use validate::validate_values;
