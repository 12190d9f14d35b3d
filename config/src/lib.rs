//! File-based configuration for command signature dispatchers.
//!
//! A [`DispatchConfig`] describes global settings, regex-backed custom types,
//! and commands with their signatures, aliases, descriptions, and local
//! settings. It is read from YAML or JSON and turned into a ready
//! [`Dispatcher`](command_signature_core::Dispatcher) by [`build_dispatcher`].
//!
//! # Quick start
//!
//! ```no_run
//! use command_signature_config::load_dispatcher;
//!
//! let dispatcher = load_dispatcher("commands.yml").unwrap();
//! if let Ok(Some(binding)) = dispatcher.dispatch("greet", "world --times=2") {
//!     println!("matched signature {}", binding.signature_source());
//! }
//! ```
//!
//! Validators and fallback handlers are code, not data; attach them by
//! registering commands on the returned dispatcher directly.

mod config;
mod error;
mod loader;

pub use config::{CommandConfig, DispatchConfig, TypeConfig};
pub use error::{ConfigError, Result};
pub use loader::{build_dispatcher, load_dispatcher, pattern_type};
