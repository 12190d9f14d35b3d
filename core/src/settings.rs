//! Global and per-command settings.
//!
//! Every field of [`Settings`] is optional. A command's local settings inherit
//! each unset field from the global settings, and the global settings fall
//! back to built-in defaults. [`EffectiveSettings`] is the merged view used
//! during a single dispatch.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Literals cast to `true` when no truthy set is configured.
pub const DEFAULT_TRUTHY: [&str; 4] = ["true", "yes", "y", "on"];

/// Literals cast to `false` when no falsy set is configured.
pub const DEFAULT_FALSY: [&str; 4] = ["false", "no", "n", "off"];

static DEFAULT_TRUTHY_SET: LazyLock<BTreeSet<String>> =
    LazyLock::new(|| DEFAULT_TRUTHY.iter().map(|s| s.to_string()).collect());

static DEFAULT_FALSY_SET: LazyLock<BTreeSet<String>> =
    LazyLock::new(|| DEFAULT_FALSY.iter().map(|s| s.to_string()).collect());

/// What happens to matching and validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Drop the error; the caller receives nothing.
    #[default]
    Ignore,
    /// Return the error to the caller.
    Raise,
    /// Pass the error to the resolved handler; the caller receives nothing.
    Handle,
}

type HandlerFn = dyn Fn(&DispatchError) + Send + Sync;

/// Callback receiving errors under [`FallbackMode::Handle`].
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    pub fn new(handle: impl Fn(&DispatchError) + Send + Sync + 'static) -> Self {
        Self(Arc::new(handle))
    }

    pub fn call(&self, error: &DispatchError) {
        (self.0)(error)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Settings layer. Unset fields inherit from the layer below.
///
/// # Examples
///
/// ```
/// use command_signature_core::{FallbackMode, Settings};
///
/// let global = Settings::default().with_fallback(FallbackMode::Raise);
/// let local = Settings::default().with_truthy(["1", "yes"]);
///
/// let effective = local.merged_over(&global);
/// assert_eq!(effective.fallback, FallbackMode::Raise);
/// assert!(effective.is_truthy("1"));
/// assert!(!effective.is_truthy("true"));
/// assert!(effective.is_falsy("no"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackMode>,
    #[serde(skip)]
    pub handler: Option<Handler>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truthy: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub falsy: Option<BTreeSet<String>>,
    /// Custom type symbols tried during `any` inference, in order. When unset
    /// every registered custom type is tried in registration order.
    #[serde(rename = "types", skip_serializing_if = "Option::is_none")]
    pub type_order: Option<Vec<String>>,
}

impl Settings {
    pub fn with_fallback(mut self, mode: FallbackMode) -> Self {
        self.fallback = Some(mode);
        self
    }

    pub fn with_handler(mut self, handle: impl Fn(&DispatchError) + Send + Sync + 'static) -> Self {
        self.handler = Some(Handler::new(handle));
        self
    }

    pub fn with_truthy<I, S>(mut self, literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.truthy = Some(normalize_literals(literals));
        self
    }

    pub fn with_falsy<I, S>(mut self, literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.falsy = Some(normalize_literals(literals));
        self
    }

    pub fn with_type_order<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_order = Some(symbols.into_iter().map(Into::into).collect());
        self
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.fallback.is_none()
            && self.handler.is_none()
            && self.truthy.is_none()
            && self.falsy.is_none()
            && self.type_order.is_none()
    }

    /// Resolves this layer on its own, over the built-in defaults.
    pub fn effective(&self) -> EffectiveSettings<'_> {
        EffectiveSettings::resolve(None, self)
    }

    /// Resolves this layer as a local override of `global`.
    pub fn merged_over<'a>(&'a self, global: &'a Settings) -> EffectiveSettings<'a> {
        EffectiveSettings::resolve(Some(self), global)
    }
}

fn normalize_literals<I, S>(literals: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    literals
        .into_iter()
        .map(|literal| literal.as_ref().to_lowercase())
        .collect()
}

/// Settings in force for one dispatch.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveSettings<'a> {
    pub fallback: FallbackMode,
    pub handler: Option<&'a Handler>,
    pub truthy: &'a BTreeSet<String>,
    pub falsy: &'a BTreeSet<String>,
    pub type_order: Option<&'a [String]>,
}

impl<'a> EffectiveSettings<'a> {
    /// Merges a local layer over a global one. Each field comes from the
    /// local layer if set, else the global layer, else the default.
    pub fn resolve(local: Option<&'a Settings>, global: &'a Settings) -> Self {
        Self {
            fallback: local
                .and_then(|s| s.fallback)
                .or(global.fallback)
                .unwrap_or_default(),
            handler: local
                .and_then(|s| s.handler.as_ref())
                .or(global.handler.as_ref()),
            truthy: local
                .and_then(|s| s.truthy.as_ref())
                .or(global.truthy.as_ref())
                .unwrap_or(&*DEFAULT_TRUTHY_SET),
            falsy: local
                .and_then(|s| s.falsy.as_ref())
                .or(global.falsy.as_ref())
                .unwrap_or(&*DEFAULT_FALSY_SET),
            type_order: local
                .and_then(|s| s.type_order.as_deref())
                .or(global.type_order.as_deref()),
        }
    }

    pub fn is_truthy(&self, token: &str) -> bool {
        self.truthy.contains(&token.to_lowercase())
    }

    pub fn is_falsy(&self, token: &str) -> bool {
        self.falsy.contains(&token.to_lowercase())
    }

    /// The handler that [`FallbackMode::Handle`] would call, if any.
    pub fn resolved_handler(&self) -> Option<&'a Handler> {
        match self.fallback {
            FallbackMode::Handle => self.handler,
            _ => None,
        }
    }
}

impl Default for EffectiveSettings<'static> {
    fn default() -> Self {
        Self {
            fallback: FallbackMode::Ignore,
            handler: None,
            truthy: &*DEFAULT_TRUTHY_SET,
            falsy: &*DEFAULT_FALSY_SET,
            type_order: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let effective = EffectiveSettings::default();
        assert_eq!(effective.fallback, FallbackMode::Ignore);
        assert!(effective.is_truthy("TRUE"));
        assert!(effective.is_falsy("off"));
        assert!(!effective.is_truthy("1"));
        assert!(effective.type_order.is_none());
    }

    #[test]
    fn test_local_inherits_unset_fields() {
        let global = Settings::default()
            .with_fallback(FallbackMode::Raise)
            .with_falsy(["nope"])
            .with_type_order(["hex"]);
        let local = Settings::default().with_truthy(["Yep"]);

        let effective = local.merged_over(&global);
        assert_eq!(effective.fallback, FallbackMode::Raise);
        assert!(effective.is_truthy("yep"));
        assert!(effective.is_falsy("nope"));
        assert!(!effective.is_falsy("no"));
        assert_eq!(effective.type_order, Some(&["hex".to_string()][..]));
    }

    #[test]
    fn test_non_ascii_literals_match_themselves() {
        let settings = Settings::default().with_truthy(["JA", "Ö"]).with_falsy(["Nein", "É"]);
        let effective = settings.effective();
        assert!(effective.is_truthy("JA"));
        assert!(effective.is_truthy("Ö"));
        assert!(effective.is_truthy("ö"));
        assert!(effective.is_falsy("É"));
        assert!(effective.is_falsy("nein"));
        assert!(!effective.is_truthy("O"));
    }

    #[test]
    fn test_local_fallback_overrides_global() {
        let global = Settings::default().with_fallback(FallbackMode::Raise);
        let local = Settings::default().with_fallback(FallbackMode::Ignore);
        assert_eq!(local.merged_over(&global).fallback, FallbackMode::Ignore);
    }

    #[test]
    fn test_handler_resolution_order() {
        let global = Settings::default().with_handler(|_| {});
        let local = Settings::default()
            .with_fallback(FallbackMode::Handle)
            .with_handler(|_| {});

        let effective = local.merged_over(&global);
        assert_eq!(effective.resolved_handler(), local.handler.as_ref());

        let bare_local = Settings::default().with_fallback(FallbackMode::Handle);
        let effective = bare_local.merged_over(&global);
        assert_eq!(effective.resolved_handler(), global.handler.as_ref());

        let empty = Settings::default();
        let effective = bare_local.merged_over(&empty);
        assert!(effective.resolved_handler().is_none());
    }

    #[test]
    fn test_deserialize_recognized_keys() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "fallback": "handle",
            "truthy": ["1", "yes"],
            "types": ["hex", "color"],
        }))
        .unwrap();
        assert_eq!(settings.fallback, Some(FallbackMode::Handle));
        assert_eq!(settings.truthy.as_ref().map(BTreeSet::len), Some(2));
        assert_eq!(
            settings.type_order,
            Some(vec!["hex".to_string(), "color".to_string()])
        );
        assert!(settings.falsy.is_none());
    }
}
