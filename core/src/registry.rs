//! Type registry: native casters and ordered custom types.
//!
//! Explicitly typed arguments cast with exactly one caster. `any` arguments
//! infer: custom types first, in effective order, then `bool`, `int`,
//! `float`, and finally `str`, which always succeeds.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::compiler::is_identifier;
use crate::error::RegistryError;
use crate::settings::EffectiveSettings;
use crate::types::{NativeType, TypeDescriptor, Value};

static INT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("static regex must compile"));

static FLOAT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?([0-9]+\.[0-9]*|\.[0-9]+)$").expect("static regex must compile")
});

/// Annotation names a custom type may not take.
const RESERVED_SYMBOLS: [&str; 6] = ["any", "bool", "int", "float", "str", "string"];

type InferFn = dyn Fn(&str) -> bool + Send + Sync;
type CastFn = dyn Fn(&str) -> Result<serde_json::Value, String> + Send + Sync;

/// A user-defined type: a symbol usable in annotations, a predicate used by
/// `any` inference, and a cast producing the bound data.
///
/// # Examples
///
/// ```
/// use command_signature_core::CustomType;
///
/// let hex = CustomType::new(
///     "hex",
///     |token| token.starts_with("0x"),
///     |token| {
///         i64::from_str_radix(&token[2..], 16)
///             .map(Into::into)
///             .map_err(|err| err.to_string())
///     },
/// );
/// assert!(hex.accepts("0xff"));
/// assert_eq!(hex.cast("0xff"), Ok(255.into()));
/// assert!(hex.cast("0xzz").is_err());
/// ```
#[derive(Clone)]
pub struct CustomType {
    symbol: String,
    infer: Arc<InferFn>,
    cast: Arc<CastFn>,
}

impl CustomType {
    pub fn new(
        symbol: impl Into<String>,
        infer: impl Fn(&str) -> bool + Send + Sync + 'static,
        cast: impl Fn(&str) -> Result<serde_json::Value, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            infer: Arc::new(infer),
            cast: Arc::new(cast),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Runs the infer predicate.
    pub fn accepts(&self, token: &str) -> bool {
        (self.infer)(token)
    }

    /// Runs the cast function.
    pub fn cast(&self, token: &str) -> Result<serde_json::Value, String> {
        (self.cast)(token)
    }

    /// Predicate and cast together; `None` if either rejects the token.
    fn value_of(&self, token: &str) -> Option<Value> {
        if !self.accepts(token) {
            return None;
        }
        match self.cast(token) {
            Ok(data) => Some(Value::Custom {
                symbol: self.symbol.clone(),
                data,
            }),
            Err(reason) => {
                debug!(symbol = %self.symbol, token, %reason, "custom cast rejected token");
                None
            }
        }
    }
}

impl fmt::Debug for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomType")
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

/// Ordered set of custom types. First registered has the highest precedence.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: Vec<CustomType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a custom type at the lowest precedence.
    ///
    /// # Errors
    ///
    /// Fails if the symbol is not an identifier, shadows a native type name,
    /// or is already registered.
    pub fn register(&mut self, custom: CustomType) -> Result<(), RegistryError> {
        let symbol = custom.symbol();
        if RESERVED_SYMBOLS.contains(&symbol) {
            return Err(RegistryError::ReservedType(symbol.to_string()));
        }
        if !is_identifier(symbol) {
            return Err(RegistryError::InvalidTypeSymbol(symbol.to_string()));
        }
        if self.contains(symbol) {
            return Err(RegistryError::DuplicateType(symbol.to_string()));
        }
        debug!(symbol, precedence = self.types.len(), "registered custom type");
        self.types.push(custom);
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Option<&CustomType> {
        self.types.iter().find(|custom| custom.symbol == symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    /// Symbols in precedence order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(CustomType::symbol)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Casts `token` to `ty`. `any` always succeeds.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_signature_core::{EffectiveSettings, NativeType, TypeDescriptor, TypeRegistry, Value};
    ///
    /// let registry = TypeRegistry::new();
    /// let settings = EffectiveSettings::default();
    /// let int = TypeDescriptor::Native(NativeType::Int);
    ///
    /// assert_eq!(registry.cast(&int, "-42", &settings), Some(Value::Int(-42)));
    /// assert_eq!(registry.cast(&int, "4.2", &settings), None);
    /// assert_eq!(registry.cast(&TypeDescriptor::Any, "4.2", &settings), Some(Value::Float(4.2)));
    /// ```
    pub fn cast(&self, ty: &TypeDescriptor, token: &str, settings: &EffectiveSettings<'_>) -> Option<Value> {
        match ty {
            TypeDescriptor::Any => Some(self.infer(token, settings).1),
            TypeDescriptor::Native(native) => cast_native(*native, token, settings),
            TypeDescriptor::Custom(symbol) => match self.get(symbol) {
                Some(custom) => custom.value_of(token),
                None => {
                    warn!(symbol = %symbol, "cast requested for unregistered custom type");
                    None
                }
            },
        }
    }

    /// Infers the type of `token` and casts it. Falls back to `str`.
    pub fn infer(&self, token: &str, settings: &EffectiveSettings<'_>) -> (TypeDescriptor, Value) {
        for custom in self.inference_chain(settings) {
            if let Some(value) = custom.value_of(token) {
                return (TypeDescriptor::Custom(custom.symbol.clone()), value);
            }
        }
        for native in NativeType::INFERENCE_ORDER {
            if let Some(value) = cast_native(native, token, settings) {
                return (TypeDescriptor::Native(native), value);
            }
        }
        // cast_native never rejects NativeType::String.
        (
            TypeDescriptor::Native(NativeType::String),
            Value::Str(token.to_string()),
        )
    }

    /// Custom types consulted by inference, honoring a configured order.
    fn inference_chain<'s>(&'s self, settings: &EffectiveSettings<'_>) -> Vec<&'s CustomType> {
        let Some(order) = settings.type_order else {
            return self.types.iter().collect();
        };
        order
            .iter()
            .filter_map(|symbol| {
                let found = self.get(symbol);
                if found.is_none() {
                    warn!(symbol = %symbol, "type order names an unregistered custom type");
                }
                found
            })
            .collect()
    }
}

/// Casts `token` with a native caster.
pub fn cast_native(native: NativeType, token: &str, settings: &EffectiveSettings<'_>) -> Option<Value> {
    match native {
        NativeType::Bool => {
            if settings.is_truthy(token) {
                Some(Value::Bool(true))
            } else if settings.is_falsy(token) {
                Some(Value::Bool(false))
            } else {
                None
            }
        }
        NativeType::Int => {
            if !INT_PATTERN.is_match(token) {
                return None;
            }
            token.parse::<i64>().ok().map(Value::Int)
        }
        NativeType::Float => {
            if !FLOAT_PATTERN.is_match(token) {
                return None;
            }
            token.parse::<f64>().ok().map(Value::Float)
        }
        NativeType::String => Some(Value::Str(token.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn hex() -> CustomType {
        CustomType::new(
            "hex",
            |token| token.starts_with("0x"),
            |token| {
                i64::from_str_radix(&token[2..], 16)
                    .map(Into::into)
                    .map_err(|err| err.to_string())
            },
        )
    }

    fn shout() -> CustomType {
        CustomType::new(
            "shout",
            |token| token.chars().all(|ch| ch.is_ascii_uppercase()),
            |token| Ok(token.to_lowercase().into()),
        )
    }

    #[test]
    fn test_native_casters() {
        let settings = EffectiveSettings::default();
        assert_eq!(cast_native(NativeType::Int, "+7", &settings), Some(Value::Int(7)));
        assert_eq!(cast_native(NativeType::Int, "7a", &settings), None);
        assert_eq!(
            cast_native(NativeType::Int, "99999999999999999999", &settings),
            None
        );
        assert_eq!(
            cast_native(NativeType::Float, "-0.5", &settings),
            Some(Value::Float(-0.5))
        );
        assert_eq!(cast_native(NativeType::Float, "5.", &settings), Some(Value::Float(5.0)));
        assert_eq!(cast_native(NativeType::Float, "5", &settings), None);
        assert_eq!(cast_native(NativeType::Float, "1.2.3", &settings), None);
        assert_eq!(cast_native(NativeType::Float, ".", &settings), None);
        assert_eq!(
            cast_native(NativeType::Bool, "Yes", &settings),
            Some(Value::Bool(true))
        );
        assert_eq!(cast_native(NativeType::Bool, "maybe", &settings), None);
        assert_eq!(
            cast_native(NativeType::String, "anything", &settings),
            Some(Value::Str("anything".to_string()))
        );
    }

    #[test]
    fn test_any_inference_native_order() {
        let registry = TypeRegistry::new();
        let settings = EffectiveSettings::default();

        assert_eq!(registry.infer("no", &settings).1, Value::Bool(false));
        assert_eq!(registry.infer("1", &settings).1, Value::Int(1));
        assert_eq!(registry.infer("1.0", &settings).1, Value::Float(1.0));
        assert_eq!(
            registry.infer("one", &settings).1,
            Value::Str("one".to_string())
        );
    }

    #[test]
    fn test_truthy_literal_changes_inference() {
        let registry = TypeRegistry::new();
        let settings = Settings::default().with_truthy(["1", "true"]);
        let effective = settings.effective();

        assert_eq!(registry.infer("1", &effective).1, Value::Bool(true));
        assert_eq!(
            registry.infer("1", &effective).0,
            TypeDescriptor::Native(NativeType::Bool)
        );
    }

    #[test]
    fn test_custom_types_precede_natives_in_registration_order() {
        let mut registry = TypeRegistry::new();
        registry.register(hex()).unwrap();
        registry.register(shout()).unwrap();
        let settings = EffectiveSettings::default();

        let (ty, value) = registry.infer("0x10", &settings);
        assert_eq!(ty, TypeDescriptor::Custom("hex".to_string()));
        assert_eq!(
            value,
            Value::Custom {
                symbol: "hex".to_string(),
                data: 16.into()
            }
        );

        // Predicate accepts but cast fails: inference moves on.
        let (ty, _) = registry.infer("0xzz", &settings);
        assert_eq!(ty, TypeDescriptor::Native(NativeType::String));

        let (ty, _) = registry.infer("LOUD", &settings);
        assert_eq!(ty, TypeDescriptor::Custom("shout".to_string()));
    }

    #[test]
    fn test_type_order_restricts_and_reorders() {
        let mut registry = TypeRegistry::new();
        registry.register(hex()).unwrap();
        registry.register(shout()).unwrap();

        let settings = Settings::default().with_type_order(["shout", "missing"]);
        let effective = settings.effective();

        let (ty, _) = registry.infer("0x10", &effective);
        assert_eq!(ty, TypeDescriptor::Native(NativeType::String));
        let (ty, _) = registry.infer("ABC", &effective);
        assert_eq!(ty, TypeDescriptor::Custom("shout".to_string()));

        // Explicit annotations do not depend on the inference order.
        let hex_ty = TypeDescriptor::Custom("hex".to_string());
        assert!(registry.cast(&hex_ty, "0x10", &effective).is_some());
    }

    #[test]
    fn test_register_rejects_bad_symbols() {
        let mut registry = TypeRegistry::new();
        registry.register(hex()).unwrap();

        assert_eq!(
            registry.register(hex()),
            Err(RegistryError::DuplicateType("hex".to_string()))
        );
        assert_eq!(
            registry.register(CustomType::new("int", |_| true, |t| Ok(t.into()))),
            Err(RegistryError::ReservedType("int".to_string()))
        );
        assert_eq!(
            registry.register(CustomType::new("a b", |_| true, |t| Ok(t.into()))),
            Err(RegistryError::InvalidTypeSymbol("a b".to_string()))
        );
        assert_eq!(registry.symbols().collect::<Vec<_>>(), vec!["hex"]);
    }

    #[test]
    fn test_explicit_custom_requires_predicate() {
        let mut registry = TypeRegistry::new();
        registry.register(hex()).unwrap();
        let settings = EffectiveSettings::default();
        let hex_ty = TypeDescriptor::Custom("hex".to_string());

        assert!(registry.cast(&hex_ty, "ff", &settings).is_none());
        assert!(registry.cast(&TypeDescriptor::Custom("nope".into()), "x", &settings).is_none());
    }
}
