//! Post-match validation.
//!
//! Runs the per-argument validators of the matched signature against the
//! bound values. Arguments are checked in declaration order and only when
//! bound; the first rejection stops the pipeline.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::DispatchError;
use crate::types::{Signature, Value};

/// Checks every bound argument that carries a validator.
///
/// A validator returning `Ok(false)` or `Err(reason)` yields
/// [`DispatchError::Validation`] naming the argument.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use command_signature_core::{CommandBuilder, DispatchError, TypeRegistry, Value, validate_values};
///
/// let command = CommandBuilder::new("sleep")
///     .signature("(int) seconds")
///     .validator("seconds", |v| Ok(v.as_int().is_some_and(|n| n >= 0)))
///     .build(&TypeRegistry::new())
///     .unwrap();
/// let signature = &command.signatures()[0];
///
/// let ok = BTreeMap::from([("seconds".to_string(), Value::Int(5))]);
/// assert!(validate_values("sleep", signature, &ok).is_ok());
///
/// let bad = BTreeMap::from([("seconds".to_string(), Value::Int(-1))]);
/// assert!(matches!(
///     validate_values("sleep", signature, &bad),
///     Err(DispatchError::Validation { .. })
/// ));
/// ```
pub fn validate_values(
    command: &str,
    signature: &Signature,
    values: &BTreeMap<String, Value>,
) -> Result<(), DispatchError> {
    for spec in signature.arguments() {
        let (Some(validator), Some(value)) = (&spec.validator, values.get(&spec.name)) else {
            continue;
        };
        let reason = match validator.check(value) {
            Ok(true) => continue,
            Ok(false) => format!("value {value} was rejected"),
            Err(reason) => reason,
        };
        debug!(command, argument = %spec.name, %reason, "validation failed");
        return Err(DispatchError::Validation {
            command: command.to_string(),
            argument: spec.name.clone(),
            reason,
        });
    }
    Ok(())
}
