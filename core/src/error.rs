//! Error types for registration and dispatch.
//!
//! [`ParseError`] and [`RegistryError`] are raised while building commands and
//! are always returned to the caller. [`DispatchError`] is produced per call;
//! matching and validation failures are routed through the fallback policy.

use thiserror::Error;

/// Malformed signature DSL or conflicting argument metadata.
///
/// Offsets are byte positions into the signature source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("signature is empty")]
    EmptySignature,

    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("invalid argument name '{name}' at offset {offset}")]
    InvalidName { name: String, offset: usize },

    #[error("type annotation at offset {offset} is never closed")]
    UnclosedAnnotation { offset: usize },

    #[error("invalid type annotation '({text})' at offset {offset}")]
    InvalidType { text: String, offset: usize },

    #[error("malformed array size in '({text})' at offset {offset}")]
    MalformedArraySize { text: String, offset: usize },

    #[error("custom type '{symbol}' at offset {offset} cannot be used as an array")]
    CustomTypeArray { symbol: String, offset: usize },

    #[error("type annotation at offset {offset} is not followed by an argument name")]
    MissingName { offset: usize },

    #[error("operator '{op}' at offset {offset} is missing an operand")]
    DanglingOperator { op: char, offset: usize },

    #[error("group opened with '{open}' at offset {offset} is never closed")]
    UnbalancedGroup { open: char, offset: usize },

    #[error("'{close}' at offset {offset} has no matching opener")]
    UnmatchedClose { close: char, offset: usize },

    #[error("group opened with '{open}' at offset {offset} is closed with '{found}'")]
    MismatchedGroup {
        open: char,
        found: char,
        offset: usize,
    },

    #[error("empty group at offset {offset}")]
    EmptyGroup { offset: usize },

    #[error("duplicate argument name '{0}'")]
    DuplicateName(String),

    #[error("alias '{alias}' of argument '{argument}' collides with an existing name or alias")]
    DuplicateAlias { alias: String, argument: String },

    #[error("unknown type '{0}'")]
    UnknownType(String),
}

/// Failures while registering custom types or commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("custom type '{0}' is already registered")]
    DuplicateType(String),

    #[error("'{0}' is a reserved type name")]
    ReservedType(String),

    #[error("invalid custom type symbol '{0}'")]
    InvalidTypeSymbol(String),

    #[error("command '{0}' is already registered")]
    DuplicateCommand(String),

    #[error("command '{0}' is not registered")]
    UnknownCommand(String),

    #[error("invalid signature '{signature}' for command '{command}': {error}")]
    Signature {
        command: String,
        signature: String,
        #[source]
        error: ParseError,
    },
}

/// Per-call dispatch failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No command is registered under this name. Never routed through the
    /// fallback policy.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// No signature of the command matched the input.
    #[error("no signature of '{command}' matches the input (tried: {})", .attempted.join("; "))]
    NoMatch {
        command: String,
        attempted: Vec<String>,
    },

    /// A bound value was rejected by its validator.
    #[error("argument '{argument}' of '{command}' failed validation: {reason}")]
    Validation {
        command: String,
        argument: String,
        reason: String,
    },
}

impl DispatchError {
    /// Returns `true` for errors that go through the fallback policy.
    pub fn is_policy_routed(&self) -> bool {
        matches!(self, Self::NoMatch { .. } | Self::Validation { .. })
    }

    pub fn command(&self) -> &str {
        match self {
            Self::UnknownCommand(command) => command,
            Self::NoMatch { command, .. } | Self::Validation { command, .. } => command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_lists_attempted_signatures() {
        let err = DispatchError::NoMatch {
            command: "roll".to_string(),
            attempted: vec!["(int) sides".to_string(), "--help".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "no signature of 'roll' matches the input (tried: (int) sides; --help)"
        );
        assert!(err.is_policy_routed());
    }

    #[test]
    fn test_unknown_command_is_not_policy_routed() {
        let err = DispatchError::UnknownCommand("nope".to_string());
        assert!(!err.is_policy_routed());
        assert_eq!(err.command(), "nope");
    }
}
