//! Binding errors
//!
//! `SymbolNotFound` (declaration time) and `ArgumentCount` (call time) are the
//! two errors callers are expected to handle; the remaining variants report
//! misuse of the typed API. Native failure sentinels are never errors.

use crate::ffi::callbacks::CallbackError;
use crate::ffi::loader::LoadError;
use crate::ffi::marshal::MarshalError;
use thiserror::Error;

/// Result type for binding operations
pub type BindResult<T> = Result<T, BindError>;

/// Errors raised by the binding engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindError {
    /// No candidate export name bound in any searched library
    #[error("Function '{function}' not found in libraries [{}]", libraries.join(", "))]
    SymbolNotFound {
        function: String,
        libraries: Vec<String>,
    },

    /// Call-site argument count does not match the contract
    #[error(
        "Function '{function}' expects {expected} argument{}, got {actual}",
        if *expected == 1 { "" } else { "s" }
    )]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// A declaration used a type token the alias table does not know
    #[error("Unknown type '{token}' in declaration of '{function}'")]
    UnresolvedType { function: String, token: String },

    /// A re-declaration resolved to a different export
    #[error(
        "Function '{function}' was bound to '{previous}' but now resolves to '{resolved}'"
    )]
    IncompatibleRedeclaration {
        function: String,
        previous: String,
        resolved: String,
    },

    /// Nothing is installed under this name
    #[error("Unbound function: {name}")]
    Unbound { name: String },

    /// Argument or result conversion failed
    #[error("Function '{function}': {source}")]
    Marshal {
        function: String,
        #[source]
        source: MarshalError,
    },

    /// Callback trampoline could not be built
    #[error("Function '{function}': {source}")]
    Callback {
        function: String,
        #[source]
        source: CallbackError,
    },

    /// Library could not be loaded
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl BindError {
    /// Function or name the error is about
    pub fn function(&self) -> Option<&str> {
        match self {
            BindError::SymbolNotFound { function, .. }
            | BindError::ArgumentCount { function, .. }
            | BindError::UnresolvedType { function, .. }
            | BindError::IncompatibleRedeclaration { function, .. }
            | BindError::Marshal { function, .. }
            | BindError::Callback { function, .. } => Some(function),
            BindError::Unbound { name } => Some(name),
            BindError::Load(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_not_found_names_libraries() {
        let err = BindError::SymbolNotFound {
            function: "GetFooBar".to_string(),
            libraries: vec!["user32".to_string(), "kernel32".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Function 'GetFooBar' not found in libraries [user32, kernel32]"
        );
        assert_eq!(err.function(), Some("GetFooBar"));
    }

    #[test]
    fn test_argument_count_message() {
        let err = BindError::ArgumentCount {
            function: "is_window".to_string(),
            expected: 1,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Function 'is_window' expects 1 argument, got 3"
        );

        let err = BindError::ArgumentCount {
            function: "set_menu".to_string(),
            expected: 2,
            actual: 0,
        };
        assert!(err.to_string().contains("expects 2 arguments, got 0"));
    }
}
