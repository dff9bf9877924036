//! Error types for expression validation and evaluation.

use crate::constant::ConstantKind;
use thiserror::Error;

/// Errors raised while building, validating or evaluating expressions.
///
/// Every variant except `Evaluation` describes a problem with the client's
/// query and maps to a "bad request"; `Evaluation` signals an engine defect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Invalid {kind} literal: '{token}'")]
    LiteralFormat { kind: ConstantKind, token: String },

    #[error(
        "Incompatible argument types for {function} in '{expression}': got ({}), declared {}",
        .actual.join(", "),
        .declared.join(" | ")
    )]
    IncompatibleTypes {
        function: String,
        expression: String,
        actual: Vec<String>,
        declared: Vec<String>,
    },

    #[error("Unknown property path: {path}")]
    UnknownPath { path: String },

    #[error(
        "Function {function} expects {} arguments, got {actual}",
        .expected.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" or ")
    )]
    Arity {
        function: String,
        expected: Vec<usize>,
        actual: usize,
    },

    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Expression evaluation error: {message}")]
    Evaluation { message: String },
}

impl ExpressionError {
    /// Whether the error was caused by the query rather than by the engine
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ExpressionError::Evaluation { .. })
    }
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExpressionError::LiteralFormat {
            kind: ConstantKind::Integer,
            token: "4x2".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid integer literal: '4x2'");

        let err = ExpressionError::IncompatibleTypes {
            function: "le".to_string(),
            expression: "('a' le 1.0)".to_string(),
            actual: vec!["string".to_string(), "double".to_string()],
            declared: vec![
                "(integer, integer) -> boolean".to_string(),
                "(double, double) -> boolean".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Incompatible argument types for le in '('a' le 1.0)': got (string, double), \
             declared (integer, integer) -> boolean | (double, double) -> boolean"
        );

        let err = ExpressionError::Arity {
            function: "substring".to_string(),
            expected: vec![2, 3],
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "Function substring expects 2 or 3 arguments, got 1"
        );

        let err = ExpressionError::UnknownPath {
            path: "Datastream/foo".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown property path: Datastream/foo");
    }

    #[test]
    fn test_client_classification() {
        assert!(ExpressionError::UnknownFunction {
            name: "foo".to_string()
        }
        .is_client_error());
        assert!(ExpressionError::Syntax {
            position: 3,
            message: "unexpected token".to_string()
        }
        .is_client_error());
        assert!(!ExpressionError::Evaluation {
            message: "boom".to_string()
        }
        .is_client_error());
    }
}
