use thiserror::Error;

use crate::pgsql::{DataType, TypeError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslationError {
    #[error("Unknown identifier `{identifier}`")]
    UnknownIdentifier { identifier: String },
    #[error("Expected translation state {expected} but found {found}")]
    StateMismatch { expected: String, found: String },
    #[error("Unexpected {node} while translating in state {state}")]
    InvalidState { state: String, node: String },
    #[error("Unsupported operand `{operand}` for {context}")]
    UnsupportedOperandType { operand: String, context: String },
    #[error("Unable to build a from clause for `{identifier}` of type {data_type}")]
    UnsupportedFromClauseType {
        identifier: String,
        data_type: DataType,
    },
    #[error("Unsupported function `{name}`")]
    UnsupportedFunction { name: String },
    #[error("Function `{name}` expects {expected} arguments but received {received}")]
    FunctionArity {
        name: String,
        expected: String,
        received: usize,
    },
    #[error("Unsupported clause: {clause}")]
    UnsupportedClause { clause: String },
    #[error("Unsupported relationship direction for `{identifier}`: {direction}")]
    UnsupportedDirection {
        identifier: String,
        direction: String,
    },
    #[error("Relationship variable `{identifier}` is already bound")]
    RelationshipRebinding { identifier: String },
    #[error("No kind mapping for: {}", kinds.join(", "))]
    UnmappedKind { kinds: Vec<String> },
    #[error("Unable to generate identifiers for data type {data_type}")]
    UnsupportedIdentifierType { data_type: DataType },
    #[error("Expression stack is empty")]
    EmptyExpressionStack,
    #[error("List literal mixes element types {first} and {second}")]
    ArrayLiteralTypeMismatch { first: DataType, second: DataType },
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl TranslationError {
    pub fn unknown_identifier(identifier: impl ToString) -> Self {
        TranslationError::UnknownIdentifier {
            identifier: identifier.to_string(),
        }
    }

    pub fn unsupported_operand(operand: impl std::fmt::Debug, context: impl Into<String>) -> Self {
        TranslationError::UnsupportedOperandType {
            operand: format!("{:?}", operand),
            context: context.into(),
        }
    }
}
