use thiserror::Error;

use super::types::DataType;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    #[error("Incompatible types {left} and {right} for operator `{operator}`")]
    Incompatible {
        left: DataType,
        right: DataType,
        operator: String,
    },
    #[error("Data type {data_type} has no array representation")]
    NoArrayRepresentation { data_type: DataType },
    #[error("Data type {data_type} is not an array type")]
    NotAnArrayType { data_type: DataType },
    #[error("Value `{value}` has no PostgreSQL representation")]
    UnsupportedValue { value: String },
}

impl TypeError {
    pub fn incompatible(left: DataType, right: DataType, operator: impl ToString) -> Self {
        TypeError::Incompatible {
            left,
            right,
            operator: operator.to_string(),
        }
    }
}
