//! PostgreSQL output model: data types, operators, the SQL syntax tree and its formatter.

pub mod errors;
pub mod format;
pub mod functions;
pub mod identifiers;
pub mod model;
pub mod operators;
pub mod types;

pub use errors::TypeError;
pub use identifiers::{CompoundIdentifier, Identifier, IdentifierSet};
pub use model::*;
pub use operators::Operator;
pub use types::{value_to_data_type, DataType, Value};
