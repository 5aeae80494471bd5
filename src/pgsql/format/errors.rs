use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormatError {
    #[error("Select statement has an empty projection")]
    EmptyProjection,
    #[error("Compound identifier has no parts")]
    EmptyCompoundIdentifier,
    #[error("Composite value has no resolved type")]
    UnresolvedCompositeType,
    #[error("Join against `{table}` is missing its constraint")]
    MissingJoinConstraint { table: String },
    #[error("Operator `{operator}` must be rewritten before formatting")]
    UntranslatedOperator { operator: String },
    #[error("Value `{value}` cannot be rendered as a SQL literal")]
    UnsupportedValue { value: String },
    #[error("Update statement has no assignments")]
    EmptyAssignments,
}
