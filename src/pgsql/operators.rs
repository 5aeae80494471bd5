use std::fmt;

/// SQL operators plus the translator-internal operators that are rewritten before output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Union,
    Concatenate,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    Like,
    ILike,
    RegexMatch,
    PgArrayOverlap,
    And,
    Or,
    Not,
    JsonbFieldExists,
    JsonField,
    JsonTextField,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Is,
    IsNot,
    // Rewritten before they reach the formatter
    In,
    StartsWith,
    Contains,
    EndsWith,
    PropertyLookup,
    AdditionAssignment,
    LabelAssignment,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Union => "union",
            Operator::Concatenate => "||",
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqualTo => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqualTo => "<=",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::RegexMatch => "~",
            Operator::PgArrayOverlap => "operator (pg_catalog.&&)",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
            Operator::JsonbFieldExists => "?",
            Operator::JsonField => "->",
            Operator::JsonTextField => "->>",
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::Power => "^",
            Operator::Is => "is",
            Operator::IsNot => "is not",
            Operator::In => "in",
            Operator::StartsWith => "starts with",
            Operator::Contains => "contains",
            Operator::EndsWith => "ends with",
            Operator::PropertyLookup => "property_lookup",
            Operator::AdditionAssignment => "+=",
            Operator::LabelAssignment => "label_assignment",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Equals
                | Operator::NotEquals
                | Operator::GreaterThan
                | Operator::GreaterThanOrEqualTo
                | Operator::LessThan
                | Operator::LessThanOrEqualTo
        )
    }

    pub fn is_boolean(&self) -> bool {
        self.is_comparison()
            || matches!(
                self,
                Operator::And
                    | Operator::Or
                    | Operator::Not
                    | Operator::Like
                    | Operator::ILike
                    | Operator::RegexMatch
                    | Operator::PgArrayOverlap
                    | Operator::JsonbFieldExists
                    | Operator::Is
                    | Operator::IsNot
                    | Operator::In
                    | Operator::StartsWith
                    | Operator::Contains
                    | Operator::EndsWith
            )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Add
                | Operator::Subtract
                | Operator::Multiply
                | Operator::Divide
                | Operator::Modulo
                | Operator::Power
        )
    }

    /// Binding strength when rendered, following PostgreSQL's operator precedence table.
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Union => 0,
            Operator::Or => 1,
            Operator::And => 2,
            Operator::Not => 3,
            Operator::Is | Operator::IsNot => 4,
            Operator::Equals
            | Operator::NotEquals
            | Operator::GreaterThan
            | Operator::GreaterThanOrEqualTo
            | Operator::LessThan
            | Operator::LessThanOrEqualTo => 5,
            Operator::In
            | Operator::Like
            | Operator::ILike
            | Operator::StartsWith
            | Operator::Contains
            | Operator::EndsWith => 6,
            Operator::Add | Operator::Subtract => 8,
            Operator::Multiply | Operator::Divide | Operator::Modulo => 9,
            Operator::Power => 10,
            _ => 7,
        }
    }

    /// Operators where `a op (b op c)` renders safely as `a op b op c`.
    pub fn is_associative(&self) -> bool {
        matches!(
            self,
            Operator::And
                | Operator::Or
                | Operator::Add
                | Operator::Multiply
                | Operator::Concatenate
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
