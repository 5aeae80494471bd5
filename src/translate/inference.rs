//! Type inference over SQL expressions and the JSON accessor choice for property lookups.

use crate::pgsql::{
    BinaryExpression, DataType, Expression, Identifier, Operator, COLUMN_END_ID, COLUMN_GRAPH_ID,
    COLUMN_ID, COLUMN_KIND_ID, COLUMN_KIND_IDS, COLUMN_PROPERTIES, COLUMN_START_ID,
};

use super::errors::TranslationError;

fn column_type(column: &Identifier) -> DataType {
    match column.as_str() {
        COLUMN_ID | COLUMN_START_ID | COLUMN_END_ID | COLUMN_GRAPH_ID => DataType::Int8,
        COLUMN_KIND_ID => DataType::Int2,
        COLUMN_KIND_IDS => DataType::Int2Array,
        COLUMN_PROPERTIES => DataType::Jsonb,
        _ => DataType::Unknown,
    }
}

/// Infers the result type of an expression. Unresolvable parts are `Unknown` and defer to the
/// other side of whatever operator they meet.
pub fn infer_expression_type(expression: &Expression) -> Result<DataType, TranslationError> {
    if let Some(hint) = expression.type_hint() {
        return Ok(hint);
    }

    match expression {
        Expression::CompoundIdentifier(identifier) => Ok(identifier
            .parts()
            .last()
            .filter(|_| identifier.len() > 1)
            .map(column_type)
            .unwrap_or(DataType::Unknown)),

        Expression::RowColumnReference(reference) => Ok(column_type(&reference.column)),

        Expression::Parenthetical(inner) => infer_expression_type(inner),

        Expression::Unary(unary) => match unary.operator {
            Operator::Not => Ok(DataType::Boolean),
            _ => infer_expression_type(&unary.operand),
        },

        Expression::Between(_) => Ok(DataType::Boolean),

        Expression::Binary(binary) => infer_binary_type(binary),

        _ => Ok(DataType::Unknown),
    }
}

fn infer_binary_type(binary: &BinaryExpression) -> Result<DataType, TranslationError> {
    match binary.operator {
        Operator::PropertyLookup => Ok(DataType::Unknown),
        Operator::JsonField => Ok(DataType::Jsonb),
        Operator::JsonTextField => Ok(DataType::Text),
        operator if operator.is_boolean() => Ok(DataType::Boolean),
        operator => {
            let left = infer_expression_type(&binary.left)?;
            let right = infer_expression_type(&binary.right)?;

            Ok(left.unify(right, operator)?)
        }
    }
}

/// Picks the JSON accessor for an unresolved property lookup given the type it is expected to
/// produce. Text reads through `->>`, text-convertible types read through `->>` and a cast,
/// unknown and `jsonb` stay on `->`, everything else reads through `->` and a cast.
pub fn rewrite_property_lookup(expression: Expression, hint: DataType) -> Expression {
    let binary = match expression {
        Expression::Binary(binary) if binary.operator == Operator::PropertyLookup => binary,
        other => return other,
    };

    let BinaryExpression { left, right, .. } = *binary;

    match hint {
        DataType::Text => Expression::binary(left, Operator::JsonTextField, right),

        hint if hint.text_convertible() => Expression::cast(
            Expression::binary(left, Operator::JsonTextField, right),
            hint,
        ),

        DataType::Unset | DataType::Unknown | DataType::Jsonb => {
            Expression::binary(left, Operator::JsonField, right)
        }

        hint => Expression::cast(Expression::binary(left, Operator::JsonField, right), hint),
    }
}

/// Resolves every property lookup left inside `expression` to a plain `->` accessor.
pub fn resolve_property_lookups(expression: Expression) -> Expression {
    match expression {
        Expression::Binary(binary) if binary.operator == Operator::PropertyLookup => {
            rewrite_property_lookup(Expression::Binary(binary), DataType::Unknown)
        }
        Expression::Binary(binary) => {
            let BinaryExpression {
                left,
                operator,
                right,
            } = *binary;
            Expression::binary(
                resolve_property_lookups(left),
                operator,
                resolve_property_lookups(right),
            )
        }
        Expression::Unary(unary) => {
            Expression::unary(unary.operator, resolve_property_lookups(unary.operand))
        }
        Expression::Parenthetical(inner) => {
            Expression::Parenthetical(Box::new(resolve_property_lookups(*inner)))
        }
        other => other,
    }
}

/// Type-hints the property lookups on either side of a binary expression from the type of the
/// opposite operand. Logical operators hint their operands as booleans.
pub fn apply_binary_type_hints(expression: Expression) -> Result<Expression, TranslationError> {
    let binary = match expression {
        Expression::Binary(binary) => binary,
        other => return Ok(other),
    };

    let BinaryExpression {
        left,
        operator,
        right,
    } = *binary;

    let (left, right) = match operator {
        Operator::And | Operator::Or => (
            rewrite_property_lookup(left, DataType::Boolean),
            rewrite_property_lookup(right, DataType::Boolean),
        ),

        Operator::PropertyLookup => (left, right),

        _ => match (left.is_property_lookup(), right.is_property_lookup()) {
            (true, false) => {
                let hint = infer_expression_type(&right)?;
                (rewrite_property_lookup(left, hint), right)
            }
            (false, true) => {
                let hint = infer_expression_type(&left)?;
                (left, rewrite_property_lookup(right, hint))
            }
            (true, true) => (
                rewrite_property_lookup(left, DataType::Unknown),
                rewrite_property_lookup(right, DataType::Unknown),
            ),
            (false, false) => (left, right),
        },
    };

    Ok(Expression::binary(left, operator, right))
}
