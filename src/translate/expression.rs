//! Shift/reduce builder for SQL expressions.
//!
//! The driver pushes operands as it leaves leaf nodes and announces operators on the way into
//! their nodes. Reducing an operator pops its operands and pushes the combined expression back.
//! Top-level conjunctions are not combined: each side is split off into the constraint tracker
//! under the identifiers it reads, so that later pattern lowering can attach every filter to
//! the earliest join that binds all of its dependencies.

use crate::cypher::CypherOperator;
use crate::pgsql::{
    functions, BinaryExpression, DataType, Expression, FunctionCall, IdentifierSet, Literal,
    Operator, Query, Select, Value,
};

use super::constraints::{Constraint, ConstraintTracker};
use super::errors::TranslationError;
use super::inference::{
    apply_binary_type_hints, infer_expression_type, resolve_property_lookups,
    rewrite_property_lookup,
};
use super::rewrite::references;

impl From<CypherOperator> for Operator {
    fn from(operator: CypherOperator) -> Self {
        match operator {
            CypherOperator::Equals => Operator::Equals,
            CypherOperator::NotEquals => Operator::NotEquals,
            CypherOperator::LessThan => Operator::LessThan,
            CypherOperator::LessThanOrEqualTo => Operator::LessThanOrEqualTo,
            CypherOperator::GreaterThan => Operator::GreaterThan,
            CypherOperator::GreaterThanOrEqualTo => Operator::GreaterThanOrEqualTo,
            CypherOperator::StartsWith => Operator::StartsWith,
            CypherOperator::EndsWith => Operator::EndsWith,
            CypherOperator::Contains => Operator::Contains,
            CypherOperator::In => Operator::In,
            CypherOperator::Is => Operator::Is,
            CypherOperator::IsNot => Operator::IsNot,
            CypherOperator::RegexMatch => Operator::RegexMatch,
            CypherOperator::Add => Operator::Add,
            CypherOperator::Subtract => Operator::Subtract,
            CypherOperator::Multiply => Operator::Multiply,
            CypherOperator::Divide => Operator::Divide,
            CypherOperator::Modulo => Operator::Modulo,
            CypherOperator::Power => Operator::Power,
        }
    }
}

#[derive(Debug, Default)]
pub struct ExpressionTreeTranslator {
    operands: Vec<Expression>,
    conjunction_depth: usize,
    disjunction_depth: usize,
    nesting_depth: usize,
    constraints: ConstraintTracker,
}

impl ExpressionTreeTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Operand stack
    // ========================================================================

    pub fn push(&mut self, operand: Expression) {
        log::trace!("push operand {:?}", operand);
        self.operands.push(operand);
    }

    pub fn pop(&mut self) -> Result<Expression, TranslationError> {
        self.operands
            .pop()
            .ok_or(TranslationError::EmptyExpressionStack)
    }

    pub fn peek(&self) -> Option<&Expression> {
        self.operands.last()
    }

    pub fn depth(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// Announces an operator on entry to its node.
    pub fn push_operator(&mut self, operator: Operator) {
        match operator {
            Operator::And => self.conjunction_depth += 1,
            Operator::Or => self.disjunction_depth += 1,
            _ => {}
        }
    }

    /// Reduces the operands of `operator` on exit from its node.
    pub fn pop_push_operator(&mut self, operator: Operator) -> Result<(), TranslationError> {
        match operator {
            Operator::And => {
                self.conjunction_depth = self.conjunction_depth.saturating_sub(1);

                if self.disjunction_depth == 0 && self.nesting_depth == 0 {
                    self.extract_conjunction()
                } else {
                    self.pop_push_binary_expression(Operator::And)
                }
            }

            Operator::Or => {
                self.disjunction_depth = self.disjunction_depth.saturating_sub(1);
                self.pop_push_binary_expression(Operator::Or)
            }

            Operator::PropertyLookup => {
                let right = self.pop()?;
                let left = self.pop()?;

                self.push(Expression::binary(left, Operator::PropertyLookup, right));
                Ok(())
            }

            operator => self.pop_push_binary_expression(operator),
        }
    }

    /// Reduces a unary operator over the top operand.
    pub fn pop_push_unary(&mut self, operator: Operator) -> Result<(), TranslationError> {
        let operand = self.pop()?;

        let operand = match operator {
            Operator::Not => rewrite_property_lookup(operand, DataType::Boolean),
            _ => resolve_property_lookups(operand),
        };

        self.push(Expression::unary(operator, operand));
        Ok(())
    }

    /// Marks entry into a sub-expression that must stay whole: negations, function arguments,
    /// projections. Conjunctions inside it are combined instead of extracted.
    pub fn enter_nested(&mut self) {
        self.nesting_depth += 1;
    }

    pub fn exit_nested(&mut self) {
        self.nesting_depth = self.nesting_depth.saturating_sub(1);
    }

    fn extract_conjunction(&mut self) -> Result<(), TranslationError> {
        let right = self.pop()?;
        let left = self.operands.pop();

        if let Some(left) = left {
            self.constrain_operand(left)?;
        }
        self.constrain_operand(right)
    }

    fn constrain_operand(&mut self, operand: Expression) -> Result<(), TranslationError> {
        let operand = rewrite_property_lookup(operand, DataType::Boolean);
        let dependencies = references(&operand);

        log::debug!("extracted constraint over {}", dependencies);
        self.constraints.constrain(dependencies, operand)
    }

    /// Combines the top two operands with `operator`, rewriting Cypher-only operators into
    /// their SQL form and hinting any unresolved property lookups.
    pub fn pop_push_binary_expression(
        &mut self,
        operator: Operator,
    ) -> Result<(), TranslationError> {
        let right = self.pop()?;
        let left = self.pop()?;

        let expression = match operator {
            Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
                rewrite_like(operator, left, right)?
            }

            Operator::Is | Operator::IsNot => rewrite_null_test(operator, left, right)?,

            Operator::In => rewrite_membership(left, right)?,

            operator => apply_binary_type_hints(Expression::binary(left, operator, right))?,
        };

        self.push(expression);
        Ok(())
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    pub fn constrain(
        &mut self,
        dependencies: IdentifierSet,
        expression: Expression,
    ) -> Result<(), TranslationError> {
        self.constraints.constrain(dependencies, expression)
    }

    /// Moves every operand left on the stack into the constraint tracker, in push order.
    pub fn constrain_remaining_operands(&mut self) -> Result<(), TranslationError> {
        let remaining = std::mem::take(&mut self.operands);

        for operand in remaining {
            self.constrain_operand(operand)?;
        }
        Ok(())
    }

    pub fn consume_set(&mut self, scope: &IdentifierSet) -> Constraint {
        self.constraints.consume_set(scope)
    }

    pub fn consume_all(&mut self) -> Constraint {
        self.constraints.consume_all()
    }

    pub fn constraints(&self) -> &ConstraintTracker {
        &self.constraints
    }
}

fn rewrite_like(
    operator: Operator,
    left: Expression,
    right: Expression,
) -> Result<Expression, TranslationError> {
    let pattern = match right {
        Expression::Literal(Literal {
            value: Value::Text(text),
            ..
        }) => {
            let pattern = match operator {
                Operator::StartsWith => format!("{}%", text),
                Operator::EndsWith => format!("%{}", text),
                _ => format!("%{}%", text),
            };
            Expression::literal(pattern)
        }

        right if right.is_property_lookup() || infer_expression_type(&right)? == DataType::Text => {
            let right = rewrite_property_lookup(right, DataType::Text);
            let wildcard = || Expression::literal("%");

            match operator {
                Operator::StartsWith => Expression::binary(right, Operator::Concatenate, wildcard()),
                Operator::EndsWith => Expression::binary(wildcard(), Operator::Concatenate, right),
                _ => Expression::binary(
                    Expression::binary(wildcard(), Operator::Concatenate, right),
                    Operator::Concatenate,
                    wildcard(),
                ),
            }
        }

        right => {
            return Err(TranslationError::unsupported_operand(
                right,
                format!("right operand of {}", operator),
            ))
        }
    };

    Ok(Expression::binary(
        rewrite_property_lookup(left, DataType::Text),
        Operator::Like,
        pattern,
    ))
}

/// Property bags are schemaless, so a null property is an absent key.
fn rewrite_null_test(
    operator: Operator,
    left: Expression,
    right: Expression,
) -> Result<Expression, TranslationError> {
    let is_null = matches!(&right, Expression::Literal(literal) if literal.value.is_null());

    if !(is_null && left.is_property_lookup()) {
        return apply_binary_type_hints(Expression::binary(left, operator, right));
    }

    let existence = match left {
        Expression::Binary(lookup) => {
            let BinaryExpression {
                left: container,
                right: field,
                ..
            } = *lookup;
            Expression::binary(container, Operator::JsonbFieldExists, field)
        }
        other => other,
    };

    Ok(match operator {
        Operator::Is => Expression::not(existence),
        _ => existence,
    })
}

fn rewrite_membership(left: Expression, right: Expression) -> Result<Expression, TranslationError> {
    if right.is_property_lookup() {
        let element_type = match infer_expression_type(&left)? {
            DataType::Unset | DataType::Unknown => DataType::Text,
            inferred => inferred,
        };
        let array_type = element_type.to_array_type()?;

        let elements = Expression::function(FunctionCall::new(
            functions::JSONB_ARRAY_ELEMENTS_TEXT,
            vec![rewrite_property_lookup(right, DataType::Jsonb)],
            DataType::Text,
        ));
        let unnested = Select {
            projection: vec![Expression::cast(elements, element_type)],
            ..Default::default()
        };
        let array = Expression::cast(
            Expression::ArrayExpression(Box::new(Query::new(unnested))),
            array_type,
        );

        return Ok(Expression::binary(
            rewrite_property_lookup(left, element_type),
            Operator::Equals,
            Expression::any(array, array_type),
        ));
    }

    let right_type = infer_expression_type(&right)?;
    if right_type.is_array() {
        let base_type = right_type.array_base_type()?;

        return Ok(Expression::binary(
            rewrite_property_lookup(left, base_type),
            Operator::Equals,
            Expression::any(right, right_type),
        ));
    }

    let left_type = infer_expression_type(&left)?;
    Ok(match left_type.to_array_type() {
        Ok(array_type) => Expression::binary(
            left,
            Operator::Equals,
            Expression::any(Expression::cast(right, array_type), array_type),
        ),
        Err(_) => Expression::binary(
            resolve_property_lookups(left),
            Operator::Equals,
            Expression::any(right, DataType::Unknown),
        ),
    })
}
