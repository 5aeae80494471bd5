//! Dependency-keyed constraint bookkeeping.
//!
//! Every extracted predicate is filed under the set of identifiers it reads. When a pattern step
//! lowers to SQL it claims the constraints its visible bindings can satisfy, leaving the rest for
//! later steps or the final projection.

use crate::pgsql::{conjoin, Expression, IdentifierSet, Operator};

use super::errors::TranslationError;
use super::inference::apply_binary_type_hints;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraint {
    pub dependencies: IdentifierSet,
    pub expression: Option<Expression>,
}

impl Constraint {
    pub fn is_empty(&self) -> bool {
        self.expression.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintTracker {
    constraints: Vec<Constraint>,
}

impl ConstraintTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files `expression` under `dependencies`, conjoining it onto any constraint already held
    /// for the same dependency set.
    pub fn constrain(
        &mut self,
        dependencies: IdentifierSet,
        expression: Expression,
    ) -> Result<(), TranslationError> {
        if let Some(existing) = self
            .constraints
            .iter_mut()
            .find(|constraint| constraint.dependencies.matches(&dependencies))
        {
            let merged = match existing.expression.take() {
                Some(current) => {
                    apply_binary_type_hints(Expression::binary(current, Operator::And, expression))?
                }
                None => expression,
            };

            existing.expression = Some(merged);
            return Ok(());
        }

        self.constraints.push(Constraint {
            dependencies,
            expression: Some(expression),
        });
        Ok(())
    }

    /// Removes and returns every constraint whose dependencies are all present in `scope`,
    /// conjoined in the order they were filed. Unsatisfied constraints keep their order.
    pub fn consume_set(&mut self, scope: &IdentifierSet) -> Constraint {
        let (taken, kept): (Vec<Constraint>, Vec<Constraint>) = std::mem::take(&mut self.constraints)
            .into_iter()
            .partition(|constraint| constraint.dependencies.satisfied_by(scope));

        self.constraints = kept;
        merge(taken)
    }

    /// Removes and returns every remaining constraint.
    pub fn consume_all(&mut self) -> Constraint {
        merge(std::mem::take(&mut self.constraints))
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }
}

fn merge(constraints: Vec<Constraint>) -> Constraint {
    let mut dependencies = IdentifierSet::new();
    let mut expressions = Vec::with_capacity(constraints.len());

    for constraint in constraints {
        dependencies.add_set(&constraint.dependencies);
        expressions.extend(constraint.expression);
    }

    Constraint {
        dependencies,
        expression: conjoin(expressions),
    }
}
