//! Identifier reference extraction and scope-frame rewriting.

use crate::pgsql::{
    ArrayIndex, Between, BinaryExpression, CompoundIdentifier, Expression, Identifier, IdentifierSet, Query,
    SetExpression,
};

/// Collects the identifiers an expression reads from: bare identifiers and the root of every
/// compound identifier. Parameters are not references.
pub fn references(expression: &Expression) -> IdentifierSet {
    let mut found = IdentifierSet::new();
    collect_references(expression, &mut found);
    found
}

fn collect_references(expression: &Expression, found: &mut IdentifierSet) {
    match expression {
        Expression::Identifier(identifier) => {
            found.add(identifier.clone());
        }
        Expression::CompoundIdentifier(identifier) => {
            if let Some(root) = identifier.root() {
                found.add(root.clone());
            }
        }
        Expression::Binary(binary) => {
            collect_references(&binary.left, found);
            collect_references(&binary.right, found);
        }
        Expression::Unary(unary) => collect_references(&unary.operand, found),
        Expression::FunctionCall(call) => {
            for parameter in &call.parameters {
                collect_references(parameter, found);
            }
        }
        Expression::TypeCast(cast) => collect_references(&cast.expression, found),
        Expression::ArrayLiteral(array) => {
            for value in &array.values {
                collect_references(value, found);
            }
        }
        Expression::ArrayIndex(index) => {
            collect_references(&index.expression, found);
            for subscript in &index.indexes {
                collect_references(subscript, found);
            }
        }
        Expression::ArrayExpression(query) | Expression::Subquery(query) => {
            collect_query_references(query, found)
        }
        Expression::CompositeValue(composite) => {
            for value in &composite.values {
                collect_references(value, found);
            }
        }
        Expression::Any(any) => collect_references(&any.expression, found),
        Expression::RowColumnReference(reference) => {
            collect_references(&reference.reference, found)
        }
        Expression::Parenthetical(inner) => collect_references(inner, found),
        Expression::Between(between) => {
            collect_references(&between.expression, found);
            collect_references(&between.low, found);
            collect_references(&between.high, found);
        }
        Expression::Aliased(aliased) => collect_references(&aliased.expression, found),
        Expression::Literal(_) | Expression::Parameter(_) | Expression::Wildcard => {}
    }
}

/// References of a correlated subquery: whatever its select reads that its own from clauses
/// do not bind.
fn collect_query_references(query: &Query, found: &mut IdentifierSet) {
    let SetExpression::Select(select) = &query.body else {
        return;
    };

    let mut inner = IdentifierSet::new();
    for projection in &select.projection {
        collect_references(projection, &mut inner);
    }
    if let Some(where_clause) = &select.where_clause {
        collect_references(where_clause, &mut inner);
    }

    for from in &select.from {
        let bound = from
            .source
            .binding
            .iter()
            .chain(from.joins.iter().filter_map(|join| join.table.binding.as_ref()));
        for binding in bound {
            inner.remove(binding);
        }
    }

    found.add_set(&inner);
}

/// Redirects references to bindings already materialized in the scope frame so they read from
/// the frame's columns: `n0` becomes `s.n0` and `n0.id` becomes `(s.n0).id`.
pub fn rewrite_frame_references(
    expression: Expression,
    frame: &Identifier,
    materialized: &IdentifierSet,
) -> Expression {
    let rewrite = |expression| rewrite_frame_references(expression, frame, materialized);

    match expression {
        Expression::Identifier(identifier) if materialized.contains(&identifier) => {
            Expression::CompoundIdentifier(CompoundIdentifier(vec![frame.clone(), identifier]))
        }

        Expression::CompoundIdentifier(identifier)
            if identifier.len() == 2
                && identifier.root().is_some_and(|root| materialized.contains(root)) =>
        {
            let mut parts = identifier.0.into_iter();
            match (parts.next(), parts.next()) {
                (Some(root), Some(column)) => Expression::row_column(
                    Expression::CompoundIdentifier(CompoundIdentifier(vec![frame.clone(), root])),
                    column,
                ),
                _ => Expression::CompoundIdentifier(CompoundIdentifier(Vec::new())),
            }
        }

        Expression::Binary(binary) => {
            let BinaryExpression {
                left,
                operator,
                right,
            } = *binary;
            Expression::binary(rewrite(left), operator, rewrite(right))
        }

        Expression::Unary(unary) => Expression::unary(unary.operator, rewrite(unary.operand)),

        Expression::FunctionCall(mut call) => {
            call.parameters = call.parameters.into_iter().map(rewrite).collect();
            Expression::FunctionCall(call)
        }

        Expression::TypeCast(cast) => Expression::cast(rewrite(cast.expression), cast.cast_type),

        Expression::ArrayLiteral(mut array) => {
            array.values = array.values.into_iter().map(rewrite).collect();
            Expression::ArrayLiteral(array)
        }

        Expression::ArrayIndex(index) => {
            let ArrayIndex {
                expression,
                indexes,
            } = *index;
            Expression::ArrayIndex(Box::new(ArrayIndex {
                expression: rewrite(expression),
                indexes: indexes.into_iter().map(rewrite).collect(),
            }))
        }

        Expression::ArrayExpression(query) => {
            Expression::ArrayExpression(Box::new(rewrite_query(*query, frame, materialized)))
        }

        Expression::Subquery(query) => {
            Expression::Subquery(Box::new(rewrite_query(*query, frame, materialized)))
        }

        Expression::CompositeValue(mut composite) => {
            composite.values = composite.values.into_iter().map(rewrite).collect();
            Expression::CompositeValue(composite)
        }

        Expression::Any(any) => Expression::any(rewrite(any.expression), any.cast_type),

        Expression::RowColumnReference(reference) => {
            Expression::row_column(rewrite(reference.reference), reference.column)
        }

        Expression::Parenthetical(inner) => Expression::Parenthetical(Box::new(rewrite(*inner))),

        Expression::Between(between) => {
            let Between {
                expression,
                low,
                high,
            } = *between;
            Expression::Between(Box::new(Between {
                expression: rewrite(expression),
                low: rewrite(low),
                high: rewrite(high),
            }))
        }

        Expression::Aliased(aliased) => {
            Expression::aliased(rewrite(aliased.expression), aliased.alias)
        }

        other => other,
    }
}

fn rewrite_query(mut query: Query, frame: &Identifier, materialized: &IdentifierSet) -> Query {
    if let SetExpression::Select(select) = &mut query.body {
        let mut shadowed = materialized.clone();
        for from in &select.from {
            if let Some(binding) = &from.source.binding {
                shadowed.remove(binding);
            }
            for join in &from.joins {
                if let Some(binding) = &join.table.binding {
                    shadowed.remove(binding);
                }
            }
        }

        select.projection = std::mem::take(&mut select.projection)
            .into_iter()
            .map(|projection| rewrite_frame_references(projection, frame, &shadowed))
            .collect();
        select.where_clause = select
            .where_clause
            .take()
            .map(|where_clause| rewrite_frame_references(where_clause, frame, &shadowed));
    }

    query
}
