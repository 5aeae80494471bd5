//! Lowering of collected patterns, updates and projections into SQL.
//!
//! Every lowering step produces one common table expression. A step selects everything the
//! previous step (the scope frame) projected, joins in the node and edge rows it introduces and
//! projects them as composites, so the final select only ever reads from the last frame.

use crate::cypher::{self, Direction};
use crate::pgsql::{
    conjoin, functions, ArrayIndex, ArrayLiteral, Assignment, Between, CommonTableExpression,
    CompositeValue, DataType, Expression, FromClause, FunctionCall, Identifier, IdentifierSet,
    Join, Literal, Operator, Query, Select, SetExpression, SetOperation, TableAlias,
    TableReference, Update, Value, COLUMN_END_ID, COLUMN_ID, COLUMN_KIND_IDS, COLUMN_PROPERTIES,
    COLUMN_START_ID, EDGE_COLUMNS, NODE_COLUMNS, TABLE_EDGE, TABLE_NODE,
};

use super::constraints::Constraint;
use super::errors::TranslationError;
use super::inference::resolve_property_lookups;
use super::pattern::{Expansion, PatternPart, TraversalStep};
use super::rewrite::rewrite_frame_references;
use super::translator::{PendingUpdate, Translator};

// Columns of the recursive expansion CTE
const EXPANSION_ROOT_ID: &str = "root_id";
const EXPANSION_NEXT_ID: &str = "next_id";
const EXPANSION_DEPTH: &str = "depth";
const EXPANSION_SATISFIED: &str = "satisfied";
const EXPANSION_IS_CYCLE: &str = "is_cycle";
const EXPANSION_PATH: &str = "path";

const EXPANSION_COLUMNS: [&str; 6] = [
    EXPANSION_ROOT_ID,
    EXPANSION_NEXT_ID,
    EXPANSION_DEPTH,
    EXPANSION_SATISFIED,
    EXPANSION_IS_CYCLE,
    EXPANSION_PATH,
];

fn column(identifier: &Identifier, column: &str) -> Expression {
    Expression::compound([identifier.clone(), Identifier::from(column)])
}

fn equals(left: Expression, right: Expression) -> Expression {
    Expression::binary(left, Operator::Equals, right)
}

/// `(n.id, n.kind_ids, n.properties)::nodecomposite`, or the edge equivalent.
fn composite(identifier: &Identifier, data_type: DataType) -> Expression {
    let columns: &[&str] = if data_type.is_node() {
        &NODE_COLUMNS
    } else {
        &EDGE_COLUMNS
    };

    Expression::CompositeValue(CompositeValue {
        values: columns.iter().map(|name| column(identifier, name)).collect(),
        data_type: if data_type.is_node() {
            DataType::NodeComposite
        } else {
            DataType::EdgeComposite
        },
    })
}

/// Start and end columns of an edge read in `direction`.
fn direction_columns(
    edge: &Identifier,
    direction: Direction,
) -> Result<(&'static str, &'static str), TranslationError> {
    match direction {
        Direction::Outbound => Ok((COLUMN_START_ID, COLUMN_END_ID)),
        Direction::Inbound => Ok((COLUMN_END_ID, COLUMN_START_ID)),
        Direction::Both => Err(TranslationError::UnsupportedDirection {
            identifier: edge.to_string(),
            direction: "both".to_string(),
        }),
    }
}

fn only(identifier: &Identifier) -> IdentifierSet {
    IdentifierSet::from_iter([identifier.clone()])
}

/// Text literals go through `to_jsonb` so they are stored as JSON strings; other literals are
/// spelled as JSON directly.
fn jsonb_value(value: Expression) -> Expression {
    match value {
        Expression::Literal(Literal {
            value: Value::Text(text),
            ..
        }) => to_jsonb(Expression::cast(
            Expression::literal(text),
            DataType::Text,
        )),
        Expression::Literal(literal) if literal.value.is_null() => Expression::Literal(
            Literal::with_type(Value::text("null"), DataType::Jsonb),
        ),
        Expression::Literal(literal) => Expression::Literal(Literal::with_type(
            Value::Text(literal.value.to_json_string()),
            DataType::Jsonb,
        )),
        other => to_jsonb(resolve_property_lookups(other)),
    }
}

fn jsonb_merge_value(value: Expression) -> Expression {
    match value {
        literal @ Expression::Literal(Literal {
            value: Value::Map(_),
            ..
        }) => literal,
        parameter @ Expression::Parameter(_) => {
            Expression::cast(parameter, DataType::Jsonb)
        }
        other => to_jsonb(resolve_property_lookups(other)),
    }
}

fn to_jsonb(value: Expression) -> Expression {
    Expression::function(FunctionCall::new(
        functions::TO_JSONB,
        vec![value],
        DataType::Jsonb,
    ))
}

impl Translator<'_> {
    // ========================================================================
    // Frames
    // ========================================================================

    fn rewrite(&self, expression: Expression, materialized: &IdentifierSet) -> Expression {
        match self.scope.frame() {
            Some(frame) if !materialized.is_empty() => {
                rewrite_frame_references(expression, frame, materialized)
            }
            _ => expression,
        }
    }

    fn rewrite_constraint(
        &self,
        constraint: Constraint,
        materialized: &IdentifierSet,
    ) -> Option<Expression> {
        constraint
            .expression
            .map(|expression| self.rewrite(resolve_property_lookups(expression), materialized))
    }

    /// The previous frame as the first from clause of the next step.
    fn frame_from(&self) -> Vec<FromClause> {
        self.scope
            .frame()
            .map(|frame| vec![FromClause::new(TableReference::named(frame))])
            .unwrap_or_default()
    }

    /// Carries every materialized binding forward: `s.n0 as n0`.
    fn frame_projection(
        &self,
        materialized: &IdentifierSet,
        exclude: Option<&Identifier>,
    ) -> Vec<Expression> {
        let Some(frame) = self.scope.frame() else {
            return Vec::new();
        };

        materialized
            .iter()
            .filter(|identifier| Some(*identifier) != exclude)
            .map(|identifier| {
                Expression::aliased(
                    Expression::compound([frame.clone(), identifier.clone()]),
                    identifier.clone(),
                )
            })
            .collect()
    }

    fn table(&mut self, identifier: &Identifier) -> Result<TableReference, TranslationError> {
        self.scope
            .build_from_clauses(std::slice::from_ref(identifier))?
            .pop()
            .map(|clause| clause.source)
            .ok_or_else(|| TranslationError::UnsupportedFromClauseType {
                identifier: identifier.to_string(),
                data_type: DataType::Unknown,
            })
    }

    fn push_cte(
        &mut self,
        name: Identifier,
        shape: Option<Vec<Identifier>>,
        query: Query,
        projected: Option<&[Identifier]>,
    ) -> Result<(), TranslationError> {
        log::debug!("lowered step {}", name);

        self.ctes.push(CommonTableExpression {
            alias: TableAlias {
                name: name.clone(),
                shape,
            },
            query,
        });

        match projected {
            Some(projected) => self.scope.set_frame(&name, projected),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Patterns
    // ========================================================================

    pub(super) fn lower_pattern(&mut self) -> Result<(), TranslationError> {
        let pattern = std::mem::take(&mut self.pattern);

        for part in &pattern.parts {
            self.lower_pattern_part(part)?;
        }
        Ok(())
    }

    fn lower_pattern_part(&mut self, part: &PatternPart) -> Result<(), TranslationError> {
        if let Some(node) = &part.node_select {
            self.build_node_select(node)?;
        }

        for step in &part.traversal_steps {
            match &step.expansion {
                Some(expansion) => self.build_expansion_step(step, expansion)?,
                None => self.build_traversal_step(step)?,
            }
        }
        Ok(())
    }

    fn build_node_select(&mut self, node: &Identifier) -> Result<(), TranslationError> {
        if self.scope.is_materialized(node) {
            return Ok(());
        }

        let materialized = self.scope.materialized();
        self.scope.declare(node);

        let visible = self.scope.visible();
        let constraint = self.tree.consume_set(&visible);

        let mut from = self.frame_from();
        from.push(FromClause::new(self.table(node)?));

        let data_type = self.scope.lookup(node)?.data_type;
        let mut projection = self.frame_projection(&materialized, None);
        projection.push(Expression::aliased(composite(node, data_type), node.clone()));

        let select = Select {
            projection,
            from,
            where_clause: self.rewrite_constraint(constraint, &materialized),
            ..Default::default()
        };

        let mut projected = materialized.to_vec();
        projected.push(node.clone());
        self.push_cte(node.clone(), None, Query::new(select), Some(projected.as_slice()))
    }

    fn build_traversal_step(&mut self, step: &TraversalStep) -> Result<(), TranslationError> {
        let TraversalStep {
            left_node,
            edge,
            right_node,
            direction,
            ..
        } = step;

        let materialized = self.scope.materialized();
        let left_new = !self.scope.is_materialized(left_node);
        let right_new = !self.scope.is_materialized(right_node) && right_node != left_node;
        let (start_column, end_column) = direction_columns(edge, *direction)?;

        let mut left_constraint = Constraint::default();
        if left_new {
            self.scope.declare(left_node);
            left_constraint = self.tree.consume_set(&only(left_node));
        }

        self.scope.declare(edge);

        let mut right_constraint = Constraint::default();
        if right_new {
            self.scope.declare(right_node);
            right_constraint = self.tree.consume_set(&only(right_node));
        }

        let visible = self.scope.visible();
        let remaining = self.tree.consume_set(&visible);

        let edge_start = column(edge, start_column);
        let edge_end = column(edge, end_column);

        let mut predicates = Vec::new();
        let mut from = self.frame_from();

        let mut clause = if left_new {
            let mut clause = FromClause::new(self.table(left_node)?);
            clause.joins.push(Join::inner(
                self.table(edge)?,
                equals(column(left_node, COLUMN_ID), edge_start.clone()),
            ));
            clause
        } else {
            predicates.push(equals(edge_start.clone(), column(left_node, COLUMN_ID)));
            FromClause::new(self.table(edge)?)
        };

        if right_new {
            let join = conjoin(
                self.rewrite_constraint(right_constraint, &materialized)
                    .into_iter()
                    .chain([equals(column(right_node, COLUMN_ID), edge_end.clone())]),
            );

            if let Some(join) = join {
                clause.joins.push(Join::inner(self.table(right_node)?, join));
            }
        } else {
            predicates.push(equals(edge_end.clone(), column(right_node, COLUMN_ID)));
        }
        from.push(clause);

        let where_clause = conjoin(
            self.rewrite_constraint(left_constraint, &materialized)
                .into_iter()
                .chain(predicates.into_iter().map(|predicate| self.rewrite(predicate, &materialized)))
                .chain(self.rewrite_constraint(remaining, &materialized)),
        );

        let mut projection = self.frame_projection(&materialized, None);
        let mut projected = materialized.to_vec();

        if left_new {
            let data_type = self.scope.lookup(left_node)?.data_type;
            projection.push(Expression::aliased(
                composite(left_node, data_type),
                left_node.clone(),
            ));
            projected.push(left_node.clone());
        }

        projection.push(Expression::aliased(
            composite(edge, DataType::EdgeComposite),
            edge.clone(),
        ));
        projected.push(edge.clone());

        if right_new {
            let data_type = self.scope.lookup(right_node)?.data_type;
            projection.push(Expression::aliased(
                composite(right_node, data_type),
                right_node.clone(),
            ));
            projected.push(right_node.clone());
        }

        let select = Select {
            projection,
            from,
            where_clause,
            ..Default::default()
        };

        self.push_cte(edge.clone(), None, Query::new(select), Some(projected.as_slice()))
    }

    /// Lowers a variable-length hop into a recursive CTE over edges plus a step that joins the
    /// expansion's root, final edge and terminal node back into the frame.
    fn build_expansion_step(
        &mut self,
        step: &TraversalStep,
        expansion: &Expansion,
    ) -> Result<(), TranslationError> {
        let TraversalStep {
            left_node,
            edge,
            right_node,
            direction,
            ..
        } = step;
        let pattern = &expansion.identifier;

        let materialized = self.scope.materialized();
        let left_new = !self.scope.is_materialized(left_node);
        let right_new = !self.scope.is_materialized(right_node) && right_node != left_node;
        let (start_column, end_column) = direction_columns(edge, *direction)?;

        let min_depth = if expansion.min_depth < 1 {
            log::warn!(
                "expansion {} has a minimum depth of {}, treating it as 1",
                pattern,
                expansion.min_depth
            );
            1
        } else {
            expansion.min_depth
        };

        let mut left_constraint = Constraint::default();
        if left_new {
            self.scope.declare(left_node);
            left_constraint = self.tree.consume_set(&only(left_node));
        }

        self.scope.declare(edge);
        let edge_constraint = self
            .tree
            .consume_set(&only(edge))
            .expression
            .map(resolve_property_lookups);

        let mut right_constraint = None;
        if right_new {
            self.scope.declare(right_node);
            right_constraint = self
                .tree
                .consume_set(&only(right_node))
                .expression
                .map(resolve_property_lookups);
        }

        self.scope.declare(pattern);
        let visible = self.scope.visible();
        let remaining = self.tree.consume_set(&visible);

        let edge_start = column(edge, start_column);
        let edge_end = column(edge, end_column);
        let path = column(pattern, EXPANSION_PATH);

        // Primer: every first hop out of the root
        let mut primer_from = Vec::new();
        let mut primer_predicates = Vec::new();
        if left_new {
            let mut clause = FromClause::new(self.table(edge)?);
            let join = conjoin(
                self.rewrite_constraint(left_constraint, &materialized)
                    .into_iter()
                    .chain([equals(column(left_node, COLUMN_ID), edge_start.clone())]),
            );
            if let Some(join) = join {
                clause.joins.push(Join::inner(self.table(left_node)?, join));
            }
            primer_from.push(clause);
        } else {
            primer_from.extend(self.frame_from());
            primer_from.push(FromClause::new(self.table(edge)?));
            primer_predicates.push(self.rewrite(
                equals(edge_start.clone(), column(left_node, COLUMN_ID)),
                &materialized,
            ));
        }
        primer_predicates.extend(edge_constraint.clone());

        let primer = Select {
            projection: vec![
                edge_start.clone(),
                edge_end.clone(),
                Expression::literal(1i64),
                Expression::literal(false),
                equals(edge_start.clone(), edge_end.clone()),
                Expression::ArrayLiteral(ArrayLiteral {
                    values: vec![column(edge, COLUMN_ID)],
                    cast_type: DataType::Int8Array,
                }),
            ],
            from: primer_from,
            where_clause: conjoin(primer_predicates),
            ..Default::default()
        };

        // Recursive branch: extend every live row by one hop
        let mut recursive_from = FromClause::new(self.table(pattern)?);
        recursive_from.joins.push(Join::inner(
            self.table(edge)?,
            equals(edge_start.clone(), column(pattern, EXPANSION_NEXT_ID)),
        ));

        let satisfied = match &right_constraint {
            Some(constraint) => {
                recursive_from.joins.push(Join::inner(
                    self.table(right_node)?,
                    equals(column(right_node, COLUMN_ID), edge_end.clone()),
                ));
                if min_depth > 1 {
                    // a match below the minimum depth must keep expanding
                    Expression::binary(
                        constraint.clone(),
                        Operator::And,
                        Expression::binary(
                            Expression::binary(
                                column(pattern, EXPANSION_DEPTH),
                                Operator::Add,
                                Expression::literal(1i64),
                            ),
                            Operator::GreaterThanOrEqualTo,
                            Expression::literal(min_depth),
                        ),
                    )
                } else {
                    constraint.clone()
                }
            }
            None => Expression::literal(false),
        };

        let in_path = equals(
            column(edge, COLUMN_ID),
            Expression::any(path.clone(), DataType::Int8Array),
        );

        // an edge appears at most once per path
        let mut recursive_predicates = vec![
            Expression::not(column(pattern, EXPANSION_IS_CYCLE)),
            Expression::not(column(pattern, EXPANSION_SATISFIED)),
            Expression::not(in_path.clone()),
        ];
        recursive_predicates.extend(edge_constraint);
        if let Some(max_depth) = expansion.max_depth {
            recursive_predicates.push(Expression::binary(
                column(pattern, EXPANSION_DEPTH),
                Operator::LessThan,
                Expression::literal(max_depth),
            ));
        }

        let recursive = Select {
            projection: vec![
                column(pattern, EXPANSION_ROOT_ID),
                edge_end.clone(),
                Expression::binary(
                    column(pattern, EXPANSION_DEPTH),
                    Operator::Add,
                    Expression::literal(1i64),
                ),
                satisfied,
                in_path,
                Expression::binary(path.clone(), Operator::Concatenate, column(edge, COLUMN_ID)),
            ],
            from: vec![recursive_from],
            where_clause: conjoin(recursive_predicates),
            ..Default::default()
        };

        let expansion_query = Query::new(SetExpression::SetOperation(Box::new(SetOperation {
            left: primer.into(),
            operator: Operator::Union,
            all: false,
            right: recursive.into(),
        })));

        self.recursive = true;
        self.push_cte(
            pattern.clone(),
            Some(EXPANSION_COLUMNS.iter().map(|name| Identifier::from(*name)).collect()),
            expansion_query,
            None,
        )?;

        // Projection of the expansion into the frame
        let last_edge = Expression::ArrayIndex(Box::new(ArrayIndex {
            expression: path.clone(),
            indexes: vec![Expression::function(FunctionCall::new(
                functions::ARRAY_LENGTH,
                vec![path.clone(), Expression::literal(1i64)],
                DataType::Int4,
            ))],
        }));

        let mut clause = FromClause::new(self.table(pattern)?);
        clause.joins.push(Join::inner(
            self.table(edge)?,
            equals(column(edge, COLUMN_ID), last_edge),
        ));

        let mut predicates = Vec::new();
        if left_new {
            clause.joins.push(Join::inner(
                self.table(left_node)?,
                equals(column(left_node, COLUMN_ID), column(pattern, EXPANSION_ROOT_ID)),
            ));
        } else {
            predicates.push(equals(
                column(pattern, EXPANSION_ROOT_ID),
                column(left_node, COLUMN_ID),
            ));
        }

        if right_new {
            let join = conjoin(
                right_constraint
                    .into_iter()
                    .chain([equals(column(right_node, COLUMN_ID), edge_end.clone())]),
            );
            if let Some(join) = join {
                clause.joins.push(Join::inner(self.table(right_node)?, join));
            }
        } else {
            predicates.push(equals(edge_end.clone(), column(right_node, COLUMN_ID)));
        }

        let depth = column(pattern, EXPANSION_DEPTH);
        let depth_bound = match expansion.max_depth {
            Some(max_depth) => Some(Expression::Between(Box::new(Between {
                expression: depth,
                low: Expression::literal(min_depth),
                high: Expression::literal(max_depth),
            }))),
            None if min_depth > 1 => Some(Expression::binary(
                depth,
                Operator::GreaterThanOrEqualTo,
                Expression::literal(min_depth),
            )),
            None => None,
        };

        let mut from = self.frame_from();
        from.push(clause);

        let where_clause = conjoin(
            depth_bound
                .into_iter()
                .chain(predicates.into_iter().map(|predicate| self.rewrite(predicate, &materialized)))
                .chain(self.rewrite_constraint(remaining, &materialized)),
        );

        let mut projection = self.frame_projection(&materialized, None);
        let mut projected = materialized.to_vec();

        if left_new {
            projection.push(Expression::aliased(
                composite(left_node, DataType::NodeComposite),
                left_node.clone(),
            ));
            projected.push(left_node.clone());
        }

        let edges = Select {
            projection: vec![Expression::function(FunctionCall::new(
                functions::ARRAY_AGG,
                vec![composite(edge, DataType::EdgeComposite)],
                DataType::EdgeCompositeArray,
            ))],
            from: vec![FromClause::new(TableReference::bound(TABLE_EDGE, edge))],
            where_clause: Some(equals(
                column(edge, COLUMN_ID),
                Expression::any(path, DataType::Int8Array),
            )),
            ..Default::default()
        };
        projection.push(Expression::aliased(
            Expression::Subquery(Box::new(Query::new(edges))),
            edge.clone(),
        ));
        projected.push(edge.clone());

        if right_new {
            projection.push(Expression::aliased(
                composite(right_node, DataType::NodeComposite),
                right_node.clone(),
            ));
            projected.push(right_node.clone());
        }

        let select = Select {
            projection,
            from,
            where_clause,
            ..Default::default()
        };

        self.push_cte(edge.clone(), None, Query::new(select), Some(projected.as_slice()))?;

        self.scope.retype(edge, DataType::EdgeCompositeArray)?;
        for node in [left_node, right_node] {
            if self.scope.lookup(node)?.data_type.is_node() {
                self.scope.retype(node, DataType::NodeComposite)?;
            }
        }
        Ok(())
    }

    /// `(array[n0, n1]::nodecomposite[], array[e0]::edgecomposite[])::pathcomposite`. Expanded
    /// edges are already arrays and are concatenated in pattern order.
    pub(super) fn path_composite(
        &self,
        elements: &[Identifier],
    ) -> Result<Expression, TranslationError> {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut expanded = false;

        for element in elements {
            let data_type = self.scope.lookup(element)?.data_type;
            if data_type.is_node() {
                nodes.push(Expression::Identifier(element.clone()));
            } else if data_type == DataType::EdgeCompositeArray {
                expanded = true;
                edges.push((Expression::Identifier(element.clone()), true));
            } else if data_type.is_edge() {
                edges.push((Expression::Identifier(element.clone()), false));
            } else {
                return Err(TranslationError::unsupported_operand(element, "path element"));
            }
        }

        let edges = if expanded {
            edges
                .into_iter()
                .map(|(edge, is_array)| {
                    if is_array {
                        edge
                    } else {
                        Expression::ArrayLiteral(ArrayLiteral {
                            values: vec![edge],
                            cast_type: DataType::EdgeCompositeArray,
                        })
                    }
                })
                .reduce(|joined, next| Expression::binary(joined, Operator::Concatenate, next))
                .unwrap_or_else(|| {
                    Expression::ArrayLiteral(ArrayLiteral {
                        values: Vec::new(),
                        cast_type: DataType::EdgeCompositeArray,
                    })
                })
        } else {
            Expression::ArrayLiteral(ArrayLiteral {
                values: edges.into_iter().map(|(edge, _)| edge).collect(),
                cast_type: DataType::EdgeCompositeArray,
            })
        };

        Ok(Expression::CompositeValue(CompositeValue {
            values: vec![
                Expression::ArrayLiteral(ArrayLiteral {
                    values: nodes,
                    cast_type: DataType::NodeCompositeArray,
                }),
                edges,
            ],
            data_type: DataType::PathComposite,
        }))
    }

    // ========================================================================
    // Updates
    // ========================================================================

    pub(super) fn build_updates(&mut self) -> Result<(), TranslationError> {
        let updates = std::mem::take(&mut self.updates);

        for update in updates {
            self.build_update(update)?;
        }
        Ok(())
    }

    fn build_update(&mut self, update: PendingUpdate) -> Result<(), TranslationError> {
        let PendingUpdate {
            target,
            properties,
            merges,
            kinds,
        } = update;

        let data_type = self.scope.lookup(&target)?.data_type;
        let result_type = data_type.to_update_result_type().ok_or_else(|| {
            TranslationError::unsupported_operand(&target, format!("update of type {}", data_type))
        })?;

        if result_type == DataType::EdgeUpdateResult && !kinds.is_empty() {
            return Err(TranslationError::unsupported_operand(
                &target,
                "kind assignment on an edge",
            ));
        }

        if !self.scope.is_materialized(&target) {
            return Err(TranslationError::unknown_identifier(&target));
        }

        let materialized = self.scope.materialized();
        let updated = self.scope.define_new(result_type)?;
        self.scope.add_dependency(&updated, &target)?;

        let table = if result_type == DataType::NodeUpdateResult {
            TABLE_NODE
        } else {
            TABLE_EDGE
        };

        let mut assignments = Vec::new();

        if !properties.is_empty() || !merges.is_empty() {
            let mut value = column(&updated, COLUMN_PROPERTIES);

            for (key, assigned) in properties {
                let path = Expression::ArrayLiteral(ArrayLiteral {
                    values: vec![Expression::literal(key)],
                    cast_type: DataType::TextArray,
                });
                let assigned = jsonb_value(self.rewrite(assigned, &materialized));

                value = Expression::function(FunctionCall::new(
                    functions::JSONB_SET,
                    vec![value, path, assigned],
                    DataType::Jsonb,
                ));
            }

            for merged in merges {
                let merged = jsonb_merge_value(self.rewrite(merged, &materialized));
                value = Expression::binary(value, Operator::Concatenate, merged);
            }

            assignments.push(Assignment {
                column: Identifier::from(COLUMN_PROPERTIES),
                value,
            });
        }

        if !kinds.is_empty() {
            assignments.push(Assignment {
                column: Identifier::from(COLUMN_KIND_IDS),
                value: Expression::binary(
                    column(&updated, COLUMN_KIND_IDS),
                    Operator::Concatenate,
                    Expression::Literal(Literal::with_type(
                        Value::Int2Array(kinds),
                        DataType::Int2Array,
                    )),
                ),
            });
        }

        let where_clause = self.rewrite(
            equals(column(&target, COLUMN_ID), column(&updated, COLUMN_ID)),
            &materialized,
        );

        let mut returning = self.frame_projection(&materialized, Some(&target));
        returning.push(Expression::aliased(
            composite(&updated, data_type),
            target.clone(),
        ));

        let statement = Update {
            table: TableReference::bound(table, &updated),
            assignments,
            from: self.frame_from(),
            where_clause: Some(where_clause),
            returning,
        };

        let projected = materialized.to_vec();
        self.push_cte(updated, None, Query::new(statement), Some(projected.as_slice()))
    }

    // ========================================================================
    // Projection
    // ========================================================================

    pub(super) fn build_projection(
        &mut self,
        projection: &cypher::Projection,
    ) -> Result<(), TranslationError> {
        let materialized = self.scope.materialized();

        let items = std::mem::take(&mut self.projection)
            .into_iter()
            .map(|item| self.rewrite(item, &materialized))
            .collect();

        let remaining = self.tree.consume_all();
        let select = Select {
            distinct: projection.distinct,
            projection: items,
            from: self.frame_from(),
            where_clause: self.rewrite_constraint(remaining, &materialized),
            ..Default::default()
        };

        let mut query = Query::new(select);
        query.order_by = std::mem::take(&mut self.order_by)
            .into_iter()
            .map(|mut order| {
                order.expression = self.rewrite(order.expression, &materialized);
                order
            })
            .collect();

        if let Some(skip) = &projection.skip {
            query.offset = Some(self.translate_bound(skip, "skip")?);
        }
        if let Some(limit) = &projection.limit {
            query.limit = Some(self.translate_bound(limit, "limit")?);
        }

        self.body = Some(query);
        Ok(())
    }

    /// Wraps the accumulated steps around the projection. Queries without a `RETURN` select 1.
    pub(super) fn finish(&mut self) -> Query {
        let mut query = self.body.take().unwrap_or_else(|| {
            Query::new(Select {
                projection: vec![Expression::literal(1i64)],
                ..Default::default()
            })
        });

        let ctes = std::mem::take(&mut self.ctes);
        if !ctes.is_empty() {
            query.common_table_expressions = Some(crate::pgsql::With {
                recursive: self.recursive,
                expressions: ctes,
            });
        }
        query
    }
}
