//! The AST-walking driver.
//!
//! The translator keeps an explicit state stack mirroring the clause it is inside. Every exit
//! pops the state its enter pushed and fails with `StateMismatch` otherwise, which is what
//! rejects malformed or partially visited trees. Expression leaves are only accepted inside a
//! `NestedExpression` state.

use std::fmt;

use crate::cypher::{
    self, walk, Direction, NodePattern, Node, RegularQuery, RelationshipPattern, SetItem, Visitor,
};
use crate::pgsql::{
    value_to_data_type, ArrayLiteral, CommonTableExpression, DataType, Expression, Identifier,
    IdentifierSet, Literal, Operator, OrderBy, Query, Statement, Value, COLUMN_KIND_ID,
    COLUMN_KIND_IDS, COLUMN_PROPERTIES,
};

use super::errors::TranslationError;
use super::expression::ExpressionTreeTranslator;
use super::functions::{self, FunctionContext};
use super::inference::{infer_expression_type, resolve_property_lookups, rewrite_property_lookup};
use super::kinds::KindMapper;
use super::pattern::{Expansion, Pattern, PatternPart};
use super::rewrite::references;
use super::scope::Scope;
use super::TranslatedStatement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    Match,
    PatternPart,
    Where,
    Projection,
    OrderBy,
    Update,
    NestedExpression,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Start => "start",
            State::Match => "match",
            State::PatternPart => "pattern part",
            State::Where => "where",
            State::Projection => "projection",
            State::OrderBy => "order by",
            State::Update => "update",
            State::NestedExpression => "nested expression",
        };
        f.write_str(name)
    }
}

/// Property and kind assignments collected for one `SET` target.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct PendingUpdate {
    pub target: Identifier,
    pub properties: Vec<(String, Expression)>,
    pub merges: Vec<Expression>,
    pub kinds: Vec<i16>,
}

/// Translates one query. Instances are single use.
pub struct Translator<'k> {
    kinds: &'k dyn KindMapper,
    functions: FunctionContext,
    states: Vec<State>,
    element: Option<Identifier>,
    pub(super) scope: Scope,
    pub(super) tree: ExpressionTreeTranslator,
    pub(super) pattern: Pattern,
    pub(super) projection: Vec<Expression>,
    pub(super) order_by: Vec<OrderBy>,
    pub(super) updates: Vec<PendingUpdate>,
    pub(super) ctes: Vec<CommonTableExpression>,
    pub(super) recursive: bool,
    pub(super) body: Option<Query>,
}

impl<'k> Translator<'k> {
    pub fn new(kinds: &'k dyn KindMapper, functions: FunctionContext) -> Self {
        Translator {
            kinds,
            functions,
            states: Vec::new(),
            element: None,
            scope: Scope::new(),
            tree: ExpressionTreeTranslator::new(),
            pattern: Pattern::default(),
            projection: Vec::new(),
            order_by: Vec::new(),
            updates: Vec::new(),
            ctes: Vec::new(),
            recursive: false,
            body: None,
        }
    }

    pub fn translate(mut self, query: &RegularQuery) -> Result<TranslatedStatement, TranslationError> {
        walk(query, &mut self)?;

        let query = self.finish();
        log::debug!("translated query with {} common table expressions", query.ctes().len());

        Ok(TranslatedStatement {
            statement: Statement::Query(query),
            parameters: self.scope.parameters(),
        })
    }

    // ========================================================================
    // State stack
    // ========================================================================

    fn current_state(&self) -> Option<State> {
        self.states.last().copied()
    }

    fn state_name(&self) -> String {
        self.current_state()
            .map(|state| state.to_string())
            .unwrap_or_else(|| "none".to_string())
    }

    fn push_state(&mut self, state: State) {
        log::trace!("enter state {}", state);
        self.states.push(state);
    }

    fn pop_state(&mut self, expected: State) -> Result<(), TranslationError> {
        match self.states.pop() {
            Some(state) if state == expected => {
                log::trace!("exit state {}", state);
                Ok(())
            }
            found => Err(TranslationError::StateMismatch {
                expected: expected.to_string(),
                found: found
                    .map(|state| state.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            }),
        }
    }

    fn expect_state(&self, expected: State, node: Node<'_>) -> Result<(), TranslationError> {
        if self.current_state() == Some(expected) {
            Ok(())
        } else {
            Err(TranslationError::InvalidState {
                state: self.state_name(),
                node: node.kind().to_string(),
            })
        }
    }

    fn enter_nested_expression(&mut self, nest: bool) {
        self.push_state(State::NestedExpression);
        if nest {
            self.tree.enter_nested();
        }
    }

    fn exit_nested_expression(&mut self, nest: bool) -> Result<(), TranslationError> {
        if nest {
            self.tree.exit_nested();
        }
        self.pop_state(State::NestedExpression)
    }

    // ========================================================================
    // Patterns
    // ========================================================================

    fn current_part(&mut self, node: Node<'_>) -> Result<&mut PatternPart, TranslationError> {
        let state = self.state_name();
        self.pattern
            .current_part()
            .ok_or_else(|| TranslationError::InvalidState {
                state,
                node: node.kind().to_string(),
            })
    }

    fn enter_node_pattern(
        &mut self,
        node: Node<'_>,
        pattern: &NodePattern,
    ) -> Result<(), TranslationError> {
        let expanding = self.current_part(node)?.expanding();

        let identifier = match &pattern.binding {
            Some(name) if self.scope.is_aliased(name) => {
                let binding = self.scope.lookup_alias(name)?;
                if !binding.data_type.is_node() {
                    return Err(TranslationError::unsupported_operand(
                        name,
                        format!("node pattern over a binding of type {}", binding.data_type),
                    ));
                }
                binding.identifier.clone()
            }
            binding => {
                let data_type = if expanding {
                    DataType::ExpansionTerminalNode
                } else {
                    DataType::NodeComposite
                };

                let identifier = self.scope.define_new(data_type)?;
                if let Some(name) = binding {
                    self.scope.alias(name.clone(), &identifier)?;
                }
                identifier
            }
        };

        if !pattern.kinds.is_empty() {
            let data_type = self.scope.lookup(&identifier)?.data_type;
            let constraint = self.kind_constraint(&identifier, data_type, &pattern.kinds)?;
            self.tree
                .constrain(IdentifierSet::from_iter([identifier.clone()]), constraint)?;
        }

        self.element = Some(identifier.clone());
        self.current_part(node)?.add_node(identifier);
        Ok(())
    }

    fn enter_relationship_pattern(
        &mut self,
        node: Node<'_>,
        pattern: &RelationshipPattern,
    ) -> Result<(), TranslationError> {
        if pattern.direction == Direction::Both {
            return Err(TranslationError::UnsupportedDirection {
                identifier: pattern
                    .binding
                    .clone()
                    .unwrap_or_else(|| "anonymous relationship".to_string()),
                direction: "both".to_string(),
            });
        }

        if let Some(name) = &pattern.binding {
            if self.scope.is_aliased(name) {
                return Err(TranslationError::RelationshipRebinding {
                    identifier: name.clone(),
                });
            }
        }

        let root = self.current_part(node)?.last_node().cloned();

        let expansion = match &pattern.range {
            Some(range) => Some(Expansion {
                identifier: self.scope.define_new(DataType::ExpansionPattern)?,
                min_depth: range.start_index.unwrap_or(1),
                max_depth: range.end_index,
            }),
            None => None,
        };

        let edge = if expansion.is_some() {
            self.scope.define_new(DataType::ExpansionEdge)?
        } else {
            self.scope.define_new(DataType::EdgeComposite)?
        };
        if let Some(name) = &pattern.binding {
            self.scope.alias(name.clone(), &edge)?;
        }

        if let Some(expansion) = &expansion {
            self.scope.add_dependency(&expansion.identifier, &edge)?;

            if let Some(root) = &root {
                self.scope.add_dependency(&edge, root)?;

                let binding = self.scope.lookup(root)?;
                if binding.data_type == DataType::NodeComposite && !binding.is_materialized() {
                    self.scope.retype(root, DataType::ExpansionRootNode)?;
                }
            }
        }

        if !pattern.kinds.is_empty() {
            let data_type = self.scope.lookup(&edge)?.data_type;
            let constraint = self.kind_constraint(&edge, data_type, &pattern.kinds)?;
            self.tree
                .constrain(IdentifierSet::from_iter([edge.clone()]), constraint)?;
        }

        self.element = Some(edge.clone());
        self.current_part(node)?
            .add_edge(edge, pattern.direction, expansion);
        Ok(())
    }

    fn exit_pattern_part(&mut self, node: Node<'_>) -> Result<(), TranslationError> {
        let part = self.current_part(node)?;
        part.finish();

        let path = part.path_binding.clone();
        let elements = part.elements();

        if let Some(path) = path {
            for element in &elements {
                self.scope.add_dependency(&path, element)?;
            }
        }
        Ok(())
    }

    fn exit_property_matcher(&mut self, key: &str) -> Result<(), TranslationError> {
        let value = self.tree.pop()?;
        let element = self
            .element
            .clone()
            .ok_or_else(|| TranslationError::InvalidState {
                state: self.state_name(),
                node: "property matcher".to_string(),
            })?;

        self.tree.push(Expression::binary(
            Expression::compound([element, Identifier::from(COLUMN_PROPERTIES)]),
            Operator::PropertyLookup,
            Expression::literal(key),
        ));
        self.tree.push(value);
        self.tree.pop_push_binary_expression(Operator::Equals)?;

        let constraint = self.tree.pop()?;
        self.tree.constrain(references(&constraint), constraint)
    }

    /// `n:Kind` for nodes overlaps the kind id array, `r:Kind` for edges tests the kind id.
    fn kind_constraint(
        &self,
        identifier: &Identifier,
        data_type: DataType,
        kinds: &[String],
    ) -> Result<Expression, TranslationError> {
        let (ids, missing) = self.kinds.map_kinds(kinds);
        if !missing.is_empty() {
            return Err(TranslationError::UnmappedKind { kinds: missing });
        }

        let kind_ids = Expression::Literal(Literal::with_type(
            Value::Int2Array(ids),
            DataType::Int2Array,
        ));

        if data_type.is_node() {
            Ok(Expression::binary(
                Expression::compound([identifier.clone(), Identifier::from(COLUMN_KIND_IDS)]),
                Operator::PgArrayOverlap,
                kind_ids,
            ))
        } else if data_type.is_edge() {
            Ok(Expression::binary(
                Expression::compound([identifier.clone(), Identifier::from(COLUMN_KIND_ID)]),
                Operator::Equals,
                Expression::any(kind_ids, DataType::Int2Array),
            ))
        } else {
            Err(TranslationError::unsupported_operand(
                identifier,
                format!("kind matcher over type {}", data_type),
            ))
        }
    }

    // ========================================================================
    // Updates
    // ========================================================================

    fn resolve_variable(&self, atom: &cypher::Expression) -> Result<Identifier, TranslationError> {
        match atom {
            cypher::Expression::Variable(variable) => {
                Ok(self.scope.lookup_alias(&variable.symbol)?.identifier.clone())
            }
            other => Err(TranslationError::unsupported_operand(other, "update target")),
        }
    }

    fn pending_update(&mut self, target: Identifier) -> &mut PendingUpdate {
        let index = match self.updates.iter().position(|update| update.target == target) {
            Some(index) => index,
            None => {
                self.updates.push(PendingUpdate {
                    target,
                    properties: Vec::new(),
                    merges: Vec::new(),
                    kinds: Vec::new(),
                });
                self.updates.len() - 1
            }
        };

        &mut self.updates[index]
    }

    fn exit_set_item(&mut self, item: &SetItem) -> Result<(), TranslationError> {
        match item {
            SetItem::Property { lookup, .. } => {
                self.exit_nested_expression(true)?;
                let value = self.tree.pop()?;
                let target = self.resolve_variable(&lookup.atom)?;

                let key = match lookup.symbols.as_slice() {
                    [key] => key.clone(),
                    symbols => {
                        return Err(TranslationError::unsupported_operand(
                            symbols,
                            "property assignment",
                        ))
                    }
                };

                self.pending_update(target).properties.push((key, value));
            }

            SetItem::Merge { variable, .. } => {
                self.exit_nested_expression(true)?;
                let value = self.tree.pop()?;
                let target = self.scope.lookup_alias(variable)?.identifier.clone();

                self.pending_update(target).merges.push(value);
            }

            SetItem::Labels { variable, kinds } => {
                let target = self.scope.lookup_alias(variable)?.identifier.clone();
                let (ids, missing) = self.kinds.map_kinds(kinds);
                if !missing.is_empty() {
                    return Err(TranslationError::UnmappedKind { kinds: missing });
                }

                self.pending_update(target).kinds.extend(ids);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Composite expressions that must reduce as a whole: their conjunctions are not split.
    fn nests(expression: &cypher::Expression) -> bool {
        !matches!(
            expression,
            cypher::Expression::Conjunction(_)
                | cypher::Expression::Disjunction(_)
                | cypher::Expression::Parenthetical(_)
        )
    }

    fn enter_expression(
        &mut self,
        node: Node<'_>,
        expression: &cypher::Expression,
    ) -> Result<(), TranslationError> {
        self.expect_state(State::NestedExpression, node)?;

        match expression {
            cypher::Expression::Variable(_)
            | cypher::Expression::Literal(_)
            | cypher::Expression::Parameter(_) => Ok(()),

            cypher::Expression::FunctionInvocation(invocation) => {
                if !functions::is_supported(&invocation.name) {
                    return Err(TranslationError::UnsupportedFunction {
                        name: invocation.name.clone(),
                    });
                }
                self.enter_nested_expression(true);
                Ok(())
            }

            cypher::Expression::Conjunction(operands) => {
                self.push_operators(Operator::And, operands.len());
                self.enter_nested_expression(false);
                Ok(())
            }

            cypher::Expression::Disjunction(operands) => {
                self.push_operators(Operator::Or, operands.len());
                self.enter_nested_expression(false);
                Ok(())
            }

            composite => {
                self.enter_nested_expression(Self::nests(composite));
                Ok(())
            }
        }
    }

    /// Announces every operator of an n-ary conjunction or disjunction before its first operand
    /// is walked, so the depth counters already cover a compound first operand.
    fn push_operators(&mut self, operator: Operator, operands: usize) {
        for _ in 1..operands {
            self.tree.push_operator(operator);
        }
    }

    fn exit_expression(&mut self, expression: &cypher::Expression) -> Result<(), TranslationError> {
        match expression {
            cypher::Expression::Variable(variable) => {
                let binding = self.scope.lookup_alias(&variable.symbol)?;
                let operand = match binding.data_type {
                    DataType::PathComposite | DataType::ExpansionPath => {
                        self.path_composite(&binding.dependencies)?
                    }
                    _ => Expression::Identifier(binding.identifier.clone()),
                };
                self.tree.push(operand);
                Ok(())
            }

            cypher::Expression::Literal(literal) => {
                let literal = translate_literal(&literal.value)?;
                self.tree.push(Expression::Literal(literal));
                Ok(())
            }

            cypher::Expression::Parameter(parameter) => {
                let parameter = self.translate_parameter(parameter)?;
                self.tree.push(parameter);
                Ok(())
            }

            cypher::Expression::ListLiteral(items) => {
                self.exit_nested_expression(true)?;
                self.reduce_list(items.len())
            }

            cypher::Expression::PropertyLookup(lookup) => {
                self.exit_nested_expression(true)?;
                self.reduce_property_lookup(&lookup.symbols)
            }

            cypher::Expression::KindMatcher(matcher) => {
                self.exit_nested_expression(true)?;

                let identifier = match self.tree.pop()? {
                    Expression::Identifier(identifier) => identifier,
                    other => {
                        return Err(TranslationError::unsupported_operand(other, "kind matcher"))
                    }
                };
                let data_type = self.scope.lookup(&identifier)?.data_type;
                let constraint = self.kind_constraint(&identifier, data_type, &matcher.kinds)?;

                self.tree.push(constraint);
                Ok(())
            }

            cypher::Expression::Comparison(_) | cypher::Expression::Arithmetic(_) => {
                self.exit_nested_expression(true)
            }

            cypher::Expression::Conjunction(_)
            | cypher::Expression::Disjunction(_)
            | cypher::Expression::Parenthetical(_) => self.exit_nested_expression(false),

            cypher::Expression::Negation(_) => {
                self.exit_nested_expression(true)?;
                self.tree.pop_push_unary(Operator::Not)
            }

            cypher::Expression::FunctionInvocation(invocation) => {
                self.exit_nested_expression(true)?;

                let mut arguments = Vec::with_capacity(invocation.arguments.len());
                for _ in 0..invocation.arguments.len() {
                    arguments.push(self.tree.pop()?);
                }
                arguments.reverse();

                let lowered =
                    functions::translate_function(&self.functions, &invocation.name, arguments)?;
                self.tree.push(lowered);
                Ok(())
            }
        }
    }

    /// Reuses the identifier of a parameter symbol seen before.
    pub(super) fn translate_parameter(
        &mut self,
        parameter: &cypher::Parameter,
    ) -> Result<Expression, TranslationError> {
        let alias = format!("${}", parameter.symbol);

        let identifier = if self.scope.is_aliased(&alias) {
            self.scope.lookup_alias(&alias)?.identifier.clone()
        } else {
            let identifier = self.scope.define_new(DataType::ParameterIdentifier)?;
            self.scope.alias(alias, &identifier)?;
            if let Some(value) = &parameter.value {
                self.scope.set_parameter(&identifier, value.clone())?;
            }
            identifier
        };

        let cast_type = self
            .scope
            .lookup(&identifier)?
            .parameter
            .as_ref()
            .map(|value| match value {
                Value::Map(_) => DataType::Jsonb,
                value => value_to_data_type(value).unwrap_or(DataType::Unknown),
            })
            .unwrap_or(DataType::Unknown);

        Ok(Expression::Parameter(crate::pgsql::Parameter {
            identifier,
            cast_type,
        }))
    }

    fn reduce_list(&mut self, length: usize) -> Result<(), TranslationError> {
        let mut values = Vec::with_capacity(length);
        for _ in 0..length {
            values.push(self.tree.pop()?);
        }
        values.reverse();

        let mut element_type = DataType::Unknown;
        for value in &values {
            let value_type = infer_expression_type(value)?;
            element_type = element_type.convert(value_type).ok_or(
                TranslationError::ArrayLiteralTypeMismatch {
                    first: element_type,
                    second: value_type,
                },
            )?;
        }

        let cast_type = if element_type.is_unresolved() {
            DataType::Unknown
        } else {
            element_type.to_array_type().unwrap_or(DataType::Unknown)
        };

        let values = values
            .into_iter()
            .map(|value| rewrite_property_lookup(value, element_type))
            .collect();

        self.tree
            .push(Expression::ArrayLiteral(ArrayLiteral { values, cast_type }));
        Ok(())
    }

    /// Pushes `<root>.properties` and the field name, then reduces them with the deferred
    /// lookup operator so the JSON accessor can be picked once the surrounding expression is
    /// known.
    fn reduce_property_lookup(&mut self, symbols: &[String]) -> Result<(), TranslationError> {
        let root = match self.tree.pop()? {
            Expression::Identifier(identifier) => identifier,
            other => {
                return Err(TranslationError::unsupported_operand(
                    other,
                    "property lookup",
                ))
            }
        };

        self.tree.push(Expression::compound([
            root,
            Identifier::from(COLUMN_PROPERTIES),
        ]));
        for symbol in symbols {
            self.tree.push(Expression::literal(symbol.as_str()));
            self.tree.pop_push_operator(Operator::PropertyLookup)?;
        }
        Ok(())
    }

    /// Cypher `+` concatenates when either side is text.
    fn reduce_arithmetic(&mut self, operator: cypher::CypherOperator) -> Result<(), TranslationError> {
        let right = self.tree.pop()?;
        let left = self.tree.pop()?;

        let operator = match Operator::from(operator) {
            Operator::Add
                if infer_expression_type(&left)? == DataType::Text
                    || infer_expression_type(&right)? == DataType::Text =>
            {
                Operator::Concatenate
            }
            operator => operator,
        };

        self.tree.push(left);
        self.tree.push(right);
        self.tree.pop_push_operator(operator)
    }

    fn projection_alias(item: &cypher::ProjectionItem) -> Option<String> {
        if let Some(binding) = &item.binding {
            return Some(binding.clone());
        }

        match &item.expression {
            cypher::Expression::Variable(variable) => Some(variable.symbol.clone()),
            cypher::Expression::PropertyLookup(lookup) => match lookup.atom.as_ref() {
                cypher::Expression::Variable(variable) => Some(
                    std::iter::once(variable.symbol.as_str())
                        .chain(lookup.symbols.iter().map(String::as_str))
                        .collect::<Vec<_>>()
                        .join("."),
                ),
                _ => None,
            },
            _ => None,
        }
    }

    /// Skip and limit take integer literals or parameters.
    pub(super) fn translate_bound(
        &mut self,
        expression: &cypher::Expression,
        clause: &str,
    ) -> Result<Expression, TranslationError> {
        match expression {
            cypher::Expression::Literal(literal) if literal.value.as_i64().is_some() => {
                Ok(Expression::Literal(Literal::try_new(literal.value.clone())?))
            }
            cypher::Expression::Parameter(parameter) => self.translate_parameter(parameter),
            other => Err(TranslationError::unsupported_operand(other, clause)),
        }
    }
}

/// Strips one pair of matching outer quotes and resolves the escapes inside them. Text that is
/// not quoted is returned as is.
fn unquote(text: &str) -> String {
    let Some((quote, inner)) = ['\'', '"'].into_iter().find_map(|quote| {
        text.strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
            .map(|inner| (quote, inner))
    }) else {
        return text.to_string();
    };

    let mut unquoted = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    while let Some(next) = chars.next() {
        match next {
            '\\' => match chars.next() {
                Some('n') => unquoted.push('\n'),
                Some('t') => unquoted.push('\t'),
                Some('r') => unquoted.push('\r'),
                Some(escaped @ ('\\' | '\'' | '"')) => unquoted.push(escaped),
                Some(other) => {
                    unquoted.push('\\');
                    unquoted.push(other);
                }
                None => unquoted.push('\\'),
            },
            // doubled quotes stand for one
            next if next == quote && chars.peek() == Some(&quote) => {
                chars.next();
                unquoted.push(quote);
            }
            next => unquoted.push(next),
        }
    }

    unquoted
}

/// String literals arrive quoted as written; null stays untyped; maps become jsonb.
fn translate_literal(value: &Value) -> Result<Literal, TranslationError> {
    match value {
        Value::Null => Ok(Literal::null()),
        Value::Text(text) => Ok(Literal::new(unquote(text))),
        Value::TextArray(items) => Ok(Literal::new(Value::TextArray(
            items.iter().map(|item| unquote(item)).collect(),
        ))),
        Value::Map(_) => Ok(Literal::with_type(value.clone(), DataType::Jsonb)),
        other => Ok(Literal::try_new(other.clone())?),
    }
}

impl Visitor for Translator<'_> {
    type Error = TranslationError;

    fn enter(&mut self, node: Node<'_>) -> Result<(), TranslationError> {
        match node {
            Node::RegularQuery(_) => {
                self.push_state(State::Start);
                Ok(())
            }

            Node::SinglePartQuery(_) | Node::Projection(_) => Ok(()),

            Node::MultiPartQuery(_) => Err(TranslationError::UnsupportedClause {
                clause: "WITH".to_string(),
            }),

            Node::Match(match_clause) => {
                if match_clause.optional {
                    return Err(TranslationError::UnsupportedClause {
                        clause: "OPTIONAL MATCH".to_string(),
                    });
                }

                self.expect_state(State::Start, node)?;
                self.push_state(State::Match);
                self.pattern = Pattern::default();
                self.scope.descend();
                Ok(())
            }

            Node::Where(_) => {
                self.expect_state(State::Match, node)?;
                self.push_state(State::Where);
                self.enter_nested_expression(false);
                Ok(())
            }

            Node::PatternPart(part) => {
                self.expect_state(State::Match, node)?;
                self.push_state(State::PatternPart);

                let path = match &part.binding {
                    Some(name) => {
                        let path = self.scope.define_new(DataType::PathComposite)?;
                        self.scope.alias(name.clone(), &path)?;
                        Some(path)
                    }
                    None => None,
                };
                self.pattern.parts.push(PatternPart::new(path));
                Ok(())
            }

            Node::NodePattern(pattern) => {
                self.expect_state(State::PatternPart, node)?;
                self.enter_node_pattern(node, pattern)
            }

            Node::RelationshipPattern(pattern) => {
                self.expect_state(State::PatternPart, node)?;
                self.enter_relationship_pattern(node, pattern)
            }

            Node::PropertyMatcher(_) => {
                self.expect_state(State::PatternPart, node)?;
                self.enter_nested_expression(true);
                Ok(())
            }

            Node::Set(_) => {
                self.expect_state(State::Start, node)?;
                self.push_state(State::Update);
                Ok(())
            }

            Node::SetItem(item) => {
                self.expect_state(State::Update, node)?;
                if !matches!(item, SetItem::Labels { .. }) {
                    self.enter_nested_expression(true);
                }
                Ok(())
            }

            Node::Return(_) => {
                self.expect_state(State::Start, node)?;
                self.push_state(State::Projection);
                self.scope.isolate();
                Ok(())
            }

            Node::ProjectionItem(_) => {
                self.expect_state(State::Projection, node)?;
                self.enter_nested_expression(true);
                Ok(())
            }

            Node::Order(_) => {
                self.expect_state(State::Projection, node)?;
                self.push_state(State::OrderBy);
                Ok(())
            }

            Node::SortItem(_) => {
                self.expect_state(State::OrderBy, node)?;
                self.enter_nested_expression(true);
                Ok(())
            }

            Node::Expression(expression) => self.enter_expression(node, expression),

            Node::PartialComparison(_)
            | Node::PartialArithmetic(_)
            | Node::Conjoined(_)
            | Node::Disjoined(_) => Ok(()),
        }
    }

    fn exit(&mut self, node: Node<'_>) -> Result<(), TranslationError> {
        match node {
            Node::RegularQuery(_) => self.pop_state(State::Start),

            Node::SinglePartQuery(_) | Node::MultiPartQuery(_) | Node::Projection(_) => Ok(()),

            Node::Match(_) => {
                self.pop_state(State::Match)?;
                self.lower_pattern()?;
                self.scope.ascend();
                Ok(())
            }

            Node::Where(_) => {
                self.exit_nested_expression(false)?;
                self.tree.constrain_remaining_operands()?;
                self.pop_state(State::Where)
            }

            Node::PatternPart(_) => {
                self.pop_state(State::PatternPart)?;
                self.exit_pattern_part(node)
            }

            Node::NodePattern(_) | Node::RelationshipPattern(_) => {
                self.element = None;
                Ok(())
            }

            Node::PropertyMatcher(matcher) => {
                self.exit_nested_expression(true)?;
                self.exit_property_matcher(&matcher.key)
            }

            Node::Set(_) => {
                self.pop_state(State::Update)?;
                self.build_updates()
            }

            Node::SetItem(item) => self.exit_set_item(item),

            Node::Return(return_clause) => {
                self.pop_state(State::Projection)?;
                self.build_projection(&return_clause.projection)?;
                self.scope.ascend();
                Ok(())
            }

            Node::ProjectionItem(item) => {
                self.exit_nested_expression(true)?;

                let expression = resolve_property_lookups(self.tree.pop()?);
                let expression = match Self::projection_alias(item) {
                    Some(alias) => Expression::aliased(expression, alias),
                    None => expression,
                };

                self.projection.push(expression);
                Ok(())
            }

            Node::Order(_) => self.pop_state(State::OrderBy),

            Node::SortItem(item) => {
                self.exit_nested_expression(true)?;

                let expression = resolve_property_lookups(self.tree.pop()?);
                self.order_by.push(OrderBy {
                    expression,
                    ascending: item.ascending,
                });
                Ok(())
            }

            Node::Expression(expression) => self.exit_expression(expression),

            Node::PartialComparison(partial) => {
                self.tree.pop_push_operator(Operator::from(partial.operator))
            }

            Node::PartialArithmetic(partial) => self.reduce_arithmetic(partial.operator),

            Node::Conjoined(_) => self.tree.pop_push_operator(Operator::And),

            Node::Disjoined(_) => self.tree.pop_push_operator(Operator::Or),
        }
    }
}
