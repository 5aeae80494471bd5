//! Depth-first enter/exit traversal of the query AST.
//!
//! N-ary conjunctions and disjunctions are walked left-deep: the first operand is visited
//! directly and every later operand is bracketed by a `Conjoined` or `Disjoined` node, so a
//! visitor reduces one binary operator on exit from each additional operand.

use super::ast::*;

#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    RegularQuery(&'a RegularQuery),
    SinglePartQuery(&'a SinglePartQuery),
    MultiPartQuery(&'a MultiPartQuery),
    Match(&'a Match),
    Where(&'a Where),
    PatternPart(&'a PatternPart),
    NodePattern(&'a NodePattern),
    RelationshipPattern(&'a RelationshipPattern),
    PropertyMatcher(&'a PropertyMatcher),
    Set(&'a Set),
    SetItem(&'a SetItem),
    Return(&'a Return),
    Projection(&'a Projection),
    ProjectionItem(&'a ProjectionItem),
    Order(&'a Order),
    SortItem(&'a SortItem),
    Expression(&'a Expression),
    PartialComparison(&'a PartialComparison),
    PartialArithmetic(&'a PartialArithmeticExpression),
    Conjoined(&'a Expression),
    Disjoined(&'a Expression),
}

impl Node<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::RegularQuery(_) => "regular query",
            Node::SinglePartQuery(_) => "single part query",
            Node::MultiPartQuery(_) => "multi part query",
            Node::Match(_) => "match",
            Node::Where(_) => "where",
            Node::PatternPart(_) => "pattern part",
            Node::NodePattern(_) => "node pattern",
            Node::RelationshipPattern(_) => "relationship pattern",
            Node::PropertyMatcher(_) => "property matcher",
            Node::Set(_) => "set",
            Node::SetItem(_) => "set item",
            Node::Return(_) => "return",
            Node::Projection(_) => "projection",
            Node::ProjectionItem(_) => "projection item",
            Node::Order(_) => "order",
            Node::SortItem(_) => "sort item",
            Node::Expression(expression) => match expression {
                Expression::Variable(_) => "variable",
                Expression::Literal(_) => "literal",
                Expression::Parameter(_) => "parameter",
                Expression::ListLiteral(_) => "list literal",
                Expression::PropertyLookup(_) => "property lookup",
                Expression::KindMatcher(_) => "kind matcher",
                Expression::Comparison(_) => "comparison",
                Expression::Arithmetic(_) => "arithmetic expression",
                Expression::Conjunction(_) => "conjunction",
                Expression::Disjunction(_) => "disjunction",
                Expression::Negation(_) => "negation",
                Expression::Parenthetical(_) => "parenthetical",
                Expression::FunctionInvocation(_) => "function invocation",
            },
            Node::PartialComparison(_) => "partial comparison",
            Node::PartialArithmetic(_) => "partial arithmetic expression",
            Node::Conjoined(_) => "conjoined operand",
            Node::Disjoined(_) => "disjoined operand",
        }
    }
}

pub trait Visitor {
    type Error;

    fn enter(&mut self, node: Node<'_>) -> Result<(), Self::Error>;

    fn exit(&mut self, node: Node<'_>) -> Result<(), Self::Error>;
}

/// Walks `query`, stopping at the first error a visitor callback returns.
pub fn walk<V: Visitor>(query: &RegularQuery, visitor: &mut V) -> Result<(), V::Error> {
    visit(Node::RegularQuery(query), visitor)
}

pub fn visit<'a, V: Visitor>(node: Node<'a>, visitor: &mut V) -> Result<(), V::Error> {
    visitor.enter(node)?;
    for child in children(node) {
        visit(child, visitor)?;
    }
    visitor.exit(node)
}

fn children(node: Node<'_>) -> Vec<Node<'_>> {
    match node {
        Node::RegularQuery(query) => match &query.single_query {
            SingleQuery::SinglePart(single_part) => vec![Node::SinglePartQuery(single_part)],
            SingleQuery::MultiPart(multi_part) => vec![Node::MultiPartQuery(multi_part)],
        },

        Node::SinglePartQuery(query) => {
            let mut nodes: Vec<Node<'_>> = query
                .reading_clauses
                .iter()
                .map(|clause| match clause {
                    ReadingClause::Match(match_clause) => Node::Match(match_clause),
                })
                .collect();

            nodes.extend(query.updating_clauses.iter().map(|clause| match clause {
                UpdatingClause::Set(set) => Node::Set(set),
            }));

            nodes.extend(query.return_clause.iter().map(Node::Return));
            nodes
        }

        Node::MultiPartQuery(query) => query.parts.iter().map(Node::SinglePartQuery).collect(),

        Node::Match(match_clause) => {
            let mut nodes: Vec<Node<'_>> =
                match_clause.pattern.iter().map(Node::PatternPart).collect();
            nodes.extend(match_clause.where_clause.iter().map(Node::Where));
            nodes
        }

        Node::Where(where_clause) => vec![Node::Expression(&where_clause.expression)],

        Node::PatternPart(part) => part
            .elements
            .iter()
            .map(|element| match element {
                PatternElement::Node(node_pattern) => Node::NodePattern(node_pattern),
                PatternElement::Relationship(relationship) => {
                    Node::RelationshipPattern(relationship)
                }
            })
            .collect(),

        Node::NodePattern(node_pattern) => node_pattern
            .properties
            .iter()
            .map(Node::PropertyMatcher)
            .collect(),

        Node::RelationshipPattern(relationship) => relationship
            .properties
            .iter()
            .map(Node::PropertyMatcher)
            .collect(),

        Node::PropertyMatcher(matcher) => vec![Node::Expression(&matcher.value)],

        Node::Set(set) => set.items.iter().map(Node::SetItem).collect(),

        Node::SetItem(item) => match item {
            SetItem::Property { value, .. } | SetItem::Merge { value, .. } => {
                vec![Node::Expression(value)]
            }
            SetItem::Labels { .. } => Vec::new(),
        },

        Node::Return(return_clause) => vec![Node::Projection(&return_clause.projection)],

        Node::Projection(projection) => {
            let mut nodes: Vec<Node<'_>> =
                projection.items.iter().map(Node::ProjectionItem).collect();
            nodes.extend(projection.order.iter().map(Node::Order));
            nodes
        }

        Node::ProjectionItem(item) => vec![Node::Expression(&item.expression)],

        Node::Order(order) => order.items.iter().map(Node::SortItem).collect(),

        Node::SortItem(item) => vec![Node::Expression(&item.expression)],

        Node::Expression(expression) => expression_children(expression),

        Node::PartialComparison(partial) => vec![Node::Expression(&partial.right)],

        Node::PartialArithmetic(partial) => vec![Node::Expression(&partial.right)],

        Node::Conjoined(operand) | Node::Disjoined(operand) => vec![Node::Expression(operand)],
    }
}

fn expression_children(expression: &Expression) -> Vec<Node<'_>> {
    match expression {
        Expression::Variable(_) | Expression::Literal(_) | Expression::Parameter(_) => Vec::new(),

        Expression::ListLiteral(items) => items.iter().map(Node::Expression).collect(),

        Expression::PropertyLookup(lookup) => vec![Node::Expression(&lookup.atom)],

        Expression::KindMatcher(matcher) => vec![Node::Expression(&matcher.reference)],

        Expression::Comparison(comparison) => {
            let mut nodes = vec![Node::Expression(comparison.left.as_ref())];
            nodes.extend(comparison.partials.iter().map(Node::PartialComparison));
            nodes
        }

        Expression::Arithmetic(arithmetic) => {
            let mut nodes = vec![Node::Expression(arithmetic.left.as_ref())];
            nodes.extend(arithmetic.partials.iter().map(Node::PartialArithmetic));
            nodes
        }

        Expression::Conjunction(operands) => left_deep(operands, Node::Conjoined),

        Expression::Disjunction(operands) => left_deep(operands, Node::Disjoined),

        Expression::Negation(inner) | Expression::Parenthetical(inner) => {
            vec![Node::Expression(inner.as_ref())]
        }

        Expression::FunctionInvocation(invocation) => {
            invocation.arguments.iter().map(Node::Expression).collect()
        }
    }
}

fn left_deep<'a>(
    operands: &'a [Expression],
    bracket: fn(&'a Expression) -> Node<'a>,
) -> Vec<Node<'a>> {
    operands
        .iter()
        .enumerate()
        .map(|(index, operand)| {
            if index == 0 {
                Node::Expression(operand)
            } else {
                bracket(operand)
            }
        })
        .collect()
}
