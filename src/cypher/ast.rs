//! openCypher query AST as handed over by an external parser.
//!
//! Every type deserializes from JSON so that parsers outside this crate can feed the
//! translator. Enums use serde's externally tagged form with snake_case variant names, e.g.
//! `{"variable": {"symbol": "n"}}`.

use serde::{Deserialize, Serialize};

use crate::pgsql::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegularQuery {
    pub single_query: SingleQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleQuery {
    SinglePart(SinglePartQuery),
    MultiPart(MultiPartQuery),
}

/// Queries chained through `WITH`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPartQuery {
    pub parts: Vec<SinglePartQuery>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SinglePartQuery {
    #[serde(default)]
    pub reading_clauses: Vec<ReadingClause>,
    #[serde(default)]
    pub updating_clauses: Vec<UpdatingClause>,
    #[serde(default)]
    pub return_clause: Option<Return>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingClause {
    Match(Match),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(default)]
    pub optional: bool,
    pub pattern: Vec<PatternPart>,
    #[serde(default)]
    pub where_clause: Option<Where>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Where {
    pub expression: Expression,
}

// ============================================================================
// Patterns
// ============================================================================

/// One comma-separated element of a pattern, optionally bound to a path variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternPart {
    #[serde(default)]
    pub binding: Option<String>,
    pub elements: Vec<PatternElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternElement {
    Node(NodePattern),
    Relationship(RelationshipPattern),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodePattern {
    #[serde(default)]
    pub binding: Option<String>,
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyMatcher>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outbound,
    Inbound,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipPattern {
    #[serde(default)]
    pub binding: Option<String>,
    #[serde(default)]
    pub kinds: Vec<String>,
    pub direction: Direction,
    #[serde(default)]
    pub range: Option<PatternRange>,
    #[serde(default)]
    pub properties: Vec<PropertyMatcher>,
}

/// Hop bounds of a variable-length relationship, `*start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatternRange {
    #[serde(default)]
    pub start_index: Option<i64>,
    #[serde(default)]
    pub end_index: Option<i64>,
}

/// Inline `{key: value}` property constraint of a node or relationship pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMatcher {
    pub key: String,
    pub value: Expression,
}

// ============================================================================
// Updates
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatingClause {
    Set(Set),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Set {
    pub items: Vec<SetItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetItem {
    /// `SET n.key = value`
    Property {
        lookup: PropertyLookup,
        value: Expression,
    },
    /// `SET n += {map}`
    Merge { variable: String, value: Expression },
    /// `SET n:Kind`
    Labels { variable: String, kinds: Vec<String> },
}

// ============================================================================
// Projection
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Return {
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Projection {
    #[serde(default)]
    pub distinct: bool,
    pub items: Vec<ProjectionItem>,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub skip: Option<Expression>,
    #[serde(default)]
    pub limit: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionItem {
    pub expression: Expression,
    #[serde(default)]
    pub binding: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub items: Vec<SortItem>,
}

fn ascending_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortItem {
    #[serde(default = "ascending_by_default")]
    pub ascending: bool,
    pub expression: Expression,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CypherOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    StartsWith,
    EndsWith,
    Contains,
    In,
    Is,
    IsNot,
    RegexMatch,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub symbol: String,
}

/// String values arrive quoted the way they were written in the query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub symbol: String,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyLookup {
    pub atom: Box<Expression>,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindMatcher {
    pub reference: Box<Expression>,
    pub kinds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialComparison {
    pub operator: CypherOperator,
    pub right: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub left: Box<Expression>,
    pub partials: Vec<PartialComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialArithmeticExpression {
    pub operator: CypherOperator,
    pub right: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArithmeticExpression {
    pub left: Box<Expression>,
    pub partials: Vec<PartialArithmeticExpression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInvocation {
    pub name: String,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Variable(Variable),
    Literal(Literal),
    Parameter(Parameter),
    ListLiteral(Vec<Expression>),
    PropertyLookup(PropertyLookup),
    KindMatcher(KindMatcher),
    Comparison(Comparison),
    Arithmetic(ArithmeticExpression),
    Conjunction(Vec<Expression>),
    Disjunction(Vec<Expression>),
    Negation(Box<Expression>),
    Parenthetical(Box<Expression>),
    FunctionInvocation(FunctionInvocation),
}

impl Expression {
    pub fn variable(symbol: impl Into<String>) -> Self {
        Expression::Variable(Variable {
            symbol: symbol.into(),
        })
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(Literal {
            value: value.into(),
        })
    }

    /// A string literal in its quoted source form.
    pub fn string(text: &str) -> Self {
        Expression::literal(format!("'{}'", text))
    }

    pub fn null() -> Self {
        Expression::Literal(Literal { value: Value::Null })
    }

    pub fn parameter(symbol: impl Into<String>, value: Option<Value>) -> Self {
        Expression::Parameter(Parameter {
            symbol: symbol.into(),
            value,
        })
    }

    pub fn property(variable: impl Into<String>, symbol: impl Into<String>) -> Self {
        Expression::PropertyLookup(PropertyLookup {
            atom: Box::new(Expression::variable(variable)),
            symbols: vec![symbol.into()],
        })
    }

    pub fn compare(left: Expression, operator: CypherOperator, right: Expression) -> Self {
        Expression::Comparison(Comparison {
            left: Box::new(left),
            partials: vec![PartialComparison { operator, right }],
        })
    }

    pub fn arithmetic(left: Expression, operator: CypherOperator, right: Expression) -> Self {
        Expression::Arithmetic(ArithmeticExpression {
            left: Box::new(left),
            partials: vec![PartialArithmeticExpression { operator, right }],
        })
    }

    pub fn kinds(variable: impl Into<String>, kinds: &[&str]) -> Self {
        Expression::KindMatcher(KindMatcher {
            reference: Box::new(Expression::variable(variable)),
            kinds: kinds.iter().map(|kind| kind.to_string()).collect(),
        })
    }

    pub fn function(name: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Expression::FunctionInvocation(FunctionInvocation {
            name: name.into(),
            distinct: false,
            arguments,
        })
    }
}

impl NodePattern {
    pub fn bound(binding: impl Into<String>, kinds: &[&str]) -> Self {
        NodePattern {
            binding: Some(binding.into()),
            kinds: kinds.iter().map(|kind| kind.to_string()).collect(),
            properties: Vec::new(),
        }
    }
}

impl RelationshipPattern {
    pub fn outbound(binding: impl Into<String>, kinds: &[&str]) -> Self {
        RelationshipPattern {
            binding: Some(binding.into()),
            kinds: kinds.iter().map(|kind| kind.to_string()).collect(),
            direction: Direction::Outbound,
            range: None,
            properties: Vec::new(),
        }
    }
}
