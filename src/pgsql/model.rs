//! The SQL syntax tree produced by translation.
//!
//! Nodes are plain data. Everything that renders, rewrites or inspects them lives elsewhere;
//! the only behavior here is construction helpers and type-hint discovery.

use super::errors::TypeError;
use super::identifiers::{CompoundIdentifier, Identifier};
use super::operators::Operator;
use super::types::{value_to_data_type, DataType, Value};

// ============================================================================
// Physical schema
// ============================================================================

pub const TABLE_NODE: &str = "node";
pub const TABLE_EDGE: &str = "edge";

pub const COLUMN_ID: &str = "id";
pub const COLUMN_GRAPH_ID: &str = "graph_id";
pub const COLUMN_KIND_IDS: &str = "kind_ids";
pub const COLUMN_KIND_ID: &str = "kind_id";
pub const COLUMN_PROPERTIES: &str = "properties";
pub const COLUMN_START_ID: &str = "start_id";
pub const COLUMN_END_ID: &str = "end_id";

pub const NODE_COLUMNS: [&str; 3] = [COLUMN_ID, COLUMN_KIND_IDS, COLUMN_PROPERTIES];
pub const EDGE_COLUMNS: [&str; 5] = [
    COLUMN_ID,
    COLUMN_START_ID,
    COLUMN_END_ID,
    COLUMN_KIND_ID,
    COLUMN_PROPERTIES,
];

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Identifier(Identifier),
    CompoundIdentifier(CompoundIdentifier),
    Parameter(Parameter),
    Binary(Box<BinaryExpression>),
    Unary(Box<UnaryExpression>),
    FunctionCall(FunctionCall),
    TypeCast(Box<TypeCast>),
    ArrayLiteral(ArrayLiteral),
    ArrayIndex(Box<ArrayIndex>),
    /// `array(<query>)`
    ArrayExpression(Box<Query>),
    /// `(<query>)` used as a scalar
    Subquery(Box<Query>),
    CompositeValue(CompositeValue),
    Any(Box<AnyExpression>),
    RowColumnReference(Box<RowColumnReference>),
    Parenthetical(Box<Expression>),
    Between(Box<Between>),
    Aliased(Box<AliasedExpression>),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: Value,
    pub cast_type: DataType,
}

impl Literal {
    /// Builds a literal, inferring its type from the value. Values without a relational type
    /// are kept with an `Unknown` type.
    pub fn new(value: impl Into<Value>) -> Self {
        let value = value.into();
        let cast_type = value_to_data_type(&value).unwrap_or(DataType::Unknown);
        Literal { value, cast_type }
    }

    pub fn try_new(value: Value) -> Result<Self, TypeError> {
        let cast_type = value_to_data_type(&value)?;
        Ok(Literal { value, cast_type })
    }

    pub fn with_type(value: impl Into<Value>, cast_type: DataType) -> Self {
        Literal {
            value: value.into(),
            cast_type,
        }
    }

    pub fn null() -> Self {
        Literal {
            value: Value::Null,
            cast_type: DataType::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub identifier: Identifier,
    pub cast_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub left: Expression,
    pub operator: Operator,
    pub right: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub operator: Operator,
    pub operand: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub function: Identifier,
    pub parameters: Vec<Expression>,
    pub distinct: bool,
    /// Rendered without parentheses, e.g. `current_date`.
    pub bare: bool,
    pub cast_type: DataType,
}

impl FunctionCall {
    pub fn new(function: &str, parameters: Vec<Expression>, cast_type: DataType) -> Self {
        FunctionCall {
            function: Identifier::from(function),
            parameters,
            distinct: false,
            bare: false,
            cast_type,
        }
    }

    pub fn bare(function: &str, cast_type: DataType) -> Self {
        FunctionCall {
            bare: true,
            ..FunctionCall::new(function, Vec::new(), cast_type)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeCast {
    pub expression: Expression,
    pub cast_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    pub values: Vec<Expression>,
    /// The array type of the literal; unresolved types render without a cast.
    pub cast_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayIndex {
    pub expression: Expression,
    pub indexes: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeValue {
    pub values: Vec<Expression>,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnyExpression {
    pub expression: Expression,
    pub cast_type: DataType,
}

/// Field access on a composite column: `(s.n0).id`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowColumnReference {
    pub reference: Expression,
    pub column: Identifier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Between {
    pub expression: Expression,
    pub low: Expression,
    pub high: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AliasedExpression {
    pub expression: Expression,
    pub alias: Identifier,
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(Literal::new(value))
    }

    pub fn identifier(name: impl Into<Identifier>) -> Self {
        Expression::Identifier(name.into())
    }

    pub fn compound<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identifier>,
    {
        Expression::CompoundIdentifier(CompoundIdentifier::new(parts))
    }

    pub fn binary(left: Expression, operator: Operator, right: Expression) -> Self {
        Expression::Binary(Box::new(BinaryExpression {
            left,
            operator,
            right,
        }))
    }

    pub fn unary(operator: Operator, operand: Expression) -> Self {
        Expression::Unary(Box::new(UnaryExpression { operator, operand }))
    }

    pub fn not(operand: Expression) -> Self {
        Expression::unary(Operator::Not, operand)
    }

    pub fn cast(expression: Expression, cast_type: DataType) -> Self {
        Expression::TypeCast(Box::new(TypeCast {
            expression,
            cast_type,
        }))
    }

    pub fn any(expression: Expression, cast_type: DataType) -> Self {
        Expression::Any(Box::new(AnyExpression {
            expression,
            cast_type,
        }))
    }

    pub fn aliased(expression: Expression, alias: impl Into<Identifier>) -> Self {
        Expression::Aliased(Box::new(AliasedExpression {
            expression,
            alias: alias.into(),
        }))
    }

    pub fn row_column(reference: Expression, column: impl Into<Identifier>) -> Self {
        Expression::RowColumnReference(Box::new(RowColumnReference {
            reference,
            column: column.into(),
        }))
    }

    pub fn function(call: FunctionCall) -> Self {
        Expression::FunctionCall(call)
    }

    pub fn as_binary(&self) -> Option<&BinaryExpression> {
        match self {
            Expression::Binary(binary) => Some(binary),
            _ => None,
        }
    }

    /// A property lookup whose JSON accessor has not been chosen yet.
    pub fn is_property_lookup(&self) -> bool {
        matches!(self, Expression::Binary(binary) if binary.operator == Operator::PropertyLookup)
    }

    /// The type this expression announces for itself, if any.
    pub fn type_hint(&self) -> Option<DataType> {
        let hint = match self {
            Expression::Literal(literal) => literal.cast_type,
            Expression::Parameter(parameter) => parameter.cast_type,
            Expression::TypeCast(cast) => cast.cast_type,
            Expression::ArrayLiteral(array) => array.cast_type,
            Expression::FunctionCall(call) => call.cast_type,
            Expression::CompositeValue(composite) => composite.data_type,
            Expression::Any(any) => any.cast_type,
            _ => return None,
        };

        if hint.is_unresolved() {
            None
        } else {
            Some(hint)
        }
    }
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Expression::Literal(literal)
    }
}

impl From<Identifier> for Expression {
    fn from(identifier: Identifier) -> Self {
        Expression::Identifier(identifier)
    }
}

impl From<CompoundIdentifier> for Expression {
    fn from(identifier: CompoundIdentifier) -> Self {
        Expression::CompoundIdentifier(identifier)
    }
}

/// Joins expressions with `and`, left to right.
pub fn conjoin<I>(expressions: I) -> Option<Expression>
where
    I: IntoIterator<Item = Expression>,
{
    expressions
        .into_iter()
        .reduce(|joined, next| Expression::binary(joined, Operator::And, next))
}

/// Joins two optional expressions with `and`.
pub fn conjoin_optional(left: Option<Expression>, right: Option<Expression>) -> Option<Expression> {
    conjoin(left.into_iter().chain(right))
}

// ============================================================================
// Relations and statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TableReference {
    pub name: CompoundIdentifier,
    pub binding: Option<Identifier>,
}

impl TableReference {
    pub fn named(name: impl Into<Identifier>) -> Self {
        TableReference {
            name: CompoundIdentifier(vec![name.into()]),
            binding: None,
        }
    }

    pub fn bound(name: impl Into<Identifier>, binding: impl Into<Identifier>) -> Self {
        TableReference {
            name: CompoundIdentifier(vec![name.into()]),
            binding: Some(binding.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: TableReference,
    pub join_type: JoinType,
    pub constraint: Option<Expression>,
}

impl Join {
    pub fn inner(table: TableReference, constraint: Expression) -> Self {
        Join {
            table,
            join_type: JoinType::Inner,
            constraint: Some(constraint),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub source: TableReference,
    pub joins: Vec<Join>,
}

impl FromClause {
    pub fn new(source: TableReference) -> Self {
        FromClause {
            source,
            joins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<Expression>,
    pub from: Vec<FromClause>,
    pub where_clause: Option<Expression>,
    pub group_by: Vec<Expression>,
    pub having: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    pub left: SetExpression,
    pub operator: Operator,
    pub all: bool,
    pub right: SetExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: Identifier,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: TableReference,
    pub assignments: Vec<Assignment>,
    pub from: Vec<FromClause>,
    pub where_clause: Option<Expression>,
    pub returning: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: TableReference,
    pub shape: Vec<Identifier>,
    pub source: SetExpression,
    pub returning: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: TableReference,
    pub using: Vec<FromClause>,
    pub where_clause: Option<Expression>,
    pub returning: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Values {
    pub rows: Vec<Vec<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeActionKind {
    Update(Vec<Assignment>),
    Insert {
        shape: Vec<Identifier>,
        values: Vec<Expression>,
    },
    Delete,
    DoNothing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeAction {
    pub matched: bool,
    pub predicate: Option<Expression>,
    pub kind: MergeActionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    pub into: TableReference,
    pub using: TableReference,
    pub on: Expression,
    pub actions: Vec<MergeAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetExpression {
    Select(Box<Select>),
    SetOperation(Box<SetOperation>),
    Query(Box<Query>),
    Update(Box<Update>),
    Insert(Box<Insert>),
    Delete(Box<Delete>),
    Values(Values),
}

impl From<Select> for SetExpression {
    fn from(select: Select) -> Self {
        SetExpression::Select(Box::new(select))
    }
}

impl From<Update> for SetExpression {
    fn from(update: Update) -> Self {
        SetExpression::Update(Box::new(update))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableAlias {
    pub name: Identifier,
    pub shape: Option<Vec<Identifier>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommonTableExpression {
    pub alias: TableAlias,
    pub query: Query,
}

#[derive(Debug, Clone, PartialEq)]
pub struct With {
    pub recursive: bool,
    pub expressions: Vec<CommonTableExpression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expression: Expression,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub common_table_expressions: Option<With>,
    pub body: SetExpression,
    pub order_by: Vec<OrderBy>,
    pub offset: Option<Expression>,
    pub limit: Option<Expression>,
}

impl Query {
    pub fn new(body: impl Into<SetExpression>) -> Self {
        Query {
            common_table_expressions: None,
            body: body.into(),
            order_by: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    pub fn add_cte(&mut self, cte: CommonTableExpression) {
        match &mut self.common_table_expressions {
            Some(with) => with.expressions.push(cte),
            None => {
                self.common_table_expressions = Some(With {
                    recursive: false,
                    expressions: vec![cte],
                })
            }
        }
    }

    pub fn ctes(&self) -> &[CommonTableExpression] {
        self.common_table_expressions
            .as_ref()
            .map(|with| with.expressions.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Query(Query),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Merge(Merge),
}

impl Statement {
    pub fn as_query(&self) -> Option<&Query> {
        match self {
            Statement::Query(query) => Some(query),
            _ => None,
        }
    }
}
