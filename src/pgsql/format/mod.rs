//! Renders the SQL model as PostgreSQL text.
//!
//! Keywords are lower case. Identifiers that are not plain lower-case names are double-quoted,
//! and binary expressions are parenthesized only where PostgreSQL's precedence rules need it.

pub mod errors;

use lazy_static::lazy_static;
use regex::Regex;

use super::identifiers::{CompoundIdentifier, Identifier};
use super::model::*;
use super::operators::Operator;
use super::types::{value_to_data_type, DataType, Value};
use errors::FormatError;

lazy_static! {
    static ref SIMPLE_IDENTIFIER: Regex =
        Regex::new(r"^[a-z_][a-z0-9_]*$").expect("identifier pattern is valid");
}

pub trait ToSql {
    fn to_sql(&self) -> Result<String, FormatError>;
}

impl ToSql for Expression {
    fn to_sql(&self) -> Result<String, FormatError> {
        let mut writer = SqlWriter::default();
        writer.expression(self)?;
        Ok(writer.finish())
    }
}

impl ToSql for Query {
    fn to_sql(&self) -> Result<String, FormatError> {
        let mut writer = SqlWriter::default();
        writer.query(self)?;
        Ok(writer.finish())
    }
}

impl ToSql for Statement {
    fn to_sql(&self) -> Result<String, FormatError> {
        let mut writer = SqlWriter::default();
        writer.statement(self)?;
        Ok(writer.finish())
    }
}

pub fn expression(expression: &Expression) -> Result<String, FormatError> {
    expression.to_sql()
}

pub fn statement(statement: &Statement) -> Result<String, FormatError> {
    statement.to_sql()
}

/// Renders a batch of statements, each terminated with `;`.
pub fn statements<'a, I>(statements: I) -> Result<String, FormatError>
where
    I: IntoIterator<Item = &'a Statement>,
{
    let rendered = statements
        .into_iter()
        .map(|statement| statement.to_sql().map(|sql| sql + ";"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rendered.join("\n"))
}

pub fn quote_identifier(identifier: &Identifier) -> String {
    let name = identifier.as_str();
    if SIMPLE_IDENTIFIER.is_match(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn quote_text(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

#[derive(Default)]
struct SqlWriter {
    out: String,
}

impl SqlWriter {
    fn finish(self) -> String {
        self.out
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn comma_separated<T>(
        &mut self,
        items: &[T],
        mut render: impl FnMut(&mut Self, &T) -> Result<(), FormatError>,
    ) -> Result<(), FormatError> {
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.write(", ");
            }
            render(self, item)?;
        }
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self, expression: &Expression) -> Result<(), FormatError> {
        match expression {
            Expression::Literal(literal) => self.literal(literal),
            Expression::Identifier(identifier) => {
                self.write(&quote_identifier(identifier));
                Ok(())
            }
            Expression::CompoundIdentifier(identifier) => self.compound_identifier(identifier),
            Expression::Parameter(parameter) => {
                self.write(parameter.identifier.as_str());
                Ok(())
            }
            Expression::Binary(binary) => self.binary(binary),
            Expression::Unary(unary) => {
                self.write(unary.operator.as_str());
                self.write(" ");
                self.wrapped_operand(&unary.operand)
            }
            Expression::FunctionCall(call) => self.function_call(call),
            Expression::TypeCast(cast) => {
                self.wrapped_operand(&cast.expression)?;
                self.write("::");
                self.write(cast.cast_type.as_str());
                Ok(())
            }
            Expression::ArrayLiteral(array) => {
                self.write("array[");
                self.comma_separated(&array.values, Self::expression)?;
                self.write("]");
                if !array.cast_type.is_unresolved() {
                    self.write("::");
                    self.write(array.cast_type.as_str());
                }
                Ok(())
            }
            Expression::ArrayIndex(index) => {
                match &index.expression {
                    Expression::Identifier(_) | Expression::CompoundIdentifier(_) => {
                        self.expression(&index.expression)?
                    }
                    other => {
                        self.write("(");
                        self.expression(other)?;
                        self.write(")");
                    }
                }
                for subscript in &index.indexes {
                    self.write("[");
                    self.expression(subscript)?;
                    self.write("]");
                }
                Ok(())
            }
            Expression::ArrayExpression(query) => {
                self.write("array(");
                self.query(query)?;
                self.write(")");
                Ok(())
            }
            Expression::Subquery(query) => {
                self.write("(");
                self.query(query)?;
                self.write(")");
                Ok(())
            }
            Expression::CompositeValue(composite) => {
                if composite.data_type.is_unresolved() {
                    return Err(FormatError::UnresolvedCompositeType);
                }
                self.write("(");
                self.comma_separated(&composite.values, Self::expression)?;
                self.write(")::");
                self.write(composite.data_type.as_str());
                Ok(())
            }
            Expression::Any(any) => {
                self.write("any(");
                self.expression(&any.expression)?;
                self.write(")");
                Ok(())
            }
            Expression::RowColumnReference(reference) => {
                self.write("(");
                self.expression(&reference.reference)?;
                self.write(").");
                self.write(&quote_identifier(&reference.column));
                Ok(())
            }
            Expression::Parenthetical(inner) => {
                self.write("(");
                self.expression(inner)?;
                self.write(")");
                Ok(())
            }
            Expression::Between(between) => {
                self.wrapped_operand(&between.expression)?;
                self.write(" between ");
                self.wrapped_operand(&between.low)?;
                self.write(" and ");
                self.wrapped_operand(&between.high)
            }
            Expression::Aliased(aliased) => {
                self.expression(&aliased.expression)?;
                self.write(" as ");
                self.write(&quote_identifier(&aliased.alias));
                Ok(())
            }
            Expression::Wildcard => {
                self.write("*");
                Ok(())
            }
        }
    }

    fn compound_identifier(&mut self, identifier: &CompoundIdentifier) -> Result<(), FormatError> {
        if identifier.is_empty() {
            return Err(FormatError::EmptyCompoundIdentifier);
        }

        let rendered: Vec<String> = identifier.parts().iter().map(quote_identifier).collect();
        self.write(&rendered.join("."));
        Ok(())
    }

    fn literal(&mut self, literal: &Literal) -> Result<(), FormatError> {
        let rendered = match &literal.value {
            Value::Null => "null".to_string(),
            Value::Bool(value) => value.to_string(),
            Value::Int2(value) => value.to_string(),
            Value::Int4(value) => value.to_string(),
            Value::Int8(value) => value.to_string(),
            Value::UInt(value) => value.to_string(),
            Value::Float4(value) => value.to_string(),
            Value::Float8(value) => value.to_string(),
            Value::Text(text) => {
                if literal.cast_type == DataType::Jsonb {
                    format!("{}::jsonb", quote_text(text))
                } else {
                    quote_text(text)
                }
            }
            Value::Int2Array(values) => array_literal(values, literal)?,
            Value::Int4Array(values) => array_literal(values, literal)?,
            Value::Int8Array(values) => array_literal(values, literal)?,
            Value::Float4Array(values) => array_literal(values, literal)?,
            Value::Float8Array(values) => array_literal(values, literal)?,
            Value::TextArray(values) => {
                let quoted: Vec<String> = values.iter().map(|text| quote_text(text)).collect();
                format!("array[{}]::{}", quoted.join(", "), array_cast(literal)?)
            }
            Value::Map(_) => format!("{}::jsonb", quote_text(&literal.value.to_json_string())),
            Value::List(_) => {
                return Err(FormatError::UnsupportedValue {
                    value: literal.value.to_json_string(),
                })
            }
        };

        self.write(&rendered);
        Ok(())
    }

    fn binary(&mut self, binary: &BinaryExpression) -> Result<(), FormatError> {
        let operator = match binary.operator {
            Operator::StartsWith
            | Operator::Contains
            | Operator::EndsWith
            | Operator::AdditionAssignment
            | Operator::LabelAssignment => {
                return Err(FormatError::UntranslatedOperator {
                    operator: binary.operator.to_string(),
                })
            }
            // A lookup that never received a type hint reads the raw jsonb value
            Operator::PropertyLookup => Operator::JsonField,
            operator => operator,
        };

        self.binary_operand(&binary.left, operator, false)?;
        self.write(" ");
        self.write(operator.as_str());
        self.write(" ");
        self.binary_operand(&binary.right, operator, true)
    }

    fn binary_operand(
        &mut self,
        operand: &Expression,
        parent: Operator,
        is_right: bool,
    ) -> Result<(), FormatError> {
        if needs_parentheses(operand, parent, is_right) {
            self.write("(");
            self.expression(operand)?;
            self.write(")");
            Ok(())
        } else {
            self.expression(operand)
        }
    }

    /// Operands of casts, unary operators and `between` bind tighter than any binary operator.
    fn wrapped_operand(&mut self, operand: &Expression) -> Result<(), FormatError> {
        match operand {
            Expression::Binary(_) | Expression::Unary(_) | Expression::Between(_) => {
                self.write("(");
                self.expression(operand)?;
                self.write(")");
                Ok(())
            }
            _ => self.expression(operand),
        }
    }

    fn function_call(&mut self, call: &FunctionCall) -> Result<(), FormatError> {
        self.write(&quote_identifier(&call.function));
        if call.bare {
            return Ok(());
        }

        self.write("(");
        if call.distinct {
            self.write("distinct ");
        }
        self.comma_separated(&call.parameters, Self::expression)?;
        self.write(")");
        Ok(())
    }

    // ========================================================================
    // Relations and statements
    // ========================================================================

    fn statement(&mut self, statement: &Statement) -> Result<(), FormatError> {
        match statement {
            Statement::Query(query) => self.query(query),
            Statement::Insert(insert) => self.insert(insert),
            Statement::Update(update) => self.update(update),
            Statement::Delete(delete) => self.delete(delete),
            Statement::Merge(merge) => self.merge(merge),
        }
    }

    fn query(&mut self, query: &Query) -> Result<(), FormatError> {
        if let Some(with) = &query.common_table_expressions {
            self.write("with ");
            if with.recursive {
                self.write("recursive ");
            }
            self.comma_separated(&with.expressions, Self::common_table_expression)?;
            self.write(" ");
        }

        self.set_expression(&query.body)?;

        if !query.order_by.is_empty() {
            self.write(" order by ");
            self.comma_separated(&query.order_by, |writer, order| {
                writer.expression(&order.expression)?;
                if !order.ascending {
                    writer.write(" desc");
                }
                Ok(())
            })?;
        }

        if let Some(offset) = &query.offset {
            self.write(" offset ");
            self.expression(offset)?;
        }

        if let Some(limit) = &query.limit {
            self.write(" limit ");
            self.expression(limit)?;
        }

        Ok(())
    }

    fn common_table_expression(&mut self, cte: &CommonTableExpression) -> Result<(), FormatError> {
        self.write(&quote_identifier(&cte.alias.name));
        if let Some(shape) = &cte.alias.shape {
            self.write("(");
            self.comma_separated(shape, |writer, column| {
                writer.write(&quote_identifier(column));
                Ok(())
            })?;
            self.write(")");
        }
        self.write(" as (");
        self.query(&cte.query)?;
        self.write(")");
        Ok(())
    }

    fn set_expression(&mut self, expression: &SetExpression) -> Result<(), FormatError> {
        match expression {
            SetExpression::Select(select) => self.select(select),
            SetExpression::SetOperation(operation) => {
                self.set_expression(&operation.left)?;
                self.write(" ");
                self.write(operation.operator.as_str());
                if operation.all {
                    self.write(" all");
                }
                self.write(" ");
                self.set_expression(&operation.right)
            }
            SetExpression::Query(query) => {
                self.write("(");
                self.query(query)?;
                self.write(")");
                Ok(())
            }
            SetExpression::Update(update) => self.update(update),
            SetExpression::Insert(insert) => self.insert(insert),
            SetExpression::Delete(delete) => self.delete(delete),
            SetExpression::Values(values) => self.values(values),
        }
    }

    fn select(&mut self, select: &Select) -> Result<(), FormatError> {
        if select.projection.is_empty() {
            return Err(FormatError::EmptyProjection);
        }

        self.write("select ");
        if select.distinct {
            self.write("distinct ");
        }
        self.comma_separated(&select.projection, Self::expression)?;

        if !select.from.is_empty() {
            self.write(" from ");
            self.comma_separated(&select.from, Self::from_clause)?;
        }

        if let Some(where_clause) = &select.where_clause {
            self.write(" where ");
            self.expression(where_clause)?;
        }

        if !select.group_by.is_empty() {
            self.write(" group by ");
            self.comma_separated(&select.group_by, Self::expression)?;
        }

        if let Some(having) = &select.having {
            self.write(" having ");
            self.expression(having)?;
        }

        Ok(())
    }

    fn table_reference(&mut self, table: &TableReference) -> Result<(), FormatError> {
        self.compound_identifier(&table.name)?;
        if let Some(binding) = &table.binding {
            self.write(" ");
            self.write(&quote_identifier(binding));
        }
        Ok(())
    }

    fn from_clause(&mut self, from: &FromClause) -> Result<(), FormatError> {
        self.table_reference(&from.source)?;

        for join in &from.joins {
            self.write(match join.join_type {
                JoinType::Inner => " join ",
                JoinType::LeftOuter => " left outer join ",
                JoinType::RightOuter => " right outer join ",
                JoinType::FullOuter => " full outer join ",
                JoinType::Cross => " cross join ",
            });
            self.table_reference(&join.table)?;

            match (&join.constraint, join.join_type) {
                (_, JoinType::Cross) => {}
                (Some(constraint), _) => {
                    self.write(" on ");
                    self.expression(constraint)?;
                }
                (None, _) => {
                    return Err(FormatError::MissingJoinConstraint {
                        table: join.table.name.parts().iter().map(Identifier::to_string).collect(),
                    })
                }
            }
        }

        Ok(())
    }

    fn assignments(&mut self, assignments: &[Assignment]) -> Result<(), FormatError> {
        if assignments.is_empty() {
            return Err(FormatError::EmptyAssignments);
        }

        self.comma_separated(assignments, |writer, assignment| {
            writer.write(&quote_identifier(&assignment.column));
            writer.write(" = ");
            writer.expression(&assignment.value)
        })
    }

    fn returning(&mut self, returning: &[Expression]) -> Result<(), FormatError> {
        if !returning.is_empty() {
            self.write(" returning ");
            self.comma_separated(returning, Self::expression)?;
        }
        Ok(())
    }

    fn update(&mut self, update: &Update) -> Result<(), FormatError> {
        self.write("update ");
        self.table_reference(&update.table)?;
        self.write(" set ");
        self.assignments(&update.assignments)?;

        if !update.from.is_empty() {
            self.write(" from ");
            self.comma_separated(&update.from, Self::from_clause)?;
        }

        if let Some(where_clause) = &update.where_clause {
            self.write(" where ");
            self.expression(where_clause)?;
        }

        self.returning(&update.returning)
    }

    fn insert(&mut self, insert: &Insert) -> Result<(), FormatError> {
        self.write("insert into ");
        self.table_reference(&insert.table)?;
        if !insert.shape.is_empty() {
            self.write(" (");
            self.comma_separated(&insert.shape, |writer, column| {
                writer.write(&quote_identifier(column));
                Ok(())
            })?;
            self.write(")");
        }
        self.write(" ");
        self.set_expression(&insert.source)?;
        self.returning(&insert.returning)
    }

    fn delete(&mut self, delete: &Delete) -> Result<(), FormatError> {
        self.write("delete from ");
        self.table_reference(&delete.table)?;

        if !delete.using.is_empty() {
            self.write(" using ");
            self.comma_separated(&delete.using, Self::from_clause)?;
        }

        if let Some(where_clause) = &delete.where_clause {
            self.write(" where ");
            self.expression(where_clause)?;
        }

        self.returning(&delete.returning)
    }

    fn values(&mut self, values: &Values) -> Result<(), FormatError> {
        self.write("values ");
        self.comma_separated(&values.rows, |writer, row| {
            writer.write("(");
            writer.comma_separated(row, Self::expression)?;
            writer.write(")");
            Ok(())
        })
    }

    fn merge(&mut self, merge: &Merge) -> Result<(), FormatError> {
        self.write("merge into ");
        self.table_reference(&merge.into)?;
        self.write(" using ");
        self.table_reference(&merge.using)?;
        self.write(" on ");
        self.expression(&merge.on)?;

        for action in &merge.actions {
            self.write(if action.matched {
                " when matched"
            } else {
                " when not matched"
            });

            if let Some(predicate) = &action.predicate {
                self.write(" and ");
                self.expression(predicate)?;
            }

            self.write(" then ");
            match &action.kind {
                MergeActionKind::Update(assignments) => {
                    self.write("update set ");
                    self.assignments(assignments)?;
                }
                MergeActionKind::Insert { shape, values } => {
                    self.write("insert (");
                    self.comma_separated(shape, |writer, column| {
                        writer.write(&quote_identifier(column));
                        Ok(())
                    })?;
                    self.write(") values (");
                    self.comma_separated(values, Self::expression)?;
                    self.write(")");
                }
                MergeActionKind::Delete => self.write("delete"),
                MergeActionKind::DoNothing => self.write("do nothing"),
            }
        }

        Ok(())
    }
}

fn array_cast(literal: &Literal) -> Result<DataType, FormatError> {
    if literal.cast_type.is_array() {
        return Ok(literal.cast_type);
    }

    value_to_data_type(&literal.value).map_err(|_| FormatError::UnsupportedValue {
        value: literal.value.to_json_string(),
    })
}

fn array_literal<T: ToString>(values: &[T], literal: &Literal) -> Result<String, FormatError> {
    let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
    Ok(format!("array[{}]::{}", rendered.join(", "), array_cast(literal)?))
}

fn needs_parentheses(operand: &Expression, parent: Operator, is_right: bool) -> bool {
    let (operator, precedence) = match operand {
        Expression::Binary(binary) => (binary.operator, binary.operator.precedence()),
        Expression::Unary(unary) => (unary.operator, unary.operator.precedence()),
        Expression::Between(_) => (Operator::In, Operator::In.precedence()),
        _ => return false,
    };

    let parent_precedence = parent.precedence();
    if precedence != parent_precedence {
        return precedence < parent_precedence;
    }

    if is_right {
        !(operator == parent && parent.is_associative())
    } else {
        // comparison-level operators do not chain in PostgreSQL
        (4..=6).contains(&precedence)
    }
}
