//! Lowering of Cypher function invocations.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::pgsql::{functions, DataType, Expression, FunctionCall, COLUMN_ID};

use super::errors::TranslationError;
use super::inference::{resolve_property_lookups, rewrite_property_lookup};

/// Settings a lowering may consult.
#[derive(Debug, Clone, Copy)]
pub struct FunctionContext {
    pub timestamp_precision: u8,
}

type Lowering = fn(&FunctionContext, Vec<Expression>) -> Result<Expression, TranslationError>;

lazy_static! {
    static ref FUNCTIONS: HashMap<&'static str, Lowering> = {
        let mut registry: HashMap<&'static str, Lowering> = HashMap::new();
        registry.insert("id", lower_id);
        registry.insert("date", lower_date);
        registry.insert("time", lower_time);
        registry.insert("localtime", lower_local_time);
        registry.insert("datetime", lower_datetime);
        registry.insert("localdatetime", lower_local_datetime);
        registry.insert("tolower", lower_to_lower);
        registry.insert("toupper", lower_to_upper);
        registry
    };
}

pub fn is_supported(name: &str) -> bool {
    FUNCTIONS.contains_key(name.to_lowercase().as_str())
}

/// Lowers `name(arguments)`; names match case-insensitively.
pub fn translate_function(
    context: &FunctionContext,
    name: &str,
    arguments: Vec<Expression>,
) -> Result<Expression, TranslationError> {
    let lowering = FUNCTIONS
        .get(name.to_lowercase().as_str())
        .ok_or_else(|| TranslationError::UnsupportedFunction {
            name: name.to_string(),
        })?;

    log::debug!("lowering function {} with {} arguments", name, arguments.len());
    lowering(context, arguments)
}

fn arity_error(name: &str, expected: &str, received: usize) -> TranslationError {
    TranslationError::FunctionArity {
        name: name.to_string(),
        expected: expected.to_string(),
        received,
    }
}

fn single_argument(name: &str, arguments: Vec<Expression>) -> Result<Expression, TranslationError> {
    let received = arguments.len();
    let mut arguments = arguments.into_iter();

    match (arguments.next(), arguments.next()) {
        (Some(argument), None) => Ok(argument),
        _ => Err(arity_error(name, "1", received)),
    }
}

fn precision_literal(context: &FunctionContext) -> Expression {
    Expression::literal(i64::from(context.timestamp_precision))
}

/// Temporal constructors: no argument reads the clock, one argument converts it.
fn temporal(
    name: &str,
    arguments: Vec<Expression>,
    data_type: DataType,
    clock: impl FnOnce() -> FunctionCall,
) -> Result<Expression, TranslationError> {
    match arguments.len() {
        0 => Ok(Expression::function(clock())),
        1 => {
            let argument = single_argument(name, arguments)?;
            Ok(match argument {
                lookup if lookup.is_property_lookup() => rewrite_property_lookup(lookup, data_type),
                other => Expression::cast(other, data_type),
            })
        }
        received => Err(arity_error(name, "0 or 1", received)),
    }
}

fn lower_id(_: &FunctionContext, arguments: Vec<Expression>) -> Result<Expression, TranslationError> {
    match single_argument("id", arguments)? {
        Expression::Identifier(identifier) => Ok(Expression::compound([
            identifier,
            crate::pgsql::Identifier::from(COLUMN_ID),
        ])),
        other => Err(TranslationError::unsupported_operand(other, "argument of id()")),
    }
}

fn lower_date(_: &FunctionContext, arguments: Vec<Expression>) -> Result<Expression, TranslationError> {
    temporal("date", arguments, DataType::Date, || {
        FunctionCall::bare(functions::CURRENT_DATE, DataType::Date)
    })
}

fn lower_time(_: &FunctionContext, arguments: Vec<Expression>) -> Result<Expression, TranslationError> {
    temporal("time", arguments, DataType::TimeWithTimeZone, || {
        FunctionCall::bare(functions::CURRENT_TIME, DataType::TimeWithTimeZone)
    })
}

fn lower_local_time(
    context: &FunctionContext,
    arguments: Vec<Expression>,
) -> Result<Expression, TranslationError> {
    temporal("localtime", arguments, DataType::TimeWithoutTimeZone, || {
        FunctionCall::new(
            functions::LOCAL_TIME,
            vec![precision_literal(context)],
            DataType::TimeWithoutTimeZone,
        )
    })
}

fn lower_datetime(
    _: &FunctionContext,
    arguments: Vec<Expression>,
) -> Result<Expression, TranslationError> {
    temporal("datetime", arguments, DataType::TimestampWithTimeZone, || {
        FunctionCall::new(functions::NOW, Vec::new(), DataType::TimestampWithTimeZone)
    })
}

fn lower_local_datetime(
    context: &FunctionContext,
    arguments: Vec<Expression>,
) -> Result<Expression, TranslationError> {
    temporal(
        "localdatetime",
        arguments,
        DataType::TimestampWithoutTimeZone,
        || {
            FunctionCall::new(
                functions::LOCAL_TIMESTAMP,
                vec![precision_literal(context)],
                DataType::TimestampWithoutTimeZone,
            )
        },
    )
}

fn text_function(
    name: &str,
    function: &str,
    arguments: Vec<Expression>,
) -> Result<Expression, TranslationError> {
    let argument = match single_argument(name, arguments)? {
        lookup if lookup.is_property_lookup() => rewrite_property_lookup(lookup, DataType::Text),
        other => resolve_property_lookups(other),
    };

    Ok(Expression::function(FunctionCall::new(
        function,
        vec![argument],
        DataType::Text,
    )))
}

fn lower_to_lower(
    _: &FunctionContext,
    arguments: Vec<Expression>,
) -> Result<Expression, TranslationError> {
    text_function("tolower", functions::LOWER, arguments)
}

fn lower_to_upper(
    _: &FunctionContext,
    arguments: Vec<Expression>,
) -> Result<Expression, TranslationError> {
    text_function("toupper", functions::UPPER, arguments)
}
