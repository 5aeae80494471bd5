//! Cypher to PostgreSQL translation.
//!
//! A [`Translator`] walks one [`RegularQuery`] and lowers it into a single SQL query built from
//! a chain of common table expressions over the `node` and `edge` tables. Filters are split into
//! constraints keyed by the identifiers they read and attached to the first step that binds all
//! of them.

pub mod building;
pub mod constraints;
pub mod errors;
pub mod expression;
pub mod functions;
pub mod inference;
pub mod kinds;
pub mod pattern;
pub mod rewrite;
pub mod scope;
pub mod translator;

use std::collections::BTreeMap;

use crate::config::TranslatorConfig;
use crate::cypher::RegularQuery;
use crate::pgsql::format::{self, errors::FormatError};
use crate::pgsql::{Statement, Value};

pub use errors::TranslationError;
pub use functions::FunctionContext;
pub use kinds::{KindMap, KindMapper};
pub use translator::Translator;

/// Default fractional-second precision of clock functions.
pub const DEFAULT_TIMESTAMP_PRECISION: u8 = 6;

/// One translated statement and the caller-supplied values of its parameters, keyed by the
/// generated parameter identifiers (`@p0`, `@p1`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedStatement {
    pub statement: Statement,
    pub parameters: BTreeMap<String, Value>,
}

impl TranslatedStatement {
    pub fn to_sql(&self) -> Result<String, FormatError> {
        format::statement(&self.statement)
    }
}

/// Translates `query`, resolving kind names through `kinds`.
pub fn translate<K: KindMapper>(
    query: &RegularQuery,
    kinds: &K,
) -> Result<TranslatedStatement, TranslationError> {
    let context = FunctionContext {
        timestamp_precision: DEFAULT_TIMESTAMP_PRECISION,
    };

    Translator::new(kinds, context).translate(query)
}

pub fn translate_with_config(
    query: &RegularQuery,
    config: &TranslatorConfig,
) -> Result<TranslatedStatement, TranslationError> {
    let context = FunctionContext {
        timestamp_precision: config.timestamp_precision,
    };

    Translator::new(&config.kinds, context).translate(query)
}

/// Translates every query with a fresh translator, stopping at the first failure.
pub fn translate_all(
    queries: &[RegularQuery],
    config: &TranslatorConfig,
) -> Result<Vec<TranslatedStatement>, TranslationError> {
    queries
        .iter()
        .map(|query| translate_with_config(query, config))
        .collect()
}

/// Renders a batch as `;`-terminated statements, one per line.
pub fn format_batch(statements: &[TranslatedStatement]) -> Result<String, FormatError> {
    format::statements(statements.iter().map(|translated| &translated.statement))
}
