//! Query builders shared by the translation tests
//!
//! Queries are written as the JSON an external Cypher parser hands to the translator.

use cypher_pgsql::cypher::RegularQuery;
use cypher_pgsql::translate::{self, KindMap, TranslatedStatement, TranslationError};
use serde_json::{json, Value};

pub fn kinds() -> KindMap {
    [
        ("User".to_string(), 1),
        ("Admin".to_string(), 2),
        ("MemberOf".to_string(), 11),
        ("HasSession".to_string(), 12),
    ]
    .into_iter()
    .collect()
}

pub fn query(document: Value) -> RegularQuery {
    serde_json::from_value(document).expect("query document should deserialize")
}

/// `MATCH <pattern> [WHERE <where_clause>] [SET ...] [RETURN ...]` as a single part query.
pub fn single_part(
    patterns: Vec<Value>,
    where_clause: Option<Value>,
    updates: Vec<Value>,
    projection: Option<Value>,
) -> RegularQuery {
    let mut match_clause = json!({ "pattern": patterns });
    if let Some(expression) = where_clause {
        match_clause["where_clause"] = json!({ "expression": expression });
    }

    let mut part = json!({
        "reading_clauses": [{ "match": match_clause }],
        "updating_clauses": updates,
    });
    if let Some(projection) = projection {
        part["return_clause"] = json!({ "projection": projection });
    }

    query(json!({ "single_query": { "single_part": part } }))
}

pub fn pattern(elements: Vec<Value>) -> Value {
    json!({ "elements": elements })
}

pub fn node(binding: &str, kinds: &[&str]) -> Value {
    json!({ "node": { "binding": binding, "kinds": kinds } })
}

pub fn outbound(binding: &str, kinds: &[&str]) -> Value {
    json!({ "relationship": { "binding": binding, "kinds": kinds, "direction": "outbound" } })
}

pub fn variable(symbol: &str) -> Value {
    json!({ "variable": { "symbol": symbol } })
}

pub fn string(text: &str) -> Value {
    json!({ "literal": { "value": format!("'{}'", text) } })
}

pub fn integer(value: i64) -> Value {
    json!({ "literal": { "value": value } })
}

pub fn property(symbol: &str, field: &str) -> Value {
    json!({ "property_lookup": { "atom": variable(symbol), "symbols": [field] } })
}

pub fn equals(left: Value, right: Value) -> Value {
    json!({ "comparison": { "left": left, "partials": [{ "operator": "equals", "right": right }] } })
}

pub fn returning(symbols: &[&str]) -> Value {
    let items: Vec<Value> = symbols
        .iter()
        .map(|symbol| json!({ "expression": variable(symbol) }))
        .collect();

    json!({ "items": items })
}

pub fn translate(query: &RegularQuery) -> Result<TranslatedStatement, TranslationError> {
    translate::translate(query, &kinds())
}

/// Translates and renders, printing the SQL for inspection on failure.
pub fn translate_sql(query: &RegularQuery) -> String {
    let translated = translate(query).expect("query should translate");
    let sql = translated.to_sql().expect("statement should render");
    println!("Generated SQL:\n{}", sql);
    sql
}
