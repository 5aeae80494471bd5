//! SET clauses lowered into update CTEs

use cypher_pgsql::translate::TranslationError;
use serde_json::{json, Value as Json};

use super::common::*;

fn set_property(symbol: &str, field: &str, value: Json) -> Json {
    json!({ "property": {
        "lookup": { "atom": variable(symbol), "symbols": [field] },
        "value": value
    }})
}

fn set_labels(symbol: &str, kinds: &[&str]) -> Json {
    json!({ "labels": { "variable": symbol, "kinds": kinds } })
}

fn set(items: Vec<Json>) -> Json {
    json!({ "set": { "items": items } })
}

#[test]
fn test_property_assignment_updates_node_table() {
    let query = single_part(
        vec![pattern(vec![node("n", &["User"])])],
        None,
        vec![set(vec![set_property("n", "name", string("x"))])],
        Some(returning(&["n"])),
    );

    let sql = translate_sql(&query);

    assert!(sql.contains(
        "un0 as (update node un0 set properties = jsonb_set(un0.properties, array['name']::text[], to_jsonb('x'::text)) \
         from n0 where (n0.n0).id = un0.id \
         returning (un0.id, un0.kind_ids, un0.properties)::nodecomposite as n0)"
    ));
    assert!(sql.ends_with("select un0.n0 as n from un0"));
}

#[test]
fn test_property_and_kind_assignments_share_one_update() {
    let query = single_part(
        vec![pattern(vec![node("n", &[])])],
        None,
        vec![set(vec![
            set_property("n", "visits", integer(1)),
            set_labels("n", &["Admin"]),
        ])],
        Some(returning(&["n"])),
    );

    let translated = translate(&query).unwrap();
    let sql = translated.to_sql().unwrap();
    println!("Generated SQL:\n{}", sql);

    assert_eq!(sql.matches("update node").count(), 1);
    assert!(sql.contains(
        "set properties = jsonb_set(un0.properties, array['visits']::text[], '1'::jsonb), \
         kind_ids = un0.kind_ids || array[2]::int2[]"
    ));
}

#[test]
fn test_map_merge_concatenates_jsonb() {
    let merge = json!({ "merge": {
        "variable": "n",
        "value": { "literal": { "value": { "role": "admin" } } }
    }});

    let query = single_part(
        vec![pattern(vec![node("n", &[])])],
        None,
        vec![set(vec![merge])],
        Some(returning(&["n"])),
    );

    let sql = translate_sql(&query);
    assert!(sql.contains(r#"set properties = un0.properties || '{"role":"admin"}'::jsonb"#));
}

#[test]
fn test_parameter_assignment() {
    let value = json!({ "parameter": { "symbol": "name", "value": "carol" } });
    let query = single_part(
        vec![pattern(vec![node("n", &[])])],
        None,
        vec![set(vec![set_property("n", "name", value)])],
        Some(returning(&["n"])),
    );

    let translated = translate(&query).unwrap();
    let sql = translated.to_sql().unwrap();
    println!("Generated SQL:\n{}", sql);

    assert!(sql.contains("to_jsonb(@p0)"));
    assert!(translated.parameters.contains_key("@p0"));
}

#[test]
fn test_edge_update_keeps_other_bindings() {
    let query = single_part(
        vec![pattern(vec![
            node("a", &[]),
            outbound("r", &["MemberOf"]),
            node("b", &[]),
        ])],
        None,
        vec![set(vec![set_property("r", "weight", integer(2))])],
        Some(returning(&["a", "r"])),
    );

    let sql = translate_sql(&query);

    assert!(sql.contains("eu0 as (update edge eu0 set properties = jsonb_set(eu0.properties, array['weight']::text[], '2'::jsonb)"));
    assert!(sql.contains("where (e0.e0).id = eu0.id"));
    assert!(sql.contains(
        "returning e0.n0 as n0, e0.n1 as n1, (eu0.id, eu0.start_id, eu0.end_id, eu0.kind_id, eu0.properties)::edgecomposite as e0"
    ));
    assert!(sql.ends_with("select eu0.n0 as a, eu0.e0 as r from eu0"));
}

#[test]
fn test_update_without_return_selects_one() {
    let query = single_part(
        vec![pattern(vec![node("n", &[])])],
        None,
        vec![set(vec![set_property("n", "visits", integer(1))])],
        None,
    );

    let sql = translate_sql(&query);
    assert!(sql.contains("update node un0"));
    assert!(sql.ends_with(") select 1"));
}

#[test]
fn test_kind_assignment_on_edge_is_rejected() {
    let query = single_part(
        vec![pattern(vec![node("a", &[]), outbound("r", &[]), node("b", &[])])],
        None,
        vec![set(vec![set_labels("r", &["Admin"])])],
        Some(returning(&["r"])),
    );

    assert!(matches!(
        translate(&query),
        Err(TranslationError::UnsupportedOperandType { .. })
    ));
}
