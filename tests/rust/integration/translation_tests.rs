//! Node selects, traversals, parameters and projections

use cypher_pgsql::pgsql::Value;
use cypher_pgsql::translate::{self, TranslationError};
use serde_json::json;

use super::common::*;

#[test]
fn test_node_select_with_kind_and_property() {
    let mut user = node("n", &["User"]);
    user["node"]["properties"] = json!([{ "key": "name", "value": string("bob") }]);

    let query = single_part(vec![pattern(vec![user])], None, vec![], Some(returning(&["n"])));
    let sql = translate_sql(&query);

    assert_eq!(
        sql,
        "with n0 as (select (n0.id, n0.kind_ids, n0.properties)::nodecomposite as n0 from node n0 \
         where n0.kind_ids operator (pg_catalog.&&) array[1]::int2[] and n0.properties ->> 'name' = 'bob') \
         select n0.n0 as n from n0"
    );
}

#[test]
fn test_traversal_joins_edge_and_nodes() {
    let query = single_part(
        vec![pattern(vec![
            node("a", &["User"]),
            outbound("r", &["MemberOf"]),
            node("b", &[]),
        ])],
        None,
        vec![],
        Some(returning(&["b"])),
    );

    let translated = translate(&query).unwrap();
    let sql = translated.to_sql().unwrap();
    println!("Generated SQL:\n{}", sql);

    let ctes = translated.statement.as_query().unwrap().ctes();
    assert_eq!(ctes.len(), 1, "node lookups fold into the traversal step");
    assert!(!sql.contains("recursive"));

    assert!(sql.contains("from node n0 join edge e0 on n0.id = e0.start_id join node n1 on n1.id = e0.end_id"));
    assert!(sql.contains("n0.kind_ids operator (pg_catalog.&&) array[1]::int2[]"));
    assert!(sql.contains("e0.kind_id = any(array[11]::int2[])"));
    assert!(sql.ends_with("select e0.n1 as b from e0"));
}

#[test]
fn test_cross_binding_constraint_lands_on_joining_step() {
    let query = single_part(
        vec![pattern(vec![
            node("a", &[]),
            outbound("r", &[]),
            node("b", &[]),
        ])],
        Some(json!({ "conjunction": [
            equals(property("a", "name"), string("a")),
            equals(property("b", "name"), string("b")),
            equals(property("a", "other"), property("b", "other")),
        ]})),
        vec![],
        Some(returning(&["a", "b"])),
    );

    let sql = translate_sql(&query);

    // b's own filter joins b in, the rest filters the step
    assert!(sql.contains("join node n1 on n1.properties ->> 'name' = 'b' and n1.id = e0.end_id"));
    assert!(sql.contains("where n0.properties ->> 'name' = 'a'"));
    assert!(sql.contains("n0.properties -> 'other' = n1.properties -> 'other'"));
    assert!(sql.ends_with("select e0.n0 as a, e0.n1 as b from e0"));
}

#[test]
fn test_second_pattern_part_reads_previous_frame() {
    let query = single_part(
        vec![
            pattern(vec![node("a", &[]), outbound("r", &[]), node("b", &[])]),
            pattern(vec![node("b", &[]), outbound("s", &[]), node("c", &[])]),
        ],
        None,
        vec![],
        Some(returning(&["c"])),
    );

    let translated = translate(&query).unwrap();
    let sql = translated.to_sql().unwrap();
    println!("Generated SQL:\n{}", sql);

    assert_eq!(translated.statement.as_query().unwrap().ctes().len(), 2);
    assert!(sql.contains("e1.start_id = (e0.n1).id"));
    assert!(sql.contains("e0.n0 as n0, e0.e0 as e0, e0.n1 as n1"));
    assert!(sql.ends_with("select e1.n2 as c from e1"));
}

#[test]
fn test_parameters_are_numbered_and_reused() {
    let name = json!({ "parameter": { "symbol": "name", "value": "bob" } });
    let query = single_part(
        vec![pattern(vec![node("n", &[])])],
        Some(json!({ "disjunction": [
            equals(property("n", "name"), name.clone()),
            equals(property("n", "alias"), name),
        ]})),
        vec![],
        Some(returning(&["n"])),
    );

    let translated = translate(&query).unwrap();
    let sql = translated.to_sql().unwrap();
    println!("Generated SQL:\n{}", sql);

    assert!(sql.contains(
        "n0.properties ->> 'name' = @p0 or n0.properties ->> 'alias' = @p0"
    ));
    assert_eq!(translated.parameters.len(), 1);
    assert_eq!(translated.parameters.get("@p0"), Some(&Value::from("bob")));
}

#[test]
fn test_conjunction_as_first_disjunct_stays_whole() {
    let query = single_part(
        vec![pattern(vec![node("a", &[])])],
        Some(json!({ "disjunction": [
            { "parenthetical": { "conjunction": [
                equals(property("a", "name"), string("x")),
                equals(property("a", "num"), integer(1)),
            ]}},
            equals(property("a", "name"), string("y")),
        ]})),
        vec![],
        Some(returning(&["a"])),
    );

    let sql = translate_sql(&query);

    assert!(sql.contains(
        "where n0.properties ->> 'name' = 'x' and (n0.properties -> 'num')::int8 = 1 \
         or n0.properties ->> 'name' = 'y')"
    ));
}

#[test]
fn test_outer_conjunct_is_split_from_nested_disjunction() {
    let query = single_part(
        vec![pattern(vec![node("a", &[])])],
        Some(json!({ "conjunction": [
            equals(property("a", "k"), integer(0)),
            { "parenthetical": { "disjunction": [
                { "parenthetical": { "conjunction": [
                    equals(property("a", "name"), string("x")),
                    equals(property("a", "num"), integer(1)),
                ]}},
                equals(property("a", "name"), string("y")),
            ]}},
        ]})),
        vec![],
        Some(returning(&["a"])),
    );

    let sql = translate_sql(&query);

    assert!(sql.contains(
        "where (n0.properties -> 'k')::int8 = 0 and (n0.properties ->> 'name' = 'x' \
         and (n0.properties -> 'num')::int8 = 1 or n0.properties ->> 'name' = 'y'))"
    ));
}

#[test]
fn test_three_way_conjunction_under_disjunction() {
    let query = single_part(
        vec![pattern(vec![node("a", &[]), outbound("r", &[]), node("b", &[])])],
        Some(json!({ "disjunction": [
            { "conjunction": [
                equals(property("a", "name"), string("x")),
                equals(property("b", "name"), string("y")),
                equals(property("a", "num"), integer(1)),
            ]},
            equals(property("b", "name"), string("z")),
        ]})),
        vec![],
        Some(returning(&["a", "b"])),
    );

    let sql = translate_sql(&query);

    // the whole disjunction depends on both ends, so it filters the step
    assert!(!sql.contains("join node n1 on n1.properties"));
    assert!(sql.contains(
        "n0.properties ->> 'name' = 'x' and n1.properties ->> 'name' = 'y' \
         and (n0.properties -> 'num')::int8 = 1 or n1.properties ->> 'name' = 'z'"
    ));
}

#[test]
fn test_escaped_quote_in_string_literal() {
    let query = single_part(
        vec![pattern(vec![node("n", &[])])],
        Some(equals(property("n", "name"), string(r"it\'s"))),
        vec![],
        Some(returning(&["n"])),
    );

    let sql = translate_sql(&query);

    assert!(sql.contains("where n0.properties ->> 'name' = 'it''s'"));
    assert!(!sql.contains(r"\'"));
}

#[test]
fn test_order_skip_and_limit() {
    let mut projection = returning(&["n"]);
    projection["order"] = json!({ "items": [{ "ascending": false, "expression": property("n", "name") }] });
    projection["skip"] = integer(5);
    projection["limit"] = integer(10);

    let query = single_part(vec![pattern(vec![node("n", &[])])], None, vec![], Some(projection));
    let sql = translate_sql(&query);

    assert!(sql.contains("order by (n0.n0).properties -> 'name' desc"));
    assert!(sql.ends_with("offset 5 limit 10"));
}

#[test]
fn test_limit_rejects_expressions() {
    let mut projection = returning(&["n"]);
    projection["limit"] = property("n", "size");

    let query = single_part(vec![pattern(vec![node("n", &[])])], None, vec![], Some(projection));
    assert!(matches!(
        translate(&query),
        Err(TranslationError::UnsupportedOperandType { .. })
    ));
}

#[test]
fn test_path_binding_projects_composite() {
    let mut path = pattern(vec![node("a", &[]), outbound("r", &[]), node("b", &[])]);
    path["binding"] = json!("p");

    let query = single_part(vec![path], None, vec![], Some(returning(&["p"])));
    let sql = translate_sql(&query);

    assert!(sql.contains(
        "(array[e0.n0, e0.n1]::nodecomposite[], array[e0.e0]::edgecomposite[])::pathcomposite as p"
    ));
}

#[test]
fn test_unmapped_kind_is_reported() {
    let query = single_part(
        vec![pattern(vec![node("n", &["Group", "User", "Computer"])])],
        None,
        vec![],
        Some(returning(&["n"])),
    );

    assert_eq!(
        translate(&query).err(),
        Some(TranslationError::UnmappedKind {
            kinds: vec!["Group".to_string(), "Computer".to_string()]
        })
    );
}

#[test]
fn test_relationship_rebinding_is_rejected() {
    let query = single_part(
        vec![
            pattern(vec![node("a", &[]), outbound("r", &[]), node("b", &[])]),
            pattern(vec![node("b", &[]), outbound("r", &[]), node("c", &[])]),
        ],
        None,
        vec![],
        Some(returning(&["c"])),
    );

    assert_eq!(
        translate(&query).err(),
        Some(TranslationError::RelationshipRebinding {
            identifier: "r".to_string()
        })
    );
}

#[test]
fn test_unsupported_clauses() {
    let optional = query(json!({ "single_query": { "single_part": {
        "reading_clauses": [{ "match": { "optional": true, "pattern": [pattern(vec![node("n", &[])])] } }],
        "return_clause": { "projection": returning(&["n"]) }
    }}}));
    assert!(matches!(
        translate(&optional),
        Err(TranslationError::UnsupportedClause { .. })
    ));

    let multi_part = query(json!({ "single_query": { "multi_part": { "parts": [] } } }));
    assert!(matches!(
        translate(&multi_part),
        Err(TranslationError::UnsupportedClause { .. })
    ));
}

#[test]
fn test_unknown_function_fails_early() {
    let projection = json!({ "items": [{
        "expression": { "function_invocation": { "name": "apoc.text.join", "arguments": [variable("n")] } },
        "binding": "joined"
    }]});

    let query = single_part(vec![pattern(vec![node("n", &[])])], None, vec![], Some(projection));
    assert_eq!(
        translate(&query).err(),
        Some(TranslationError::UnsupportedFunction {
            name: "apoc.text.join".to_string()
        })
    );
}

#[test]
fn test_batch_renders_one_statement_per_line() {
    let config = cypher_pgsql::config::TranslatorConfig {
        kinds: kinds(),
        ..Default::default()
    };
    let queries = vec![
        single_part(vec![pattern(vec![node("n", &["User"])])], None, vec![], Some(returning(&["n"]))),
        single_part(vec![pattern(vec![node("m", &[])])], None, vec![], Some(returning(&["m"]))),
    ];

    let translated = translate::translate_all(&queries, &config).unwrap();
    let batch = translate::format_batch(&translated).unwrap();
    println!("Generated SQL:\n{}", batch);

    let lines: Vec<&str> = batch.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| line.ends_with(';')));
    assert!(lines[1].ends_with("select n0.n0 as m from n0;"));
}
