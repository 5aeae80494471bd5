//! Variable-length relationship lowering

use cypher_pgsql::pgsql::{Expression, Literal, SetExpression, Value};
use serde_json::{json, Value as Json};

use super::common::*;

fn expanding(binding: &str, kinds: &[&str], start: Option<i64>, end: Option<i64>) -> Json {
    let mut relationship = outbound(binding, kinds);
    relationship["relationship"]["range"] = json!({ "start_index": start, "end_index": end });
    relationship
}

fn admins_query() -> cypher_pgsql::cypher::RegularQuery {
    single_part(
        vec![pattern(vec![
            node("a", &["User"]),
            expanding("r", &["MemberOf"], Some(1), Some(3)),
            node("b", &[]),
        ])],
        Some(equals(property("b", "name"), string("admins"))),
        vec![],
        Some(returning(&["a", "b"])),
    )
}

#[test]
fn test_bounded_expansion_renders_recursive_cte() {
    let sql = translate_sql(&admins_query());

    assert_eq!(sql.matches("recursive").count(), 1);
    assert!(sql.starts_with(
        "with recursive ex0(root_id, next_id, depth, satisfied, is_cycle, path) as ("
    ));

    // Primer: first hops out of User nodes
    assert!(sql.contains(
        "select e0.start_id, e0.end_id, 1, false, e0.start_id = e0.end_id, array[e0.id]::int8[] \
         from edge e0 join node n0 on n0.kind_ids operator (pg_catalog.&&) array[1]::int2[] and n0.id = e0.start_id \
         where e0.kind_id = any(array[11]::int2[])"
    ));

    // Recursive branch: stops on cycles, on repeated edges, on a satisfied terminal and at the
    // maximum depth
    assert!(sql.contains(
        "union select ex0.root_id, e0.end_id, ex0.depth + 1, n1.properties ->> 'name' = 'admins', \
         e0.id = any(ex0.path), ex0.path || e0.id from ex0 join edge e0 on e0.start_id = ex0.next_id \
         join node n1 on n1.id = e0.end_id"
    ));
    assert!(sql.contains(
        "where not ex0.is_cycle and not ex0.satisfied and not (e0.id = any(ex0.path)) \
         and e0.kind_id = any(array[11]::int2[]) and ex0.depth < 3"
    ));

    // Projection of the expansion back into the frame
    assert!(sql.contains("join edge e0 on e0.id = ex0.path[array_length(ex0.path, 1)]"));
    assert!(sql.contains("join node n0 on n0.id = ex0.root_id"));
    assert!(sql.contains("join node n1 on n1.properties ->> 'name' = 'admins' and n1.id = e0.end_id"));
    assert!(sql.contains("where ex0.depth between 1 and 3"));
    assert!(sql.contains("array_agg("));
    assert!(sql.ends_with("select e0.n0 as a, e0.n1 as b from e0"));
}

#[test]
fn test_primer_and_recursive_branch_have_the_same_shape() {
    let translated = translate(&admins_query()).unwrap();
    let query = translated.statement.as_query().unwrap();

    let ctes = query.ctes();
    assert_eq!(ctes.len(), 2);
    assert_eq!(ctes[0].alias.name.as_str(), "ex0");
    assert_eq!(ctes[0].alias.shape.as_ref().map(Vec::len), Some(6));
    assert_eq!(ctes[1].alias.name.as_str(), "e0");

    let SetExpression::SetOperation(union) = &ctes[0].query.body else {
        panic!("expansion should be a set operation");
    };
    let (SetExpression::Select(primer), SetExpression::Select(recursive)) =
        (&union.left, &union.right)
    else {
        panic!("both sides of the expansion should be selects");
    };

    assert_eq!(primer.projection.len(), recursive.projection.len());
    assert_eq!(
        primer.projection[2],
        Expression::Literal(Literal::new(Value::Int8(1))),
        "primer rows start at depth 1"
    );
}

#[test]
fn test_unbounded_expansion_with_minimum_depth() {
    let query = single_part(
        vec![pattern(vec![
            node("a", &[]),
            expanding("r", &[], Some(2), None),
            node("b", &[]),
        ])],
        None,
        vec![],
        Some(returning(&["b"])),
    );

    let sql = translate_sql(&query);

    assert!(sql.contains("ex0.depth + 1, false, e0.id = any(ex0.path)"));
    assert!(!sql.contains("ex0.depth < "));
    assert!(!sql.contains("between"));
    assert!(sql.contains("where ex0.depth >= 2"));
}

#[test]
fn test_terminal_match_below_minimum_depth_keeps_expanding() {
    let query = single_part(
        vec![pattern(vec![
            node("a", &[]),
            expanding("r", &[], Some(3), Some(3)),
            node("b", &[]),
        ])],
        Some(equals(property("b", "name"), string("x"))),
        vec![],
        Some(returning(&["a", "b"])),
    );

    let sql = translate_sql(&query);

    assert!(sql.contains(
        "ex0.depth + 1, n1.properties ->> 'name' = 'x' and ex0.depth + 1 >= 3, e0.id = any(ex0.path)"
    ));
    assert!(sql.contains("where ex0.depth between 3 and 3"));
}

#[test]
fn test_terminal_match_at_minimum_depth_one_is_unguarded() {
    let sql = translate_sql(&admins_query());

    assert!(sql.contains("ex0.depth + 1, n1.properties ->> 'name' = 'admins', e0.id"));
    assert!(!sql.contains(">= 1"));
}

#[test]
fn test_recursive_branch_never_repeats_an_edge() {
    let query = single_part(
        vec![pattern(vec![
            node("a", &[]),
            expanding("r", &[], Some(1), Some(3)),
            node("b", &[]),
        ])],
        None,
        vec![],
        Some(returning(&["a", "b"])),
    );

    let sql = translate_sql(&query);

    // a self-loop primer row is still emitted; only the recursive branch checks the path
    assert!(sql.contains("e0.start_id = e0.end_id, array[e0.id]::int8[] from edge e0"));
    assert!(sql.contains(
        "where not ex0.is_cycle and not ex0.satisfied and not (e0.id = any(ex0.path)) and ex0.depth < 3"
    ));
    assert_eq!(sql.matches("not (e0.id = any(ex0.path))").count(), 1);
}

#[test]
fn test_expansion_from_materialized_root() {
    let query = single_part(
        vec![pattern(vec![
            node("a", &[]),
            outbound("r", &[]),
            node("b", &[]),
            expanding("s", &[], Some(1), Some(2)),
            node("c", &[]),
        ])],
        None,
        vec![],
        Some(returning(&["c"])),
    );

    let translated = translate(&query).unwrap();
    let sql = translated.to_sql().unwrap();
    println!("Generated SQL:\n{}", sql);

    assert_eq!(translated.statement.as_query().unwrap().ctes().len(), 3);
    assert!(sql.contains("e1.start_id = (e0.n1).id"));
    assert!(sql.contains("ex0.root_id = (e0.n1).id"));
    assert!(sql.ends_with("select e1.n2 as c from e1"));
}

#[test]
fn test_expanded_path_uses_edge_array() {
    let mut path = pattern(vec![
        node("a", &[]),
        expanding("r", &[], Some(1), Some(2)),
        node("b", &[]),
    ]);
    path["binding"] = json!("p");

    let query = single_part(vec![path], None, vec![], Some(returning(&["p"])));
    let sql = translate_sql(&query);

    assert!(sql.contains("(array[e0.n0, e0.n1]::nodecomposite[], e0.e0)::pathcomposite as p"));
}
