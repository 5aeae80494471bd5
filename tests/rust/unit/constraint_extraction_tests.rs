//! Constraint extraction from WHERE conjunctions
//!
//! Drives the expression tree translator the way the query walker does and checks which
//! predicates end up attached to which bindings.

use cypher_pgsql::pgsql::format::ToSql;
use cypher_pgsql::pgsql::{ArrayLiteral, DataType, Expression, IdentifierSet, Operator};
use cypher_pgsql::translate::expression::ExpressionTreeTranslator;
use cypher_pgsql::translate::rewrite::references;

fn field(root: &str, name: &str) -> Expression {
    Expression::compound([root, name])
}

fn scope(names: &[&str]) -> IdentifierSet {
    names.iter().copied().collect()
}

/// `left op right` reduced onto the stack.
fn comparison(
    tree: &mut ExpressionTreeTranslator,
    left: Expression,
    operator: Operator,
    right: Expression,
) {
    tree.push_operator(operator);
    tree.push(left);
    tree.push(right);
    tree.pop_push_operator(operator).unwrap();
}

/// Walks an n-ary `operator` node: every operator is announced before the first operand, then
/// one reduction follows each later operand.
fn compound(
    tree: &mut ExpressionTreeTranslator,
    operator: Operator,
    operands: usize,
    mut operand: impl FnMut(&mut ExpressionTreeTranslator, usize),
) {
    for _ in 1..operands {
        tree.push_operator(operator);
    }

    for index in 0..operands {
        operand(tree, index);
        if index > 0 {
            tree.pop_push_operator(operator).unwrap();
        }
    }
}

/// Walks `first AND rest[0] AND rest[1] ...` as a conjunction node.
fn conjunction(
    tree: &mut ExpressionTreeTranslator,
    operands: Vec<(Expression, Operator, Expression)>,
) {
    let count = operands.len();
    let mut operands = operands.into_iter();

    compound(tree, Operator::And, count, |tree, _| {
        let (left, operator, right) = operands.next().unwrap();
        comparison(tree, left, operator, right);
    });
}

fn equals_text(tree: &mut ExpressionTreeTranslator, root: &str, name: &str, value: &str) {
    comparison(tree, field(root, name), Operator::Equals, Expression::literal(value));
}

fn render(expression: Option<Expression>) -> String {
    expression
        .expect("constraint should carry an expression")
        .to_sql()
        .unwrap()
}

#[test]
fn test_conjunction_splits_by_dependency_set() {
    let mut tree = ExpressionTreeTranslator::new();

    conjunction(
        &mut tree,
        vec![
            (field("a", "name"), Operator::Equals, Expression::literal("a")),
            (field("a", "num_a"), Operator::GreaterThan, Expression::literal(1i64)),
            (field("b", "name"), Operator::Equals, Expression::literal("b")),
            (field("a", "other"), Operator::Equals, field("b", "other")),
        ],
    );

    assert!(tree.is_empty(), "every conjunct should be extracted");
    assert_eq!(tree.constraints().len(), 3);

    let for_a = tree.consume_set(&scope(&["a"]));
    assert_eq!(for_a.dependencies, scope(&["a"]));
    assert_eq!(render(for_a.expression), "a.name = 'a' and a.num_a > 1");

    let for_b = tree.consume_set(&scope(&["b"]));
    assert_eq!(render(for_b.expression), "b.name = 'b'");

    let joined = tree.consume_set(&scope(&["a", "b"]));
    assert_eq!(joined.dependencies, scope(&["a", "b"]));
    assert_eq!(render(joined.expression), "a.other = b.other");

    assert!(tree.constraints().is_empty());
}

#[test]
fn test_unsatisfied_constraints_wait_for_wider_scope() {
    let mut tree = ExpressionTreeTranslator::new();

    conjunction(
        &mut tree,
        vec![
            (field("a", "other"), Operator::Equals, field("b", "other")),
            (field("a", "name"), Operator::Equals, Expression::literal("a")),
        ],
    );

    let for_b = tree.consume_set(&scope(&["b"]));
    assert!(for_b.is_empty());
    assert_eq!(tree.constraints().len(), 2);

    let for_a = tree.consume_set(&scope(&["a"]));
    assert_eq!(render(for_a.expression), "a.name = 'a'");

    let rest = tree.consume_all();
    assert_eq!(render(rest.expression), "a.other = b.other");
}

#[test]
fn test_disjunction_extracts_nothing() {
    let mut tree = ExpressionTreeTranslator::new();

    compound(&mut tree, Operator::Or, 2, |tree, index| match index {
        0 => equals_text(tree, "a", "name", "a"),
        _ => equals_text(tree, "b", "name", "b"),
    });

    assert!(tree.constraints().is_empty());
    assert_eq!(tree.depth(), 1);

    let combined = tree.peek().unwrap();
    assert_eq!(references(combined), scope(&["a", "b"]));
    assert_eq!(combined.to_sql().unwrap(), "a.name = 'a' or b.name = 'b'");
}

#[test]
fn test_conjunction_under_disjunction_stays_whole() {
    let mut tree = ExpressionTreeTranslator::new();

    // a.name = 'a' OR (b.name = 'b' AND b.num > 1)
    compound(&mut tree, Operator::Or, 2, |tree, index| match index {
        0 => equals_text(tree, "a", "name", "a"),
        _ => conjunction(
            tree,
            vec![
                (field("b", "name"), Operator::Equals, Expression::literal("b")),
                (field("b", "num"), Operator::GreaterThan, Expression::literal(1i64)),
            ],
        ),
    });

    assert!(tree.constraints().is_empty());
    assert_eq!(tree.depth(), 1);
}

#[test]
fn test_conjunction_as_first_disjunct_stays_whole() {
    let mut tree = ExpressionTreeTranslator::new();

    // (a.name = 'x' AND a.num = 1) OR a.name = 'y'
    compound(&mut tree, Operator::Or, 2, |tree, index| match index {
        0 => conjunction(
            tree,
            vec![
                (field("a", "name"), Operator::Equals, Expression::literal("x")),
                (field("a", "num"), Operator::Equals, Expression::literal(1i64)),
            ],
        ),
        _ => equals_text(tree, "a", "name", "y"),
    });

    assert!(tree.constraints().is_empty());
    assert_eq!(tree.depth(), 1);
    assert_eq!(
        tree.peek().unwrap().to_sql().unwrap(),
        "a.name = 'x' and a.num = 1 or a.name = 'y'"
    );
}

#[test]
fn test_conjunct_beside_nested_disjunction_is_extracted_alone() {
    let mut tree = ExpressionTreeTranslator::new();

    // a.k = 0 AND ((a.name = 'x' AND a.num = 1) OR a.name = 'y')
    compound(&mut tree, Operator::And, 2, |tree, index| match index {
        0 => comparison(tree, field("a", "k"), Operator::Equals, Expression::literal(0i64)),
        _ => compound(tree, Operator::Or, 2, |tree, index| match index {
            0 => conjunction(
                tree,
                vec![
                    (field("a", "name"), Operator::Equals, Expression::literal("x")),
                    (field("a", "num"), Operator::Equals, Expression::literal(1i64)),
                ],
            ),
            _ => equals_text(tree, "a", "name", "y"),
        }),
    });

    assert!(tree.is_empty());
    assert_eq!(tree.constraints().len(), 1);

    let for_a = tree.consume_set(&scope(&["a"]));
    assert_eq!(
        render(for_a.expression),
        "a.k = 0 and (a.name = 'x' and a.num = 1 or a.name = 'y')"
    );
}

#[test]
fn test_like_patterns() {
    let cases = [
        (Operator::Contains, "a.name like '%v%'"),
        (Operator::StartsWith, "a.name like 'v%'"),
        (Operator::EndsWith, "a.name like '%v'"),
    ];

    for (operator, expected) in cases {
        let mut tree = ExpressionTreeTranslator::new();
        comparison(&mut tree, field("a", "name"), operator, Expression::literal("v"));

        assert_eq!(tree.pop().unwrap().to_sql().unwrap(), expected);
    }
}

#[test]
fn test_membership_against_int8_list() {
    let mut tree = ExpressionTreeTranslator::new();
    let list = Expression::ArrayLiteral(ArrayLiteral {
        values: vec![
            Expression::literal(1i64),
            Expression::literal(2i64),
            Expression::literal(3i64),
        ],
        cast_type: DataType::Int8Array,
    });

    comparison(&mut tree, field("x", "id"), Operator::In, list);

    assert_eq!(
        tree.pop().unwrap().to_sql().unwrap(),
        "x.id = any(array[1, 2, 3]::int8[])"
    );
}
