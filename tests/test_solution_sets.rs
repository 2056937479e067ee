//! S4 (spec.md §8): `setof/3` sorts and dedupes across the witness grouping;
//! `bagof/3` preserves encounter order and fails on an empty group;
//! `findall/3` never fails.

mod common;

#[test]
fn setof_groups_by_witness_sorts_and_dedupes() {
    let mut engine = common::engine();
    common::consult(
        &mut engine,
        "foo(a,b,c). foo(a,b,d). foo(b,c,e). foo(b,c,f). foo(c,c,g).",
    );
    let rows = common::solutions(&mut engine, "setof(Z, X^Y^foo(X,Y,Z), L)", 10);
    let ls: Vec<String> = rows.into_iter().map(|r| r.into_iter().next().unwrap().1).collect();
    assert_eq!(ls, vec!["[c,d,e,f,g]"]);
}

#[test]
fn setof_backtracks_over_witness_groups_without_existential_quantifier() {
    let mut engine = common::engine();
    common::consult(
        &mut engine,
        "likes(mary, wine). likes(mary, food). likes(john, wine).",
    );
    let rows = common::solutions(&mut engine, "setof(W, likes(P, W), L)", 10);
    assert_eq!(rows.len(), 2, "one group per distinct P witness");
}

#[test]
fn bagof_preserves_encounter_order_and_duplicates() {
    let mut engine = common::engine();
    common::consult(&mut engine, "foo(a,b,c). foo(a,b,d). foo(a,b,c).");
    let rows = common::solutions(&mut engine, "bagof(Z, X^Y^foo(X,Y,Z), L)", 1);
    assert_eq!(rows, vec![vec![("L".to_string(), "[c,d,c]".to_string())]]);
}

#[test]
fn bagof_fails_on_no_solutions() {
    let mut engine = common::engine();
    common::consult(&mut engine, "foo(a).");
    let rows = common::solutions(&mut engine, "bagof(X, foo(nonexistent), L)", 1);
    assert!(rows.is_empty());
}

#[test]
fn findall_returns_empty_list_on_no_solutions() {
    let mut engine = common::engine();
    common::consult(&mut engine, "foo(a).");
    let rows = common::solutions(&mut engine, "findall(X, foo(nonexistent), L)", 1);
    assert_eq!(rows, vec![vec![("L".to_string(), "[]".to_string())]]);
}

#[test]
fn setof_and_bagof_fail_under_exactly_the_same_condition() {
    let mut engine = common::engine();
    common::consult(&mut engine, "foo(a).");
    let setof_rows = common::solutions(&mut engine, "setof(X, foo(nonexistent), L)", 1);
    let bagof_rows = common::solutions(&mut engine, "bagof(X, foo(nonexistent), L)", 1);
    assert_eq!(setof_rows.is_empty(), bagof_rows.is_empty());
}
