//! S2 (spec.md §8): cut commits to a clause and prunes later alternatives,
//! plus the if-then-else and `\+` control constructs that share its barrier
//! machinery.

mod common;

#[test]
fn cut_commits_and_prunes_remaining_clauses() {
    let mut engine = common::engine();
    common::consult(
        &mut engine,
        "p(a).
         p(b) :- !.
         p(c).",
    );
    let rows = common::solutions(&mut engine, "p(X)", 10);
    let xs: Vec<String> = rows
        .into_iter()
        .map(|row| row.into_iter().next().unwrap().1)
        .collect();
    assert_eq!(xs, vec!["a", "b"], "p(c) must never be tried after the cut in p(b) commits");
}

#[test]
fn cut_inside_disjunction_prunes_the_other_disjunct() {
    let mut engine = common::engine();
    let rows = common::solutions(&mut engine, "(X = 1, ! ; X = 2)", 10);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], vec![("X".to_string(), "1".to_string())]);
}

#[test]
fn if_then_else_commits_to_condition_first_solution() {
    let mut engine = common::engine();
    common::consult(&mut engine, "even(X) :- 0 is X mod 2.");
    assert_eq!(
        common::eval_binding(&mut engine, "(even(4) -> Y = yes ; Y = no)", "Y"),
        "yes"
    );
    assert_eq!(
        common::eval_binding(&mut engine, "(even(5) -> Y = yes ; Y = no)", "Y"),
        "no"
    );
}

#[test]
fn if_then_without_else_fails_when_condition_fails() {
    let mut engine = common::engine();
    let outcome = common::run_once(&mut engine, "(fail -> true)");
    assert!(matches!(outcome, prolog_core::promise::Outcome::False));
}

#[test]
fn negation_as_failure_does_not_leak_bindings() {
    let mut engine = common::engine();
    common::consult(&mut engine, "q(1). q(2).");
    let rows = common::solutions(&mut engine, "\\+ q(3), X = ok", 5);
    assert_eq!(rows, vec![vec![("X".to_string(), "ok".to_string())]]);
    let rows = common::solutions(&mut engine, "\\+ q(1)", 5);
    assert!(rows.is_empty(), "negation of a true goal must fail");
}
