//! `functor/3`, `arg/3`, `=../2`, `copy_term/2`, `compare/3` (spec.md §4.H),
//! plus invariants 5 (copy_term) and 6 (round-trip `=..`).

mod common;

use prolog_core::promise::Outcome;

#[test]
fn functor_decomposes_a_compound() {
    let mut engine = common::engine();
    assert_eq!(
        common::eval_binding(&mut engine, "functor(f(a,b), N, A), X = N/A", "X"),
        "f/2"
    );
}

#[test]
fn functor_constructs_a_fresh_compound_from_name_and_arity() {
    let mut engine = common::engine();
    let rows = common::solutions(&mut engine, "functor(T, f, 2), T = f(_,_)", 1);
    assert_eq!(rows.len(), 1, "a freshly constructed f/2 term must unify with f(_,_)");
}

#[test]
fn functor_on_an_atomic_value_reports_arity_zero() {
    let mut engine = common::engine();
    assert_eq!(common::eval_binding(&mut engine, "functor(hello, N, A), X = N/A", "X"), "hello/0");
    assert_eq!(common::eval_binding(&mut engine, "functor(42, N, A), X = N/A", "X"), "42/0");
}

#[test]
fn arg_extracts_the_nth_one_indexed_argument() {
    let mut engine = common::engine();
    assert_eq!(common::eval_binding(&mut engine, "arg(2, f(a,b,c), X)", "X"), "b");
}

#[test]
fn arg_with_out_of_range_n_fails() {
    let mut engine = common::engine();
    let outcome = common::run_once(&mut engine, "arg(5, f(a,b,c), X)");
    assert!(matches!(outcome, Outcome::False));
}

#[test]
fn univ_decomposes_and_is_its_own_inverse() {
    let mut engine = common::engine();
    assert_eq!(common::eval_binding(&mut engine, "f(a,b) =.. L, X = L", "X"), "[f,a,b]");
    let rows = common::solutions(&mut engine, "T =.. [f,a,b], T = f(a,b)", 1);
    assert_eq!(rows.len(), 1);
}

#[test]
fn univ_on_an_atomic_value_is_a_singleton_list() {
    let mut engine = common::engine();
    assert_eq!(common::eval_binding(&mut engine, "42 =.. L, X = L", "X"), "[42]");
}

#[test]
fn copy_term_shares_no_variables_with_the_original() {
    let mut engine = common::engine();
    // copy_term(f(X,X), C), C = f(a,Y) must bind Y = a *without* also
    // binding the original X (invariant 5: no shared variables).
    let rows = common::solutions(
        &mut engine,
        "copy_term(f(X,X), C), C = f(a,Y), Z = Y",
        1,
    );
    assert_eq!(rows, vec![vec![("Z".to_string(), "a".to_string())]]);
    // X itself must remain unbound after the above.
    let outcome = common::run_once(&mut engine, "copy_term(f(X,X), f(a,b))");
    assert!(matches!(outcome, Outcome::False), "f(X,X) can never unify with f(a,b) since the two Xs must agree");
}

#[test]
fn copy_term_preserves_internal_sharing() {
    let mut engine = common::engine();
    // Both occurrences of X in the template must still corefer in the copy.
    let outcome = common::run_once(&mut engine, "copy_term(f(X,X), f(a,a))");
    assert!(matches!(outcome, Outcome::True));
}

#[test]
fn compare_reports_standard_order() {
    let mut engine = common::engine();
    assert_eq!(common::eval_binding(&mut engine, "compare(Order, 1, 2), X = Order", "X"), "<");
    assert_eq!(common::eval_binding(&mut engine, "compare(Order, a, a), X = Order", "X"), "=");
    assert_eq!(common::eval_binding(&mut engine, "compare(Order, f(1), a), X = Order", "X"), ">");
}
