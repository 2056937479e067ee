//! S3 (spec.md §8): `catch/3` intercepts a matching `throw/1`; a
//! non-matching catcher lets the error propagate.

mod common;

use prolog_core::promise::Outcome;

#[test]
fn catch_intercepts_matching_throw() {
    let mut engine = common::engine();
    let rows = common::solutions(&mut engine, "catch(throw(oops), E, E = oops)", 1);
    assert_eq!(rows, vec![vec![("E".to_string(), "oops".to_string())]]);
}

#[test]
fn catch_lets_non_matching_error_propagate() {
    let mut engine = common::engine();
    let outcome = common::run_once(&mut engine, "catch(throw(oops), wrong_atom, true)");
    match outcome {
        Outcome::Error(e) => {
            assert_eq!(e.to_term(), prolog_core::term::Term::atom("oops"));
        }
        other => panic!("expected the mismatched catch to propagate the error, got {:?}", other),
    }
}

#[test]
fn catch_restores_bindings_made_before_the_catcher_unification() {
    let mut engine = common::engine();
    common::consult(
        &mut engine,
        "faulty(X) :- X > 0, throw(positive(X)).
         faulty(X) :- X =< 0, throw(nonpositive(X)).",
    );
    let rows = common::solutions(
        &mut engine,
        "catch(faulty(5), positive(N), Reason = caught(N))",
        1,
    );
    assert_eq!(
        rows,
        vec![vec![("Reason".to_string(), "caught(5)".to_string())]]
    );
}

#[test]
fn uncaught_throw_is_the_querys_final_error_result() {
    let mut engine = common::engine();
    let outcome = common::run_once(&mut engine, "throw(boom)");
    assert!(matches!(outcome, Outcome::Error(_)));
}

#[test]
fn type_error_from_an_unbound_comparison_is_catchable() {
    let mut engine = common::engine();
    let rows = common::solutions(&mut engine, "catch(X > 1, error(instantiation_error, _), Caught = yes)", 1);
    assert_eq!(rows, vec![vec![("Caught".to_string(), "yes".to_string())]]);
}
