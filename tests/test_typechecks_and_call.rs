//! Type-check built-ins (spec.md §4.H) and `call/1..N` (spec.md §4.G step 6
//! "call/1" + cut opacity already covered in test_cut_and_control.rs).

mod common;

use prolog_core::promise::Outcome;

#[test]
fn type_checks_classify_each_term_kind() {
    let mut engine = common::engine();
    assert!(matches!(common::run_once(&mut engine, "var(X)"), Outcome::True));
    assert!(matches!(common::run_once(&mut engine, "nonvar(a)"), Outcome::True));
    assert!(matches!(common::run_once(&mut engine, "atom(foo)"), Outcome::True));
    assert!(matches!(common::run_once(&mut engine, "integer(42)"), Outcome::True));
    assert!(matches!(common::run_once(&mut engine, "float(4.2)"), Outcome::True));
    assert!(matches!(common::run_once(&mut engine, "number(42)"), Outcome::True));
    assert!(matches!(common::run_once(&mut engine, "atomic(42)"), Outcome::True));
    assert!(matches!(common::run_once(&mut engine, "compound(f(x))"), Outcome::True));
    assert!(matches!(common::run_once(&mut engine, "callable(foo)"), Outcome::True));
    assert!(matches!(common::run_once(&mut engine, "callable(f(x))"), Outcome::True));
    assert!(matches!(common::run_once(&mut engine, "is_list([1,2,3])"), Outcome::True));
    assert!(matches!(common::run_once(&mut engine, "is_list([1|foo])"), Outcome::False));
    assert!(matches!(common::run_once(&mut engine, "ground(f(a,b))"), Outcome::True));
    assert!(matches!(common::run_once(&mut engine, "ground(f(a,_))"), Outcome::False));
}

#[test]
fn type_checks_reject_the_wrong_kind() {
    let mut engine = common::engine();
    assert!(matches!(common::run_once(&mut engine, "atom(42)"), Outcome::False));
    assert!(matches!(common::run_once(&mut engine, "integer(4.2)"), Outcome::False));
    assert!(matches!(common::run_once(&mut engine, "compound(foo)"), Outcome::False));
    assert!(matches!(common::run_once(&mut engine, "var(foo)"), Outcome::False));
}

#[test]
fn call_n_appends_extra_arguments_to_the_goal() {
    let mut engine = common::engine();
    common::consult(&mut engine, "add(X, Y, Z) :- Z is X + Y.");
    assert_eq!(common::eval_binding(&mut engine, "call(add(1), 2, Z)", "Z"), "3");
}

#[test]
fn call_of_a_non_callable_is_a_type_error() {
    let mut engine = common::engine();
    let outcome = common::run_once(&mut engine, "call(42)");
    match outcome {
        Outcome::Error(e) => assert!(format!("{}", e).contains("type_error")),
        other => panic!("expected type_error(callable, 42), got {:?}", other),
    }
}

#[test]
fn calling_an_unbound_goal_is_an_instantiation_error() {
    let mut engine = common::engine();
    let outcome = common::run_once(&mut engine, "call(X)");
    match outcome {
        Outcome::Error(e) => assert!(format!("{}", e).contains("instantiation_error")),
        other => panic!("expected instantiation_error, got {:?}", other),
    }
}

#[test]
fn unknown_procedure_raises_existence_error_by_default() {
    let mut engine = common::engine();
    let outcome = common::run_once(&mut engine, "this_predicate_does_not_exist(a,b)");
    match outcome {
        Outcome::Error(e) => assert!(format!("{}", e).contains("existence_error")),
        other => panic!("expected existence_error(procedure, _), got {:?}", other),
    }
}

#[test]
fn unknown_flag_set_to_fail_silences_unknown_procedure_errors() {
    let mut engine = common::engine();
    common::consult(&mut engine, ":- set_prolog_flag(unknown, fail).");
    let outcome = common::run_once(&mut engine, "this_predicate_does_not_exist(a,b)");
    assert!(matches!(outcome, Outcome::False));
}
