//! Exception handling and process control (spec.md §4.H/§7):
//! `catch/3`, `throw/1`, `halt/0`, `halt/1`.
//!
//! `,/2`, `;/2`, `->/2`, `\+/1`, `!`, and `call/1..N` are decoded directly by
//! the resolver (spec.md §4.G groups them with the control constructs, not
//! the built-in kernel) and have no entry here.
//!
//! Grounded on the teacher's `execute_catch`/`execute_throw` pair in
//! `machine/execution.rs`: the same "unify the thrown term against Catcher,
//! otherwise re-raise" shape, re-expressed over a nested `Solutions` pull
//! loop so `catch/3` can still backtrack into further solutions of `Goal`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::database::Database;
use crate::engine::Engine;
use crate::env::Checkpoint;
use crate::error::PrologError;
use crate::promise::{Cont, Outcome, Promise, Solutions};
use crate::term::Term;
use crate::unify::unify;

pub fn install(db: &mut Database) {
    db.install_builtin("catch", 3, catch);
    db.install_builtin("throw", 1, throw);
    db.install_builtin("halt", 0, halt0);
    db.install_builtin("halt", 1, halt1);
}

fn throw(engine: &mut Engine, args: &[Term], _k: Cont) -> Promise {
    let ball = engine.env.resolve_deep(&args[0]);
    if ball.is_var() {
        return Promise::error(PrologError::instantiation());
    }
    Promise::error(PrologError::Thrown(ball))
}

fn halt0(_engine: &mut Engine, _args: &[Term], _k: Cont) -> Promise {
    std::process::exit(0)
}

fn halt1(engine: &mut Engine, args: &[Term], _k: Cont) -> Promise {
    match engine.env.resolve(&args[0]) {
        Term::Int(n) => std::process::exit(n as i32),
        other => Promise::error(PrologError::type_error("integer", other)),
    }
}

/// `catch(Goal, Catcher, Recovery)`: runs `Goal` under a nested `Solutions`
/// pull loop so further solutions remain reachable on backtracking; any
/// `PrologError` it raises is caught, the environment rewound to this
/// call's entry checkpoint, and unified against `Catcher` -- success runs
/// `Recovery`, failure re-raises the original error (spec.md §4.H).
fn catch(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let goal = args[0].clone();
    let catcher = args[1].clone();
    let recovery = args[2].clone();
    let entry_cp = engine.env.checkpoint();
    let local_barrier = engine.fresh_barrier();
    let probe = crate::resolver::call(engine, &goal, Rc::new(|_: &mut Engine| Promise::success()), local_barrier);
    let solutions = Rc::new(RefCell::new(Solutions::new(probe)));
    catch_step(engine, solutions, catcher, recovery, entry_cp, k)
}

fn catch_step(
    engine: &mut Engine,
    solutions: Rc<RefCell<Solutions>>,
    catcher: Term,
    recovery: Term,
    entry_cp: Checkpoint,
    k: Cont,
) -> Promise {
    let outcome = solutions.borrow_mut().next(engine);
    match outcome {
        Outcome::True => {
            let this_success = k(engine);
            let solutions2 = solutions.clone();
            let catcher2 = catcher.clone();
            let recovery2 = recovery.clone();
            let k2 = k.clone();
            let rest = Promise::delayed(move |engine: &mut Engine| {
                catch_step(engine, solutions2, catcher2, recovery2, entry_cp, k2)
            });
            Promise::Choice(vec![this_success, rest], None)
        }
        Outcome::False => Promise::failure(),
        Outcome::Error(e) => {
            engine.env.restore(entry_cp);
            let ball = e.to_term();
            if unify(&mut engine.env, &catcher, &ball, false) {
                let barrier = engine.fresh_barrier();
                crate::resolver::call(engine, &recovery, k, barrier)
            } else {
                Promise::error(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::fresh_var_id;

    fn test_engine() -> Engine {
        Engine::with_builtins()
    }

    #[test]
    fn catch_recovers_from_matching_thrown_ball() {
        let mut engine = test_engine();
        let v = fresh_var_id();
        let goal = Term::compound(
            "catch",
            vec![
                Term::compound("throw", vec![Term::atom("oops")]),
                Term::var(v),
                Term::compound("=", vec![Term::var(v), Term::atom("caught")]),
            ],
        );
        let outcome = engine.solve_once(&goal);
        assert!(matches!(outcome, Outcome::True));
        assert_eq!(engine.env.resolve(&Term::var(v)), Term::atom("caught"));
    }

    #[test]
    fn catch_propagates_non_matching_error() {
        let mut engine = test_engine();
        let goal = Term::compound(
            "catch",
            vec![
                Term::compound("throw", vec![Term::atom("a")]),
                Term::atom("b"),
                Term::atom("true"),
            ],
        );
        let outcome = engine.solve_once(&goal);
        assert!(matches!(outcome, Outcome::Error(_)));
    }

    #[test]
    fn catch_goal_with_no_error_just_succeeds() {
        let mut engine = test_engine();
        let goal = Term::compound(
            "catch",
            vec![Term::atom("true"), Term::atom("_"), Term::atom("fail")],
        );
        let outcome = engine.solve_once(&goal);
        assert!(matches!(outcome, Outcome::True));
    }
}
