//! The resolver (spec.md §4.G, component G): the single entry point that
//! decides whether a goal is a control construct, a built-in, or a
//! user-defined procedure, and drives the latter through the clause list
//! with backtracking and cut.
//!
//! Grounded on the teacher's `Machine::execute_call`/`execute_tail_call`
//! clause-iteration shape in `machine/execution.rs`, re-expressed over
//! `Promise`/`Choice` instead of an explicit `choice_stack`.

use std::rc::Rc;

use log::{debug, trace};

use crate::database::Procedure;
use crate::engine::Engine;
use crate::error::PrologError;
use crate::flags::UnknownAction;
use crate::promise::{BarrierId, Cont, Promise};
use crate::term::Term;

/// Resolves `goal` against `engine`, invoking `k` on each success. `barrier`
/// is the cut barrier id of the *caller's* activation -- a bare `!` appearing
/// directly in `goal` (rather than behind a further `call/1`) commits to it.
///
/// Special control goals are decoded before database lookup, exactly as
/// spec.md §4.G enumerates: `,/2`, `;/2` (incl. if-then-else), `!`,
/// `true`/`fail`, and `call/N` (which is opaque to cut and therefore
/// allocates its own fresh barrier).
pub fn call(engine: &mut Engine, goal: &Term, k: Cont, barrier: BarrierId) -> Promise {
    let resolved = engine.env.resolve(goal);
    match &resolved {
        Term::Var(_) => return Promise::error(PrologError::instantiation()),
        Term::Int(_) | Term::Float(_) => {
            return Promise::error(PrologError::type_error("callable", resolved.clone()))
        }
        _ => {}
    }

    if let Term::Atom(a) = &resolved {
        match &***a {
            "true" => return k(engine),
            "fail" | "false" => return Promise::failure(),
            "!" => {
                let rest = k(engine);
                return Promise::Cut(barrier, Box::new(rest));
            }
            "listing" => {}
            _ => {}
        }
    }

    if let Term::Compound(f, args) = &resolved {
        match (&***f, args.len()) {
            (",", 2) => {
                let (a, b) = (args[0].clone(), args[1].clone());
                let k2: Cont = {
                    let k = k.clone();
                    Rc::new(move |engine: &mut Engine| call(engine, &b, k.clone(), barrier))
                };
                return call(engine, &a, k2, barrier);
            }
            (";", 2) => {
                if let Term::Compound(g, ite) = engine.env.resolve(&args[0]) {
                    if &*g == "->" && ite.len() == 2 {
                        return if_then_else(engine, &ite[0], &ite[1], &args[1], k, barrier);
                    }
                    if &*g == "*->" && ite.len() == 2 {
                        return soft_if_then_else(engine, &ite[0], &ite[1], &args[1], k, barrier);
                    }
                }
                // `left` may bind directly (e.g. a `=/2` whose head runs
                // with no checkpoint of its own and hands back a bare
                // `Bool(true)` with no payload), so running it eagerly here
                // -- before `right` is even built, let alone before either
                // is selected -- would both contaminate `right`'s view of
                // `engine.env` and permanently lose track of which bindings
                // belong to which disjunct once the Choice is forced. Defer
                // both branches behind `Promise::Delayed` so neither actually
                // runs until `Solutions` selects and forces it, exactly as
                // clause alternatives are deferred above.
                let (left_goal, right_goal) = (args[0].clone(), args[1].clone());
                let left_k = k.clone();
                let left = Promise::delayed(move |engine: &mut Engine| {
                    call(engine, &left_goal, left_k, barrier)
                });
                let right = Promise::delayed(move |engine: &mut Engine| {
                    call(engine, &right_goal, k, barrier)
                });
                return Promise::Choice(vec![left, right], Some(barrier));
            }
            ("->", 2) => {
                return if_then_else(engine, &args[0], &args[1], &Term::atom("fail"), k, barrier);
            }
            ("\\+", 1) => {
                return negation(engine, &args[0], k);
            }
            ("call", n) if n >= 1 => {
                return call_meta(engine, &args[0], &args[1..], k);
            }
            _ => {}
        }
    }

    let indicator = resolved
        .indicator()
        .expect("non-callable goals rejected above");
    let args: Vec<Term> = resolved.args().to_vec();

    match engine.database.get(&indicator) {
        Some(Procedure::Builtin(b)) => {
            trace!("resolver: dispatching builtin {}/{}", indicator.0, indicator.1);
            let b = *b;
            b(engine, &args, k)
        }
        Some(Procedure::Clauses(_)) => {
            let clauses = engine.database.candidate_clauses(&indicator, &args);
            debug!(
                "resolver: {} candidate clause(s) for {}/{}",
                clauses.len(),
                indicator.0,
                indicator.1
            );
            let new_barrier = engine.fresh_barrier();
            // Each alternative must stay a *thunk* until `Solutions` actually
            // forces it -- running `run_clause` here (eagerly, for every
            // candidate, before the Choice is even returned) would drive each
            // clause's continuation all the way to a terminal and then have
            // no way to report bindings back, since the terminal `Bool`/
            // `Error` variants carry no environment payload. Deferring the
            // call lets the checkpoint `Solutions::next` already takes before
            // trying an alternative (and restores on backtrack into the
            // next one) be the single source of truth for undoing a failed
            // clause's bindings, instead of restoring unconditionally here.
            let alts: Vec<Promise> = clauses
                .into_iter()
                .map(|clause| {
                    let args = args.clone();
                    let k = k.clone();
                    Promise::delayed(move |engine: &mut Engine| {
                        crate::vm::run_clause(engine, &clause, &args, k, new_barrier)
                    })
                })
                .collect();
            Promise::Choice(alts, Some(new_barrier))
        }
        None => match engine.flags.unknown {
            UnknownAction::Error => Promise::error(PrologError::existence_error(
                "procedure",
                Term::compound(
                    "/",
                    vec![Term::atom(indicator.0), Term::int(indicator.1 as i64)],
                ),
            )),
            UnknownAction::Warning => {
                log::warn!("unknown procedure {}/{}", indicator.0, indicator.1);
                Promise::failure()
            }
            UnknownAction::Fail => Promise::failure(),
        },
    }
}

/// `call/N`: refreshes the cut barrier so a `!` inside `Goal` is opaque to
/// the caller (spec.md §4.C "A cut inside a goal wrapped by call/1 is
/// opaque"). Extra arguments are appended to `Goal`'s argument list.
fn call_meta(engine: &mut Engine, goal: &Term, extra: &[Term], k: Cont) -> Promise {
    let resolved = engine.env.resolve(goal);
    let extended = match &resolved {
        Term::Var(_) => return Promise::error(PrologError::instantiation()),
        Term::Atom(a) if !extra.is_empty() => Term::compound(a.clone(), extra.to_vec()),
        Term::Atom(_) => resolved.clone(),
        Term::Compound(f, args) => {
            let mut all = args.clone();
            all.extend_from_slice(extra);
            Term::compound(f.clone(), all)
        }
        Term::Int(_) | Term::Float(_) => {
            return Promise::error(PrologError::type_error("callable", resolved.clone()))
        }
    };
    let fresh = engine.fresh_barrier();
    call(engine, &extended, k, fresh)
}

/// `->`/2 in an if-then(-else): commits to `Cond`'s first solution
/// (spec.md §4.G), then runs `Then` (bindings retained) or, on failure,
/// `Else` (bindings from the failed attempt at `Cond` undone).
fn if_then_else(
    engine: &mut Engine,
    cond: &Term,
    then: &Term,
    els: &Term,
    k: Cont,
    barrier: BarrierId,
) -> Promise {
    let local_barrier = engine.fresh_barrier();
    let probe = call(
        engine,
        cond,
        Rc::new(|_: &mut Engine| Promise::success()),
        local_barrier,
    );
    match crate::promise::force_once(engine, probe) {
        crate::promise::Outcome::True => call(engine, then, k, barrier),
        crate::promise::Outcome::False => call(engine, els, k, barrier),
        crate::promise::Outcome::Error(e) => Promise::error(e),
    }
}

/// `*->`/2: like if-then-else, but if `Cond` has solutions, *all* of them are
/// tried against `Then` (a soft cut) rather than only the first. Grounded on
/// spec.md §4.G's if-then-else shape, relaxed to not commit to `Cond`'s first
/// solution: a shared flag records whether `Cond` ever succeeded, and `Else`
/// is only tried once every `Cond` alternative is exhausted with the flag
/// still unset.
fn soft_if_then_else(
    engine: &mut Engine,
    cond: &Term,
    then: &Term,
    els: &Term,
    k: Cont,
    barrier: BarrierId,
) -> Promise {
    let local_barrier = engine.fresh_barrier();
    let succeeded = Rc::new(std::cell::Cell::new(false));
    let then = then.clone();
    let flag = succeeded.clone();
    let cond_branch = call(
        engine,
        cond,
        {
            let k = k.clone();
            Rc::new(move |engine: &mut Engine| {
                flag.set(true);
                call(engine, &then, k.clone(), barrier)
            })
        },
        local_barrier,
    );
    let els = els.clone();
    let else_branch = Promise::delayed(move |engine: &mut Engine| {
        if succeeded.get() {
            Promise::failure()
        } else {
            call(engine, &els, k, barrier)
        }
    });
    Promise::Choice(vec![cond_branch, else_branch], None)
}

/// `\+/1`: succeeds iff `Goal` has no solution, discarding any bindings
/// `Goal` made along the way (spec.md's negation-as-failure built-in).
fn negation(engine: &mut Engine, goal: &Term, k: Cont) -> Promise {
    let local_barrier = engine.fresh_barrier();
    let cp = engine.env.checkpoint();
    let probe = call(
        engine,
        goal,
        Rc::new(|_: &mut Engine| Promise::success()),
        local_barrier,
    );
    let outcome = crate::promise::force_once(engine, probe);
    engine.env.restore(cp);
    match outcome {
        crate::promise::Outcome::True => Promise::failure(),
        crate::promise::Outcome::False => k(engine),
        crate::promise::Outcome::Error(e) => Promise::error(e),
    }
}
