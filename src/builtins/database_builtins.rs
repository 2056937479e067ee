//! Database built-ins (spec.md §4.F/§4.H): `assertz/1`, `asserta/1`,
//! `retract/1`, `abolish/1`, `clause/2`, `current_predicate/1`, plus the
//! `assert_clause` helper shared by `Engine::consult_term` and the resolver's
//! own tests.
//!
//! Grounded on the teacher's `Machine::register_predicate` (compiles and
//! installs a clause) in `machine/core.rs`; `clause/2`/`retract/1` add
//! reflection the teacher's consult-only model never needed.

use std::collections::HashMap;
use std::rc::Rc;

use crate::compiler::compile_clause;
use crate::database::{Database, Indicator, StoredClause};
use crate::engine::Engine;
use crate::env::fresh_var_id;
use crate::error::PrologError;
use crate::promise::{Cont, Promise};
use crate::term::{Term, VarId};
use crate::unify::unify;

pub fn install(db: &mut Database) {
    db.install_builtin("assertz", 1, assertz);
    db.install_builtin("assert", 1, assertz);
    db.install_builtin("asserta", 1, asserta);
    db.install_builtin("retract", 1, retract);
    db.install_builtin("abolish", 1, abolish);
    db.install_builtin("clause", 2, clause);
    db.install_builtin("current_predicate", 1, current_predicate);
    db.install_builtin("dynamic", 1, dynamic);
}

/// Splits `Clause` (either `Head :- Body` or a bare fact) into its head and
/// body terms.
fn split_clause_term(term: &Term) -> (Term, Term) {
    match term {
        Term::Compound(f, args) if &**f == ":-" && args.len() == 2 => {
            (args[0].clone(), args[1].clone())
        }
        other => (other.clone(), Term::atom("true")),
    }
}

/// Fully resolves `term` and gives every remaining unbound variable a fresh,
/// globally unique id consistent within the term -- clause storage must be
/// independent of whatever variable ids happened to be live in the caller's
/// environment when it was asserted.
fn rename_apart(engine: &Engine, term: &Term, map: &mut HashMap<VarId, VarId>) -> Term {
    match engine.env.resolve(term) {
        Term::Var(v) => {
            let fresh = *map.entry(v).or_insert_with(fresh_var_id);
            Term::Var(fresh)
        }
        Term::Compound(f, args) => Term::Compound(
            f,
            args.iter().map(|a| rename_apart(engine, a, map)).collect(),
        ),
        other => other,
    }
}

/// Compiles and installs one clause (spec.md §9 "Assert of clause-with-body");
/// used both by the `assertz/1`/`asserta/1` built-ins and by `Engine::consult_term`.
pub fn assert_clause(
    engine: &mut Engine,
    head: &Term,
    body: &Term,
    front: bool,
) -> Result<(), PrologError> {
    let mut map = HashMap::new();
    let head = rename_apart(engine, head, &mut map);
    let body = rename_apart(engine, body, &mut map);
    if !head.is_callable() {
        return Err(PrologError::type_error("callable", head));
    }
    let indicator: Indicator = head.indicator().expect("checked callable above");
    let compiled = Rc::new(compile_clause(&head, &body)?);
    let stored = StoredClause {
        raw_head: head,
        raw_body: body,
        compiled,
    };
    engine.database.install_clause(indicator, stored, front)
}

fn assertz(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let clause = engine.env.resolve_deep(&args[0]);
    let (head, body) = split_clause_term(&clause);
    match assert_clause(engine, &head, &body, false) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn asserta(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let clause = engine.env.resolve_deep(&args[0]);
    let (head, body) = split_clause_term(&clause);
    match assert_clause(engine, &head, &body, true) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

/// `retract(Clause)`: removes the first currently-stored clause whose raw
/// `Head :- Body` unifies with `Clause`, keeping the bindings that unification
/// produced (spec.md §4.F). Fails (does not error) if no clause matches.
fn retract(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let clause = engine.env.resolve(&args[0]);
    let (head, body) = split_clause_term(&clause);
    let resolved_head = engine.env.resolve(&head);
    let indicator = match resolved_head.indicator() {
        Some(i) => i,
        None => return Promise::error(PrologError::instantiation()),
    };
    let stored = engine.database.clauses(&indicator);
    for (idx, candidate) in stored.iter().enumerate() {
        let cp = engine.env.checkpoint();
        let matches = unify(&mut engine.env, &head, &candidate.raw_head, false)
            && unify(&mut engine.env, &body, &candidate.raw_body, false);
        if matches {
            return match engine.database.remove_at(&indicator, idx) {
                Ok(()) => k(engine),
                Err(e) => {
                    engine.env.restore(cp);
                    Promise::error(e)
                }
            };
        }
        engine.env.restore(cp);
    }
    Promise::failure()
}

fn abolish(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let spec = engine.env.resolve(&args[0]);
    let indicator = match parse_indicator(&spec) {
        Some(i) => i,
        None => return Promise::error(PrologError::type_error("predicate_indicator", spec)),
    };
    match engine.database.abolish(&indicator) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn dynamic(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let spec = engine.env.resolve(&args[0]);
    for item in flatten_conjunction(&spec) {
        match parse_indicator(&item) {
            Some(i) => engine.database.declare_dynamic(i),
            None => return Promise::error(PrologError::type_error("predicate_indicator", item)),
        }
    }
    k(engine)
}

/// `dynamic((foo/1, bar/2))` declares several indicators in one call.
fn flatten_conjunction(term: &Term) -> Vec<Term> {
    match term {
        Term::Compound(f, args) if &**f == "," && args.len() == 2 => {
            let mut left = flatten_conjunction(&args[0]);
            left.extend(flatten_conjunction(&args[1]));
            left
        }
        other => vec![other.clone()],
    }
}

fn parse_indicator(term: &Term) -> Option<Indicator> {
    match term {
        Term::Compound(f, args) if &**f == "/" && args.len() == 2 => {
            let name = match &args[0] {
                Term::Atom(a) => a.clone(),
                _ => return None,
            };
            let arity = match &args[1] {
                Term::Int(n) if *n >= 0 => *n as usize,
                _ => return None,
            };
            Some((name, arity))
        }
        _ => None,
    }
}

/// `clause(Head, Body)`: enumerates stored clauses of `Head`'s indicator
/// whose raw head/body unify with the arguments, one alternative per clause
/// (spec.md §4.F reflection).
fn clause(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let head = engine.env.resolve(&args[0]);
    let body_pat = args[1].clone();
    let indicator = match head.indicator() {
        Some(i) => i,
        None => return Promise::error(PrologError::instantiation()),
    };
    if let Some(crate::database::Procedure::Builtin(_)) = engine.database.get(&indicator) {
        return Promise::error(PrologError::permission_error(
            "access",
            "private_procedure",
            Term::compound("/", vec![Term::atom(indicator.0), Term::int(indicator.1 as i64)]),
        ));
    }
    let stored = engine.database.clauses(&indicator);
    let head_pat = args[0].clone();
    let alts: Vec<Promise> = stored
        .into_iter()
        .map(|candidate| {
            let head_pat = head_pat.clone();
            let body_pat = body_pat.clone();
            let k = k.clone();
            Promise::delayed(move |engine: &mut Engine| {
                let cp = engine.env.checkpoint();
                let ok = unify(&mut engine.env, &head_pat, &candidate.raw_head, false)
                    && unify(&mut engine.env, &body_pat, &candidate.raw_body, false);
                if ok {
                    k(engine)
                } else {
                    engine.env.restore(cp);
                    Promise::failure()
                }
            })
        })
        .collect();
    Promise::Choice(alts, None)
}

/// `current_predicate(Name/Arity)`: enumerates indicators of every
/// user-defined (non-built-in) procedure currently in the database.
fn current_predicate(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let pattern = args[0].clone();
    let indicators: Vec<Indicator> = engine
        .database
        .indicators()
        .into_iter()
        .filter(|i| !matches!(engine.database.get(i), Some(crate::database::Procedure::Builtin(_))))
        .collect();
    let alts: Vec<Promise> = indicators
        .into_iter()
        .map(|(name, arity)| {
            let pattern = pattern.clone();
            let k = k.clone();
            let term = Term::compound("/", vec![Term::atom(name), Term::int(arity as i64)]);
            Promise::delayed(move |engine: &mut Engine| {
                let cp = engine.env.checkpoint();
                if unify(&mut engine.env, &pattern, &term, false) {
                    k(engine)
                } else {
                    engine.env.restore(cp);
                    Promise::failure()
                }
            })
        })
        .collect();
    Promise::Choice(alts, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::{force_once, Outcome};

    fn test_engine() -> Engine {
        Engine::with_builtins()
    }

    #[test]
    fn assertz_then_clause_round_trips() {
        let mut engine = test_engine();
        assert_clause(&mut engine, &Term::atom("foo"), &Term::atom("true"), false).unwrap();
        assert!(engine.database.is_defined(&("foo".into(), 0)));
    }

    #[test]
    fn retract_removes_matching_clause() {
        let mut engine = test_engine();
        assert_clause(
            &mut engine,
            &Term::compound("p", vec![Term::int(1)]),
            &Term::atom("true"),
            false,
        )
        .unwrap();
        let goal = Term::compound(
            "retract",
            vec![Term::compound(
                ":-",
                vec![Term::compound("p", vec![Term::int(1)]), Term::atom("true")],
            )],
        );
        let outcome = engine.solve_once(&goal);
        assert!(matches!(outcome, Outcome::True));
        assert_eq!(engine.database.clauses(&("p".into(), 1)).len(), 0);
    }

    #[test]
    fn clause_enumerates_all_matches() {
        let mut engine = test_engine();
        assert_clause(&mut engine, &Term::compound("p", vec![Term::int(1)]), &Term::atom("true"), false).unwrap();
        assert_clause(&mut engine, &Term::compound("p", vec![Term::int(2)]), &Term::atom("true"), false).unwrap();
        let v = fresh_var_id();
        let goal = Term::compound(
            "clause",
            vec![Term::compound("p", vec![Term::var(v)]), Term::atom("true")],
        );
        let mut sols = engine.solve(&goal);
        let mut seen = Vec::new();
        loop {
            match sols.next(&mut engine) {
                Outcome::True => seen.push(engine.env.resolve(&Term::var(v))),
                _ => break,
            }
        }
        assert_eq!(seen, vec![Term::int(1), Term::int(2)]);
        let _ = force_once;
    }
}
