//! Term-inspection built-ins (spec.md §4.H): `functor/3`, `arg/3`,
//! `=../2`, `copy_term/2`, `compare/3`.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::database::Database;
use crate::engine::Engine;
use crate::env::fresh_var_id;
use crate::error::PrologError;
use crate::promise::{Cont, Promise};
use crate::term::{compare_standard_order, Term, VarId};
use crate::unify::unify;

pub fn install(db: &mut Database) {
    db.install_builtin("functor", 3, functor);
    db.install_builtin("arg", 3, arg);
    db.install_builtin("=..", 2, univ);
    db.install_builtin("copy_term", 2, copy_term_builtin);
    db.install_builtin("compare", 3, compare);
}

fn functor(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let t = engine.env.resolve(&args[0]);
    if !t.is_var() {
        let (name, arity) = match &t {
            Term::Compound(f, a) => (Term::atom(f.clone()), a.len() as i64),
            Term::Atom(a) => (Term::atom(a.clone()), 0),
            other => (other.clone(), 0),
        };
        if unify(&mut engine.env, &args[1], &name, false)
            && unify(&mut engine.env, &args[2], &Term::int(arity), false)
        {
            k(engine)
        } else {
            Promise::failure()
        }
    } else {
        let name = engine.env.resolve(&args[1]);
        let arity = engine.env.resolve(&args[2]);
        let arity_n = match arity {
            Term::Int(n) if n >= 0 => n as usize,
            Term::Var(_) => return Promise::error(PrologError::instantiation()),
            other => return Promise::error(PrologError::type_error("integer", other)),
        };
        if arity_n == 0 {
            if name.is_var() {
                return Promise::error(PrologError::instantiation());
            }
            return if unify(&mut engine.env, &args[0], &name, false) {
                k(engine)
            } else {
                Promise::failure()
            };
        }
        let functor_name = match &name {
            Term::Atom(a) => a.clone(),
            Term::Var(_) => return Promise::error(PrologError::instantiation()),
            other => return Promise::error(PrologError::type_error("atom", other.clone())),
        };
        let new_args: Vec<Term> = (0..arity_n).map(|_| engine.env.fresh_var()).collect();
        let built = Term::compound(functor_name, new_args);
        if unify(&mut engine.env, &args[0], &built, false) {
            k(engine)
        } else {
            Promise::failure()
        }
    }
}

/// `arg(N, Term, Arg)`: when `N` is bound, a direct positional lookup; when
/// unbound, enumerates every `1..=arity` as a choice point (spec.md §9 open
/// question: full ISO enumeration behavior, resolved in favor of supporting
/// it since it costs little once `Promise::Choice` exists).
fn arg(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let term = engine.env.resolve(&args[0]);
    let compound_args: &[Term] = match &term {
        Term::Compound(_, a) => a,
        Term::Var(_) => return Promise::error(PrologError::instantiation()),
        other => return Promise::error(PrologError::type_error("compound", other.clone())),
    };
    let n = engine.env.resolve(&args[1]);
    match n {
        Term::Int(i) => {
            if i < 1 || (i as usize) > compound_args.len() {
                return Promise::failure();
            }
            let picked = compound_args[(i - 1) as usize].clone();
            if unify(&mut engine.env, &args[2], &picked, false) {
                k(engine)
            } else {
                Promise::failure()
            }
        }
        Term::Var(_) => {
            let arg_pat = args[2].clone();
            let n_pat = args[1].clone();
            let alts: Vec<Promise> = compound_args
                .iter()
                .cloned()
                .enumerate()
                .map(|(idx, a)| {
                    let arg_pat = arg_pat.clone();
                    let n_pat = n_pat.clone();
                    let k = k.clone();
                    Promise::delayed(move |engine: &mut Engine| {
                        let cp = engine.env.checkpoint();
                        let ok = unify(&mut engine.env, &n_pat, &Term::int(idx as i64 + 1), false)
                            && unify(&mut engine.env, &arg_pat, &a, false);
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
        other => Promise::error(PrologError::type_error("integer", other)),
    }
}

fn univ(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let t = engine.env.resolve(&args[0]);
    if !t.is_var() {
        let list = match &t {
            Term::Compound(f, a) => {
                let mut items = vec![Term::atom(f.clone())];
                items.extend(a.iter().cloned());
                Term::list(items)
            }
            other => Term::list(vec![other.clone()]),
        };
        return if unify(&mut engine.env, &args[1], &list, false) {
            k(engine)
        } else {
            Promise::failure()
        };
    }
    let items = match engine.env.collect_list(&args[1]) {
        Ok(items) => items,
        Err(e) => return Promise::error(e),
    };
    let built = match items.split_first() {
        None => return Promise::error(PrologError::domain_error("non_empty_list", Term::nil())),
        Some((head, rest)) => {
            let head = engine.env.resolve(head);
            if rest.is_empty() {
                head
            } else {
                let name = match head {
                    Term::Atom(a) => a,
                    Term::Var(_) => return Promise::error(PrologError::instantiation()),
                    other => return Promise::error(PrologError::type_error("atom", other)),
                };
                Term::compound(name, rest.to_vec())
            }
        }
    };
    if unify(&mut engine.env, &args[0], &built, false) {
        k(engine)
    } else {
        Promise::failure()
    }
}

fn copy_term(engine: &Engine, term: &Term, map: &mut HashMap<VarId, VarId>) -> Term {
    match engine.env.resolve(term) {
        Term::Var(v) => Term::Var(*map.entry(v).or_insert_with(fresh_var_id)),
        Term::Compound(f, a) => {
            Term::Compound(f, a.iter().map(|x| copy_term(engine, x, map)).collect())
        }
        other => other,
    }
}

fn copy_term_builtin(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let mut map = HashMap::new();
    let copy = copy_term(engine, &args[0], &mut map);
    if unify(&mut engine.env, &args[1], &copy, false) {
        k(engine)
    } else {
        Promise::failure()
    }
}

fn compare(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let order = compare_standard_order(&engine.env, &args[1], &args[2]);
    let atom = match order {
        Ordering::Less => "<",
        Ordering::Equal => "=",
        Ordering::Greater => ">",
    };
    if unify(&mut engine.env, &args[0], &Term::atom(atom), false) {
        k(engine)
    } else {
        Promise::failure()
    }
}
