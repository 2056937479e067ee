//! Type-checking built-ins (spec.md §4.H): `var/1`, `nonvar/1`, `atom/1`,
//! `integer/1`, `float/1`, `number/1`, `atomic/1`, `compound/1`, `callable/1`,
//! `is_list/1`, `ground/1`.

use crate::database::Database;
use crate::engine::Engine;
use crate::promise::{Cont, Promise};
use crate::term::Term;

pub fn install(db: &mut Database) {
    db.install_builtin("var", 1, var);
    db.install_builtin("nonvar", 1, nonvar);
    db.install_builtin("atom", 1, atom);
    db.install_builtin("integer", 1, integer);
    db.install_builtin("float", 1, float);
    db.install_builtin("number", 1, number);
    db.install_builtin("atomic", 1, atomic);
    db.install_builtin("compound", 1, compound);
    db.install_builtin("callable", 1, callable);
    db.install_builtin("is_list", 1, is_list);
    db.install_builtin("ground", 1, ground);
}

fn check(engine: &mut Engine, args: &[Term], k: Cont, pred: impl Fn(&Term) -> bool) -> Promise {
    let resolved = engine.env.resolve(&args[0]);
    if pred(&resolved) {
        k(engine)
    } else {
        Promise::failure()
    }
}

fn var(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    check(engine, args, k, Term::is_var)
}

fn nonvar(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    check(engine, args, k, |t| !t.is_var())
}

fn atom(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    check(engine, args, k, Term::is_atom)
}

fn integer(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    check(engine, args, k, |t| matches!(t, Term::Int(_)))
}

fn float(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    check(engine, args, k, |t| matches!(t, Term::Float(_)))
}

fn number(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    check(engine, args, k, Term::is_number)
}

fn atomic(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    check(engine, args, k, Term::is_atomic)
}

fn compound(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    check(engine, args, k, Term::is_compound)
}

fn callable(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    check(engine, args, k, Term::is_callable)
}

fn is_list(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let resolved = engine.env.resolve_deep(&args[0]);
    if resolved.as_list_shallow().is_some() {
        k(engine)
    } else {
        Promise::failure()
    }
}

fn ground(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    fn is_ground(t: &Term) -> bool {
        match t {
            Term::Var(_) => false,
            Term::Compound(_, args) => args.iter().all(is_ground),
            _ => true,
        }
    }
    let resolved = engine.env.resolve_deep(&args[0]);
    if is_ground(&resolved) {
        k(engine)
    } else {
        Promise::failure()
    }
}
