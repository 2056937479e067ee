//! Unification built-ins (spec.md §4.B/§4.H): `=/2`, `\=/2`,
//! `unify_with_occurs_check/2`.

use crate::database::Database;
use crate::engine::Engine;
use crate::promise::{Cont, Promise};
use crate::term::Term;
use crate::unify::unify;

pub fn install(db: &mut Database) {
    db.install_builtin("=", 2, eq);
    db.install_builtin("\\=", 2, not_eq);
    db.install_builtin("unify_with_occurs_check", 2, eq_occurs_check);
}

fn eq(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    if unify(&mut engine.env, &args[0], &args[1], false) {
        k(engine)
    } else {
        Promise::failure()
    }
}

/// `\=/2`: succeeds iff `=/2` would fail, with no bindings retained either
/// way (spec.md's negation-as-failure shape applied to unification).
fn not_eq(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let cp = engine.env.checkpoint();
    let unifies = unify(&mut engine.env, &args[0], &args[1], false);
    engine.env.restore(cp);
    if unifies {
        Promise::failure()
    } else {
        k(engine)
    }
}

fn eq_occurs_check(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    if unify(&mut engine.env, &args[0], &args[1], true) {
        k(engine)
    } else {
        Promise::failure()
    }
}
