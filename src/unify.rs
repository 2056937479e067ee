//! Unification (spec.md §4.B, component B).

use crate::env::Env;
use crate::term::Term;

/// Attempts to unify `a` and `b`, with or without the occurs-check.
///
/// On success the environment has been extended with whatever bindings were
/// needed; on failure the environment is restored to exactly the state it
/// had before this call (spec.md §4.B: "Failure must leave the environment
/// unchanged"). Callers composing several unifications across a clause head
/// do not need their own checkpoint/restore dance around each individual
/// `unify` call -- this function is self-contained.
pub fn unify(env: &mut Env, a: &Term, b: &Term, occurs_check: bool) -> bool {
    let cp = env.checkpoint();
    if unify_rec(env, a, b, occurs_check) {
        true
    } else {
        env.restore(cp);
        false
    }
}

fn unify_rec(env: &mut Env, a: &Term, b: &Term, occurs_check: bool) -> bool {
    let ra = env.resolve(a);
    let rb = env.resolve(b);
    match (&ra, &rb) {
        (Term::Var(x), Term::Var(y)) if x == y => true,
        (Term::Var(x), _) => bind_var(env, *x, &rb, occurs_check),
        (_, Term::Var(y)) => bind_var(env, *y, &ra, occurs_check),
        (Term::Atom(x), Term::Atom(y)) => x == y,
        (Term::Int(x), Term::Int(y)) => x == y,
        (Term::Float(x), Term::Float(y)) => x == y,
        (Term::Compound(f1, args1), Term::Compound(f2, args2)) => {
            if f1 != f2 || args1.len() != args2.len() {
                return false;
            }
            for (x, y) in args1.iter().zip(args2.iter()) {
                if !unify_rec(env, x, y, occurs_check) {
                    return false;
                }
            }
            true
        }
        _ => false,
    }
}

fn bind_var(env: &mut Env, var: crate::term::VarId, term: &Term, occurs_check: bool) -> bool {
    if occurs_check && occurs(env, var, term) {
        return false;
    }
    env.bind(var, term.clone());
    true
}

/// True if variable `var` occurs (after resolution) anywhere inside `term`.
fn occurs(env: &Env, var: crate::term::VarId, term: &Term) -> bool {
    match env.resolve(term) {
        Term::Var(v) => v == var,
        Term::Compound(_, args) => args.iter().any(|a| occurs(env, var, a)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::fresh_var_id;

    #[test]
    fn unify_binds_variable_to_atomic() {
        let mut env = Env::new();
        let v = fresh_var_id();
        assert!(unify(&mut env, &Term::var(v), &Term::int(5), false));
        assert_eq!(env.resolve(&Term::var(v)), Term::int(5));
    }

    #[test]
    fn unify_restores_environment_on_failure() {
        let mut env = Env::new();
        let v = fresh_var_id();
        env.bind(v, Term::int(1));
        let before = env.checkpoint();
        assert!(!unify(&mut env, &Term::var(v), &Term::int(2), false));
        assert_eq!(env.checkpoint(), before);
        assert_eq!(env.resolve(&Term::var(v)), Term::int(1));
    }

    #[test]
    fn unify_compound_args_pairwise() {
        let mut env = Env::new();
        let v = fresh_var_id();
        let a = Term::compound("f", vec![Term::int(1), Term::var(v)]);
        let b = Term::compound("f", vec![Term::int(1), Term::int(2)]);
        assert!(unify(&mut env, &a, &b, false));
        assert_eq!(env.resolve(&Term::var(v)), Term::int(2));
    }

    #[test]
    fn occurs_check_rejects_cycle_plain_allows_it() {
        let mut env = Env::new();
        let v = fresh_var_id();
        let cyclic = Term::compound("f", vec![Term::var(v)]);
        assert!(!unify(&mut env, &Term::var(v), &cyclic, true));
        assert!(unify(&mut env, &Term::var(v), &cyclic, false));
    }

    #[test]
    fn soundness_resolved_sides_equal_after_success() {
        let mut env = Env::new();
        let v = fresh_var_id();
        let a = Term::compound("f", vec![Term::var(v), Term::atom("x")]);
        let b = Term::compound("f", vec![Term::int(7), Term::atom("x")]);
        assert!(unify(&mut env, &a, &b, false));
        assert_eq!(env.resolve_deep(&a), env.resolve_deep(&b));
    }
}
