//! The environment: an append-only binding log with checkpoint/restore
//! (spec.md §3/§4.A, §9 "Environment as append-only log").

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::error::PrologError;
use crate::term::{Term, VarId};

/// Process-wide monotonic variable id source (spec.md §9 "Variable identity").
static NEXT_VAR: AtomicU64 = AtomicU64::new(0);

/// Allocates a fresh, globally unique variable id.
pub fn fresh_var_id() -> VarId {
    NEXT_VAR.fetch_add(1, AtomicOrdering::Relaxed)
}

/// An opaque snapshot of environment length, used to undo bindings on
/// failure (spec.md's "Checkpoint").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(pub usize);

/// The append-only log of variable bindings for one query's execution.
#[derive(Debug, Default, Clone)]
pub struct Env {
    bindings: Vec<(VarId, Term)>,
    /// Human-readable source names, kept only for reporting (spec.md §9).
    names: std::collections::HashMap<VarId, String>,
}

const MAX_RESOLVE_DEPTH: usize = 1_000_000;

impl Env {
    pub fn new() -> Self {
        Env {
            bindings: Vec::new(),
            names: std::collections::HashMap::new(),
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.bindings.len())
    }

    /// Truncates the binding log back to `cp`, undoing every binding made
    /// since it was taken.
    pub fn restore(&mut self, cp: Checkpoint) {
        self.bindings.truncate(cp.0);
    }

    /// First-hit-wins lookup of a variable's binding, scanning from the tail
    /// (most recent binding) per spec.md §4.A.
    pub fn lookup(&self, var: VarId) -> Option<&Term> {
        self.bindings
            .iter()
            .rev()
            .find(|(v, _)| *v == var)
            .map(|(_, t)| t)
    }

    /// Records a new binding. Bindings are append-only; a variable is never
    /// rebound within the same branch (callers must not call `bind` twice
    /// for the same unbound variable without an intervening `restore`).
    pub fn bind(&mut self, var: VarId, term: Term) {
        self.bindings.push((var, term));
    }

    pub fn name_var(&mut self, var: VarId, name: impl Into<String>) {
        self.names.entry(var).or_insert_with(|| name.into());
    }

    pub fn var_name(&self, var: VarId) -> Option<&str> {
        self.names.get(&var).map(|s| s.as_str())
    }

    pub fn fresh_var(&mut self) -> Term {
        Term::var(fresh_var_id())
    }

    /// Chases variable -> variable -> .. to a non-variable or an unbound
    /// variable. Never rewrites the log (no path compression is required
    /// for correctness, spec.md §3). Cycle-safe via a depth bound: acyclic
    /// chains terminate long before the bound; a chain this long can only
    /// arise from a bug, since bindings are append-only and each bound
    /// variable is bound exactly once.
    pub fn resolve(&self, term: &Term) -> Term {
        let mut cur = term.clone();
        let mut depth = 0;
        while let Term::Var(v) = cur {
            depth += 1;
            if depth > MAX_RESOLVE_DEPTH {
                return cur;
            }
            match self.lookup(v) {
                Some(next) => cur = next.clone(),
                None => return Term::Var(v),
            }
        }
        cur
    }

    /// Recursively resolves a term and every sub-term, for printing and
    /// reflection built-ins. Guards against rational-tree cycles (spec.md
    /// §9) by bounding recursion depth rather than looping forever.
    pub fn resolve_deep(&self, term: &Term) -> Term {
        self.resolve_deep_bounded(term, 0)
    }

    fn resolve_deep_bounded(&self, term: &Term, depth: usize) -> Term {
        let resolved = self.resolve(term);
        if depth > 10_000 {
            return resolved;
        }
        match resolved {
            Term::Compound(f, args) => Term::Compound(
                f,
                args.iter()
                    .map(|a| self.resolve_deep_bounded(a, depth + 1))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Collects a resolved proper list into a Rust vector, chasing variable
    /// bindings along the spine. Fails with `instantiation_error` on a
    /// partial list and `type_error(list, _)` on an improper one.
    pub fn collect_list(&self, term: &Term) -> Result<Vec<Term>, PrologError> {
        let mut items = Vec::new();
        let mut cur = self.resolve(term);
        loop {
            if cur.is_nil() {
                return Ok(items);
            }
            match cur {
                Term::Compound(ref f, ref args) if &**f == "." && args.len() == 2 => {
                    items.push(args[0].clone());
                    cur = self.resolve(&args[1]);
                }
                Term::Var(_) => return Err(PrologError::instantiation()),
                other => {
                    return Err(PrologError::type_error("list", other));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_undoes_bindings_made_after_checkpoint() {
        let mut env = Env::new();
        let v = fresh_var_id();
        let cp = env.checkpoint();
        env.bind(v, Term::int(1));
        assert_eq!(env.resolve(&Term::var(v)), Term::int(1));
        env.restore(cp);
        assert_eq!(env.resolve(&Term::var(v)), Term::var(v));
    }

    #[test]
    fn resolve_chases_variable_chains() {
        let mut env = Env::new();
        let a = fresh_var_id();
        let b = fresh_var_id();
        env.bind(a, Term::var(b));
        env.bind(b, Term::int(42));
        assert_eq!(env.resolve(&Term::var(a)), Term::int(42));
    }

    #[test]
    fn first_hit_wins_on_duplicate_bindings() {
        let mut env = Env::new();
        let v = fresh_var_id();
        env.bind(v, Term::int(1));
        env.bind(v, Term::int(2));
        assert_eq!(env.resolve(&Term::var(v)), Term::int(2));
    }

    #[test]
    fn collect_list_fails_on_partial_list() {
        let mut env = Env::new();
        let tail = fresh_var_id();
        let partial = Term::cons(Term::int(1), Term::var(tail));
        assert!(matches!(
            env.collect_list(&partial),
            Err(PrologError::InstantiationError)
        ));
    }
}
