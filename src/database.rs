//! The procedure store (spec.md §4.F, component F).

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::compiler::CompiledClause;
use crate::error::PrologError;
use crate::term::Term;

/// A stored clause: the raw term (for `clause/2`/`retract/1` reflection) next
/// to its compiled form (for the VM).
#[derive(Clone)]
pub struct StoredClause {
    pub raw_head: Term,
    pub raw_body: Term,
    pub compiled: Rc<CompiledClause>,
}

/// A procedure's callable slot: either user clauses or a built-in.
pub enum Procedure {
    Clauses(Vec<StoredClause>),
    Builtin(crate::builtins::Builtin),
}

struct Entry {
    procedure: Procedure,
    /// Static entries reject assert/retract/abolish (spec.md §4.F).
    static_proc: bool,
}

/// Indicator = (functor, arity), the procedure store's key (spec.md §3).
pub type Indicator = (Rc<str>, usize);

/// Maps indicators to procedures (spec.md §4.F), grounded on the teacher's
/// `predicate_table`/`index_table` pair in `machine/core.rs`.
pub struct Database {
    procedures: HashMap<Indicator, Entry>,
    /// First-argument index: indicator -> (discriminant key -> clause indices
    /// into that indicator's clause list). A performance supplement
    /// (SPEC_FULL.md §4.F); consulted by the resolver to narrow candidates,
    /// falling back to the full list whenever the first argument is unbound
    /// or the index has gone stale.
    index: HashMap<Indicator, HashMap<IndexKey, Vec<usize>>>,
}

/// A coarse discrimination key for first-argument indexing: atoms/numbers by
/// value, compounds by (functor, arity), nothing for variables (those match
/// every clause so are never indexed on).
#[derive(Clone, PartialEq, Eq, Hash)]
enum IndexKey {
    Atom(Rc<str>),
    Int(i64),
    FloatBits(u64),
    Functor(Rc<str>, usize),
}

fn index_key(t: &Term) -> Option<IndexKey> {
    match t {
        Term::Atom(a) => Some(IndexKey::Atom(a.clone())),
        Term::Int(n) => Some(IndexKey::Int(*n)),
        Term::Float(f) => Some(IndexKey::FloatBits(f.to_bits())),
        Term::Compound(f, args) => Some(IndexKey::Functor(f.clone(), args.len())),
        Term::Var(_) => None,
    }
}

impl Database {
    pub fn new() -> Self {
        Database {
            procedures: HashMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn install_builtin(&mut self, name: impl Into<Rc<str>>, arity: usize, b: crate::builtins::Builtin) {
        self.procedures.insert(
            (name.into(), arity),
            Entry {
                procedure: Procedure::Builtin(b),
                static_proc: true,
            },
        );
    }

    pub fn get(&self, indicator: &Indicator) -> Option<&Procedure> {
        self.procedures.get(indicator).map(|e| &e.procedure)
    }

    pub fn is_defined(&self, indicator: &Indicator) -> bool {
        self.procedures.contains_key(indicator)
    }

    /// Returns the clause list narrowed by the first argument of `args`, or
    /// all clauses if the indicator is unindexed, unindexable, or the
    /// argument given is a variable.
    pub fn candidate_clauses(&self, indicator: &Indicator, args: &[Term]) -> Vec<StoredClause> {
        let Some(Entry {
            procedure: Procedure::Clauses(clauses),
            ..
        }) = self.procedures.get(indicator)
        else {
            return Vec::new();
        };
        if let Some(first) = args.first() {
            if let Some(key) = index_key(first) {
                if let Some(by_key) = self.index.get(indicator) {
                    if let Some(idxs) = by_key.get(&key) {
                        return idxs
                            .iter()
                            .filter_map(|&i| clauses.get(i).cloned())
                            .collect();
                    }
                    // Indexed indicator, but this key never appears: no
                    // clause can match on first-argument alone. A clause
                    // whose first arg is itself a variable would also match
                    // any key, so we must still include those.
                    return clauses
                        .iter()
                        .filter(|c| matches!(c.raw_head.args().first(), Some(Term::Var(_))))
                        .cloned()
                        .collect();
                }
            }
        }
        clauses.clone()
    }

    fn rebuild_index(&mut self, indicator: &Indicator) {
        let Some(Entry {
            procedure: Procedure::Clauses(clauses),
            ..
        }) = self.procedures.get(indicator)
        else {
            self.index.remove(indicator);
            return;
        };
        let mut by_key: HashMap<IndexKey, Vec<usize>> = HashMap::new();
        for (i, clause) in clauses.iter().enumerate() {
            if let Some(first) = clause.raw_head.args().first() {
                if let Some(key) = index_key(first) {
                    by_key.entry(key).or_default().push(i);
                }
            }
        }
        self.index.insert(indicator.clone(), by_key);
    }

    fn entry_mut(&mut self, indicator: &Indicator, create_dynamic: bool) -> Option<&mut Entry> {
        if create_dynamic && !self.procedures.contains_key(indicator) {
            self.procedures.insert(
                indicator.clone(),
                Entry {
                    procedure: Procedure::Clauses(Vec::new()),
                    static_proc: false,
                },
            );
        }
        self.procedures.get_mut(indicator)
    }

    fn check_modifiable(&self, indicator: &Indicator) -> Result<(), PrologError> {
        if let Some(e) = self.procedures.get(indicator) {
            if e.static_proc {
                return Err(PrologError::permission_error(
                    "modify",
                    "static_procedure",
                    Term::compound(
                        "/",
                        vec![Term::atom(indicator.0.clone()), Term::int(indicator.1 as i64)],
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn install_clause(
        &mut self,
        indicator: Indicator,
        clause: StoredClause,
        front: bool,
    ) -> Result<(), PrologError> {
        self.check_modifiable(&indicator)?;
        debug!("installing clause for {}/{} (front={})", indicator.0, indicator.1, front);
        let entry = self.entry_mut(&indicator, true).expect("just created if missing");
        match &mut entry.procedure {
            Procedure::Clauses(clauses) => {
                if front {
                    clauses.insert(0, clause);
                } else {
                    clauses.push(clause);
                }
            }
            Procedure::Builtin(_) => {
                return Err(PrologError::permission_error(
                    "modify",
                    "static_procedure",
                    Term::compound(
                        "/",
                        vec![Term::atom(indicator.0.clone()), Term::int(indicator.1 as i64)],
                    ),
                ))
            }
        }
        self.rebuild_index(&indicator);
        Ok(())
    }

    /// Removes the first clause at or after `start` whose raw term unifies
    /// with `matches`, returning its index. The caller (builtins::database_builtins)
    /// performs the actual unification under the engine's environment and
    /// passes the already-located index back via `remove_at`.
    pub fn clauses(&self, indicator: &Indicator) -> Vec<StoredClause> {
        match self.procedures.get(indicator) {
            Some(Entry {
                procedure: Procedure::Clauses(clauses),
                ..
            }) => clauses.clone(),
            _ => Vec::new(),
        }
    }

    pub fn remove_at(&mut self, indicator: &Indicator, index: usize) -> Result<(), PrologError> {
        self.check_modifiable(indicator)?;
        if let Some(Entry {
            procedure: Procedure::Clauses(clauses),
            ..
        }) = self.procedures.get_mut(indicator)
        {
            if index < clauses.len() {
                clauses.remove(index);
            }
        }
        self.rebuild_index(indicator);
        Ok(())
    }

    pub fn abolish(&mut self, indicator: &Indicator) -> Result<(), PrologError> {
        self.check_modifiable(indicator)?;
        self.procedures.remove(indicator);
        self.index.remove(indicator);
        Ok(())
    }

    pub fn declare_dynamic(&mut self, indicator: Indicator) {
        self.entry_mut(&indicator, true);
    }

    pub fn indicators(&self) -> Vec<Indicator> {
        self.procedures.keys().cloned().collect()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_clause;

    fn fact(name: &str) -> StoredClause {
        let head = Term::atom(name);
        let body = Term::atom("true");
        let compiled = Rc::new(compile_clause(&head, &body).unwrap());
        StoredClause {
            raw_head: head,
            raw_body: body,
            compiled,
        }
    }

    #[test]
    fn install_then_get_round_trips() {
        let mut db = Database::new();
        let ind: Indicator = ("p".into(), 0);
        db.install_clause(ind.clone(), fact("p"), false).unwrap();
        assert_eq!(db.clauses(&ind).len(), 1);
    }

    #[test]
    fn asserta_prepends_assertz_appends() {
        let mut db = Database::new();
        let ind: Indicator = ("p".into(), 0);
        db.install_clause(ind.clone(), fact("p"), false).unwrap();
        db.install_clause(ind.clone(), fact("p"), true).unwrap();
        // front insert landed first
        assert_eq!(db.clauses(&ind).len(), 2);
    }

    #[test]
    fn abolish_removes_indicator_entirely() {
        let mut db = Database::new();
        let ind: Indicator = ("p".into(), 0);
        db.install_clause(ind.clone(), fact("p"), false).unwrap();
        db.abolish(&ind).unwrap();
        assert!(!db.is_defined(&ind));
    }

    #[test]
    fn static_procedure_rejects_modification() {
        let mut db = Database::new();
        let ind: Indicator = ("true".into(), 0);
        db.install_builtin("true", 0, |engine, _, k| k(engine));
        assert!(db.install_clause(ind, fact("true"), false).is_err());
    }
}
