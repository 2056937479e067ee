//! The collaborator wiring home: bundles the environment, procedure store,
//! operator table, flag store, stream registry, and the barrier-id counter
//! that every activation draws a fresh cut barrier from.
//!
//! Not a spec.md component in its own right -- every other component
//! (resolver, VM, built-ins) needs all of these together, so `Engine` is the
//! struct threaded through as `&mut Engine` everywhere, grounded on the
//! teacher's single `Machine` struct in `machine/core.rs` bundling registers
//! + predicate table + choice stack + builtins together the same way.

use std::cell::Cell;

use crate::database::Database;
use crate::env::Env;
use crate::error::PrologError;
use crate::flags::Flags;
use crate::operators::OperatorTable;
use crate::promise::{force_once, BarrierId, Outcome, Promise};
use crate::streams::Streams;
use crate::term::Term;

pub struct Engine {
    pub env: Env,
    pub database: Database,
    pub operators: OperatorTable,
    pub flags: Flags,
    pub streams: Streams,
    next_barrier: Cell<BarrierId>,
}

impl Engine {
    pub fn new(database: Database) -> Self {
        Engine {
            env: Env::new(),
            database,
            operators: OperatorTable::new(),
            flags: Flags::new(),
            streams: Streams::new(),
            next_barrier: Cell::new(0),
        }
    }

    /// Builds an engine with the standard built-in kernel (spec.md §4.H)
    /// already installed -- the entry point real embeddings (the REPL,
    /// integration tests) should use.
    pub fn with_builtins() -> Self {
        let mut database = Database::new();
        crate::builtins::install_all(&mut database);
        Engine::new(database)
    }

    /// Allocates a fresh cut barrier id (spec.md §4.C/§9): every clause
    /// activation, and every `call/N`-style opaque meta-call, draws its own.
    pub fn fresh_barrier(&self) -> BarrierId {
        let b = self.next_barrier.get();
        self.next_barrier.set(b + 1);
        b
    }

    /// Runs `goal` to its first solution, discarding further alternatives.
    /// The top-level entry point for directives and `-g` goals.
    pub fn solve_once(&mut self, goal: &Term) -> Outcome {
        let barrier = self.fresh_barrier();
        let promise = crate::resolver::call(self, goal, std::rc::Rc::new(|_| Promise::success()), barrier);
        force_once(self, promise)
    }

    /// Runs `goal` and returns a handle that can be pulled for successive
    /// solutions (used by the REPL's `;`-retry and by the reader-feeding
    /// consult loop).
    pub fn solve(&mut self, goal: &Term) -> crate::promise::Solutions {
        let barrier = self.fresh_barrier();
        let promise = crate::resolver::call(self, goal, std::rc::Rc::new(|_| Promise::success()), barrier);
        crate::promise::Solutions::new(promise)
    }

    /// Consults (installs or immediately executes) one clause-or-directive
    /// term read from source text (spec.md §9 "Assert of clause-with-body").
    pub fn consult_term(&mut self, term: &Term) -> Result<(), PrologError> {
        if let Term::Compound(f, args) = &term {
            if &**f == ":-" && args.len() == 1 {
                match self.solve_once(&args[0]) {
                    Outcome::True => return Ok(()),
                    Outcome::False => {
                        log::warn!("directive failed: {}", args[0]);
                        return Ok(());
                    }
                    Outcome::Error(e) => return Err(e),
                }
            }
        }
        let (head, body) = split_clause(term);
        crate::builtins::database_builtins::assert_clause(self, &head, &body, false)
    }
}

fn split_clause(term: &Term) -> (Term, Term) {
    match term {
        Term::Compound(f, args) if &**f == ":-" && args.len() == 2 => {
            (args[0].clone(), args[1].clone())
        }
        other => (other.clone(), Term::atom("true")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_barrier_is_monotonic_and_unique() {
        let engine = Engine::new(Database::new());
        let a = engine.fresh_barrier();
        let b = engine.fresh_barrier();
        assert_ne!(a, b);
    }
}
