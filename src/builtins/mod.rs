//! The built-in predicate kernel (spec.md §4.H, component H): `call/1..N`,
//! `,/2`/`;/2`/`->/2`/`!` live in `resolver.rs` since the spec treats them as
//! control constructs decoded *before* database lookup; everything else --
//! unification, type checks, term inspection, the database, solution-set
//! built-ins, arithmetic, atom/string conversions, and stream/flag/operator
//! plumbing -- is wired in here as ordinary procedures.
//!
//! Grounded on the teacher's `Machine::builtins: HashMap<String,
//! BuiltinPredicate>` registry in `machine/core.rs::new()` (a flat table of
//! name -> function pointer populated by one `insert` call per built-in);
//! the registry itself lives on `Database` (spec.md's procedure store), keyed
//! by indicator rather than name alone so arity-overloaded built-ins (e.g.
//! `call/1` through `call/8`) are distinct entries.

pub mod arithmetic;
pub mod atoms;
pub mod control;
pub mod database_builtins;
pub mod io_builtins;
pub mod solutions;
pub mod term_inspect;
pub mod typecheck;
pub mod unify_builtins;

use crate::database::Database;
use crate::engine::Engine;
use crate::promise::{Cont, Promise};
use crate::term::Term;

/// The callable slot of a built-in procedure (spec.md §3 "Procedure"):
/// dispatches on the already-resolved-at-top-level argument terms and an
/// already-constructed continuation. Built-ins resolve their own arguments
/// further as needed (e.g. `=/2` unifies unresolved sub-structure).
pub type Builtin = fn(&mut Engine, &[Term], Cont) -> Promise;

/// Installs the entire spec.md §4.H built-in kernel into a fresh database.
/// Called once by `Engine::with_builtins`.
pub fn install_all(db: &mut Database) {
    control::install(db);
    unify_builtins::install(db);
    typecheck::install(db);
    term_inspect::install(db);
    database_builtins::install(db);
    solutions::install(db);
    arithmetic::install(db);
    atoms::install(db);
    io_builtins::install(db);
}
