//! The term reader (spec.md §6 Reader contract, collaborator).
//!
//! Grounded on the teacher's own declared-but-unused `pest`/`pest_derive`
//! dependency (present in its `Cargo.toml`, confirming the intended parsing
//! stack) plus a hand-written Pratt/precedence-climbing pass over the
//! runtime-mutable `OperatorTable`, since a pest grammar alone cannot
//! express an operator-precedence grammar whose table changes at runtime
//! via `op/3`.

mod parser;

use crate::error::PrologError;
use crate::operators::OperatorTable;
use crate::term::{Term, VarId};

pub use parser::Reader;

/// One parsed clause/term plus the reflection data spec.md §6 calls for:
/// the name-to-variable bindings the source used, and which of those names
/// occurred exactly once (singletons -- almost always a typo in real
/// programs, flagged by convention rather than enforced).
#[derive(Debug, Clone)]
pub struct ReadTerm {
    pub term: Term,
    pub variable_names: Vec<(String, VarId)>,
    pub singletons: Vec<String>,
}

/// Convenience one-shot parse of a single term from a string ending in `.`,
/// used by built-ins (`atom_to_term`-style conversions, tests) that do not
/// need the streaming multi-clause reader.
pub fn read_one_term(src: &str, ops: &OperatorTable) -> Result<ReadTerm, PrologError> {
    let mut reader = Reader::new(src)?;
    match reader.next_term(ops)? {
        Some(rt) => Ok(rt),
        None => Err(PrologError::SyntaxError {
            detail: "no term found".into(),
        }),
    }
}
