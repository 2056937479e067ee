//! Shared test harness: consult a program source, run a query, and collect
//! the bindings of its named variables across all solutions. Mirrors what
//! `src/main.rs`'s `consult_source`/`repl` do, but driven programmatically
//! instead of over stdin.

use prolog_core::engine::Engine;
use prolog_core::promise::Outcome;
use prolog_core::reader::{self, Reader};
use prolog_core::term::{Term, VarId};
use prolog_core::writer;

/// A fresh engine with the standard built-in kernel installed.
pub fn engine() -> Engine {
    Engine::with_builtins()
}

/// Consults every clause/directive in `source` into `engine`, panicking on
/// the first syntax or directive error (tests want failures loud, unlike
/// the REPL's "keep going" policy).
pub fn consult(engine: &mut Engine, source: &str) {
    let mut reader = Reader::new(source).expect("syntax error in test program");
    loop {
        match reader.next_term(&engine.operators) {
            Ok(Some(rt)) => engine
                .consult_term(&rt.term)
                .expect("directive/assert failed in test program"),
            Ok(None) => break,
            Err(e) => panic!("syntax error in test program: {}", e),
        }
    }
}

/// One pulled solution: the named (non-`_`-prefixed) variables bound to
/// their resolved, rendered values.
pub type Bindings = Vec<(String, String)>;

/// Runs `goal_src` (a single query, with or without trailing `.`) against
/// `engine` and collects up to `limit` solutions' worth of bindings, in
/// solution order -- the ordering determinism spec.md §8 invariant 3 calls
/// for.
pub fn solutions(engine: &mut Engine, goal_src: &str, limit: usize) -> Vec<Bindings> {
    let with_dot = if goal_src.trim_end().ends_with('.') {
        goal_src.to_string()
    } else {
        format!("{}.", goal_src)
    };
    let rt = reader::read_one_term(&with_dot, &engine.operators).expect("syntax error in goal");
    let named: Vec<(String, VarId)> = rt
        .variable_names
        .iter()
        .filter(|(name, _)| !name.starts_with('_'))
        .cloned()
        .collect();
    let mut sols = engine.solve(&rt.term);
    let mut out = Vec::new();
    while out.len() < limit {
        match sols.next(engine) {
            Outcome::True => {
                let row = named
                    .iter()
                    .map(|(name, id)| {
                        let value = engine.env.resolve_deep(&Term::Var(*id));
                        (
                            name.clone(),
                            writer::term_to_string(&value, &engine.env, &engine.operators, false),
                        )
                    })
                    .collect();
                out.push(row);
            }
            Outcome::False => break,
            Outcome::Error(e) => panic!("goal raised an uncaught exception: {}", e),
        }
    }
    out
}

/// Runs `goal_src` once, returning whether it succeeded, failed, or the
/// term of an uncaught exception.
pub fn run_once(engine: &mut Engine, goal_src: &str) -> Outcome {
    let with_dot = if goal_src.trim_end().ends_with('.') {
        goal_src.to_string()
    } else {
        format!("{}.", goal_src)
    };
    let rt = reader::read_one_term(&with_dot, &engine.operators).expect("syntax error in goal");
    engine.solve_once(&rt.term)
}

/// Convenience: the rendered value of one named variable after a single
/// successful solve (panics if the goal doesn't succeed).
pub fn eval_binding(engine: &mut Engine, goal_src: &str, var_name: &str) -> String {
    let rows = solutions(engine, goal_src, 1);
    let row = rows.first().unwrap_or_else(|| panic!("goal had no solutions: {}", goal_src));
    row.iter()
        .find(|(n, _)| n == var_name)
        .unwrap_or_else(|| panic!("variable {} not bound", var_name))
        .1
        .clone()
}
