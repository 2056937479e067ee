//! The continuation-promise tree (spec.md §4.C, component C) -- the
//! hardest-engineering piece of the engine: lazy success/failure/error,
//! cut barriers, and the machinery that drives them to a terminal.
//!
//! Grounded on the teacher's `choice_stack: Vec<Box<ChoicePoint>>` +
//! `execute_fail`/`execute_cut` (machine/core.rs, machine/execution.rs): we
//! replace the teacher's register-machine choice points with an explicit
//! work-stack of `ChoiceFrame`s driving a `Promise` tree instead of a flat
//! instruction stream, but keep the same "iterative, explicit stack, no
//! native recursion for backtracking" shape.

use std::rc::Rc;

use crate::engine::Engine;
use crate::env::Checkpoint;
use crate::error::PrologError;

/// Identifies the activation a `!` commits to (spec.md §4.C/§9).
pub type BarrierId = u64;

/// "What to do after this goal succeeds" (spec.md §4.C). Continuations may
/// be invoked more than once (once per alternative a goal's resolution
/// offers), so they are reference-counted closures rather than `FnOnce`.
pub type Cont = Rc<dyn Fn(&mut Engine) -> Promise>;

/// A lazy description of the remaining search (spec.md §4.C).
pub enum Promise {
    /// A thunk returning another promise -- defers work until forced.
    Delayed(Box<dyn FnOnce(&mut Engine) -> Promise>),
    /// Terminal success (`true`) or failure (`false`).
    Bool(bool),
    /// Terminal failure carrying an exception term.
    Error(PrologError),
    /// Ordered alternative branches, optionally tagged with the barrier id
    /// that a `!` occurring within any of them may prune.
    Choice(Vec<Promise>, Option<BarrierId>),
    /// Marks that barrier `.0` has just been committed (`!` was executed):
    /// every pending alternative tagged with this barrier is discarded, then
    /// forcing continues into `.1`, the promise for the rest of the body.
    Cut(BarrierId, Box<Promise>),
}

impl Promise {
    pub fn success() -> Promise {
        Promise::Bool(true)
    }

    pub fn failure() -> Promise {
        Promise::Bool(false)
    }

    pub fn error(e: PrologError) -> Promise {
        Promise::Error(e)
    }

    pub fn delayed(f: impl FnOnce(&mut Engine) -> Promise + 'static) -> Promise {
        Promise::Delayed(Box::new(f))
    }
}

/// The terminal an engine query settles to.
#[derive(Debug)]
pub enum Outcome {
    True,
    False,
    Error(PrologError),
}

struct ChoiceFrame {
    remaining: Vec<Promise>,
    barrier: Option<BarrierId>,
    checkpoint: Checkpoint,
}

/// A resumable handle onto a `Promise` tree's alternatives -- this is the
/// generator spec.md's "lazy choice-point tree" describes: `next` drives the
/// tree to the next terminal, leaving enough state behind to resume for
/// "give me another solution" later (used by the top-level query loop,
/// `findall`/`bagof`/`setof`, and `catch/3`'s re-entry into `Goal`).
pub struct Solutions {
    stack: Vec<ChoiceFrame>,
    pending: Option<Promise>,
}

impl Solutions {
    pub fn new(start: Promise) -> Self {
        Solutions {
            stack: Vec::new(),
            pending: Some(start),
        }
    }

    /// Drives the tree to the next terminal. Returns `Outcome::False` once
    /// every alternative has been exhausted; calling `next` again after
    /// that also returns `Outcome::False`.
    ///
    /// Invariant 2 (spec.md §8: a failing sub-goal leaves the environment
    /// byte-identical to before it ran) holds even when this pull's
    /// resolution never pushed a single `ChoiceFrame` -- e.g. `X = 1, fail`
    /// binds `X` with no choice point to backtrack through. So every `next`
    /// call remembers the checkpoint it started from and restores to it on
    /// `False`/`Error`, on top of whatever per-frame restores already ran.
    pub fn next(&mut self, engine: &mut Engine) -> Outcome {
        let start_cp = engine.env.checkpoint();
        // `pending` only ever holds the original promise passed to `new` --
        // it is consumed by the first call and never repopulated. Every
        // subsequent pull must resume from whatever alternatives `next`
        // already left on `stack` for exactly this reason.
        let mut current = match self.pending.take() {
            Some(p) => p,
            None => match self.backtrack(engine) {
                Some(p) => p,
                None => return Outcome::False,
            },
        };
        loop {
            match current {
                Promise::Bool(true) => return Outcome::True,
                Promise::Bool(false) => match self.backtrack(engine) {
                    Some(next) => {
                        current = next;
                        continue;
                    }
                    None => {
                        engine.env.restore(start_cp);
                        return Outcome::False;
                    }
                },
                Promise::Error(e) => {
                    // An error aborts the whole choice: every pending
                    // alternative is discarded (spec.md §4.C).
                    self.stack.clear();
                    engine.env.restore(start_cp);
                    return Outcome::Error(e);
                }
                Promise::Delayed(thunk) => {
                    current = thunk(engine);
                    continue;
                }
                Promise::Choice(mut alts, barrier) => {
                    if alts.is_empty() {
                        match self.backtrack(engine) {
                            Some(next) => {
                                current = next;
                                continue;
                            }
                            None => {
                                engine.env.restore(start_cp);
                                return Outcome::False;
                            }
                        }
                    } else {
                        let first = alts.remove(0);
                        if !alts.is_empty() {
                            self.stack.push(ChoiceFrame {
                                remaining: alts,
                                barrier,
                                checkpoint: engine.env.checkpoint(),
                            });
                        }
                        current = first;
                        continue;
                    }
                }
                Promise::Cut(barrier, inner) => {
                    self.stack.retain(|f| f.barrier != Some(barrier));
                    current = *inner;
                    continue;
                }
            }
        }
    }

    fn backtrack(&mut self, engine: &mut Engine) -> Option<Promise> {
        while let Some(mut frame) = self.stack.pop() {
            engine.env.restore(frame.checkpoint);
            if frame.remaining.is_empty() {
                continue;
            }
            let next = frame.remaining.remove(0);
            if !frame.remaining.is_empty() {
                self.stack.push(frame);
            }
            return Some(next);
        }
        None
    }
}

/// Forces a promise to its first terminal, discarding any further
/// alternatives. Convenience wrapper over `Solutions` for call sites (most
/// built-ins, directive execution) that only need one answer.
pub fn force_once(engine: &mut Engine, promise: Promise) -> Outcome {
    Solutions::new(promise).next(engine)
}
