//! The bytecode VM (spec.md §4.E, component E): executes one compiled
//! clause against a caller's argument terms and a continuation.
//!
//! Grounded on the teacher's `Machine::step`/`run` dispatch-loop shape in
//! `machine/core.rs`, adapted to operate over one clause's instruction
//! stream against a supplied continuation instead of a global PC.

use std::rc::Rc;

use log::trace;

use crate::compiler::Body;
use crate::database::StoredClause;
use crate::engine::Engine;
use crate::instruction::Instruction;
use crate::promise::{BarrierId, Cont, Promise};
use crate::term::Term;
use crate::unify::unify;

/// What an argument-construction stream (the instructions preceding
/// `Enter`/`Call`) ends in.
enum Terminal {
    Enter,
    Call(Rc<str>),
}

/// Runs the `Const`/`Var`/`Functor`/`Pop` prefix of one instruction block,
/// returning the constructed argument terms and how the block ends.
fn run_block(instrs: &[Instruction], slots: &[Term], constants: &[Term]) -> (Vec<Term>, Terminal) {
    let mut stack: Vec<Term> = Vec::new();
    for instr in instrs {
        match instr {
            Instruction::Const(k) => stack.push(constants[*k].clone()),
            Instruction::Var(i) => stack.push(slots[*i].clone()),
            Instruction::Functor(f, n) => {
                let at = stack.len() - n;
                let args = stack.split_off(at);
                stack.push(Term::compound(f.clone(), args));
            }
            Instruction::Pop => {
                stack.pop();
            }
            Instruction::Enter => return (stack, Terminal::Enter),
            Instruction::Call(name, n) => {
                let at = stack.len() - n;
                let args = stack.split_off(at);
                return (args, Terminal::Call(name.clone()));
            }
            Instruction::Exit => unreachable!("Exit never appears inside a compiled block"),
        }
    }
    unreachable!("every compiled block ends in Enter or Call")
}

/// Renames a clause apart (spec.md §4.E "rename apart variables"), unifies
/// its head against `call_args`, then executes its body. `barrier` is the
/// fresh id the resolver allocated for this clause activation's choice
/// point, threaded down so a `!` in the body commits to exactly this
/// activation.
pub fn run_clause(
    engine: &mut Engine,
    clause: &StoredClause,
    call_args: &[Term],
    k: Cont,
    barrier: BarrierId,
) -> Promise {
    let compiled = clause.compiled.clone();
    let slots: Rc<[Term]> = (0..compiled.num_vars)
        .map(|_| engine.env.fresh_var())
        .collect::<Vec<_>>()
        .into();
    let constants: Rc<[Term]> = compiled.constants.clone().into();

    let (head_args, terminal) = run_block(&compiled.head, &slots, &constants);
    debug_assert!(matches!(terminal, Terminal::Enter));
    trace!("vm: entering clause, {} head arg(s)", head_args.len());
    for (h, c) in head_args.iter().zip(call_args.iter()) {
        if !unify(&mut engine.env, h, c, false) {
            return Promise::failure();
        }
    }
    exec_body(engine, &compiled.body, &slots, &constants, k, barrier)
}

fn exec_body(
    engine: &mut Engine,
    body: &Rc<Body>,
    slots: &Rc<[Term]>,
    constants: &Rc<[Term]>,
    k: Cont,
    barrier: BarrierId,
) -> Promise {
    match body.as_ref() {
        Body::True => k(engine),
        Body::Fail => Promise::failure(),
        Body::Cut => {
            let rest = k(engine);
            Promise::Cut(barrier, Box::new(rest))
        }
        Body::Goal(instrs) => {
            let (args, terminal) = run_block(instrs, slots, constants);
            let name = match terminal {
                Terminal::Call(name) => name,
                Terminal::Enter => unreachable!("a body goal block ends in Call, not Enter"),
            };
            let goal = if args.is_empty() {
                Term::atom(name)
            } else {
                Term::compound(name, args)
            };
            crate::resolver::call(engine, &goal, k, barrier)
        }
        Body::Conjunction(a, b) => {
            let b = b.clone();
            let slots2 = slots.clone();
            let constants2 = constants.clone();
            let k2: Cont = Rc::new(move |engine: &mut Engine| {
                exec_body(engine, &b, &slots2, &constants2, k.clone(), barrier)
            });
            exec_body(engine, a, slots, constants, k2, barrier)
        }
        Body::Disjunction(a, b) => {
            // Same deferral `resolver::call`'s raw `;/2` arm needs: running
            // `a`'s branch eagerly here would both leak its bindings into
            // `b`'s construction and collapse to a payload-less terminal
            // before `Solutions` ever gets to choose between them. Neither
            // branch runs until it is actually selected and forced.
            let (a, b) = (a.clone(), b.clone());
            let (slots1, constants1) = (slots.clone(), constants.clone());
            let (slots2, constants2) = (slots.clone(), constants.clone());
            let k2 = k.clone();
            let left = Promise::delayed(move |engine: &mut Engine| {
                exec_body(engine, &a, &slots1, &constants1, k2, barrier)
            });
            let right = Promise::delayed(move |engine: &mut Engine| {
                exec_body(engine, &b, &slots2, &constants2, k, barrier)
            });
            Promise::Choice(vec![left, right], Some(barrier))
        }
        Body::IfThenElse(c, t, e) => {
            let local_barrier = engine.fresh_barrier();
            let cond = exec_body(
                engine,
                c,
                slots,
                constants,
                Rc::new(|_: &mut Engine| Promise::success()),
                local_barrier,
            );
            match crate::promise::force_once(engine, cond) {
                crate::promise::Outcome::True => exec_body(engine, t, slots, constants, k, barrier),
                crate::promise::Outcome::False => exec_body(engine, e, slots, constants, k, barrier),
                crate::promise::Outcome::Error(e) => Promise::error(e),
            }
        }
    }
}
