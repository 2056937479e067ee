//! The clause compiler (spec.md §4.D, component D): turns `Head :- Body`
//! into a constant table plus instruction streams that `vm.rs` executes.
//!
//! Grounded on the teacher's `Machine::register_predicate` / constant-table
//! pattern in `machine/core.rs`; the instructions themselves are the spec's
//! compact stack-based set rather than the teacher's register file (see
//! DESIGN.md).

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::PrologError;
use crate::instruction::Instruction;
use crate::term::{Term, VarId};

/// A clause compiled to bytecode: a constant table, the number of distinct
/// variables the clause mentions (the VM allocates this many fresh `VarId`s
/// per activation -- "rename apart", spec.md §4.E), the head's
/// argument-construction stream ending in `Enter`, and the body as a tree of
/// control-construct nodes whose leaves are argument-construction streams
/// ending in `Call`.
pub struct CompiledClause {
    pub constants: Vec<Term>,
    pub num_vars: usize,
    pub head: Vec<Instruction>,
    pub body: Rc<Body>,
}

/// `,/2`, `;/2`, `->/2` and `!` are compiled specially rather than emitted as
/// `Call` instructions (spec.md §4.D step 2); everything else becomes a
/// `Body::Goal` leaf.
pub enum Body {
    True,
    Fail,
    Cut,
    Goal(Vec<Instruction>),
    Conjunction(Rc<Body>, Rc<Body>),
    Disjunction(Rc<Body>, Rc<Body>),
    IfThenElse(Rc<Body>, Rc<Body>, Rc<Body>),
}

struct Ctx {
    constants: Vec<Term>,
    var_slots: HashMap<VarId, usize>,
    next_slot: usize,
}

impl Ctx {
    fn slot_for(&mut self, v: VarId) -> usize {
        *self.var_slots.entry(v).or_insert_with(|| {
            let s = self.next_slot;
            self.next_slot += 1;
            s
        })
    }

    fn const_index(&mut self, t: Term) -> usize {
        let k = self.constants.len();
        self.constants.push(t);
        k
    }
}

fn is_ground(t: &Term) -> bool {
    match t {
        Term::Var(_) => false,
        Term::Compound(_, args) => args.iter().all(is_ground),
        _ => true,
    }
}

/// Emits the instructions that build `term`'s value onto the argument
/// stack, post-order (args before the `Functor` that combines them), exactly
/// as spec.md §4.D describes for `Const`/`Var`/`Functor`.
fn compile_term_into(term: &Term, ctx: &mut Ctx, out: &mut Vec<Instruction>) {
    if is_ground(term) {
        let k = ctx.const_index(term.clone());
        out.push(Instruction::Const(k));
        return;
    }
    match term {
        Term::Var(v) => out.push(Instruction::Var(ctx.slot_for(*v))),
        Term::Compound(f, args) => {
            for a in args {
                compile_term_into(a, ctx, out);
            }
            out.push(Instruction::Functor(f.clone(), args.len()));
        }
        // Atom/Int/Float are always ground and handled above.
        _ => unreachable!("ground atomic terms are handled by the is_ground branch"),
    }
}

/// Compiles one goal (a textually-fixed body conjunct) into an
/// argument-construction stream ending in `Call name/arity`.
fn compile_goal(name: Rc<str>, args: &[Term], ctx: &mut Ctx) -> Body {
    let mut instrs = Vec::new();
    for a in args {
        compile_term_into(a, ctx, &mut instrs);
    }
    instrs.push(Instruction::Call(name, args.len()));
    Body::Goal(instrs)
}

fn compile_body(term: &Term, ctx: &mut Ctx) -> Result<Body, PrologError> {
    match term {
        Term::Atom(a) if &**a == "true" => Ok(Body::True),
        Term::Atom(a) if &**a == "fail" || &**a == "false" => Ok(Body::Fail),
        Term::Atom(a) if &**a == "!" => Ok(Body::Cut),
        Term::Atom(a) => Ok(compile_goal(a.clone(), &[], ctx)),
        Term::Compound(f, args) if &**f == "," && args.len() == 2 => Ok(Body::Conjunction(
            Rc::new(compile_body(&args[0], ctx)?),
            Rc::new(compile_body(&args[1], ctx)?),
        )),
        Term::Compound(f, args) if &**f == ";" && args.len() == 2 => {
            if let Term::Compound(g, ite_args) = &args[0] {
                if &**g == "->" && ite_args.len() == 2 {
                    return Ok(Body::IfThenElse(
                        Rc::new(compile_body(&ite_args[0], ctx)?),
                        Rc::new(compile_body(&ite_args[1], ctx)?),
                        Rc::new(compile_body(&args[1], ctx)?),
                    ));
                }
            }
            Ok(Body::Disjunction(
                Rc::new(compile_body(&args[0], ctx)?),
                Rc::new(compile_body(&args[1], ctx)?),
            ))
        }
        Term::Compound(f, args) if &**f == "->" && args.len() == 2 => Ok(Body::IfThenElse(
            Rc::new(compile_body(&args[0], ctx)?),
            Rc::new(compile_body(&args[1], ctx)?),
            Rc::new(Body::Fail),
        )),
        Term::Compound(f, args) => Ok(compile_goal(f.clone(), args, ctx)),
        // A bare variable body conjunct is a meta-call (`foo(G) :- G.` means
        // the same as `foo(G) :- call(G).`); rewritten to a `call/1` goal so
        // the existing dynamic-dispatch/cut-opacity machinery handles it.
        Term::Var(_) => Ok(compile_goal(Rc::from("call"), std::slice::from_ref(term), ctx)),
        Term::Int(_) | Term::Float(_) => Err(PrologError::type_error("callable", term.clone())),
    }
}

/// Compiles `Head :- Body` (a fact compiles with `body = Term::atom("true")`).
pub fn compile_clause(head: &Term, body: &Term) -> Result<CompiledClause, PrologError> {
    if !head.is_callable() {
        return Err(PrologError::type_error("callable", head.clone()));
    }
    let mut ctx = Ctx {
        constants: Vec::new(),
        var_slots: HashMap::new(),
        next_slot: 0,
    };
    let mut head_instrs = Vec::new();
    for a in head.args() {
        compile_term_into(a, &mut ctx, &mut head_instrs);
    }
    head_instrs.push(Instruction::Enter);
    let body = Rc::new(compile_body(body, &mut ctx)?);
    Ok(CompiledClause {
        constants: ctx.constants,
        num_vars: ctx.next_slot,
        head: head_instrs,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_with_no_args_compiles_to_bare_enter() {
        let c = compile_clause(&Term::atom("p"), &Term::atom("true")).unwrap();
        assert!(matches!(c.head.as_slice(), [Instruction::Enter]));
        assert!(matches!(c.body, Body::True));
        assert_eq!(c.num_vars, 0);
    }

    #[test]
    fn shared_variable_gets_same_slot_in_head_and_body() {
        // append([H|T], L, [H|R]) :- append(T, L, R).
        let h = 0;
        let t = 1;
        let l = 2;
        let r = 3;
        let head = Term::compound(
            "append",
            vec![
                Term::cons(Term::var(h), Term::var(t)),
                Term::var(l),
                Term::cons(Term::var(h), Term::var(r)),
            ],
        );
        let body = Term::compound("append", vec![Term::var(t), Term::var(l), Term::var(r)]);
        let c = compile_clause(&head, &body).unwrap();
        assert_eq!(c.num_vars, 4);
        match &c.body {
            Body::Goal(instrs) => {
                assert!(matches!(instrs.last(), Some(Instruction::Call(name, 3)) if &**name == "append"));
            }
            _ => panic!("expected a Goal body"),
        }
    }

    #[test]
    fn ground_argument_becomes_a_single_const() {
        let c = compile_clause(&Term::compound("p", vec![Term::int(1)]), &Term::atom("true")).unwrap();
        assert_eq!(c.constants, vec![Term::int(1)]);
        assert!(matches!(c.head.as_slice(), [Instruction::Const(0), Instruction::Enter]));
    }

    #[test]
    fn if_then_else_detects_arrow_shape() {
        let body = Term::compound(
            ";",
            vec![
                Term::compound("->", vec![Term::atom("c"), Term::atom("t")]),
                Term::atom("e"),
            ],
        );
        let c = compile_clause(&Term::atom("p"), &body).unwrap();
        assert!(matches!(c.body, Body::IfThenElse(_, _, _)));
    }

    #[test]
    fn plain_disjunction_is_not_mistaken_for_if_then_else() {
        let body = Term::compound(";", vec![Term::atom("a"), Term::atom("b")]);
        let c = compile_clause(&Term::atom("p"), &body).unwrap();
        assert!(matches!(c.body, Body::Disjunction(_, _)));
    }
}
