//! Arithmetic evaluation and comparison (spec.md §4.H): `is/2`, `=:=/2`,
//! `=\=/2`, `</2`, `>/2`, `=</2`, `>=/2`, over the standard function set.
//!
//! Grounded on the teacher's `evaluate_expression` dispatch in
//! `machine/arithmetic.rs` (a match over functor name/arity producing an
//! `f64`); widened to a two-case `Num` so integer results stay exact and
//! overflow is reported rather than silently wrapping into a float.

use crate::database::Database;
use crate::engine::Engine;
use crate::error::PrologError;
use crate::promise::{Cont, Promise};
use crate::term::Term;
use crate::unify::unify;

pub fn install(db: &mut Database) {
    db.install_builtin("is", 2, is);
    db.install_builtin("=:=", 2, arith_eq);
    db.install_builtin("=\\=", 2, arith_neq);
    db.install_builtin("<", 2, arith_lt);
    db.install_builtin(">", 2, arith_gt);
    db.install_builtin("=<", 2, arith_leq);
    db.install_builtin(">=", 2, arith_geq);
    db.install_builtin("succ", 2, succ);
    db.install_builtin("plus", 3, plus);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }

    fn to_term(self) -> Term {
        match self {
            Num::Int(n) => Term::int(n),
            Num::Float(f) => Term::float(f),
        }
    }
}

fn overflow() -> PrologError {
    PrologError::EvaluationError {
        kind: "int_overflow",
    }
}

fn zero_divisor() -> PrologError {
    PrologError::EvaluationError {
        kind: "zero_divisor",
    }
}

/// Evaluates `term` as an arithmetic expression (spec.md §4.H `is/2`
/// contract): atoms/numbers are self-evaluating constants or the handful of
/// named constants (`pi`, `e`), everything else must be a recognized
/// function symbol.
pub fn eval(engine: &Engine, term: &Term) -> Result<Num, PrologError> {
    match engine.env.resolve(term) {
        Term::Int(n) => Ok(Num::Int(n)),
        Term::Float(f) => Ok(Num::Float(f)),
        Term::Var(_) => Err(PrologError::instantiation()),
        Term::Atom(a) => match &*a {
            "pi" => Ok(Num::Float(std::f64::consts::PI)),
            "e" => Ok(Num::Float(std::f64::consts::E)),
            "inf" | "infinite" => Ok(Num::Float(f64::INFINITY)),
            "nan" => Ok(Num::Float(f64::NAN)),
            "epsilon" => Ok(Num::Float(f64::EPSILON)),
            "max_tagged_integer" => Ok(Num::Int(i64::MAX)),
            "min_tagged_integer" => Ok(Num::Int(i64::MIN)),
            _ => Err(PrologError::type_error("evaluable", Term::compound("/", vec![Term::atom(a.clone()), Term::int(0)]))),
        },
        Term::Compound(f, args) if args.len() == 1 => eval_unary(engine, &f, &args[0]),
        Term::Compound(f, args) if args.len() == 2 => eval_binary(engine, &f, &args[0], &args[1]),
        other @ Term::Compound(..) => {
            let (name, arity) = other.indicator().unwrap();
            Err(PrologError::type_error(
                "evaluable",
                Term::compound("/", vec![Term::atom(name), Term::int(arity as i64)]),
            ))
        }
    }
}

fn as_int(n: Num) -> Result<i64, PrologError> {
    match n {
        Num::Int(i) => Ok(i),
        Num::Float(f) => Err(PrologError::type_error("integer", Term::float(f))),
    }
}

fn eval_unary(engine: &Engine, f: &str, a: &Term) -> Result<Num, PrologError> {
    let x = eval(engine, a)?;
    Ok(match f {
        "-" => match x {
            Num::Int(n) => Num::Int(n.checked_neg().ok_or_else(overflow)?),
            Num::Float(n) => Num::Float(-n),
        },
        "+" => x,
        "abs" => match x {
            Num::Int(n) => Num::Int(n.checked_abs().ok_or_else(overflow)?),
            Num::Float(n) => Num::Float(n.abs()),
        },
        "sign" => match x {
            Num::Int(n) => Num::Int(n.signum()),
            Num::Float(n) => Num::Float(if n > 0.0 { 1.0 } else if n < 0.0 { -1.0 } else { 0.0 }),
        },
        "sqrt" => Num::Float(x.as_f64().sqrt()),
        "sin" => Num::Float(x.as_f64().sin()),
        "cos" => Num::Float(x.as_f64().cos()),
        "tan" => Num::Float(x.as_f64().tan()),
        "asin" => Num::Float(x.as_f64().asin()),
        "acos" => Num::Float(x.as_f64().acos()),
        "atan" => Num::Float(x.as_f64().atan()),
        "exp" => Num::Float(x.as_f64().exp()),
        "log" => Num::Float(x.as_f64().ln()),
        "float" => Num::Float(x.as_f64()),
        "integer" => Num::Int(x.as_f64().round() as i64),
        "floor" => Num::Int(x.as_f64().floor() as i64),
        "ceiling" => Num::Int(x.as_f64().ceil() as i64),
        "round" => Num::Int(x.as_f64().round() as i64),
        "truncate" => Num::Int(x.as_f64().trunc() as i64),
        "float_integer_part" => Num::Float(x.as_f64().trunc()),
        "float_fractional_part" => Num::Float(x.as_f64().fract()),
        "\\" => Num::Int(!as_int(x)?),
        "msb" => {
            let n = as_int(x)?;
            if n <= 0 {
                return Err(PrologError::evaluation_error("undefined"));
            }
            Num::Int(63 - n.leading_zeros() as i64)
        }
        "succ" => Num::Int(as_int(x)?.checked_add(1).ok_or_else(overflow)?),
        _ => {
            return Err(PrologError::type_error(
                "evaluable",
                Term::compound("/", vec![Term::atom(f), Term::int(1)]),
            ))
        }
    })
}

fn eval_binary(engine: &Engine, f: &str, a: &Term, b: &Term) -> Result<Num, PrologError> {
    let x = eval(engine, a)?;
    let y = eval(engine, b)?;
    Ok(match f {
        "+" => numeric_binop(x, y, i64::checked_add, |a, b| a + b)?,
        "-" => numeric_binop(x, y, i64::checked_sub, |a, b| a - b)?,
        "*" => numeric_binop(x, y, i64::checked_mul, |a, b| a * b)?,
        "/" => match (x, y) {
            (Num::Int(_), Num::Int(0)) => return Err(zero_divisor()),
            (Num::Int(a), Num::Int(b)) if a % b == 0 => Num::Int(a.checked_div(b).ok_or_else(overflow)?),
            _ => Num::Float(x.as_f64() / y.as_f64()),
        },
        "//" => {
            let (a, b) = (as_int(x)?, as_int(y)?);
            if b == 0 {
                return Err(zero_divisor());
            }
            Num::Int(a.checked_div(b).ok_or_else(overflow)?)
        }
        "div" => {
            let (a, b) = (as_int(x)?, as_int(y)?);
            if b == 0 {
                return Err(zero_divisor());
            }
            Num::Int(a.div_euclid(b))
        }
        "mod" => {
            let (a, b) = (as_int(x)?, as_int(y)?);
            if b == 0 {
                return Err(zero_divisor());
            }
            let r = a % b;
            Num::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        }
        "rem" => {
            let (a, b) = (as_int(x)?, as_int(y)?);
            if b == 0 {
                return Err(zero_divisor());
            }
            Num::Int(a % b)
        }
        "min" => if x.as_f64() <= y.as_f64() { x } else { y },
        "max" => if x.as_f64() >= y.as_f64() { x } else { y },
        "**" => Num::Float(x.as_f64().powf(y.as_f64())),
        "^" => match (x, y) {
            (Num::Int(a), Num::Int(b)) if b >= 0 => {
                Num::Int(a.checked_pow(b as u32).ok_or_else(overflow)?)
            }
            _ => Num::Float(x.as_f64().powf(y.as_f64())),
        },
        "atan2" | "atan" => Num::Float(x.as_f64().atan2(y.as_f64())),
        "gcd" => Num::Int(gcd(as_int(x)?, as_int(y)?)),
        "/\\" => Num::Int(as_int(x)? & as_int(y)?),
        "\\/" => Num::Int(as_int(x)? | as_int(y)?),
        "xor" => Num::Int(as_int(x)? ^ as_int(y)?),
        "<<" => Num::Int(as_int(x)?.checked_shl(as_int(y)? as u32).ok_or_else(overflow)?),
        ">>" => Num::Int(as_int(x)?.checked_shr(as_int(y)? as u32).ok_or_else(overflow)?),
        _ => {
            return Err(PrologError::type_error(
                "evaluable",
                Term::compound("/", vec![Term::atom(f), Term::int(2)]),
            ))
        }
    })
}

fn numeric_binop(
    x: Num,
    y: Num,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Num, PrologError> {
    match (x, y) {
        (Num::Int(a), Num::Int(b)) => Ok(Num::Int(int_op(a, b).ok_or_else(overflow)?)),
        _ => Ok(Num::Float(float_op(x.as_f64(), y.as_f64()))),
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn is(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let value = match eval(engine, &args[1]) {
        Ok(v) => v.to_term(),
        Err(e) => return Promise::error(e),
    };
    if unify(&mut engine.env, &args[0], &value, false) {
        k(engine)
    } else {
        Promise::failure()
    }
}

fn compare_with(engine: &mut Engine, args: &[Term], k: Cont, ok: impl Fn(f64, f64) -> bool) -> Promise {
    let x = match eval(engine, &args[0]) {
        Ok(v) => v,
        Err(e) => return Promise::error(e),
    };
    let y = match eval(engine, &args[1]) {
        Ok(v) => v,
        Err(e) => return Promise::error(e),
    };
    if ok(x.as_f64(), y.as_f64()) {
        k(engine)
    } else {
        Promise::failure()
    }
}

fn arith_eq(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    compare_with(engine, args, k, |a, b| a == b)
}

fn arith_neq(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    compare_with(engine, args, k, |a, b| a != b)
}

fn arith_lt(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    compare_with(engine, args, k, |a, b| a < b)
}

fn arith_gt(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    compare_with(engine, args, k, |a, b| a > b)
}

fn arith_leq(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    compare_with(engine, args, k, |a, b| a <= b)
}

fn arith_geq(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    compare_with(engine, args, k, |a, b| a >= b)
}

/// `succ(X, Y)`: `Y is X+1` with either argument as the input (spec.md's
/// small integer-relation built-ins, kept next to `is/2` rather than under
/// atom/number conversions).
fn succ(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let x = engine.env.resolve(&args[0]);
    let y = engine.env.resolve(&args[1]);
    match (x, y) {
        (Term::Int(n), _) => {
            if n < 0 {
                return Promise::error(PrologError::type_error("not_less_than_zero", Term::int(n)));
            }
            let succ = match n.checked_add(1) {
                Some(v) => v,
                None => return Promise::error(overflow()),
            };
            if unify(&mut engine.env, &args[1], &Term::int(succ), false) {
                k(engine)
            } else {
                Promise::failure()
            }
        }
        (Term::Var(_), Term::Int(n)) => {
            if n <= 0 {
                return Promise::failure();
            }
            if unify(&mut engine.env, &args[0], &Term::int(n - 1), false) {
                k(engine)
            } else {
                Promise::failure()
            }
        }
        (Term::Var(_), Term::Var(_)) => Promise::error(PrologError::instantiation()),
        (other, _) => Promise::error(PrologError::type_error("integer", other)),
    }
}

fn plus(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let a = engine.env.resolve(&args[0]);
    let b = engine.env.resolve(&args[1]);
    let c = engine.env.resolve(&args[2]);
    let result = match (&a, &b, &c) {
        (Term::Int(x), Term::Int(y), _) => unify(&mut engine.env, &args[2], &Term::int(x + y), false),
        (Term::Int(x), _, Term::Int(z)) => unify(&mut engine.env, &args[1], &Term::int(z - x), false),
        (_, Term::Int(y), Term::Int(z)) => unify(&mut engine.env, &args[0], &Term::int(z - y), false),
        _ => return Promise::error(PrologError::instantiation()),
    };
    if result {
        k(engine)
    } else {
        Promise::failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::fresh_var_id;
    use crate::promise::Outcome;

    fn test_engine() -> Engine {
        Engine::with_builtins()
    }

    #[test]
    fn is_evaluates_arithmetic_expression() {
        let mut engine = test_engine();
        let v = fresh_var_id();
        let goal = Term::compound(
            "is",
            vec![
                Term::var(v),
                Term::compound("+", vec![Term::int(1), Term::compound("*", vec![Term::int(2), Term::int(3)])]),
            ],
        );
        assert!(matches!(engine.solve_once(&goal), Outcome::True));
        assert_eq!(engine.env.resolve(&Term::var(v)), Term::int(7));
    }

    #[test]
    fn division_promotes_to_float_on_remainder() {
        let mut engine = test_engine();
        let v = fresh_var_id();
        let goal = Term::compound("is", vec![Term::var(v), Term::compound("/", vec![Term::int(7), Term::int(2)])]);
        assert!(matches!(engine.solve_once(&goal), Outcome::True));
        assert_eq!(engine.env.resolve(&Term::var(v)), Term::float(3.5));
    }

    #[test]
    fn integer_overflow_is_an_evaluation_error() {
        let mut engine = test_engine();
        let v = fresh_var_id();
        let goal = Term::compound(
            "is",
            vec![Term::var(v), Term::compound("+", vec![Term::int(i64::MAX), Term::int(1)])],
        );
        assert!(matches!(engine.solve_once(&goal), Outcome::Error(PrologError::EvaluationError { kind: "int_overflow" })));
    }

    #[test]
    fn comparisons_order_correctly() {
        let mut engine = test_engine();
        assert!(matches!(
            engine.solve_once(&Term::compound("<", vec![Term::int(1), Term::int(2)])),
            Outcome::True
        ));
        assert!(matches!(
            engine.solve_once(&Term::compound(">=", vec![Term::int(1), Term::int(2)])),
            Outcome::False
        ));
    }

    #[test]
    fn division_by_zero_is_zero_divisor_error() {
        let mut engine = test_engine();
        let v = fresh_var_id();
        let goal = Term::compound("is", vec![Term::var(v), Term::compound("//", vec![Term::int(1), Term::int(0)])]);
        assert!(matches!(
            engine.solve_once(&goal),
            Outcome::Error(PrologError::EvaluationError { kind: "zero_divisor" })
        ));
    }
}
