//! Atom/number/char conversion built-ins (spec.md §4.H): `atom_length/2`,
//! `atom_concat/3`, `sub_atom/5`, `atom_chars/2`, `atom_codes/2`,
//! `number_chars/2`, `number_codes/2`, `char_code/2`.
//!
//! Grounded on the teacher's flat-function-per-builtin registration shape
//! (`machine/core.rs::new()`); these have no direct teacher counterpart
//! (the teacher's term language has no atom/string sublanguage) so the
//! bodies are written fresh, matching the unify-then-continue shape every
//! other built-in here uses.

use std::rc::Rc;

use crate::database::Database;
use crate::engine::Engine;
use crate::error::PrologError;
use crate::promise::{Cont, Promise};
use crate::term::Term;
use crate::unify::unify;

pub fn install(db: &mut Database) {
    db.install_builtin("atom_length", 2, atom_length);
    db.install_builtin("atom_concat", 3, atom_concat);
    db.install_builtin("sub_atom", 5, sub_atom);
    db.install_builtin("atom_chars", 2, atom_chars);
    db.install_builtin("atom_codes", 2, atom_codes);
    db.install_builtin("number_chars", 2, number_chars);
    db.install_builtin("number_codes", 2, number_codes);
    db.install_builtin("char_code", 2, char_code);
    db.install_builtin("upcase_atom", 2, upcase_atom);
    db.install_builtin("downcase_atom", 2, downcase_atom);
}

/// Renders an atomic term (atom or number) the way `atom_length`/
/// `atom_concat`/etc. treat their "atomic" arguments: an atom's own text, or
/// a number's canonical decimal rendering.
fn atomic_text(t: &Term) -> Option<String> {
    match t {
        Term::Atom(a) => Some(a.to_string()),
        Term::Int(n) => Some(n.to_string()),
        Term::Float(f) => Some(format!("{}", f)),
        _ => None,
    }
}

fn atom_length(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let a = engine.env.resolve(&args[0]);
    if a.is_var() {
        return Promise::error(PrologError::instantiation());
    }
    let text = match atomic_text(&a) {
        Some(s) => s,
        None => return Promise::error(PrologError::type_error("atomic", a)),
    };
    let len = Term::int(text.chars().count() as i64);
    match engine.env.resolve(&args[1]) {
        Term::Var(_) => {
            if unify(&mut engine.env, &args[1], &len, false) {
                k(engine)
            } else {
                Promise::failure()
            }
        }
        Term::Int(n) if n >= 0 => {
            if unify(&mut engine.env, &args[1], &len, false) {
                k(engine)
            } else {
                Promise::failure()
            }
        }
        other => Promise::error(PrologError::type_error("not_less_than_zero", other)),
    }
}

/// `atom_concat(Atom1, Atom2, Atom3)`: when `Atom1`/`Atom2` are instantiated,
/// a direct concatenation; when only `Atom3` is, enumerates every split of
/// its text as a choice point (spec.md §9's general-ISO-enumeration
/// preference, same call as `arg/3`'s variable-N case).
fn atom_concat(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let a1 = engine.env.resolve(&args[0]);
    let a2 = engine.env.resolve(&args[1]);
    if let (Some(s1), Some(s2)) = (atomic_text(&a1), atomic_text(&a2)) {
        let whole = Term::atom(format!("{}{}", s1, s2));
        return if unify(&mut engine.env, &args[2], &whole, false) {
            k(engine)
        } else {
            Promise::failure()
        };
    }
    let a3 = engine.env.resolve(&args[2]);
    let text = match atomic_text(&a3) {
        Some(s) => s,
        None if a3.is_var() => return Promise::error(PrologError::instantiation()),
        None => return Promise::error(PrologError::type_error("atomic", a3)),
    };
    let chars: Vec<char> = text.chars().collect();
    let a1_pat = args[0].clone();
    let a2_pat = args[1].clone();
    let alts: Vec<Promise> = (0..=chars.len())
        .map(|i| {
            let left: String = chars[..i].iter().collect();
            let right: String = chars[i..].iter().collect();
            let a1_pat = a1_pat.clone();
            let a2_pat = a2_pat.clone();
            let k = k.clone();
            Promise::delayed(move |engine: &mut Engine| {
                let cp = engine.env.checkpoint();
                let ok = unify(&mut engine.env, &a1_pat, &Term::atom(left), false)
                    && unify(&mut engine.env, &a2_pat, &Term::atom(right), false);
                if ok {
                    k(engine)
                } else {
                    engine.env.restore(cp);
                    Promise::failure()
                }
            })
        })
        .collect();
    Promise::Choice(alts, None)
}

/// `sub_atom(Atom, Before, Length, After, SubAtom)`: full ISO enumeration of
/// every `(Before, Length, After)` decomposition of `Atom`'s text, unifying
/// each against whichever of the four output arguments are already bound
/// (spec.md §9 open-question precedent: prefer complete enumeration once
/// `Promise::Choice` makes it cheap to express).
fn sub_atom(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let whole = engine.env.resolve(&args[0]);
    let text = match atomic_text(&whole) {
        Some(s) => s,
        None if whole.is_var() => return Promise::error(PrologError::instantiation()),
        None => return Promise::error(PrologError::type_error("atomic", whole)),
    };
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();

    let before_pat = args[1].clone();
    let length_pat = args[2].clone();
    let after_pat = args[3].clone();
    let sub_pat = args[4].clone();

    let mut alts = Vec::new();
    for before in 0..=n {
        for length in 0..=(n - before) {
            let after = n - before - length;
            let sub: String = chars[before..before + length].iter().collect();
            let before_pat = before_pat.clone();
            let length_pat = length_pat.clone();
            let after_pat = after_pat.clone();
            let sub_pat = sub_pat.clone();
            let k = k.clone();
            alts.push(Promise::delayed(move |engine: &mut Engine| {
                let cp = engine.env.checkpoint();
                let ok = unify(&mut engine.env, &before_pat, &Term::int(before as i64), false)
                    && unify(&mut engine.env, &length_pat, &Term::int(length as i64), false)
                    && unify(&mut engine.env, &after_pat, &Term::int(after as i64), false)
                    && unify(&mut engine.env, &sub_pat, &Term::atom(sub.clone()), false);
                if ok {
                    k(engine)
                } else {
                    engine.env.restore(cp);
                    Promise::failure()
                }
            }));
        }
    }
    Promise::Choice(alts, None)
}

fn atom_chars(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let a = engine.env.resolve(&args[0]);
    if !a.is_var() {
        let text = match atomic_text(&a) {
            Some(s) => s,
            None => return Promise::error(PrologError::type_error("atomic", a)),
        };
        let list = Term::list(text.chars().map(|c| Term::atom(c.to_string())).collect());
        return if unify(&mut engine.env, &args[1], &list, false) {
            k(engine)
        } else {
            Promise::failure()
        };
    }
    let items = match engine.env.collect_list(&args[1]) {
        Ok(items) => items,
        Err(e) => return Promise::error(e),
    };
    let mut text = String::new();
    for item in items {
        match engine.env.resolve(&item) {
            Term::Atom(c) if c.chars().count() == 1 => text.push(c.chars().next().unwrap()),
            Term::Var(_) => return Promise::error(PrologError::instantiation()),
            other => return Promise::error(PrologError::type_error("character", other)),
        }
    }
    if unify(&mut engine.env, &args[0], &Term::atom(text), false) {
        k(engine)
    } else {
        Promise::failure()
    }
}

fn atom_codes(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let a = engine.env.resolve(&args[0]);
    if !a.is_var() {
        let text = match atomic_text(&a) {
            Some(s) => s,
            None => return Promise::error(PrologError::type_error("atomic", a)),
        };
        let list = Term::list(text.chars().map(|c| Term::int(c as i64)).collect());
        return if unify(&mut engine.env, &args[1], &list, false) {
            k(engine)
        } else {
            Promise::failure()
        };
    }
    let items = match engine.env.collect_list(&args[1]) {
        Ok(items) => items,
        Err(e) => return Promise::error(e),
    };
    let mut text = String::new();
    for item in items {
        match engine.env.resolve(&item) {
            Term::Int(c) if c >= 0 => match char::from_u32(c as u32) {
                Some(ch) => text.push(ch),
                None => {
                    return Promise::error(PrologError::RepresentationError {
                        kind: "character_code",
                    })
                }
            },
            Term::Var(_) => return Promise::error(PrologError::instantiation()),
            other => return Promise::error(PrologError::type_error("character_code", other)),
        }
    }
    if unify(&mut engine.env, &args[0], &Term::atom(text), false) {
        k(engine)
    } else {
        Promise::failure()
    }
}

fn parse_number(text: &str) -> Result<Term, PrologError> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Term::int(n));
    }
    if let Ok(f) = text.parse::<f64>() {
        return Ok(Term::float(f));
    }
    Err(PrologError::SyntaxError {
        detail: format!("illegal_number: {}", text),
    })
}

fn number_chars(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let n = engine.env.resolve(&args[0]);
    if !n.is_var() {
        let text = match atomic_text(&n) {
            Some(s) if n.is_number() => s,
            _ => return Promise::error(PrologError::type_error("number", n)),
        };
        let list = Term::list(text.chars().map(|c| Term::atom(c.to_string())).collect());
        return if unify(&mut engine.env, &args[1], &list, false) {
            k(engine)
        } else {
            Promise::failure()
        };
    }
    let items = match engine.env.collect_list(&args[1]) {
        Ok(items) => items,
        Err(e) => return Promise::error(e),
    };
    let mut text = String::new();
    for item in items {
        match engine.env.resolve(&item) {
            Term::Atom(c) if c.chars().count() == 1 => text.push(c.chars().next().unwrap()),
            other => return Promise::error(PrologError::type_error("character", other)),
        }
    }
    match parse_number(&text) {
        Ok(num) => {
            if unify(&mut engine.env, &args[0], &num, false) {
                k(engine)
            } else {
                Promise::failure()
            }
        }
        Err(e) => Promise::error(e),
    }
}

fn number_codes(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let n = engine.env.resolve(&args[0]);
    if !n.is_var() {
        let text = match atomic_text(&n) {
            Some(s) if n.is_number() => s,
            _ => return Promise::error(PrologError::type_error("number", n)),
        };
        let list = Term::list(text.chars().map(|c| Term::int(c as i64)).collect());
        return if unify(&mut engine.env, &args[1], &list, false) {
            k(engine)
        } else {
            Promise::failure()
        };
    }
    let items = match engine.env.collect_list(&args[1]) {
        Ok(items) => items,
        Err(e) => return Promise::error(e),
    };
    let mut text = String::new();
    for item in items {
        match engine.env.resolve(&item) {
            Term::Int(c) if c >= 0 => match char::from_u32(c as u32) {
                Some(ch) => text.push(ch),
                None => {
                    return Promise::error(PrologError::RepresentationError {
                        kind: "character_code",
                    })
                }
            },
            other => return Promise::error(PrologError::type_error("character_code", other)),
        }
    }
    match parse_number(&text) {
        Ok(num) => {
            if unify(&mut engine.env, &args[0], &num, false) {
                k(engine)
            } else {
                Promise::failure()
            }
        }
        Err(e) => Promise::error(e),
    }
}

fn char_code(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let ch = engine.env.resolve(&args[0]);
    match ch {
        Term::Atom(a) if a.chars().count() == 1 => {
            let code = Term::int(a.chars().next().unwrap() as i64);
            if unify(&mut engine.env, &args[1], &code, false) {
                k(engine)
            } else {
                Promise::failure()
            }
        }
        Term::Var(_) => match engine.env.resolve(&args[1]) {
            Term::Int(n) if n >= 0 => match char::from_u32(n as u32) {
                Some(c) => {
                    if unify(&mut engine.env, &args[0], &Term::atom(c.to_string()), false) {
                        k(engine)
                    } else {
                        Promise::failure()
                    }
                }
                None => Promise::error(PrologError::RepresentationError {
                    kind: "character_code",
                }),
            },
            Term::Var(_) => Promise::error(PrologError::instantiation()),
            other => Promise::error(PrologError::type_error("integer", other)),
        },
        other => Promise::error(PrologError::type_error("character", other)),
    }
}

fn upcase_atom(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let a = engine.env.resolve(&args[0]);
    let text = match atomic_text(&a) {
        Some(s) => s,
        None if a.is_var() => return Promise::error(PrologError::instantiation()),
        None => return Promise::error(PrologError::type_error("atomic", a)),
    };
    if unify(&mut engine.env, &args[1], &Term::atom(text.to_uppercase()), false) {
        k(engine)
    } else {
        Promise::failure()
    }
}

fn downcase_atom(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let a = engine.env.resolve(&args[0]);
    let text = match atomic_text(&a) {
        Some(s) => s,
        None if a.is_var() => return Promise::error(PrologError::instantiation()),
        None => return Promise::error(PrologError::type_error("atomic", a)),
    };
    if unify(&mut engine.env, &args[1], &Term::atom(text.to_lowercase()), false) {
        k(engine)
    } else {
        Promise::failure()
    }
}
