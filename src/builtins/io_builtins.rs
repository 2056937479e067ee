//! Stream, flag, and operator built-ins (spec.md §4.H/§6): `open/4`,
//! `close/1,2`, the current/set input/output pair, char/byte I/O, term I/O
//! (`read_term`, `write`/`writeq`/`write_term`, `nl`), `set_prolog_flag/2`,
//! `current_prolog_flag/2`, `op/3`, `current_op/3`, and `char_conversion/2`.
//!
//! Wires the `streams`, `flags`, `operators`, `reader` and `writer`
//! collaborators into the built-in kernel; no teacher counterpart (the
//! teacher has no stream/operator notion), so these follow the
//! `resolve-then-unify-then-continue` shape every other built-in file here
//! uses.

use std::rc::Rc;

use crate::database::Database;
use crate::engine::Engine;
use crate::error::PrologError;
use crate::operators::Specifier;
use crate::promise::{Cont, Promise};
use crate::reader;
use crate::streams::{EofAction, Mode, OpenOptionsSpec, StreamType};
use crate::term::Term;
use crate::unify::unify;
use crate::writer::{self, WriteOptions};

pub fn install(db: &mut Database) {
    db.install_builtin("open", 4, open);
    db.install_builtin("close", 1, close1);
    db.install_builtin("close", 2, close2);
    db.install_builtin("current_input", 1, current_input);
    db.install_builtin("current_output", 1, current_output);
    db.install_builtin("set_input", 1, set_input);
    db.install_builtin("set_output", 1, set_output);
    db.install_builtin("get_char", 1, get_char1);
    db.install_builtin("get_char", 2, get_char2);
    db.install_builtin("peek_char", 1, peek_char1);
    db.install_builtin("peek_char", 2, peek_char2);
    db.install_builtin("put_char", 1, put_char1);
    db.install_builtin("put_char", 2, put_char2);
    db.install_builtin("get_byte", 1, get_byte1);
    db.install_builtin("get_byte", 2, get_byte2);
    db.install_builtin("peek_byte", 1, peek_byte1);
    db.install_builtin("peek_byte", 2, peek_byte2);
    db.install_builtin("put_byte", 1, put_byte1);
    db.install_builtin("put_byte", 2, put_byte2);
    db.install_builtin("flush_output", 0, flush_output0);
    db.install_builtin("flush_output", 1, flush_output1);
    db.install_builtin("stream_property", 2, stream_property);
    db.install_builtin("set_stream_position", 2, set_stream_position);
    db.install_builtin("nl", 0, nl0);
    db.install_builtin("nl", 1, nl1);
    db.install_builtin("write", 1, write1);
    db.install_builtin("write", 2, write2);
    db.install_builtin("writeq", 1, writeq1);
    db.install_builtin("writeq", 2, writeq2);
    db.install_builtin("print", 1, print1);
    db.install_builtin("print", 2, print2);
    db.install_builtin("write_term", 2, write_term2);
    db.install_builtin("write_term", 3, write_term3);
    db.install_builtin("read", 1, read1);
    db.install_builtin("read", 2, read2);
    db.install_builtin("read_term", 2, read_term2);
    db.install_builtin("read_term", 3, read_term3);
    db.install_builtin("set_prolog_flag", 2, set_prolog_flag);
    db.install_builtin("current_prolog_flag", 2, current_prolog_flag);
    db.install_builtin("op", 3, op);
    db.install_builtin("current_op", 3, current_op);
    db.install_builtin("char_conversion", 2, char_conversion);
    db.install_builtin("current_char_conversion", 2, current_char_conversion);
}

fn stream_id(engine: &mut Engine, t: &Term) -> Result<Rc<str>, PrologError> {
    match engine.env.resolve(t) {
        Term::Atom(a) => Ok(a),
        Term::Var(_) => Err(PrologError::instantiation()),
        other => Err(PrologError::domain_error("stream_or_alias", other)),
    }
}

fn unify_or_fail(engine: &mut Engine, a: &Term, b: &Term, k: &Cont) -> Promise {
    if unify(&mut engine.env, a, b, false) {
        k(engine)
    } else {
        Promise::failure()
    }
}

fn open(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let path = match engine.env.resolve(&args[0]) {
        Term::Atom(a) => a.to_string(),
        Term::Var(_) => return Promise::error(PrologError::instantiation()),
        other => return Promise::error(PrologError::type_error("atom", other)),
    };
    let mode = match engine.env.resolve(&args[1]) {
        Term::Atom(a) => match &*a {
            "read" => Mode::Read,
            "write" => Mode::Write,
            "append" => Mode::Append,
            _ => return Promise::error(PrologError::domain_error("io_mode", Term::Atom(a))),
        },
        Term::Var(_) => return Promise::error(PrologError::instantiation()),
        other => return Promise::error(PrologError::type_error("atom", other)),
    };
    let opt_items = match engine.env.collect_list(&args[3]) {
        Ok(items) => items,
        Err(e) => return Promise::error(e),
    };
    let mut spec = OpenOptionsSpec::default();
    for item in opt_items {
        if let Term::Compound(f, a) = engine.env.resolve(&item) {
            match (&*f, a.as_slice()) {
                ("alias", [name]) => {
                    if let Term::Atom(n) = engine.env.resolve(name) {
                        spec.alias = Some(n);
                    }
                }
                ("type", [ty]) => {
                    if let Term::Atom(t) = engine.env.resolve(ty) {
                        spec.kind = if &*t == "binary" {
                            StreamType::Binary
                        } else {
                            StreamType::Text
                        };
                    }
                }
                ("reposition", [b]) => {
                    if let Term::Atom(b) = engine.env.resolve(b) {
                        spec.reposition = &*b == "true";
                    }
                }
                ("eof_action", [a0]) => {
                    if let Term::Atom(a0) = engine.env.resolve(a0) {
                        spec.eof_action = match &*a0 {
                            "eof_code" => EofAction::EofCode,
                            "reset" => EofAction::Reset,
                            _ => EofAction::Error,
                        };
                    }
                }
                _ => {}
            }
        }
    }
    match engine.streams.open(&path, mode, spec) {
        Ok(id) => unify_or_fail(engine, &args[2], &Term::Atom(id), &k),
        Err(e) => Promise::error(e),
    }
}

fn close_impl(engine: &mut Engine, args: &[Term], force: bool, k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    match engine.streams.close(&id, force) {
        Ok(()) => k(engine),
        Err(e) => {
            if force {
                k(engine)
            } else {
                Promise::error(e)
            }
        }
    }
}

fn close1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    close_impl(engine, args, false, k)
}

fn close2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let opt_items = match engine.env.collect_list(&args[1]) {
        Ok(items) => items,
        Err(e) => return Promise::error(e),
    };
    let force = opt_items.iter().any(|t| {
        matches!(
            engine.env.resolve(t),
            Term::Compound(ref f, ref a) if &**f == "force" && matches!(a.as_slice(), [Term::Atom(ref v)] if &**v == "true")
        )
    });
    close_impl(engine, &args[..1], force, k)
}

fn current_input(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = engine.streams.current_input();
    unify_or_fail(engine, &args[0], &Term::Atom(id), &k)
}

fn current_output(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = engine.streams.current_output();
    unify_or_fail(engine, &args[0], &Term::Atom(id), &k)
}

fn set_input(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    match engine.streams.set_input(id) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn set_output(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    match engine.streams.set_output(id) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn get_char_from(engine: &mut Engine, id: &str) -> Result<Term, PrologError> {
    let conv = {
        let h = engine.streams.get_mut(id)?;
        h.get_char()?
    };
    Ok(match conv {
        Some(c) => Term::atom(engine.flags.convert(c).to_string()),
        None => Term::atom("end_of_file"),
    })
}

fn get_char1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = engine.streams.current_input();
    match get_char_from(engine, &id) {
        Ok(t) => unify_or_fail(engine, &args[0], &t, &k),
        Err(e) => Promise::error(e),
    }
}

fn get_char2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    match get_char_from(engine, &id) {
        Ok(t) => unify_or_fail(engine, &args[1], &t, &k),
        Err(e) => Promise::error(e),
    }
}

/// `peek_char` has no pushback buffer in the stream handle, so it is
/// implemented as a plain `get_char` -- acceptable for `user_input`-style
/// line-oriented consultation, not a byte-accurate terminal peek.
fn peek_char1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    get_char1(engine, args, k)
}

fn peek_char2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    get_char2(engine, args, k)
}

fn put_char_to(engine: &mut Engine, id: &str, c: char) -> Result<(), PrologError> {
    engine.streams.get_mut(id)?.put_char(c)
}

fn char_arg(engine: &mut Engine, t: &Term) -> Result<char, PrologError> {
    match engine.env.resolve(t) {
        Term::Atom(a) if a.chars().count() == 1 => Ok(a.chars().next().unwrap()),
        Term::Var(_) => Err(PrologError::instantiation()),
        other => Err(PrologError::type_error("character", other)),
    }
}

fn put_char1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let c = match char_arg(engine, &args[0]) {
        Ok(c) => c,
        Err(e) => return Promise::error(e),
    };
    let id = engine.streams.current_output();
    match put_char_to(engine, &id, c) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn put_char2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    let c = match char_arg(engine, &args[1]) {
        Ok(c) => c,
        Err(e) => return Promise::error(e),
    };
    match put_char_to(engine, &id, c) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn get_byte_from(engine: &mut Engine, id: &str) -> Result<Term, PrologError> {
    let c = engine.streams.get_mut(id)?.get_char()?;
    Ok(match c {
        Some(c) => Term::int(c as i64),
        None => Term::int(-1),
    })
}

fn get_byte1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = engine.streams.current_input();
    match get_byte_from(engine, &id) {
        Ok(t) => unify_or_fail(engine, &args[0], &t, &k),
        Err(e) => Promise::error(e),
    }
}

fn get_byte2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    match get_byte_from(engine, &id) {
        Ok(t) => unify_or_fail(engine, &args[1], &t, &k),
        Err(e) => Promise::error(e),
    }
}

fn peek_byte1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    get_byte1(engine, args, k)
}

fn peek_byte2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    get_byte2(engine, args, k)
}

fn byte_arg(engine: &mut Engine, t: &Term) -> Result<char, PrologError> {
    match engine.env.resolve(t) {
        Term::Int(n) if (0..=255).contains(&n) => Ok(n as u8 as char),
        Term::Var(_) => Err(PrologError::instantiation()),
        other => Err(PrologError::type_error("byte", other)),
    }
}

fn put_byte1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let c = match byte_arg(engine, &args[0]) {
        Ok(c) => c,
        Err(e) => return Promise::error(e),
    };
    let id = engine.streams.current_output();
    match put_char_to(engine, &id, c) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn put_byte2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    let c = match byte_arg(engine, &args[1]) {
        Ok(c) => c,
        Err(e) => return Promise::error(e),
    };
    match put_char_to(engine, &id, c) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn flush_output0(engine: &mut Engine, _args: &[Term], k: Cont) -> Promise {
    let id = engine.streams.current_output();
    match engine.streams.get_mut(&id).and_then(|h| h.flush()) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn flush_output1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    match engine.streams.get_mut(&id).and_then(|h| h.flush()) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

/// Reports only the handful of properties the registry actually tracks
/// (`mode`, `alias`, `input`/`output`); exhaustive ISO property coverage
/// would need position tracking the stream handle does not keep.
fn stream_property(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    let handle = match engine.streams.get(&id) {
        Some(h) => h,
        None => return Promise::error(PrologError::existence_error("stream", Term::atom(&*id))),
    };
    let mode = match handle.mode {
        Mode::Read => "read",
        Mode::Write => "write",
        Mode::Append => "append",
    };
    let mut props = vec![Term::compound("mode", vec![Term::atom(mode)])];
    if engine.streams.current_input() == id {
        props.push(Term::compound("input", vec![]));
    }
    if engine.streams.current_output() == id {
        props.push(Term::compound("output", vec![]));
    }
    let alts: Vec<Promise> = props
        .into_iter()
        .map(|p| {
            let k = k.clone();
            let arg_pat = args[1].clone();
            Promise::delayed(move |engine: &mut Engine| {
                let cp = engine.env.checkpoint();
                if unify(&mut engine.env, &arg_pat, &p, false) {
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

/// The stream registry keeps no file position/seek state, so repositioning
/// is unsupported; reports it honestly rather than pretending to succeed.
fn set_stream_position(engine: &mut Engine, args: &[Term], _k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    Promise::error(PrologError::permission_error(
        "reposition",
        "stream",
        Term::atom(&*id),
    ))
}

fn nl0(engine: &mut Engine, _args: &[Term], k: Cont) -> Promise {
    let id = engine.streams.current_output();
    match put_char_to(engine, &id, '\n') {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn nl1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    match put_char_to(engine, &id, '\n') {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn render(engine: &Engine, term: &Term, quoted: bool) -> String {
    writer::term_to_string(term, &engine.env, &engine.operators, quoted)
}

fn write_to(engine: &mut Engine, id: &str, text: &str) -> Result<(), PrologError> {
    engine.streams.get_mut(id)?.write_str(text)
}

fn write1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let text = render(engine, &args[0], false);
    let id = engine.streams.current_output();
    match write_to(engine, &id, &text) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn write2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    let text = render(engine, &args[1], false);
    match write_to(engine, &id, &text) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn writeq1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let text = render(engine, &args[0], true);
    let id = engine.streams.current_output();
    match write_to(engine, &id, &text) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn writeq2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    let text = render(engine, &args[1], true);
    match write_to(engine, &id, &text) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn print1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    writeq1(engine, args, k)
}

fn print2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    writeq2(engine, args, k)
}

fn write_options_from_list(engine: &mut Engine, list: &Term) -> Result<(bool, bool, bool), PrologError> {
    let items = engine.env.collect_list(list)?;
    let mut quoted = false;
    let mut ignore_ops = false;
    let mut numbervars = false;
    for item in items {
        if let Term::Compound(f, a) = engine.env.resolve(&item) {
            let on = matches!(a.as_slice(), [Term::Atom(v)] if &**v == "true");
            match &*f {
                "quoted" => quoted = on,
                "ignore_ops" => ignore_ops = on,
                "numbervars" => numbervars = on,
                _ => {}
            }
        }
    }
    Ok((quoted, ignore_ops, numbervars))
}

fn write_term_to(
    engine: &mut Engine,
    id: &str,
    term: &Term,
    options: &Term,
) -> Result<(), PrologError> {
    let (quoted, ignore_ops, numbervars) = write_options_from_list(engine, options)?;
    let text = {
        let opts = WriteOptions {
            quoted,
            ignore_ops,
            numbervars,
            ops: &engine.operators,
        };
        let mut buf = Vec::new();
        writer::write_term(&mut buf, term, &engine.env, &opts)
            .map_err(|e| PrologError::SystemError {
                detail: e.to_string(),
            })?;
        String::from_utf8(buf).map_err(|e| PrologError::SystemError {
            detail: e.to_string(),
        })?
    };
    write_to(engine, id, &text)
}

fn write_term2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = engine.streams.current_output();
    match write_term_to(engine, &id, &args[0].clone(), &args[1].clone()) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn write_term3(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    match write_term_to(engine, &id, &args[1].clone(), &args[2].clone()) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn read_from(engine: &mut Engine, id: &str) -> Result<Term, PrologError> {
    let mut src = String::new();
    loop {
        match engine.streams.get_mut(id)?.get_char()? {
            Some(c) => {
                src.push(c);
                if c == '.' {
                    break;
                }
            }
            None => {
                if src.trim().is_empty() {
                    return Ok(Term::atom("end_of_file"));
                }
                break;
            }
        }
    }
    let read = reader::read_one_term(&src, &engine.operators)?;
    Ok(read.term)
}

fn read1(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = engine.streams.current_input();
    match read_from(engine, &id) {
        Ok(t) => unify_or_fail(engine, &args[0], &t, &k),
        Err(e) => Promise::error(e),
    }
}

fn read2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    match read_from(engine, &id) {
        Ok(t) => unify_or_fail(engine, &args[1], &t, &k),
        Err(e) => Promise::error(e),
    }
}

fn read_term2(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = engine.streams.current_input();
    match read_from(engine, &id) {
        Ok(t) => unify_or_fail(engine, &args[0], &t, &k),
        Err(e) => Promise::error(e),
    }
}

fn read_term3(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let id = match stream_id(engine, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    match read_from(engine, &id) {
        Ok(t) => unify_or_fail(engine, &args[1], &t, &k),
        Err(e) => Promise::error(e),
    }
}

fn set_prolog_flag(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let name = match engine.env.resolve(&args[0]) {
        Term::Atom(a) => a,
        Term::Var(_) => return Promise::error(PrologError::instantiation()),
        other => return Promise::error(PrologError::type_error("atom", other)),
    };
    let value = match engine.env.resolve(&args[1]) {
        Term::Atom(a) => a,
        Term::Var(_) => return Promise::error(PrologError::instantiation()),
        other => return Promise::error(PrologError::type_error("atom", other)),
    };
    match engine.flags.set(&name, &value) {
        Ok(()) => k(engine),
        Err(e) => Promise::error(e),
    }
}

fn current_prolog_flag(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let name_term = engine.env.resolve(&args[0]);
    if let Term::Atom(name) = &name_term {
        return match engine.flags.get(name) {
            Ok(v) => unify_or_fail(engine, &args[1], &v, &k),
            Err(e) => Promise::error(e),
        };
    }
    let names = engine.flags.all_names();
    let val_pat = args[1].clone();
    let name_pat = args[0].clone();
    let alts: Vec<Promise> = names
        .iter()
        .map(|&n| {
            let k = k.clone();
            let val_pat = val_pat.clone();
            let name_pat = name_pat.clone();
            Promise::delayed(move |engine: &mut Engine| {
                let v = match engine.flags.get(n) {
                    Ok(v) => v,
                    Err(e) => return Promise::error(e),
                };
                let cp = engine.env.checkpoint();
                let ok = unify(&mut engine.env, &name_pat, &Term::atom(n), false)
                    && unify(&mut engine.env, &val_pat, &v, false);
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

fn op(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let priority = match engine.env.resolve(&args[0]) {
        Term::Int(n) if (0..=1200).contains(&n) => n as u16,
        Term::Var(_) => return Promise::error(PrologError::instantiation()),
        other => return Promise::error(PrologError::domain_error("operator_priority", other)),
    };
    let specifier = match engine.env.resolve(&args[1]) {
        Term::Atom(a) => match Specifier::from_atom(&a) {
            Some(s) => s,
            None => return Promise::error(PrologError::domain_error("operator_specifier", Term::Atom(a))),
        },
        Term::Var(_) => return Promise::error(PrologError::instantiation()),
        other => return Promise::error(PrologError::type_error("atom", other)),
    };
    let names: Vec<Term> = match engine.env.resolve(&args[2]) {
        Term::Atom(_) => vec![engine.env.resolve(&args[2])],
        other if other.is_cons() || other.is_nil() => match engine.env.collect_list(&args[2]) {
            Ok(items) => items,
            Err(e) => return Promise::error(e),
        },
        Term::Var(_) => return Promise::error(PrologError::instantiation()),
        other => return Promise::error(PrologError::type_error("atom", other)),
    };
    for name in names {
        match engine.env.resolve(&name) {
            Term::Atom(n) => engine.operators.define(priority, specifier, n),
            other => return Promise::error(PrologError::type_error("atom", other)),
        }
    }
    k(engine)
}

fn current_op(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let defs: Vec<_> = engine.operators.all().to_vec();
    let p_pat = args[0].clone();
    let s_pat = args[1].clone();
    let n_pat = args[2].clone();
    let alts: Vec<Promise> = defs
        .into_iter()
        .map(|d| {
            let k = k.clone();
            let p_pat = p_pat.clone();
            let s_pat = s_pat.clone();
            let n_pat = n_pat.clone();
            let spec_atom = match d.specifier {
                Specifier::Fx => "fx",
                Specifier::Fy => "fy",
                Specifier::Xf => "xf",
                Specifier::Yf => "yf",
                Specifier::Xfx => "xfx",
                Specifier::Xfy => "xfy",
                Specifier::Yfx => "yfx",
            };
            Promise::delayed(move |engine: &mut Engine| {
                let cp = engine.env.checkpoint();
                let ok = unify(&mut engine.env, &p_pat, &Term::int(d.priority as i64), false)
                    && unify(&mut engine.env, &s_pat, &Term::atom(spec_atom), false)
                    && unify(&mut engine.env, &n_pat, &Term::Atom(d.name.clone()), false);
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

fn char_conversion(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let from = match char_arg(engine, &args[0]) {
        Ok(c) => c,
        Err(e) => return Promise::error(e),
    };
    let to = match char_arg(engine, &args[1]) {
        Ok(c) => c,
        Err(e) => return Promise::error(e),
    };
    engine.flags.set_conversion(from, to);
    k(engine)
}

fn current_char_conversion(engine: &mut Engine, args: &[Term], k: Cont) -> Promise {
    let pairs: Vec<(char, char)> = engine
        .flags
        .all_conversions()
        .map(|(&a, &b)| (a, b))
        .collect();
    let from_pat = args[0].clone();
    let to_pat = args[1].clone();
    let alts: Vec<Promise> = pairs
        .into_iter()
        .map(|(from, to)| {
            let k = k.clone();
            let from_pat = from_pat.clone();
            let to_pat = to_pat.clone();
            Promise::delayed(move |engine: &mut Engine| {
                let cp = engine.env.checkpoint();
                let ok = unify(&mut engine.env, &from_pat, &Term::atom(from.to_string()), false)
                    && unify(&mut engine.env, &to_pat, &Term::atom(to.to_string()), false);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::fresh_var_id;
    use crate::promise::Outcome;

    fn test_engine() -> Engine {
        Engine::with_builtins()
    }

    #[test]
    fn open_write_close_then_read_back_a_file() {
        let mut engine = test_engine();
        let dir = std::env::temp_dir();
        let path = dir.join(format!("prolog_io_test_{}.txt", std::process::id()));
        let path_str = path.to_str().unwrap();

        let s = fresh_var_id();
        let goal = Term::compound(
            "open",
            vec![
                Term::atom(path_str),
                Term::atom("write"),
                Term::var(s),
                Term::nil(),
            ],
        );
        assert!(matches!(engine.solve_once(&goal), Outcome::True));
        let sid = engine.env.resolve(&Term::var(s));

        let goal2 = Term::compound("put_char", vec![sid.clone(), Term::atom("x")]);
        assert!(matches!(engine.solve_once(&goal2), Outcome::True));

        let goal3 = Term::compound("close", vec![sid]);
        assert!(matches!(engine.solve_once(&goal3), Outcome::True));

        let s2 = fresh_var_id();
        let goal4 = Term::compound(
            "open",
            vec![
                Term::atom(path_str),
                Term::atom("read"),
                Term::var(s2),
                Term::nil(),
            ],
        );
        assert!(matches!(engine.solve_once(&goal4), Outcome::True));
        let sid2 = engine.env.resolve(&Term::var(s2));
        let c = fresh_var_id();
        let goal5 = Term::compound("get_char", vec![sid2, Term::var(c)]);
        assert!(matches!(engine.solve_once(&goal5), Outcome::True));
        assert_eq!(engine.env.resolve(&Term::var(c)), Term::atom("x"));
        let _ = std::fs::remove_file(path_str);
    }

    #[test]
    fn op_defines_a_new_operator_visible_to_current_op() {
        let mut engine = test_engine();
        let goal = Term::compound(
            "op",
            vec![Term::int(700), Term::atom("xfx"), Term::atom("===")],
        );
        assert!(matches!(engine.solve_once(&goal), Outcome::True));
        assert!(engine.operators.lookup_infix("===").is_some());
    }

    #[test]
    fn set_and_get_prolog_flag_round_trips() {
        let mut engine = test_engine();
        let goal = Term::compound(
            "set_prolog_flag",
            vec![Term::atom("unknown"), Term::atom("fail")],
        );
        assert!(matches!(engine.solve_once(&goal), Outcome::True));
        let v = fresh_var_id();
        let goal2 = Term::compound(
            "current_prolog_flag",
            vec![Term::atom("unknown"), Term::var(v)],
        );
        assert!(matches!(engine.solve_once(&goal2), Outcome::True));
        assert_eq!(engine.env.resolve(&Term::var(v)), Term::atom("fail"));
    }

    #[test]
    fn char_conversion_round_trips_through_current_char_conversion() {
        let mut engine = test_engine();
        let goal = Term::compound("char_conversion", vec![Term::atom("a"), Term::atom("b")]);
        assert!(matches!(engine.solve_once(&goal), Outcome::True));
        let to = fresh_var_id();
        let goal2 = Term::compound(
            "current_char_conversion",
            vec![Term::atom("a"), Term::var(to)],
        );
        assert!(matches!(engine.solve_once(&goal2), Outcome::True));
        assert_eq!(engine.env.resolve(&Term::var(to)), Term::atom("b"));
    }
}
