//! The term writer (spec.md §6 Writer contract, collaborator).
//!
//! Grounded on `Term`'s `Display` impl in the teacher's `machine/term.rs`
//! (functor then parenthesized comma-separated args), extended with
//! quoting/operator/numbervars handling and a visited-set cycle guard per
//! spec.md §9 ("the writer should emit a `...`-style elision when a cycle is
//! detected").

use std::collections::HashSet;
use std::io;

use crate::env::Env;
use crate::operators::{OperatorTable, Specifier};
use crate::term::{Term, VarId};

/// `WriteOptions` (spec.md §6): controls quoting, operator notation, and
/// `'$VAR'(N)`-style numbervars printing.
#[derive(Debug, Clone)]
pub struct WriteOptions<'a> {
    pub quoted: bool,
    pub ignore_ops: bool,
    pub numbervars: bool,
    pub ops: &'a OperatorTable,
}

impl<'a> WriteOptions<'a> {
    pub fn new(ops: &'a OperatorTable) -> Self {
        WriteOptions {
            quoted: false,
            ignore_ops: false,
            numbervars: false,
            ops,
        }
    }
}

struct Writer<'a, 'b, W: io::Write> {
    out: &'a mut W,
    env: &'b Env,
    opts: &'b WriteOptions<'b>,
    visiting: HashSet<VarId>,
}

/// Writes `term` (resolved through `env`) to `out` honoring `opts`. Detects
/// rational-tree cycles and prints `...` at the cycle point rather than
/// looping forever (spec.md §9).
pub fn write_term<W: io::Write>(
    out: &mut W,
    term: &Term,
    env: &Env,
    opts: &WriteOptions,
) -> io::Result<()> {
    let mut w = Writer {
        out,
        env,
        opts,
        visiting: HashSet::new(),
    };
    w.write(term, 1200)
}

/// Convenience: render a term to a `String` using default options.
pub fn term_to_string(term: &Term, env: &Env, ops: &OperatorTable, quoted: bool) -> String {
    let mut buf = Vec::new();
    let opts = WriteOptions {
        quoted,
        ignore_ops: false,
        numbervars: true,
        ops,
    };
    write_term(&mut buf, term, env, &opts).expect("writing to a Vec<u8> cannot fail");
    String::from_utf8(buf).expect("writer only emits UTF-8")
}

fn needs_quote(atom: &str) -> bool {
    if atom.is_empty() {
        return true;
    }
    if atom == "[]" || atom == "{}" || atom == "!" || atom == ";" {
        return false;
    }
    let mut chars = atom.chars();
    let first = chars.next().unwrap();
    if first.is_lowercase() && atom.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return false;
    }
    const SYMBOL_CHARS: &str = "+-*/\\^<>=~:.?@#&$";
    if atom.chars().all(|c| SYMBOL_CHARS.contains(c)) {
        return false;
    }
    true
}

fn quote_atom(atom: &str) -> String {
    let escaped = atom.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

impl<'a, 'b, W: io::Write> Writer<'a, 'b, W> {
    /// Resolves `term` one variable-chain at a time, marking each traversed
    /// variable id as "in progress" so a rational-tree cycle closing back
    /// through one of them is caught rather than recursed forever (spec.md
    /// §9). Marks are cleared once this subtree's write completes.
    fn write(&mut self, term: &Term, max_priority: u16) -> io::Result<()> {
        let mut cur = term.clone();
        let mut pushed: Vec<VarId> = Vec::new();
        let resolved = loop {
            match cur {
                Term::Var(v) => {
                    if self.visiting.contains(&v) {
                        for id in pushed {
                            self.visiting.remove(&id);
                        }
                        return write!(self.out, "...");
                    }
                    match self.env.lookup(v) {
                        Some(next) => {
                            self.visiting.insert(v);
                            pushed.push(v);
                            cur = next.clone();
                        }
                        None => {
                            for id in pushed {
                                self.visiting.remove(&id);
                            }
                            return write!(self.out, "_G{}", v);
                        }
                    }
                }
                other => break other,
            }
        };
        let result = match &resolved {
            Term::Int(n) => write!(self.out, "{}", n),
            Term::Float(n) => self.write_float(*n),
            Term::Atom(a) => self.write_atom(a),
            Term::Compound(f, args) => self.write_compound(f, args, &resolved, max_priority),
            Term::Var(_) => unreachable!("variable chains are fully resolved above"),
        };
        for id in pushed {
            self.visiting.remove(&id);
        }
        result
    }

    fn write_float(&mut self, n: f64) -> io::Result<()> {
        if n.is_nan() {
            write!(self.out, "nan")
        } else if n == n.trunc() && n.is_finite() {
            write!(self.out, "{:.1}", n)
        } else {
            write!(self.out, "{}", n)
        }
    }

    fn write_atom(&mut self, a: &str) -> io::Result<()> {
        if self.opts.quoted && needs_quote(a) {
            write!(self.out, "{}", quote_atom(a))
        } else {
            write!(self.out, "{}", a)
        }
    }

    fn write_compound(
        &mut self,
        f: &str,
        args: &[Term],
        whole: &Term,
        max_priority: u16,
    ) -> io::Result<()> {
        if self.opts.numbervars && f == "$VAR" && args.len() == 1 {
            if let Term::Int(n) = self.env.resolve(&args[0]) {
                return self.write_numbervar(n);
            }
        }
        if f == "." && args.len() == 2 {
            return self.write_list(whole);
        }
        if f == "{}" && args.len() == 1 {
            write!(self.out, "{{")?;
            self.write(&args[0], 1200)?;
            return write!(self.out, "}}");
        }
        if !self.opts.ignore_ops {
            if args.len() == 2 {
                if let Some(op) = self.opts.ops.lookup_infix(f).cloned() {
                    return self.write_infix(f, &op, args, max_priority);
                }
            }
            if args.len() == 1 {
                if let Some(op) = self.opts.ops.lookup_prefix(f).cloned() {
                    return self.write_prefix(f, &op, &args[0], max_priority);
                }
            }
        }
        self.write_atom(f)?;
        write!(self.out, "(")?;
        for (i, a) in args.iter().enumerate() {
            if i > 0 {
                write!(self.out, ",")?;
            }
            self.write(a, 999)?;
        }
        write!(self.out, ")")
    }

    fn write_numbervar(&mut self, n: i64) -> io::Result<()> {
        let letter = (b'A' + (n % 26) as u8) as char;
        let suffix = n / 26;
        if suffix == 0 {
            write!(self.out, "{}", letter)
        } else {
            write!(self.out, "{}{}", letter, suffix)
        }
    }

    fn write_infix(
        &mut self,
        name: &str,
        op: &crate::operators::OpDef,
        args: &[Term],
        max_priority: u16,
    ) -> io::Result<()> {
        let needs_parens = op.priority > max_priority;
        if needs_parens {
            write!(self.out, "(")?;
        }
        let (lp, rp) = match op.specifier {
            Specifier::Xfx => (op.priority - 1, op.priority - 1),
            Specifier::Xfy => (op.priority - 1, op.priority),
            Specifier::Yfx => (op.priority, op.priority - 1),
            _ => (op.priority, op.priority),
        };
        self.write(&args[0], lp)?;
        if name == "," {
            write!(self.out, ",")?;
        } else {
            write!(self.out, "{}", name)?;
        }
        self.write(&args[1], rp)?;
        if needs_parens {
            write!(self.out, ")")?;
        }
        Ok(())
    }

    fn write_prefix(
        &mut self,
        name: &str,
        op: &crate::operators::OpDef,
        arg: &Term,
        max_priority: u16,
    ) -> io::Result<()> {
        let needs_parens = op.priority > max_priority;
        if needs_parens {
            write!(self.out, "(")?;
        }
        write!(self.out, "{} ", name)?;
        let ap = if op.specifier == Specifier::Fy {
            op.priority
        } else {
            op.priority - 1
        };
        self.write(arg, ap)?;
        if needs_parens {
            write!(self.out, ")")?;
        }
        Ok(())
    }

    fn write_list(&mut self, whole: &Term) -> io::Result<()> {
        write!(self.out, "[")?;
        let mut cur = whole.clone();
        let mut first = true;
        loop {
            let resolved = self.env.resolve(&cur);
            if resolved.is_nil() {
                break;
            }
            match &resolved {
                Term::Compound(f, args) if &**f == "." && args.len() == 2 => {
                    if !first {
                        write!(self.out, ",")?;
                    }
                    first = false;
                    self.write(&args[0], 999)?;
                    cur = args[1].clone();
                }
                other => {
                    write!(self.out, "|")?;
                    self.write(other, 999)?;
                    break;
                }
            }
        }
        write!(self.out, "]")
    }
}
