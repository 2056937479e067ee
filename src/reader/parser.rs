//! Tokenizer (via the `pest` grammar in `grammar.pest`) plus the
//! precedence-climbing term parser that consumes those tokens against the
//! live `OperatorTable` (spec.md §6).

use std::collections::HashMap;

use pest::Parser;
use pest_derive::Parser as PestParser;

use crate::env::fresh_var_id;
use crate::error::PrologError;
use crate::operators::{OperatorTable, Specifier};
use crate::term::{Term, VarId};

use super::ReadTerm;

#[derive(PestParser)]
#[grammar = "reader/grammar.pest"]
struct PrologGrammar;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Punct,
    Var,
    Int,
    Float,
    QuotedAtom,
    StringLit,
    SymbolicAtom,
    PlainAtom,
}

#[derive(Debug, Clone)]
struct Tok {
    kind: Kind,
    text: String,
    start: usize,
    end: usize,
}

/// A streaming reader over one source buffer: tokenizes the whole buffer up
/// front, then `next_term` carves off and parses one `.`-terminated clause
/// at a time, advancing an internal cursor (spec.md §6 "consumes a character
/// source ... produces a term").
pub struct Reader {
    tokens: Vec<Tok>,
    cursor: usize,
}

fn syntax_err(msg: impl Into<String>) -> PrologError {
    PrologError::SyntaxError {
        detail: msg.into(),
    }
}

impl Reader {
    pub fn new(src: &str) -> Result<Self, PrologError> {
        let tokens = tokenize(src)?;
        Ok(Reader { tokens, cursor: 0 })
    }

    /// Reads the next `.`-terminated clause, or `Ok(None)` at end of input
    /// (the `read_term/3` built-in maps that to the atom `end_of_file`).
    pub fn next_term(&mut self, ops: &OperatorTable) -> Result<Option<ReadTerm>, PrologError> {
        if self.cursor >= self.tokens.len() {
            return Ok(None);
        }
        let start = self.cursor;
        let mut end = start;
        let mut found_dot = false;
        while end < self.tokens.len() {
            let t = &self.tokens[end];
            if t.kind == Kind::SymbolicAtom && t.text == "." {
                found_dot = true;
                break;
            }
            end += 1;
        }
        if !found_dot {
            return Err(syntax_err("clause not terminated by '.'"));
        }
        let slice = &self.tokens[start..end];
        self.cursor = end + 1;
        if slice.is_empty() {
            // An empty clause (stray '.') -- skip to the next one.
            return self.next_term(ops);
        }
        let mut p = ClauseParser {
            toks: slice,
            pos: 0,
            ops,
            vars: HashMap::new(),
            counts: HashMap::new(),
            order: Vec::new(),
        };
        let (term, prio) = p.parse_expr(1200)?;
        let _ = prio;
        if p.pos != p.toks.len() {
            return Err(syntax_err(format!(
                "trailing tokens after term: {:?}",
                &p.toks[p.pos..]
            )));
        }
        let singletons = p
            .order
            .iter()
            .filter(|name| *name != "_" && p.counts.get(*name).copied().unwrap_or(0) == 1)
            .cloned()
            .collect();
        let variable_names = p
            .order
            .iter()
            .filter(|name| *name != "_")
            .map(|name| (name.clone(), *p.vars.get(name).unwrap()))
            .collect();
        Ok(Some(ReadTerm {
            term,
            variable_names,
            singletons,
        }))
    }
}

fn tokenize(src: &str) -> Result<Vec<Tok>, PrologError> {
    let pairs = PrologGrammar::parse(Rule::program, src)
        .map_err(|e| syntax_err(format!("{}", e)))?;
    let mut out = Vec::new();
    for pair in pairs {
        collect_tokens(pair, &mut out);
    }
    Ok(out)
}

fn collect_tokens(pair: pest::iterators::Pair<Rule>, out: &mut Vec<Tok>) {
    let kind = match pair.as_rule() {
        Rule::punct => Some(Kind::Punct),
        Rule::var_tok => Some(Kind::Var),
        Rule::int_lit => Some(Kind::Int),
        Rule::float_lit => Some(Kind::Float),
        Rule::quoted_atom => Some(Kind::QuotedAtom),
        Rule::string_lit => Some(Kind::StringLit),
        Rule::symbolic_atom => Some(Kind::SymbolicAtom),
        Rule::plain_atom => Some(Kind::PlainAtom),
        _ => None,
    };
    if let Some(kind) = kind {
        let span = pair.as_span();
        out.push(Tok {
            kind,
            text: pair.as_str().to_string(),
            start: span.start(),
            end: span.end(),
        });
        return;
    }
    for inner in pair.into_inner() {
        collect_tokens(inner, out);
    }
}

/// Recursive-descent precedence-climbing parser over one clause's token
/// slice (spec.md §6): `parse_expr(max_priority)` is the standard
/// "operator-precedence parse" loop, `parse_primary` handles atoms,
/// numbers, variables, lists, curly terms, and parenthesized/functor
/// subterms.
struct ClauseParser<'a> {
    toks: &'a [Tok],
    pos: usize,
    ops: &'a OperatorTable,
    vars: HashMap<String, VarId>,
    counts: HashMap<String, usize>,
    order: Vec<String>,
}

impl<'a> ClauseParser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn peek_text(&self) -> Option<&str> {
        self.peek().map(|t| t.text.as_str())
    }

    fn bump(&mut self) -> Tok {
        let t = self.toks[self.pos].clone();
        self.pos += 1;
        t
    }

    fn expect_text(&mut self, text: &str) -> Result<(), PrologError> {
        match self.peek_text() {
            Some(t) if t == text => {
                self.pos += 1;
                Ok(())
            }
            other => Err(syntax_err(format!(
                "expected '{}', found {:?}",
                text, other
            ))),
        }
    }

    /// True if the token immediately following `name`'s token (already
    /// consumed) is a `(` with no intervening layout -- ISO's rule for
    /// distinguishing `foo(X)` (a compound) from an atom `foo` followed by a
    /// parenthesized subterm.
    fn adjacent_open_paren(&self, name_end: usize) -> bool {
        matches!(self.peek(), Some(t) if t.kind == Kind::Punct && t.text == "(" && t.start == name_end)
    }

    fn fresh_named_var(&mut self, name: &str) -> Term {
        *self.counts.entry(name.to_string()).or_insert(0) += 1;
        if name == "_" {
            return Term::var(fresh_var_id());
        }
        if let Some(&id) = self.vars.get(name) {
            return Term::var(id);
        }
        let id = fresh_var_id();
        self.vars.insert(name.to_string(), id);
        self.order.push(name.to_string());
        Term::var(id)
    }

    fn is_term_start(&self) -> bool {
        match self.peek() {
            None => false,
            Some(t) => !(t.kind == Kind::Punct && matches!(t.text.as_str(), ")" | "]" | "}" | "," | "|")),
        }
    }

    fn parse_expr(&mut self, max_priority: u16) -> Result<(Term, u16), PrologError> {
        let (mut left, mut left_prio) = self.parse_primary(max_priority)?;
        loop {
            let Some(name) = self.peek_text().map(|s| s.to_string()) else {
                break;
            };
            if name == ")" || name == "]" || name == "}" {
                break;
            }
            let comma_as_op = name == ",";
            let bar_as_op = name == "|";
            if let Some(op) = self.ops.lookup_infix(&name).cloned() {
                if op.priority <= max_priority {
                    let left_max = match op.specifier {
                        Specifier::Yfx => op.priority,
                        _ => op.priority - 1,
                    };
                    if left_prio <= left_max {
                        // Don't treat the argument/list separator `,` as the
                        // conjunction operator unless we are genuinely
                        // inside a parenthesized sub-expression allowing
                        // priority 1000+ (max_priority passed down already
                        // encodes that: argument lists call parse_expr(999)).
                        if (comma_as_op || bar_as_op) && max_priority < op.priority {
                            break;
                        }
                        self.bump();
                        let right_max = match op.specifier {
                            Specifier::Xfy => op.priority,
                            _ => op.priority - 1,
                        };
                        let (right, _) = self.parse_expr(right_max)?;
                        let functor = if bar_as_op { ";" } else { name.as_str() };
                        left = Term::compound(functor, vec![left, right]);
                        left_prio = op.priority;
                        continue;
                    }
                }
            }
            if let Some(op) = self.ops.lookup_postfix(&name).cloned() {
                if op.priority <= max_priority {
                    let left_max = match op.specifier {
                        Specifier::Yf => op.priority,
                        _ => op.priority - 1,
                    };
                    if left_prio <= left_max {
                        self.bump();
                        left = Term::compound(name.as_str(), vec![left]);
                        left_prio = op.priority;
                        continue;
                    }
                }
            }
            break;
        }
        Ok((left, left_prio))
    }

    fn parse_primary(&mut self, max_priority: u16) -> Result<(Term, u16), PrologError> {
        let tok = match self.peek() {
            Some(t) => t.clone(),
            None => return Err(syntax_err("unexpected end of clause")),
        };
        match tok.kind {
            Kind::Int => {
                self.bump();
                let n: i64 = tok
                    .text
                    .parse()
                    .map_err(|_| syntax_err(format!("bad integer literal {}", tok.text)))?;
                Ok((Term::int(n), 0))
            }
            Kind::Float => {
                self.bump();
                let n: f64 = tok
                    .text
                    .parse()
                    .map_err(|_| syntax_err(format!("bad float literal {}", tok.text)))?;
                Ok((Term::float(n), 0))
            }
            Kind::Var => {
                self.bump();
                Ok((self.fresh_named_var(&tok.text), 0))
            }
            Kind::StringLit => {
                self.bump();
                let content = unescape(&tok.text[1..tok.text.len() - 1]);
                let codes = content.chars().map(|c| Term::int(c as i64)).collect();
                Ok((Term::list(codes), 0))
            }
            Kind::QuotedAtom => {
                self.bump();
                let name = unescape(&tok.text[1..tok.text.len() - 1]);
                self.maybe_compound(name, tok.end, max_priority)
            }
            Kind::PlainAtom | Kind::SymbolicAtom => {
                self.bump();
                self.maybe_compound(tok.text.clone(), tok.end, max_priority)
            }
            Kind::Punct => match tok.text.as_str() {
                "(" => {
                    self.bump();
                    let (inner, _) = self.parse_expr(1200)?;
                    self.expect_text(")")?;
                    Ok((inner, 0))
                }
                "[" => {
                    self.bump();
                    self.parse_list()
                }
                "{" => {
                    self.bump();
                    if self.peek_text() == Some("}") {
                        self.bump();
                        return Ok((Term::atom("{}"), 0));
                    }
                    let (inner, _) = self.parse_expr(1200)?;
                    self.expect_text("}")?;
                    Ok((Term::compound("{}", vec![inner]), 0))
                }
                "!" => {
                    self.bump();
                    Ok((Term::atom("!"), 0))
                }
                other => Err(syntax_err(format!("unexpected token '{}'", other))),
            },
        }
    }

    /// After an atom-like token, either it starts a `name(arg, ..)` compound
    /// (no layout before `(`), a prefix-operator application, or it stands
    /// alone as an atom.
    fn maybe_compound(
        &mut self,
        name: String,
        name_end: usize,
        max_priority: u16,
    ) -> Result<(Term, u16), PrologError> {
        if self.adjacent_open_paren(name_end) {
            self.bump(); // '('
            let args = self.parse_arglist()?;
            self.expect_text(")")?;
            return Ok((Term::compound(name, args), 0));
        }
        if name == "-" {
            if let Some(t) = self.peek() {
                if (t.kind == Kind::Int || t.kind == Kind::Float) && t.start == name_end {
                    let (num, _) = self.parse_primary(0)?;
                    let negated = match num {
                        Term::Int(n) => Term::int(-n),
                        Term::Float(f) => Term::float(-f),
                        other => other,
                    };
                    return Ok((negated, 0));
                }
            }
        }
        if let Some(op) = self.ops.lookup_prefix(&name).cloned() {
            if op.priority <= max_priority && self.is_term_start() && !self.next_is_infix_only() {
                let arg_max = match op.specifier {
                    Specifier::Fy => op.priority,
                    _ => op.priority - 1,
                };
                let (arg, _) = self.parse_expr(arg_max)?;
                return Ok((Term::compound(name, vec![arg]), op.priority));
            }
        }
        Ok((Term::atom(name), 0))
    }

    /// Guards against misreading `- , foo` style text: if the very next
    /// token can only be an infix/postfix operator (not a term start), the
    /// supposed prefix use is actually a bare atom.
    fn next_is_infix_only(&self) -> bool {
        match self.peek_text() {
            Some(name) => {
                self.ops.lookup_infix(name).is_some() && self.ops.lookup_prefix(name).is_none()
            }
            None => true,
        }
    }

    fn parse_arglist(&mut self) -> Result<Vec<Term>, PrologError> {
        let mut args = Vec::new();
        if self.peek_text() == Some(")") {
            return Ok(args);
        }
        loop {
            let (arg, _) = self.parse_expr(999)?;
            args.push(arg);
            if self.peek_text() == Some(",") {
                self.bump();
                continue;
            }
            break;
        }
        Ok(args)
    }

    fn parse_list(&mut self) -> Result<(Term, u16), PrologError> {
        if self.peek_text() == Some("]") {
            self.bump();
            return Ok((Term::nil(), 0));
        }
        let mut items = Vec::new();
        loop {
            let (item, _) = self.parse_expr(999)?;
            items.push(item);
            if self.peek_text() == Some(",") {
                self.bump();
                continue;
            }
            break;
        }
        let tail = if self.peek_text() == Some("|") {
            self.bump();
            let (t, _) = self.parse_expr(999)?;
            t
        } else {
            Term::nil()
        };
        self.expect_text("]")?;
        let mut out = tail;
        for item in items.into_iter().rev() {
            out = Term::cons(item, out);
        }
        Ok((out, 0))
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('"') => out.push('"'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
