//! The flag store (spec.md §6): a small map with a fixed set of keys, some
//! read-only. No direct teacher counterpart; built fresh.

use std::collections::HashMap;

use crate::error::PrologError;
use crate::term::Term;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownAction {
    Error,
    Warning,
    Fail,
}

#[derive(Debug, Clone)]
pub struct Flags {
    pub char_conversion: bool,
    pub debug: bool,
    pub unknown: UnknownAction,
    conversions: HashMap<char, char>,
}

impl Flags {
    pub fn new() -> Self {
        Flags {
            char_conversion: false,
            debug: false,
            unknown: UnknownAction::Error,
            conversions: HashMap::new(),
        }
    }

    /// `char_conversion/2`: registers that `from` reads as `to` when the
    /// `char_conversion` flag is `on`. `to == from` removes the mapping
    /// (mirrors `op/3`'s priority-0-removes convention).
    pub fn set_conversion(&mut self, from: char, to: char) {
        if from == to {
            self.conversions.remove(&from);
        } else {
            self.conversions.insert(from, to);
        }
    }

    pub fn convert(&self, c: char) -> char {
        if self.char_conversion {
            *self.conversions.get(&c).unwrap_or(&c)
        } else {
            c
        }
    }

    pub fn all_conversions(&self) -> impl Iterator<Item = (&char, &char)> {
        self.conversions.iter()
    }

    /// Read-only flags as (name, value-atom) pairs, per spec.md §6's table.
    fn fixed(name: &str) -> Option<Term> {
        Some(match name {
            "bounded" => Term::atom("true"),
            "max_integer" => Term::int(i64::MAX),
            "min_integer" => Term::int(i64::MIN),
            "integer_rounding_function" => Term::atom("toward_zero"),
            "max_arity" => Term::atom("unbounded"),
            _ => return None,
        })
    }

    pub fn get(&self, name: &str) -> Result<Term, PrologError> {
        if let Some(v) = Flags::fixed(name) {
            return Ok(v);
        }
        match name {
            "char_conversion" => Ok(Term::atom(if self.char_conversion { "on" } else { "off" })),
            "debug" => Ok(Term::atom(if self.debug { "on" } else { "off" })),
            "unknown" => Ok(Term::atom(match self.unknown {
                UnknownAction::Error => "error",
                UnknownAction::Warning => "warning",
                UnknownAction::Fail => "fail",
            })),
            _ => Err(PrologError::domain_error("prolog_flag", Term::atom(name))),
        }
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<(), PrologError> {
        if Flags::fixed(name).is_some() {
            return Err(PrologError::permission_error(
                "modify",
                "flag",
                Term::atom(name),
            ));
        }
        match name {
            "char_conversion" => self.char_conversion = parse_on_off(value)?,
            "debug" => self.debug = parse_on_off(value)?,
            "unknown" => {
                self.unknown = match value {
                    "error" => UnknownAction::Error,
                    "warning" => UnknownAction::Warning,
                    "fail" => UnknownAction::Fail,
                    _ => return Err(PrologError::domain_error("flag_value", Term::atom(value))),
                }
            }
            _ => return Err(PrologError::domain_error("prolog_flag", Term::atom(name))),
        }
        Ok(())
    }

    pub fn all_names(&self) -> &'static [&'static str] {
        &[
            "bounded",
            "max_integer",
            "min_integer",
            "integer_rounding_function",
            "max_arity",
            "char_conversion",
            "debug",
            "unknown",
        ]
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_on_off(v: &str) -> Result<bool, PrologError> {
    match v {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(PrologError::domain_error("flag_value", Term::atom(v))),
    }
}
