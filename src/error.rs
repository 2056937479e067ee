//! The closed ISO error taxonomy (spec.md §7).
//!
//! Every fallible engine operation returns `Result<_, PrologError>`. A
//! `PrologError` is itself a Prolog term under the hood (`error(Formal,
//! Context)`) -- `to_term` renders it that way so `catch/3` can unify against
//! it like any other thrown value.

use thiserror::Error;

use crate::term::Term;

/// The formal part of `error(Formal, Context)`, closed per spec.md §7.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrologError {
    #[error("instantiation_error")]
    InstantiationError,

    #[error("type_error({kind}, {culprit})")]
    TypeError { kind: &'static str, culprit: Term },

    #[error("domain_error({kind}, {culprit})")]
    DomainError { kind: &'static str, culprit: Term },

    #[error("existence_error({kind}, {culprit})")]
    ExistenceError { kind: &'static str, culprit: Term },

    #[error("permission_error({op}, {kind}, {culprit})")]
    PermissionError {
        op: &'static str,
        kind: &'static str,
        culprit: Term,
    },

    #[error("representation_error({kind})")]
    RepresentationError { kind: &'static str },

    #[error("evaluation_error({kind})")]
    EvaluationError { kind: &'static str },

    #[error("resource_error({kind})")]
    ResourceError { kind: &'static str },

    #[error("syntax_error({detail})")]
    SyntaxError { detail: String },

    #[error("system_error({detail})")]
    SystemError { detail: String },

    /// A user `throw/1` of an arbitrary term that is not one of the above.
    #[error("uncaught exception: {0}")]
    Thrown(Term),
}

impl PrologError {
    /// Render this error as the Prolog term a `catch/3` `Catcher` would see:
    /// `error(Formal, Context)`, or the bare thrown term for `throw/1` of a
    /// non-`error/2` value.
    pub fn to_term(&self) -> Term {
        match self {
            PrologError::Thrown(t) => t.clone(),
            other => {
                let formal = other.formal_term();
                let context = Term::atom(other.context_message());
                Term::compound("error", vec![formal, context])
            }
        }
    }

    fn formal_term(&self) -> Term {
        match self {
            PrologError::InstantiationError => Term::atom("instantiation_error"),
            PrologError::TypeError { kind, culprit } => {
                Term::compound("type_error", vec![Term::atom(*kind), culprit.clone()])
            }
            PrologError::DomainError { kind, culprit } => {
                Term::compound("domain_error", vec![Term::atom(*kind), culprit.clone()])
            }
            PrologError::ExistenceError { kind, culprit } => {
                Term::compound("existence_error", vec![Term::atom(*kind), culprit.clone()])
            }
            PrologError::PermissionError { op, kind, culprit } => Term::compound(
                "permission_error",
                vec![Term::atom(*op), Term::atom(*kind), culprit.clone()],
            ),
            PrologError::RepresentationError { kind } => {
                Term::compound("representation_error", vec![Term::atom(*kind)])
            }
            PrologError::EvaluationError { kind } => {
                Term::compound("evaluation_error", vec![Term::atom(*kind)])
            }
            PrologError::ResourceError { kind } => {
                Term::compound("resource_error", vec![Term::atom(*kind)])
            }
            PrologError::SyntaxError { detail } => {
                Term::compound("syntax_error", vec![Term::atom(detail.clone())])
            }
            PrologError::SystemError { detail } => {
                Term::compound("system_error", vec![Term::atom(detail.clone())])
            }
            PrologError::Thrown(t) => t.clone(),
        }
    }

    fn context_message(&self) -> String {
        format!("{}", self)
    }

    pub fn instantiation() -> Self {
        PrologError::InstantiationError
    }

    pub fn type_error(kind: &'static str, culprit: Term) -> Self {
        PrologError::TypeError { kind, culprit }
    }

    pub fn domain_error(kind: &'static str, culprit: Term) -> Self {
        PrologError::DomainError { kind, culprit }
    }

    pub fn existence_error(kind: &'static str, culprit: Term) -> Self {
        PrologError::ExistenceError { kind, culprit }
    }

    pub fn permission_error(op: &'static str, kind: &'static str, culprit: Term) -> Self {
        PrologError::PermissionError { op, kind, culprit }
    }
}
