use crate::syntax::token::{Pos, TokenKind};
use thiserror::Error;

/// Unified error type for the checker front-end.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unexpected token {kind:?} at {pos}")]
    UnexpectedToken { kind: TokenKind, pos: Pos },

    #[error("unexpected end of file")]
    UnexpectedEof,

    #[error("{kind} at {pos}")]
    Semantic { kind: SemError, pos: Pos },
}

impl Error {
    pub fn sem(kind: SemError, pos: Pos) -> Self {
        Error::Semantic { kind, pos }
    }
}

/// Semantic errors. Checking halts on the first one, before anything runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SemError {
    #[error("duplicate definition: {0}")]
    DuplicateDefinition(String),

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("class {class} extends unknown base {base}")]
    UnknownBase { class: String, base: String },

    #[error("inheritance cycle through class {0}")]
    InheritanceCycle(String),

    #[error("redeclaration of {0} in the same scope")]
    Redeclaration(String),

    #[error("undeclared identifier: {0}")]
    UndeclaredIdentifier(String),

    #[error("not an assignable location: {0}")]
    NotAssignable(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("invalid cast from {from} to {to}")]
    InvalidCast { from: String, to: String },

    #[error("type {ty} has no field {field}")]
    UnknownField { ty: String, field: String },

    #[error("class {class} has no method {method}")]
    UnknownMethod { class: String, method: String },

    #[error("call to {name}: expected {expected} arguments, found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("variable {0} cannot have type void")]
    VoidVariable(String),

    #[error("struct {0} contains itself by value")]
    RecursiveStruct(String),

    #[error("{0} outside of a loop")]
    OutsideLoop(&'static str),
}
