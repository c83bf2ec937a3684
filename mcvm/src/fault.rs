use thiserror::Error;

/// Runtime faults. There is no catch construct in the subject language;
/// a fault terminates execution at the point it occurs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Fault {
    #[error("null pointer dereference")]
    NullPointer,

    #[error("null object access")]
    NullObject,

    #[error("index {index} out of bounds for length {len}")]
    OutOfBounds { index: i64, len: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid downcast from class {from} to class {to}")]
    BadDowncast { from: String, to: String },

    #[error("entry function {0} is not defined")]
    NoEntry(String),
}
