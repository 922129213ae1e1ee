//! Configuration errors.
//!
//! Everything a caller can get wrong while setting up a graph (root
//! declarations, layer schedules, input shapes) is reported through [`Error`].
//! Internal inconsistencies of the generation pipeline are not errors: they
//! are assertions and panic.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("unknown unary operator '{0}'")]
    UnknownUnaryOperator(char),
    #[error("unknown binary operator '{0}'")]
    UnknownBinaryOperator(char),
    #[error("invalid sign spec '{0}' (expected \"+-\" or \"+\")")]
    InvalidSignSpec(String),
    #[error("invalid zero spec '{0}' (expected \"+0\" or \"-0\")")]
    InvalidZeroSpec(String),
    #[error("invalid power '{power}' for unit '{unit}'")]
    InvalidPower { unit: String, power: String },
    #[error("root node '{0}' is already declared")]
    DuplicateRoot(String),
    #[error("graph has already been generated")]
    AlreadyGenerated,
    #[error("input has {found} columns, expected {expected} (one per root node)")]
    InputShape { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
