//! Code generation errors.
//!
//! Every variant is an invariant violation: well-formed TAC from the
//! generator and optimizer never triggers them. The driver maps them onto
//! the compiler's `InternalError` kind.

use nanoc_util::CompileError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeGenError {
    /// An operand had no stack slot assigned by the frame pass.
    #[error("no frame slot for operand '{0}'")]
    UnknownOperandSlot(String),

    /// A shift instruction arrived with a non-literal shift amount.
    #[error("shift amount must be an immediate")]
    NonImmediateShift,

    /// An instruction was missing a required operand.
    #[error("malformed instruction: missing {0}")]
    MissingOperand(&'static str),

    /// An operand kind appeared where it cannot be encoded.
    #[error("operand '{0}' cannot be used as {1}")]
    BadOperand(String, &'static str),

    /// The requested backend does not exist yet.
    #[error("unsupported target '{0}'")]
    UnsupportedTarget(&'static str),
}

impl From<CodeGenError> for CompileError {
    fn from(err: CodeGenError) -> Self {
        CompileError::internal(format!("codegen: {err}"))
    }
}
