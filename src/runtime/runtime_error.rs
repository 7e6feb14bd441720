use thiserror::Error;

use crate::bytecode::{DecodeError, Imm, Op};

#[derive(Debug, Error)]
pub enum RuntimeErrorKind {
    #[error("stack overflow (limit {limit})")]
    StackOverflow { limit: usize },

    #[error("stack underflow")]
    StackUnderflow,

    #[error("call stack overflow (limit {limit})")]
    CallStackOverflow { limit: usize },

    #[error("call stack underflow")]
    CallStackUnderflow,

    #[error("{op} expects {expected}, got {found}")]
    TypeMismatch {
        op: Op,
        expected: &'static str,
        found: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("modulo by zero")]
    ModuloByZero,

    #[error("{op} address {address} out of bounds (memory size {size})")]
    AddressOutOfBounds { op: Op, address: i32, size: usize },

    #[error("unknown opcode {byte:02X}")]
    UnknownOpcode { byte: u8 },

    #[error("truncated {op}")]
    Truncated { op: Op },

    #[error("{op} cannot take immediate `{imm}`")]
    OperandMismatch { op: Op, imm: Imm },

    #[error("execution step limit exceeded ({limit})")]
    StepLimitExceeded { limit: usize },

    #[error("output failed: {0}")]
    Output(#[from] std::io::Error),
}

impl From<DecodeError> for RuntimeErrorKind {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::UnknownOpcode { byte, .. } => RuntimeErrorKind::UnknownOpcode { byte },
            DecodeError::Truncated { op, .. } => RuntimeErrorKind::Truncated { op },
        }
    }
}

/// A fatal error, tied to the offset of the instruction that raised it.
#[derive(Debug, Error)]
#[error("runtime error at {offset:04}: {kind}")]
pub struct RuntimeError {
    pub offset: usize,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn new(offset: usize, kind: RuntimeErrorKind) -> Self {
        RuntimeError { offset, kind }
    }
}

impl From<DecodeError> for RuntimeError {
    fn from(e: DecodeError) -> Self {
        RuntimeError::new(e.offset(), e.into())
    }
}
