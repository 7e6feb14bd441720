use thiserror::Error;

use crate::bytecode::BuildError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleErrorKind {
    #[error("unknown instruction '{0}'")]
    UnknownMnemonic(String),

    #[error("{mnemonic} missing {expected}")]
    MissingOperand {
        mnemonic: &'static str,
        expected: &'static str,
    },

    #[error("{mnemonic} takes no further operands, found '{token}'")]
    UnexpectedOperand {
        mnemonic: &'static str,
        token: String,
    },

    #[error("invalid integer literal '{0}'")]
    MalformedInteger(String),

    #[error("integer literal '{0}' does not fit in 32 bits")]
    IntegerOutOfRange(String),

    #[error("invalid float literal '{0}'")]
    MalformedFloat(String),

    #[error("jump target '{0}' is not a valid byte offset")]
    TargetOutOfRange(String),

    #[error("empty label")]
    EmptyLabel,

    #[error("invalid label name '{0}'")]
    InvalidLabel(String),

    #[error("label '{name}' already defined at line {first_line}")]
    DuplicateLabel { name: String, first_line: usize },

    #[error("undefined label: {0}")]
    UndefinedLabel(String),

    #[error("too many labels (limit {limit})")]
    TooManyLabels { limit: usize },

    #[error("too many relocations (limit {limit})")]
    TooManyRelocations { limit: usize },

    #[error(transparent)]
    Bytecode(#[from] BuildError),
}

/// First error encountered while assembling. Assembly never continues past it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("assembly error{}: {kind}", at_line(.line))]
pub struct AssembleError {
    /// 1-based source line, when the error is tied to one.
    pub line: Option<usize>,
    pub kind: AssembleErrorKind,
}

fn at_line(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" at line {}", n),
        None => String::new(),
    }
}

impl AssembleError {
    pub fn at(line: usize, kind: AssembleErrorKind) -> Self {
        Self {
            line: Some(line),
            kind,
        }
    }

    pub fn new(kind: AssembleErrorKind) -> Self {
        Self { line: None, kind }
    }
}
