pub mod assemble_error;
pub mod assembler;
pub mod lexer;
pub mod token_dumper;

pub use assemble_error::{AssembleError, AssembleErrorKind};
pub use assembler::{AsmLimits, Assembler, assemble};
