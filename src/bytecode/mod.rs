pub mod builder;
pub mod disasm;
pub mod image;
pub mod instruction;
pub mod op;

pub use builder::{BuildError, Builder};
pub use image::{ImageError, ProgramImage};
pub use instruction::{DecodeError, Imm, Instruction, Instructions, decode};
pub use op::{Op, Operand};
