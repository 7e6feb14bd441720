//! # stackvm
//!
//! A small stack machine in two halves:
//!
//! - [`frontend`]: a two-pass assembler from a line-oriented listing to a
//!   little-endian byte stream, with labels resolved through relocations.
//! - [`runtime`]: a fetch-decode-execute loop over that stream with an
//!   operand stack of [`lang::value::Value`], a separate call stack, and a
//!   flat integer memory.
//!
//! The byte stream (see [`bytecode`]) is the only thing the two share.
//!
//! ```
//! use stackvm::{frontend::assemble, runtime::Vm};
//!
//! let code = assemble("PUSH 2\nPUSH 3\nADD\nPRINT\nHALT").unwrap();
//! let mut out = Vec::new();
//! Vm::new().run(&code, &mut out).unwrap();
//! assert_eq!(out, b"5\n");
//! ```

pub mod bytecode;
pub mod frontend;
pub mod lang;
pub mod runtime;
