//! Execution observers.
//!
//! A [`Tracer`] sees every instruction right before it executes, together
//! with the operand stack as it stands at that moment. It cannot change VM
//! state.

use std::io::{self, Write};

use crate::bytecode::{Imm, Instruction};
use crate::lang::value::Value;

pub trait Tracer {
    fn before(&mut self, at: usize, ins: &Instruction, stack: &[Value]) -> io::Result<()>;
}

/// Observer that does nothing.
pub struct NoTrace;

impl Tracer for NoTrace {
    fn before(&mut self, _: usize, _: &Instruction, _: &[Value]) -> io::Result<()> {
        Ok(())
    }
}

/// Prints one `TRACE` line per step:
///
/// ```text
/// TRACE ip=0005 PUSH   3 [stack: 2 ]
/// ```
///
/// Only the most recent `window` stack entries are shown.
pub struct TracePrinter<W: Write> {
    out: W,
    window: usize,
}

impl<W: Write> TracePrinter<W> {
    pub const DEFAULT_WINDOW: usize = 8;

    pub fn new(out: W) -> Self {
        Self {
            out,
            window: Self::DEFAULT_WINDOW,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Tracer for TracePrinter<W> {
    fn before(&mut self, at: usize, ins: &Instruction, stack: &[Value]) -> io::Result<()> {
        write!(self.out, "TRACE ip={:04} {:<6}", at, ins.op.mnemonic())?;
        if ins.imm != Imm::None {
            write!(self.out, " {}", ins.imm)?;
        }

        write!(self.out, " [stack:")?;
        let start = stack.len().saturating_sub(self.window);
        for value in &stack[start..] {
            write!(self.out, " {}", value)?;
        }
        writeln!(self.out, " ]")
    }
}
