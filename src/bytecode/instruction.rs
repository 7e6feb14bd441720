use thiserror::Error;

use crate::bytecode::op::{Op, Operand};
use crate::lang::value::write_float;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {byte:02X} at {offset}")]
    UnknownOpcode { byte: u8, offset: usize },

    #[error("truncated {op} at {offset}")]
    Truncated { op: Op, offset: usize },
}

impl DecodeError {
    pub fn offset(&self) -> usize {
        match self {
            DecodeError::UnknownOpcode { offset, .. } | DecodeError::Truncated { offset, .. } => {
                *offset
            }
        }
    }
}

/// Decoded immediate operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Imm {
    None,
    Int(i32),
    Float(f64),
    Target(u32),
}

impl std::fmt::Display for Imm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Imm::None => Ok(()),
            Imm::Int(n) => write!(f, "{}", n),
            Imm::Float(x) => write_float(f, *x),
            Imm::Target(t) => write!(f, "{}", t),
        }
    }
}

/// One instruction as it sits in the stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub op: Op,
    pub imm: Imm,
}

impl Instruction {
    /// Bytes occupied in the stream, opcode included.
    pub fn width(&self) -> usize {
        self.op.encoded_len()
    }

    pub fn target(&self) -> Option<u32> {
        match self.imm {
            Imm::Target(t) => Some(t),
            _ => None,
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.imm {
            Imm::None => write!(f, "{}", self.op),
            imm => write!(f, "{} {}", self.op, imm),
        }
    }
}

/// Decode the instruction whose opcode byte sits at `offset`.
pub fn decode(code: &[u8], offset: usize) -> Result<Instruction, DecodeError> {
    let byte = *code
        .get(offset)
        .ok_or(DecodeError::UnknownOpcode { byte: 0, offset })?;
    let op = Op::from_byte(byte).ok_or(DecodeError::UnknownOpcode { byte, offset })?;

    let start = offset + 1;
    let width = op.operand().width();
    let bytes = code
        .get(start..start + width)
        .ok_or(DecodeError::Truncated { op, offset })?;

    let imm = match op.operand() {
        Operand::None => Imm::None,
        Operand::Int => Imm::Int(i32::from_le_bytes(le4(bytes))),
        Operand::Target => Imm::Target(u32::from_le_bytes(le4(bytes))),
        Operand::Float => Imm::Float(f64::from_le_bytes(le8(bytes))),
    };

    Ok(Instruction { op, imm })
}

fn le4(bytes: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&bytes[..4]);
    out
}

fn le8(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&bytes[..8]);
    out
}

/// Iterator over consecutive instructions from offset 0.
///
/// Yields `(offset, result)`; stops after the first decode error.
pub struct Instructions<'a> {
    code: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Self {
            code,
            offset: 0,
            failed: false,
        }
    }
}

impl Iterator for Instructions<'_> {
    type Item = (usize, Result<Instruction, DecodeError>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.code.len() {
            return None;
        }
        let at = self.offset;
        let result = decode(self.code, at);
        match &result {
            Ok(ins) => self.offset += ins.width(),
            Err(_) => self.failed = true,
        }
        Some((at, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::builder::Builder;

    fn stream(f: impl FnOnce(&mut Builder)) -> Vec<u8> {
        let mut b = Builder::with_capacity(256);
        f(&mut b);
        b.finish()
    }

    #[test]
    fn test_decode_push() {
        let code = stream(|b| {
            b.emit_op(Op::Push).unwrap();
            b.emit_i32(-7).unwrap();
        });
        let ins = decode(&code, 0).unwrap();
        assert_eq!(ins.op, Op::Push);
        assert_eq!(ins.imm, Imm::Int(-7));
        assert_eq!(ins.width(), 5);
    }

    #[test]
    fn test_decode_pushf() {
        let code = stream(|b| {
            b.emit_op(Op::PushF).unwrap();
            b.emit_f64(2.25).unwrap();
        });
        assert_eq!(decode(&code, 0).unwrap().imm, Imm::Float(2.25));
    }

    #[test]
    fn test_decode_target() {
        let code = stream(|b| {
            b.emit_op(Op::Call).unwrap();
            b.emit_u32(300).unwrap();
        });
        assert_eq!(decode(&code, 0).unwrap().target(), Some(300));
    }

    #[test]
    fn test_decode_unknown_opcode_reports_offset() {
        let code = vec![0x00, 0x42];
        assert_eq!(
            decode(&code, 1),
            Err(DecodeError::UnknownOpcode {
                byte: 0x42,
                offset: 1
            })
        );
    }

    #[test]
    fn test_decode_truncated_immediate() {
        let code = vec![Op::Push.byte(), 1, 0];
        assert_eq!(
            decode(&code, 0),
            Err(DecodeError::Truncated {
                op: Op::Push,
                offset: 0
            })
        );
    }

    #[test]
    fn test_instructions_iterator_walks_stream() {
        let code = stream(|b| {
            b.emit_op(Op::Push).unwrap();
            b.emit_i32(1).unwrap();
            b.emit_op(Op::Print).unwrap();
            b.emit_op(Op::Halt).unwrap();
        });
        let offsets: Vec<usize> = Instructions::new(&code).map(|(at, _)| at).collect();
        assert_eq!(offsets, vec![0, 5, 6]);
    }

    #[test]
    fn test_instructions_iterator_stops_after_error() {
        let code = vec![Op::Nop.byte(), 0x99, Op::Nop.byte()];
        let items: Vec<_> = Instructions::new(&code).collect();
        assert_eq!(items.len(), 2);
        assert!(items[1].1.is_err());
    }

    #[test]
    fn test_instruction_display() {
        let ins = Instruction {
            op: Op::Jz,
            imm: Imm::Target(12),
        };
        assert_eq!(ins.to_string(), "JZ 12");
        let ins = Instruction {
            op: Op::Dup,
            imm: Imm::None,
        };
        assert_eq!(ins.to_string(), "DUP");
    }

    #[test]
    fn test_float_immediate_display() {
        assert_eq!(Imm::Float(0.1 + 0.2).to_string(), "0.3");
        assert_eq!(Imm::Float(1e-7).to_string(), "1e-07");
    }
}
