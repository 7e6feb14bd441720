//! Append-only byte buffer for emitting instruction streams.
//!
//! Every multi-byte value is written little-endian. The only non-append
//! mutation is [`Builder::patch_u32`], used to fill relocation placeholders.

use thiserror::Error;

use crate::bytecode::Op;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("bytecode capacity exceeded ({capacity} bytes)")]
    CapacityExceeded { capacity: usize },

    #[error("patch at offset {pos} is out of bounds (length {len})")]
    PatchOutOfBounds { pos: usize, len: usize },
}

#[derive(Debug, Clone)]
pub struct Builder {
    buf: Vec<u8>,
    capacity: usize,
}

impl Builder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::new(),
            capacity,
        }
    }

    /// Current length, which is also the offset of the next emitted byte.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn reserve(&self, n: usize) -> Result<(), BuildError> {
        if self.buf.len() + n > self.capacity {
            return Err(BuildError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn emit_bytes(&mut self, bytes: &[u8]) -> Result<(), BuildError> {
        self.reserve(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn emit_u8(&mut self, x: u8) -> Result<(), BuildError> {
        self.emit_bytes(&[x])
    }

    pub fn emit_op(&mut self, op: Op) -> Result<(), BuildError> {
        self.emit_u8(op.byte())
    }

    pub fn emit_i32(&mut self, x: i32) -> Result<(), BuildError> {
        self.emit_bytes(&x.to_le_bytes())
    }

    pub fn emit_u32(&mut self, x: u32) -> Result<(), BuildError> {
        self.emit_bytes(&x.to_le_bytes())
    }

    pub fn emit_f64(&mut self, x: f64) -> Result<(), BuildError> {
        self.emit_bytes(&x.to_le_bytes())
    }

    /// Overwrite four already-emitted bytes at `pos`.
    pub fn patch_u32(&mut self, pos: usize, x: u32) -> Result<(), BuildError> {
        let len = self.buf.len();
        let slot = pos
            .checked_add(4)
            .and_then(|end| self.buf.get_mut(pos..end))
            .ok_or(BuildError::PatchOutOfBounds { pos, len })?;
        slot.copy_from_slice(&x.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_emitters_are_little_endian() {
        let mut b = Builder::with_capacity(64);
        b.emit_op(Op::Push).unwrap();
        b.emit_i32(-2).unwrap();
        b.emit_u32(0x0102_0304).unwrap();

        assert_eq!(
            b.as_bytes(),
            &[0x01, 0xFE, 0xFF, 0xFF, 0xFF, 0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn test_emit_f64_bit_pattern() {
        let mut b = Builder::with_capacity(8);
        b.emit_f64(1.0).unwrap();
        assert_eq!(b.finish(), 1.0f64.to_le_bytes().to_vec());
    }

    #[test]
    fn test_capacity_is_enforced_without_partial_writes() {
        let mut b = Builder::with_capacity(3);
        b.emit_u8(0).unwrap();

        let err = b.emit_u32(7).unwrap_err();
        assert_eq!(err, BuildError::CapacityExceeded { capacity: 3 });
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_patch_overwrites_placeholder() {
        let mut b = Builder::with_capacity(16);
        b.emit_op(Op::Jmp).unwrap();
        let pos = b.len();
        b.emit_u32(0).unwrap();
        b.patch_u32(pos, 42).unwrap();

        assert_eq!(b.as_bytes(), &[0x12, 42, 0, 0, 0]);
    }

    #[test]
    fn test_patch_past_end_fails() {
        let mut b = Builder::with_capacity(16);
        b.emit_u32(0).unwrap();

        assert_eq!(
            b.patch_u32(1, 5),
            Err(BuildError::PatchOutOfBounds { pos: 1, len: 4 })
        );
        assert_eq!(
            b.patch_u32(usize::MAX, 5),
            Err(BuildError::PatchOutOfBounds {
                pos: usize::MAX,
                len: 4
            })
        );
    }
}
