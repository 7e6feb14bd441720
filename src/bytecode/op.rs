// =============================================================================
// OP - Opcode bytes
// =============================================================================

/// Kind of immediate that follows an opcode byte in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    /// 4-byte little-endian signed integer.
    Int,
    /// 8-byte little-endian IEEE-754 double.
    Float,
    /// 4-byte little-endian unsigned byte offset.
    Target,
}

impl Operand {
    /// Number of immediate bytes after the opcode.
    pub fn width(self) -> usize {
        match self {
            Operand::None => 0,
            Operand::Int | Operand::Target => 4,
            Operand::Float => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Op {
    Nop = 0x00,

    // literals
    Push = 0x01,
    PushF = 0x02,

    // integer arithmetic
    Add = 0x03,
    Sub = 0x04,
    Mul = 0x05,
    Div = 0x06,
    Mod = 0x07,
    Inc = 0x08,
    Dec = 0x09,
    Neg = 0x0A,

    // float arithmetic
    AddF = 0x0B,
    MulF = 0x0C,

    // stack ops
    Dup = 0x0D,
    Print = 0x0E,
    Pop = 0x0F,

    // memory, address on the stack
    Load = 0x10,
    Store = 0x11,

    // ==========================================================================
    // Control flow: absolute byte offsets
    // ==========================================================================
    Jmp = 0x12,
    /// Pop a value, jump if it is integer 0 or float 0.0.
    Jz = 0x13,
    /// Push return offset on the call stack, then jump.
    Call = 0x14,
    Ret = 0x15,

    Halt = 0xFF,
}

impl Op {
    pub const ALL: [Op; 23] = [
        Op::Nop,
        Op::Push,
        Op::PushF,
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Div,
        Op::Mod,
        Op::Inc,
        Op::Dec,
        Op::Neg,
        Op::AddF,
        Op::MulF,
        Op::Dup,
        Op::Print,
        Op::Pop,
        Op::Load,
        Op::Store,
        Op::Jmp,
        Op::Jz,
        Op::Call,
        Op::Ret,
        Op::Halt,
    ];

    pub fn from_byte(byte: u8) -> Option<Op> {
        Some(match byte {
            0x00 => Op::Nop,
            0x01 => Op::Push,
            0x02 => Op::PushF,
            0x03 => Op::Add,
            0x04 => Op::Sub,
            0x05 => Op::Mul,
            0x06 => Op::Div,
            0x07 => Op::Mod,
            0x08 => Op::Inc,
            0x09 => Op::Dec,
            0x0A => Op::Neg,
            0x0B => Op::AddF,
            0x0C => Op::MulF,
            0x0D => Op::Dup,
            0x0E => Op::Print,
            0x0F => Op::Pop,
            0x10 => Op::Load,
            0x11 => Op::Store,
            0x12 => Op::Jmp,
            0x13 => Op::Jz,
            0x14 => Op::Call,
            0x15 => Op::Ret,
            0xFF => Op::Halt,
            _ => return None,
        })
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Look up a mnemonic. Matching is case-insensitive.
    pub fn from_mnemonic(word: &str) -> Option<Op> {
        let upper = word.to_ascii_uppercase();
        Op::ALL.iter().copied().find(|op| op.mnemonic() == upper)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Nop => "NOP",
            Op::Push => "PUSH",
            Op::PushF => "PUSHF",
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::Mod => "MOD",
            Op::Inc => "INC",
            Op::Dec => "DEC",
            Op::Neg => "NEG",
            Op::AddF => "ADDF",
            Op::MulF => "MULF",
            Op::Dup => "DUP",
            Op::Print => "PRINT",
            Op::Pop => "POP",
            Op::Load => "LOAD",
            Op::Store => "STORE",
            Op::Jmp => "JMP",
            Op::Jz => "JZ",
            Op::Call => "CALL",
            Op::Ret => "RET",
            Op::Halt => "HALT",
        }
    }

    pub fn operand(self) -> Operand {
        match self {
            Op::Push => Operand::Int,
            Op::PushF => Operand::Float,
            Op::Jmp | Op::Jz | Op::Call => Operand::Target,
            _ => Operand::None,
        }
    }

    /// Encoded length of the whole instruction, opcode included.
    pub fn encoded_len(self) -> usize {
        1 + self.operand().width()
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_op_roundtrips_through_its_byte() {
        for op in Op::ALL {
            assert_eq!(Op::from_byte(op.byte()), Some(op));
        }
    }

    #[test]
    fn test_unassigned_bytes_are_not_ops() {
        assert_eq!(Op::from_byte(0x16), None);
        assert_eq!(Op::from_byte(0xFE), None);
    }

    #[test]
    fn test_mnemonic_lookup_ignores_case() {
        assert_eq!(Op::from_mnemonic("push"), Some(Op::Push));
        assert_eq!(Op::from_mnemonic("PushF"), Some(Op::PushF));
        assert_eq!(Op::from_mnemonic("halt"), Some(Op::Halt));
        assert_eq!(Op::from_mnemonic("SWAP"), None);
    }

    #[test]
    fn test_encoded_lengths() {
        assert_eq!(Op::Add.encoded_len(), 1);
        assert_eq!(Op::Push.encoded_len(), 5);
        assert_eq!(Op::PushF.encoded_len(), 9);
        assert_eq!(Op::Call.encoded_len(), 5);
    }
}
