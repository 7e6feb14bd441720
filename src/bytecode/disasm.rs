use std::collections::BTreeSet;

use crate::bytecode::{Imm, Instruction, Instructions, Op};

/// Print disassembly of an instruction stream
pub fn print_bc(name: &str, code: &[u8]) {
    print!("{}", disassemble(name, code));
}

/// Render a stream as an offset-annotated listing.
///
/// Offsets that some `JMP`/`JZ`/`CALL` points at get a `►` marker. A decode
/// error ends the listing with an `error` line at the failing offset.
pub fn disassemble(name: &str, code: &[u8]) -> String {
    let mut out = String::new();
    let decoded: Vec<_> = Instructions::new(code).collect();
    let count = decoded.iter().filter(|(_, r)| r.is_ok()).count();
    let jump_targets = collect_jump_targets(&decoded);

    let rule = "═".repeat(40);
    out.push_str(&format!("{}\n {}\n", rule, name));
    out.push_str(&format!(" {} bytes, {} instructions\n{}\n", code.len(), count, rule));

    for (at, result) in &decoded {
        match result {
            Ok(ins) => {
                if jump_targets.contains(at) {
                    out.push_str("      ┌──────────────────────────────────\n");
                    out.push_str(&format!("{:04} ► ", at));
                } else {
                    out.push_str(&format!("{:04}   ", at));
                }
                out.push_str(&format_op(ins, *at));
                out.push('\n');
            }
            Err(e) => out.push_str(&format!("{:04}   error: {}\n", at, e)),
        }
    }

    for target in jump_targets.range(code.len()..) {
        out.push_str(&format!("{:04}   <end of code>\n", target));
    }

    out
}

fn collect_jump_targets(
    decoded: &[(usize, Result<Instruction, crate::bytecode::DecodeError>)],
) -> BTreeSet<usize> {
    decoded
        .iter()
        .filter_map(|(_, r)| r.as_ref().ok())
        .filter_map(|ins| ins.target())
        .map(|t| t as usize)
        .collect()
}

fn format_op(ins: &Instruction, at: usize) -> String {
    match (ins.op, ins.imm) {
        (Op::Push, Imm::Int(n)) => format!("PUSH        {}", n),
        (Op::PushF, Imm::Float(x)) => format!("PUSHF       {:?}", x),

        (Op::Jmp | Op::Jz | Op::Call, Imm::Target(t)) => {
            let direction = if (t as usize) <= at { "↑" } else { "↓" };
            format!("{:<11} {:04} {}", ins.op.mnemonic(), t, direction)
        }

        (Op::Add, _) => "ADD         ; ( a b -- a+b )".to_string(),
        (Op::Sub, _) => "SUB         ; ( a b -- a-b )".to_string(),
        (Op::Mul, _) => "MUL         ; ( a b -- a*b )".to_string(),
        (Op::Div, _) => "DIV         ; ( a b -- a/b )".to_string(),
        (Op::Mod, _) => "MOD         ; ( a b -- a%b )".to_string(),
        (Op::AddF, _) => "ADDF        ; ( x y -- x+y )".to_string(),
        (Op::MulF, _) => "MULF        ; ( x y -- x*y )".to_string(),
        (Op::Dup, _) => "DUP         ; ( a -- a a )".to_string(),
        (Op::Pop, _) => "POP         ; ( a -- )".to_string(),
        (Op::Print, _) => "PRINT       ; ( value -- )".to_string(),
        (Op::Load, _) => "LOAD        ; ( addr -- n )".to_string(),
        (Op::Store, _) => "STORE       ; ( n addr -- )".to_string(),

        (op, _) => op.mnemonic().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::assembler::assemble;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_listing_shows_offsets_and_operands() {
        let code = assemble("PUSH 7\nPRINT\nHALT\n").unwrap();
        let text = disassemble("main", &code);

        assert!(text.contains(" 7 bytes, 3 instructions"));
        assert!(text.contains("0000   PUSH        7"));
        assert!(text.contains("0005   PRINT"));
        assert!(text.contains("0006   HALT"));
    }

    #[test]
    fn test_full_listing_layout() {
        let code = assemble("top: PUSH 1\nJMP top\n").unwrap();
        let rule = "═".repeat(40);
        let expected = format!(
            "{rule}\n loop\n 10 bytes, 2 instructions\n{rule}\n\
             \x20     ┌──────────────────────────────────\n\
             0000 ► PUSH        1\n\
             0005   JMP         0000 ↑\n"
        );
        assert_eq!(disassemble("loop", &code), expected);
    }

    #[test]
    fn test_jump_targets_are_marked() {
        let code = assemble("top: PUSH 0\nJZ top\n").unwrap();
        let text = disassemble("loop", &code);

        assert!(text.contains("0000 ► PUSH        0"));
        assert!(text.contains("JZ          0000 ↑"));
    }

    #[test]
    fn test_target_past_end_is_listed() {
        let code = assemble("JMP 0x40\n").unwrap();
        let text = disassemble("main", &code);
        assert!(text.contains("0064   <end of code>"));
    }

    #[test]
    fn test_float_operand_keeps_fraction() {
        let code = assemble("PUSHF 2\n").unwrap();
        assert!(disassemble("f", &code).contains("PUSHF       2.0"));
    }

    #[test]
    fn test_decode_error_is_reported_inline() {
        let text = disassemble("bad", &[0x00, 0x77]);
        assert!(text.contains("0001   error: unknown opcode 77 at 1"));
    }
}
