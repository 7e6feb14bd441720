use std::io::{self, Write};

use crate::bytecode::Op;
use crate::frontend::lexer::{SourceLine, Spanned, is_numeric_token};

pub struct TokenDumper {
    pub color: bool,
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self { color: true }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn dump(&self, lines: &[SourceLine<'_>]) -> io::Result<()> {
        let stdout = io::stdout();
        self.write_to(&mut stdout.lock(), lines)
    }

    pub fn write_to<W: Write>(&self, out: &mut W, lines: &[SourceLine<'_>]) -> io::Result<()> {
        for line in lines {
            if let Some(label) = &line.label {
                self.print_one(out, label, "LABEL", Self::GRN)?;
            }
            for (i, token) in line.tokens.iter().enumerate() {
                let (kind, colr) = self.kind(i, token);
                self.print_one(out, token, kind, colr)?;
            }
        }
        Ok(())
    }

    fn print_one<W: Write>(
        &self,
        out: &mut W,
        s: &Spanned<'_>,
        kind: &str,
        colr: &str,
    ) -> io::Result<()> {
        let (colr, reset) = if self.color {
            (colr, Self::RESET)
        } else {
            ("", "")
        };
        writeln!(
            out,
            "[{:02}:{:02}] {}{:<8} {}{}",
            s.span.line, s.span.col, colr, kind, s.text, reset
        )
    }

    /// The first token of a line is the mnemonic; later ones are operands.
    fn kind(&self, index: usize, token: &Spanned<'_>) -> (&'static str, &'static str) {
        if index == 0 {
            if Op::from_mnemonic(token.text).is_some() {
                ("OP", Self::MAG)
            } else {
                ("UNKNOWN", Self::RESET)
            }
        } else if is_numeric_token(token.text) {
            ("INT", Self::CYN)
        } else if token.text.parse::<f64>().is_ok() {
            ("FLOAT", Self::CYN)
        } else {
            ("IDENT", Self::YEL)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn dump(source: &str) -> String {
        let lines = Lexer::new(source).tokenize().unwrap();
        let mut out = Vec::new();
        TokenDumper::new()
            .no_color()
            .write_to(&mut out, &lines)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_dump_classifies_tokens() {
        let text = dump("start: PUSH 0x2\nPUSHF 1.5\nJMP start\n");
        assert_eq!(
            text,
            "[01:01] LABEL    start\n\
             [01:08] OP       PUSH\n\
             [01:13] INT      0x2\n\
             [02:01] OP       PUSHF\n\
             [02:07] FLOAT    1.5\n\
             [03:01] OP       JMP\n\
             [03:05] IDENT    start\n"
        );
    }

    #[test]
    fn test_unknown_mnemonic_is_flagged() {
        assert!(dump("SWAP").contains("UNKNOWN  SWAP"));
    }

    #[test]
    fn test_color_codes_only_when_enabled() {
        let lines = Lexer::new("NOP").tokenize().unwrap();
        let mut out = Vec::new();
        TokenDumper::new().write_to(&mut out, &lines).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\x1b[35m"));
        assert!(!dump("NOP").contains('\x1b'));
    }
}
