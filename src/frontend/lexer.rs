//! Line-oriented tokenizer for assembly source.
//!
//! Each non-blank line yields a [`SourceLine`]: an optional label and the
//! instruction tokens that follow it. Comments start at `;` or `#` and run
//! to the end of the line. Tokens are separated by whitespace or commas.

use crate::frontend::assemble_error::{AssembleError, AssembleErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<'a> {
    pub text: &'a str,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine<'a> {
    pub line: usize,
    pub label: Option<Spanned<'a>>,
    /// Mnemonic first, then operands. Empty for a label-only line.
    pub tokens: Vec<Spanned<'a>>,
}

pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { source }
    }

    pub fn tokenize(&self) -> Result<Vec<SourceLine<'a>>, AssembleError> {
        let mut lines = Vec::new();

        for (idx, raw) in self.source.lines().enumerate() {
            if let Some(line) = lex_line(raw, idx + 1)? {
                lines.push(line);
            }
        }

        Ok(lines)
    }
}

fn strip_comment(raw: &str) -> &str {
    match raw.find([';', '#']) {
        Some(pos) => &raw[..pos],
        None => raw,
    }
}

fn lex_line(raw: &str, line: usize) -> Result<Option<SourceLine<'_>>, AssembleError> {
    let code = strip_comment(raw);
    if code.trim().is_empty() {
        return Ok(None);
    }

    let (label, rest, rest_at) = match code.find(':') {
        Some(colon) => {
            let head = &code[..colon];
            let name = head.trim();
            if name.is_empty() {
                return Err(AssembleError::at(line, AssembleErrorKind::EmptyLabel));
            }
            if !is_valid_label(name) {
                return Err(AssembleError::at(
                    line,
                    AssembleErrorKind::InvalidLabel(name.to_string()),
                ));
            }
            let col = head.len() - head.trim_start().len() + 1;
            let label = Spanned {
                text: name,
                span: Span { line, col },
            };
            (Some(label), &code[colon + 1..], colon + 1)
        }
        None => (None, code, 0),
    };

    Ok(Some(SourceLine {
        line,
        label,
        tokens: split_tokens(rest, line, rest_at),
    }))
}

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || ch == ','
}

/// Split on whitespace and commas. `base` is the byte offset of `text`
/// within its line, used for 1-based columns.
fn split_tokens(text: &str, line: usize, base: usize) -> Vec<Spanned<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, ch) in text.char_indices() {
        match (start, is_delimiter(ch)) {
            (None, false) => start = Some(i),
            (Some(s), true) => {
                tokens.push(spanned(text, s, i, line, base));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(spanned(text, s, text.len(), line, base));
    }

    tokens
}

fn spanned(text: &str, start: usize, end: usize, line: usize, base: usize) -> Spanned<'_> {
    Spanned {
        text: &text[start..end],
        span: Span {
            line,
            col: base + start + 1,
        },
    }
}

/// Labels are single tokens that cannot be mistaken for a numeric offset.
fn is_valid_label(name: &str) -> bool {
    !name.chars().any(is_delimiter) && !is_numeric_token(name)
}

/// Optional sign, then either `0x`/`0X` followed by hex digits or plain
/// decimal digits. At least one digit is required.
pub fn is_numeric_token(token: &str) -> bool {
    let unsigned = token.strip_prefix(['+', '-']).unwrap_or(token);
    match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => !unsigned.is_empty() && unsigned.chars().all(|c| c.is_ascii_digit()),
    }
}

/// Parse a numeric token as accepted by [`is_numeric_token`].
pub fn parse_integer(token: &str) -> Option<i64> {
    if !is_numeric_token(token) {
        return None;
    }

    let (negative, unsigned) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };

    let magnitude = match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => unsigned.parse::<i64>().ok()?,
    };

    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex(source: &str) -> Vec<SourceLine<'_>> {
        Lexer::new(source).tokenize().expect("lexing should succeed")
    }

    fn texts<'a>(line: &SourceLine<'a>) -> Vec<&'a str> {
        line.tokens.iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        let lines = lex("\n   \n; comment\n# other\n\t\n");
        assert!(lines.is_empty());
    }

    #[test]
    fn test_line_numbers_count_blank_lines() {
        let lines = lex("\n\nPUSH 1\n\nHALT");
        assert_eq!(lines[0].line, 3);
        assert_eq!(lines[1].line, 5);
    }

    #[test]
    fn test_tokens_split_on_whitespace_and_commas() {
        let lines = lex("  push\t5 ,  6");
        assert_eq!(texts(&lines[0]), vec!["push", "5", "6"]);
    }

    #[test]
    fn test_trailing_comment_is_stripped() {
        let lines = lex("PUSH 1 ; push: one\nADD # add");
        assert_eq!(texts(&lines[0]), vec!["PUSH", "1"]);
        assert!(lines[0].label.is_none());
        assert_eq!(texts(&lines[1]), vec!["ADD"]);
    }

    #[test]
    fn test_label_with_instruction() {
        let lines = lex("  loop:  DEC");
        let label = lines[0].label.as_ref().unwrap();
        assert_eq!(label.text, "loop");
        assert_eq!(label.span, Span { line: 1, col: 3 });
        assert_eq!(texts(&lines[0]), vec!["DEC"]);
        assert_eq!(lines[0].tokens[0].span.col, 10);
    }

    #[test]
    fn test_label_only_line() {
        let lines = lex("end:");
        assert_eq!(lines[0].label.as_ref().unwrap().text, "end");
        assert!(lines[0].tokens.is_empty());
    }

    #[test]
    fn test_empty_label_is_an_error() {
        let err = Lexer::new("PUSH 1\n  : HALT").tokenize().unwrap_err();
        assert_eq!(err, AssembleError::at(2, AssembleErrorKind::EmptyLabel));
    }

    #[test]
    fn test_label_with_spaces_is_invalid() {
        let err = Lexer::new("PUSH 1: HALT").tokenize().unwrap_err();
        assert_eq!(
            err.kind,
            AssembleErrorKind::InvalidLabel("PUSH 1".to_string())
        );
    }

    #[test]
    fn test_numeric_label_is_invalid() {
        let err = Lexer::new("0x10: NOP").tokenize().unwrap_err();
        assert_eq!(err.kind, AssembleErrorKind::InvalidLabel("0x10".to_string()));
    }

    #[test]
    fn test_crlf_line_endings() {
        let lines = lex("PUSH 1\r\nPRINT\r\n");
        assert_eq!(texts(&lines[0]), vec!["PUSH", "1"]);
        assert_eq!(texts(&lines[1]), vec!["PRINT"]);
    }

    #[test]
    fn test_is_numeric_token() {
        assert!(is_numeric_token("42"));
        assert!(is_numeric_token("-42"));
        assert!(is_numeric_token("+7"));
        assert!(is_numeric_token("0x1F"));
        assert!(is_numeric_token("-0XfF"));
        assert!(!is_numeric_token("0x"));
        assert!(!is_numeric_token("-"));
        assert!(!is_numeric_token("12ab"));
        assert!(!is_numeric_token("loop"));
        assert!(!is_numeric_token(""));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("10"), Some(10));
        assert_eq!(parse_integer("-0x10"), Some(-16));
        assert_eq!(parse_integer("0xFFFFFFFF"), Some(0xFFFF_FFFF));
        assert_eq!(parse_integer("1.5"), None);
        assert_eq!(parse_integer("99999999999999999999999"), None);
    }
}
