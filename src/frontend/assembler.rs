use std::collections::HashMap;

use tracing::debug;

use crate::{
    bytecode::{BuildError, Builder, Op, Operand},
    frontend::{
        assemble_error::{AssembleError, AssembleErrorKind},
        lexer::{Lexer, SourceLine, Spanned, is_numeric_token, parse_integer},
    },
};

/// Static capacity limits for one assembly run.
#[derive(Debug, Clone)]
pub struct AsmLimits {
    pub code_capacity: usize,
    pub max_labels: usize,
    pub max_relocations: usize,
}

impl Default for AsmLimits {
    fn default() -> Self {
        AsmLimits {
            code_capacity: 131_072,
            max_labels: 2048,
            max_relocations: 2048,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Label {
    offset: u32,
    line: usize,
}

/// A jump/call target that named a label, to be patched once every label
/// is known.
#[derive(Debug, Clone)]
struct Relocation {
    label: String,
    patch_pos: usize,
    line: usize,
}

/// Assemble with default limits.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssembleError> {
    Assembler::new().assemble(source)
}

pub struct Assembler {
    limits: AsmLimits,

    /// Output stream
    builder: Builder,

    labels: HashMap<String, Label>,

    /// Forward (and backward) label references, in source order
    relocations: Vec<Relocation>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::with_limits(AsmLimits::default())
    }

    pub fn with_limits(limits: AsmLimits) -> Self {
        Self {
            builder: Builder::with_capacity(limits.code_capacity),
            labels: HashMap::new(),
            relocations: Vec::new(),
            limits,
        }
    }

    /// Run both passes and return the finished stream.
    pub fn assemble(mut self, source: &str) -> Result<Vec<u8>, AssembleError> {
        let lines = Lexer::new(source).tokenize()?;

        for line in &lines {
            self.assemble_line(line)?;
        }

        self.resolve_relocations()?;

        debug!(
            bytes = self.builder.len(),
            labels = self.labels.len(),
            relocations = self.relocations.len(),
            "assembly finished"
        );

        Ok(self.builder.finish())
    }

    fn assemble_line(&mut self, line: &SourceLine<'_>) -> Result<(), AssembleError> {
        if let Some(label) = &line.label {
            self.define_label(label)?;
        }

        let Some((head, operands)) = line.tokens.split_first() else {
            return Ok(());
        };

        let op = Op::from_mnemonic(head.text).ok_or_else(|| {
            AssembleError::at(
                line.line,
                AssembleErrorKind::UnknownMnemonic(head.text.to_string()),
            )
        })?;

        let expects = match op.operand() {
            Operand::None => 0,
            _ => 1,
        };
        if let Some(extra) = operands.get(expects) {
            return Err(AssembleError::at(
                line.line,
                AssembleErrorKind::UnexpectedOperand {
                    mnemonic: op.mnemonic(),
                    token: extra.text.to_string(),
                },
            ));
        }

        self.emit_instruction(op, operands.first(), line.line)
            .map_err(|kind| AssembleError::at(line.line, kind))
    }

    fn define_label(&mut self, label: &Spanned<'_>) -> Result<(), AssembleError> {
        let line = label.span.line;

        if let Some(existing) = self.labels.get(label.text) {
            return Err(AssembleError::at(
                line,
                AssembleErrorKind::DuplicateLabel {
                    name: label.text.to_string(),
                    first_line: existing.line,
                },
            ));
        }
        if self.labels.len() >= self.limits.max_labels {
            return Err(AssembleError::at(
                line,
                AssembleErrorKind::TooManyLabels {
                    limit: self.limits.max_labels,
                },
            ));
        }

        let offset = self.current_offset().map_err(|k| AssembleError::at(line, k))?;
        debug!(label = label.text, offset, "label defined");
        self.labels
            .insert(label.text.to_string(), Label { offset, line });
        Ok(())
    }

    fn current_offset(&self) -> Result<u32, AssembleErrorKind> {
        u32::try_from(self.builder.len()).map_err(|_| {
            BuildError::CapacityExceeded {
                capacity: self.limits.code_capacity,
            }
            .into()
        })
    }

    fn emit_instruction(
        &mut self,
        op: Op,
        operand: Option<&Spanned<'_>>,
        line: usize,
    ) -> Result<(), AssembleErrorKind> {
        let missing = |expected| AssembleErrorKind::MissingOperand {
            mnemonic: op.mnemonic(),
            expected,
        };

        match op.operand() {
            Operand::None => {
                self.builder.emit_op(op)?;
            }
            Operand::Int => {
                let token = operand.ok_or_else(|| missing("integer"))?;
                let value = parse_i32(token.text)?;
                self.builder.emit_op(op)?;
                self.builder.emit_i32(value)?;
            }
            Operand::Float => {
                let token = operand.ok_or_else(|| missing("float"))?;
                let value = token
                    .text
                    .parse::<f64>()
                    .map_err(|_| AssembleErrorKind::MalformedFloat(token.text.to_string()))?;
                self.builder.emit_op(op)?;
                self.builder.emit_f64(value)?;
            }
            Operand::Target => {
                let token = operand.ok_or_else(|| missing("target"))?;
                self.builder.emit_op(op)?;
                self.emit_target(token, line)?;
            }
        }

        Ok(())
    }

    fn emit_target(&mut self, token: &Spanned<'_>, line: usize) -> Result<(), AssembleErrorKind> {
        if is_numeric_token(token.text) {
            // Negative offsets keep their bit pattern: -4 is 0xFFFFFFFC.
            let offset = parse_integer(token.text)
                .filter(|n| (i64::from(i32::MIN)..=i64::from(u32::MAX)).contains(n))
                .map(|n| n as u32)
                .ok_or_else(|| AssembleErrorKind::TargetOutOfRange(token.text.to_string()))?;
            self.builder.emit_u32(offset)?;
            return Ok(());
        }

        if self.relocations.len() >= self.limits.max_relocations {
            return Err(AssembleErrorKind::TooManyRelocations {
                limit: self.limits.max_relocations,
            });
        }

        let patch_pos = self.builder.len();
        self.builder.emit_u32(0)?;
        self.relocations.push(Relocation {
            label: token.text.to_string(),
            patch_pos,
            line,
        });
        Ok(())
    }

    fn resolve_relocations(&mut self) -> Result<(), AssembleError> {
        for reloc in &self.relocations {
            let label = self.labels.get(&reloc.label).ok_or_else(|| {
                AssembleError::at(
                    reloc.line,
                    AssembleErrorKind::UndefinedLabel(reloc.label.clone()),
                )
            })?;

            self.builder
                .patch_u32(reloc.patch_pos, label.offset)
                .map_err(|e| AssembleError::at(reloc.line, e.into()))?;
            debug!(
                label = reloc.label.as_str(),
                at = reloc.patch_pos,
                target = label.offset,
                "relocation patched"
            );
        }
        Ok(())
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer immediates accept any 32-bit pattern: the signed range, plus
/// unsigned values up to `u32::MAX`, which wrap (so `0xFFFFFFFF` is -1).
fn parse_i32(text: &str) -> Result<i32, AssembleErrorKind> {
    let n = parse_integer(text)
        .ok_or_else(|| AssembleErrorKind::MalformedInteger(text.to_string()))?;

    if let Ok(v) = i32::try_from(n) {
        return Ok(v);
    }
    u32::try_from(n)
        .map(|v| v as i32)
        .map_err(|_| AssembleErrorKind::IntegerOutOfRange(text.to_string()))
}
