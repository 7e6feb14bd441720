use std::io::Write;

use tracing::{debug, trace};

use crate::bytecode::{Imm, Instruction, Op, decode};
use crate::lang::value::Value;
use crate::runtime::runtime_error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::trace::{NoTrace, Tracer};

#[derive(Debug, Clone)]
pub struct VmConfig {
    pub max_stack_size: usize,
    pub max_call_depth: usize,
    pub memory_size: usize,
    pub max_steps: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_stack_size: 1024,
            max_call_depth: 1024,
            memory_size: 4096,
            max_steps: None,
        }
    }
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// A `HALT` instruction executed.
    Halted,
    /// The instruction pointer reached or passed the end of the stream.
    EndOfCode,
}

type Step = Result<Option<Exit>, RuntimeErrorKind>;

pub struct Vm {
    stack: Vec<Value>,
    call_stack: Vec<u32>,
    memory: Vec<i32>,
    ip: usize,
    steps: usize,
    config: VmConfig,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            stack: Vec::new(),
            call_stack: Vec::new(),
            memory: vec![0; config.memory_size],
            ip: 0,
            steps: 0,
            config,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn memory(&self) -> &[i32] {
        &self.memory
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Instructions executed by the most recent run.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Offset of the next instruction, or of the failing one after an error.
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Clear both stacks and zero memory.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.call_stack.clear();
        self.memory.fill(0);
        self.ip = 0;
        self.steps = 0;
    }

    pub fn run<W: Write>(&mut self, code: &[u8], out: &mut W) -> Result<Exit, RuntimeError> {
        self.run_traced(code, out, &mut NoTrace)
    }

    /// Execute `code` from offset 0. State left by earlier runs is kept
    /// unless [`Vm::reset`] was called.
    pub fn run_traced<W: Write, T: Tracer + ?Sized>(
        &mut self,
        code: &[u8],
        out: &mut W,
        tracer: &mut T,
    ) -> Result<Exit, RuntimeError> {
        self.ip = 0;
        self.steps = 0;
        debug!(bytes = code.len(), "run started");

        let exit = loop {
            if self.ip >= code.len() {
                break Exit::EndOfCode;
            }

            let at = self.ip;
            let ins = decode(code, at)?;
            let fail = |kind| RuntimeError::new(at, kind);

            self.check_limits().map_err(fail)?;
            tracer
                .before(at, &ins, &self.stack)
                .map_err(|e| fail(e.into()))?;
            trace!(ip = at, op = %ins.op, "dispatch");

            self.ip = at + ins.width();
            match self.execute(&ins, out) {
                Ok(Some(exit)) => break exit,
                Ok(None) => {}
                Err(kind) => {
                    self.ip = at;
                    return Err(fail(kind));
                }
            }
        };

        debug!(?exit, steps = self.steps, "run finished");
        Ok(exit)
    }

    // Execution

    fn check_limits(&mut self) -> Result<(), RuntimeErrorKind> {
        self.steps += 1;

        if let Some(limit) = self.config.max_steps {
            if self.steps > limit {
                return Err(RuntimeErrorKind::StepLimitExceeded { limit });
            }
        }

        Ok(())
    }

    fn execute<W: Write>(&mut self, ins: &Instruction, out: &mut W) -> Step {
        let op = ins.op;

        match (op, ins.imm) {
            (Op::Nop, _) => {}

            // Literals
            (Op::Push, Imm::Int(n)) => self.push(Value::Integer(n))?,
            (Op::PushF, Imm::Float(x)) => self.push(Value::Float(x))?,

            // Integer arithmetic
            (Op::Add, _) => self.binary_int(op, |a, b| Ok(a.wrapping_add(b)))?,
            (Op::Sub, _) => self.binary_int(op, |a, b| Ok(a.wrapping_sub(b)))?,
            (Op::Mul, _) => self.binary_int(op, |a, b| Ok(a.wrapping_mul(b)))?,
            (Op::Div, _) => self.binary_int(op, |a, b| {
                if b == 0 {
                    return Err(RuntimeErrorKind::DivisionByZero);
                }
                Ok(a.wrapping_div(b))
            })?,
            (Op::Mod, _) => self.binary_int(op, |a, b| {
                if b == 0 {
                    return Err(RuntimeErrorKind::ModuloByZero);
                }
                Ok(a.wrapping_rem(b))
            })?,
            (Op::Inc, _) => self.unary_int(op, |a| a.wrapping_add(1))?,
            (Op::Dec, _) => self.unary_int(op, |a| a.wrapping_sub(1))?,
            (Op::Neg, _) => self.unary_int(op, i32::wrapping_neg)?,

            // Float arithmetic
            (Op::AddF, _) => self.binary_float(op, |a, b| a + b)?,
            (Op::MulF, _) => self.binary_float(op, |a, b| a * b)?,

            // Stack operations
            (Op::Dup, _) => {
                let top = *self.stack.last().ok_or(RuntimeErrorKind::StackUnderflow)?;
                self.push(top)?;
            }
            (Op::Pop, _) => {
                self.pop()?;
            }
            (Op::Print, _) => {
                let value = self.pop()?;
                writeln!(out, "{}", value)?;
            }

            // Memory
            (Op::Load, _) => {
                let addr = self.pop_address(op)?;
                self.push(Value::Integer(self.memory[addr]))?;
            }
            (Op::Store, _) => {
                let addr = self.pop_address(op)?;
                let value = self.pop_int(op)?;
                self.memory[addr] = value;
            }

            // Control flow
            (Op::Jmp, Imm::Target(t)) => self.ip = t as usize,
            (Op::Jz, Imm::Target(t)) => {
                if self.pop()?.is_zero() {
                    self.ip = t as usize;
                }
            }
            (Op::Call, Imm::Target(t)) => {
                if self.call_stack.len() >= self.config.max_call_depth {
                    return Err(RuntimeErrorKind::CallStackOverflow {
                        limit: self.config.max_call_depth,
                    });
                }
                // self.ip already points past the target bytes
                self.call_stack.push(self.ip as u32);
                self.ip = t as usize;
            }
            (Op::Ret, _) => {
                let ret = self
                    .call_stack
                    .pop()
                    .ok_or(RuntimeErrorKind::CallStackUnderflow)?;
                self.ip = ret as usize;
            }

            (Op::Halt, _) => return Ok(Some(Exit::Halted)),

            // PUSH/PUSHF/JMP/JZ/CALL handed an immediate of the wrong kind
            (op, imm) => return Err(RuntimeErrorKind::OperandMismatch { op, imm }),
        }

        Ok(None)
    }

    // Stack operations

    fn push(&mut self, value: Value) -> Result<(), RuntimeErrorKind> {
        if self.stack.len() >= self.config.max_stack_size {
            return Err(RuntimeErrorKind::StackOverflow {
                limit: self.config.max_stack_size,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeErrorKind> {
        self.stack.pop().ok_or(RuntimeErrorKind::StackUnderflow)
    }

    fn pop_int(&mut self, op: Op) -> Result<i32, RuntimeErrorKind> {
        match self.pop()? {
            Value::Integer(n) => Ok(n),
            other => Err(type_mismatch(op, "integer", &other)),
        }
    }

    fn pop_float(&mut self, op: Op) -> Result<f64, RuntimeErrorKind> {
        match self.pop()? {
            Value::Float(x) => Ok(x),
            other => Err(type_mismatch(op, "float", &other)),
        }
    }

    fn pop_address(&mut self, op: Op) -> Result<usize, RuntimeErrorKind> {
        let address = match self.pop()? {
            Value::Integer(n) => n,
            other => return Err(type_mismatch(op, "integer address", &other)),
        };

        usize::try_from(address)
            .ok()
            .filter(|&a| a < self.memory.len())
            .ok_or(RuntimeErrorKind::AddressOutOfBounds {
                op,
                address,
                size: self.memory.len(),
            })
    }

    /// Pops `b` then `a` and pushes `f(a, b)`.
    fn binary_int(
        &mut self,
        op: Op,
        f: impl FnOnce(i32, i32) -> Result<i32, RuntimeErrorKind>,
    ) -> Result<(), RuntimeErrorKind> {
        let b = self.pop_int(op)?;
        let a = self.pop_int(op)?;
        self.push(Value::Integer(f(a, b)?))
    }

    fn unary_int(&mut self, op: Op, f: impl FnOnce(i32) -> i32) -> Result<(), RuntimeErrorKind> {
        let a = self.pop_int(op)?;
        self.push(Value::Integer(f(a)))
    }

    fn binary_float(
        &mut self,
        op: Op,
        f: impl FnOnce(f64, f64) -> f64,
    ) -> Result<(), RuntimeErrorKind> {
        let b = self.pop_float(op)?;
        let a = self.pop_float(op)?;
        self.push(Value::Float(f(a, b)))
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

fn type_mismatch(op: Op, expected: &'static str, found: &Value) -> RuntimeErrorKind {
    RuntimeErrorKind::TypeMismatch {
        op,
        expected,
        found: found.type_name(),
    }
}
