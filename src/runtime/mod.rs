pub mod runtime_error;
pub mod trace;
pub mod vm;

pub use runtime_error::{RuntimeError, RuntimeErrorKind};
pub use trace::{NoTrace, TracePrinter, Tracer};
pub use vm::{Exit, Vm, VmConfig};
