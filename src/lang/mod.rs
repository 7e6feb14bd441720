//! # Values
//!
//! The data model shared by the assembler and the VM. Only numeric values
//! exist: the operand stack holds [`value::Value`], memory holds `i32`.

pub mod value;
