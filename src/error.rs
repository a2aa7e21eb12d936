//! The closed error taxonomy the VM raises. Kept as a hand-rolled enum
//! (no `thiserror`) so it stays a plain, matchable value all the way up
//! to the interpreter loop, which needs to inspect it before wrapping.

use std::fmt;

use crate::memory::Segment;
use crate::tagged::Tag;

pub type Result<T> = std::result::Result<T, VmError>;

#[derive(Clone, Debug, PartialEq)]
pub enum VmError {
    StackOverflow { op: &'static str },
    StackUnderflow { op: &'static str, needed: usize, have: usize },
    ReturnStackOverflow,
    ReturnStackUnderflow,
    InvalidOpcode(u16),
    InvalidOpcodeAddress(u32),
    InvalidTag { expected: &'static str, found: Tag },
    TypeError { op: &'static str, found: Tag },
    MemoryAccess { segment: Segment, offset: usize },
    UndefinedWord(String),
    WordAlreadyDefined(String),
    UnclosedDefinition,
    NestedDefinition,
    Syntax { line: usize, column: usize, message: String },
    UnexpectedToken { line: usize, column: usize, found: String },
    UnterminatedString { line: usize, column: usize },
    SymbolNotFound(String),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::StackOverflow { op } => {
                write!(f, "stack overflow in '{op}'")
            }
            VmError::StackUnderflow { op, needed, have } => write!(
                f,
                "stack underflow in '{op}': needed {needed}, have {have}"
            ),
            VmError::ReturnStackOverflow => write!(f, "return stack overflow"),
            VmError::ReturnStackUnderflow => {
                write!(f, "return stack underflow")
            }
            VmError::InvalidOpcode(op) => write!(f, "invalid opcode {op:#x}"),
            VmError::InvalidOpcodeAddress(addr) => {
                write!(f, "invalid opcode address {addr:#x}")
            }
            VmError::InvalidTag { expected, found } => {
                write!(f, "expected {expected} tag, found {found:?}")
            }
            VmError::TypeError { op, found } => {
                write!(f, "type error in '{op}': unexpected {found:?}")
            }
            VmError::MemoryAccess { segment, offset } => {
                write!(f, "memory access out of range: {segment:?}+{offset:#x}")
            }
            VmError::UndefinedWord(name) => write!(f, "undefined word '{name}'"),
            VmError::WordAlreadyDefined(name) => {
                write!(f, "word '{name}' already defined")
            }
            VmError::UnclosedDefinition => write!(f, "unclosed definition"),
            VmError::NestedDefinition => write!(f, "nested definition"),
            VmError::Syntax { line, column, message } => {
                write!(f, "syntax error at {line}:{column}: {message}")
            }
            VmError::UnexpectedToken { line, column, found } => {
                write!(f, "unexpected token '{found}' at {line}:{column}")
            }
            VmError::UnterminatedString { line, column } => {
                write!(f, "unterminated string starting at {line}:{column}")
            }
            VmError::SymbolNotFound(name) => {
                write!(f, "symbol not found: '{name}'")
            }
        }
    }
}

impl std::error::Error for VmError {}
