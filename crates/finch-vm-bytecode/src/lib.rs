//! # Finch VM Bytecode
//!
//! This crate defines the compiled form of Finch programs: the stack-based
//! instruction set, compiled function prototypes and method signatures.
//!
//! ## Design Principles
//!
//! - **Stack-based**: every fiber owns a value stack; slot 0 of a call frame
//!   holds the receiver
//! - **Symbolic calls**: method calls carry an interned method symbol, never a
//!   string, so dispatch is a table index
//! - **Serializable**: functions can be dumped as JSON for debugging

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constant;
pub mod error;
pub mod function;
pub mod instruction;
pub mod operand;
pub mod signature;

pub use constant::{Constant, ConstantPool};
pub use error::{BytecodeError, Result};
pub use function::{Function, UpvalueCapture};
pub use instruction::Instruction;
pub use operand::{ConstantIndex, FieldIndex, GlobalIndex, JumpOffset, LocalIndex, SymbolIndex};
pub use signature::{Signature, SignatureKind};

/// Maximum number of arguments a method call can pass (excluding the receiver).
pub const MAX_PARAMETERS: usize = 16;

/// Maximum number of fields a class can declare, including inherited ones.
pub const MAX_FIELDS: usize = 255;
