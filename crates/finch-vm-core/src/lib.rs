//! # Finch VM Core
//!
//! Execution engine for the Finch scripting language: object model, fibers,
//! the bytecode interpreter and the core class library.
//!
//! ## Design Principles
//!
//! - **Everything is an object**: every value has a class, every class is an
//!   object, and `Object`/`Class` close the loop
//! - **Fibers**: cooperative coroutines with their own stacks; control moves
//!   between them only through the Fiber primitives
//! - **Tagged primitive results**: native methods report values, errors, tail
//!   calls and fiber switches as data, never by unwinding
//! - **Arena heap**: objects are addressed by stable indices

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod fiber;
pub mod format;
pub mod interpreter;
pub mod intrinsics;
pub mod intrinsics_impl;
pub mod memory;
pub mod object;
pub mod primitive;
pub mod symbol;
pub mod value;
pub mod vm;

pub use config::VmConfig;
pub use error::{StackFrame, VmError, VmResult};
pub use fiber::FiberState;
pub use intrinsics::CoreClasses;
pub use primitive::PrimitiveResult;
pub use value::{ObjRef, Value};
pub use vm::Vm;
