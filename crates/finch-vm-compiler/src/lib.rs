//! # Finch VM Compiler
//!
//! Compiles Finch source code to bytecode.
//!
//! ## Pipeline
//!
//! 1. Tokenize with a `logos` lexer
//! 2. Parse tokens into a syntax tree
//! 3. Walk the tree and generate bytecode, resolving method symbols and
//!    globals through a [`SymbolResolver`] supplied by the VM

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod ast;
pub mod codegen;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod scope;

pub use compiler::{Compiler, SymbolResolver, compile};
pub use error::{CompileError, CompileResult};
