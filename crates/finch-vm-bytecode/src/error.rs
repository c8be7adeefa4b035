//! Bytecode errors

use thiserror::Error;

/// Errors that can occur while building or inspecting bytecode
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Constant pool exhausted
    #[error("Too many constants (max {0})")]
    TooManyConstants(usize),

    /// JSON dump failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;
