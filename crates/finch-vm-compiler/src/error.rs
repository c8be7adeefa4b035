//! Compilation errors

use finch_vm_bytecode::BytecodeError;
use thiserror::Error;

/// Compilation errors
#[derive(Debug, Error)]
pub enum CompileError {
    /// Invalid character or malformed literal
    #[error("[line {line}] Lex error: {message}")]
    Lex {
        /// Error message
        message: String,
        /// Source line (1-indexed)
        line: u32,
    },

    /// Syntax error
    #[error("[line {line}] Error at '{token}': {message}")]
    Syntax {
        /// Error message
        message: String,
        /// Offending token text
        token: String,
        /// Source line (1-indexed)
        line: u32,
    },

    /// Name resolution error (undefined variable, misplaced `this`, ...)
    #[error("[line {line}] Error: {message}")]
    Resolve {
        /// Error message
        message: String,
        /// Source line (1-indexed)
        line: u32,
    },

    /// A compiler limit was exceeded
    #[error("[line {line}] Error: {message}")]
    Limit {
        /// Error message
        message: String,
        /// Source line (1-indexed)
        line: u32,
    },

    /// Bytecode construction failed
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),
}

impl CompileError {
    /// Create a lex error
    pub fn lex(message: impl Into<String>, line: u32) -> Self {
        Self::Lex {
            message: message.into(),
            line,
        }
    }

    /// Create a syntax error
    pub fn syntax(message: impl Into<String>, token: impl Into<String>, line: u32) -> Self {
        Self::Syntax {
            message: message.into(),
            token: token.into(),
            line,
        }
    }

    /// Create a resolution error
    pub fn resolve(message: impl Into<String>, line: u32) -> Self {
        Self::Resolve {
            message: message.into(),
            line,
        }
    }

    /// Create a limit error
    pub fn limit(message: impl Into<String>, line: u32) -> Self {
        Self::Limit {
            message: message.into(),
            line,
        }
    }

    /// Source line the error was reported at, if known
    pub fn line(&self) -> Option<u32> {
        match self {
            Self::Lex { line, .. }
            | Self::Syntax { line, .. }
            | Self::Resolve { line, .. }
            | Self::Limit { line, .. } => Some(*line),
            Self::Bytecode(_) => None,
        }
    }
}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;
