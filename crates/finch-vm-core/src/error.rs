//! VM error types

use std::fmt;

use thiserror::Error;

/// VM errors surfaced to the embedder
#[derive(Debug, Error)]
pub enum VmError {
    /// Source failed to compile
    #[error("Compile error: {0}")]
    Compile(#[from] finch_vm_compiler::CompileError),

    /// A runtime error reached the root fiber without a trying caller
    #[error("Runtime error: {message}")]
    Runtime {
        /// Error message carried by the failing fiber
        message: String,
        /// Frames of the fiber that failed first, innermost first
        stack: Vec<StackFrame>,
    },

    /// Core class setup failed
    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    /// The heap grew past `VmConfig::max_heap_objects`
    #[error("OutOfMemory")]
    OutOfMemory,

    /// Internal error
    #[error("InternalError: {0}")]
    Internal(String),
}

impl VmError {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Render the error with its stack trace, one frame per line
    pub fn report(&self) -> String {
        match self {
            Self::Runtime { message, stack } => {
                crate::format::format_stack_trace(message, stack)
                    .trim_end()
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

/// A frame in a runtime error trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Function name
    pub function_name: String,
    /// Line number
    pub line: u32,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] in {}", self.line, self.function_name)
    }
}

/// Result type for VM operations
pub type VmResult<T> = std::result::Result<T, VmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_report() {
        let err = VmError::Runtime {
            message: "boom".to_string(),
            stack: vec![
                StackFrame {
                    function_name: "Foo.bar".to_string(),
                    line: 3,
                },
                StackFrame {
                    function_name: "main".to_string(),
                    line: 7,
                },
            ],
        };
        assert_eq!(err.to_string(), "Runtime error: boom");
        assert_eq!(err.report(), "boom\n[line 3] in Foo.bar\n[line 7] in main");
    }
}
