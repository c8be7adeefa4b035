//! Constant pool for compiled functions

use serde::{Deserialize, Serialize};

use crate::error::{BytecodeError, Result};
use crate::function::Function;
use crate::operand::ConstantIndex;

/// Largest constant pool a single function may use
pub const MAX_CONSTANTS: usize = u32::MAX as usize;

/// A constant value in the constant pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    /// 64-bit floating point number
    Number(f64),
    /// String literal (raw bytes, the VM is not code-point aware)
    String(Vec<u8>),
    /// Nested function prototype (blocks, methods)
    Function(Box<Function>),
}

impl Constant {
    /// Create a string constant from UTF-8 text
    #[inline]
    pub fn string(s: &str) -> Self {
        Self::String(s.as_bytes().to_vec())
    }

    /// Get number value if this is a number
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get nested function if this is a function
    #[inline]
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }
}

/// Constant pool with deduplication of numbers and strings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstantPool {
    constants: Vec<Constant>,
}

impl ConstantPool {
    /// Create a new empty constant pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant, reusing an existing equal number or string
    pub fn add(&mut self, constant: Constant) -> Result<ConstantIndex> {
        if !matches!(constant, Constant::Function(_)) {
            let existing = self.constants.iter().position(|c| match (c, &constant) {
                // Compare bits so that 0 and -0 stay distinct constants.
                (Constant::Number(a), Constant::Number(b)) => a.to_bits() == b.to_bits(),
                (Constant::String(a), Constant::String(b)) => a == b,
                _ => false,
            });
            if let Some(idx) = existing {
                return Ok(ConstantIndex::new(idx as u32));
            }
        }

        if self.constants.len() >= MAX_CONSTANTS {
            return Err(BytecodeError::TooManyConstants(MAX_CONSTANTS));
        }
        self.constants.push(constant);
        Ok(ConstantIndex::new((self.constants.len() - 1) as u32))
    }

    /// Add a number constant
    pub fn add_number(&mut self, n: f64) -> Result<ConstantIndex> {
        self.add(Constant::Number(n))
    }

    /// Add a string constant
    pub fn add_string(&mut self, s: &[u8]) -> Result<ConstantIndex> {
        self.add(Constant::String(s.to_vec()))
    }

    /// Get a constant by index
    pub fn get(&self, index: ConstantIndex) -> Option<&Constant> {
        self.constants.get(index.index())
    }

    /// Number of constants
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Iterate over constants in index order
    pub fn iter(&self) -> impl Iterator<Item = &Constant> {
        self.constants.iter()
    }

    pub(crate) fn for_each_function_mut(&mut self, mut f: impl FnMut(&mut Function)) {
        for constant in &mut self.constants {
            if let Constant::Function(func) = constant {
                f(func);
            }
        }
    }
}
