//! Bytecode operands

use serde::{Deserialize, Serialize};

/// Index into a function's constant pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConstantIndex(pub u32);

impl ConstantIndex {
    /// Create a new constant index
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get index value
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stack slot relative to the start of the current call frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct LocalIndex(pub u16);

impl LocalIndex {
    /// Create a new local index
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Get index value
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Slot in the VM's global variable table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct GlobalIndex(pub u32);

impl GlobalIndex {
    /// Get index value
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interned method symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SymbolIndex(pub u32);

impl SymbolIndex {
    /// Get index value
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Field slot of an instance, relative to the declaring class
///
/// The VM shifts field operands by the superclass field count when a method
/// is bound to a subclass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FieldIndex(pub u8);

impl FieldIndex {
    /// Get index value
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Jump offset (signed, relative to the jumping instruction)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct JumpOffset(pub i32);

impl JumpOffset {
    /// Create a new jump offset
    #[inline]
    pub const fn new(offset: i32) -> Self {
        Self(offset)
    }

    /// Get offset value
    #[inline]
    pub const fn offset(self) -> i32 {
        self.0
    }

    /// Resolve the absolute target of a jump located at `ip`
    #[inline]
    pub fn target(self, ip: usize) -> usize {
        (ip as i64 + self.0 as i64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jump_target() {
        assert_eq!(JumpOffset::new(3).target(10), 13);
        assert_eq!(JumpOffset::new(-10).target(10), 0);
    }

    #[test]
    fn test_constant_index() {
        let c = ConstantIndex::new(1000);
        assert_eq!(c.index(), 1000);
    }
}
