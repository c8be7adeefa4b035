//! Value representation
//!
//! Values are small and `Copy`. Everything that lives on the heap is reached
//! through an [`ObjRef`], a stable index into the VM's object arena.

use std::fmt;

/// Reference to a heap object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ObjRef(pub(crate) u32);

impl ObjRef {
    /// Arena index
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A Finch value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Value {
    /// `null`
    #[default]
    Null,
    /// `true` / `false`
    Bool(bool),
    /// IEEE-754 double
    Num(f64),
    /// Heap object
    Obj(ObjRef),
}

impl Value {
    /// Only `null` and `false` are falsey
    #[inline]
    pub fn is_falsey(self) -> bool {
        matches!(self, Self::Null | Self::Bool(false))
    }

    /// Check if null
    #[inline]
    pub fn is_null(self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get number if this is a number
    #[inline]
    pub fn as_num(self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(n),
            _ => None,
        }
    }

    /// Get bool if this is a bool
    #[inline]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Get object reference if this is an object
    #[inline]
    pub fn as_obj(self) -> Option<ObjRef> {
        match self {
            Self::Obj(r) => Some(r),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Num(n)
    }
}

impl From<ObjRef> for Value {
    fn from(r: ObjRef) -> Self {
        Self::Obj(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(Value::Null.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Num(0.0).is_falsey());
        assert!(!Value::Obj(ObjRef(0)).is_falsey());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from(2.5).as_num(), Some(2.5));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::Null.as_num(), None);
        assert_eq!(Value::from(ObjRef(4)).as_obj(), Some(ObjRef(4)));
    }
}
