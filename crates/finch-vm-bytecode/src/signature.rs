//! Method signatures
//!
//! Methods are identified by a signature key string which is interned into a
//! method symbol. The key encodes the name and the arity:
//!
//! | Form | Key |
//! |---|---|
//! | `foo` getter | `foo` |
//! | `foo(a, b)` | `foo  ` (one space per argument) |
//! | `foo = v` setter | `foo=` |
//! | `[i]` subscript | `[ ]` |
//! | `[i] = v` subscript setter | `[ ]=` |
//! | `a + b` operator | `+ ` |
//! | `-a` unary operator | `-` |
//!
//! Keys with a leading space (` instantiate`) are hooks the VM calls itself;
//! they can never be written in source.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The syntactic shape of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureKind {
    /// Named method or operator with `arity` arguments (getters have none)
    Method,
    /// `name = value`
    Setter,
    /// `[a, b]`
    Subscript,
    /// `[a, b] = value`
    SubscriptSetter,
}

/// A method signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Method name (empty for subscripts)
    pub name: String,
    /// Shape
    pub kind: SignatureKind,
    /// Argument count; for setters the assigned value is not counted
    pub arity: u8,
}

impl Signature {
    /// Named method (or operator) signature
    pub fn method(name: impl Into<String>, arity: u8) -> Self {
        Self {
            name: name.into(),
            kind: SignatureKind::Method,
            arity,
        }
    }

    /// Getter signature; shares its key with a zero-argument method
    pub fn getter(name: impl Into<String>) -> Self {
        Self::method(name, 0)
    }

    /// Property setter signature
    pub fn setter(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SignatureKind::Setter,
            arity: 0,
        }
    }

    /// Subscript getter signature
    pub fn subscript(arity: u8) -> Self {
        Self {
            name: String::new(),
            kind: SignatureKind::Subscript,
            arity,
        }
    }

    /// Subscript setter signature
    pub fn subscript_setter(arity: u8) -> Self {
        Self {
            name: String::new(),
            kind: SignatureKind::SubscriptSetter,
            arity,
        }
    }

    /// Number of arguments passed by a call, receiver excluded
    pub fn call_args(&self) -> u8 {
        match self.kind {
            SignatureKind::Method | SignatureKind::Subscript => self.arity,
            SignatureKind::Setter | SignatureKind::SubscriptSetter => self.arity + 1,
        }
    }

    /// The key interned in the method symbol table
    pub fn key(&self) -> String {
        let spaces = " ".repeat(self.arity as usize);
        match self.kind {
            SignatureKind::Method => format!("{}{}", self.name, spaces),
            SignatureKind::Setter => format!("{}=", self.name),
            SignatureKind::Subscript => format!("[{spaces}]"),
            SignatureKind::SubscriptSetter => format!("[{spaces}]="),
        }
    }

    /// Recover a signature from its key
    pub fn from_key(key: &str) -> Self {
        if let Some(inner) = key.strip_prefix('[') {
            if let Some(spaces) = inner.strip_suffix("]=") {
                return Self::subscript_setter(spaces.len() as u8);
            }
            if let Some(spaces) = inner.strip_suffix(']') {
                return Self::subscript(spaces.len() as u8);
            }
        }

        let name = key.trim_end_matches(' ');
        let arity = (key.len() - name.len()) as u8;
        if arity == 0 {
            if let Some(prop) = name.strip_suffix('=') {
                if prop
                    .chars()
                    .last()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_')
                {
                    return Self::setter(prop);
                }
            }
        }
        Self::method(name, arity)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = vec!["_"; self.arity as usize].join(",");
        match self.kind {
            SignatureKind::Method if self.arity == 0 => write!(f, "{}", self.name),
            SignatureKind::Method => write!(f, "{}({})", self.name, params),
            SignatureKind::Setter => write!(f, "{}=(_)", self.name),
            SignatureKind::Subscript => write!(f, "[{params}]"),
            SignatureKind::SubscriptSetter => write!(f, "[{params}]=(_)"),
        }
    }
}
