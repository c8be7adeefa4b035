//! Heap object layouts

use std::rc::Rc;

use finch_vm_bytecode::{Function, SymbolIndex};

use crate::fiber::Fiber;
use crate::primitive::Primitive;
use crate::value::{ObjRef, Value};

/// A heap object: class-of header plus payload
#[derive(Debug)]
pub struct Obj {
    /// Class of this object; `None` only for class-name strings allocated
    /// before the String class exists
    pub class: Option<ObjRef>,
    /// Payload
    pub kind: ObjKind,
}

/// Object payloads
#[derive(Debug)]
pub enum ObjKind {
    /// Immutable byte string
    String(Box<[u8]>),
    /// Growable list
    List(Vec<Value>),
    /// Numeric range
    Range(Range),
    /// Compiled function
    Fn(FnObj),
    /// Function plus captured variables
    Closure(Closure),
    /// Captured variable
    Upvalue(Upvalue),
    /// Coroutine
    Fiber(Box<Fiber>),
    /// Class
    Class(Class),
    /// Instance of a user class
    Instance(Instance),
}

impl ObjKind {
    /// Short type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Range(_) => "range",
            Self::Fn(_) => "fn",
            Self::Closure(_) => "closure",
            Self::Upvalue(_) => "upvalue",
            Self::Fiber(_) => "fiber",
            Self::Class(_) => "class",
            Self::Instance(_) => "instance",
        }
    }
}

/// `from..to` or `from...to`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    /// Start
    pub from: f64,
    /// End
    pub to: f64,
    /// Whether `to` is part of the range
    pub is_inclusive: bool,
}

/// Compiled function with its constants materialized on the heap
#[derive(Debug)]
pub struct FnObj {
    /// Shared prototype
    pub proto: Rc<Function>,
    /// One value per constant pool entry; nested functions become `Fn`s
    pub constants: Vec<Value>,
    /// Class a method body was bound to, used to resolve `super`
    pub bound_class: Option<ObjRef>,
}

/// Function plus captured upvalues
#[derive(Debug)]
pub struct Closure {
    /// The `Fn` object
    pub function: ObjRef,
    /// Upvalue objects, in capture order
    pub upvalues: Vec<ObjRef>,
}

/// A captured variable
#[derive(Debug, Clone, Copy)]
pub enum Upvalue {
    /// Still lives in a fiber's stack
    Open {
        /// Owning fiber
        fiber: ObjRef,
        /// Absolute stack slot
        slot: usize,
    },
    /// Moved off the stack
    Closed(Value),
}

/// A method table entry
#[derive(Debug, Clone, Copy, Default)]
pub enum Method {
    /// No method for this symbol
    #[default]
    Unbound,
    /// Native implementation
    Primitive(Primitive),
    /// `Fn` or `Closure` object
    Block(ObjRef),
}

/// A class
#[derive(Debug)]
pub struct Class {
    /// Name string object
    pub name: ObjRef,
    /// Superclass; `None` only for `Object`
    pub superclass: Option<ObjRef>,
    /// Methods indexed by symbol
    pub methods: Vec<Method>,
    /// Total instance fields, inherited ones included
    pub num_fields: usize,
    /// False for `Object` and `Class`, which have no metaclass of their own
    pub synthesized_metaclass: bool,
}

impl Class {
    /// Create a class without a superclass
    pub fn new(name: ObjRef) -> Self {
        Self {
            name,
            superclass: None,
            methods: Vec::new(),
            num_fields: 0,
            synthesized_metaclass: false,
        }
    }

    /// Method stored directly in this class's table
    pub fn method(&self, symbol: SymbolIndex) -> Method {
        self.methods
            .get(symbol.index())
            .copied()
            .unwrap_or(Method::Unbound)
    }

    /// Store a method, growing the table as needed
    pub fn bind(&mut self, symbol: SymbolIndex, method: Method) {
        let idx = symbol.index();
        if idx >= self.methods.len() {
            self.methods.resize(idx + 1, Method::Unbound);
        }
        self.methods[idx] = method;
    }
}

/// Instance of a user class
#[derive(Debug)]
pub struct Instance {
    /// Field values
    pub fields: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_bind_grows_table() {
        let mut class = Class::new(ObjRef(0));
        assert!(matches!(class.method(SymbolIndex(5)), Method::Unbound));
        class.bind(SymbolIndex(5), Method::Block(ObjRef(9)));
        assert_eq!(class.methods.len(), 6);
        assert!(matches!(class.method(SymbolIndex(5)), Method::Block(r) if r == ObjRef(9)));
        assert!(matches!(class.method(SymbolIndex(2)), Method::Unbound));
    }
}
