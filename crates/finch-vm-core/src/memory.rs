//! Object arena and allocation accounting
//!
//! Objects live in a flat arena addressed by [`ObjRef`]. Slots are never
//! reused, so a reference stays valid for the lifetime of the VM. The heap
//! counts objects and approximate bytes and refuses to grow past the
//! configured object limit.
//!
//! Pins mark temporaries that are only referenced from Rust locals during a
//! multi-step construction (bootstrap allocates a class name, then the class
//! that owns it). Use [`crate::Vm::with_pinned`] so the pin is released on
//! every exit path.

use crate::error::{VmError, VmResult};
use crate::fiber::Fiber;
use crate::object::{Class, Closure, FnObj, Instance, Obj, ObjKind, Range, Upvalue};
use crate::value::{ObjRef, Value};

/// Allocation statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Live objects
    pub objects: usize,
    /// Approximate payload bytes
    pub bytes: usize,
    /// Currently pinned objects
    pub pinned: usize,
}

/// Object arena
#[derive(Debug)]
pub struct Heap {
    objects: Vec<Obj>,
    bytes: usize,
    limit: usize,
    pinned: Vec<ObjRef>,
}

impl Heap {
    /// Create a heap holding at most `limit` objects
    pub fn new(limit: usize) -> Self {
        Self {
            objects: Vec::new(),
            bytes: 0,
            limit,
            pinned: Vec::new(),
        }
    }

    /// Store a new object
    ///
    /// Allocation itself never fails; the dispatch loop calls
    /// [`Heap::check_limit`] between instructions.
    pub fn alloc(&mut self, class: Option<ObjRef>, kind: ObjKind) -> ObjRef {
        self.bytes += std::mem::size_of::<Obj>() + payload_size(&kind);
        let r = ObjRef(self.objects.len() as u32);
        self.objects.push(Obj { class, kind });
        r
    }

    /// Fail with `OutOfMemory` once the object limit is exceeded
    pub fn check_limit(&self) -> VmResult<()> {
        if self.objects.len() > self.limit {
            return Err(VmError::OutOfMemory);
        }
        Ok(())
    }

    /// Allocation statistics
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            objects: self.objects.len(),
            bytes: self.bytes,
            pinned: self.pinned.len(),
        }
    }

    /// Protect `obj` until the matching [`Heap::unpin`]
    pub fn pin(&mut self, obj: ObjRef) {
        self.pinned.push(obj);
    }

    /// Release the most recent pin
    pub fn unpin(&mut self) {
        self.pinned.pop();
    }

    /// Whether `obj` is pinned
    pub fn is_pinned(&self, obj: ObjRef) -> bool {
        self.pinned.contains(&obj)
    }

    /// Get an object
    #[inline]
    pub fn get(&self, r: ObjRef) -> &Obj {
        &self.objects[r.index()]
    }

    /// Get an object mutably
    #[inline]
    pub fn get_mut(&mut self, r: ObjRef) -> &mut Obj {
        &mut self.objects[r.index()]
    }

    // ==================== Typed access ====================

    /// String bytes
    pub fn string(&self, r: ObjRef) -> Option<&[u8]> {
        match &self.get(r).kind {
            ObjKind::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// String bytes of a value
    pub fn string_value(&self, value: Value) -> Option<&[u8]> {
        value.as_obj().and_then(|r| self.string(r))
    }

    /// List elements
    pub fn list(&self, r: ObjRef) -> Option<&Vec<Value>> {
        match &self.get(r).kind {
            ObjKind::List(items) => Some(items),
            _ => None,
        }
    }

    /// List elements, mutably
    pub fn list_mut(&mut self, r: ObjRef) -> Option<&mut Vec<Value>> {
        match &mut self.get_mut(r).kind {
            ObjKind::List(items) => Some(items),
            _ => None,
        }
    }

    /// Range
    pub fn range(&self, r: ObjRef) -> Option<Range> {
        match &self.get(r).kind {
            ObjKind::Range(range) => Some(*range),
            _ => None,
        }
    }

    /// Function
    pub fn function(&self, r: ObjRef) -> Option<&FnObj> {
        match &self.get(r).kind {
            ObjKind::Fn(f) => Some(f),
            _ => None,
        }
    }

    /// Closure
    pub fn closure(&self, r: ObjRef) -> Option<&Closure> {
        match &self.get(r).kind {
            ObjKind::Closure(c) => Some(c),
            _ => None,
        }
    }

    /// Upvalue
    pub fn upvalue(&self, r: ObjRef) -> Option<Upvalue> {
        match &self.get(r).kind {
            ObjKind::Upvalue(u) => Some(*u),
            _ => None,
        }
    }

    /// Upvalue, mutably
    pub fn upvalue_mut(&mut self, r: ObjRef) -> Option<&mut Upvalue> {
        match &mut self.get_mut(r).kind {
            ObjKind::Upvalue(u) => Some(u),
            _ => None,
        }
    }

    /// Fiber
    pub fn fiber(&self, r: ObjRef) -> Option<&Fiber> {
        match &self.get(r).kind {
            ObjKind::Fiber(f) => Some(f),
            _ => None,
        }
    }

    /// Fiber, mutably
    pub fn fiber_mut(&mut self, r: ObjRef) -> Option<&mut Fiber> {
        match &mut self.get_mut(r).kind {
            ObjKind::Fiber(f) => Some(f),
            _ => None,
        }
    }

    /// Class
    pub fn class(&self, r: ObjRef) -> Option<&Class> {
        match &self.get(r).kind {
            ObjKind::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Class, mutably
    pub fn class_mut(&mut self, r: ObjRef) -> Option<&mut Class> {
        match &mut self.get_mut(r).kind {
            ObjKind::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Instance
    pub fn instance(&self, r: ObjRef) -> Option<&Instance> {
        match &self.get(r).kind {
            ObjKind::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Instance, mutably
    pub fn instance_mut(&mut self, r: ObjRef) -> Option<&mut Instance> {
        match &mut self.get_mut(r).kind {
            ObjKind::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Whether `value` is a class object
    pub fn is_class(&self, value: Value) -> bool {
        value.as_obj().is_some_and(|r| self.class(r).is_some())
    }

    /// Whether `value` is a `Fn` or a closure
    pub fn is_callable(&self, value: Value) -> bool {
        value.as_obj().is_some_and(|r| {
            matches!(self.get(r).kind, ObjKind::Fn(_) | ObjKind::Closure(_))
        })
    }

    // ==================== Fiber access for the dispatch loop ====================

    /// Fiber, or an internal error
    pub(crate) fn expect_fiber(&self, r: ObjRef) -> VmResult<&Fiber> {
        self.fiber(r)
            .ok_or_else(|| VmError::internal(format!("{r} is not a fiber")))
    }

    /// Fiber mutably, or an internal error
    pub(crate) fn expect_fiber_mut(&mut self, r: ObjRef) -> VmResult<&mut Fiber> {
        self.fiber_mut(r)
            .ok_or_else(|| VmError::internal(format!("{r} is not a fiber")))
    }
}

fn payload_size(kind: &ObjKind) -> usize {
    match kind {
        ObjKind::String(bytes) => bytes.len(),
        ObjKind::List(items) => items.capacity() * std::mem::size_of::<Value>(),
        ObjKind::Fn(f) => f.constants.len() * std::mem::size_of::<Value>(),
        ObjKind::Closure(c) => c.upvalues.len() * std::mem::size_of::<ObjRef>(),
        ObjKind::Fiber(f) => f.stack.capacity() * std::mem::size_of::<Value>(),
        ObjKind::Instance(i) => i.fields.len() * std::mem::size_of::<Value>(),
        ObjKind::Class(_) | ObjKind::Range(_) | ObjKind::Upvalue(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_typed_access() {
        let mut heap = Heap::new(10);
        let s = heap.alloc(None, ObjKind::String(b"hi".to_vec().into_boxed_slice()));
        let l = heap.alloc(None, ObjKind::List(vec![Value::Num(1.0)]));

        assert_eq!(heap.string(s), Some(&b"hi"[..]));
        assert!(heap.list(s).is_none());
        heap.list_mut(l).unwrap().push(Value::Null);
        assert_eq!(heap.list(l).unwrap().len(), 2);
        assert_eq!(heap.stats().objects, 2);
        assert!(heap.stats().bytes > 0);
    }

    #[test]
    fn test_limit() {
        let mut heap = Heap::new(1);
        heap.alloc(None, ObjKind::List(Vec::new()));
        assert!(heap.check_limit().is_ok());
        heap.alloc(None, ObjKind::List(Vec::new()));
        assert!(matches!(heap.check_limit(), Err(VmError::OutOfMemory)));
    }

    #[test]
    fn test_pins_nest() {
        let mut heap = Heap::new(10);
        let a = heap.alloc(None, ObjKind::List(Vec::new()));
        let b = heap.alloc(None, ObjKind::List(Vec::new()));
        heap.pin(a);
        heap.pin(b);
        assert!(heap.is_pinned(a) && heap.is_pinned(b));
        heap.unpin();
        assert!(!heap.is_pinned(b));
        heap.unpin();
        assert_eq!(heap.stats().pinned, 0);
    }
}
