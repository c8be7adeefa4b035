//! Primitive calling convention
//!
//! A primitive receives the VM, the running fiber and a window over its
//! arguments. Slot 0 holds the receiver and is also the only output slot:
//! whatever the primitive leaves there is interpreted according to the
//! returned [`PrimitiveResult`].

use smallvec::SmallVec;

use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Argument window handed to primitives; receiver plus a few arguments fit
/// inline
pub type ArgWindow = SmallVec<[Value; 4]>;

/// Native method implementation
pub type Primitive = fn(&mut Vm, ObjRef, &mut [Value]) -> PrimitiveResult;

/// What the dispatch loop must do after a primitive returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveResult {
    /// Slot 0 holds the result
    Value,
    /// Slot 0 holds the error payload; the running fiber fails
    Error,
    /// Slot 0 holds a function and the other slots its arguments; push a
    /// frame for it instead of returning a value
    TailCall,
    /// Slot 0 holds the fiber to run next
    FiberSwitch,
}

/// Write `value` into the output slot and signal `Value`
#[inline]
pub fn ret(args: &mut [Value], value: impl Into<Value>) -> PrimitiveResult {
    args[0] = value.into();
    PrimitiveResult::Value
}
