//! IO primitives
//!
//! `IO.print` and `IO.write` are written in Finch on top of a single native
//! method that hands a string to the embedder's write handler.

use crate::intrinsics_impl::helpers::validate_string;
use crate::primitive::{PrimitiveResult, ret};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Bind the native half of `IO`
pub fn init_io(vm: &mut Vm, class: ObjRef) {
    let metaclass = vm.class_of(Value::Obj(class));
    vm.bind_primitive(metaclass, "writeString_ ", io_write_string);
}

fn io_write_string(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(bytes) = validate_string(vm, args, 1, "Argument") else {
        return PrimitiveResult::Error;
    };
    vm.write(&String::from_utf8_lossy(&bytes));
    ret(args, Value::Null)
}
