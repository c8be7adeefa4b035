//! Null primitives

use crate::primitive::{PrimitiveResult, ret};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Bind Null methods
pub fn init_null(vm: &mut Vm, class: ObjRef) {
    vm.bind_primitive(class, "toString", null_to_string);
}

fn null_to_string(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let text = vm.new_string("null");
    ret(args, text)
}
