//! Bool primitives

use crate::intrinsics_impl::helpers::receiver_bool;
use crate::primitive::{PrimitiveResult, ret};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Bind Bool methods
pub fn init_bool(vm: &mut Vm, class: ObjRef) {
    vm.bind_primitive(class, "toString", bool_to_string);
    vm.bind_primitive(class, "!", bool_not);
}

fn bool_to_string(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(b) = receiver_bool(vm, args) else {
        return PrimitiveResult::Error;
    };
    let text = vm.new_string(if b { "true" } else { "false" });
    ret(args, text)
}

fn bool_not(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(b) = receiver_bool(vm, args) else {
        return PrimitiveResult::Error;
    };
    ret(args, !b)
}
