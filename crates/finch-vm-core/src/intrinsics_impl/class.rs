//! Class primitives

use crate::primitive::{PrimitiveResult, ret};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Bind the methods every class inherits
pub fn init_class(vm: &mut Vm, class: ObjRef) {
    vm.bind_primitive(class, " instantiate", class_instantiate);
    vm.bind_primitive(class, "name", class_name);
}

/// Allocate an instance with null fields; `new` then runs the constructor
fn class_instantiate(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(class) = args[0].as_obj() else {
        return PrimitiveResult::Value;
    };
    let instance = vm.new_instance(class);
    ret(args, instance)
}

fn class_name(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let name = args[0]
        .as_obj()
        .and_then(|r| vm.heap.class(r))
        .map(|c| Value::Obj(c.name))
        .unwrap_or_default();
    ret(args, name)
}
