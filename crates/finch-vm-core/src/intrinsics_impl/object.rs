//! Object primitives

use crate::intrinsics_impl::helpers::error;
use crate::object::ObjKind;
use crate::primitive::{PrimitiveResult, ret};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Bind the methods every object inherits
pub fn init_object(vm: &mut Vm, class: ObjRef) {
    vm.bind_primitive(class, "== ", object_eq);
    vm.bind_primitive(class, "!= ", object_ne);
    vm.bind_primitive(class, "new", object_new);
    vm.bind_primitive(class, "toString", object_to_string);
    vm.bind_primitive(class, "type", object_type);
    vm.bind_primitive(class, " instantiate", object_instantiate);
}

fn object_eq(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let equal = vm.values_equal(args[0], args[1]);
    ret(args, equal)
}

fn object_ne(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let equal = vm.values_equal(args[0], args[1]);
    ret(args, !equal)
}

/// Default constructor: the new instance is already in slot 0
fn object_new(_vm: &mut Vm, _fiber: ObjRef, _args: &mut [Value]) -> PrimitiveResult {
    PrimitiveResult::Value
}

fn object_to_string(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(r) = args[0].as_obj() else {
        let text = vm.new_string("<object>");
        return ret(args, text);
    };
    let text = match &vm.heap.get(r).kind {
        ObjKind::Class(class) => return ret(args, class.name),
        ObjKind::Instance(_) => {
            let class = vm.class_of(args[0]);
            format!("instance of {}", vm.class_name(class))
        }
        _ => "<object>".to_string(),
    };
    let text = vm.new_string(text);
    ret(args, text)
}

fn object_type(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let class = vm.class_of(args[0]);
    ret(args, class)
}

/// `new` applied to something that is not a class
fn object_instantiate(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    error(vm, args, "Must provide a class to 'new' to construct.")
}
