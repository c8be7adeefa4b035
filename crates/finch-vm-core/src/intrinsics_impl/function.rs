//! Fn primitives

use finch_vm_bytecode::MAX_PARAMETERS;

use crate::intrinsics_impl::helpers::{error, validate_fn};
use crate::primitive::{PrimitiveResult, ret};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Bind Fn methods and the metaclass constructor
pub fn init_fn(vm: &mut Vm, class: ObjRef) {
    let metaclass = vm.class_of(Value::Obj(class));
    vm.bind_primitive(metaclass, " instantiate", fn_instantiate);
    vm.bind_primitive(metaclass, "new ", fn_new);

    for args in 0..=MAX_PARAMETERS {
        let key = format!("call{}", " ".repeat(args));
        vm.bind_primitive(class, &key, fn_call);
    }
    vm.bind_primitive(class, "arity", fn_arity);
    vm.bind_primitive(class, "toString", fn_to_string);
}

/// `new Fn` evaluates to the class, whose `new` then returns the block
fn fn_instantiate(_vm: &mut Vm, _fiber: ObjRef, _args: &mut [Value]) -> PrimitiveResult {
    PrimitiveResult::Value
}

fn fn_new(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(function) = validate_fn(vm, args, 1, "Argument") else {
        return PrimitiveResult::Error;
    };
    ret(args, function)
}

/// Every `call` arity shares this; arguments past the declared parameters
/// are dropped when the frame is pushed
fn fn_call(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(arity) = vm.arity_of(args[0]) else {
        return error(vm, args, "Receiver must be a function.");
    };
    if args.len() - 1 < arity as usize {
        return error(vm, args, "Function expects more arguments.");
    }
    PrimitiveResult::TailCall
}

fn fn_arity(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(arity) = vm.arity_of(args[0]) else {
        return error(vm, args, "Receiver must be a function.");
    };
    ret(args, arity as f64)
}

fn fn_to_string(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let text = vm.new_string("<fn>");
    ret(args, text)
}
