//! Fiber primitives
//!
//! These implement every control transfer between fibers. A primitive that
//! switches fibers leaves the fiber to run in slot 0 and returns
//! [`PrimitiveResult::FiberSwitch`]. The switched-from fiber keeps exactly
//! one slot, the receiver slot of the call, which later receives the value
//! it resumes with. Two-argument forms discard the other slot themselves.

use crate::intrinsics_impl::helpers::{error, receiver_fiber, validate_fn, validate_string};
use crate::primitive::{PrimitiveResult, ret};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Bind Fiber methods and the metaclass constructor
pub fn init_fiber(vm: &mut Vm, class: ObjRef) {
    let metaclass = vm.class_of(Value::Obj(class));
    vm.bind_primitive(metaclass, " instantiate", fiber_instantiate);
    vm.bind_primitive(metaclass, "new ", fiber_new);
    vm.bind_primitive(metaclass, "abort ", fiber_abort);
    vm.bind_primitive(metaclass, "yield", fiber_yield);
    vm.bind_primitive(metaclass, "yield ", fiber_yield1);

    vm.bind_primitive(class, "call", fiber_call);
    vm.bind_primitive(class, "call ", fiber_call1);
    vm.bind_primitive(class, "error", fiber_error);
    vm.bind_primitive(class, "isDone", fiber_is_done);
    vm.bind_primitive(class, "run", fiber_run);
    vm.bind_primitive(class, "run ", fiber_run1);
    vm.bind_primitive(class, "try", fiber_try);
}

/// `new Fiber` evaluates to the class, whose `new` builds the fiber
fn fiber_instantiate(_vm: &mut Vm, _fiber: ObjRef, _args: &mut [Value]) -> PrimitiveResult {
    PrimitiveResult::Value
}

fn fiber_new(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(function) = validate_fn(vm, args, 1, "Argument") else {
        return PrimitiveResult::Error;
    };
    match vm.new_fiber(function) {
        Some(fiber) => ret(args, fiber),
        None => error(vm, args, "Argument must be a function."),
    }
}

fn fiber_abort(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    if validate_string(vm, args, 1, "Error message").is_none() {
        return PrimitiveResult::Error;
    }
    args[0] = args[1];
    PrimitiveResult::Error
}

/// How a fiber is being entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Call,
    Try,
}

/// Shared body of `call`, `call(_)` and `try`
fn enter(vm: &mut Vm, current: ObjRef, args: &mut [Value], value: Option<Value>, transfer: Transfer) -> PrimitiveResult {
    let Some(target) = receiver_fiber(vm, args) else {
        return PrimitiveResult::Error;
    };
    let (is_done, has_caller) = match vm.heap.fiber(target) {
        Some(f) => (f.is_done(), f.caller.is_some()),
        None => return PrimitiveResult::Error,
    };
    if is_done {
        let verb = match transfer {
            Transfer::Call => "call",
            Transfer::Try => "try",
        };
        return error(vm, args, format!("Cannot {verb} a finished fiber."));
    }
    if has_caller || target == current {
        return error(vm, args, "Fiber has already been called.");
    }

    if let Some(f) = vm.heap.fiber_mut(target) {
        f.caller = Some(current);
        f.caller_is_trying = transfer == Transfer::Try;
        f.inject(value.unwrap_or_default());
    }
    if value.is_some() {
        discard_slot(vm, current);
    }
    PrimitiveResult::FiberSwitch
}

fn discard_slot(vm: &mut Vm, fiber: ObjRef) {
    if let Some(f) = vm.heap.fiber_mut(fiber) {
        f.discard_slot();
    }
}

fn fiber_call(vm: &mut Vm, fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    enter(vm, fiber, args, None, Transfer::Call)
}

fn fiber_call1(vm: &mut Vm, fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let value = args[1];
    enter(vm, fiber, args, Some(value), Transfer::Call)
}

fn fiber_try(vm: &mut Vm, fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    enter(vm, fiber, args, None, Transfer::Try)
}

fn fiber_error(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(target) = receiver_fiber(vm, args) else {
        return PrimitiveResult::Error;
    };
    let error = vm.heap.fiber(target).and_then(|f| f.error).unwrap_or_default();
    ret(args, error)
}

fn fiber_is_done(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(target) = receiver_fiber(vm, args) else {
        return PrimitiveResult::Error;
    };
    let done = vm.heap.fiber(target).is_some_and(|f| f.is_done());
    ret(args, done)
}

/// Shared body of `run` and `run(_)`
///
/// The target takes over the current fiber's caller, so when it yields or
/// finishes control skips the current fiber entirely.
fn run(vm: &mut Vm, current: ObjRef, args: &mut [Value], value: Option<Value>) -> PrimitiveResult {
    let Some(target) = receiver_fiber(vm, args) else {
        return PrimitiveResult::Error;
    };
    if vm.heap.fiber(target).is_none_or(|f| f.is_done()) {
        return error(vm, args, "Cannot run a finished fiber.");
    }

    let caller = vm.heap.fiber(current).and_then(|f| f.caller);
    if let Some(f) = vm.heap.fiber_mut(target) {
        if f.caller.is_none() {
            f.inject(value.unwrap_or_default());
        }
        f.caller = caller;
    }
    if value.is_some() {
        discard_slot(vm, current);
    }
    PrimitiveResult::FiberSwitch
}

fn fiber_run(vm: &mut Vm, fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    run(vm, fiber, args, None)
}

fn fiber_run1(vm: &mut Vm, fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let value = args[1];
    run(vm, fiber, args, Some(value))
}

/// Shared body of `Fiber.yield` and `Fiber.yield(_)`
fn yield_to_caller(vm: &mut Vm, current: ObjRef, args: &mut [Value], value: Option<Value>) -> PrimitiveResult {
    let caller = vm.heap.fiber_mut(current).and_then(|f| {
        f.caller_is_trying = false;
        f.caller.take()
    });
    let Some(caller) = caller else {
        return error(vm, args, "No fiber to yield to.");
    };

    if let Some(f) = vm.heap.fiber_mut(caller) {
        f.set_pending_result(value.unwrap_or_default());
    }
    if value.is_some() {
        discard_slot(vm, current);
    }
    args[0] = Value::Obj(caller);
    PrimitiveResult::FiberSwitch
}

fn fiber_yield(vm: &mut Vm, fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    yield_to_caller(vm, fiber, args, None)
}

fn fiber_yield1(vm: &mut Vm, fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let value = args[1];
    yield_to_caller(vm, fiber, args, Some(value))
}
