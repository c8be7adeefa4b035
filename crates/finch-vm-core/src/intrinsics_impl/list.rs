//! List primitives
//!
//! `List` itself is declared by the core library; these methods are bound
//! to it once it exists.

use crate::intrinsics_impl::helpers::{
    error, receiver_list, validate_index, validate_index_value, validate_int,
    validate_int_value,
};
use crate::primitive::{PrimitiveResult, ret};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Bind List methods and the metaclass constructor
pub fn init_list(vm: &mut Vm, class: ObjRef) {
    let metaclass = vm.class_of(Value::Obj(class));
    vm.bind_primitive(metaclass, " instantiate", list_instantiate);

    vm.bind_primitive(class, "add ", list_add);
    vm.bind_primitive(class, "clear", list_clear);
    vm.bind_primitive(class, "count", list_count);
    vm.bind_primitive(class, "insert  ", list_insert);
    vm.bind_primitive(class, "iterate ", list_iterate);
    vm.bind_primitive(class, "iteratorValue ", list_iterator_value);
    vm.bind_primitive(class, "removeAt ", list_remove_at);
    vm.bind_primitive(class, "[ ]", list_subscript);
    vm.bind_primitive(class, "[ ]=", list_subscript_setter);
}

fn count_of(vm: &Vm, list: ObjRef) -> usize {
    vm.heap.list(list).map(Vec::len).unwrap_or(0)
}

fn element(vm: &Vm, list: ObjRef, index: usize) -> Value {
    vm.heap
        .list(list)
        .and_then(|items| items.get(index).copied())
        .unwrap_or_default()
}

fn list_instantiate(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let list = vm.new_list(Vec::new());
    ret(args, list)
}

fn list_add(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(list) = receiver_list(vm, args) else {
        return PrimitiveResult::Error;
    };
    let value = args[1];
    if let Some(items) = vm.heap.list_mut(list) {
        items.push(value);
    }
    ret(args, value)
}

fn list_clear(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(list) = receiver_list(vm, args) else {
        return PrimitiveResult::Error;
    };
    if let Some(items) = vm.heap.list_mut(list) {
        *items = Vec::new();
    }
    ret(args, Value::Null)
}

fn list_count(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(list) = receiver_list(vm, args) else {
        return PrimitiveResult::Error;
    };
    let count = count_of(vm, list);
    ret(args, count as f64)
}

/// `insert(value, index)`; the index may equal the count to append
fn list_insert(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(list) = receiver_list(vm, args) else {
        return PrimitiveResult::Error;
    };
    let count = count_of(vm, list);
    let Some(index) = validate_index(vm, args, count + 1, 2, "Index") else {
        return PrimitiveResult::Error;
    };
    let value = args[1];
    if let Some(items) = vm.heap.list_mut(list) {
        items.insert(index, value);
    }
    ret(args, value)
}

fn list_iterate(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(list) = receiver_list(vm, args) else {
        return PrimitiveResult::Error;
    };
    let count = count_of(vm, list) as i64;

    if args[1].is_null() {
        return if count == 0 {
            ret(args, false)
        } else {
            ret(args, 0.0)
        };
    }

    let Some(index) = validate_int(vm, args, 1, "Iterator") else {
        return PrimitiveResult::Error;
    };
    let index = index as i64;
    if index < 0 || index >= count - 1 {
        return ret(args, false);
    }
    ret(args, (index + 1) as f64)
}

fn list_iterator_value(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(list) = receiver_list(vm, args) else {
        return PrimitiveResult::Error;
    };
    let count = count_of(vm, list);
    let Some(index) = validate_index(vm, args, count, 1, "Iterator") else {
        return PrimitiveResult::Error;
    };
    let value = element(vm, list, index);
    ret(args, value)
}

fn list_remove_at(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(list) = receiver_list(vm, args) else {
        return PrimitiveResult::Error;
    };
    let count = count_of(vm, list);
    let Some(index) = validate_index(vm, args, count, 1, "Index") else {
        return PrimitiveResult::Error;
    };
    let removed = match vm.heap.list_mut(list) {
        Some(items) => items.remove(index),
        None => Value::Null,
    };
    ret(args, removed)
}

fn list_subscript(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(list) = receiver_list(vm, args) else {
        return PrimitiveResult::Error;
    };
    let count = count_of(vm, list);

    if let Value::Num(_) = args[1] {
        let Some(index) = validate_index(vm, args, count, 1, "Subscript") else {
            return PrimitiveResult::Error;
        };
        let value = element(vm, list, index);
        return ret(args, value);
    }

    let Some(range) = args[1].as_obj().and_then(|r| vm.heap.range(r)) else {
        return error(vm, args, "Subscript must be a number or a range.");
    };

    // An empty range at zero copies an empty list.
    let empty_end = if range.is_inclusive { -1.0 } else { 0.0 };
    if count == 0 && range.from == 0.0 && range.to == empty_end {
        let copy = vm.new_list(Vec::new());
        return ret(args, copy);
    }

    let Some(from) = validate_index_value(vm, args, count, range.from, "Range start") else {
        return PrimitiveResult::Error;
    };
    let from = from as i64;

    let (to, length) = if range.is_inclusive {
        let Some(to) = validate_index_value(vm, args, count, range.to, "Range end") else {
            return PrimitiveResult::Error;
        };
        let to = to as i64;
        (to, (from - to).abs() + 1)
    } else {
        let Some(to) = validate_int_value(vm, args, range.to, "Range end") else {
            return PrimitiveResult::Error;
        };
        // An exclusive end may sit one past either edge.
        let mut to = to as i64;
        if to < 0 {
            to += count as i64;
        }
        if to < -1 || to > count as i64 {
            return error(vm, args, "Range end out of bounds.");
        }
        (to, (from - to).abs())
    };

    let step = if from < to { 1 } else { -1 };
    let copy: Vec<Value> = (0..length)
        .map(|i| element(vm, list, (from + i * step) as usize))
        .collect();
    let copy = vm.new_list(copy);
    ret(args, copy)
}

fn list_subscript_setter(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(list) = receiver_list(vm, args) else {
        return PrimitiveResult::Error;
    };
    let count = count_of(vm, list);
    let Some(index) = validate_index(vm, args, count, 1, "Subscript") else {
        return PrimitiveResult::Error;
    };
    let value = args[2];
    if let Some(slot) = vm.heap.list_mut(list).and_then(|items| items.get_mut(index)) {
        *slot = value;
    }
    ret(args, value)
}
