//! Argument validation shared by the primitives
//!
//! Every validator either returns the checked value or writes an error
//! string into slot 0 and returns `None`, after which the primitive returns
//! [`PrimitiveResult::Error`] straight away.

use crate::object::Range;
use crate::primitive::PrimitiveResult;
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Put an error string in slot 0 and signal `Error`
pub fn error(vm: &mut Vm, args: &mut [Value], message: impl Into<String>) -> PrimitiveResult {
    args[0] = vm.new_string(message.into());
    PrimitiveResult::Error
}

fn fail<T>(vm: &mut Vm, args: &mut [Value], message: String) -> Option<T> {
    error(vm, args, message);
    None
}

/// A number argument
pub fn validate_num(vm: &mut Vm, args: &mut [Value], index: usize, arg_name: &str) -> Option<f64> {
    match args[index] {
        Value::Num(n) => Some(n),
        _ => fail(vm, args, format!("{arg_name} must be a number.")),
    }
}

/// A number that has no fractional part
pub fn validate_int_value(vm: &mut Vm, args: &mut [Value], value: f64, arg_name: &str) -> Option<f64> {
    if value.trunc() == value {
        Some(value)
    } else {
        fail(vm, args, format!("{arg_name} must be an integer."))
    }
}

/// An integer argument
pub fn validate_int(vm: &mut Vm, args: &mut [Value], index: usize, arg_name: &str) -> Option<f64> {
    let value = validate_num(vm, args, index, arg_name)?;
    validate_int_value(vm, args, value, arg_name)
}

/// An index into a sequence of `count` elements; negative values count
/// from the end
pub fn validate_index_value(
    vm: &mut Vm,
    args: &mut [Value],
    count: usize,
    value: f64,
    arg_name: &str,
) -> Option<usize> {
    let value = validate_int_value(vm, args, value, arg_name)?;
    let count = count as i64;
    let mut index = value as i64;
    if index < 0 {
        index += count;
    }
    if (0..count).contains(&index) {
        Some(index as usize)
    } else {
        fail(vm, args, format!("{arg_name} out of bounds."))
    }
}

/// An index argument
pub fn validate_index(
    vm: &mut Vm,
    args: &mut [Value],
    count: usize,
    index: usize,
    arg_name: &str,
) -> Option<usize> {
    let value = validate_num(vm, args, index, arg_name)?;
    validate_index_value(vm, args, count, value, arg_name)
}

/// A string argument, copied out of the heap
pub fn validate_string(vm: &mut Vm, args: &mut [Value], index: usize, arg_name: &str) -> Option<Vec<u8>> {
    match vm.heap.string_value(args[index]) {
        Some(bytes) => Some(bytes.to_vec()),
        None => fail(vm, args, format!("{arg_name} must be a string.")),
    }
}

/// A `Fn` or closure argument
pub fn validate_fn(vm: &mut Vm, args: &mut [Value], index: usize, arg_name: &str) -> Option<Value> {
    if vm.heap.is_callable(args[index]) {
        Some(args[index])
    } else {
        fail(vm, args, format!("{arg_name} must be a function."))
    }
}

// ==================== Receivers ====================
//
// Core classes can be subclassed, and an instance of such a subclass
// inherits the native methods without carrying the native payload.

/// Receiver as a number
pub fn receiver_num(vm: &mut Vm, args: &mut [Value]) -> Option<f64> {
    validate_num(vm, args, 0, "Receiver")
}

/// Receiver as string bytes
pub fn receiver_string(vm: &mut Vm, args: &mut [Value]) -> Option<Vec<u8>> {
    validate_string(vm, args, 0, "Receiver")
}

/// Receiver as a list
pub fn receiver_list(vm: &mut Vm, args: &mut [Value]) -> Option<ObjRef> {
    match args[0].as_obj().filter(|r| vm.heap.list(*r).is_some()) {
        Some(list) => Some(list),
        None => fail(vm, args, "Receiver must be a list.".to_string()),
    }
}

/// Receiver as a range
pub fn receiver_range(vm: &mut Vm, args: &mut [Value]) -> Option<Range> {
    match args[0].as_obj().and_then(|r| vm.heap.range(r)) {
        Some(range) => Some(range),
        None => fail(vm, args, "Receiver must be a range.".to_string()),
    }
}

/// Receiver as a fiber
pub fn receiver_fiber(vm: &mut Vm, args: &mut [Value]) -> Option<ObjRef> {
    match args[0].as_obj().filter(|r| vm.heap.fiber(*r).is_some()) {
        Some(fiber) => Some(fiber),
        None => fail(vm, args, "Receiver must be a fiber.".to_string()),
    }
}

/// Receiver as a bool
pub fn receiver_bool(vm: &mut Vm, args: &mut [Value]) -> Option<bool> {
    match args[0] {
        Value::Bool(b) => Some(b),
        _ => fail(vm, args, "Receiver must be a bool.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VmConfig;

    fn vm() -> Vm {
        Vm::new(VmConfig::default()).unwrap()
    }

    fn message(vm: &Vm, value: Value) -> String {
        String::from_utf8_lossy(vm.heap.string_value(value).unwrap()).into_owned()
    }

    #[test]
    fn test_validate_index_wraps_negative() {
        let mut vm = vm();
        let mut args = [Value::Null, Value::Num(-1.0)];
        assert_eq!(validate_index(&mut vm, &mut args, 3, 1, "Index"), Some(2));
        let mut args = [Value::Null, Value::Num(-3.0)];
        assert_eq!(validate_index(&mut vm, &mut args, 3, 1, "Index"), Some(0));
    }

    #[test]
    fn test_validate_index_errors() {
        let mut vm = vm();
        let mut args = [Value::Null, Value::Num(3.0)];
        assert_eq!(validate_index(&mut vm, &mut args, 3, 1, "Index"), None);
        assert_eq!(message(&vm, args[0]), "Index out of bounds.");

        let mut args = [Value::Null, Value::Num(1.5)];
        assert_eq!(validate_index(&mut vm, &mut args, 3, 1, "Index"), None);
        assert_eq!(message(&vm, args[0]), "Index must be an integer.");

        let mut args = [Value::Null, Value::Bool(true)];
        assert_eq!(validate_index(&mut vm, &mut args, 3, 1, "Index"), None);
        assert_eq!(message(&vm, args[0]), "Index must be a number.");
    }

    #[test]
    fn test_validate_string_and_fn() {
        let mut vm = vm();
        let mut args = [Value::Null, Value::Num(1.0)];
        assert!(validate_string(&mut vm, &mut args, 1, "Argument").is_none());
        assert_eq!(message(&vm, args[0]), "Argument must be a string.");

        let mut args = [Value::Null, Value::Null];
        assert!(validate_fn(&mut vm, &mut args, 1, "Argument").is_none());
        assert_eq!(message(&vm, args[0]), "Argument must be a function.");
    }
}
