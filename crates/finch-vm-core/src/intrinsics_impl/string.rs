//! String primitives
//!
//! Strings are byte sequences; lengths and indices count bytes.

use crate::intrinsics_impl::helpers::{receiver_string, validate_index, validate_string};
use crate::primitive::{PrimitiveResult, ret};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Characters `strip` removes when no set is given
const DEFAULT_STRIP: &[u8] = b" \n\t";

/// Bind String methods
pub fn init_string(vm: &mut Vm, class: ObjRef) {
    vm.bind_primitive(class, "contains ", string_contains);
    vm.bind_primitive(class, "count", string_count);
    vm.bind_primitive(class, "endsWith ", string_ends_with);
    vm.bind_primitive(class, "indexOf ", string_index_of);
    vm.bind_primitive(class, "startsWith ", string_starts_with);
    vm.bind_primitive(class, "toString", string_to_string);
    vm.bind_primitive(class, "strip ", string_strip_chars);
    vm.bind_primitive(class, "strip", string_strip);
    vm.bind_primitive(class, "+ ", string_plus);
    vm.bind_primitive(class, "== ", string_eq);
    vm.bind_primitive(class, "!= ", string_ne);
    vm.bind_primitive(class, "[ ]", string_subscript);
}

/// Byte offset of the first occurrence of `needle`
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Remove at most one byte from each end if it is in `chars`
fn strip(bytes: &[u8], chars: &[u8]) -> Vec<u8> {
    let Some((&first, _)) = bytes.split_first() else {
        return Vec::new();
    };
    let start = usize::from(chars.contains(&first));
    let mut end = bytes.len();
    if bytes.last().is_some_and(|last| chars.contains(last)) {
        end -= 1;
    }
    if start >= end {
        Vec::new()
    } else {
        bytes[start..end].to_vec()
    }
}

/// Receiver and string argument
fn operands(vm: &mut Vm, args: &mut [Value], arg_name: &str) -> Option<(Vec<u8>, Vec<u8>)> {
    let string = receiver_string(vm, args)?;
    let other = validate_string(vm, args, 1, arg_name)?;
    Some((string, other))
}

fn string_contains(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some((string, search)) = operands(vm, args, "Argument") else {
        return PrimitiveResult::Error;
    };
    ret(args, find(&string, &search).is_some())
}

fn string_count(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(string) = receiver_string(vm, args) else {
        return PrimitiveResult::Error;
    };
    ret(args, string.len() as f64)
}

fn string_ends_with(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some((string, search)) = operands(vm, args, "Argument") else {
        return PrimitiveResult::Error;
    };
    ret(args, string.ends_with(&search))
}

fn string_index_of(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some((string, search)) = operands(vm, args, "Argument") else {
        return PrimitiveResult::Error;
    };
    let index = find(&string, &search).map(|i| i as f64).unwrap_or(-1.0);
    ret(args, index)
}

fn string_starts_with(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some((string, search)) = operands(vm, args, "Argument") else {
        return PrimitiveResult::Error;
    };
    ret(args, string.starts_with(&search))
}

fn string_to_string(_vm: &mut Vm, _fiber: ObjRef, _args: &mut [Value]) -> PrimitiveResult {
    PrimitiveResult::Value
}

fn string_strip(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(string) = receiver_string(vm, args) else {
        return PrimitiveResult::Error;
    };
    let stripped = vm.new_string(strip(&string, DEFAULT_STRIP));
    ret(args, stripped)
}

fn string_strip_chars(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some((string, chars)) = operands(vm, args, "Argument") else {
        return PrimitiveResult::Error;
    };
    let stripped = vm.new_string(strip(&string, &chars));
    ret(args, stripped)
}

fn string_plus(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some((mut string, other)) = operands(vm, args, "Right operand") else {
        return PrimitiveResult::Error;
    };
    string.extend_from_slice(&other);
    let result = vm.new_string(string);
    ret(args, result)
}

fn strings_equal(vm: &Vm, args: &[Value]) -> bool {
    match (vm.heap.string_value(args[0]), vm.heap.string_value(args[1])) {
        (Some(a), Some(b)) => a.len() == b.len() && a == b,
        _ => false,
    }
}

fn string_eq(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let equal = strings_equal(vm, args);
    ret(args, equal)
}

fn string_ne(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let equal = strings_equal(vm, args);
    ret(args, !equal)
}

fn string_subscript(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(string) = receiver_string(vm, args) else {
        return PrimitiveResult::Error;
    };
    let Some(index) = validate_index(vm, args, string.len(), 1, "Subscript") else {
        return PrimitiveResult::Error;
    };
    let result = vm.new_string(vec![string[index]]);
    ret(args, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find() {
        assert_eq!(find(b"hello", b"ll"), Some(2));
        assert_eq!(find(b"hello", b"x"), None);
        assert_eq!(find(b"", b""), Some(0));
        assert_eq!(find(b"abc", b""), Some(0));
        assert_eq!(find(b"ab", b"abc"), None);
    }

    #[test]
    fn test_strip_removes_one_byte_per_end() {
        assert_eq!(strip(b"  hi  ", DEFAULT_STRIP), b" hi ".to_vec());
        assert_eq!(strip(b"\thi\n", DEFAULT_STRIP), b"hi".to_vec());
        assert_eq!(strip(b"hi", DEFAULT_STRIP), b"hi".to_vec());
        assert_eq!(strip(b"xhix", b"x"), b"hi".to_vec());
    }

    #[test]
    fn test_strip_degenerate() {
        assert_eq!(strip(b"", DEFAULT_STRIP), Vec::<u8>::new());
        assert_eq!(strip(b" ", DEFAULT_STRIP), Vec::<u8>::new());
        assert_eq!(strip(b"  ", DEFAULT_STRIP), Vec::<u8>::new());
    }
}
