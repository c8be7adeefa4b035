//! Range primitives

use crate::format::format_number;
use crate::intrinsics_impl::helpers::{receiver_range, validate_num};
use crate::object::Range;
use crate::primitive::{PrimitiveResult, ret};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Bind Range methods
pub fn init_range(vm: &mut Vm, class: ObjRef) {
    vm.bind_primitive(class, "from", range_from);
    vm.bind_primitive(class, "to", range_to);
    vm.bind_primitive(class, "min", range_min);
    vm.bind_primitive(class, "max", range_max);
    vm.bind_primitive(class, "isInclusive", range_is_inclusive);
    vm.bind_primitive(class, "iterate ", range_iterate);
    vm.bind_primitive(class, "iteratorValue ", range_iterator_value);
    vm.bind_primitive(class, "toString", range_to_string);
}

fn with_range(vm: &mut Vm, args: &mut [Value], f: fn(Range) -> Value) -> PrimitiveResult {
    let Some(range) = receiver_range(vm, args) else {
        return PrimitiveResult::Error;
    };
    ret(args, f(range))
}

fn range_from(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    with_range(vm, args, |r| r.from.into())
}

fn range_to(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    with_range(vm, args, |r| r.to.into())
}

fn range_min(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    with_range(vm, args, |r| r.from.min(r.to).into())
}

fn range_max(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    with_range(vm, args, |r| r.from.max(r.to).into())
}

fn range_is_inclusive(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    with_range(vm, args, |r| r.is_inclusive.into())
}

/// Next iterator value after `iterator`, or `None` when the range is
/// exhausted. Ranges count down when `from > to`.
pub(crate) fn next_iterator(range: Range, iterator: Option<f64>) -> Option<f64> {
    if range.from == range.to && !range.is_inclusive {
        return None;
    }
    let Some(mut iterator) = iterator else {
        return Some(range.from);
    };

    if range.from < range.to {
        iterator += 1.0;
        if iterator > range.to {
            return None;
        }
    } else {
        iterator -= 1.0;
        if iterator < range.to {
            return None;
        }
    }

    if !range.is_inclusive && iterator == range.to {
        return None;
    }
    Some(iterator)
}

fn range_iterate(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(range) = receiver_range(vm, args) else {
        return PrimitiveResult::Error;
    };
    let iterator = if args[1].is_null() {
        None
    } else {
        let Some(n) = validate_num(vm, args, 1, "Iterator") else {
            return PrimitiveResult::Error;
        };
        Some(n)
    };
    match next_iterator(range, iterator) {
        Some(next) => ret(args, next),
        None => ret(args, false),
    }
}

/// The iterator is the element
fn range_iterator_value(_vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    args[0] = args[1];
    PrimitiveResult::Value
}

fn range_to_string(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(range) = receiver_range(vm, args) else {
        return PrimitiveResult::Error;
    };
    let text = format!(
        "{}{}{}",
        format_number(range.from),
        if range.is_inclusive { ".." } else { "..." },
        format_number(range.to)
    );
    let text = vm.new_string(text);
    ret(args, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(from: f64, to: f64, is_inclusive: bool) -> Vec<f64> {
        let range = Range {
            from,
            to,
            is_inclusive,
        };
        let mut values = Vec::new();
        let mut iterator = None;
        while let Some(next) = next_iterator(range, iterator) {
            values.push(next);
            iterator = Some(next);
        }
        values
    }

    #[test]
    fn test_ascending() {
        assert_eq!(collect(1.0, 3.0, true), vec![1.0, 2.0, 3.0]);
        assert_eq!(collect(1.0, 3.0, false), vec![1.0, 2.0]);
    }

    #[test]
    fn test_descending() {
        assert_eq!(collect(3.0, 1.0, true), vec![3.0, 2.0, 1.0]);
        assert_eq!(collect(3.0, 1.0, false), vec![3.0, 2.0]);
    }

    #[test]
    fn test_empty_and_single() {
        assert!(collect(2.0, 2.0, false).is_empty());
        assert_eq!(collect(2.0, 2.0, true), vec![2.0]);
    }
}
