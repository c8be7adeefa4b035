//! Num primitives
//!
//! Arithmetic follows IEEE-754 doubles. Bitwise operators work on the value
//! truncated to a 32-bit unsigned integer.

use crate::format::format_number;
use crate::intrinsics_impl::helpers::{error, receiver_num, validate_num};
use crate::primitive::{PrimitiveResult, ret};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Bind Num methods, equality excluded
pub fn init_num(vm: &mut Vm, class: ObjRef) {
    vm.bind_primitive(class, "abs", num_abs);
    vm.bind_primitive(class, "ceil", num_ceil);
    vm.bind_primitive(class, "cos", num_cos);
    vm.bind_primitive(class, "floor", num_floor);
    vm.bind_primitive(class, "isNan", num_is_nan);
    vm.bind_primitive(class, "sin", num_sin);
    vm.bind_primitive(class, "sqrt", num_sqrt);
    vm.bind_primitive(class, "toString", num_to_string);
    vm.bind_primitive(class, "-", num_negate);
    vm.bind_primitive(class, "- ", num_minus);
    vm.bind_primitive(class, "+ ", num_plus);
    vm.bind_primitive(class, "* ", num_multiply);
    vm.bind_primitive(class, "/ ", num_divide);
    vm.bind_primitive(class, "% ", num_mod);
    vm.bind_primitive(class, "< ", num_lt);
    vm.bind_primitive(class, "> ", num_gt);
    vm.bind_primitive(class, "<= ", num_lte);
    vm.bind_primitive(class, ">= ", num_gte);
    vm.bind_primitive(class, "~", num_bitwise_not);
    vm.bind_primitive(class, "& ", num_bitwise_and);
    vm.bind_primitive(class, "| ", num_bitwise_or);
    vm.bind_primitive(class, ".. ", num_dot_dot);
    vm.bind_primitive(class, "... ", num_dot_dot_dot);
}

/// Bind `==` and `!=`, which compare by IEEE-754 rules so `0 == -0`
pub fn init_num_equality(vm: &mut Vm, class: ObjRef) {
    vm.bind_primitive(class, "== ", num_eq);
    vm.bind_primitive(class, "!= ", num_ne);
}

fn unary(vm: &mut Vm, args: &mut [Value], op: fn(f64) -> f64) -> PrimitiveResult {
    let Some(value) = receiver_num(vm, args) else {
        return PrimitiveResult::Error;
    };
    ret(args, op(value))
}

fn operands(vm: &mut Vm, args: &mut [Value]) -> Option<(f64, f64)> {
    let left = receiver_num(vm, args)?;
    let right = validate_num(vm, args, 1, "Right operand")?;
    Some((left, right))
}

fn arithmetic(vm: &mut Vm, args: &mut [Value], op: fn(f64, f64) -> f64) -> PrimitiveResult {
    let Some((left, right)) = operands(vm, args) else {
        return PrimitiveResult::Error;
    };
    ret(args, op(left, right))
}

fn comparison(vm: &mut Vm, args: &mut [Value], op: fn(f64, f64) -> bool) -> PrimitiveResult {
    let Some((left, right)) = operands(vm, args) else {
        return PrimitiveResult::Error;
    };
    ret(args, op(left, right))
}

fn bitwise(vm: &mut Vm, args: &mut [Value], op: fn(u32, u32) -> u32) -> PrimitiveResult {
    let Some((left, right)) = operands(vm, args) else {
        return PrimitiveResult::Error;
    };
    ret(args, op(to_u32(left), to_u32(right)) as f64)
}

/// Truncate toward zero and keep the low 32 bits
fn to_u32(value: f64) -> u32 {
    value.trunc() as i64 as u32
}

fn num_abs(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    unary(vm, args, f64::abs)
}

fn num_ceil(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    unary(vm, args, f64::ceil)
}

fn num_cos(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    unary(vm, args, f64::cos)
}

fn num_floor(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    unary(vm, args, f64::floor)
}

fn num_sin(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    unary(vm, args, f64::sin)
}

fn num_sqrt(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    unary(vm, args, f64::sqrt)
}

fn num_negate(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    unary(vm, args, |n| -n)
}

fn num_is_nan(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(value) = receiver_num(vm, args) else {
        return PrimitiveResult::Error;
    };
    ret(args, value.is_nan())
}

fn num_to_string(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(value) = receiver_num(vm, args) else {
        return PrimitiveResult::Error;
    };
    let text = vm.new_string(format_number(value));
    ret(args, text)
}

fn num_minus(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    arithmetic(vm, args, |a, b| a - b)
}

fn num_plus(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    arithmetic(vm, args, |a, b| a + b)
}

fn num_multiply(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    arithmetic(vm, args, |a, b| a * b)
}

fn num_divide(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    arithmetic(vm, args, |a, b| a / b)
}

/// Remainder with the sign of the dividend, like C's `fmod`
fn num_mod(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    arithmetic(vm, args, |a, b| a % b)
}

fn num_lt(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    comparison(vm, args, |a, b| a < b)
}

fn num_gt(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    comparison(vm, args, |a, b| a > b)
}

fn num_lte(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    comparison(vm, args, |a, b| a <= b)
}

fn num_gte(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    comparison(vm, args, |a, b| a >= b)
}

fn num_bitwise_not(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    unary(vm, args, |n| !to_u32(n) as f64)
}

fn num_bitwise_and(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    bitwise(vm, args, |a, b| a & b)
}

fn num_bitwise_or(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    bitwise(vm, args, |a, b| a | b)
}

fn range(vm: &mut Vm, args: &mut [Value], is_inclusive: bool) -> PrimitiveResult {
    let Some(from) = receiver_num(vm, args) else {
        return PrimitiveResult::Error;
    };
    let Value::Num(to) = args[1] else {
        return error(vm, args, "Right hand side of range must be a number.");
    };
    let range = vm.new_range(from, to, is_inclusive);
    ret(args, range)
}

fn num_dot_dot(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    range(vm, args, true)
}

fn num_dot_dot_dot(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    range(vm, args, false)
}

fn num_eq(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(left) = receiver_num(vm, args) else {
        return PrimitiveResult::Error;
    };
    let equal = args[1].as_num().is_some_and(|right| left == right);
    ret(args, equal)
}

fn num_ne(vm: &mut Vm, _fiber: ObjRef, args: &mut [Value]) -> PrimitiveResult {
    let Some(left) = receiver_num(vm, args) else {
        return PrimitiveResult::Error;
    };
    let equal = args[1].as_num().is_some_and(|right| left == right);
    ret(args, !equal)
}
