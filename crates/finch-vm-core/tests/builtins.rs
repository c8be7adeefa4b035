//! Behavior of the core classes' methods

use std::cell::RefCell;
use std::rc::Rc;

use finch_vm_core::{Vm, VmConfig, VmError};

fn eval(source: &str) -> (String, Result<(), VmError>) {
    let output = Rc::new(RefCell::new(String::new()));
    let mut vm = Vm::new(VmConfig::default()).expect("bootstrap should succeed");
    let sink = output.clone();
    vm.set_write_handler(move |text| sink.borrow_mut().push_str(text));
    let result = vm.interpret("main", source);
    let text = output.borrow().clone();
    (text, result)
}

fn run(source: &str) -> String {
    match eval(source) {
        (output, Ok(())) => output,
        (_, Err(e)) => panic!("Failed: {}", e.report()),
    }
}

fn runtime_error(source: &str) -> String {
    match eval(source) {
        (_, Err(VmError::Runtime { message, .. })) => message,
        (output, other) => panic!("expected a runtime error, got {other:?} after {output:?}"),
    }
}

// ==================== IO ====================

#[test]
fn test_print_returns_its_argument() {
    assert_eq!(run("IO.print(IO.print(\"a\") + \"b\")"), "a\nab\n");
}

#[test]
fn test_write_has_no_newline() {
    assert_eq!(run("IO.write(1)\nIO.write(\" \")\nIO.write(true)"), "1 true");
}

// ==================== Num ====================

#[test]
fn test_arithmetic() {
    let output = run(
        r#"
IO.print(1 + 2 * 3)
IO.print((1 + 2) * 3)
IO.print(10 / 4)
IO.print(1 / 3)
IO.print(7 % 3)
IO.print(-7 % 3)
IO.print(0.1 + 0.2)
IO.print(1 / 0)
IO.print(0x1F)
"#,
    );
    assert_eq!(output, "7\n9\n2.5\n0.33333333333333\n1\n-1\n0.3\ninf\n31\n");
}

#[test]
fn test_num_methods() {
    let output = run(
        r#"
var x = 2.5
var y = -3
var z = 16
IO.print(x.floor)
IO.print(x.ceil)
IO.print(y.abs)
IO.print(z.sqrt)
IO.print(-x)
IO.print((0 / 0).isNan)
IO.print(z.isNan)
"#,
    );
    assert_eq!(output, "2\n3\n3\n4\n-2.5\ntrue\nfalse\n");
}

#[test]
fn test_comparisons_and_equality() {
    let output = run(
        r#"
IO.print(1 < 2)
IO.print(2 <= 2)
IO.print(3 > 4)
IO.print(3 >= 4)
IO.print(1 == 1)
IO.print(1 != 1)
IO.print(0 == -0)
IO.print(1 == "1")
IO.print((0 / 0) == (0 / 0))
"#,
    );
    assert_eq!(output, "true\ntrue\nfalse\nfalse\ntrue\nfalse\ntrue\nfalse\nfalse\n");
}

#[test]
fn test_bitwise_operators_work_on_u32() {
    let output = run(
        r#"
IO.print(5 & 3)
IO.print(5 | 3)
IO.print(~0)
IO.print(6.7 & 7)
IO.print(-1 | 0)
IO.print(4294967296 & 1)
IO.print(4294967297 | 0)
"#,
    );
    assert_eq!(output, "1\n7\n4294967295\n6\n4294967295\n0\n1\n");
}

#[test]
fn test_num_operand_errors() {
    assert_eq!(runtime_error("1 + \"a\""), "Right operand must be a number.");
    assert_eq!(runtime_error("1 < null"), "Right operand must be a number.");
    assert_eq!(runtime_error("1..\"a\""), "Right hand side of range must be a number.");
}

// ==================== Bool and Null ====================

#[test]
fn test_bool_and_null() {
    let output = run(
        r#"
IO.print(true)
IO.print(!true)
IO.print(!false)
IO.print(null)
IO.print(!null)
IO.print(null == null)
IO.print(true == true)
IO.print(true == 1)
"#,
    );
    assert_eq!(output, "true\nfalse\ntrue\nnull\ntrue\ntrue\ntrue\nfalse\n");
}

#[test]
fn test_truthiness() {
    let output = run(
        r#"
if (0) IO.print("zero is true")
if ("") IO.print("empty string is true")
if (null) IO.print("unreachable") else IO.print("null is false")
if (false) IO.print("unreachable") else IO.print("false is false")
IO.print(null || "fallback")
IO.print(1 && 2)
IO.print(false && 1)
"#,
    );
    assert_eq!(
        output,
        "zero is true\nempty string is true\nnull is false\nfalse is false\nfallback\n2\nfalse\n"
    );
}

// ==================== String ====================

#[test]
fn test_string_methods() {
    let output = run(
        r#"
var s = "hello"
IO.print(s.count)
IO.print(s[0])
IO.print(s[-1])
IO.print(s.contains("ell"))
IO.print(s.contains("xyz"))
IO.print(s.startsWith("he"))
IO.print(s.endsWith("lo"))
IO.print(s.indexOf("l"))
IO.print(s.indexOf("z"))
IO.print(s.indexOf(""))
IO.print(s + " world")
IO.print(s == "hello")
IO.print(s != "hello")
IO.print("a\tb\\c")
"#,
    );
    assert_eq!(
        output,
        "5\nh\no\ntrue\nfalse\ntrue\ntrue\n2\n-1\n0\nhello world\ntrue\nfalse\na\tb\\c\n"
    );
}

#[test]
fn test_strip_removes_one_character_per_end() {
    let output = run(
        r#"
IO.print("[" + " hi ".strip + "]")
IO.print("[" + "  hi  ".strip + "]")
IO.print("[" + "xxhixx".strip("x") + "]")
IO.print("[" + " ".strip + "]")
IO.print("[" + "".strip + "]")
"#,
    );
    assert_eq!(output, "[hi]\n[ hi ]\n[xhix]\n[]\n[]\n");
}

#[test]
fn test_string_errors() {
    assert_eq!(runtime_error("\"a\" + 1"), "Right operand must be a string.");
    assert_eq!(runtime_error("\"abc\"[3]"), "Subscript out of bounds.");
    assert_eq!(runtime_error("\"abc\"[1.5]"), "Subscript must be an integer.");
    assert_eq!(runtime_error("\"abc\".contains(1)"), "Argument must be a string.");
}

// ==================== List ====================

#[test]
fn test_list_mutation() {
    let output = run(
        r#"
var list = [1, 2]
list.add(3)
IO.print(list)
list.insert(0, 0)
IO.print(list)
list.insert(9, 4)
IO.print(list)
IO.print(list.removeAt(1))
IO.print(list)
list[0] = "first"
list[-1] = "last"
IO.print(list)
IO.print(list.count)
list.clear
IO.print(list)
IO.print(list.count)
"#,
    );
    assert_eq!(
        output,
        "[1, 2, 3]\n[0, 1, 2, 3]\n[0, 1, 2, 3, 9]\n1\n[0, 2, 3, 9]\n[first, 2, 3, last]\n4\n[]\n0\n"
    );
}

#[test]
fn test_list_subscript_ranges() {
    let output = run(
        r#"
var list = ["a", "b", "c", "d"]
IO.print(list[1])
IO.print(list[-1])
IO.print(list[1..2])
IO.print(list[1...3])
IO.print(list[0..-1])
IO.print(list[2..0])
IO.print(list[0...0])
IO.print(list[3...4])
IO.print([][0..-1])
IO.print([][0...0])
"#,
    );
    assert_eq!(
        output,
        "b\nd\n[b, c]\n[b, c]\n[a, b, c, d]\n[c, b, a]\n[]\n[d]\n[]\n[]\n"
    );
}

#[test]
fn test_list_errors() {
    assert_eq!(runtime_error("[1, 2][2]"), "Subscript out of bounds.");
    assert_eq!(runtime_error("[1, 2][-3]"), "Subscript out of bounds.");
    assert_eq!(runtime_error("[1, 2][\"a\"]"), "Subscript must be a number or a range.");
    assert_eq!(runtime_error("[1, 2][0..2]"), "Range end out of bounds.");
    assert_eq!(runtime_error("[1, 2][5..6]"), "Range start out of bounds.");
    assert_eq!(runtime_error("[1, 2].insert(0, 3)"), "Index out of bounds.");
    assert_eq!(runtime_error("[1, 2].removeAt(2)"), "Index out of bounds.");
    assert_eq!(runtime_error("[1, 2][5] = 0"), "Subscript out of bounds.");
}

#[test]
fn test_sequence_methods_from_core_library() {
    let output = run(
        r#"
var list = [1, 2, 3, 4]
IO.print(list.map { |x| x * 10 })
IO.print(list.where { |x| x % 2 == 0 })
IO.print(list.contains(3))
IO.print(list.contains(7))
IO.print(list + [5, 6])
IO.print(list)
var other = [0]
other.addAll(list)
IO.print(other)
IO.print((1..3).map { |x| x * x })
IO.print((1...10).where { |x| x > 7 })
"#,
    );
    assert_eq!(
        output,
        "[10, 20, 30, 40]\n[2, 4]\ntrue\nfalse\n[1, 2, 3, 4, 5, 6]\n[1, 2, 3, 4]\n[0, 1, 2, 3, 4]\n[1, 4, 9]\n[8, 9]\n"
    );
}

#[test]
fn test_for_loop_over_list() {
    let output = run(
        r#"
var total = 0
for (x in [1, 2, 3]) total = total + x
IO.print(total)
for (x in []) IO.print("never")
"#,
    );
    assert_eq!(output, "6\n");
}

// ==================== Range ====================

#[test]
fn test_range_properties() {
    let output = run(
        r#"
var r = 1..5
IO.print(r)
IO.print(r.from)
IO.print(r.to)
IO.print(r.isInclusive)
IO.print(5...1)
IO.print((5...1).min)
IO.print((5...1).max)
IO.print((5...1).isInclusive)
"#,
    );
    assert_eq!(output, "1..5\n1\n5\ntrue\n5...1\n1\n5\nfalse\n");
}

#[test]
fn test_range_iteration() {
    let output = run(
        r#"
for (i in 1..3) IO.write(i)
IO.print("")
for (i in 1...3) IO.write(i)
IO.print("")
for (i in 3..1) IO.write(i)
IO.print("")
for (i in 3...1) IO.write(i)
IO.print("")
for (i in 1...1) IO.write(i)
IO.print("")
for (i in 2..2) IO.write(i)
IO.print("")
"#,
    );
    assert_eq!(output, "123\n12\n321\n32\n\n2\n");
}

#[test]
fn test_range_equality_is_structural() {
    let output = run(
        r#"
IO.print((1..3) == (1..3))
IO.print((1..3) == (1...3))
IO.print((1..3) != (1..4))
"#,
    );
    assert_eq!(output, "true\nfalse\ntrue\n");
}

// ==================== Fn ====================

#[test]
fn test_fn_call_and_arity() {
    let output = run(
        r#"
var add = new Fn { |a, b| a + b }
IO.print(add.call(1, 2))
IO.print(add.call(1, 2, 3))
IO.print(add.arity)
IO.print(add)
var constant = new Fn { "value" }
IO.print(constant.call)
IO.print(constant.arity)
"#,
    );
    assert_eq!(output, "3\n3\n2\n<fn>\nvalue\n0\n");
}

#[test]
fn test_fn_errors() {
    assert_eq!(
        runtime_error("var f = new Fn { |a| a }\nf.call"),
        "Function expects more arguments."
    );
    assert_eq!(runtime_error("new Fn(1)"), "Argument must be a function.");
}

// ==================== Object ====================

#[test]
fn test_object_defaults() {
    let output = run(
        r#"
class Point {}
var p = new Point
IO.print(p)
IO.print(p.type)
IO.print(p == p)
IO.print(p == new Point)
IO.print(p != new Point)
"#,
    );
    assert_eq!(output, "instance of Point\nPoint\ntrue\nfalse\ntrue\n");
}

#[test]
fn test_strings_compare_by_value_under_object_equality() {
    let output = run(
        r#"
var list = ["a" + "b"]
IO.print(list.contains("ab"))
"#,
    );
    assert_eq!(output, "true\n");
}
