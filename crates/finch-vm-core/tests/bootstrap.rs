//! Core class hierarchy as seen from Finch code

use std::cell::RefCell;
use std::rc::Rc;

use finch_vm_core::{Value, Vm, VmConfig};

fn run(source: &str) -> String {
    let output = Rc::new(RefCell::new(String::new()));
    let mut vm = Vm::new(VmConfig::default()).expect("bootstrap should succeed");
    let sink = output.clone();
    vm.set_write_handler(move |text| sink.borrow_mut().push_str(text));
    if let Err(e) = vm.interpret("main", source) {
        panic!("Failed: {}", e.report());
    }
    let text = output.borrow().clone();
    text
}

#[test]
fn test_object_and_class_close_the_loop() {
    let output = run(
        r#"
IO.print(Object.type)
IO.print(Class.type)
IO.print(Class.type.type)
IO.print(Object.name)
"#,
    );
    assert_eq!(output, "Class\nClass\nClass\nObject\n");
}

#[test]
fn test_core_classes_have_metaclasses() {
    let output = run(
        r#"
IO.print(Num.type)
IO.print(Num.type.type)
IO.print(List.type)
IO.print(Fiber.type.type)
"#,
    );
    assert_eq!(output, "Num metaclass\nClass\nList metaclass\nClass\n");
}

#[test]
fn test_values_know_their_class() {
    let output = run(
        r#"
var n = 1
var f = new Fn { 1 }
IO.print(n.type)
IO.print(true.type)
IO.print(null.type)
IO.print("s".type)
IO.print([].type)
IO.print((1..2).type)
IO.print(f.type)
IO.print(Object.type.name)
"#,
    );
    assert_eq!(output, "Num\nBool\nNull\nString\nList\nRange\nFn\nClass\n");
}

#[test]
fn test_is_walks_the_hierarchy() {
    let output = run(
        r#"
IO.print(1 is Num)
IO.print(1 is Object)
IO.print(1 is String)
IO.print(Num is Class)
IO.print(Object is Object)
IO.print([] is Sequence)
IO.print((1..2) is Sequence)
"#,
    );
    assert_eq!(output, "true\ntrue\nfalse\ntrue\ntrue\ntrue\ntrue\n");
}

#[test]
fn test_core_globals_are_defined() {
    let vm = Vm::new(VmConfig::default()).unwrap();
    for name in [
        "Object", "Class", "Bool", "Fiber", "Fn", "Null", "Num", "String", "Sequence", "List",
        "Range", "IO",
    ] {
        let value = vm.global(name).unwrap_or_else(|| panic!("{name} missing"));
        assert!(matches!(value, Value::Obj(_)), "{name} should be an object");
    }
    assert_eq!(vm.global("List"), Some(Value::Obj(vm.classes().list)));
    assert_eq!(vm.global("Range"), Some(Value::Obj(vm.classes().range)));
}

#[test]
fn test_separate_vms_are_independent() {
    let mut first = Vm::new(VmConfig::default()).unwrap();
    first.set_write_handler(|_| {});
    first.interpret("main", "var answer = 42").unwrap();

    let second = Vm::new(VmConfig::default()).unwrap();
    assert_eq!(first.global("answer"), Some(Value::Num(42.0)));
    assert_eq!(second.global("answer"), None);
}

#[test]
fn test_globals_persist_between_modules() {
    let output = Rc::new(RefCell::new(String::new()));
    let mut vm = Vm::new(VmConfig::default()).unwrap();
    let sink = output.clone();
    vm.set_write_handler(move |text| sink.borrow_mut().push_str(text));

    vm.interpret("first", "var greeting = \"hello\"").unwrap();
    vm.interpret("second", "IO.print(greeting + \" again\")").unwrap();
    assert_eq!(*output.borrow(), "hello again\n");
}
