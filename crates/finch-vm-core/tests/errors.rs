//! Errors surfaced to the embedder

use finch_vm_core::{StackFrame, Vm, VmConfig, VmError};
use proptest::prelude::*;

fn quiet_vm(config: VmConfig) -> Vm {
    let mut vm = Vm::new(config).expect("bootstrap should succeed");
    vm.set_write_handler(|_| {});
    vm
}

#[test]
fn test_runtime_error_carries_stack() {
    let mut vm = quiet_vm(VmConfig::default());
    let err = vm
        .interpret(
            "main",
            "class Thrower {\n  static go { Fiber.abort(\"boom\") }\n}\nThrower.go",
        )
        .unwrap_err();
    match &err {
        VmError::Runtime { message, stack } => {
            assert_eq!(message, "boom");
            assert_eq!(
                stack,
                &vec![
                    StackFrame {
                        function_name: "Thrower.go".to_string(),
                        line: 2,
                    },
                    StackFrame {
                        function_name: "main".to_string(),
                        line: 4,
                    },
                ]
            );
        }
        other => panic!("expected runtime error, got {other:?}"),
    }
    assert_eq!(err.report(), "boom\n[line 2] in Thrower.go\n[line 4] in main");
}

#[test]
fn test_compile_errors() {
    let mut vm = quiet_vm(VmConfig::default());
    let err = vm.interpret("main", "var x = 1\nvar x = 2").unwrap_err();
    assert!(matches!(err, VmError::Compile(_)));
    assert!(err.to_string().contains("Global variable 'x' is already defined."));

    let err = vm.interpret("other", "IO.print(Missing)").unwrap_err();
    assert!(err.to_string().contains("Variable 'Missing' is used but not defined."));

    let err = vm.interpret("other", "IO.print(missing)").unwrap_err();
    assert!(err.to_string().contains("Undefined variable 'missing'."));
}

#[test]
fn test_deeply_nested_source_is_rejected() {
    let mut vm = quiet_vm(VmConfig::default());
    let source = format!("var x = {}1{}", "(".repeat(3000), ")".repeat(3000));
    let err = vm.interpret("main", &source).unwrap_err();
    assert!(matches!(err, VmError::Compile(_)));
    assert!(err.to_string().contains("Expression nesting too deep."));
    assert!(vm.interpret("main", "var y = (((1)))").is_ok());
}

#[test]
fn test_vm_survives_a_failed_module() {
    let mut vm = quiet_vm(VmConfig::default());
    assert!(vm.interpret("first", "Fiber.abort(\"stop\")").is_err());
    vm.interpret("second", "var fine = 1 + 1").unwrap();
    assert_eq!(vm.global("fine"), Some(finch_vm_core::Value::Num(2.0)));
}

#[test]
fn test_stack_overflow() {
    let mut vm = quiet_vm(VmConfig::default().with_max_call_depth(64));
    let err = vm
        .interpret(
            "main",
            "class R {\n  static recurse(n) { R.recurse(n + 1) }\n}\nR.recurse(0)",
        )
        .unwrap_err();
    match err {
        VmError::Runtime { message, stack } => {
            assert_eq!(message, "Stack overflow.");
            assert_eq!(stack.len(), 64);
        }
        other => panic!("expected runtime error, got {other:?}"),
    }
}

#[test]
fn test_stack_overflow_is_catchable() {
    let output = std::rc::Rc::new(std::cell::RefCell::new(String::new()));
    let mut vm = Vm::new(VmConfig::default().with_max_call_depth(32)).unwrap();
    let sink = output.clone();
    vm.set_write_handler(move |text| sink.borrow_mut().push_str(text));
    vm.interpret(
        "main",
        "class R {\n  static recurse { R.recurse }\n}\nvar f = new Fiber { R.recurse }\nIO.print(f.try)",
    )
    .unwrap();
    assert_eq!(*output.borrow(), "Stack overflow.\n");
}

#[test]
fn test_out_of_memory() {
    let baseline = quiet_vm(VmConfig::default()).heap().stats().objects;
    let mut vm = quiet_vm(VmConfig::default().with_max_heap_objects(baseline + 200));
    let err = vm
        .interpret("main", "var list = []\nwhile (true) list.add(\"a\" + \"b\")")
        .unwrap_err();
    assert!(matches!(err, VmError::OutOfMemory));
}

proptest! {
    #[test]
    fn prop_list_index_wraps(len in 1usize..20, offset in 0usize..20) {
        prop_assume!(offset < len);
        let items: Vec<String> = (0..len).map(|i| i.to_string()).collect();
        let source = format!(
            "var list = [{}]\nvar a = list[{}]\nvar b = list[-{}]",
            items.join(", "),
            offset,
            len - offset
        );
        let mut vm = quiet_vm(VmConfig::default());
        vm.interpret("main", &source).unwrap();
        prop_assert_eq!(vm.global("a"), vm.global("b"));
        prop_assert_eq!(vm.global("a"), Some(finch_vm_core::Value::Num(offset as f64)));
    }

    #[test]
    fn prop_range_counts(from in -20i32..20, to in -20i32..20, inclusive in any::<bool>()) {
        let op = if inclusive { ".." } else { "..." };
        let source = format!("var n = 0\nfor (i in {from}{op}{to}) n = n + 1");
        let mut vm = quiet_vm(VmConfig::default());
        vm.interpret("main", &source).unwrap();
        let span = (from - to).unsigned_abs() as f64;
        let expected = if inclusive { span + 1.0 } else { span };
        prop_assert_eq!(vm.global("n"), Some(finch_vm_core::Value::Num(expected)));
    }
}
