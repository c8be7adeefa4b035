//! Compiler integration tests
//!
//! Compiles whole programs against an in-memory symbol table and checks the
//! shape of the generated bytecode.

use std::collections::HashMap;

use finch_vm_bytecode::{Constant, Function, GlobalIndex, Instruction, SymbolIndex};
use finch_vm_compiler::lexer::{Token, tokenize};
use finch_vm_compiler::{CompileError, SymbolResolver, compile};
use proptest::prelude::*;

#[derive(Default)]
struct TestSymbols {
    methods: Vec<String>,
    globals: HashMap<String, u32>,
}

impl TestSymbols {
    fn with_object() -> Self {
        let mut symbols = Self::default();
        symbols.define_global("Object");
        symbols.define_global("Fn");
        symbols
    }

    fn symbol(&self, key: &str) -> Option<SymbolIndex> {
        self.methods
            .iter()
            .position(|m| m == key)
            .map(|i| SymbolIndex(i as u32))
    }
}

impl SymbolResolver for TestSymbols {
    fn method_symbol(&mut self, signature: &str) -> SymbolIndex {
        if let Some(symbol) = self.symbol(signature) {
            return symbol;
        }
        self.methods.push(signature.to_string());
        SymbolIndex((self.methods.len() - 1) as u32)
    }

    fn global_slot(&self, name: &str) -> Option<GlobalIndex> {
        self.globals.get(name).copied().map(GlobalIndex)
    }

    fn define_global(&mut self, name: &str) -> GlobalIndex {
        let next = self.globals.len() as u32;
        GlobalIndex(*self.globals.entry(name.to_string()).or_insert(next))
    }
}

fn compile_ok(source: &str) -> (Function, TestSymbols) {
    let mut symbols = TestSymbols::with_object();
    let function = compile(source, "test", &mut symbols).expect("program should compile");
    (function, symbols)
}

fn compile_err(source: &str) -> CompileError {
    let mut symbols = TestSymbols::with_object();
    compile(source, "test", &mut symbols).expect_err("program should not compile")
}

fn calls(function: &Function, symbols: &TestSymbols) -> Vec<String> {
    function
        .code
        .iter()
        .filter_map(|i| match i {
            Instruction::Call { symbol, .. } => Some(symbols.methods[symbol.index()].clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_operators_become_method_calls() {
    let (function, symbols) = compile_ok("var x = 1\nvar a = 1 + 2 * -x.y");
    // -x.y is not a literal, so the negation stays a call
    assert_eq!(calls(&function, &symbols), vec!["y", "-", "* ", "+ "]);
}

#[test]
fn test_module_ends_with_null_return() {
    let (function, _) = compile_ok("var a = 1");
    let tail = &function.code[function.code.len() - 2..];
    assert_eq!(tail, &[Instruction::Null, Instruction::Return]);
}

#[test]
fn test_for_loop_uses_iterator_protocol() {
    let (function, symbols) = compile_ok("for (i in 1..3) {\n  i\n}");
    let called = calls(&function, &symbols);
    assert!(called.contains(&"iterate ".to_string()));
    assert!(called.contains(&"iteratorValue ".to_string()));
}

#[test]
fn test_class_methods_are_bound() {
    let source = "class Point {\n  new(x, y) {\n    _x = x\n    _y = y\n  }\n  x { _x }\n  static origin { new Point(0, 0) }\n}";
    let (function, symbols) = compile_ok(source);

    assert!(
        function
            .code
            .contains(&Instruction::Class { fields: 2 })
    );
    let bound: Vec<_> = function
        .code
        .iter()
        .filter_map(|i| match i {
            Instruction::MethodInstance { symbol } => Some((false, symbol.index())),
            Instruction::MethodStatic { symbol } => Some((true, symbol.index())),
            _ => None,
        })
        .map(|(is_static, idx)| (is_static, symbols.methods[idx].clone()))
        .collect();
    assert_eq!(
        bound,
        vec![
            (false, "new  ".to_string()),
            (false, "x".to_string()),
            (true, "origin".to_string()),
        ]
    );
}

#[test]
fn test_constructor_returns_this() {
    let (function, _) = compile_ok("class A {\n  new { _a = 1 }\n}");
    let ctor = function.nested().next().unwrap();
    let tail = &ctor.code[ctor.code.len() - 2..];
    assert_eq!(
        tail,
        &[
            Instruction::LoadLocal {
                slot: finch_vm_bytecode::LocalIndex(0)
            },
            Instruction::Return
        ]
    );
}

#[test]
fn test_block_captures_local() {
    let (function, _) = compile_ok("{\n  var a = 1\n  var f = Fn.new { a }\n}");
    let block = function
        .constants
        .iter()
        .find_map(|c| match c {
            Constant::Function(f) => Some(f),
            _ => None,
        })
        .unwrap();
    assert_eq!(block.upvalues.len(), 1);
    assert!(function.code.contains(&Instruction::CloseUpvalue));
}

#[test]
fn test_forward_reference_to_later_class() {
    let source = "class A {\n  make { new B }\n}\nclass B {}";
    compile_ok(source);

    let err = compile_err("class A {\n  make { new Missing }\n}");
    assert!(err.to_string().contains("Variable 'Missing' is used but not defined."));
}

#[test]
fn test_resolution_errors() {
    assert!(compile_err("this").to_string().contains("Cannot use 'this'"));
    assert!(compile_err("_x").to_string().contains("outside of a class"));
    assert!(compile_err("break").to_string().contains("outside of a loop"));
    assert!(compile_err("undefinedThing").to_string().contains("Undefined variable"));
    assert!(
        compile_err("class A {\n  static f { _x }\n}")
            .to_string()
            .contains("static method")
    );
    assert!(
        compile_err("class A {\n  new { return 1 }\n}")
            .to_string()
            .contains("constructor cannot return")
    );
}

#[test]
fn test_deep_nesting_is_a_compile_error() {
    let parens = format!("var x = {}1{}", "(".repeat(3000), ")".repeat(3000));
    let err = compile_err(&parens);
    assert!(matches!(err, CompileError::Limit { .. }));
    assert!(err.to_string().contains("Expression nesting too deep."));

    let negations = format!("var x = {}true", "!".repeat(3000));
    assert!(compile_err(&negations).to_string().contains("nesting too deep"));

    let sum = format!("var x = 1{}", " + 1".repeat(5000));
    assert!(compile_err(&sum).to_string().contains("nesting too deep"));

    let blocks = format!("{}{}", "if (true) {\n".repeat(500), "}\n".repeat(500));
    assert!(compile_err(&blocks).to_string().contains("nesting too deep"));
}

#[test]
fn test_moderate_nesting_compiles() {
    compile_ok(&format!("var x = {}1{}", "(".repeat(40), ")".repeat(40)));
    compile_ok(&format!("var x = 1{}", " + 1".repeat(60)));
}

#[test]
fn test_duplicate_global() {
    let err = compile_err("var a = 1\nvar a = 2");
    assert!(err.to_string().contains("already defined"));
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_implicit_this_call_inside_methods() {
    let (function, symbols) = compile_ok("class A {\n  b { count }\n  c { add(1) }\n}");
    let methods: Vec<_> = function.nested().collect();
    assert_eq!(calls(methods[0], &symbols), vec!["count"]);
    assert_eq!(calls(methods[1], &symbols), vec!["add "]);
}

#[test]
fn test_break_pops_loop_locals() {
    let (function, _) = compile_ok("{\n  while (true) {\n    var a = 1\n    break\n  }\n}");
    let jump_after_pop = function.code.windows(2).any(|w| {
        w[0] == Instruction::Pop && matches!(w[1], Instruction::Jump { .. })
    });
    assert!(jump_after_pop);
}

#[test]
fn test_max_slots_covers_arguments() {
    let (function, _) = compile_ok("var a = [1, 2, 3, 4]");
    // receiver + four list elements
    assert!(function.max_slots >= 5);
}

proptest! {
    #[test]
    fn prop_integer_literals_lex_exactly(n in 0u32..1_000_000) {
        let tokens = tokenize(&n.to_string()).unwrap();
        prop_assert_eq!(&tokens[0].token, &Token::Number(n as f64));
    }

    #[test]
    fn prop_decimal_literals_lex_exactly(whole in 0u32..10_000, frac in 0u32..10_000) {
        let text = format!("{whole}.{frac}");
        let tokens = tokenize(&text).unwrap();
        prop_assert_eq!(&tokens[0].token, &Token::Number(text.parse::<f64>().unwrap()));
    }
}
