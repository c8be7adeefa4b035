//! The virtual machine
//!
//! [`Vm`] owns the heap, the symbol tables, the global variables and the
//! core class table. Creating one runs the bootstrap, so a `Vm` is always
//! ready to interpret code.

use std::io::Write as _;
use std::rc::Rc;

use finch_vm_bytecode::{Constant, Function, GlobalIndex, SymbolIndex};
use finch_vm_compiler::SymbolResolver;
use tracing::debug;

use crate::config::VmConfig;
use crate::error::{VmError, VmResult};
use crate::fiber::{Fiber, FiberState, Frame};
use crate::format::format_number;
use crate::intrinsics::{self, CoreClasses};
use crate::memory::Heap;
use crate::object::{Class, Closure, FnObj, Instance, Method, ObjKind, Range};
use crate::primitive::Primitive;
use crate::symbol::SymbolTable;
use crate::value::{ObjRef, Value};

/// Host output hook used by `IO`
pub type WriteHandler = Box<dyn FnMut(&str)>;

/// Nesting limit when rendering lists for the host
const MAX_RENDER_DEPTH: usize = 16;

/// A Finch virtual machine
pub struct Vm {
    pub(crate) config: VmConfig,
    pub(crate) heap: Heap,
    pub(crate) method_names: SymbolTable,
    pub(crate) global_names: SymbolTable,
    pub(crate) globals: Vec<Value>,
    pub(crate) classes: CoreClasses,
    /// The running fiber while the dispatch loop is active
    pub(crate) current_fiber: Option<ObjRef>,
    write_handler: WriteHandler,
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("config", &self.config)
            .field("heap", &self.heap.stats())
            .field("methods", &self.method_names.len())
            .field("globals", &self.globals.len())
            .finish()
    }
}

impl Vm {
    /// Create a VM and bootstrap the core classes
    pub fn new(config: VmConfig) -> VmResult<Self> {
        let mut vm = Self {
            heap: Heap::new(config.max_heap_objects),
            method_names: SymbolTable::new(),
            global_names: SymbolTable::new(),
            globals: Vec::new(),
            classes: CoreClasses::placeholder(),
            current_fiber: None,
            write_handler: Box::new(|text| {
                let mut stdout = std::io::stdout();
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }),
            config,
        };
        intrinsics::bootstrap(&mut vm)?;
        Ok(vm)
    }

    /// Compile `source` as module `module` and run it to completion
    pub fn interpret(&mut self, module: &str, source: &str) -> VmResult<()> {
        let function = self.compile(module, source)?;
        let entry = self.new_function(Rc::new(function), None);
        let fiber = self
            .new_fiber(Value::Obj(entry))
            .ok_or_else(|| VmError::internal("module function is not callable"))?;
        self.run_fiber(fiber)
    }

    /// Compile `source` against this VM's symbol tables without running it
    ///
    /// Globals the module declares are reserved (as null) even though the
    /// code never runs.
    pub fn compile(&mut self, module: &str, source: &str) -> VmResult<Function> {
        let mut symbols = CompileSymbols {
            method_names: &mut self.method_names,
            global_names: &mut self.global_names,
            globals: &mut self.globals,
        };
        let function = finch_vm_compiler::compile(source, module, &mut symbols)?;
        debug!(
            module,
            instructions = function.code.len(),
            "compiled module"
        );
        Ok(function)
    }

    /// Configuration
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// The core classes
    pub fn classes(&self) -> &CoreClasses {
        &self.classes
    }

    /// The object heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Value of a global variable
    pub fn global(&self, name: &str) -> Option<Value> {
        self.global_names
            .find(name)
            .and_then(|slot| self.globals.get(slot as usize).copied())
    }

    /// Replace the output hook used by `IO.print` and `IO.write`
    pub fn set_write_handler(&mut self, handler: impl FnMut(&str) + 'static) {
        self.write_handler = Box::new(handler);
    }

    pub(crate) fn write(&mut self, text: &str) {
        (self.write_handler)(text);
    }

    /// Run `f` with `obj` pinned, releasing the pin afterwards
    pub fn with_pinned<T>(&mut self, obj: ObjRef, f: impl FnOnce(&mut Self) -> T) -> T {
        self.heap.pin(obj);
        let result = f(self);
        self.heap.unpin();
        result
    }

    // ==================== Classes and methods ====================

    /// Class of any value
    pub fn class_of(&self, value: Value) -> ObjRef {
        match value {
            Value::Null => self.classes.null,
            Value::Bool(_) => self.classes.bool,
            Value::Num(_) => self.classes.num,
            Value::Obj(r) => self.heap.get(r).class.unwrap_or(self.classes.string),
        }
    }

    /// Name of a class, or an empty string for non-classes
    pub fn class_name(&self, class: ObjRef) -> String {
        self.heap
            .class(class)
            .and_then(|c| self.heap.string(c.name))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    /// Intern a method signature key
    pub fn method_symbol(&mut self, key: &str) -> SymbolIndex {
        SymbolIndex(self.method_names.ensure(key))
    }

    /// Bind a native method to `class` under signature `key`
    pub fn bind_primitive(&mut self, class: ObjRef, key: &str, primitive: Primitive) {
        let symbol = self.method_symbol(key);
        self.bind_method(class, symbol, Method::Primitive(primitive));
    }

    pub(crate) fn bind_method(&mut self, class: ObjRef, symbol: SymbolIndex, method: Method) {
        if let Some(class) = self.heap.class_mut(class) {
            class.bind(symbol, method);
        }
    }

    /// Find a method, starting at `class` and walking up the superclasses
    pub fn find_method(&self, class: ObjRef, symbol: SymbolIndex) -> Method {
        let mut current = Some(class);
        while let Some(c) = current {
            let Some(class) = self.heap.class(c) else {
                break;
            };
            match class.method(symbol) {
                Method::Unbound => current = class.superclass,
                method => return method,
            }
        }
        Method::Unbound
    }

    /// Make `superclass` the superclass of `subclass`, inheriting its fields
    /// and copying down its methods
    pub(crate) fn bind_superclass(&mut self, subclass: ObjRef, superclass: ObjRef) {
        let Some((methods, fields)) = self
            .heap
            .class(superclass)
            .map(|c| (c.methods.clone(), c.num_fields))
        else {
            return;
        };
        if let Some(class) = self.heap.class_mut(subclass) {
            class.superclass = Some(superclass);
            class.num_fields += fields;
            for (symbol, method) in methods.into_iter().enumerate() {
                if !matches!(method, Method::Unbound) {
                    class.bind(SymbolIndex(symbol as u32), method);
                }
            }
        }
    }

    /// Create a class with a synthesized metaclass
    ///
    /// The metaclass is named `"<name> metaclass"`, inherits from `Class`
    /// and is itself an instance of `Class`.
    pub(crate) fn new_class(&mut self, superclass: ObjRef, own_fields: usize, name: ObjRef) -> ObjRef {
        let class_class = self.classes.class;
        self.with_pinned(name, |vm| {
            let mut meta_name = vm.heap.string(name).unwrap_or_default().to_vec();
            meta_name.extend_from_slice(b" metaclass");
            let meta_name = vm.new_string_obj(meta_name);

            let metaclass = vm.with_pinned(meta_name, |vm| {
                let meta = vm
                    .heap
                    .alloc(Some(class_class), ObjKind::Class(Class::new(meta_name)));
                vm.bind_superclass(meta, class_class);
                meta
            });

            vm.with_pinned(metaclass, |vm| {
                let mut class = Class::new(name);
                class.synthesized_metaclass = true;
                let class = vm.heap.alloc(Some(metaclass), ObjKind::Class(class));
                vm.bind_superclass(class, superclass);
                if let Some(c) = vm.heap.class_mut(class) {
                    c.num_fields += own_fields;
                }
                class
            })
        })
    }

    // ==================== Globals ====================

    /// Define or overwrite a global variable
    pub fn define_global(&mut self, name: &str, value: Value) {
        let slot = self.global_names.ensure(name) as usize;
        if slot >= self.globals.len() {
            self.globals.resize(slot + 1, Value::Null);
        }
        self.globals[slot] = value;
    }

    // ==================== Allocation ====================

    /// Allocate a string object
    pub(crate) fn new_string_obj(&mut self, bytes: impl Into<Vec<u8>>) -> ObjRef {
        let class = self.classes.string_class();
        self.heap
            .alloc(class, ObjKind::String(bytes.into().into_boxed_slice()))
    }

    /// Allocate a string value
    pub fn new_string(&mut self, bytes: impl Into<Vec<u8>>) -> Value {
        Value::Obj(self.new_string_obj(bytes))
    }

    /// Allocate a list
    pub fn new_list(&mut self, items: Vec<Value>) -> Value {
        let class = self.classes.list;
        Value::Obj(self.heap.alloc(Some(class), ObjKind::List(items)))
    }

    /// Allocate a range
    pub fn new_range(&mut self, from: f64, to: f64, is_inclusive: bool) -> Value {
        let class = self.classes.range;
        let range = Range {
            from,
            to,
            is_inclusive,
        };
        Value::Obj(self.heap.alloc(Some(class), ObjKind::Range(range)))
    }

    /// Allocate an instance of `class` with every field null
    pub(crate) fn new_instance(&mut self, class: ObjRef) -> Value {
        let fields = self.heap.class(class).map(|c| c.num_fields).unwrap_or(0);
        let instance = Instance {
            fields: vec![Value::Null; fields],
        };
        Value::Obj(self.heap.alloc(Some(class), ObjKind::Instance(instance)))
    }

    /// Allocate a function object, materializing its constants
    ///
    /// Nested functions become `Fn` objects bound to the same class, so a
    /// block inside a method can still use `super`.
    pub(crate) fn new_function(&mut self, proto: Rc<Function>, bound_class: Option<ObjRef>) -> ObjRef {
        let mut constants = Vec::with_capacity(proto.constants.len());
        for constant in proto.constants.iter() {
            let value = match constant {
                Constant::Number(n) => Value::Num(*n),
                Constant::String(bytes) => self.new_string(bytes.clone()),
                Constant::Function(nested) => {
                    let nested = Rc::new(nested.as_ref().clone());
                    Value::Obj(self.new_function(nested, bound_class))
                }
            };
            constants.push(value);
        }

        let class = self.classes.fn_class;
        self.heap.alloc(
            Some(class),
            ObjKind::Fn(FnObj {
                proto,
                constants,
                bound_class,
            }),
        )
    }

    /// Allocate a closure over `function`
    pub(crate) fn new_closure(&mut self, function: ObjRef, upvalues: Vec<ObjRef>) -> ObjRef {
        let class = self.classes.fn_class;
        self.heap.alloc(
            Some(class),
            ObjKind::Closure(Closure { function, upvalues }),
        )
    }

    /// Allocate a fiber that will call `callable` with no receiver
    pub fn new_fiber(&mut self, callable: Value) -> Option<ObjRef> {
        let entry = self.frame_for(callable, 0)?;
        let fiber = Fiber::new(entry, self.config.initial_stack_capacity);
        let class = self.classes.fiber;
        Some(self.heap.alloc(Some(class), ObjKind::Fiber(Box::new(fiber))))
    }

    /// Build a call frame for a `Fn` or closure whose receiver is at
    /// `stack_start`
    pub(crate) fn frame_for(&self, callable: Value, stack_start: usize) -> Option<Frame> {
        let r = callable.as_obj()?;
        let (function, closure) = match &self.heap.get(r).kind {
            ObjKind::Fn(_) => (r, None),
            ObjKind::Closure(c) => (c.function, Some(r)),
            _ => return None,
        };
        let proto = self.heap.function(function)?.proto.clone();
        Some(Frame {
            function,
            closure,
            proto,
            ip: 0,
            stack_start,
        })
    }

    /// State of a fiber object
    pub fn fiber_state(&self, fiber: ObjRef) -> Option<FiberState> {
        let is_current = self.current_fiber == Some(fiber);
        self.heap.fiber(fiber).map(|f| f.state(is_current))
    }

    /// Number of declared parameters of a `Fn` or closure
    pub(crate) fn arity_of(&self, callable: Value) -> Option<u8> {
        self.frame_for(callable, 0).map(|frame| frame.proto.arity)
    }

    // ==================== Comparison and rendering ====================

    /// Equality used by `Object.==`
    ///
    /// Numbers compare by bit pattern, strings and ranges structurally and
    /// every other object by identity.
    pub fn values_equal(&self, a: Value, b: Value) -> bool {
        match (a, b) {
            (Value::Num(x), Value::Num(y)) => x.to_bits() == y.to_bits(),
            (Value::Obj(x), Value::Obj(y)) => {
                if x == y {
                    return true;
                }
                match (&self.heap.get(x).kind, &self.heap.get(y).kind) {
                    (ObjKind::String(s1), ObjKind::String(s2)) => s1 == s2,
                    (ObjKind::Range(r1), ObjKind::Range(r2)) => r1 == r2,
                    _ => false,
                }
            }
            _ => a == b,
        }
    }

    /// Render a value for the host without running any Finch code
    pub fn value_to_string(&self, value: Value) -> String {
        self.render(value, 0)
    }

    fn render(&self, value: Value, depth: usize) -> String {
        let r = match value {
            Value::Null => return "null".to_string(),
            Value::Bool(b) => return b.to_string(),
            Value::Num(n) => return format_number(n),
            Value::Obj(r) => r,
        };
        match &self.heap.get(r).kind {
            ObjKind::String(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            ObjKind::List(_) if depth >= MAX_RENDER_DEPTH => "[...]".to_string(),
            ObjKind::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| self.render(*v, depth + 1)).collect();
                format!("[{}]", parts.join(", "))
            }
            ObjKind::Range(range) => format!(
                "{}{}{}",
                format_number(range.from),
                if range.is_inclusive { ".." } else { "..." },
                format_number(range.to)
            ),
            ObjKind::Fn(_) | ObjKind::Closure(_) => "<fn>".to_string(),
            ObjKind::Fiber(_) => "<fiber>".to_string(),
            ObjKind::Upvalue(_) => "<upvalue>".to_string(),
            ObjKind::Class(_) => self.class_name(r),
            ObjKind::Instance(_) => format!("instance of {}", self.class_name(self.class_of(value))),
        }
    }
}

/// The VM's symbol tables, seen through the compiler's eyes
struct CompileSymbols<'a> {
    method_names: &'a mut SymbolTable,
    global_names: &'a mut SymbolTable,
    globals: &'a mut Vec<Value>,
}

impl SymbolResolver for CompileSymbols<'_> {
    fn method_symbol(&mut self, signature: &str) -> SymbolIndex {
        SymbolIndex(self.method_names.ensure(signature))
    }

    fn global_slot(&self, name: &str) -> Option<GlobalIndex> {
        self.global_names.find(name).map(GlobalIndex)
    }

    fn define_global(&mut self, name: &str) -> GlobalIndex {
        let slot = self.global_names.ensure(name);
        if slot as usize >= self.globals.len() {
            self.globals.resize(slot as usize + 1, Value::Null);
        }
        GlobalIndex(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm() -> Vm {
        Vm::new(VmConfig::default()).unwrap()
    }

    #[test]
    fn test_values_equal() {
        let mut vm = vm();
        let a = vm.new_string("abc");
        let b = vm.new_string("abc");
        let c = vm.new_string("abd");
        assert!(vm.values_equal(a, b));
        assert!(!vm.values_equal(a, c));
        assert!(vm.values_equal(Value::Null, Value::Null));
        assert!(!vm.values_equal(Value::Num(0.0), Value::Num(-0.0)));

        let r1 = vm.new_range(1.0, 3.0, true);
        let r2 = vm.new_range(1.0, 3.0, true);
        let r3 = vm.new_range(1.0, 3.0, false);
        assert!(vm.values_equal(r1, r2));
        assert!(!vm.values_equal(r1, r3));
    }

    #[test]
    fn test_value_to_string() {
        let mut vm = vm();
        let s = vm.new_string("hi");
        let range = vm.new_range(1.0, 3.0, false);
        let list = vm.new_list(vec![Value::Num(1.0), s, Value::Null, range]);
        assert_eq!(vm.value_to_string(list), "[1, hi, null, 1...3]");
        assert_eq!(vm.value_to_string(Value::Bool(true)), "true");
        let num = Value::Obj(vm.classes.num);
        assert_eq!(vm.value_to_string(num), "Num");
    }

    #[test]
    fn test_self_containing_list_renders() {
        let mut vm = vm();
        let list = vm.new_list(Vec::new());
        let r = list.as_obj().unwrap();
        vm.heap.list_mut(r).unwrap().push(list);
        assert!(vm.value_to_string(list).contains("[...]"));
    }

    #[test]
    fn test_define_global() {
        let mut vm = vm();
        vm.define_global("answer", Value::Num(42.0));
        assert_eq!(vm.global("answer"), Some(Value::Num(42.0)));
        assert_eq!(vm.global("missing"), None);
    }

    #[test]
    fn test_with_pinned_releases() {
        let mut vm = vm();
        let s = vm.new_string_obj("tmp");
        let pinned_inside = vm.with_pinned(s, |vm| vm.heap.is_pinned(s));
        assert!(pinned_inside);
        assert!(!vm.heap.is_pinned(s));
    }
}
