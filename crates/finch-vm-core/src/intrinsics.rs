//! Core class bootstrap
//!
//! `Object` and `Class` are wired by hand: each is an instance of `Class`,
//! and `Class` is its own class. Every other core class gets a synthesized
//! metaclass. `List` and `Range` are declared by the core library written
//! in Finch and receive their native methods afterwards.

use tracing::debug;

use crate::error::{VmError, VmResult};
use crate::intrinsics_impl::{
    boolean, class, fiber, function, io, list, null, number, object, range, string,
};
use crate::object::{Class, ObjKind};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// Marks a core class that bootstrap has not created yet
const UNSET: ObjRef = ObjRef(u32::MAX);

/// The classes the VM needs direct access to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreClasses {
    /// `Object`, the root of the hierarchy
    pub object: ObjRef,
    /// `Class`, the class of every class
    pub class: ObjRef,
    /// `Bool`
    pub bool: ObjRef,
    /// `Fiber`
    pub fiber: ObjRef,
    /// `Fn`
    pub fn_class: ObjRef,
    /// `Null`
    pub null: ObjRef,
    /// `Num`
    pub num: ObjRef,
    /// `String`
    pub string: ObjRef,
    /// `List`, declared by the core library
    pub list: ObjRef,
    /// `Range`, declared by the core library
    pub range: ObjRef,
}

impl CoreClasses {
    pub(crate) fn placeholder() -> Self {
        Self {
            object: UNSET,
            class: UNSET,
            bool: UNSET,
            fiber: UNSET,
            fn_class: UNSET,
            null: UNSET,
            num: UNSET,
            string: UNSET,
            list: UNSET,
            range: UNSET,
        }
    }

    /// The String class, once it exists
    pub(crate) fn string_class(&self) -> Option<ObjRef> {
        (self.string != UNSET).then_some(self.string)
    }
}

/// Core library source, run once the native classes exist
pub const CORE_LIBRARY: &str = r#"class Sequence {
  map(f) {
    var result = []
    for (element in this) {
      result.add(f.call(element))
    }
    return result
  }

  where(f) {
    var result = []
    for (element in this) {
      if (f.call(element)) result.add(element)
    }
    return result
  }
}

class List is Sequence {
  addAll(other) {
    for (element in other) {
      add(element)
    }
    return other
  }

  toString {
    var result = "["
    for (i in 0...count) {
      if (i > 0) result = result + ", "
      result = result + this[i].toString
    }
    result = result + "]"
    return result
  }

  +(other) {
    var result = this[0..-1]
    for (element in other) {
      result.add(element)
    }
    return result
  }

  contains(element) {
    for (item in this) {
      if (element == item) {
        return true
      }
    }
    return false
  }
}

class Range is Sequence {}

class IO {
  static print(obj) {
    IO.writeString_(obj.toString)
    IO.writeString_("\n")
    return obj
  }

  static write(obj) {
    IO.writeString_(obj.toString)
    return obj
  }
}
"#;

/// Create the core classes and run the core library
pub(crate) fn bootstrap(vm: &mut Vm) -> VmResult<()> {
    // Object and Class refer to each other, so they are built in steps.
    let object_class = define_single_class(vm, "Object");
    vm.classes.object = object_class;
    object::init_object(vm, object_class);

    let class_class = define_single_class(vm, "Class");
    vm.classes.class = class_class;
    vm.bind_superclass(class_class, object_class);
    vm.heap.get_mut(object_class).class = Some(class_class);
    vm.heap.get_mut(class_class).class = Some(class_class);
    class::init_class(vm, class_class);

    let bool_class = define_class(vm, "Bool", object_class);
    vm.classes.bool = bool_class;
    boolean::init_bool(vm, bool_class);

    let fiber_class = define_class(vm, "Fiber", object_class);
    vm.classes.fiber = fiber_class;
    fiber::init_fiber(vm, fiber_class);

    let fn_class = define_class(vm, "Fn", object_class);
    vm.classes.fn_class = fn_class;
    function::init_fn(vm, fn_class);

    let null_class = define_class(vm, "Null", object_class);
    vm.classes.null = null_class;
    null::init_null(vm, null_class);

    let num_class = define_class(vm, "Num", object_class);
    vm.classes.num = num_class;
    number::init_num(vm, num_class);

    let string_class = define_class(vm, "String", object_class);
    vm.classes.string = string_class;
    string::init_string(vm, string_class);

    // Names allocated before String existed.
    for index in 0..vm.heap.stats().objects {
        let obj = vm.heap.get_mut(ObjRef(index as u32));
        if obj.class.is_none() && matches!(obj.kind, ObjKind::String(_)) {
            obj.class = Some(string_class);
        }
    }

    vm.interpret("core", CORE_LIBRARY)
        .map_err(|err| VmError::Bootstrap(err.report()))?;

    let list_class = core_library_class(vm, "List")?;
    vm.classes.list = list_class;
    list::init_list(vm, list_class);

    let range_class = core_library_class(vm, "Range")?;
    vm.classes.range = range_class;
    range::init_range(vm, range_class);

    let io_class = core_library_class(vm, "IO")?;
    io::init_io(vm, io_class);

    // Num's own equality goes in last so 0 == -0 holds.
    number::init_num_equality(vm, num_class);

    debug!(
        objects = vm.heap.stats().objects,
        methods = vm.method_names.len(),
        globals = vm.globals.len(),
        "core classes ready"
    );
    Ok(())
}

/// Define a class that has no metaclass of its own
fn define_single_class(vm: &mut Vm, name: &str) -> ObjRef {
    let name_ref = vm.heap.alloc(
        vm.classes.string_class(),
        ObjKind::String(name.as_bytes().into()),
    );
    let class = vm.with_pinned(name_ref, |vm| {
        vm.heap.alloc(None, ObjKind::Class(Class::new(name_ref)))
    });
    vm.define_global(name, Value::Obj(class));
    class
}

/// Define a class with a synthesized metaclass
fn define_class(vm: &mut Vm, name: &str, superclass: ObjRef) -> ObjRef {
    let name_ref = vm.new_string_obj(name);
    let class = vm.new_class(superclass, 0, name_ref);
    vm.define_global(name, Value::Obj(class));
    class
}

fn core_library_class(vm: &Vm, name: &str) -> VmResult<ObjRef> {
    vm.global(name)
        .and_then(Value::as_obj)
        .filter(|r| vm.heap.class(*r).is_some())
        .ok_or_else(|| VmError::Bootstrap(format!("core library did not define '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VmConfig;

    #[test]
    fn test_object_and_class_are_wired() {
        let vm = Vm::new(VmConfig::default()).unwrap();
        let c = vm.classes;
        assert_eq!(vm.class_of(Value::Obj(c.object)), c.class);
        assert_eq!(vm.class_of(Value::Obj(c.class)), c.class);
        assert_eq!(vm.heap.class(c.class).unwrap().superclass, Some(c.object));
        assert_eq!(vm.heap.class(c.object).unwrap().superclass, None);
        assert!(!vm.heap.class(c.object).unwrap().synthesized_metaclass);
    }

    #[test]
    fn test_metaclasses_are_synthesized() {
        let vm = Vm::new(VmConfig::default()).unwrap();
        for class in [vm.classes.num, vm.classes.list, vm.classes.fiber] {
            let meta = vm.class_of(Value::Obj(class));
            assert_ne!(meta, vm.classes.class);
            assert_eq!(vm.class_of(Value::Obj(meta)), vm.classes.class);
            assert_eq!(vm.heap.class(meta).unwrap().superclass, Some(vm.classes.class));
            assert_eq!(vm.class_name(meta), format!("{} metaclass", vm.class_name(class)));
        }
    }

    #[test]
    fn test_every_string_has_a_class() {
        let vm = Vm::new(VmConfig::default()).unwrap();
        let name = vm.heap.class(vm.classes.object).unwrap().name;
        assert_eq!(vm.heap.get(name).class, Some(vm.classes.string));
    }

    #[test]
    fn test_core_library_classes() {
        let vm = Vm::new(VmConfig::default()).unwrap();
        let sequence = vm.global("Sequence").and_then(Value::as_obj).unwrap();
        assert_eq!(vm.heap.class(vm.classes.list).unwrap().superclass, Some(sequence));
        assert_eq!(vm.heap.class(vm.classes.range).unwrap().superclass, Some(sequence));
        assert!(vm.global("IO").is_some());
    }
}
