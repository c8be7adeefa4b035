//! Bytecode interpreter
//!
//! The dispatch loop runs the current fiber until the entry fiber finishes
//! or an error escapes every fiber. Fibers live on the heap, so every
//! instruction reaches the stack through the fiber's [`ObjRef`]; switching
//! fibers is a matter of changing which reference the loop holds.

use std::rc::Rc;

use finch_vm_bytecode::{
    FieldIndex, Instruction, MAX_FIELDS, Signature, SymbolIndex, UpvalueCapture,
};
use tracing::{trace, warn};

use crate::error::{StackFrame, VmError, VmResult};
use crate::object::{Method, ObjKind, Upvalue};
use crate::primitive::{ArgWindow, Primitive, PrimitiveResult};
use crate::value::{ObjRef, Value};
use crate::vm::Vm;

/// What the loop does after an instruction
#[derive(Debug)]
enum Step {
    /// Keep running the current fiber
    Continue,
    /// Make another fiber current
    Switch(ObjRef),
    /// The current fiber failed with this payload
    Error(Value),
    /// The entry fiber finished
    Finished,
}

/// Position of the instruction being executed
#[derive(Debug, Clone, Copy)]
struct FrameInfo {
    function: ObjRef,
    closure: Option<ObjRef>,
    stack_start: usize,
    /// Index of the instruction itself, not of the next one
    ip: usize,
}

impl Vm {
    /// Run `fiber` until it, or a fiber it hands control to without a
    /// caller, finishes
    pub(crate) fn run_fiber(&mut self, fiber: ObjRef) -> VmResult<()> {
        let previous = self.current_fiber.replace(fiber);
        let result = self.run_loop(fiber);
        self.current_fiber = previous;
        result
    }

    fn run_loop(&mut self, mut fiber: ObjRef) -> VmResult<()> {
        loop {
            self.heap.check_limit()?;

            let (instruction, frame) = {
                let f = self.heap.expect_fiber_mut(fiber)?;
                let Some(frame) = f.frames.last_mut() else {
                    return Err(VmError::internal("fiber has no frames to run"));
                };
                let Some(instruction) = frame.proto.code.get(frame.ip).copied() else {
                    return Err(VmError::internal(format!(
                        "ran past the end of '{}'",
                        frame.proto.display_name()
                    )));
                };
                let info = FrameInfo {
                    function: frame.function,
                    closure: frame.closure,
                    stack_start: frame.stack_start,
                    ip: frame.ip,
                };
                frame.ip += 1;
                (instruction, info)
            };

            let next = match self.execute(fiber, instruction, frame)? {
                Step::Continue => continue,
                Step::Finished => return Ok(()),
                Step::Switch(next) => next,
                Step::Error(payload) => self.fail_fiber(fiber, payload)?,
            };

            if self.config.trace_fibers {
                trace!(from = %fiber, to = %next, "fiber switch");
            }
            fiber = next;
            self.current_fiber = Some(next);
        }
    }

    fn execute(&mut self, fiber: ObjRef, instruction: Instruction, frame: FrameInfo) -> VmResult<Step> {
        match instruction {
            Instruction::Constant { idx } => {
                let value = self
                    .heap
                    .function(frame.function)
                    .and_then(|f| f.constants.get(idx.index()).copied())
                    .ok_or_else(|| VmError::internal(format!("missing constant {}", idx.index())))?;
                self.push(fiber, value)?;
            }
            Instruction::Null => self.push(fiber, Value::Null)?,
            Instruction::False => self.push(fiber, Value::Bool(false))?,
            Instruction::True => self.push(fiber, Value::Bool(true))?,

            Instruction::LoadLocal { slot } => {
                let value = self.slot(fiber, frame.stack_start + slot.index())?;
                self.push(fiber, value)?;
            }
            Instruction::StoreLocal { slot } => {
                let value = self.peek(fiber)?;
                self.set_slot(fiber, frame.stack_start + slot.index(), value)?;
            }
            Instruction::LoadUpvalue { idx } => {
                let upvalue = self.frame_upvalue(frame.closure, idx)?;
                let value = self.read_upvalue(upvalue)?;
                self.push(fiber, value)?;
            }
            Instruction::StoreUpvalue { idx } => {
                let upvalue = self.frame_upvalue(frame.closure, idx)?;
                let value = self.peek(fiber)?;
                self.write_upvalue(upvalue, value)?;
            }
            Instruction::LoadGlobal { slot } => {
                let value = self.globals.get(slot.index()).copied().unwrap_or_default();
                self.push(fiber, value)?;
            }
            Instruction::StoreGlobal { slot } => {
                let value = self.peek(fiber)?;
                if slot.index() >= self.globals.len() {
                    self.globals.resize(slot.index() + 1, Value::Null);
                }
                self.globals[slot.index()] = value;
            }

            Instruction::LoadFieldThis { field } => {
                let receiver = self.slot(fiber, frame.stack_start)?;
                match self.field(receiver, field) {
                    Some(value) => self.push(fiber, value)?,
                    None => return Ok(self.runtime_error("Only instances have fields.")),
                }
            }
            Instruction::StoreFieldThis { field } => {
                let receiver = self.slot(fiber, frame.stack_start)?;
                let value = self.peek(fiber)?;
                if !self.set_field(receiver, field, value) {
                    return Ok(self.runtime_error("Only instances have fields."));
                }
            }
            Instruction::LoadField { field } => {
                let instance = self.pop(fiber)?;
                match self.field(instance, field) {
                    Some(value) => self.push(fiber, value)?,
                    None => return Ok(self.runtime_error("Only instances have fields.")),
                }
            }
            Instruction::StoreField { field } => {
                let instance = self.pop(fiber)?;
                let value = self.peek(fiber)?;
                if !self.set_field(instance, field, value) {
                    return Ok(self.runtime_error("Only instances have fields."));
                }
            }

            Instruction::Pop => {
                self.pop(fiber)?;
            }

            Instruction::Call { symbol, args } => {
                let args_start = self.args_start(fiber, args)?;
                let receiver = self.slot(fiber, args_start)?;
                let class = self.class_of(receiver);
                let method = self.find_method(class, symbol);
                return self.invoke(fiber, method, class, symbol, args_start);
            }
            Instruction::Super { symbol, args } => {
                let args_start = self.args_start(fiber, args)?;
                let bound = self.heap.function(frame.function).and_then(|f| f.bound_class);
                let Some(bound) = bound else {
                    return Ok(self.runtime_error("Cannot use 'super' outside of a method."));
                };
                let Some(superclass) = self.heap.class(bound).and_then(|c| c.superclass) else {
                    return Ok(self.missing_method(bound, symbol));
                };
                let method = self.find_method(superclass, symbol);
                return self.invoke(fiber, method, superclass, symbol, args_start);
            }

            Instruction::Jump { offset } => self.jump(fiber, offset.target(frame.ip))?,
            Instruction::JumpIfFalse { offset } => {
                if self.pop(fiber)?.is_falsey() {
                    self.jump(fiber, offset.target(frame.ip))?;
                }
            }
            Instruction::And { offset } => {
                if self.peek(fiber)?.is_falsey() {
                    self.jump(fiber, offset.target(frame.ip))?;
                } else {
                    self.pop(fiber)?;
                }
            }
            Instruction::Or { offset } => {
                if self.peek(fiber)?.is_falsey() {
                    self.pop(fiber)?;
                } else {
                    self.jump(fiber, offset.target(frame.ip))?;
                }
            }
            Instruction::Return => return self.return_from_frame(fiber),

            Instruction::Is => {
                let class = self.pop(fiber)?;
                let value = self.pop(fiber)?;
                let Some(class) = class.as_obj().filter(|_| self.heap.is_class(class)) else {
                    return Ok(self.runtime_error("Right operand must be a class."));
                };
                let result = self.is_instance_of(value, class);
                self.push(fiber, Value::Bool(result))?;
            }
            Instruction::List { count } => {
                let items = {
                    let f = self.heap.expect_fiber_mut(fiber)?;
                    let start = f
                        .stack
                        .len()
                        .checked_sub(count as usize)
                        .ok_or_else(|| VmError::internal("list elements underflow the stack"))?;
                    f.stack.split_off(start)
                };
                let list = self.new_list(items);
                self.push(fiber, list)?;
            }
            Instruction::Closure { function } => {
                let constant = self
                    .heap
                    .function(frame.function)
                    .and_then(|f| f.constants.get(function.index()).copied())
                    .and_then(Value::as_obj)
                    .ok_or_else(|| VmError::internal("closure operand is not a function"))?;
                let value = self.make_closure(fiber, frame, constant)?;
                self.push(fiber, value)?;
            }
            Instruction::CloseUpvalue => {
                let top = self.stack_len(fiber)?.saturating_sub(1);
                self.close_upvalues(fiber, top)?;
                self.pop(fiber)?;
            }

            Instruction::Class { fields } => {
                let superclass = self.pop(fiber)?;
                let name = self.pop(fiber)?;
                let Some(superclass) = superclass.as_obj().filter(|_| self.heap.is_class(superclass))
                else {
                    return Ok(self.runtime_error("Class must inherit from a class."));
                };
                let name = name
                    .as_obj()
                    .filter(|r| self.heap.string(*r).is_some())
                    .ok_or_else(|| VmError::internal("class name is not a string"))?;

                let inherited = self.heap.class(superclass).map(|c| c.num_fields).unwrap_or(0);
                if inherited + fields as usize > MAX_FIELDS {
                    let name = String::from_utf8_lossy(self.heap.string(name).unwrap_or_default()).into_owned();
                    return Ok(self.runtime_error(format!(
                        "Class '{name}' may not have more than {MAX_FIELDS} fields, including inherited ones."
                    )));
                }

                let class = self.new_class(superclass, fields as usize, name);
                trace!(class = %self.class_name(class), fields, "defined class");
                self.push(fiber, Value::Obj(class))?;
            }
            Instruction::MethodInstance { symbol } => self.define_method(fiber, symbol, false)?,
            Instruction::MethodStatic { symbol } => self.define_method(fiber, symbol, true)?,
        }
        Ok(Step::Continue)
    }

    // ==================== Calls ====================

    fn invoke(
        &mut self,
        fiber: ObjRef,
        method: Method,
        class: ObjRef,
        symbol: SymbolIndex,
        args_start: usize,
    ) -> VmResult<Step> {
        match method {
            Method::Primitive(primitive) => self.call_primitive(fiber, primitive, args_start),
            Method::Block(callable) => self.call_function(fiber, Value::Obj(callable), args_start),
            Method::Unbound => Ok(self.missing_method(class, symbol)),
        }
    }

    fn call_primitive(&mut self, fiber: ObjRef, primitive: Primitive, args_start: usize) -> VmResult<Step> {
        let mut args: ArgWindow = {
            let f = self.heap.expect_fiber(fiber)?;
            let window = f
                .stack
                .get(args_start..)
                .ok_or_else(|| VmError::internal("argument window outside the stack"))?;
            ArgWindow::from_slice(window)
        };

        match primitive(self, fiber, &mut args) {
            PrimitiveResult::Value => {
                let f = self.heap.expect_fiber_mut(fiber)?;
                f.stack.truncate(args_start);
                f.stack.push(args[0]);
                Ok(Step::Continue)
            }
            PrimitiveResult::Error => Ok(Step::Error(args[0])),
            PrimitiveResult::TailCall => {
                let f = self.heap.expect_fiber_mut(fiber)?;
                if let Some(slot) = f.stack.get_mut(args_start) {
                    *slot = args[0];
                }
                self.call_function(fiber, args[0], args_start)
            }
            PrimitiveResult::FiberSwitch => {
                let next = args[0]
                    .as_obj()
                    .filter(|r| self.heap.fiber(*r).is_some())
                    .ok_or_else(|| VmError::internal("fiber switch target is not a fiber"))?;
                Ok(Step::Switch(next))
            }
        }
    }

    /// Push a frame for a `Fn` or closure whose receiver and arguments start
    /// at `args_start`
    fn call_function(&mut self, fiber: ObjRef, callable: Value, args_start: usize) -> VmResult<Step> {
        let Some(frame) = self.frame_for(callable, args_start) else {
            return Ok(self.runtime_error("Receiver must be a function."));
        };
        let max_depth = self.config.max_call_depth;
        let f = self.heap.expect_fiber_mut(fiber)?;
        if f.frames.len() >= max_depth {
            return Ok(self.runtime_error("Stack overflow."));
        }
        // Extra arguments to `Fn.call` are dropped.
        f.stack.truncate(args_start + 1 + frame.proto.arity as usize);
        f.stack.reserve(frame.proto.max_slots as usize);
        f.frames.push(frame);
        Ok(Step::Continue)
    }

    fn return_from_frame(&mut self, fiber: ObjRef) -> VmResult<Step> {
        let result = self.pop(fiber)?;
        let frame = self
            .heap
            .expect_fiber_mut(fiber)?
            .frames
            .pop()
            .ok_or_else(|| VmError::internal("return without a frame"))?;
        self.close_upvalues(fiber, frame.stack_start)?;

        let f = self.heap.expect_fiber_mut(fiber)?;
        if !f.frames.is_empty() {
            f.stack.truncate(frame.stack_start);
            f.stack.push(result);
            return Ok(Step::Continue);
        }

        f.stack.clear();
        f.caller_is_trying = false;
        match f.caller.take() {
            Some(caller) => {
                self.heap.expect_fiber_mut(caller)?.set_pending_result(result);
                Ok(Step::Switch(caller))
            }
            None => Ok(Step::Finished),
        }
    }

    fn args_start(&self, fiber: ObjRef, args: u8) -> VmResult<usize> {
        self.stack_len(fiber)?
            .checked_sub(args as usize + 1)
            .ok_or_else(|| VmError::internal("call arguments underflow the stack"))
    }

    // ==================== Classes ====================

    fn is_instance_of(&self, value: Value, class: ObjRef) -> bool {
        let mut current = Some(self.class_of(value));
        while let Some(c) = current {
            if c == class {
                return true;
            }
            current = self.heap.class(c).and_then(|c| c.superclass);
        }
        false
    }

    /// Bind the method body on top of the stack to the class below it
    ///
    /// Instance methods have their field operands shifted past the fields
    /// the superclass declares.
    fn define_method(&mut self, fiber: ObjRef, symbol: SymbolIndex, is_static: bool) -> VmResult<()> {
        let body = self.pop(fiber)?;
        let class = self
            .peek(fiber)?
            .as_obj()
            .filter(|r| self.heap.class(*r).is_some())
            .ok_or_else(|| VmError::internal("method target is not a class"))?;
        let body = body
            .as_obj()
            .ok_or_else(|| VmError::internal("method body is not a function"))?;

        let (target, offset) = if is_static {
            (self.class_of(Value::Obj(class)), 0)
        } else {
            let inherited = self
                .heap
                .class(class)
                .and_then(|c| c.superclass)
                .and_then(|s| self.heap.class(s))
                .map(|s| s.num_fields)
                .unwrap_or(0);
            (class, inherited as u8)
        };

        let bound = self.rebind(body, offset, target)?;
        self.bind_method(target, symbol, Method::Block(bound));
        Ok(())
    }

    /// Copy a method body, shifting its fields and binding it to `class`
    fn rebind(&mut self, body: ObjRef, offset: u8, class: ObjRef) -> VmResult<ObjRef> {
        let (function, upvalues) = match &self.heap.get(body).kind {
            ObjKind::Fn(_) => (body, None),
            ObjKind::Closure(c) => (c.function, Some(c.upvalues.clone())),
            other => {
                return Err(VmError::internal(format!(
                    "cannot bind a {} as a method",
                    other.type_name()
                )));
            }
        };
        let proto = self
            .heap
            .function(function)
            .map(|f| f.proto.clone())
            .ok_or_else(|| VmError::internal("closure without a function"))?;
        let proto = if offset == 0 {
            proto
        } else {
            Rc::new(proto.with_field_offset(offset))
        };

        let function = self.new_function(proto, Some(class));
        Ok(match upvalues {
            Some(upvalues) => self.with_pinned(function, |vm| vm.new_closure(function, upvalues)),
            None => function,
        })
    }

    fn field(&self, instance: Value, field: FieldIndex) -> Option<Value> {
        let instance = self.heap.instance(instance.as_obj()?)?;
        instance.fields.get(field.index()).copied()
    }

    fn set_field(&mut self, instance: Value, field: FieldIndex, value: Value) -> bool {
        let Some(instance) = instance.as_obj().and_then(|r| self.heap.instance_mut(r)) else {
            return false;
        };
        match instance.fields.get_mut(field.index()) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    // ==================== Upvalues ====================

    fn make_closure(&mut self, fiber: ObjRef, frame: FrameInfo, function: ObjRef) -> VmResult<Value> {
        let captures = self
            .heap
            .function(function)
            .map(|f| f.proto.upvalues.clone())
            .ok_or_else(|| VmError::internal("closure operand is not a function"))?;
        if captures.is_empty() {
            return Ok(Value::Obj(function));
        }

        let mut upvalues = Vec::with_capacity(captures.len());
        for capture in captures {
            let upvalue = match capture {
                UpvalueCapture::Local(slot) => {
                    self.capture_upvalue(fiber, frame.stack_start + slot.index())?
                }
                UpvalueCapture::Upvalue(idx) => self.frame_upvalue(frame.closure, idx)?,
            };
            upvalues.push(upvalue);
        }
        Ok(Value::Obj(self.new_closure(function, upvalues)))
    }

    /// Reuse the open upvalue for `slot` or create one
    fn capture_upvalue(&mut self, fiber: ObjRef, slot: usize) -> VmResult<ObjRef> {
        if let Some(existing) = self.heap.expect_fiber(fiber)?.find_open_upvalue(slot) {
            return Ok(existing);
        }
        let upvalue = self
            .heap
            .alloc(None, ObjKind::Upvalue(Upvalue::Open { fiber, slot }));
        self.heap.expect_fiber_mut(fiber)?.add_open_upvalue(slot, upvalue);
        Ok(upvalue)
    }

    fn close_upvalues(&mut self, fiber: ObjRef, from: usize) -> VmResult<()> {
        let closed = self.heap.expect_fiber_mut(fiber)?.take_upvalues_from(from);
        for (upvalue, value) in closed {
            if let Some(u) = self.heap.upvalue_mut(upvalue) {
                *u = Upvalue::Closed(value);
            }
        }
        Ok(())
    }

    fn frame_upvalue(&self, closure: Option<ObjRef>, idx: u16) -> VmResult<ObjRef> {
        closure
            .and_then(|c| self.heap.closure(c))
            .and_then(|c| c.upvalues.get(idx as usize).copied())
            .ok_or_else(|| VmError::internal(format!("missing upvalue {idx}")))
    }

    fn read_upvalue(&self, upvalue: ObjRef) -> VmResult<Value> {
        match self.heap.upvalue(upvalue) {
            Some(Upvalue::Open { fiber, slot }) => self.slot(fiber, slot),
            Some(Upvalue::Closed(value)) => Ok(value),
            None => Err(VmError::internal(format!("{upvalue} is not an upvalue"))),
        }
    }

    fn write_upvalue(&mut self, upvalue: ObjRef, value: Value) -> VmResult<()> {
        match self.heap.upvalue(upvalue) {
            Some(Upvalue::Open { fiber, slot }) => self.set_slot(fiber, slot, value),
            Some(Upvalue::Closed(_)) => {
                if let Some(u) = self.heap.upvalue_mut(upvalue) {
                    *u = Upvalue::Closed(value);
                }
                Ok(())
            }
            None => Err(VmError::internal(format!("{upvalue} is not an upvalue"))),
        }
    }

    // ==================== Errors ====================

    fn runtime_error(&mut self, message: impl Into<String>) -> Step {
        Step::Error(self.new_string(message.into()))
    }

    fn missing_method(&mut self, class: ObjRef, symbol: SymbolIndex) -> Step {
        let key = self.method_names.name(symbol.0).unwrap_or_default();
        let message = format!(
            "{} does not implement '{}'.",
            self.class_name(class),
            Signature::from_key(key)
        );
        self.runtime_error(message)
    }

    /// Fail `fiber` and find the fiber that handles the error
    ///
    /// A caller that used `try` receives the error as the result of its
    /// call. Any other caller fails with the same error in turn. When the
    /// chain runs out the error escapes to the embedder, with the trace of
    /// the fiber that failed first.
    fn fail_fiber(&mut self, fiber: ObjRef, error: Value) -> VmResult<ObjRef> {
        let stack = self.stack_trace(fiber)?;
        let message = match self.heap.string_value(error) {
            Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            None => self.value_to_string(error),
        };
        trace!(fiber = %fiber, %message, "fiber failed");

        let mut failing = fiber;
        loop {
            let f = self.heap.expect_fiber_mut(failing)?;
            f.error = Some(error);
            let trying = std::mem::take(&mut f.caller_is_trying);
            match f.caller.take() {
                Some(caller) if trying => {
                    self.heap.expect_fiber_mut(caller)?.set_pending_result(error);
                    return Ok(caller);
                }
                Some(caller) => failing = caller,
                None => {
                    warn!(%message, "uncaught runtime error");
                    return Err(VmError::Runtime { message, stack });
                }
            }
        }
    }

    fn stack_trace(&self, fiber: ObjRef) -> VmResult<Vec<StackFrame>> {
        let f = self.heap.expect_fiber(fiber)?;
        Ok(f.frames
            .iter()
            .rev()
            .map(|frame| StackFrame {
                function_name: frame.proto.display_name().to_string(),
                line: frame.current_line(),
            })
            .collect())
    }

    // ==================== Stack access ====================

    fn push(&mut self, fiber: ObjRef, value: Value) -> VmResult<()> {
        self.heap.expect_fiber_mut(fiber)?.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, fiber: ObjRef) -> VmResult<Value> {
        self.heap
            .expect_fiber_mut(fiber)?
            .stack
            .pop()
            .ok_or_else(|| VmError::internal("stack underflow"))
    }

    fn peek(&self, fiber: ObjRef) -> VmResult<Value> {
        self.heap
            .expect_fiber(fiber)?
            .stack
            .last()
            .copied()
            .ok_or_else(|| VmError::internal("stack underflow"))
    }

    fn stack_len(&self, fiber: ObjRef) -> VmResult<usize> {
        Ok(self.heap.expect_fiber(fiber)?.stack.len())
    }

    fn slot(&self, fiber: ObjRef, index: usize) -> VmResult<Value> {
        self.heap
            .expect_fiber(fiber)?
            .stack
            .get(index)
            .copied()
            .ok_or_else(|| VmError::internal(format!("stack slot {index} out of range")))
    }

    fn set_slot(&mut self, fiber: ObjRef, index: usize, value: Value) -> VmResult<()> {
        let slot = self
            .heap
            .expect_fiber_mut(fiber)?
            .stack
            .get_mut(index)
            .ok_or_else(|| VmError::internal(format!("stack slot {index} out of range")))?;
        *slot = value;
        Ok(())
    }

    fn jump(&mut self, fiber: ObjRef, target: usize) -> VmResult<()> {
        let frame = self
            .heap
            .expect_fiber_mut(fiber)?
            .frames
            .last_mut()
            .ok_or_else(|| VmError::internal("jump without a frame"))?;
        frame.ip = target;
        Ok(())
    }
}
