//! Fibers: cooperatively scheduled execution contexts
//!
//! A fiber exclusively owns its frame stack and value stack. Frames address
//! the value stack by index, so a suspended fiber keeps its position no
//! matter how the stack grows later.
//!
//! Control transfer between fibers (`call`, `run`, `try`, `yield`, `abort`)
//! is implemented by the Fiber primitives in
//! [`crate::intrinsics_impl::fiber`]; the dispatch loop only follows the
//! `FiberSwitch` and `Error` signals they return.

use std::rc::Rc;

use finch_vm_bytecode::Function;

use crate::value::{ObjRef, Value};

/// A call frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// The `Fn` object being executed (owns the constants)
    pub function: ObjRef,
    /// The closure, if the function captures variables
    pub closure: Option<ObjRef>,
    /// Bytecode
    pub proto: Rc<Function>,
    /// Next instruction
    pub ip: usize,
    /// Stack index of slot 0 (the receiver)
    pub stack_start: usize,
}

impl Frame {
    /// Source line of the instruction that is executing
    pub fn current_line(&self) -> u32 {
        self.proto
            .line_at(self.ip.saturating_sub(1))
            .unwrap_or(0)
    }
}

/// Observable fiber state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberState {
    /// Entry call loaded, never run
    Fresh,
    /// The VM's current fiber
    Running,
    /// Waiting to be resumed
    Suspended,
    /// Returned from its entry function
    Done,
    /// Stopped with an error
    Failed,
}

/// A fiber
#[derive(Debug)]
pub struct Fiber {
    /// Call frames, innermost last
    pub frames: Vec<Frame>,
    /// Value stack
    pub stack: Vec<Value>,
    /// Fiber to resume when this one yields or finishes
    pub caller: Option<ObjRef>,
    /// The caller used `try`, so errors come back to it as values
    pub caller_is_trying: bool,
    /// Error string, once failed
    pub error: Option<Value>,
    /// Open upvalues pointing into this stack, by ascending slot
    pub open_upvalues: Vec<(usize, ObjRef)>,
}

impl Fiber {
    /// Create a fiber that will run `entry` as its first frame
    ///
    /// Slot 0 is the receiver slot of the entry function; fibers have no
    /// receiver, so it holds null.
    pub fn new(entry: Frame, stack_capacity: usize) -> Self {
        let mut stack = Vec::with_capacity(stack_capacity.max(entry.proto.max_slots as usize));
        stack.push(Value::Null);
        Self {
            frames: vec![entry],
            stack,
            caller: None,
            caller_is_trying: false,
            error: None,
            open_upvalues: Vec::new(),
        }
    }

    /// Entry call loaded and never started
    pub fn is_fresh(&self) -> bool {
        self.frames.len() == 1 && self.frames[0].ip == 0 && self.error.is_none()
    }

    /// Finished normally or failed
    pub fn is_done(&self) -> bool {
        self.frames.is_empty() || self.error.is_some()
    }

    /// State of this fiber given which fiber is running
    pub fn state(&self, is_current: bool) -> FiberState {
        if self.error.is_some() {
            FiberState::Failed
        } else if self.frames.is_empty() {
            FiberState::Done
        } else if is_current {
            FiberState::Running
        } else if self.is_fresh() {
            FiberState::Fresh
        } else {
            FiberState::Suspended
        }
    }

    /// Write the value a suspended `call`/`run`/`try`/`yield` is waiting for
    ///
    /// The waiting call left exactly one slot, its receiver, on the stack.
    pub fn set_pending_result(&mut self, value: Value) {
        if let Some(slot) = self.stack.last_mut() {
            *slot = value;
        }
    }

    /// Pass a value into a fiber that is about to be resumed
    ///
    /// A fresh fiber whose entry function declares parameters receives it as
    /// the first argument; a suspended one receives it as the result of its
    /// pending `yield`.
    pub fn inject(&mut self, value: Value) {
        if self.is_fresh() {
            let arity = self.frames[0].proto.arity as usize;
            if self.stack.len() == 1 && arity > 0 {
                self.stack.push(value);
                self.stack.resize(arity + 1, Value::Null);
            }
        } else {
            self.set_pending_result(value);
        }
    }

    /// Drop the top stack slot
    ///
    /// Two-argument fiber operations leave one slot for their result and
    /// discard the other with this.
    pub fn discard_slot(&mut self) {
        self.stack.pop();
    }

    /// Open upvalue for `slot`, if one was captured
    pub fn find_open_upvalue(&self, slot: usize) -> Option<ObjRef> {
        self.open_upvalues
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, upvalue)| *upvalue)
    }

    /// Record a new open upvalue, keeping the list ordered by slot
    pub fn add_open_upvalue(&mut self, slot: usize, upvalue: ObjRef) {
        let pos = self
            .open_upvalues
            .iter()
            .position(|(s, _)| *s > slot)
            .unwrap_or(self.open_upvalues.len());
        self.open_upvalues.insert(pos, (slot, upvalue));
    }

    /// Remove and return the open upvalues at or above `slot` with the
    /// values they must be closed over
    pub fn take_upvalues_from(&mut self, slot: usize) -> Vec<(ObjRef, Value)> {
        let split = self
            .open_upvalues
            .iter()
            .position(|(s, _)| *s >= slot)
            .unwrap_or(self.open_upvalues.len());
        self.open_upvalues
            .split_off(split)
            .into_iter()
            .map(|(s, upvalue)| (upvalue, self.stack.get(s).copied().unwrap_or_default()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(arity: u8) -> Frame {
        Frame {
            function: ObjRef(0),
            closure: None,
            proto: Rc::new(Function::builder().arity(arity).build()),
            ip: 0,
            stack_start: 0,
        }
    }

    #[test]
    fn test_states() {
        let mut fiber = Fiber::new(frame(0), 8);
        assert_eq!(fiber.state(false), FiberState::Fresh);
        assert_eq!(fiber.state(true), FiberState::Running);

        fiber.frames[0].ip = 3;
        assert_eq!(fiber.state(false), FiberState::Suspended);

        fiber.frames.clear();
        assert_eq!(fiber.state(false), FiberState::Done);
        assert!(fiber.is_done());

        fiber.error = Some(Value::Null);
        assert_eq!(fiber.state(false), FiberState::Failed);
    }

    #[test]
    fn test_inject_into_fresh_fiber_binds_parameter() {
        let mut fiber = Fiber::new(frame(1), 8);
        fiber.inject(Value::Num(1.0));
        assert_eq!(fiber.stack, vec![Value::Null, Value::Num(1.0)]);

        let mut no_params = Fiber::new(frame(0), 8);
        no_params.inject(Value::Num(1.0));
        assert_eq!(no_params.stack, vec![Value::Null]);
    }

    #[test]
    fn test_inject_into_suspended_fiber_sets_yield_result() {
        let mut fiber = Fiber::new(frame(0), 8);
        fiber.frames[0].ip = 2;
        fiber.stack.push(Value::Bool(true));
        fiber.inject(Value::Num(5.0));
        assert_eq!(fiber.stack, vec![Value::Null, Value::Num(5.0)]);
    }

    #[test]
    fn test_open_upvalues_ordered() {
        let mut fiber = Fiber::new(frame(0), 8);
        fiber.stack.extend([Value::Num(1.0), Value::Num(2.0), Value::Num(3.0)]);
        fiber.add_open_upvalue(3, ObjRef(30));
        fiber.add_open_upvalue(1, ObjRef(10));
        fiber.add_open_upvalue(2, ObjRef(20));
        assert_eq!(fiber.find_open_upvalue(2), Some(ObjRef(20)));

        let closed = fiber.take_upvalues_from(2);
        assert_eq!(
            closed,
            vec![(ObjRef(20), Value::Num(2.0)), (ObjRef(30), Value::Num(3.0))]
        );
        assert_eq!(fiber.open_upvalues, vec![(1, ObjRef(10))]);
    }
}
