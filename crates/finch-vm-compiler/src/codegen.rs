//! Bytecode generation helpers
//!
//! [`CodeGen`] owns the stack of functions being compiled (innermost last)
//! and knows how to emit instructions, patch jumps and resolve captured
//! variables across function boundaries.

use finch_vm_bytecode::{
    ConstantPool, Function, Instruction, JumpOffset, LocalIndex, UpvalueCapture,
};

use crate::ast::Line;
use crate::error::{CompileError, CompileResult};
use crate::scope::{MAX_LOCALS, ScopeChain};

/// Most upvalues a single function can capture
pub const MAX_UPVALUES: usize = u16::MAX as usize;

/// What kind of function is being compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Module top-level code
    Module,
    /// Block literal
    Block,
    /// Instance method
    Method,
    /// Static method (receiver is the class)
    StaticMethod,
    /// Instance method declared with `new`
    Constructor,
}

impl FunctionKind {
    /// Methods bind `this` in slot 0
    pub fn is_method(self) -> bool {
        matches!(self, Self::Method | Self::StaticMethod | Self::Constructor)
    }
}

/// Stack height tracker
#[derive(Debug, Default)]
pub struct SlotCounter {
    current: i32,
    max: i32,
}

impl SlotCounter {
    /// Apply a stack effect
    pub fn apply(&mut self, effect: i32) {
        self.current += effect;
        self.max = self.max.max(self.current);
    }

    /// Current height
    pub fn current(&self) -> i32 {
        self.current
    }

    /// Reset the height (used when control flow merges)
    pub fn set(&mut self, height: i32) {
        self.current = height;
    }

    /// Highest height seen
    pub fn max_used(&self) -> i32 {
        self.max
    }
}

/// An enclosing loop
#[derive(Debug)]
pub struct LoopContext {
    /// Block depth of the loop's own scope; `break` pops everything deeper
    pub depth: usize,
    /// `break` jumps waiting for the loop end
    pub breaks: Vec<usize>,
}

/// Function being compiled
#[derive(Debug)]
pub struct FunctionContext {
    /// Function name
    pub name: String,
    /// Kind
    pub kind: FunctionKind,
    /// Number of parameters
    pub arity: u8,
    /// Instructions
    pub code: Vec<Instruction>,
    /// Line of each instruction
    pub lines: Vec<u32>,
    /// Constant pool
    pub constants: ConstantPool,
    /// Locals
    pub scopes: ScopeChain,
    /// Captured variables
    pub upvalues: Vec<UpvalueCapture>,
    /// Enclosing loops, innermost last
    pub loops: Vec<LoopContext>,
    /// For methods, the name used by a bare `super(...)` call
    pub method_name: Option<String>,
    /// Stack height tracker
    pub slots: SlotCounter,
}

impl FunctionContext {
    /// Create a new function context; slot 0 is reserved for the receiver
    pub fn new(name: impl Into<String>, kind: FunctionKind) -> Self {
        let receiver = if kind.is_method() { "this" } else { "" };
        let mut slots = SlotCounter::default();
        slots.apply(1);
        Self {
            name: name.into(),
            kind,
            arity: 0,
            code: Vec::new(),
            lines: Vec::new(),
            constants: ConstantPool::new(),
            scopes: ScopeChain::new(receiver),
            upvalues: Vec::new(),
            loops: Vec::new(),
            method_name: None,
            slots,
        }
    }

    /// Emit an instruction
    pub fn emit(&mut self, instruction: Instruction, line: Line) -> usize {
        self.slots.apply(instruction.stack_effect());
        self.code.push(instruction);
        self.lines.push(line);
        self.code.len() - 1
    }

    /// Get current instruction index (for patching jumps)
    pub fn current_index(&self) -> usize {
        self.code.len()
    }

    /// Point the jump at `index` to the next instruction to be emitted
    pub fn patch_jump(&mut self, index: usize, line: Line) -> CompileResult<()> {
        let offset = self.offset_to(index, self.current_index(), line)?;
        self.code[index].patch_jump(offset);
        Ok(())
    }

    /// Emit a backwards jump to `start`
    pub fn emit_loop(&mut self, start: usize, line: Line) -> CompileResult<()> {
        let offset = self.offset_to(self.current_index(), start, line)?;
        self.emit(Instruction::Jump { offset }, line);
        Ok(())
    }

    fn offset_to(&self, from: usize, to: usize, line: Line) -> CompileResult<JumpOffset> {
        let offset = to as i64 - from as i64;
        i32::try_from(offset)
            .map(JumpOffset::new)
            .map_err(|_| CompileError::limit("Too much code to jump over.", line))
    }

    /// Declare a local in the current block
    pub fn declare_local(&mut self, name: &str, line: Line) -> CompileResult<LocalIndex> {
        if self.scopes.len() >= MAX_LOCALS {
            return Err(CompileError::limit(
                "Cannot declare more local variables in one function.",
                line,
            ));
        }
        self.scopes.declare(name).map(LocalIndex::new).ok_or_else(|| {
            CompileError::resolve(
                format!("Variable '{name}' is already declared in this scope."),
                line,
            )
        })
    }

    /// Exit a block, discarding its locals
    pub fn exit_scope(&mut self, line: Line) {
        for local in self.scopes.exit() {
            let instruction = if local.is_captured {
                Instruction::CloseUpvalue
            } else {
                Instruction::Pop
            };
            self.emit(instruction, line);
        }
    }

    /// Add an upvalue capture, reusing an existing identical one
    pub fn add_upvalue(&mut self, capture: UpvalueCapture, line: Line) -> CompileResult<u16> {
        if let Some(idx) = self.upvalues.iter().position(|u| *u == capture) {
            return Ok(idx as u16);
        }
        if self.upvalues.len() >= MAX_UPVALUES {
            return Err(CompileError::limit(
                "Too many closed-over variables in one function.",
                line,
            ));
        }
        self.upvalues.push(capture);
        Ok((self.upvalues.len() - 1) as u16)
    }

    /// Build the function
    pub fn build(self) -> Function {
        let mut builder = Function::builder()
            .name(self.name)
            .arity(self.arity)
            .constants(self.constants)
            .max_slots(self.slots.max_used().max(1) as u16);
        for capture in self.upvalues {
            builder = builder.upvalue(capture);
        }
        for (instruction, line) in self.code.into_iter().zip(self.lines) {
            builder = builder.instruction(instruction, line);
        }
        builder.build()
    }
}

/// Code generator state
#[derive(Debug, Default)]
pub struct CodeGen {
    /// Functions being compiled, innermost last
    funcs: Vec<FunctionContext>,
}

impl CodeGen {
    /// Create a new code generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Innermost function
    ///
    /// # Panics
    /// Panics if no function is being compiled.
    pub fn current(&mut self) -> &mut FunctionContext {
        self.funcs
            .last_mut()
            .expect("codegen used outside of a function")
    }

    /// Innermost function, read only
    pub fn current_ref(&self) -> &FunctionContext {
        self.funcs
            .last()
            .expect("codegen used outside of a function")
    }

    /// Start compiling a new function
    pub fn enter_function(&mut self, ctx: FunctionContext) {
        self.funcs.push(ctx);
    }

    /// Finish compiling the current function
    pub fn exit_function(&mut self) -> Function {
        self.funcs
            .pop()
            .expect("function stack underflow")
            .build()
    }

    /// Whether code is being emitted at module top level, outside any block
    pub fn is_top_level(&self) -> bool {
        self.funcs.len() == 1 && self.current_ref().scopes.depth() == 0
    }

    /// The innermost enclosing method, looking through blocks
    pub fn enclosing_method(&self) -> Option<&FunctionContext> {
        self.funcs
            .iter()
            .rev()
            .find(|f| f.kind != FunctionKind::Block)
            .filter(|f| f.kind.is_method())
    }

    /// Resolve a local of the innermost function
    pub fn resolve_local(&self, name: &str) -> Option<LocalIndex> {
        self.current_ref().scopes.resolve(name).map(LocalIndex::new)
    }

    /// Resolve a variable of an enclosing function as an upvalue of the
    /// innermost one
    pub fn resolve_upvalue(&mut self, name: &str, line: Line) -> CompileResult<Option<u16>> {
        let innermost = self.funcs.len() - 1;
        self.resolve_upvalue_in(innermost, name, line)
    }

    fn resolve_upvalue_in(
        &mut self,
        func: usize,
        name: &str,
        line: Line,
    ) -> CompileResult<Option<u16>> {
        if func == 0 {
            return Ok(None);
        }
        let parent = func - 1;

        if let Some(slot) = self.funcs[parent].scopes.resolve(name) {
            self.funcs[parent].scopes.mark_captured(slot);
            let capture = UpvalueCapture::Local(LocalIndex::new(slot));
            return self.funcs[func].add_upvalue(capture, line).map(Some);
        }

        match self.resolve_upvalue_in(parent, name, line)? {
            Some(idx) => self.funcs[func]
                .add_upvalue(UpvalueCapture::Upvalue(idx), line)
                .map(Some),
            None => Ok(None),
        }
    }
}
