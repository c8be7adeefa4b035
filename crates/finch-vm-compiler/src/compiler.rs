//! Main compiler implementation

use std::collections::HashSet;

use finch_vm_bytecode::{
    Constant, FieldIndex, Function, GlobalIndex, Instruction, JumpOffset, LocalIndex, MAX_FIELDS,
    Signature, SymbolIndex,
};

use crate::ast::{Body, ClassDecl, Expr, FnLiteral, Line, MethodDecl, Stmt};
use crate::codegen::{CodeGen, FunctionContext, FunctionKind, LoopContext};
use crate::error::{CompileError, CompileResult};
use crate::parser;

/// Symbol tables the compiler resolves names against
///
/// Method symbols and global variables are shared by every module compiled
/// into the same VM, so the VM owns them and the compiler only asks.
pub trait SymbolResolver {
    /// Intern a method signature key and return its symbol
    fn method_symbol(&mut self, signature: &str) -> SymbolIndex;

    /// Look up an existing global variable
    fn global_slot(&self, name: &str) -> Option<GlobalIndex>;

    /// Get or create the slot of a global variable
    fn define_global(&mut self, name: &str) -> GlobalIndex;
}

/// Per-class compilation state
#[derive(Debug)]
struct ClassContext {
    /// Fields in first-use order; the index is the field slot
    fields: Vec<String>,
}

/// How a variable name resolved
enum Variable {
    Local(LocalIndex),
    Upvalue(u16),
    Global(GlobalIndex),
}

/// Compiler from source text to a module [`Function`]
pub struct Compiler<'r> {
    resolver: &'r mut dyn SymbolResolver,
    codegen: CodeGen,
    classes: Vec<ClassContext>,
    /// Globals defined by this module
    defined: HashSet<String>,
    /// Globals referenced before any definition was seen
    forward_refs: Vec<(String, Line)>,
    /// Line of the innermost construct that carries one
    line: Line,
}

impl<'r> Compiler<'r> {
    /// Create a new compiler
    pub fn new(resolver: &'r mut dyn SymbolResolver) -> Self {
        Self {
            resolver,
            codegen: CodeGen::new(),
            classes: Vec::new(),
            defined: HashSet::new(),
            forward_refs: Vec::new(),
            line: 1,
        }
    }

    /// Compile a whole module
    pub fn compile(mut self, source: &str, module: &str) -> CompileResult<Function> {
        let stmts = parser::parse(source)?;

        self.codegen
            .enter_function(FunctionContext::new(module, FunctionKind::Module));
        for stmt in &stmts {
            self.statement(stmt)?;
        }
        let line = self.codegen.current_ref().lines.last().copied().unwrap_or(1);
        self.emit(Instruction::Null, line);
        self.emit(Instruction::Return, line);

        if let Some((name, line)) = self
            .forward_refs
            .iter()
            .find(|(name, _)| !self.defined.contains(name))
        {
            return Err(CompileError::resolve(
                format!("Variable '{name}' is used but not defined."),
                *line,
            ));
        }

        Ok(self.codegen.exit_function())
    }

    fn emit(&mut self, instruction: Instruction, line: Line) -> usize {
        self.codegen.current().emit(instruction, line)
    }

    fn placeholder() -> JumpOffset {
        JumpOffset::new(0)
    }

    fn method_symbol(&mut self, signature: &Signature) -> SymbolIndex {
        self.resolver.method_symbol(&signature.key())
    }

    fn emit_call(&mut self, signature: Signature, line: Line) {
        let args = signature.call_args();
        let symbol = self.method_symbol(&signature);
        self.emit(Instruction::Call { symbol, args }, line);
    }

    // ==================== Statements ====================

    fn statement(&mut self, stmt: &Stmt) -> CompileResult<()> {
        self.track_line(stmt_line(stmt));
        match stmt {
            Stmt::Expr(expr) => {
                self.expression(expr)?;
                self.emit(Instruction::Pop, self.line);
            }
            Stmt::Var { name, init, line } => {
                match init {
                    Some(init) => self.expression(init)?,
                    None => {
                        self.emit(Instruction::Null, *line);
                    }
                }
                self.define_variable(name, *line)?;
            }
            Stmt::Block(stmts) => {
                self.codegen.current().scopes.enter();
                for stmt in stmts {
                    self.statement(stmt)?;
                }
                self.codegen.current().exit_scope(self.line);
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let line = self.line;
                self.expression(condition)?;
                let else_jump = self.emit(
                    Instruction::JumpIfFalse {
                        offset: Self::placeholder(),
                    },
                    line,
                );
                self.scoped_statement(then_branch)?;

                match else_branch {
                    Some(else_branch) => {
                        let end_jump = self.emit(
                            Instruction::Jump {
                                offset: Self::placeholder(),
                            },
                            line,
                        );
                        self.codegen.current().patch_jump(else_jump, line)?;
                        self.scoped_statement(else_branch)?;
                        self.codegen.current().patch_jump(end_jump, line)?;
                    }
                    None => self.codegen.current().patch_jump(else_jump, line)?,
                }
            }
            Stmt::While { condition, body } => {
                let line = self.line;
                let start = self.codegen.current().current_index();
                self.expression(condition)?;
                let exit = self.emit(
                    Instruction::JumpIfFalse {
                        offset: Self::placeholder(),
                    },
                    line,
                );
                self.loop_body(body, start, exit, line)?;
            }
            Stmt::For {
                name,
                sequence,
                body,
                line,
            } => self.for_statement(name, sequence, body, *line)?,
            Stmt::Break(line) => {
                let ctx = self.codegen.current();
                let Some(depth) = ctx.loops.last().map(|l| l.depth) else {
                    return Err(CompileError::resolve(
                        "Cannot use 'break' outside of a loop.",
                        *line,
                    ));
                };

                // The locals stay declared for the code after the break.
                let height = ctx.slots.current();
                let discards: Vec<_> = ctx
                    .scopes
                    .locals_deeper_than(depth)
                    .map(|l| l.is_captured)
                    .collect();
                for captured in discards {
                    let instruction = if captured {
                        Instruction::CloseUpvalue
                    } else {
                        Instruction::Pop
                    };
                    ctx.emit(instruction, *line);
                }
                let jump = ctx.emit(
                    Instruction::Jump {
                        offset: Self::placeholder(),
                    },
                    *line,
                );
                ctx.slots.set(height);
                if let Some(current_loop) = ctx.loops.last_mut() {
                    current_loop.breaks.push(jump);
                }
            }
            Stmt::Return(value, line) => {
                let is_constructor = self.codegen.current_ref().kind == FunctionKind::Constructor;
                match (value, is_constructor) {
                    (Some(_), true) => {
                        return Err(CompileError::resolve(
                            "A constructor cannot return a value.",
                            *line,
                        ));
                    }
                    (None, true) => {
                        self.emit(
                            Instruction::LoadLocal {
                                slot: LocalIndex::new(0),
                            },
                            *line,
                        );
                    }
                    (Some(value), false) => self.expression(value)?,
                    (None, false) => {
                        self.emit(Instruction::Null, *line);
                    }
                }
                self.emit(Instruction::Return, *line);
            }
            Stmt::Class(class) => self.class_definition(class)?,
        }
        Ok(())
    }

    /// Compile a branch or loop body in its own block so a bare `var` cannot
    /// leak into the enclosing scope.
    fn scoped_statement(&mut self, stmt: &Stmt) -> CompileResult<()> {
        self.codegen.current().scopes.enter();
        self.statement(stmt)?;
        self.codegen.current().exit_scope(self.line);
        Ok(())
    }

    fn loop_body(&mut self, body: &Stmt, start: usize, exit: usize, line: Line) -> CompileResult<()> {
        let depth = self.codegen.current_ref().scopes.depth();
        self.codegen.current().loops.push(LoopContext {
            depth,
            breaks: Vec::new(),
        });

        self.scoped_statement(body)?;

        let ctx = self.codegen.current();
        ctx.emit_loop(start, line)?;
        ctx.patch_jump(exit, line)?;
        let finished = ctx.loops.pop();
        for jump in finished.map(|l| l.breaks).unwrap_or_default() {
            ctx.patch_jump(jump, line)?;
        }
        Ok(())
    }

    fn for_statement(
        &mut self,
        name: &str,
        sequence: &Expr,
        body: &Stmt,
        line: Line,
    ) -> CompileResult<()> {
        // for (x in seq) body
        //
        // compiles as
        //
        // {
        //   var seq_ = seq
        //   var iter_ = null
        //   while (iter_ = seq_.iterate(iter_)) {
        //     var x = seq_.iteratorValue(iter_)
        //     body
        //   }
        // }
        self.codegen.current().scopes.enter();
        self.expression(sequence)?;
        let seq = self.codegen.current().declare_local(" seq", line)?;
        self.emit(Instruction::Null, line);
        let iter = self.codegen.current().declare_local(" iter", line)?;

        let start = self.codegen.current().current_index();
        self.emit(Instruction::LoadLocal { slot: seq }, line);
        self.emit(Instruction::LoadLocal { slot: iter }, line);
        self.emit_call(Signature::method("iterate", 1), line);
        self.emit(Instruction::StoreLocal { slot: iter }, line);
        let exit = self.emit(
            Instruction::JumpIfFalse {
                offset: Self::placeholder(),
            },
            line,
        );

        let value_body = Stmt::Block(vec![
            Stmt::Var {
                name: name.to_string(),
                init: Some(Expr::Call {
                    receiver: Some(Box::new(Expr::Name(" seq".to_string(), line))),
                    name: "iteratorValue".to_string(),
                    args: vec![Expr::Name(" iter".to_string(), line)],
                    line,
                }),
                line,
            },
            body.clone(),
        ]);
        self.loop_body(&value_body, start, exit, line)?;

        self.codegen.current().exit_scope(line);
        Ok(())
    }

    /// Bind the value on top of the stack to `name` in the current scope
    fn define_variable(&mut self, name: &str, line: Line) -> CompileResult<()> {
        if self.codegen.is_top_level() {
            if !self.defined.insert(name.to_string()) {
                return Err(CompileError::resolve(
                    format!("Global variable '{name}' is already defined."),
                    line,
                ));
            }
            let slot = self.resolver.define_global(name);
            self.emit(Instruction::StoreGlobal { slot }, line);
            self.emit(Instruction::Pop, line);
        } else {
            self.codegen.current().declare_local(name, line)?;
        }
        Ok(())
    }

    fn class_definition(&mut self, class: &ClassDecl) -> CompileResult<()> {
        let line = class.line;
        let name_idx = self
            .codegen
            .current()
            .constants
            .add_string(class.name.as_bytes())?;
        self.emit(Instruction::Constant { idx: name_idx }, line);

        match &class.superclass {
            Some(superclass) => self.expression(superclass)?,
            None => {
                let Some(slot) = self.resolver.global_slot("Object") else {
                    return Err(CompileError::resolve("Object class is not defined.", line));
                };
                self.emit(Instruction::LoadGlobal { slot }, line);
            }
        }
        let class_instruction = self.emit(Instruction::Class { fields: 0 }, line);

        // Declare the class before compiling methods so they can refer to it.
        let top_level = self.codegen.is_top_level();
        if top_level {
            if !self.defined.insert(class.name.clone()) {
                return Err(CompileError::resolve(
                    format!("Global variable '{}' is already defined.", class.name),
                    line,
                ));
            }
            let slot = self.resolver.define_global(&class.name);
            self.emit(Instruction::StoreGlobal { slot }, line);
        } else {
            self.codegen.current().declare_local(&class.name, line)?;
        }

        self.classes.push(ClassContext { fields: Vec::new() });
        for method in &class.methods {
            self.method(&class.name, method)?;
        }
        let fields = self.classes.pop().map(|c| c.fields.len()).unwrap_or(0);
        if fields > MAX_FIELDS {
            return Err(CompileError::limit(
                format!("A class cannot have more than {MAX_FIELDS} fields."),
                line,
            ));
        }
        self.codegen.current().code[class_instruction] = Instruction::Class {
            fields: fields as u8,
        };

        if top_level {
            self.emit(Instruction::Pop, line);
        }
        Ok(())
    }

    fn method(&mut self, class_name: &str, method: &MethodDecl) -> CompileResult<()> {
        let kind = if method.is_static {
            FunctionKind::StaticMethod
        } else if method.is_constructor {
            FunctionKind::Constructor
        } else {
            FunctionKind::Method
        };

        let mut ctx = FunctionContext::new(format!("{class_name}.{}", method.signature), kind);
        ctx.method_name = Some(method.signature.name.clone());
        let function = self.function(ctx, &method.params, &method.body, method.line)?;

        let idx = self
            .codegen
            .current()
            .constants
            .add(Constant::Function(Box::new(function)))?;
        self.emit(Instruction::Closure { function: idx }, method.line);

        let symbol = self.method_symbol(&method.signature);
        let bind = if method.is_static {
            Instruction::MethodStatic { symbol }
        } else {
            Instruction::MethodInstance { symbol }
        };
        self.emit(bind, method.line);
        Ok(())
    }

    /// Compile a function body in a fresh context
    fn function(
        &mut self,
        mut ctx: FunctionContext,
        params: &[String],
        body: &Body,
        line: Line,
    ) -> CompileResult<Function> {
        ctx.arity = params.len() as u8;
        for param in params {
            ctx.declare_local(param, line)?;
            ctx.slots.apply(1);
        }
        let kind = ctx.kind;
        self.codegen.enter_function(ctx);

        let result = self.function_body(kind, body, line);
        let function = self.codegen.exit_function();
        result.map(|()| function)
    }

    fn function_body(&mut self, kind: FunctionKind, body: &Body, line: Line) -> CompileResult<()> {
        let this = Instruction::LoadLocal {
            slot: LocalIndex::new(0),
        };
        match body {
            Body::Expr(expr) => {
                self.expression(expr)?;
                let line = self.line.max(line);
                if kind == FunctionKind::Constructor {
                    self.emit(Instruction::Pop, line);
                    self.emit(this, line);
                }
                self.emit(Instruction::Return, line);
            }
            Body::Stmts(stmts) => {
                for stmt in stmts {
                    self.statement(stmt)?;
                }
                let line = self.line.max(line);
                if kind == FunctionKind::Constructor {
                    self.emit(this, line);
                } else {
                    self.emit(Instruction::Null, line);
                }
                self.emit(Instruction::Return, line);
            }
        }
        Ok(())
    }

    // ==================== Expressions ====================

    fn track_line(&mut self, line: Line) {
        if line > 0 {
            self.line = line;
        }
    }

    fn expression(&mut self, expr: &Expr) -> CompileResult<()> {
        self.track_line(expr_line(expr));
        let line = self.line;
        match expr {
            Expr::Null => {
                self.emit(Instruction::Null, line);
            }
            Expr::Bool(true) => {
                self.emit(Instruction::True, line);
            }
            Expr::Bool(false) => {
                self.emit(Instruction::False, line);
            }
            Expr::Num(n) => {
                let idx = self.codegen.current().constants.add_number(*n)?;
                self.emit(Instruction::Constant { idx }, line);
            }
            Expr::Str(bytes) => {
                let idx = self.codegen.current().constants.add_string(bytes)?;
                self.emit(Instruction::Constant { idx }, line);
            }
            Expr::This(line) => self.load_this(*line)?,
            Expr::List(items) => {
                for item in items {
                    self.expression(item)?;
                }
                self.emit(
                    Instruction::List {
                        count: items.len() as u32,
                    },
                    line,
                );
            }
            Expr::Name(name, line) => self.load_name(name, *line)?,
            Expr::Field(name, line) => {
                let field = self.field(name, *line)?;
                if self.codegen.current_ref().kind.is_method() {
                    self.emit(Instruction::LoadFieldThis { field }, *line);
                } else {
                    self.load_this(*line)?;
                    self.emit(Instruction::LoadField { field }, *line);
                }
            }
            Expr::Fn(literal) => self.block_literal(literal)?,
            Expr::Call {
                receiver,
                name,
                args,
                line,
            } => {
                match receiver {
                    Some(receiver) => self.expression(receiver)?,
                    None => {
                        if self.codegen.enclosing_method().is_none() {
                            return Err(CompileError::resolve(
                                format!("Undefined function '{name}'."),
                                *line,
                            ));
                        }
                        self.load_this(*line)?;
                    }
                }
                self.arguments(args)?;
                self.emit_call(Signature::method(name.clone(), args.len() as u8), *line);
            }
            Expr::Subscript {
                receiver,
                args,
                line,
            } => {
                self.expression(receiver)?;
                self.arguments(args)?;
                self.emit_call(Signature::subscript(args.len() as u8), *line);
            }
            Expr::Super { name, args, line } => {
                let method_name = match name {
                    Some(name) => name.clone(),
                    None => match self.codegen.enclosing_method() {
                        Some(method) => method.method_name.clone().unwrap_or_default(),
                        None => String::new(),
                    },
                };
                if self.codegen.enclosing_method().is_none() {
                    return Err(CompileError::resolve(
                        "Cannot use 'super' outside of a method.",
                        *line,
                    ));
                }
                self.load_this(*line)?;
                self.arguments(args)?;
                let signature = Signature::method(method_name, args.len() as u8);
                let symbol = self.method_symbol(&signature);
                self.emit(
                    Instruction::Super {
                        symbol,
                        args: args.len() as u8,
                    },
                    *line,
                );
            }
            Expr::Assign {
                target,
                value,
                line,
            } => self.assignment(target, value, *line)?,
            Expr::Unary { op, operand, line } => {
                self.expression(operand)?;
                self.emit_call(Signature::method(*op, 0), *line);
            }
            Expr::Binary {
                op,
                left,
                right,
                line,
            } => {
                self.expression(left)?;
                self.expression(right)?;
                self.emit_call(Signature::method(*op, 1), *line);
            }
            Expr::And(left, right) => {
                self.expression(left)?;
                let jump = self.emit(
                    Instruction::And {
                        offset: Self::placeholder(),
                    },
                    line,
                );
                self.expression(right)?;
                self.codegen.current().patch_jump(jump, line)?;
            }
            Expr::Or(left, right) => {
                self.expression(left)?;
                let jump = self.emit(
                    Instruction::Or {
                        offset: Self::placeholder(),
                    },
                    line,
                );
                self.expression(right)?;
                self.codegen.current().patch_jump(jump, line)?;
            }
            Expr::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                let line = self.line;
                self.expression(condition)?;
                let else_jump = self.emit(
                    Instruction::JumpIfFalse {
                        offset: Self::placeholder(),
                    },
                    line,
                );
                self.expression(then_value)?;
                let end_jump = self.emit(
                    Instruction::Jump {
                        offset: Self::placeholder(),
                    },
                    line,
                );
                // Both branches start from the same height.
                self.codegen.current().slots.apply(-1);
                self.codegen.current().patch_jump(else_jump, line)?;
                self.expression(else_value)?;
                self.codegen.current().patch_jump(end_jump, line)?;
            }
            Expr::Is { value, class, line } => {
                self.expression(value)?;
                self.expression(class)?;
                self.emit(Instruction::Is, *line);
            }
            Expr::New { class, args, line } => {
                self.expression(class)?;
                self.emit_call(Signature::method(" instantiate", 0), *line);
                self.arguments(args)?;
                self.emit_call(Signature::method("new", args.len() as u8), *line);
            }
        }
        Ok(())
    }

    fn arguments(&mut self, args: &[Expr]) -> CompileResult<()> {
        for arg in args {
            self.expression(arg)?;
        }
        Ok(())
    }

    fn block_literal(&mut self, literal: &FnLiteral) -> CompileResult<()> {
        let enclosing = self.codegen.current_ref().name.clone();
        let ctx = FunctionContext::new(format!("{enclosing} block"), FunctionKind::Block);
        let function = self.function(ctx, &literal.params, &literal.body, literal.line)?;
        let idx = self
            .codegen
            .current()
            .constants
            .add(Constant::Function(Box::new(function)))?;
        self.emit(Instruction::Closure { function: idx }, literal.line);
        Ok(())
    }

    fn load_this(&mut self, line: Line) -> CompileResult<()> {
        match self.resolve_variable("this", line)? {
            Some(Variable::Local(slot)) => {
                self.emit(Instruction::LoadLocal { slot }, line);
            }
            Some(Variable::Upvalue(idx)) => {
                self.emit(Instruction::LoadUpvalue { idx }, line);
            }
            _ => {
                return Err(CompileError::resolve(
                    "Cannot use 'this' outside of a method.",
                    line,
                ));
            }
        }
        Ok(())
    }

    /// Resolve a local or captured variable, then a global
    fn resolve_variable(&mut self, name: &str, line: Line) -> CompileResult<Option<Variable>> {
        if let Some(slot) = self.codegen.resolve_local(name) {
            return Ok(Some(Variable::Local(slot)));
        }
        if let Some(idx) = self.codegen.resolve_upvalue(name, line)? {
            return Ok(Some(Variable::Upvalue(idx)));
        }
        if name == "this" {
            return Ok(None);
        }
        Ok(self.resolver.global_slot(name).map(Variable::Global))
    }

    /// Lowercase names that are not locals are calls on `this` inside methods
    fn is_implicit_this_call(&mut self, name: &str, line: Line) -> CompileResult<bool> {
        if !name.starts_with(|c: char| c.is_ascii_lowercase())
            || self.codegen.enclosing_method().is_none()
        {
            return Ok(false);
        }
        let is_scoped = self.codegen.resolve_local(name).is_some()
            || self.codegen.resolve_upvalue(name, line)?.is_some();
        Ok(!is_scoped)
    }

    fn load_name(&mut self, name: &str, line: Line) -> CompileResult<()> {
        if self.is_implicit_this_call(name, line)? {
            self.load_this(line)?;
            self.emit_call(Signature::getter(name), line);
            return Ok(());
        }

        match self.resolve_variable(name, line)? {
            Some(Variable::Local(slot)) => {
                self.emit(Instruction::LoadLocal { slot }, line);
            }
            Some(Variable::Upvalue(idx)) => {
                self.emit(Instruction::LoadUpvalue { idx }, line);
            }
            Some(Variable::Global(slot)) => {
                self.emit(Instruction::LoadGlobal { slot }, line);
            }
            None if name.starts_with(|c: char| c.is_ascii_uppercase()) => {
                // Classes may refer to globals defined later in the module.
                let slot = self.resolver.define_global(name);
                self.forward_refs.push((name.to_string(), line));
                self.emit(Instruction::LoadGlobal { slot }, line);
            }
            None => {
                return Err(CompileError::resolve(
                    format!("Undefined variable '{name}'."),
                    line,
                ));
            }
        }
        Ok(())
    }

    fn field(&mut self, name: &str, line: Line) -> CompileResult<FieldIndex> {
        let in_static = self
            .codegen
            .enclosing_method()
            .is_some_and(|m| m.kind == FunctionKind::StaticMethod);
        let Some(class) = self.classes.last_mut() else {
            return Err(CompileError::resolve(
                "Cannot reference a field outside of a class definition.",
                line,
            ));
        };
        if in_static {
            return Err(CompileError::resolve(
                "Cannot use an instance field in a static method.",
                line,
            ));
        }

        let idx = match class.fields.iter().position(|f| f == name) {
            Some(idx) => idx,
            None => {
                class.fields.push(name.to_string());
                class.fields.len() - 1
            }
        };
        if idx >= MAX_FIELDS {
            return Err(CompileError::limit(
                format!("A class cannot have more than {MAX_FIELDS} fields."),
                line,
            ));
        }
        Ok(FieldIndex(idx as u8))
    }

    fn assignment(&mut self, target: &Expr, value: &Expr, line: Line) -> CompileResult<()> {
        match target {
            Expr::Name(name, _) => {
                if self.is_implicit_this_call(name, line)? {
                    self.load_this(line)?;
                    self.expression(value)?;
                    self.emit_call(Signature::setter(name.clone()), line);
                    return Ok(());
                }
                self.expression(value)?;
                match self.resolve_variable(name, line)? {
                    Some(Variable::Local(slot)) => {
                        self.emit(Instruction::StoreLocal { slot }, line);
                    }
                    Some(Variable::Upvalue(idx)) => {
                        self.emit(Instruction::StoreUpvalue { idx }, line);
                    }
                    Some(Variable::Global(slot)) => {
                        self.emit(Instruction::StoreGlobal { slot }, line);
                    }
                    None => {
                        return Err(CompileError::resolve(
                            format!("Undefined variable '{name}'."),
                            line,
                        ));
                    }
                }
            }
            Expr::Field(name, _) => {
                let field = self.field(name, line)?;
                self.expression(value)?;
                if self.codegen.current_ref().kind.is_method() {
                    self.emit(Instruction::StoreFieldThis { field }, line);
                } else {
                    self.load_this(line)?;
                    self.emit(Instruction::StoreField { field }, line);
                }
            }
            Expr::Call {
                receiver: Some(receiver),
                name,
                ..
            } => {
                self.expression(receiver)?;
                self.expression(value)?;
                self.emit_call(Signature::setter(name.clone()), line);
            }
            Expr::Subscript { receiver, args, .. } => {
                self.expression(receiver)?;
                self.arguments(args)?;
                self.expression(value)?;
                self.emit_call(Signature::subscript_setter(args.len() as u8), line);
            }
            _ => {
                return Err(CompileError::syntax("Invalid assignment target.", "=", line));
            }
        }
        Ok(())
    }
}

fn expr_line(expr: &Expr) -> Line {
    match expr {
        Expr::This(line)
        | Expr::Name(_, line)
        | Expr::Field(_, line)
        | Expr::Call { line, .. }
        | Expr::Subscript { line, .. }
        | Expr::Super { line, .. }
        | Expr::Assign { line, .. }
        | Expr::Unary { line, .. }
        | Expr::Binary { line, .. }
        | Expr::Is { line, .. }
        | Expr::New { line, .. } => *line,
        Expr::Fn(literal) => literal.line,
        Expr::And(left, _) | Expr::Or(left, _) => expr_line(left),
        Expr::Conditional { condition, .. } => expr_line(condition),
        Expr::List(items) => items.first().map(expr_line).unwrap_or(0),
        Expr::Null | Expr::Bool(_) | Expr::Num(_) | Expr::Str(_) => 0,
    }
}

fn stmt_line(stmt: &Stmt) -> Line {
    match stmt {
        Stmt::Expr(expr) => expr_line(expr),
        Stmt::Var { line, .. } | Stmt::For { line, .. } | Stmt::Break(line) => *line,
        Stmt::Return(_, line) => *line,
        Stmt::Block(stmts) => stmts.last().map(stmt_line).unwrap_or(0),
        Stmt::If { condition, .. } | Stmt::While { condition, .. } => expr_line(condition),
        Stmt::Class(class) => class.line,
    }
}

/// Compile `source` as the module `module`
pub fn compile(
    source: &str,
    module: &str,
    resolver: &mut dyn SymbolResolver,
) -> CompileResult<Function> {
    Compiler::new(resolver).compile(source, module)
}
