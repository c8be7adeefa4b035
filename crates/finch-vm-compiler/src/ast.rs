//! Syntax tree produced by the parser

use finch_vm_bytecode::Signature;

/// Source line (1-indexed)
pub type Line = u32;

/// An expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Number literal
    Num(f64),
    /// String literal
    Str(Vec<u8>),
    /// `this`
    This(Line),
    /// `[a, b, c]`
    List(Vec<Expr>),
    /// Bare identifier: a variable, or an implicit getter call on `this`
    Name(String, Line),
    /// `_field`
    Field(String, Line),
    /// Block literal `{|a, b| ... }`
    Fn(Box<FnLiteral>),
    /// Method call; `receiver == None` is an implicit call on `this`
    Call {
        /// Receiver expression
        receiver: Option<Box<Expr>>,
        /// Method name
        name: String,
        /// Arguments, including a trailing block argument
        args: Vec<Expr>,
        /// Call site line
        line: Line,
    },
    /// `receiver[args]`
    Subscript {
        /// Receiver expression
        receiver: Box<Expr>,
        /// Index arguments
        args: Vec<Expr>,
        /// Call site line
        line: Line,
    },
    /// `super.name(args)` or bare `super(args)` inside a method
    Super {
        /// Method name; `None` reuses the enclosing method's name
        name: Option<String>,
        /// Arguments
        args: Vec<Expr>,
        /// Call site line
        line: Line,
    },
    /// `target = value`
    Assign {
        /// Assignment target
        target: Box<Expr>,
        /// Assigned value
        value: Box<Expr>,
        /// Line of the `=`
        line: Line,
    },
    /// Prefix operator (`-`, `!`, `~`)
    Unary {
        /// Operator method name
        op: &'static str,
        /// Operand
        operand: Box<Expr>,
        /// Line
        line: Line,
    },
    /// Infix operator compiled to a method call on the left operand
    Binary {
        /// Operator method name
        op: &'static str,
        /// Left operand (receiver)
        left: Box<Expr>,
        /// Right operand (argument)
        right: Box<Expr>,
        /// Line
        line: Line,
    },
    /// `a && b`
    And(Box<Expr>, Box<Expr>),
    /// `a || b`
    Or(Box<Expr>, Box<Expr>),
    /// `cond ? then : else`
    Conditional {
        /// Condition
        condition: Box<Expr>,
        /// Value when truthy
        then_value: Box<Expr>,
        /// Value when falsey
        else_value: Box<Expr>,
    },
    /// `value is Class`
    Is {
        /// Tested value
        value: Box<Expr>,
        /// Class expression
        class: Box<Expr>,
        /// Line
        line: Line,
    },
    /// `new Class(args)`
    New {
        /// Class expression
        class: Box<Expr>,
        /// Constructor arguments
        args: Vec<Expr>,
        /// Line
        line: Line,
    },
}

/// Body of a function, method or block
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Single-line body whose value is returned
    Expr(Expr),
    /// Statement list; falls off the end returning null
    Stmts(Vec<Stmt>),
}

/// A block literal
#[derive(Debug, Clone, PartialEq)]
pub struct FnLiteral {
    /// Parameter names
    pub params: Vec<String>,
    /// Body
    pub body: Body,
    /// Line of the opening brace
    pub line: Line,
}

/// A statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Expression evaluated for its effect
    Expr(Expr),
    /// `var name = init`
    Var {
        /// Variable name
        name: String,
        /// Initializer (null when absent)
        init: Option<Expr>,
        /// Line
        line: Line,
    },
    /// `{ ... }`
    Block(Vec<Stmt>),
    /// `if (cond) then else otherwise`
    If {
        /// Condition
        condition: Expr,
        /// Then branch
        then_branch: Box<Stmt>,
        /// Optional else branch
        else_branch: Option<Box<Stmt>>,
    },
    /// `while (cond) body`
    While {
        /// Condition
        condition: Expr,
        /// Loop body
        body: Box<Stmt>,
    },
    /// `for (name in sequence) body`
    For {
        /// Loop variable
        name: String,
        /// Iterated sequence
        sequence: Expr,
        /// Loop body
        body: Box<Stmt>,
        /// Line
        line: Line,
    },
    /// `break`
    Break(Line),
    /// `return value`
    Return(Option<Expr>, Line),
    /// Class definition
    Class(ClassDecl),
}

/// A class definition
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    /// Class name
    pub name: String,
    /// Superclass expression; `Object` when absent
    pub superclass: Option<Expr>,
    /// Methods in declaration order
    pub methods: Vec<MethodDecl>,
    /// Line of the `class` keyword
    pub line: Line,
}

/// A method definition
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    /// Signature the method is bound under
    pub signature: Signature,
    /// Bound on the metaclass
    pub is_static: bool,
    /// Declared with `new`; returns `this` implicitly
    pub is_constructor: bool,
    /// Parameter names (setter value included)
    pub params: Vec<String>,
    /// Body
    pub body: Body,
    /// Line of the method name
    pub line: Line,
}
