//! Recursive descent parser
//!
//! Turns the token list from [`crate::lexer`] into the tree in [`crate::ast`].
//! Newlines terminate statements; they are ignored after infix operators,
//! commas and opening brackets so long expressions can be wrapped.

use finch_vm_bytecode::{MAX_PARAMETERS, Signature};

use crate::ast::{Body, ClassDecl, Expr, FnLiteral, Line, MethodDecl, Stmt};
use crate::error::{CompileError, CompileResult};
use crate::lexer::{SpannedToken, Token};

/// Token stream with lookahead.
pub struct TokenStream {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl TokenStream {
    /// Create a new token stream. `tokens` must end with [`Token::Eof`].
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Peek at the current token without consuming it.
    pub fn peek(&self) -> &Token {
        &self.current().token
    }

    /// Peek at the nth token ahead without consuming.
    pub fn peek_nth(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn current(&self) -> &SpannedToken {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Line of the current token.
    pub fn line(&self) -> Line {
        self.current().line
    }

    /// Advance to the next token and return the current one.
    pub fn advance(&mut self) -> SpannedToken {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Check if the current token has the same kind as `expected`.
    pub fn check(&self, expected: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(expected)
    }

    /// Consume the current token if it has the kind of `expected`.
    pub fn matches(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a specific token kind and advance if it matches.
    pub fn expect(&mut self, expected: &Token, message: &str) -> CompileResult<SpannedToken> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    /// Skip any newline tokens.
    pub fn skip_lines(&mut self) {
        while self.check(&Token::Line) {
            self.advance();
        }
    }

    /// Syntax error at the current token.
    pub fn error(&self, message: impl Into<String>) -> CompileError {
        let current = self.current();
        let token = match current.token {
            Token::Line => "newline",
            Token::Eof => "end of file",
            _ => current.text.as_str(),
        };
        CompileError::syntax(message, token, current.line)
    }
}

/// Deepest allowed nesting of statements and expressions
pub const MAX_NESTING: usize = 128;

/// Parser for a whole module
pub struct Parser {
    stream: TokenStream,
    depth: usize,
}

impl Parser {
    /// Create a parser over a token list
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        Self {
            stream: TokenStream::new(tokens),
            depth: 0,
        }
    }

    /// Count one more level of nesting. Left-associative chains call this
    /// once per operator, since each one deepens the tree.
    fn deepen(&mut self) -> CompileResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(CompileError::limit(
                "Expression nesting too deep.",
                self.stream.line(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `parse` one nesting level deeper
    fn nested<T>(&mut self, parse: fn(&mut Self) -> CompileResult<T>) -> CompileResult<T> {
        self.deepen()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Parse a module: a sequence of newline-separated statements
    pub fn parse_module(mut self) -> CompileResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        self.stream.skip_lines();
        while !self.stream.check(&Token::Eof) {
            stmts.push(self.statement()?);
            self.end_of_statement()?;
            self.stream.skip_lines();
        }
        Ok(stmts)
    }

    fn end_of_statement(&mut self) -> CompileResult<()> {
        match self.stream.peek() {
            Token::Line => {
                self.stream.advance();
                Ok(())
            }
            Token::RightBrace | Token::Eof => Ok(()),
            _ => Err(self.stream.error("Expect newline after statement.")),
        }
    }

    // ==================== Statements ====================

    fn statement(&mut self) -> CompileResult<Stmt> {
        self.nested(Self::statement_at_depth)
    }

    fn statement_at_depth(&mut self) -> CompileResult<Stmt> {
        let line = self.stream.line();
        match self.stream.peek() {
            Token::Class => self.class_definition(),
            Token::Var => {
                self.stream.advance();
                let name = self.name("Expect variable name.")?;
                let init = if self.stream.matches(&Token::Eq) {
                    self.stream.skip_lines();
                    Some(self.expression()?)
                } else {
                    None
                };
                Ok(Stmt::Var { name, init, line })
            }
            Token::Break => {
                self.stream.advance();
                Ok(Stmt::Break(line))
            }
            Token::Return => {
                self.stream.advance();
                let value = match self.stream.peek() {
                    Token::Line | Token::RightBrace | Token::Eof => None,
                    _ => Some(self.expression()?),
                };
                Ok(Stmt::Return(value, line))
            }
            Token::If => {
                self.stream.advance();
                let condition = self.parenthesized("if")?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if self.else_follows() {
                    self.stream.skip_lines();
                    self.stream.advance();
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    condition,
                    then_branch,
                    else_branch,
                })
            }
            Token::While => {
                self.stream.advance();
                let condition = self.parenthesized("while")?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::While { condition, body })
            }
            Token::For => {
                self.stream.advance();
                self.stream
                    .expect(&Token::LeftParen, "Expect '(' after 'for'.")?;
                let name = self.name("Expect for loop variable name.")?;
                self.stream
                    .expect(&Token::In, "Expect 'in' after loop variable.")?;
                self.stream.skip_lines();
                let sequence = self.expression()?;
                self.stream
                    .expect(&Token::RightParen, "Expect ')' after loop expression.")?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::For {
                    name,
                    sequence,
                    body,
                    line,
                })
            }
            Token::LeftBrace => {
                self.stream.advance();
                Ok(Stmt::Block(self.block_statements()?))
            }
            _ => Ok(Stmt::Expr(self.expression()?)),
        }
    }

    fn else_follows(&self) -> bool {
        let mut n = 0;
        while matches!(self.stream.peek_nth(n), Token::Line) {
            n += 1;
        }
        matches!(self.stream.peek_nth(n), Token::Else)
    }

    fn parenthesized(&mut self, keyword: &str) -> CompileResult<Expr> {
        self.stream
            .expect(&Token::LeftParen, &format!("Expect '(' after '{keyword}'."))?;
        self.stream.skip_lines();
        let expr = self.expression()?;
        self.stream.skip_lines();
        self.stream
            .expect(&Token::RightParen, "Expect ')' after condition.")?;
        Ok(expr)
    }

    /// Statements up to the closing brace; the opening one is consumed.
    fn block_statements(&mut self) -> CompileResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        self.stream.skip_lines();
        while !self.stream.check(&Token::RightBrace) {
            if self.stream.check(&Token::Eof) {
                return Err(self.stream.error("Expect '}' after block."));
            }
            stmts.push(self.statement()?);
            self.end_of_statement()?;
            self.stream.skip_lines();
        }
        self.stream.advance();
        Ok(stmts)
    }

    /// Function body up to the closing brace; the opening one is consumed.
    ///
    /// A body that starts on the same line as its brace holds a single
    /// expression whose value is returned.
    fn body(&mut self) -> CompileResult<Body> {
        if self.stream.matches(&Token::RightBrace) {
            return Ok(Body::Stmts(Vec::new()));
        }
        if self.stream.check(&Token::Line) {
            return Ok(Body::Stmts(self.block_statements()?));
        }

        let stmt = self.statement()?;
        self.stream.skip_lines();
        self.stream
            .expect(&Token::RightBrace, "Expect '}' at end of block.")?;
        Ok(match stmt {
            Stmt::Expr(expr) => Body::Expr(expr),
            other => Body::Stmts(vec![other]),
        })
    }

    fn class_definition(&mut self) -> CompileResult<Stmt> {
        let line = self.stream.advance().line;
        let name = self.name("Expect class name.")?;
        let superclass = if self.stream.matches(&Token::Is) {
            Some(self.call()?)
        } else {
            None
        };
        self.stream
            .expect(&Token::LeftBrace, "Expect '{' after class name.")?;

        let mut methods = Vec::new();
        self.stream.skip_lines();
        while !self.stream.matches(&Token::RightBrace) {
            if self.stream.check(&Token::Eof) {
                return Err(self.stream.error("Expect '}' after class body."));
            }
            methods.push(self.method()?);
            if !self.stream.check(&Token::RightBrace) {
                self.stream
                    .expect(&Token::Line, "Expect newline after definition in class.")?;
            }
            self.stream.skip_lines();
        }

        Ok(Stmt::Class(ClassDecl {
            name,
            superclass,
            methods,
            line,
        }))
    }

    fn method(&mut self) -> CompileResult<MethodDecl> {
        let is_static = self.stream.matches(&Token::Static);
        let line = self.stream.line();
        let mut is_constructor = false;

        let (signature, params) = match self.stream.peek().clone() {
            Token::New => {
                self.stream.advance();
                is_constructor = true;
                let params = self.optional_params()?;
                (Signature::method("new", params.len() as u8), params)
            }
            Token::Name(name) => {
                self.stream.advance();
                if self.stream.matches(&Token::Eq) {
                    let param = self.single_param()?;
                    (Signature::setter(name), vec![param])
                } else {
                    let params = self.optional_params()?;
                    (Signature::method(name, params.len() as u8), params)
                }
            }
            Token::LeftBracket => {
                self.stream.advance();
                let mut params = self.param_list(&Token::RightBracket)?;
                if params.is_empty() {
                    return Err(self.stream.error("Expect subscript parameter."));
                }
                let arity = params.len() as u8;
                if self.stream.matches(&Token::Eq) {
                    params.push(self.single_param()?);
                    (Signature::subscript_setter(arity), params)
                } else {
                    (Signature::subscript(arity), params)
                }
            }
            token => {
                let Some(op) = operator_name(&token) else {
                    return Err(self.stream.error("Expect method definition."));
                };
                self.stream.advance();
                let unary_only = matches!(token, Token::Bang | Token::Tilde);
                if !unary_only && self.stream.check(&Token::LeftParen) {
                    let param = self.single_param()?;
                    (Signature::method(op, 1), vec![param])
                } else if matches!(token, Token::Minus | Token::Bang | Token::Tilde) {
                    (Signature::method(op, 0), Vec::new())
                } else {
                    return Err(self.stream.error("Expect '(' after operator."));
                }
            }
        };

        self.stream
            .expect(&Token::LeftBrace, "Expect '{' to begin method body.")?;
        let body = self.body()?;
        Ok(MethodDecl {
            signature,
            is_static,
            is_constructor,
            params,
            body,
            line,
        })
    }

    fn optional_params(&mut self) -> CompileResult<Vec<String>> {
        if self.stream.matches(&Token::LeftParen) {
            self.param_list(&Token::RightParen)
        } else {
            Ok(Vec::new())
        }
    }

    fn single_param(&mut self) -> CompileResult<String> {
        self.stream
            .expect(&Token::LeftParen, "Expect '(' before parameter.")?;
        let name = self.name("Expect parameter name.")?;
        self.stream
            .expect(&Token::RightParen, "Expect ')' after parameter.")?;
        Ok(name)
    }

    /// Comma separated names up to `close`; the opening token is consumed.
    fn param_list(&mut self, close: &Token) -> CompileResult<Vec<String>> {
        let mut params = Vec::new();
        self.stream.skip_lines();
        if self.stream.matches(close) {
            return Ok(params);
        }
        loop {
            if params.len() == MAX_PARAMETERS {
                return Err(self.stream.error(format!(
                    "Methods cannot have more than {MAX_PARAMETERS} parameters."
                )));
            }
            params.push(self.name("Expect parameter name.")?);
            self.stream.skip_lines();
            if !self.stream.matches(&Token::Comma) {
                break;
            }
            self.stream.skip_lines();
        }
        self.stream
            .expect(close, "Expect closing delimiter after parameters.")?;
        Ok(params)
    }

    fn name(&mut self, message: &str) -> CompileResult<String> {
        match self.stream.peek().clone() {
            Token::Name(name) => {
                self.stream.advance();
                Ok(name)
            }
            _ => Err(self.stream.error(message)),
        }
    }

    // ==================== Expressions ====================

    /// Parse a full expression, assignment included
    pub fn expression(&mut self) -> CompileResult<Expr> {
        self.nested(Self::assignment)
    }

    fn assignment(&mut self) -> CompileResult<Expr> {
        let target = self.conditional()?;
        if !self.stream.check(&Token::Eq) {
            return Ok(target);
        }

        let line = self.stream.advance().line;
        self.stream.skip_lines();
        let value = self.expression()?;
        match target {
            Expr::Name(..) | Expr::Field(..) | Expr::Subscript { .. } => {}
            Expr::Call {
                receiver: Some(_),
                ref args,
                ..
            } if args.is_empty() => {}
            _ => {
                return Err(CompileError::syntax(
                    "Invalid assignment target.",
                    "=",
                    line,
                ));
            }
        }
        Ok(Expr::Assign {
            target: Box::new(target),
            value: Box::new(value),
            line,
        })
    }

    fn conditional(&mut self) -> CompileResult<Expr> {
        let condition = self.logical_or()?;
        if !self.stream.matches(&Token::Question) {
            return Ok(condition);
        }
        self.stream.skip_lines();
        let then_value = self.nested(Self::conditional)?;
        self.stream.skip_lines();
        self.stream
            .expect(&Token::Colon, "Expect ':' after then branch of conditional.")?;
        self.stream.skip_lines();
        let else_value = self.nested(Self::conditional)?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
        })
    }

    fn logical_or(&mut self) -> CompileResult<Expr> {
        let depth = self.depth;
        let mut left = self.logical_and()?;
        while self.stream.matches(&Token::PipePipe) {
            self.deepen()?;
            self.stream.skip_lines();
            let right = self.logical_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn logical_and(&mut self) -> CompileResult<Expr> {
        let depth = self.depth;
        let mut left = self.is_test()?;
        while self.stream.matches(&Token::AmpAmp) {
            self.deepen()?;
            self.stream.skip_lines();
            let right = self.is_test()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn is_test(&mut self) -> CompileResult<Expr> {
        let depth = self.depth;
        let mut value = self.binary(0)?;
        while self.stream.check(&Token::Is) {
            self.deepen()?;
            let line = self.stream.advance().line;
            self.stream.skip_lines();
            let class = self.binary(0)?;
            value = Expr::Is {
                value: Box::new(value),
                class: Box::new(class),
                line,
            };
        }
        self.depth = depth;
        Ok(value)
    }

    /// Left-associative infix operators, loosest level first
    fn binary(&mut self, level: usize) -> CompileResult<Expr> {
        if level == BINARY_LEVELS.len() {
            return self.unary();
        }

        let depth = self.depth;
        let mut left = self.binary(level + 1)?;
        loop {
            let token = self.stream.peek().clone();
            let Some(op) = BINARY_LEVELS[level]
                .iter()
                .find(|(t, _)| std::mem::discriminant(t) == std::mem::discriminant(&token))
                .map(|(_, op)| *op)
            else {
                break;
            };
            self.deepen()?;
            let line = self.stream.advance().line;
            self.stream.skip_lines();
            let right = self.binary(level + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                line,
            };
        }
        self.depth = depth;
        Ok(left)
    }

    fn unary(&mut self) -> CompileResult<Expr> {
        let op = match self.stream.peek() {
            Token::Minus => "-",
            Token::Bang => "!",
            Token::Tilde => "~",
            _ => return self.call(),
        };
        let line = self.stream.advance().line;
        let operand = self.nested(Self::unary)?;
        if let (Expr::Num(n), "-") = (&operand, op) {
            return Ok(Expr::Num(-n));
        }
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            line,
        })
    }

    fn call(&mut self) -> CompileResult<Expr> {
        let depth = self.depth;
        let mut expr = self.primary()?;
        loop {
            match self.stream.peek() {
                Token::Dot => {
                    self.deepen()?;
                    self.stream.advance();
                    self.stream.skip_lines();
                    let line = self.stream.line();
                    let Some(name) = self.stream.peek().as_method_name().map(str::to_string)
                    else {
                        return Err(self.stream.error("Expect method name after '.'."));
                    };
                    self.stream.advance();
                    let args = self.call_arguments(true)?;
                    expr = Expr::Call {
                        receiver: Some(Box::new(expr)),
                        name,
                        args,
                        line,
                    };
                }
                Token::LeftBracket => {
                    self.deepen()?;
                    let line = self.stream.advance().line;
                    let args = self.argument_list(&Token::RightBracket)?;
                    if args.is_empty() {
                        return Err(self.stream.error("Expect subscript argument."));
                    }
                    expr = Expr::Subscript {
                        receiver: Box::new(expr),
                        args,
                        line,
                    };
                }
                _ => break,
            }
        }
        self.depth = depth;
        Ok(expr)
    }

    /// Optional parenthesized arguments, plus a trailing block argument when
    /// `allow_block` is set.
    fn call_arguments(&mut self, allow_block: bool) -> CompileResult<Vec<Expr>> {
        let mut args = if self.stream.matches(&Token::LeftParen) {
            self.argument_list(&Token::RightParen)?
        } else {
            Vec::new()
        };
        if allow_block && self.stream.check(&Token::LeftBrace) {
            args.push(self.block_literal()?);
        }
        if args.len() > MAX_PARAMETERS {
            return Err(self.stream.error(format!(
                "Methods cannot have more than {MAX_PARAMETERS} parameters."
            )));
        }
        Ok(args)
    }

    /// Comma separated expressions up to `close`; the opening token is consumed.
    fn argument_list(&mut self, close: &Token) -> CompileResult<Vec<Expr>> {
        let mut args = Vec::new();
        self.stream.skip_lines();
        if self.stream.matches(close) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            self.stream.skip_lines();
            if !self.stream.matches(&Token::Comma) {
                break;
            }
            self.stream.skip_lines();
        }
        self.stream
            .expect(close, "Expect closing delimiter after arguments.")?;
        Ok(args)
    }

    fn block_literal(&mut self) -> CompileResult<Expr> {
        let line = self.stream.advance().line;
        let params = if self.stream.matches(&Token::Pipe) {
            self.param_list(&Token::Pipe)?
        } else {
            Vec::new()
        };
        let body = self.body()?;
        Ok(Expr::Fn(Box::new(FnLiteral { params, body, line })))
    }

    fn primary(&mut self) -> CompileResult<Expr> {
        let line = self.stream.line();
        match self.stream.peek().clone() {
            Token::Null => {
                self.stream.advance();
                Ok(Expr::Null)
            }
            Token::True => {
                self.stream.advance();
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.stream.advance();
                Ok(Expr::Bool(false))
            }
            Token::Number(n) => {
                self.stream.advance();
                Ok(Expr::Num(n))
            }
            Token::String(bytes) => {
                self.stream.advance();
                Ok(Expr::Str(bytes))
            }
            Token::This => {
                self.stream.advance();
                Ok(Expr::This(line))
            }
            Token::Field(name) => {
                self.stream.advance();
                Ok(Expr::Field(name, line))
            }
            Token::Name(name) => {
                self.stream.advance();
                if self.stream.matches(&Token::LeftParen) {
                    let args = self.argument_list(&Token::RightParen)?;
                    Ok(Expr::Call {
                        receiver: None,
                        name,
                        args,
                        line,
                    })
                } else {
                    Ok(Expr::Name(name, line))
                }
            }
            Token::LeftParen => {
                self.stream.advance();
                self.stream.skip_lines();
                let expr = self.expression()?;
                self.stream.skip_lines();
                self.stream
                    .expect(&Token::RightParen, "Expect ')' after expression.")?;
                Ok(expr)
            }
            Token::LeftBracket => {
                self.stream.advance();
                Ok(Expr::List(self.argument_list(&Token::RightBracket)?))
            }
            Token::Super => {
                self.stream.advance();
                let name = if self.stream.matches(&Token::Dot) {
                    let Some(name) = self.stream.peek().as_method_name().map(str::to_string)
                    else {
                        return Err(self.stream.error("Expect method name after 'super.'."));
                    };
                    self.stream.advance();
                    Some(name)
                } else {
                    None
                };
                let args = self.call_arguments(true)?;
                Ok(Expr::Super { name, args, line })
            }
            Token::New => {
                self.stream.advance();
                let class = match self.stream.peek().clone() {
                    Token::Name(name) => {
                        self.stream.advance();
                        Expr::Name(name, line)
                    }
                    Token::LeftParen => self.primary()?,
                    _ => return Err(self.stream.error("Expect class name after 'new'.")),
                };
                let args = self.call_arguments(true)?;
                Ok(Expr::New {
                    class: Box::new(class),
                    args,
                    line,
                })
            }
            _ => Err(self.stream.error("Expect expression.")),
        }
    }
}

/// Infix operators grouped by precedence, loosest first
const BINARY_LEVELS: &[&[(Token, &str)]] = &[
    &[(Token::EqEq, "=="), (Token::BangEq, "!=")],
    &[
        (Token::Lt, "<"),
        (Token::Gt, ">"),
        (Token::LtEq, "<="),
        (Token::GtEq, ">="),
    ],
    &[(Token::Pipe, "|"), (Token::Amp, "&")],
    &[(Token::DotDot, ".."), (Token::DotDotDot, "...")],
    &[(Token::Plus, "+"), (Token::Minus, "-")],
    &[(Token::Star, "*"), (Token::Slash, "/"), (Token::Percent, "%")],
];

/// Method name of an overloadable operator token
fn operator_name(token: &Token) -> Option<&'static str> {
    Some(match token {
        Token::Plus => "+",
        Token::Minus => "-",
        Token::Star => "*",
        Token::Slash => "/",
        Token::Percent => "%",
        Token::Lt => "<",
        Token::Gt => ">",
        Token::LtEq => "<=",
        Token::GtEq => ">=",
        Token::EqEq => "==",
        Token::BangEq => "!=",
        Token::DotDot => "..",
        Token::DotDotDot => "...",
        Token::Pipe => "|",
        Token::Amp => "&",
        Token::Bang => "!",
        Token::Tilde => "~",
        _ => return None,
    })
}

/// Parse source text into statements
pub fn parse(source: &str) -> CompileResult<Vec<Stmt>> {
    let tokens = crate::lexer::tokenize(source)?;
    Parser::new(tokens).parse_module()
}

#[cfg(test)]
mod tests {
    use super::*;
    use finch_vm_bytecode::SignatureKind;

    fn expr(source: &str) -> Expr {
        match parse(source).unwrap().remove(0) {
            Stmt::Expr(e) => e,
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let Expr::Binary { op, right, .. } = expr("1 + 2 * 3") else {
            panic!("expected binary");
        };
        assert_eq!(op, "+");
        assert!(matches!(*right, Expr::Binary { op: "*", .. }));

        // Range binds tighter than comparison
        let Expr::Binary { op, .. } = expr("a < 1..3") else {
            panic!("expected binary");
        };
        assert_eq!(op, "<");
    }

    #[test]
    fn test_negative_literal_is_folded() {
        assert_eq!(expr("-1"), Expr::Num(-1.0));
        assert!(matches!(expr("-x"), Expr::Unary { op: "-", .. }));
    }

    #[test]
    fn test_block_argument() {
        let Expr::Call { name, args, .. } = expr("list.map {|x| x * 2 }") else {
            panic!("expected call");
        };
        assert_eq!(name, "map");
        assert_eq!(args.len(), 1);
        let Expr::Fn(ref f) = args[0] else {
            panic!("expected block");
        };
        assert_eq!(f.params, vec!["x".to_string()]);
        assert!(matches!(f.body, Body::Expr(_)));
    }

    #[test]
    fn test_class_members() {
        let source = "class Foo is Bar {\n  new(a) { _a = a }\n  a { _a }\n  a=(v) { _a = v }\n  [i] { i }\n  [i]=(v) { v }\n  +(o) { o }\n  - { 0 }\n  static make { 1 }\n}";
        let stmts = parse(source).unwrap();
        let Stmt::Class(class) = &stmts[0] else {
            panic!("expected class");
        };
        assert_eq!(class.name, "Foo");
        assert!(class.superclass.is_some());
        let keys: Vec<_> = class.methods.iter().map(|m| m.signature.key()).collect();
        assert_eq!(keys, vec!["new ", "a", "a=", "[ ]", "[ ]=", "+ ", "-", "make"]);
        assert!(class.methods[0].is_constructor);
        assert!(class.methods[7].is_static);
        assert_eq!(class.methods[4].signature.kind, SignatureKind::SubscriptSetter);
        assert_eq!(class.methods[4].params.len(), 2);
    }

    #[test]
    fn test_else_on_next_line() {
        let stmts = parse("if (a) {\n  b\n}\nelse c").unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(matches!(
            stmts[0],
            Stmt::If {
                else_branch: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_wrapped_arguments() {
        let Expr::Call { args, .. } = expr("foo.bar(\n  1,\n  2\n)") else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(parse("1 = 2").is_err());
        assert!(parse("a.b(1) = 2").is_err());
        assert!(parse("a.b = 2").is_ok());
    }

    #[test]
    fn test_missing_newline() {
        let err = parse("a b").unwrap_err();
        assert!(err.to_string().contains("Expect newline after statement."));
    }
}
