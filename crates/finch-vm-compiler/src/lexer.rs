//! Lexical analysis for Finch source.
//!
//! Tokenization is done by a `logos` derived lexer. Newlines are significant
//! (they terminate statements), so they are produced as [`Token::Line`]
//! instead of being skipped with the rest of the whitespace.

use logos::Logos;

use crate::error::{CompileError, CompileResult};

/// Finch token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum Token {
    // === Punctuation ===
    /// `(`
    #[token("(")]
    LeftParen,
    /// `)`
    #[token(")")]
    RightParen,
    /// `[`
    #[token("[")]
    LeftBracket,
    /// `]`
    #[token("]")]
    RightBracket,
    /// `{`
    #[token("{")]
    LeftBrace,
    /// `}`
    #[token("}")]
    RightBrace,
    /// `:`
    #[token(":")]
    Colon,
    /// `.`
    #[token(".")]
    Dot,
    /// `..`
    #[token("..")]
    DotDot,
    /// `...`
    #[token("...")]
    DotDotDot,
    /// `,`
    #[token(",")]
    Comma,
    /// `*`
    #[token("*")]
    Star,
    /// `/`
    #[token("/")]
    Slash,
    /// `%`
    #[token("%")]
    Percent,
    /// `+`
    #[token("+")]
    Plus,
    /// `-`
    #[token("-")]
    Minus,
    /// `|`
    #[token("|")]
    Pipe,
    /// `||`
    #[token("||")]
    PipePipe,
    /// `&`
    #[token("&")]
    Amp,
    /// `&&`
    #[token("&&")]
    AmpAmp,
    /// `!`
    #[token("!")]
    Bang,
    /// `~`
    #[token("~")]
    Tilde,
    /// `?`
    #[token("?")]
    Question,
    /// `=`
    #[token("=")]
    Eq,
    /// `<`
    #[token("<")]
    Lt,
    /// `>`
    #[token(">")]
    Gt,
    /// `<=`
    #[token("<=")]
    LtEq,
    /// `>=`
    #[token(">=")]
    GtEq,
    /// `==`
    #[token("==")]
    EqEq,
    /// `!=`
    #[token("!=")]
    BangEq,

    // === Keywords ===
    /// `break`
    #[token("break")]
    Break,
    /// `class`
    #[token("class")]
    Class,
    /// `else`
    #[token("else")]
    Else,
    /// `false`
    #[token("false")]
    False,
    /// `for`
    #[token("for")]
    For,
    /// `if`
    #[token("if")]
    If,
    /// `in`
    #[token("in")]
    In,
    /// `is`
    #[token("is")]
    Is,
    /// `new`
    #[token("new")]
    New,
    /// `null`
    #[token("null")]
    Null,
    /// `return`
    #[token("return")]
    Return,
    /// `static`
    #[token("static")]
    Static,
    /// `super`
    #[token("super")]
    Super,
    /// `this`
    #[token("this")]
    This,
    /// `true`
    #[token("true")]
    True,
    /// `var`
    #[token("var")]
    Var,
    /// `while`
    #[token("while")]
    While,

    // === Literals ===
    /// Instance field name, `_` prefixed
    #[regex(r"_[a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Field(String),

    /// Identifier
    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),

    /// Number literal
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"0x[0-9a-fA-F]+", |lex| u64::from_str_radix(&lex.slice()[2..], 16).ok().map(|n| n as f64))]
    Number(f64),

    /// String literal with escapes resolved
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    String(Vec<u8>),

    /// End of line
    #[token("\n")]
    Line,

    /// End of input (never produced by logos itself)
    Eof,
}

impl Token {
    /// Whether this token can name a method in a call (`a.new`, `a.is`, ...)
    pub fn as_method_name(&self) -> Option<&str> {
        match self {
            Token::Name(name) => Some(name),
            Token::New => Some("new"),
            _ => None,
        }
    }
}

fn unescape(slice: &str) -> Option<Vec<u8>> {
    let content = &slice.as_bytes()[1..slice.len() - 1];
    let mut out = Vec::with_capacity(content.len());
    let mut bytes = content.iter();
    while let Some(&b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let escaped = match bytes.next()? {
            b'"' => b'"',
            b'\\' => b'\\',
            b'0' => b'\0',
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            _ => return None,
        };
        out.push(escaped);
    }
    Some(out)
}

/// A token with the source line it starts on and its source text
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    /// The token
    pub token: Token,
    /// Source line (1-indexed)
    pub line: u32,
    /// Source text of the token
    pub text: String,
}

/// Tokenize a whole source file
///
/// The returned vector always ends with [`Token::Eof`].
pub fn tokenize(source: &str) -> CompileResult<Vec<SpannedToken>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut line = 1u32;
    let mut scanned = 0usize;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        line += count_newlines(&source[scanned..span.start]);
        scanned = span.start;

        let text = lexer.slice();
        let token = match result {
            Ok(token) => token,
            Err(()) => return Err(lex_error(text, line)),
        };
        tokens.push(SpannedToken {
            token,
            line,
            text: text.to_string(),
        });
    }

    line += count_newlines(&source[scanned..]);
    tokens.push(SpannedToken {
        token: Token::Eof,
        line,
        text: String::new(),
    });
    Ok(tokens)
}

fn count_newlines(text: &str) -> u32 {
    text.bytes().filter(|&b| b == b'\n').count() as u32
}

fn lex_error(text: &str, line: u32) -> CompileError {
    if text.starts_with('"') {
        if text.len() > 1 && text.ends_with('"') {
            CompileError::lex("Invalid escape character.", line)
        } else {
            CompileError::lex("Unterminated string.", line)
        }
    } else if text.starts_with(|c: char| c.is_ascii_digit()) {
        CompileError::lex(format!("Invalid number literal '{text}'."), line)
    } else {
        CompileError::lex(format!("Invalid character '{text}'."), line)
    }
}
