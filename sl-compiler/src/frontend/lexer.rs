use crate::CompileError;
use logos::Logos;
use std::fmt;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n]+")] // Whitespace
#[logos(skip r"//[^\n]*")] // Line comments
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")] // Block comments
pub enum Token {
    // --- Keywords ---
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("loop")]
    Loop,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("def")]
    Def,
    #[token("ext")]
    Ext,
    #[token("cls")]
    Cls,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // --- Identifiers and literals ---
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[0-9]+", |lex| lex.slice().parse().ok())]
    Number(i32),

    #[regex(r#""(\\.|[^"\\])*""#, |lex| unescape(lex.slice()))]
    Str(String),

    #[regex(r"'(\\.|[^'\\])'", |lex| char_value(lex.slice()))]
    Char(u8),

    // --- Punctuation ---
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    // --- Operators ---
    // A maximal run of operator characters is one token ("==", "&&", "+=").
    #[regex(r"[+\-*/%=&|<>!]+", |lex| lex.slice().to_string())]
    Op(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::Loop => write!(f, "loop"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Def => write!(f, "def"),
            Token::Ext => write!(f, "ext"),
            Token::Cls => write!(f, "cls"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Char(c) => write!(f, "'{}'", *c as char),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Op(s) => write!(f, "{}", s),
        }
    }
}

/// Strip the surrounding quotes and process backslash escapes.
fn unescape(slice: &str) -> String {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Value of a character literal. Rejects non-ASCII characters.
fn char_value(slice: &str) -> Option<u8> {
    let text = unescape(slice);
    let mut chars = text.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    u8::try_from(c as u32).ok()
}

/// Convert a byte position to line and column numbers (1-based).
pub fn position_to_line_col(source: &str, position: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= position {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// The line of source text containing an error position.
pub fn get_error_context(source: &str, position: usize) -> String {
    let line_start = source[..position]
        .rfind('\n')
        .map(|pos| pos + 1)
        .unwrap_or(0);

    let line_end = source[position..]
        .find('\n')
        .map(|pos| position + pos)
        .unwrap_or(source.len());

    source[line_start..line_end].trim().to_string()
}

/// A token together with its byte span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

/// Lazy token stream with one-token lookahead.
///
/// `peek()` inspects without consuming, `next()` consumes, `reset()` rewinds
/// to the start of input for multi-pass use. A lexical error surfaces from
/// whichever of `peek`/`next` first reaches the offending character.
pub struct TokenStream<'src> {
    source: &'src str,
    lexer: logos::Lexer<'src, Token>,
    peeked: Option<Option<Spanned>>,
}

impl<'src> TokenStream<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            lexer: Token::lexer(source),
            peeked: None,
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    fn pull(&mut self) -> Result<Option<Spanned>, CompileError> {
        match self.lexer.next() {
            None => Ok(None),
            Some(Ok(token)) => {
                let span = self.lexer.span();
                Ok(Some(Spanned {
                    token,
                    start: span.start,
                    end: span.end,
                }))
            }
            Some(Err(())) => {
                let pos = self.lexer.span().start;
                let (line, col) = position_to_line_col(self.source, pos);
                let ch = self.source[pos..].chars().next().unwrap_or('\0');
                Err(CompileError::Lex { line, col, ch })
            }
        }
    }

    pub fn peek(&mut self) -> Result<Option<&Spanned>, CompileError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.pull()?);
        }
        match &self.peeked {
            Some(t) => Ok(t.as_ref()),
            None => Ok(None),
        }
    }

    pub fn next(&mut self) -> Result<Option<Spanned>, CompileError> {
        match self.peeked.take() {
            Some(t) => Ok(t),
            None => self.pull(),
        }
    }

    pub fn at_end(&mut self) -> Result<bool, CompileError> {
        Ok(self.peek()?.is_none())
    }

    /// Byte position of the next token, or end of input.
    pub fn current_position(&mut self) -> Result<usize, CompileError> {
        Ok(self.peek()?.map(|t| t.start).unwrap_or(self.source.len()))
    }

    /// Rewind to the start of input, discarding lookahead.
    pub fn reset(&mut self) {
        self.lexer = Token::lexer(self.source);
        self.peeked = None;
    }
}
