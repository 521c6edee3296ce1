//! Lexical analysis of a single input line.
//!
//! Unlike a conventional shell lexer, whitespace is not thrown away: every run
//! of spaces and tabs becomes a [`Token::Whitespace`] carrying its width, so the
//! parser can rebuild expression text with the user's original spacing.

use crate::keyword::Keyword;
use std::fmt;

/// Width of a tab character inside a whitespace run.
pub const TAB_WIDTH: usize = 4;

/// Arithmetic operators, shared by plain and compound (`op=`) tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }
}

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Double-quoted string literal, quotes stripped.
    Str(String),
    Int(i64),
    Float(f64),
    /// A word that is neither a keyword nor a variable reference.
    Ident(String),
    Keyword(Keyword),
    /// `$name`, sigil stripped.
    Variable(String),
    EndOfLine,
    Semicolon,
    /// `=`
    Assign,
    /// `==`
    Equals,
    Operator(BinaryOp),
    /// `+=`, `-=`, `*=`, `/=`, `%=`, `**=`
    CompoundAssign(BinaryOp),
    LParen,
    RParen,
    /// A run of spaces and tabs, measured in columns.
    Whitespace(usize),
}

impl fmt::Display for Token {
    /// Renders the token the way it is spelled in an expression.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::Int(n) => write!(f, "{n}"),
            Token::Float(x) => f.write_str(&render_float_literal(*x)),
            Token::Ident(s) | Token::Variable(s) => f.write_str(s),
            Token::Keyword(k) => f.write_str(k.as_str()),
            Token::EndOfLine => Ok(()),
            Token::Semicolon => f.write_str(";"),
            Token::Assign => f.write_str("="),
            Token::Equals => f.write_str("=="),
            Token::Operator(op) => f.write_str(op.symbol()),
            Token::CompoundAssign(op) => write!(f, "{}=", op.symbol()),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Whitespace(width) => write!(f, "{:width$}", ""),
        }
    }
}

/// Float text that re-lexes as a float (`1.0`, never `1`).
fn render_float_literal(x: f64) -> String {
    let text = x.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    /// A closing double quote was not found before the end of the line.
    #[error("EOL before termination of string")]
    UnterminatedString,
    /// A character that cannot start any token.
    #[error("unrecognised character: {0}")]
    UnrecognizedCharacter(char),
    /// A literal too large for an `i64`, or for an `f64` when it has a point.
    #[error("number out of range: {0}")]
    InvalidNumber(String),
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '@'
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    out: Vec<Token>,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            out: Vec::new(),
        }
    }

    fn make_tokens(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' => self.whitespace(),
                '$' => self.variable()?,
                c if is_identifier_start(c) => self.identifier(),
                c if c.is_ascii_digit() => self.number()?,
                '"' => self.string()?,
                '=' => {
                    self.read_char();
                    if self.peek_char() == Some('=') {
                        self.read_char();
                        self.out.push(Token::Equals);
                    } else {
                        self.out.push(Token::Assign);
                    }
                }
                '+' => self.operator(BinaryOp::Add),
                '-' => self.operator(BinaryOp::Sub),
                '/' => self.operator(BinaryOp::Div),
                '%' => self.operator(BinaryOp::Mod),
                '*' => {
                    self.read_char();
                    match self.peek_char() {
                        Some('*') => self.operator(BinaryOp::Pow),
                        Some('=') => {
                            self.read_char();
                            self.out.push(Token::CompoundAssign(BinaryOp::Mul));
                        }
                        _ => self.out.push(Token::Operator(BinaryOp::Mul)),
                    }
                }
                '(' => self.atom(Token::LParen),
                ')' => self.atom(Token::RParen),
                ';' => self.atom(Token::Semicolon),
                other => return Err(LexError::UnrecognizedCharacter(other)),
            }
        }

        self.out.push(Token::EndOfLine);
        Ok(self.out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn atom(&mut self, token: Token) {
        self.read_char();
        self.out.push(token);
    }

    fn whitespace(&mut self) {
        let mut width = 0;
        while let Some(ch @ (' ' | '\t')) = self.peek_char() {
            width += if ch == '\t' { TAB_WIDTH } else { 1 };
            self.read_char();
        }
        self.out.push(Token::Whitespace(width));
    }

    fn take_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(ch) = self.peek_char().filter(|c| is_identifier_char(*c)) {
            word.push(ch);
            self.read_char();
        }
        word
    }

    fn variable(&mut self) -> Result<(), LexError> {
        self.read_char(); // '$'
        let name = self.take_word();
        if name.is_empty() {
            return Err(LexError::UnrecognizedCharacter('$'));
        }
        self.out.push(Token::Variable(name));
        Ok(())
    }

    fn identifier(&mut self) {
        let mut word = String::new();
        if let Some(first) = self.read_char() {
            word.push(first);
        }
        word.push_str(&self.take_word());

        match Keyword::lookup(&word) {
            Some(keyword) => self.out.push(Token::Keyword(keyword)),
            None => self.out.push(Token::Ident(word)),
        }
    }

    /// Digits with at most one decimal point.
    fn number(&mut self) -> Result<(), LexError> {
        let mut raw = String::new();
        let mut is_float = false;

        while let Some(ch) = self.peek_char().filter(char::is_ascii_digit) {
            raw.push(ch);
            self.read_char();
            if !is_float && self.peek_char() == Some('.') {
                raw.push('.');
                self.read_char();
                is_float = true;
            }
        }

        let token = if is_float {
            if raw.ends_with('.') {
                raw.push('0');
            }
            match raw.parse::<f64>() {
                Ok(x) if x.is_finite() => Token::Float(x),
                _ => return Err(LexError::InvalidNumber(raw)),
            }
        } else {
            raw.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| LexError::InvalidNumber(raw))?
        };
        self.out.push(token);
        Ok(())
    }

    fn string(&mut self) -> Result<(), LexError> {
        self.read_char(); // opening quote
        let mut raw = String::new();
        loop {
            match self.read_char() {
                Some('"') => break,
                Some(ch) => raw.push(ch),
                None => return Err(LexError::UnterminatedString),
            }
        }
        self.out.push(Token::Str(raw));
        Ok(())
    }

    /// `op` or `op=`, decided by one character of lookahead.
    fn operator(&mut self, op: BinaryOp) {
        self.read_char();
        if self.peek_char() == Some('=') {
            self.read_char();
            self.out.push(Token::CompoundAssign(op));
        } else {
            self.out.push(Token::Operator(op));
        }
    }
}

/// Splits a line into tokens, always terminated by [`Token::EndOfLine`].
///
/// # Errors
///
/// Returns [`LexError`] on an unterminated string, a character that cannot
/// start a token, or an integer literal that overflows.
pub fn tokenize(line: &str) -> Result<Vec<Token>, LexError> {
    let tokens = LexingFSM::new(line).make_tokens()?;
    tracing::debug!(?tokens, "lexed line");
    Ok(tokens)
}
