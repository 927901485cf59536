use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::SourceFile;

/// A Pike token as seen by the analysis engine.
///
/// Whitespace runs and comments are kept as tokens, so a token stream can be
/// concatenated back into the original source. `line` is 1-based. `column`
/// is the 0-based character offset on that line; tokenizers that cannot
/// report it leave it empty and positions are recovered from the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Token {
    pub fn new<S: Into<String>>(text: S, line: usize) -> Self {
        Self {
            text: text.into(),
            line,
            column: None,
        }
    }

    fn located(text: String, line: usize, column: usize) -> Self {
        Self {
            text,
            line,
            column: Some(column),
        }
    }
}

/// Tokenizer failure. `line` and `column` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexerError {
    #[error("unterminated string literal starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("unterminated character literal starting at line {line}, column {column}")]
    UnterminatedChar { line: usize, column: usize },
    #[error("unterminated block comment starting at line {line}, column {column}")]
    UnterminatedComment { line: usize, column: usize },
}

impl LexerError {
    pub fn line(&self) -> usize {
        match self {
            LexerError::UnterminatedString { line, .. }
            | LexerError::UnterminatedChar { line, .. }
            | LexerError::UnterminatedComment { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            LexerError::UnterminatedString { column, .. }
            | LexerError::UnterminatedChar { column, .. }
            | LexerError::UnterminatedComment { column, .. } => *column,
        }
    }
}

const OPERATORS_3: &[&str] = &["<<=", ">>=", "||=", "&&=", "..."];
const OPERATORS_2: &[&str] = &[
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "==", "!=", "<=", ">=", "<<", ">>", "&&",
    "||", "++", "--", "->", "::", "..",
];

#[derive(Clone, Copy)]
struct Mark {
    position: usize,
    line: usize,
    column: usize,
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a SourceFile) -> Self {
        Self::from_text(&source.contents)
    }

    pub fn from_text(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            line: 1,
            column: 0,
            line_start: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            let token = match ch {
                c if c.is_whitespace() => self.lex_whitespace(),
                '/' if self.peek_next_char() == Some('/') => self.lex_line_comment(),
                '/' if self.peek_next_char() == Some('*') => self.lex_block_comment()?,
                '#' if self.peek_next_char() == Some('"') => self.lex_string(true)?,
                '#' if self.at_line_start() => self.lex_directive(),
                '"' => self.lex_string(false)?,
                '\'' => self.lex_char()?,
                '0'..='9' => self.lex_number(),
                c if c == '_' || c.is_alphabetic() => self.lex_identifier(),
                _ => self.lex_operator(),
            };
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn lex_whitespace(&mut self) -> Token {
        let mark = self.mark();
        while matches!(self.peek_char(), Some(ch) if ch.is_whitespace()) {
            self.advance_char();
        }
        self.finish(mark)
    }

    fn lex_line_comment(&mut self) -> Token {
        let mark = self.mark();
        while matches!(self.peek_char(), Some(ch) if ch != '\n') {
            self.advance_char();
        }
        self.finish(mark)
    }

    fn lex_block_comment(&mut self) -> Result<Token> {
        let mark = self.mark();
        self.advance_char(); // '/'
        self.advance_char(); // '*'

        while self.peek_char().is_some() {
            if self.rest().starts_with("*/") {
                self.advance_char();
                self.advance_char();
                return Ok(self.finish(mark));
            }
            self.advance_char();
        }

        Err(LexerError::UnterminatedComment {
            line: mark.line,
            column: mark.column + 1,
        }
        .into())
    }

    /// Preprocessor lines (`#include`, `#define`, ...) become one token,
    /// following backslash continuations.
    fn lex_directive(&mut self) -> Token {
        let mark = self.mark();
        let mut previous = None;
        while let Some(ch) = self.peek_char() {
            if ch == '\n' && previous != Some('\\') {
                break;
            }
            previous = Some(ch);
            self.advance_char();
        }
        self.finish(mark)
    }

    fn lex_string(&mut self, multiline: bool) -> Result<Token> {
        let mark = self.mark();
        if multiline {
            self.advance_char(); // '#'
        }
        self.advance_char(); // opening quote

        loop {
            match self.peek_char() {
                Some('"') => {
                    self.advance_char();
                    return Ok(self.finish(mark));
                }
                Some('\\') => {
                    self.advance_char();
                    if self.advance_char().is_none() {
                        break;
                    }
                }
                Some('\n') if !multiline => break,
                Some(_) => {
                    self.advance_char();
                }
                None => break,
            }
        }

        Err(LexerError::UnterminatedString {
            line: mark.line,
            column: mark.column + 1,
        }
        .into())
    }

    fn lex_char(&mut self) -> Result<Token> {
        let mark = self.mark();
        self.advance_char(); // opening quote

        loop {
            match self.peek_char() {
                Some('\'') => {
                    self.advance_char();
                    return Ok(self.finish(mark));
                }
                Some('\\') => {
                    self.advance_char();
                    if self.advance_char().is_none() {
                        break;
                    }
                }
                Some('\n') | None => break,
                Some(_) => {
                    self.advance_char();
                }
            }
        }

        Err(LexerError::UnterminatedChar {
            line: mark.line,
            column: mark.column + 1,
        }
        .into())
    }

    fn lex_number(&mut self) -> Token {
        let mark = self.mark();
        let rest = self.rest();
        if rest.starts_with("0x")
            || rest.starts_with("0X")
            || rest.starts_with("0b")
            || rest.starts_with("0B")
        {
            self.advance_char();
            self.advance_char();
            while matches!(self.peek_char(), Some(ch) if ch.is_ascii_alphanumeric() || ch == '_') {
                self.advance_char();
            }
            return self.finish(mark);
        }

        self.consume_digits();
        // `1..5` is a range, not a float.
        if self.peek_char() == Some('.') && matches!(self.peek_next_char(), Some('0'..='9')) {
            self.advance_char();
            self.consume_digits();
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let mut lookahead = self.rest().chars().skip(1);
            let next = lookahead.next();
            let exponent_follows = match next {
                Some('0'..='9') => true,
                Some('+' | '-') => matches!(lookahead.next(), Some('0'..='9')),
                _ => false,
            };
            if exponent_follows {
                self.advance_char();
                if matches!(self.peek_char(), Some('+' | '-')) {
                    self.advance_char();
                }
                self.consume_digits();
            }
        }
        self.finish(mark)
    }

    fn consume_digits(&mut self) {
        while matches!(self.peek_char(), Some(ch) if ch.is_ascii_digit() || ch == '_') {
            self.advance_char();
        }
    }

    fn lex_identifier(&mut self) -> Token {
        let mark = self.mark();
        while matches!(self.peek_char(), Some(ch) if ch.is_alphanumeric() || ch == '_') {
            self.advance_char();
        }
        self.finish(mark)
    }

    fn lex_operator(&mut self) -> Token {
        let mark = self.mark();
        let rest = self.rest();
        let width = OPERATORS_3
            .iter()
            .chain(OPERATORS_2)
            .find(|op| rest.starts_with(**op))
            .map(|op| op.len())
            .unwrap_or(1);
        for _ in 0..width {
            self.advance_char();
        }
        self.finish(mark)
    }

    fn at_line_start(&self) -> bool {
        self.input[self.line_start..self.position].trim().is_empty()
    }

    fn mark(&self) -> Mark {
        Mark {
            position: self.position,
            line: self.line,
            column: self.column,
        }
    }

    fn finish(&self, mark: Mark) -> Token {
        Token::located(
            self.input[mark.position..self.position].to_string(),
            mark.line,
            mark.column,
        )
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.rest().chars();
        iter.next()?;
        iter.next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
            self.line_start = self.position;
        } else {
            self.column += 1;
        }
        Some(ch)
    }
}
