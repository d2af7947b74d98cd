//! `XPath` 1.0 expression tokenizer.
//!
//! Converts an expression string into [`Token`]s for the parser, per
//! <https://www.w3.org/TR/xpath-10/#exprlex>.
//!
//! # Disambiguation Rules
//!
//! Section 3.7 rules are applied in a second pass over the raw tokens:
//!
//! - `*` is a multiply operator when the preceding token could end an
//!   operand, and a name test otherwise.
//! - `and`, `or`, `mod` and `div` are operators in the same position.
//! - A name followed by `(` is a function name or node type test.
//! - A name followed by `::` is an axis name.
//!
//! Beyond `XPath` 1.0, a name test may carry an empty prefix (`:local`).
//! It resolves the empty prefix through the namespace context, which is
//! how default-namespace elements are addressed.

use std::fmt;

use super::types::XPathError;
use crate::util::qname::{is_name_char, is_name_start_char};

/// Names that form node type tests when followed by `(`.
const NODE_TYPE_NAMES: &[&str] = &["comment", "text", "processing-instruction", "node"];

/// A token produced by the `XPath` lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `.`
    Dot,
    /// `..`
    DotDot,
    /// `@`
    At,
    /// `,`
    Comma,
    /// `::`
    ColonColon,
    /// `/`
    Slash,
    /// `//`
    DoubleSlash,
    /// `|`
    Pipe,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*` as the multiply operator.
    Star,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEqual,
    /// `and`
    And,
    /// `or`
    Or,
    /// `mod`
    Mod,
    /// `div`
    Div,
    /// A numeric literal.
    Number(f64),
    /// A string literal, quotes removed.
    Literal(String),
    /// A name test: `*`, `prefix:*`, `name`, `prefix:name` or `:name`.
    Name(String),
    /// A `$name` reference; the string excludes `$`.
    VariableReference(String),
    /// A name that appeared before `(`.
    FunctionName(String),
    /// `node`, `text`, `comment` or `processing-instruction` before `(`.
    NodeType(String),
    /// A name that appeared before `::`.
    AxisName(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::LeftBracket => f.write_str("["),
            Self::RightBracket => f.write_str("]"),
            Self::Dot => f.write_str("."),
            Self::DotDot => f.write_str(".."),
            Self::At => f.write_str("@"),
            Self::Comma => f.write_str(","),
            Self::ColonColon => f.write_str("::"),
            Self::Slash => f.write_str("/"),
            Self::DoubleSlash => f.write_str("//"),
            Self::Pipe => f.write_str("|"),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Equal => f.write_str("="),
            Self::NotEqual => f.write_str("!="),
            Self::LessThan => f.write_str("<"),
            Self::LessThanEqual => f.write_str("<="),
            Self::GreaterThan => f.write_str(">"),
            Self::GreaterThanEqual => f.write_str(">="),
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
            Self::Mod => f.write_str("mod"),
            Self::Div => f.write_str("div"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Literal(s) => write!(f, "\"{s}\""),
            Self::Name(name)
            | Self::FunctionName(name)
            | Self::NodeType(name)
            | Self::AxisName(name) => f.write_str(name),
            Self::VariableReference(name) => write!(f, "${name}"),
        }
    }
}

/// Tokenizer over an expression string.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer for `input`.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenizes the whole input and applies the disambiguation rules.
    ///
    /// # Errors
    ///
    /// Returns [`XPathError::Syntax`] for an unexpected character, an
    /// unterminated literal or a malformed number.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, XPathError> {
        let mut raw = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek() else {
                break;
            };
            raw.push(self.next_raw_token(ch)?);
        }
        Ok(disambiguate(raw))
    }

    fn next_raw_token(&mut self, ch: char) -> Result<Token, XPathError> {
        let simple = match ch {
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '[' => Some(Token::LeftBracket),
            ']' => Some(Token::RightBracket),
            '@' => Some(Token::At),
            ',' => Some(Token::Comma),
            '|' => Some(Token::Pipe),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '=' => Some(Token::Equal),
            '*' => Some(Token::Star),
            _ => None,
        };
        if let Some(token) = simple {
            self.bump();
            return Ok(token);
        }

        match ch {
            ':' => self.read_colon(),
            '.' => self.read_dot_or_number(),
            '/' => Ok(self.read_pair('/', Token::DoubleSlash, Token::Slash)),
            '<' => Ok(self.read_pair('=', Token::LessThanEqual, Token::LessThan)),
            '>' => Ok(self.read_pair('=', Token::GreaterThanEqual, Token::GreaterThan)),
            '!' => {
                let start = self.pos;
                self.bump();
                if self.eat('=') {
                    Ok(Token::NotEqual)
                } else {
                    Err(XPathError::syntax(start, "expected '=' after '!'"))
                }
            }
            '"' | '\'' => self.read_string_literal(ch),
            '$' => self.read_variable_reference(),
            '0'..='9' => self.read_number(),
            _ if is_name_start_char(ch) => Ok(Token::Name(self.read_qname())),
            _ => Err(XPathError::syntax(
                self.pos,
                format!("unexpected character '{ch}'"),
            )),
        }
    }

    /// Consumes one char and, if the next one is `second`, that too.
    fn read_pair(&mut self, second: char, both: Token, single: Token) -> Token {
        self.bump();
        if self.eat(second) {
            both
        } else {
            single
        }
    }

    /// Reads `::`, or a `:local` name test with an empty prefix.
    fn read_colon(&mut self) -> Result<Token, XPathError> {
        let start = self.pos;
        self.bump();
        if self.eat(':') {
            return Ok(Token::ColonColon);
        }
        if self.peek().is_some_and(is_name_start_char) {
            self.advance_while(is_name_char);
            return Ok(Token::Name(self.input[start..self.pos].to_owned()));
        }
        Err(XPathError::syntax(start, "expected name or ':' after ':'"))
    }

    fn read_dot_or_number(&mut self) -> Result<Token, XPathError> {
        let start = self.pos;
        self.bump();
        if self.eat('.') {
            return Ok(Token::DotDot);
        }
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance_while(|c| c.is_ascii_digit());
            return self.number_from(start);
        }
        Ok(Token::Dot)
    }

    fn read_number(&mut self) -> Result<Token, XPathError> {
        let start = self.pos;
        self.advance_while(|c| c.is_ascii_digit());
        if self.eat('.') {
            self.advance_while(|c| c.is_ascii_digit());
        }
        self.number_from(start)
    }

    fn number_from(&self, start: usize) -> Result<Token, XPathError> {
        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| XPathError::syntax(start, format!("invalid number literal: {text}")))
    }

    fn read_string_literal(&mut self, quote: char) -> Result<Token, XPathError> {
        let start = self.pos;
        self.bump();
        let content_start = self.pos;
        self.advance_while(|c| c != quote);
        if self.peek().is_none() {
            return Err(XPathError::syntax(start, "unterminated string literal"));
        }
        let content = self.input[content_start..self.pos].to_owned();
        self.bump();
        Ok(Token::Literal(content))
    }

    fn read_variable_reference(&mut self) -> Result<Token, XPathError> {
        let start = self.pos;
        self.bump();
        if !self.peek().is_some_and(is_name_start_char) {
            return Err(XPathError::syntax(start, "expected name after '$'"));
        }
        Ok(Token::VariableReference(self.read_qname()))
    }

    /// Reads `NCName`, `NCName:NCName` or `NCName:*`, stopping before `::`.
    fn read_qname(&mut self) -> String {
        let start = self.pos;
        self.advance_while(is_name_char);
        if self.peek() == Some(':') {
            let after = self.input[self.pos + 1..].chars().next();
            match after {
                Some(c) if is_name_start_char(c) => {
                    self.bump();
                    self.advance_while(is_name_char);
                }
                Some('*') => {
                    self.bump();
                    self.bump();
                }
                _ => {}
            }
        }
        self.input[start..self.pos].to_owned()
    }

    // --- Utility methods ---

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn advance_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        self.advance_while(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    }
}

/// Applies the section 3.7 disambiguation rules to raw tokens.
fn disambiguate(raw: Vec<Token>) -> Vec<Token> {
    let mut result: Vec<Token> = Vec::with_capacity(raw.len());
    let mut iter = raw.into_iter().peekable();

    while let Some(token) = iter.next() {
        let after_operand = result.last().is_some_and(is_operand_ending);
        let next = iter.peek();
        let token = match token {
            Token::Star if !after_operand => Token::Name("*".to_owned()),
            Token::Name(name) if after_operand => match name.as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "mod" => Token::Mod,
                "div" => Token::Div,
                _ => Token::Name(name),
            },
            Token::Name(name) if matches!(next, Some(Token::LeftParen)) => {
                if NODE_TYPE_NAMES.contains(&name.as_str()) {
                    Token::NodeType(name)
                } else {
                    Token::FunctionName(name)
                }
            }
            Token::Name(name) if matches!(next, Some(Token::ColonColon)) => Token::AxisName(name),
            other => other,
        };
        result.push(token);
    }
    result
}

/// Returns `true` if `token` can end an operand, which makes a following
/// `*` or operator name an operator.
fn is_operand_ending(token: &Token) -> bool {
    matches!(
        token,
        Token::RightParen
            | Token::RightBracket
            | Token::Dot
            | Token::DotDot
            | Token::Number(_)
            | Token::Literal(_)
            | Token::Name(_)
            | Token::VariableReference(_)
    )
}
