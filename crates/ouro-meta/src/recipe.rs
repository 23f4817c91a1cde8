//! The recipe expression language used in meta-grammar action bodies.
//!
//! A recipe is a tiny constructor expression: `Seq(head, Commit(tail))`,
//! `Literal(unquote(lit))`, `true`, `*`. The engine never sees this syntax;
//! hosts parse the opaque body with [`parse`] and decide what each name
//! means.

use std::fmt::Display;

use ouro::RcString;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Recipe {
    /// `Name(arg, ...)`
    Call { name: RcString, args: Vec<Recipe> },
    /// A capture name looked up in the action scope.
    Binding(RcString),
    /// `*`: the input slice the transform matched.
    Slice,
    /// A quoted string, escapes resolved.
    Text(RcString),
    /// `true` / `false`.
    Flag(bool),
    /// A bare unsigned integer.
    Number(u32),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RecipeError {
    pub at: usize,
    pub message: String,
}

impl RecipeError {
    fn new(at: usize, message: impl Into<String>) -> RecipeError {
        RecipeError {
            at,
            message: message.into(),
        }
    }
}

impl Display for RecipeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bad recipe at offset {}: {}", self.at, self.message)
    }
}

struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Lexer<'a> {
        Lexer {
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<u8> {
        let byte = self.peek();
        if byte.is_some() {
            self.pos += 1;
        }
        byte
    }

    fn consume(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_spaces(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn word(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') = self.peek() {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos]).unwrap()
    }
}

pub fn parse(body: &str) -> Result<Recipe, RecipeError> {
    let mut lexer = Lexer::new(body);
    let recipe = expression(&mut lexer)?;
    lexer.skip_spaces();
    if lexer.peek().is_some() {
        return Err(RecipeError::new(lexer.pos, "trailing input"));
    }
    Ok(recipe)
}

fn expression(l: &mut Lexer) -> Result<Recipe, RecipeError> {
    l.skip_spaces();
    match l.peek() {
        Some(b'*') => {
            l.next();
            Ok(Recipe::Slice)
        }
        Some(quote @ (b'\'' | b'"')) => {
            l.next();
            string(l, quote)
        }
        Some(b'0'..=b'9') => {
            let word = l.word();
            word.parse()
                .map(Recipe::Number)
                .map_err(|_| RecipeError::new(l.pos, format!("bad number `{word}`")))
        }
        Some(b'a'..=b'z' | b'A'..=b'Z' | b'_') => {
            let word = l.word();
            l.skip_spaces();
            if l.consume(b'(') {
                let args = arguments(l)?;
                Ok(Recipe::Call {
                    name: word.into(),
                    args,
                })
            } else {
                match word {
                    "true" => Ok(Recipe::Flag(true)),
                    "false" => Ok(Recipe::Flag(false)),
                    _ => Ok(Recipe::Binding(word.into())),
                }
            }
        }
        Some(byte) => Err(RecipeError::new(
            l.pos,
            format!("unexpected byte `{}`", std::ascii::escape_default(byte)),
        )),
        None => Err(RecipeError::new(l.pos, "expected an expression")),
    }
}

fn arguments(l: &mut Lexer) -> Result<Vec<Recipe>, RecipeError> {
    let mut args = Vec::new();
    l.skip_spaces();
    if l.consume(b')') {
        return Ok(args);
    }
    loop {
        args.push(expression(l)?);
        l.skip_spaces();
        if l.consume(b')') {
            return Ok(args);
        }
        if !l.consume(b',') {
            return Err(RecipeError::new(l.pos, "expected `,` or `)`"));
        }
    }
}

fn string(l: &mut Lexer, quote: u8) -> Result<Recipe, RecipeError> {
    let mut text = String::new();
    loop {
        match l.next() {
            Some(b) if b == quote => return Ok(Recipe::Text(text.into())),
            Some(b'\\') => match l.next() {
                Some(b'n') => text.push('\n'),
                Some(b'r') => text.push('\r'),
                Some(b't') => text.push('\t'),
                Some(b'\\') => text.push('\\'),
                Some(b'\'') => text.push('\''),
                Some(b'"') => text.push('"'),
                other => {
                    return Err(RecipeError::new(
                        l.pos,
                        match other {
                            Some(b) => {
                                format!("unknown escape `\\{}`", std::ascii::escape_default(b))
                            }
                            None => "unterminated string".to_string(),
                        },
                    ))
                }
            },
            Some(byte) => {
                // multi-byte characters pass through untouched
                if byte.is_ascii() {
                    text.push(byte as char);
                } else {
                    let start = l.pos - 1;
                    let len = utf8_len(byte);
                    let slice = l.bytes.get(start..start + len).and_then(|s| {
                        std::str::from_utf8(s).ok()
                    });
                    match slice {
                        Some(s) => {
                            text.push_str(s);
                            l.pos = start + len;
                        }
                        None => return Err(RecipeError::new(start, "malformed utf-8")),
                    }
                }
            }
            None => return Err(RecipeError::new(l.pos, "unterminated string")),
        }
    }
}

fn utf8_len(first: u8) -> usize {
    match first {
        0b1100_0000..=0b1101_1111 => 2,
        0b1110_0000..=0b1110_1111 => 3,
        _ => 4,
    }
}
