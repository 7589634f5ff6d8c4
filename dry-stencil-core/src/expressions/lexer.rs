// MIT License
//
// Copyright (c) 2024 Jerome Johnson
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Trie-driven expression lexer
//!
//! Conditions are lexed straight from the byte source they live in, which is
//! either a standalone string or the live processor buffer. Both are reached
//! through [`Scanner`], so the lexer never needs the whole condition in memory
//! before it knows where the condition ends.
//!
//! Trie indices are laid out as:
//! - `0..symbols`: the evaluator's reserved tokens
//! - `symbols..symbols + variables`: raw variable names
//! - the rest: configured terminators

use std::io;

use crate::{
    encoding::Encoding,
    error::{ExpressionEvaluationError, Result},
    processor::{encoding_config::EncodingConfig, state::ProcessorState},
    trie::SimpleTrie,
};

/// Byte source a condition is read from
pub trait Scanner {
    /// Longest token of `trie` at the cursor, as token id and length
    fn peek_token(&mut self, trie: &SimpleTrie) -> io::Result<Option<(usize, usize)>>;

    fn peek_byte(&mut self, offset: usize) -> io::Result<Option<u8>>;

    fn advance(&mut self, count: usize) -> io::Result<()>;
}

impl Scanner for ProcessorState<'_> {
    fn peek_token(&mut self, trie: &SimpleTrie) -> io::Result<Option<(usize, usize)>> {
        ProcessorState::peek_token(self, trie)
    }

    fn peek_byte(&mut self, offset: usize) -> io::Result<Option<u8>> {
        ProcessorState::peek_byte(self, offset)
    }

    fn advance(&mut self, count: usize) -> io::Result<()> {
        ProcessorState::advance(self, count)
    }
}

/// Scanner over an in-memory condition
pub struct SliceScanner<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> SliceScanner<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl Scanner for SliceScanner<'_> {
    fn peek_token(&mut self, trie: &SimpleTrie) -> io::Result<Option<(usize, usize)>> {
        let mut cursor = self.position;
        Ok(trie
            .get_operation(self.bytes, self.bytes.len(), &mut cursor)
            .map(|index| (index, cursor - self.position)))
    }

    fn peek_byte(&mut self, offset: usize) -> io::Result<Option<u8>> {
        Ok(self.bytes.get(self.position + offset).copied())
    }

    fn advance(&mut self, count: usize) -> io::Result<()> {
        self.position = (self.position + count).min(self.bytes.len());
        Ok(())
    }
}

/// How a reserved token takes part in lexing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Emitted as a symbol
    Operator,
    /// Ends the current literal and is dropped
    Separator,
    /// Opens a quoted literal closed by the same token
    Quote,
    /// Ends the condition and stays in the source
    LineEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lexeme {
    /// A reserved operator, by its position in the symbol table
    Symbol(usize),
    /// A variable, by its index in the variable table
    Reference(usize),
    /// Bare text between separators and symbols
    Literal(String),
    /// Text between quotes, without the quotes
    Quoted(String),
}

enum Class {
    Symbol(usize, Role),
    Reference(usize),
    Terminator,
}

/// Token table of one evaluator in one encoding
#[derive(Debug, Clone)]
pub struct Lexicon {
    trie: SimpleTrie,
    roles: Vec<Role>,
    names: Vec<String>,
    encoding: Encoding,
}

impl Lexicon {
    pub fn new(symbols: &[(&str, Role)], config: &EncodingConfig, terminators: &[String]) -> Self {
        let mut trie = SimpleTrie::new();
        for (index, (text, _)) in symbols.iter().enumerate() {
            trie.add_token(&config.encode(text), index);
        }
        let variables = config.variables();
        for (index, slot) in variables.iter().enumerate() {
            trie.add_token(&slot.key, symbols.len() + index);
        }
        for (index, terminator) in terminators.iter().enumerate() {
            trie.add_token(&config.encode(terminator), symbols.len() + variables.len() + index);
        }
        Self {
            trie,
            roles: symbols.iter().map(|(_, role)| *role).collect(),
            names: variables.iter().map(|slot| slot.name.clone()).collect(),
            encoding: config.encoding(),
        }
    }

    /// Index of the variable called `name`
    pub fn reference_named(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn classify(&self, index: usize) -> Class {
        if let Some(role) = self.roles.get(index) {
            Class::Symbol(index, *role)
        } else if index < self.roles.len() + self.names.len() {
            Class::Reference(index - self.roles.len())
        } else {
            Class::Terminator
        }
    }

    /// Lexes one condition, stopping at a line ending, a terminator or the end of input
    ///
    /// A terminator is consumed, a line ending is not. A variable name only counts
    /// as a reference when it is a whole word.
    pub fn tokenize(&self, scanner: &mut dyn Scanner) -> Result<Vec<Lexeme>> {
        let mut lexemes = Vec::new();
        let mut literal = Vec::new();
        loop {
            let Some((index, len)) = scanner.peek_token(&self.trie)? else {
                if self.take(scanner, self.encoding.unit_width(), &mut literal)? {
                    continue;
                }
                break;
            };
            match self.classify(index) {
                Class::Reference(variable) => {
                    if literal.is_empty() && !self.word_follows(scanner, len)? {
                        scanner.advance(len)?;
                        lexemes.push(Lexeme::Reference(variable));
                    } else {
                        self.take(scanner, len, &mut literal)?;
                    }
                }
                Class::Terminator => {
                    scanner.advance(len)?;
                    break;
                }
                Class::Symbol(_, Role::LineEnd) => break,
                Class::Symbol(_, Role::Separator) => {
                    self.flush(&mut literal, &mut lexemes);
                    scanner.advance(len)?;
                }
                Class::Symbol(quote, Role::Quote) => {
                    self.flush(&mut literal, &mut lexemes);
                    scanner.advance(len)?;
                    lexemes.push(Lexeme::Quoted(self.quoted(scanner, quote)?));
                }
                Class::Symbol(symbol, Role::Operator) => {
                    self.flush(&mut literal, &mut lexemes);
                    scanner.advance(len)?;
                    lexemes.push(Lexeme::Symbol(symbol));
                }
            }
        }
        self.flush(&mut literal, &mut lexemes);
        Ok(lexemes)
    }

    /// Moves up to `count` bytes into `literal`, returning whether any were left
    fn take(&self, scanner: &mut dyn Scanner, count: usize, literal: &mut Vec<u8>) -> Result<bool> {
        let mut taken = 0;
        while taken < count {
            match scanner.peek_byte(taken)? {
                Some(byte) => literal.push(byte),
                None => break,
            }
            taken += 1;
        }
        scanner.advance(taken)?;
        Ok(taken > 0)
    }

    fn word_follows(&self, scanner: &mut dyn Scanner, offset: usize) -> Result<bool> {
        let mut unit = Vec::with_capacity(self.encoding.unit_width());
        for i in 0..self.encoding.unit_width() {
            match scanner.peek_byte(offset + i)? {
                Some(byte) => unit.push(byte),
                None => return Ok(false),
            }
        }
        Ok(self.encoding.code_unit(&unit).is_some_and(|code| {
            code >= 0x80 || char::from_u32(code).is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        }))
    }

    fn quoted(&self, scanner: &mut dyn Scanner, quote: usize) -> Result<String> {
        let mut text = Vec::new();
        loop {
            match scanner.peek_token(&self.trie)? {
                Some((index, len)) if index == quote => {
                    scanner.advance(len)?;
                    return Ok(self.encoding.decode(&text));
                }
                Some((index, _)) if self.roles.get(index) == Some(&Role::LineEnd) => break,
                _ => {}
            }
            if !self.take(scanner, self.encoding.unit_width(), &mut text)? {
                break;
            }
        }
        let text = self.encoding.decode(&text);
        Err(ExpressionEvaluationError::syntax("unterminated quoted literal", &text).into())
    }

    fn flush(&self, literal: &mut Vec<u8>, lexemes: &mut Vec<Lexeme>) {
        if !literal.is_empty() {
            lexemes.push(Lexeme::Literal(self.encoding.decode(literal)));
            literal.clear();
        }
    }
}
