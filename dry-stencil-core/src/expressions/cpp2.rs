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

//! `C++2` evaluator
//!
//! A C-conformant vocabulary expressed as an [`OperatorSet`], adding arithmetic
//! and unary minus to the logical, comparison and bitwise operators. Literals can
//! be quoted with `"` or `'`, and quoted text naming a variable evaluates to that
//! variable.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    convert::Converter,
    error::Result,
    expressions::{
        builder::{BinaryOperator, OperatorSet, UnaryOperator},
        lexer::{Lexicon, Scanner},
        operators,
        tree::BinaryFn,
    },
    processor::encoding_config::EncodingConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cpp2Token {
    Or,
    Xor,
    And,
    BitwiseOr,
    BitwiseAnd,
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LeftShift,
    RightShift,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    OpenParen,
    CloseParen,
    Space,
    Tab,
    WindowsEol,
    UnixEol,
    LegacyMacEol,
    DoubleQuote,
    SingleQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cpp2Operator {
    Or,
    Xor,
    And,
    BitwiseOr,
    BitwiseAnd,
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LeftShift,
    RightShift,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Not,
    Negate,
}

impl Cpp2Operator {
    fn level(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::Xor => 2,
            Self::And => 3,
            Self::BitwiseOr => 4,
            Self::BitwiseAnd => 5,
            Self::EqualTo | Self::NotEqualTo => 6,
            Self::LessThan | Self::LessThanOrEqualTo | Self::GreaterThan | Self::GreaterThanOrEqualTo => 7,
            Self::LeftShift | Self::RightShift => 8,
            Self::Add | Self::Subtract => 9,
            Self::Multiply | Self::Divide | Self::Remainder => 10,
            Self::Not | Self::Negate => 11,
        }
    }
}

fn precedes<const LEVEL: u8>(other: Cpp2Operator) -> bool {
    other.level() < LEVEL
}

const SYMBOLS: [(Cpp2Token, &str); 28] = [
    (Cpp2Token::Or, "||"),
    (Cpp2Token::Xor, "^"),
    (Cpp2Token::And, "&&"),
    (Cpp2Token::BitwiseOr, "|"),
    (Cpp2Token::BitwiseAnd, "&"),
    (Cpp2Token::EqualTo, "=="),
    (Cpp2Token::NotEqualTo, "!="),
    (Cpp2Token::LessThan, "<"),
    (Cpp2Token::LessThanOrEqualTo, "<="),
    (Cpp2Token::GreaterThan, ">"),
    (Cpp2Token::GreaterThanOrEqualTo, ">="),
    (Cpp2Token::LeftShift, "<<"),
    (Cpp2Token::RightShift, ">>"),
    (Cpp2Token::Plus, "+"),
    (Cpp2Token::Minus, "-"),
    (Cpp2Token::Star, "*"),
    (Cpp2Token::Slash, "/"),
    (Cpp2Token::Percent, "%"),
    (Cpp2Token::Bang, "!"),
    (Cpp2Token::OpenParen, "("),
    (Cpp2Token::CloseParen, ")"),
    (Cpp2Token::Space, " "),
    (Cpp2Token::Tab, "\t"),
    (Cpp2Token::WindowsEol, "\r\n"),
    (Cpp2Token::UnixEol, "\n"),
    (Cpp2Token::LegacyMacEol, "\r"),
    (Cpp2Token::DoubleQuote, "\""),
    (Cpp2Token::SingleQuote, "'"),
];

fn binary_operator(
    operator: Cpp2Operator,
    precedes: fn(Cpp2Operator) -> bool,
    evaluate: BinaryFn,
) -> BinaryOperator<Cpp2Operator> {
    BinaryOperator {
        operator,
        precedes,
        evaluate,
    }
}

/// The `C++2` vocabulary
pub fn operator_set() -> OperatorSet<Cpp2Operator, Cpp2Token> {
    use Cpp2Operator as Op;
    use Cpp2Token as Tok;

    let binary = HashMap::from([
        (Tok::Or, binary_operator(Op::Or, precedes::<1>, operators::or)),
        (Tok::Xor, binary_operator(Op::Xor, precedes::<2>, operators::xor)),
        (Tok::And, binary_operator(Op::And, precedes::<3>, operators::and)),
        (Tok::BitwiseOr, binary_operator(Op::BitwiseOr, precedes::<4>, operators::bitwise_or)),
        (Tok::BitwiseAnd, binary_operator(Op::BitwiseAnd, precedes::<5>, operators::bitwise_and)),
        (Tok::EqualTo, binary_operator(Op::EqualTo, precedes::<6>, operators::equal_to)),
        (Tok::NotEqualTo, binary_operator(Op::NotEqualTo, precedes::<6>, operators::not_equal_to)),
        (Tok::LessThan, binary_operator(Op::LessThan, precedes::<7>, operators::less_than)),
        (Tok::LessThanOrEqualTo, binary_operator(Op::LessThanOrEqualTo, precedes::<7>, operators::less_than_or_equal_to)),
        (Tok::GreaterThan, binary_operator(Op::GreaterThan, precedes::<7>, operators::greater_than)),
        (
            Tok::GreaterThanOrEqualTo,
            binary_operator(Op::GreaterThanOrEqualTo, precedes::<7>, operators::greater_than_or_equal_to),
        ),
        (Tok::LeftShift, binary_operator(Op::LeftShift, precedes::<8>, operators::left_shift)),
        (Tok::RightShift, binary_operator(Op::RightShift, precedes::<8>, operators::right_shift)),
        (Tok::Plus, binary_operator(Op::Add, precedes::<9>, operators::add)),
        (Tok::Minus, binary_operator(Op::Subtract, precedes::<9>, operators::subtract)),
        (Tok::Star, binary_operator(Op::Multiply, precedes::<10>, operators::multiply)),
        (Tok::Slash, binary_operator(Op::Divide, precedes::<10>, operators::divide)),
        (Tok::Percent, binary_operator(Op::Remainder, precedes::<10>, operators::remainder)),
    ]);
    let unary = HashMap::from([
        (
            Tok::Bang,
            UnaryOperator {
                operator: Op::Not,
                evaluate: operators::not,
            },
        ),
        (
            Tok::Minus,
            UnaryOperator {
                operator: Op::Negate,
                evaluate: operators::negate,
            },
        ),
    ]);
    OperatorSet {
        symbols: SYMBOLS.to_vec(),
        binary,
        unary,
        open_group: Tok::OpenParen,
        close_group: Tok::CloseParen,
        terminators: HashSet::from([Tok::WindowsEol, Tok::UnixEol, Tok::LegacyMacEol]),
        no_ops: HashSet::from([Tok::Space, Tok::Tab]),
        literal_sequence_bounds: HashSet::from([Tok::DoubleQuote, Tok::SingleQuote]),
        dereference_in_literals: true,
    }
}

/// The `C++2` evaluator bound to one encoding and variable table
#[derive(Debug, Clone)]
pub struct Cpp2Evaluator {
    operators: OperatorSet<Cpp2Operator, Cpp2Token>,
    lexicon: Lexicon,
    config: Arc<EncodingConfig>,
    converter: Arc<Converter>,
}

impl Cpp2Evaluator {
    pub fn new(config: &Arc<EncodingConfig>, converter: &Arc<Converter>, terminators: &[String]) -> Self {
        let operators = operator_set();
        Self {
            lexicon: operators.lexicon(config, terminators),
            operators,
            config: Arc::clone(config),
            converter: Arc::clone(converter),
        }
    }

    /// Reads one condition from `scanner` and evaluates it; an empty condition is false
    pub fn evaluate(&self, scanner: &mut dyn Scanner) -> Result<bool> {
        let lexemes = self.lexicon.tokenize(scanner)?;
        let tree = self.operators.build(&lexemes, &self.lexicon)?;
        if tree.is_empty() {
            return Ok(false);
        }
        let value = tree.evaluate(&self.converter, &|index| self.config.resolve(index))?;
        Ok(self.converter.to_bool(&value)?)
    }
}
