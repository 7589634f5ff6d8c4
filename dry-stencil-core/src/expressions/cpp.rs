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

//! C-style condition evaluator
//!
//! Conditions such as `(OS == "linux" || DEBUG) && !LEGACY` are lexed against
//! a fixed table of 22 reserved tokens plus the visible variable names, then built
//! into a tree in a single left-to-right pass. Each binary operator is grafted
//! above the highest ancestor of the current operand that binds at least as
//! tightly, which gives left associativity within a precedence level.
//!
//! Precedence, loosest first:
//!
//! | level | operators |
//! |-------|-----------|
//! | 1 | `\|\|` |
//! | 2 | `^` |
//! | 3 | `&&` `&` `\|` `<<` `>>` |
//! | 4 | `==` `!=` |
//! | 5 | `>` `>=` `<` `<=` |
//! | 6 | unary `!` |

use std::sync::Arc;

use crate::{
    convert::Converter,
    error::{ExpressionEvaluationError, Result},
    expressions::{
        lexer::{Lexeme, Lexicon, Role, Scanner},
        operators,
        tree::{BinaryFn, NodeId, NodeKind, Operand, Tree},
    },
    processor::encoding_config::EncodingConfig,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CppToken {
    And,
    Or,
    Xor,
    Not,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    EqualTo,
    NotEqualTo,
    BitwiseAnd,
    BitwiseOr,
    LeftShift,
    RightShift,
    OpenBrace,
    CloseBrace,
    Space,
    Tab,
    WindowsEol,
    UnixEol,
    LegacyMacEol,
    Quote,
}

const TOKENS: [(CppToken, &str, Role); 22] = [
    (CppToken::And, "&&", Role::Operator),
    (CppToken::Or, "||", Role::Operator),
    (CppToken::Xor, "^", Role::Operator),
    (CppToken::Not, "!", Role::Operator),
    (CppToken::GreaterThan, ">", Role::Operator),
    (CppToken::GreaterThanOrEqualTo, ">=", Role::Operator),
    (CppToken::LessThan, "<", Role::Operator),
    (CppToken::LessThanOrEqualTo, "<=", Role::Operator),
    (CppToken::EqualTo, "==", Role::Operator),
    (CppToken::NotEqualTo, "!=", Role::Operator),
    (CppToken::BitwiseAnd, "&", Role::Operator),
    (CppToken::BitwiseOr, "|", Role::Operator),
    (CppToken::LeftShift, "<<", Role::Operator),
    (CppToken::RightShift, ">>", Role::Operator),
    (CppToken::OpenBrace, "(", Role::Operator),
    (CppToken::CloseBrace, ")", Role::Operator),
    (CppToken::Space, " ", Role::Separator),
    (CppToken::Tab, "\t", Role::Separator),
    (CppToken::WindowsEol, "\r\n", Role::LineEnd),
    (CppToken::UnixEol, "\n", Role::LineEnd),
    (CppToken::LegacyMacEol, "\r", Role::LineEnd),
    (CppToken::Quote, "\"", Role::Quote),
];

impl CppToken {
    fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::Xor => 2,
            Self::And | Self::BitwiseAnd | Self::BitwiseOr | Self::LeftShift | Self::RightShift => 3,
            Self::EqualTo | Self::NotEqualTo => 4,
            Self::GreaterThan | Self::GreaterThanOrEqualTo | Self::LessThan | Self::LessThanOrEqualTo => 5,
            Self::Not => 6,
            _ => 0,
        }
    }

    fn binary(self) -> Option<BinaryFn> {
        Some(match self {
            Self::And => operators::and,
            Self::Or => operators::or,
            Self::Xor => operators::xor,
            Self::GreaterThan => operators::greater_than,
            Self::GreaterThanOrEqualTo => operators::greater_than_or_equal_to,
            Self::LessThan => operators::less_than,
            Self::LessThanOrEqualTo => operators::less_than_or_equal_to,
            Self::EqualTo => operators::equal_to,
            Self::NotEqualTo => operators::not_equal_to,
            Self::BitwiseAnd => operators::bitwise_and,
            Self::BitwiseOr => operators::bitwise_or,
            Self::LeftShift => operators::left_shift,
            Self::RightShift => operators::right_shift,
            _ => return None,
        })
    }

    fn text(self) -> &'static str {
        TOKENS.iter().find(|(token, ..)| *token == self).map_or("", |(_, text, _)| text)
    }
}

/// The `C++` evaluator bound to one encoding and variable table
#[derive(Debug, Clone)]
pub struct CppEvaluator {
    lexicon: Lexicon,
    config: Arc<EncodingConfig>,
    converter: Arc<Converter>,
}

impl CppEvaluator {
    pub fn new(config: &Arc<EncodingConfig>, converter: &Arc<Converter>, terminators: &[String]) -> Self {
        let symbols: Vec<(&str, Role)> = TOKENS.iter().map(|(_, text, role)| (*text, *role)).collect();
        Self {
            lexicon: Lexicon::new(&symbols, config, terminators),
            config: Arc::clone(config),
            converter: Arc::clone(converter),
        }
    }

    /// Reads one condition from `scanner` and evaluates it; an empty condition is false
    pub fn evaluate(&self, scanner: &mut dyn Scanner) -> Result<bool> {
        let lexemes = self.lexicon.tokenize(scanner)?;
        let tree = build(&lexemes)?;
        if tree.is_empty() {
            return Ok(false);
        }
        let value = tree.evaluate(&self.converter, &|index| self.config.resolve(index))?;
        Ok(self.converter.to_bool(&value)?)
    }
}

fn describe(lexeme: &Lexeme) -> String {
    match lexeme {
        Lexeme::Symbol(index) => TOKENS[*index].0.text().to_string(),
        Lexeme::Reference(index) => format!("variable #{}", index),
        Lexeme::Literal(text) => text.clone(),
        Lexeme::Quoted(text) => format!("\"{}\"", text),
    }
}

/// Builds the expression tree of one condition
fn build(lexemes: &[Lexeme]) -> std::result::Result<Tree<CppToken>, ExpressionEvaluationError> {
    let mut tree = Tree::new();
    let mut current: Option<NodeId> = None;
    let mut expect_operand = true;
    let mut groups = Vec::new();

    for lexeme in lexemes {
        let near = describe(lexeme);
        let operand = match lexeme {
            Lexeme::Reference(index) => Some(Operand::Reference(*index)),
            Lexeme::Literal(text) => Some(Operand::Literal(Value::parse_literal(text))),
            Lexeme::Quoted(text) => Some(Operand::Literal(Value::String(text.clone()))),
            Lexeme::Symbol(_) => None,
        };
        if let Some(operand) = operand {
            if !expect_operand {
                return Err(ExpressionEvaluationError::syntax("expected an operator", &near));
            }
            let leaf = tree.push(NodeKind::Leaf(operand));
            if !tree.attach(current, leaf) {
                return Err(ExpressionEvaluationError::syntax("unexpected operand", &near));
            }
            current = Some(leaf);
            expect_operand = false;
            continue;
        }
        let Lexeme::Symbol(index) = lexeme else { continue };
        match TOKENS[*index].0 {
            CppToken::OpenBrace => {
                if !expect_operand {
                    return Err(ExpressionEvaluationError::syntax("expected an operator", &near));
                }
                let group = tree.push(NodeKind::Group {
                    inner: None,
                    closed: false,
                });
                tree.attach(current, group);
                groups.push(group);
                current = Some(group);
            }
            CppToken::CloseBrace => {
                if expect_operand {
                    return Err(ExpressionEvaluationError::syntax("expected an operand", &near));
                }
                let group = groups
                    .pop()
                    .ok_or_else(|| ExpressionEvaluationError::syntax("unbalanced parenthesis", &near))?;
                tree.close_group(group);
                current = Some(group);
            }
            CppToken::Not => {
                if !expect_operand {
                    return Err(ExpressionEvaluationError::syntax("expected an operator", &near));
                }
                let node = tree.push(NodeKind::Unary {
                    operator: CppToken::Not,
                    evaluate: operators::not,
                    operand: None,
                });
                tree.attach(current, node);
                current = Some(node);
            }
            token => {
                let (Some(evaluate), Some(operand), false) = (token.binary(), current, expect_operand) else {
                    return Err(ExpressionEvaluationError::syntax("expected an operand", &near));
                };
                let target = combine_expression_operator(&tree, operand, token);
                let node = tree.push(NodeKind::Binary {
                    operator: token,
                    evaluate,
                    left: None,
                    right: None,
                });
                tree.inject_above(target, node);
                current = Some(node);
                expect_operand = true;
            }
        }
    }

    if !groups.is_empty() {
        return Err(ExpressionEvaluationError::syntax("unclosed parenthesis", "("));
    }
    if expect_operand && !tree.is_empty() {
        let near = lexemes.last().map(describe).unwrap_or_default();
        return Err(ExpressionEvaluationError::syntax("expression ends without an operand", &near));
    }
    Ok(tree)
}

/// Finds the node a new binary operator takes as its left operand
///
/// Climbs from the last complete operand past every ancestor binding at least as
/// tightly as `token`, stopping at an open group.
fn combine_expression_operator(tree: &Tree<CppToken>, operand: NodeId, token: CppToken) -> NodeId {
    let mut target = operand;
    while let Some(parent) = tree.parent(target) {
        if tree.is_open_group(parent) {
            break;
        }
        match tree.operator(parent) {
            Some(op) if op.precedence() >= token.precedence() => target = parent,
            _ => break,
        }
    }
    target
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{encoding::Encoding, expressions::lexer::SliceScanner, variables::VariableCollection};

    fn evaluator(terminators: &[&str]) -> CppEvaluator {
        let vars: VariableCollection = [
            ("DEBUG", Value::from(true)),
            ("OS", Value::from("Linux")),
            ("LEVEL", Value::from(3)),
            ("EMPTY", Value::Null),
        ]
        .into_iter()
        .collect();
        let config = Arc::new(EncodingConfig::new(Encoding::Utf8, &Arc::new(vars), "{0}"));
        let terminators: Vec<String> = terminators.iter().map(|t| t.to_string()).collect();
        CppEvaluator::new(&config, &Arc::new(Converter::default()), &terminators)
    }

    fn eval(condition: &str) -> Result<bool> {
        evaluator(&[]).evaluate(&mut SliceScanner::new(condition.as_bytes()))
    }

    #[rstest]
    #[case("true", true)]
    #[case("true || false && false", true)]
    #[case("false && true || true", true)]
    #[case("1 < 2 == true", true)]
    #[case("\"Foo\" == \"foo\"", true)]
    #[case("\"Foo\" != \"foo\"", false)]
    #[case("!false", true)]
    #[case("!(true && false)", true)]
    #[case("!true == false", true)]
    #[case("(1 | 2) == 3", true)]
    #[case("(1 << 3) == 8", true)]
    #[case("true ^ true", false)]
    #[case("true ^ false || false", true)]
    #[case("0x10 == 16", true)]
    #[case("2.5 > 2", true)]
    #[case("((true))", true)]
    fn evaluates_literals(#[case] condition: &str, #[case] expected: bool) {
        assert_eq!(eval(condition).unwrap(), expected, "{}", condition);
    }

    #[rstest]
    #[case("DEBUG", true)]
    #[case("OS == \"linux\"", true)]
    #[case("LEVEL >= 3 && DEBUG", true)]
    #[case("LEVEL > 3 || !DEBUG", false)]
    #[case("EMPTY", false)]
    #[case("!EMPTY", true)]
    #[case("UNDEFINED", false)]
    #[case("DEBUGGING", false)]
    fn resolves_variables(#[case] condition: &str, #[case] expected: bool) {
        assert_eq!(eval(condition).unwrap(), expected, "{}", condition);
    }

    #[test]
    fn empty_condition_is_false() {
        assert!(!eval("   ").unwrap());
    }

    #[test]
    fn does_not_short_circuit() {
        let err = eval("true || \"maybe\"").unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Expression(ExpressionEvaluationError::Conversion { .. })
        ));
    }

    #[rstest]
    #[case("true &&")]
    #[case("&& true")]
    #[case("(true")]
    #[case("true)")]
    #[case("true false")]
    #[case("()")]
    fn rejects_malformed_conditions(#[case] condition: &str) {
        let err = eval(condition).unwrap_err();
        assert!(
            matches!(err, crate::error::Error::Expression(ExpressionEvaluationError::Syntax { .. })),
            "{}",
            condition
        );
    }

    #[test]
    fn stops_at_terminator() {
        let mut scanner = SliceScanner::new(b"DEBUG}}rest");
        assert!(evaluator(&["}}"]).evaluate(&mut scanner).unwrap());
        assert_eq!(scanner.position(), 7);
    }

    #[test]
    fn tree_shape_follows_precedence() {
        let lexemes = vec![
            Lexeme::Literal("a".into()),
            Lexeme::Symbol(1),
            Lexeme::Literal("b".into()),
            Lexeme::Symbol(0),
            Lexeme::Literal("c".into()),
        ];
        let tree = build(&lexemes).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(tree.operator(root), Some(CppToken::Or));
    }
}
