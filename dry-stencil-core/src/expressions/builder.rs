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

//! Generic operator-precedence tree builder
//!
//! An [`OperatorSet`] describes a symbolic vocabulary: which tokens are binary or
//! unary operators, which open and close groups, which are dropped, which bound
//! quoted literals and which end an expression. The builder turns lexemes into a
//! [`Tree`] with two splicing rules and no backtracking:
//!
//! 1. when the active node is a binary operator the new operator precedes, the
//!    new node steals its right operand;
//! 2. otherwise the new node is injected above the active node, after climbing
//!    past every ancestor the new operator does not precede.
//!
//! The active node is the container an operand was last attached to, or the
//! operand itself when it was attached to a group or became the root.

use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

use crate::{
    error::ExpressionEvaluationError,
    expressions::{
        lexer::{Lexeme, Lexicon, Role},
        tree::{BinaryFn, NodeId, NodeKind, Operand, Tree, UnaryFn},
    },
    processor::encoding_config::EncodingConfig,
    value::Value,
};

#[derive(Debug, Clone, Copy)]
pub struct BinaryOperator<O> {
    pub operator: O,
    /// Whether this operator binds tighter than the given one
    pub precedes: fn(O) -> bool,
    pub evaluate: BinaryFn,
}

#[derive(Debug, Clone, Copy)]
pub struct UnaryOperator<O> {
    pub operator: O,
    pub evaluate: UnaryFn,
}

/// Vocabulary driving the builder
///
/// `O` is the operator tag stored in tree nodes, `T` the token kind produced by
/// lexing. Bare text between tokens becomes a literal operand.
#[derive(Debug, Clone)]
pub struct OperatorSet<O, T> {
    /// Every reserved token with its text
    pub symbols: Vec<(T, &'static str)>,
    pub binary: HashMap<T, BinaryOperator<O>>,
    pub unary: HashMap<T, UnaryOperator<O>>,
    pub open_group: T,
    pub close_group: T,
    pub terminators: HashSet<T>,
    pub no_ops: HashSet<T>,
    pub literal_sequence_bounds: HashSet<T>,
    /// Quoted text naming a variable evaluates to the variable
    pub dereference_in_literals: bool,
}

struct Builder<O> {
    tree: Tree<O>,
    active: Option<NodeId>,
    expect_operand: bool,
    groups: Vec<NodeId>,
}

impl<O: Copy, T: Copy + Eq + Hash> OperatorSet<O, T> {
    /// Token table for lexing this vocabulary in one encoding
    pub fn lexicon(&self, config: &EncodingConfig, terminators: &[String]) -> Lexicon {
        let symbols: Vec<(&str, Role)> = self
            .symbols
            .iter()
            .map(|(token, text)| {
                let role = if self.terminators.contains(token) {
                    Role::LineEnd
                } else if self.no_ops.contains(token) {
                    Role::Separator
                } else if self.literal_sequence_bounds.contains(token) {
                    Role::Quote
                } else {
                    Role::Operator
                };
                (*text, role)
            })
            .collect();
        Lexicon::new(&symbols, config, terminators)
    }

    pub fn build(&self, lexemes: &[Lexeme], lexicon: &Lexicon) -> Result<Tree<O>, ExpressionEvaluationError> {
        let mut builder = Builder {
            tree: Tree::new(),
            active: None,
            expect_operand: true,
            groups: Vec::new(),
        };
        for lexeme in lexemes {
            match lexeme {
                Lexeme::Reference(index) => builder.operand(Operand::Reference(*index), lexeme)?,
                Lexeme::Literal(text) => builder.operand(Operand::Literal(Value::parse_literal(text)), lexeme)?,
                Lexeme::Quoted(text) => {
                    let operand = match lexicon.reference_named(text) {
                        Some(index) if self.dereference_in_literals => Operand::Reference(index),
                        _ => Operand::Literal(Value::String(text.clone())),
                    };
                    builder.operand(operand, lexeme)?
                }
                Lexeme::Symbol(index) => {
                    let (token, text) = self.symbols[*index];
                    self.symbol(&mut builder, token, text)?
                }
            }
        }
        if !builder.groups.is_empty() {
            return Err(ExpressionEvaluationError::syntax("unclosed group", ""));
        }
        if builder.expect_operand && !builder.tree.is_empty() {
            return Err(ExpressionEvaluationError::syntax("expression ends without an operand", ""));
        }
        Ok(builder.tree)
    }

    fn symbol(&self, builder: &mut Builder<O>, token: T, text: &str) -> Result<(), ExpressionEvaluationError> {
        if token == self.open_group {
            if !builder.expect_operand {
                return Err(ExpressionEvaluationError::syntax("expected an operator", text));
            }
            let group = builder.tree.push(NodeKind::Group {
                inner: None,
                closed: false,
            });
            builder.tree.attach(builder.active, group);
            builder.groups.push(group);
            builder.active = Some(group);
        } else if token == self.close_group {
            if builder.expect_operand {
                return Err(ExpressionEvaluationError::syntax("expected an operand", text));
            }
            let group = builder
                .groups
                .pop()
                .ok_or_else(|| ExpressionEvaluationError::syntax("unbalanced group", text))?;
            builder.tree.close_group(group);
            builder.active = Some(group);
        } else if builder.expect_operand {
            let unary = self
                .unary
                .get(&token)
                .ok_or_else(|| ExpressionEvaluationError::syntax("expected an operand", text))?;
            let node = builder.tree.push(NodeKind::Unary {
                operator: unary.operator,
                evaluate: unary.evaluate,
                operand: None,
            });
            builder.tree.attach(builder.active, node);
            builder.active = Some(node);
        } else {
            let (Some(binary), Some(active)) = (self.binary.get(&token), builder.active) else {
                return Err(ExpressionEvaluationError::syntax("expected an operator", text));
            };
            builder.active = Some(create_binary_child(&mut builder.tree, active, binary));
            builder.expect_operand = true;
        }
        Ok(())
    }
}

impl<O: Copy> Builder<O> {
    fn operand(&mut self, operand: Operand, lexeme: &Lexeme) -> Result<(), ExpressionEvaluationError> {
        let near = match lexeme {
            Lexeme::Literal(text) | Lexeme::Quoted(text) => text.as_str(),
            _ => "",
        };
        if !self.expect_operand {
            return Err(ExpressionEvaluationError::syntax("expected an operator", near));
        }
        let leaf = self.tree.push(NodeKind::Leaf(operand));
        if !self.tree.attach(self.active, leaf) {
            return Err(ExpressionEvaluationError::syntax("unexpected operand", near));
        }
        self.active = match self.tree.parent(leaf) {
            Some(parent) if self.tree.operator(parent).is_some() => Some(parent),
            _ => Some(leaf),
        };
        self.expect_operand = false;
        Ok(())
    }
}

/// Splices a new binary node for `operator` relative to the active node and returns it
pub fn create_binary_child<O: Copy>(tree: &mut Tree<O>, active: NodeId, operator: &BinaryOperator<O>) -> NodeId {
    let node = tree.push(NodeKind::Binary {
        operator: operator.operator,
        evaluate: operator.evaluate,
        left: None,
        right: None,
    });
    if tree.is_binary(active) && tree.operator(active).is_some_and(operator.precedes) {
        tree.steal_right(active, node);
        return node;
    }
    let mut target = active;
    while let Some(parent) = tree.parent(target) {
        if tree.is_open_group(parent) {
            break;
        }
        match tree.operator(parent) {
            Some(op) if !(operator.precedes)(op) => target = parent,
            _ => break,
        }
    }
    tree.inject_above(target, node);
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{convert::Converter, expressions::operators};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Add,
        Mul,
    }

    fn add() -> BinaryOperator<Op> {
        BinaryOperator {
            operator: Op::Add,
            precedes: |_| false,
            evaluate: operators::add,
        }
    }

    fn mul() -> BinaryOperator<Op> {
        BinaryOperator {
            operator: Op::Mul,
            precedes: |other| other == Op::Add,
            evaluate: operators::multiply,
        }
    }

    fn leaf(tree: &mut Tree<Op>, value: i64) -> NodeId {
        tree.push(NodeKind::Leaf(Operand::Literal(Value::Int(value))))
    }

    #[test]
    fn tighter_operator_steals_right_operand() {
        let mut tree = Tree::new();
        let one = leaf(&mut tree, 1);
        tree.attach(None, one);
        let plus = create_binary_child(&mut tree, one, &add());
        let two = leaf(&mut tree, 2);
        tree.attach(Some(plus), two);
        let times = create_binary_child(&mut tree, plus, &mul());
        let three = leaf(&mut tree, 3);
        tree.attach(Some(times), three);
        assert_eq!(tree.root(), Some(plus));
        assert_eq!(tree.parent(times), Some(plus));
        assert_eq!(tree.evaluate(&Converter::default(), &|_| Value::Null).unwrap(), Value::Int(7));
    }

    #[test]
    fn looser_operator_is_injected_above() {
        let mut tree = Tree::new();
        let two = leaf(&mut tree, 2);
        tree.attach(None, two);
        let times = create_binary_child(&mut tree, two, &mul());
        let three = leaf(&mut tree, 3);
        tree.attach(Some(times), three);
        let plus = create_binary_child(&mut tree, times, &add());
        let one = leaf(&mut tree, 1);
        tree.attach(Some(plus), one);
        assert_eq!(tree.root(), Some(plus));
        assert_eq!(tree.evaluate(&Converter::default(), &|_| Value::Null).unwrap(), Value::Int(7));
    }

    #[test]
    fn equal_operators_associate_left() {
        let mut tree = Tree::new();
        let a = leaf(&mut tree, 1);
        tree.attach(None, a);
        let first = create_binary_child(&mut tree, a, &add());
        let b = leaf(&mut tree, 2);
        tree.attach(Some(first), b);
        let second = create_binary_child(&mut tree, first, &add());
        assert_eq!(tree.root(), Some(second));
        assert_eq!(tree.parent(first), Some(second));
    }
}
