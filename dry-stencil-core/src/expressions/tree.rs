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

//! Arena-backed expression tree
//!
//! Nodes live in a `Vec` and refer to each other by index, parents included, so
//! the builders can splice a new operator above or below an existing node without
//! any shared ownership. A tree is built for one evaluation and dropped after.

use crate::{convert::Converter, error::ExpressionEvaluationError, value::Value};

pub type NodeId = usize;

pub type BinaryFn = fn(&Converter, Value, Value) -> Result<Value, ExpressionEvaluationError>;
pub type UnaryFn = fn(&Converter, Value) -> Result<Value, ExpressionEvaluationError>;

/// An indivisible value
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    /// Index into the variable table, resolved when evaluated
    Reference(usize),
}

#[derive(Debug, Clone)]
pub enum NodeKind<O> {
    Binary {
        operator: O,
        evaluate: BinaryFn,
        left: Option<NodeId>,
        right: Option<NodeId>,
    },
    Unary {
        operator: O,
        evaluate: UnaryFn,
        operand: Option<NodeId>,
    },
    Leaf(Operand),
    Group {
        inner: Option<NodeId>,
        closed: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Node<O> {
    pub parent: Option<NodeId>,
    pub kind: NodeKind<O>,
}

#[derive(Debug, Clone)]
pub struct Tree<O> {
    nodes: Vec<Node<O>>,
    root: Option<NodeId>,
}

impl<O> Default for Tree<O> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }
}

impl<O: Copy> Tree<O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Adds a detached node
    pub fn push(&mut self, kind: NodeKind<O>) -> NodeId {
        self.nodes.push(Node { parent: None, kind });
        self.nodes.len() - 1
    }

    /// The operator of a binary or unary node
    pub fn operator(&self, id: NodeId) -> Option<O> {
        match self.nodes[id].kind {
            NodeKind::Binary { operator, .. } | NodeKind::Unary { operator, .. } => Some(operator),
            _ => None,
        }
    }

    pub fn is_open_group(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].kind, NodeKind::Group { closed: false, .. })
    }

    pub fn is_binary(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].kind, NodeKind::Binary { .. })
    }

    /// Binds `child` to the first free slot of `parent`, or makes it the root
    ///
    /// Returns `false` when `parent` has no free slot.
    pub fn attach(&mut self, parent: Option<NodeId>, child: NodeId) -> bool {
        let Some(parent) = parent else {
            if self.root.is_some() {
                return false;
            }
            self.root = Some(child);
            self.nodes[child].parent = None;
            return true;
        };
        let slot = match &mut self.nodes[parent].kind {
            NodeKind::Binary { left: slot @ None, .. }
            | NodeKind::Binary { right: slot @ None, .. }
            | NodeKind::Unary { operand: slot @ None, .. }
            | NodeKind::Group {
                inner: slot @ None,
                closed: false,
            } => slot,
            _ => return false,
        };
        *slot = Some(child);
        self.nodes[child].parent = Some(parent);
        true
    }

    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) {
        match parent {
            None => self.root = Some(new),
            Some(parent) => {
                match &mut self.nodes[parent].kind {
                    NodeKind::Binary { left, right, .. } => {
                        if *left == Some(old) {
                            *left = Some(new);
                        } else if *right == Some(old) {
                            *right = Some(new);
                        }
                    }
                    NodeKind::Unary { operand: slot, .. } | NodeKind::Group { inner: slot, .. } => {
                        if *slot == Some(old) {
                            *slot = Some(new);
                        }
                    }
                    NodeKind::Leaf(_) => {}
                }
            }
        }
        self.nodes[new].parent = parent;
    }

    /// Puts the detached binary node `new` where `target` is and hangs `target` below it as left operand
    pub fn inject_above(&mut self, target: NodeId, new: NodeId) {
        let parent = self.nodes[target].parent;
        self.replace_child(parent, target, new);
        if let NodeKind::Binary { left, .. } = &mut self.nodes[new].kind {
            *left = Some(target);
        }
        self.nodes[target].parent = Some(new);
    }

    /// Moves the right operand of `binary` under the detached binary node `new`, which takes its slot
    pub fn steal_right(&mut self, binary: NodeId, new: NodeId) {
        let stolen = match &mut self.nodes[binary].kind {
            NodeKind::Binary { right, .. } => right.replace(new),
            _ => None,
        };
        self.nodes[new].parent = Some(binary);
        if let Some(stolen) = stolen {
            if let NodeKind::Binary { left, .. } = &mut self.nodes[new].kind {
                *left = Some(stolen);
            }
            self.nodes[stolen].parent = Some(new);
        }
    }

    pub fn close_group(&mut self, id: NodeId) {
        if let NodeKind::Group { closed, .. } = &mut self.nodes[id].kind {
            *closed = true;
        }
    }

    /// Evaluates the whole tree; an empty tree evaluates to null
    ///
    /// Both operands of every binary node are evaluated before the node itself.
    pub fn evaluate(
        &self,
        converter: &Converter,
        resolve: &dyn Fn(usize) -> Value,
    ) -> Result<Value, ExpressionEvaluationError> {
        match self.root {
            Some(root) => self.evaluate_node(root, converter, resolve),
            None => Ok(Value::Null),
        }
    }

    fn evaluate_node(
        &self,
        id: NodeId,
        converter: &Converter,
        resolve: &dyn Fn(usize) -> Value,
    ) -> Result<Value, ExpressionEvaluationError> {
        let operand = |slot: Option<NodeId>| match slot {
            Some(child) => self.evaluate_node(child, converter, resolve),
            None => Err(ExpressionEvaluationError::syntax("missing operand", "")),
        };
        match &self.nodes[id].kind {
            NodeKind::Binary {
                evaluate, left, right, ..
            } => {
                let left = operand(*left)?;
                let right = operand(*right)?;
                evaluate(converter, left, right)
            }
            NodeKind::Unary {
                evaluate, operand: slot, ..
            } => evaluate(converter, operand(*slot)?),
            NodeKind::Leaf(Operand::Literal(value)) => Ok(value.clone()),
            NodeKind::Leaf(Operand::Reference(index)) => Ok(resolve(*index)),
            NodeKind::Group { inner, .. } => operand(*inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::operators;

    fn literal(tree: &mut Tree<char>, value: impl Into<Value>) -> NodeId {
        tree.push(NodeKind::Leaf(Operand::Literal(value.into())))
    }

    fn binary(tree: &mut Tree<char>, operator: char, evaluate: BinaryFn) -> NodeId {
        tree.push(NodeKind::Binary {
            operator,
            evaluate,
            left: None,
            right: None,
        })
    }

    #[test]
    fn injects_above_root() {
        let mut tree = Tree::new();
        let one = literal(&mut tree, 1);
        assert!(tree.attach(None, one));
        let plus = binary(&mut tree, '+', operators::add);
        tree.inject_above(one, plus);
        let two = literal(&mut tree, 2);
        assert!(tree.attach(Some(plus), two));
        assert_eq!(tree.root(), Some(plus));
        assert_eq!(tree.parent(two), Some(plus));
        assert_eq!(tree.evaluate(&Converter::default(), &|_| Value::Null).unwrap(), Value::Int(3));
    }

    #[test]
    fn steals_right_operand() {
        // 1 + 2 then * 3 binds tighter: 1 + (2 * 3)
        let mut tree = Tree::new();
        let one = literal(&mut tree, 1);
        tree.attach(None, one);
        let plus = binary(&mut tree, '+', operators::add);
        tree.inject_above(one, plus);
        let two = literal(&mut tree, 2);
        tree.attach(Some(plus), two);
        let times = binary(&mut tree, '*', operators::multiply);
        tree.steal_right(plus, times);
        let three = literal(&mut tree, 3);
        assert!(tree.attach(Some(times), three));
        assert_eq!(tree.parent(two), Some(times));
        assert_eq!(tree.evaluate(&Converter::default(), &|_| Value::Null).unwrap(), Value::Int(7));
    }

    #[test]
    fn resolves_references_lazily() {
        let mut tree: Tree<char> = Tree::new();
        let reference = tree.push(NodeKind::Leaf(Operand::Reference(4)));
        tree.attach(None, reference);
        let value = tree
            .evaluate(&Converter::default(), &|index| Value::Int(index as i64 * 10))
            .unwrap();
        assert_eq!(value, Value::Int(40));
    }

    #[test]
    fn refuses_second_root_and_full_slots() {
        let mut tree = Tree::new();
        let a = literal(&mut tree, 1);
        let b = literal(&mut tree, 2);
        assert!(tree.attach(None, a));
        assert!(!tree.attach(None, b));
        assert!(!tree.attach(Some(a), b));
    }

    #[test]
    fn incomplete_binary_is_a_syntax_error() {
        let mut tree = Tree::new();
        let one = literal(&mut tree, 1);
        tree.attach(None, one);
        let plus = binary(&mut tree, '+', operators::add);
        tree.inject_above(one, plus);
        let err = tree.evaluate(&Converter::default(), &|_| Value::Null).unwrap_err();
        assert!(matches!(err, ExpressionEvaluationError::Syntax { .. }));
    }
}
