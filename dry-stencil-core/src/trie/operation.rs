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

//! Token trie bound to operations
//!
//! The [`OperationTrie`] is built once per run from the materialized operations.
//! Each terminal remembers which operation registered it and which of that
//! operation's tokens it is, so the processor can dispatch a match directly.

use std::collections::HashMap;

use crate::operations::Operation;

#[derive(Debug, Clone, Default)]
struct Node {
    children: HashMap<u8, usize>,
    handler: Option<Handler>,
}

/// Owner of a matched token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handler {
    /// Index of the owning operation
    pub operation: usize,
    /// Index of the token among the operation's tokens
    pub token: usize,
}

/// Trie over the tokens of every active operation
#[derive(Debug, Clone)]
pub struct OperationTrie {
    nodes: Vec<Node>,
    min_length: usize,
    max_length: usize,
}

impl OperationTrie {
    /// Registers every token of every operation
    pub fn create(operations: &[Box<dyn Operation>]) -> Self {
        Self::from_token_sets(operations.iter().map(|op| op.tokens()))
    }

    pub(crate) fn from_token_sets<'a>(sets: impl IntoIterator<Item = &'a [Vec<u8>]>) -> Self {
        let mut trie = Self {
            nodes: vec![Node::default()],
            min_length: usize::MAX,
            max_length: 0,
        };
        for (operation, tokens) in sets.into_iter().enumerate() {
            for (token, bytes) in tokens.iter().enumerate() {
                trie.insert(bytes, Handler { operation, token });
            }
        }
        if trie.min_length == usize::MAX {
            trie.min_length = 0;
        }
        trie
    }

    fn insert(&mut self, bytes: &[u8], handler: Handler) {
        if bytes.is_empty() {
            return;
        }
        let mut node = 0;
        for byte in bytes {
            node = match self.nodes[node].children.get(byte) {
                Some(&child) => child,
                None => {
                    self.nodes.push(Node::default());
                    let child = self.nodes.len() - 1;
                    self.nodes[node].children.insert(*byte, child);
                    child
                }
            };
        }
        self.nodes[node].handler = Some(handler);
        self.min_length = self.min_length.min(bytes.len());
        self.max_length = self.max_length.max(bytes.len());
    }

    /// Matches the longest token at `cursor`
    ///
    /// Walking stops as soon as no child continues the path. The match then ends at
    /// the last terminal passed, so `"ifx"` still matches `"if"` when `"ifdef"` is
    /// registered too.
    pub fn get_operation(&self, buffer: &[u8], length: usize, cursor: &mut usize) -> Option<Handler> {
        let end = length.min(buffer.len());
        let mut node = 0;
        let mut position = *cursor;
        let mut matched = None;
        let mut offset_to_match = 0;
        while position < end {
            let Some(&child) = self.nodes[node].children.get(&buffer[position]) else {
                break;
            };
            node = child;
            position += 1;
            offset_to_match += 1;
            if let Some(handler) = self.nodes[node].handler {
                matched = Some(handler);
                offset_to_match = 0;
            }
        }
        let handler = matched?;
        *cursor = position - offset_to_match;
        Some(handler)
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn is_empty(&self) -> bool {
        self.max_length == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie() -> OperationTrie {
        let conditional: Vec<Vec<u8>> = vec![b"if".to_vec(), b"ifdef".to_vec(), b"endif".to_vec()];
        let replacement: Vec<Vec<u8>> = vec![b"Foo".to_vec()];
        OperationTrie::from_token_sets([conditional.as_slice(), replacement.as_slice()])
    }

    #[test]
    fn longest_match_wins() {
        let mut cursor = 0;
        let handler = trie().get_operation(b"ifdef", 5, &mut cursor);
        assert_eq!(handler, Some(Handler { operation: 0, token: 1 }));
        assert_eq!(cursor, 5);
    }

    #[test]
    fn prefix_fallback_positions_cursor_after_shorter_token() {
        let mut cursor = 0;
        let handler = trie().get_operation(b"ifx", 3, &mut cursor);
        assert_eq!(handler, Some(Handler { operation: 0, token: 0 }));
        assert_eq!(cursor, 2);
    }

    #[test]
    fn partial_longer_token_falls_back() {
        let mut cursor = 0;
        let handler = trie().get_operation(b"ifde!", 5, &mut cursor);
        assert_eq!(handler, Some(Handler { operation: 0, token: 0 }));
        assert_eq!(cursor, 2);
    }

    #[test]
    fn reports_owning_operation() {
        let mut cursor = 2;
        let handler = trie().get_operation(b"a Foo", 5, &mut cursor);
        assert_eq!(handler, Some(Handler { operation: 1, token: 0 }));
        assert_eq!(cursor, 5);
    }

    #[test]
    fn miss_leaves_cursor() {
        let mut cursor = 0;
        assert_eq!(trie().get_operation(b"endi", 4, &mut cursor), None);
        assert_eq!(cursor, 0);
    }

    #[test]
    fn tracks_bounds() {
        let trie = trie();
        assert_eq!(trie.min_length(), 2);
        assert_eq!(trie.max_length(), 5);
        let empty = OperationTrie::from_token_sets(std::iter::empty());
        assert!(empty.is_empty());
        assert_eq!(empty.min_length(), 0);
    }
}
