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

//! Byte-sequence trie
//!
//! The [`SimpleTrie`] maps registered byte sequences to integer token ids and finds
//! the longest registered sequence starting at a cursor inside a buffer window.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: HashMap<u8, usize>,
    index: Option<usize>,
}

/// Multi-pattern matcher over raw bytes
#[derive(Debug, Clone)]
pub struct SimpleTrie {
    nodes: Vec<TrieNode>,
    tokens: HashMap<usize, Vec<u8>>,
    min_length: usize,
    max_length: usize,
}

impl Default for SimpleTrie {
    fn default() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            tokens: HashMap::new(),
            min_length: 0,
            max_length: 0,
        }
    }
}

impl SimpleTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a trie where each token's id is its position
    pub fn from_tokens<T: AsRef<[u8]>>(tokens: impl IntoIterator<Item = T>) -> Self {
        let mut trie = Self::new();
        for (index, token) in tokens.into_iter().enumerate() {
            trie.add_token(token.as_ref(), index);
        }
        trie
    }

    /// Registers a byte sequence; a later registration of the same path wins
    ///
    /// Empty sequences can never match and are ignored.
    pub fn add_token(&mut self, token: &[u8], index: usize) {
        if token.is_empty() {
            return;
        }
        let mut node = 0;
        for byte in token {
            node = match self.nodes[node].children.get(byte) {
                Some(&child) => child,
                None => {
                    self.nodes.push(TrieNode::default());
                    let child = self.nodes.len() - 1;
                    self.nodes[node].children.insert(*byte, child);
                    child
                }
            };
        }
        if let Some(previous) = self.nodes[node].index.replace(index) {
            self.tokens.remove(&previous);
        }
        self.tokens.insert(index, token.to_vec());
        self.min_length = if self.min_length == 0 {
            token.len()
        } else {
            self.min_length.min(token.len())
        };
        self.max_length = self.max_length.max(token.len());
    }

    /// Finds the longest token starting at `cursor` within `buffer[..length]`
    ///
    /// On a match the cursor is moved past it and the token id returned. Otherwise
    /// the cursor is left untouched.
    pub fn get_operation(&self, buffer: &[u8], length: usize, cursor: &mut usize) -> Option<usize> {
        let end = length.min(buffer.len());
        let mut node = 0;
        let mut position = *cursor;
        let mut best = None;
        while position < end {
            match self.nodes[node].children.get(&buffer[position]) {
                Some(&child) => {
                    node = child;
                    position += 1;
                    if let Some(index) = self.nodes[node].index {
                        best = Some((index, position));
                    }
                }
                None => break,
            }
        }
        best.map(|(index, matched_end)| {
            *cursor = matched_end;
            index
        })
    }

    /// Length of the longest registered token that `bytes` ends with
    pub fn match_suffix(&self, bytes: &[u8]) -> Option<usize> {
        self.tokens
            .values()
            .filter(|token| bytes.ends_with(token))
            .map(Vec::len)
            .max()
    }

    /// Bytes registered for a token id
    pub fn token(&self, index: usize) -> Option<&[u8]> {
        self.tokens.get(&index).map(Vec::as_slice)
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie() -> SimpleTrie {
        SimpleTrie::from_tokens(["if", "ifdef", "else", "\r\n", "\n"])
    }

    #[test]
    fn finds_longest_match() {
        let mut cursor = 0;
        assert_eq!(trie().get_operation(b"ifdef X", 7, &mut cursor), Some(1));
        assert_eq!(cursor, 5);
    }

    #[test]
    fn falls_back_to_shorter_prefix() {
        let mut cursor = 0;
        assert_eq!(trie().get_operation(b"ifde", 4, &mut cursor), Some(0));
        assert_eq!(cursor, 2);
    }

    #[test]
    fn leaves_cursor_on_miss() {
        let mut cursor = 1;
        assert_eq!(trie().get_operation(b"xyz", 3, &mut cursor), None);
        assert_eq!(cursor, 1);
    }

    #[test]
    fn respects_window_length() {
        let mut cursor = 0;
        assert_eq!(trie().get_operation(b"ifdef", 3, &mut cursor), Some(0));
        assert_eq!(cursor, 2);
    }

    #[test]
    fn last_writer_wins() {
        let mut trie = SimpleTrie::new();
        trie.add_token(b"abc", 1);
        trie.add_token(b"abc", 7);
        let mut cursor = 0;
        assert_eq!(trie.get_operation(b"abc", 3, &mut cursor), Some(7));
        assert_eq!(trie.token(1), None);
        assert_eq!(trie.token(7), Some(&b"abc"[..]));
    }

    #[test]
    fn tracks_length_bounds() {
        let trie = trie();
        assert_eq!(trie.min_length(), 1);
        assert_eq!(trie.max_length(), 5);
    }

    #[test]
    fn matches_longest_suffix() {
        let trie = trie();
        assert_eq!(trie.match_suffix(b"line\r\n"), Some(2));
        assert_eq!(trie.match_suffix(b"line\n"), Some(1));
        assert_eq!(trie.match_suffix(b"line"), None);
    }

    #[test]
    fn ignores_empty_tokens() {
        let mut trie = SimpleTrie::new();
        trie.add_token(b"", 0);
        assert!(trie.is_empty());
        assert_eq!(trie.min_length(), 0);
    }
}
