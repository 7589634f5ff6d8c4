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

//! Conditional blocks
//!
//! Handles `if` / `elseif` / `else` / `endif` markup, with any number of
//! spellings for each marker. Nested blocks are tracked on a stack of
//! [`EvaluationState`]s. When a branch is not taken, the source is scanned
//! forward to the next marker at the same nesting level and that marker is
//! handled in turn; skipped content is never written.
//!
//! Every branch condition is evaluated at most once and in document order. Once a
//! branch of a block has been taken, later `elseif` conditions are skipped
//! without being evaluated.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::{
    convert::Converter,
    error::{ConfigError, Error, Result},
    expressions::{ConditionEvaluator, DEFAULT_EVALUATOR, EvaluatorKind},
    operations::{Operation, require_non_empty, whitespace::WhitespacePolicy},
    processor::{encoding_config::EncodingConfig, state::ProcessorState},
    trie::SimpleTrie,
};

fn default_evaluator() -> String {
    DEFAULT_EVALUATOR.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalConfig {
    #[serde(rename = "if")]
    pub if_tokens: Vec<String>,
    #[serde(rename = "elseif", default)]
    pub else_if_tokens: Vec<String>,
    #[serde(rename = "else", default)]
    pub else_tokens: Vec<String>,
    #[serde(rename = "endif")]
    pub end_if_tokens: Vec<String>,
    #[serde(default)]
    pub whole_line: bool,
    #[serde(default)]
    pub trim: bool,
    #[serde(default = "default_evaluator")]
    pub evaluator: String,
    /// Extra sequences ending an inline condition, consumed with it
    #[serde(default)]
    pub terminators: Vec<String>,
    /// Report unbalanced markup instead of recovering from it
    #[serde(default)]
    pub strict: bool,
}

impl ConditionalConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        const NAME: &str = "conditionals";
        for (tokens, role) in [(&self.if_tokens, "if"), (&self.end_if_tokens, "endif")] {
            if tokens.is_empty() {
                return Err(ConfigError::MissingToken { operation: NAME, role });
            }
        }
        require_non_empty(
            NAME,
            self.if_tokens
                .iter()
                .chain(&self.else_if_tokens)
                .chain(&self.else_tokens)
                .chain(&self.end_if_tokens)
                .chain(&self.terminators),
        )?;
        self.evaluator.parse::<EvaluatorKind>()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    If,
    ElseIf,
    Else,
    EndIf,
}

/// State of one open conditional block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationState {
    /// Whether any branch of the block has been taken
    pub branch_taken: bool,
}

pub struct Conditional {
    tokens: Vec<Vec<u8>>,
    markers: Vec<Marker>,
    /// Same tokens as `tokens`, ids index `markers`
    scan: SimpleTrie,
    evaluator: ConditionEvaluator,
    whitespace: WhitespacePolicy,
    strict: bool,
    stack: Vec<EvaluationState>,
}

impl Conditional {
    pub fn new(
        config: &ConditionalConfig,
        encoding: &Arc<EncodingConfig>,
        converter: &Arc<Converter>,
    ) -> std::result::Result<Self, ConfigError> {
        let kind = config.evaluator.parse::<EvaluatorKind>()?;
        let groups = [
            (&config.if_tokens, Marker::If),
            (&config.else_if_tokens, Marker::ElseIf),
            (&config.else_tokens, Marker::Else),
            (&config.end_if_tokens, Marker::EndIf),
        ];
        let mut tokens = Vec::new();
        let mut markers = Vec::new();
        for (texts, marker) in groups {
            for text in texts {
                tokens.push(encoding.encode(text));
                markers.push(marker);
            }
        }
        Ok(Self {
            scan: SimpleTrie::from_tokens(&tokens),
            tokens,
            markers,
            evaluator: ConditionEvaluator::new(kind, encoding, converter, &config.terminators),
            whitespace: WhitespacePolicy::from_flags(config.whole_line, config.trim),
            strict: config.strict,
            stack: Vec::new(),
        })
    }

    fn evaluate(&self, state: &mut ProcessorState<'_>) -> Result<bool> {
        let taken = self.evaluator.evaluate(state)?;
        self.whitespace.after(state)?;
        Ok(taken)
    }

    fn dispatch(&mut self, state: &mut ProcessorState<'_>, first: Marker) -> Result<()> {
        let mut marker = first;
        loop {
            self.whitespace.before(state)?;
            if marker != Marker::If && self.stack.is_empty() {
                return self.orphan(state, marker);
            }
            let next = match marker {
                Marker::If => {
                    self.stack.push(EvaluationState::default());
                    let taken = self.evaluate(state)?;
                    trace!(depth = self.stack.len(), taken, "if");
                    if taken {
                        self.take_branch();
                        return Ok(());
                    }
                    self.skip_to_next_branch(state)?
                }
                Marker::ElseIf => {
                    if self.branch_taken() {
                        trace!(depth = self.stack.len(), "elseif skipped");
                        self.skip_to_end(state)?
                    } else {
                        let taken = self.evaluate(state)?;
                        trace!(depth = self.stack.len(), taken, "elseif");
                        if taken {
                            self.take_branch();
                            return Ok(());
                        }
                        self.skip_to_next_branch(state)?
                    }
                }
                Marker::Else => {
                    if self.branch_taken() {
                        trace!(depth = self.stack.len(), "else skipped");
                        self.skip_to_end(state)?
                    } else {
                        trace!(depth = self.stack.len(), "else");
                        self.take_branch();
                        self.whitespace.after(state)?;
                        return Ok(());
                    }
                }
                Marker::EndIf => {
                    self.stack.pop();
                    self.whitespace.after(state)?;
                    return Ok(());
                }
            };
            match next {
                Some(found) => marker = found,
                None => return self.unterminated(),
            }
        }
    }

    fn branch_taken(&self) -> bool {
        self.stack.last().is_some_and(|block| block.branch_taken)
    }

    fn take_branch(&mut self) {
        if let Some(block) = self.stack.last_mut() {
            block.branch_taken = true;
        }
    }

    /// Skips to the next `elseif`, `else` or `endif` of the current block
    ///
    /// The marker found is consumed. `None` means the source ended first.
    fn skip_to_next_branch(&mut self, state: &mut ProcessorState<'_>) -> Result<Option<Marker>> {
        self.skip(state, |marker| marker != Marker::If)
    }

    /// Skips to the `endif` of the current block
    fn skip_to_end(&mut self, state: &mut ProcessorState<'_>) -> Result<Option<Marker>> {
        self.skip(state, |marker| marker == Marker::EndIf)
    }

    fn skip(&mut self, state: &mut ProcessorState<'_>, stop: impl Fn(Marker) -> bool) -> Result<Option<Marker>> {
        let mut depth = 0usize;
        while let Some(index) = state.seek_source_forward_until(&self.scan, true)? {
            let marker = self.markers[index];
            match marker {
                Marker::If => depth += 1,
                Marker::EndIf if depth > 0 => depth -= 1,
                _ if depth == 0 && stop(marker) => return Ok(Some(marker)),
                _ => {}
            }
        }
        Ok(None)
    }

    fn unterminated(&mut self) -> Result<()> {
        let depth = self.stack.len();
        self.stack.clear();
        if self.strict {
            return Err(Error::UnbalancedConditional(format!(
                "{} block(s) still open at end of input",
                depth
            )));
        }
        warn!(depth, "input ended inside a conditional block");
        Ok(())
    }

    fn orphan(&mut self, state: &mut ProcessorState<'_>, marker: Marker) -> Result<()> {
        if self.strict {
            return Err(Error::UnbalancedConditional(format!("{:?} without a matching if", marker)));
        }
        warn!(?marker, "ignoring conditional marker outside of any block");
        self.whitespace.after(state)?;
        Ok(())
    }
}

impl Operation for Conditional {
    fn tokens(&self) -> &[Vec<u8>] {
        &self.tokens
    }

    fn handle_match(&mut self, state: &mut ProcessorState<'_>, token: usize) -> Result<usize> {
        let marker = self.markers[token];
        self.dispatch(state, marker)?;
        Ok(0)
    }

    fn finish(&mut self) -> Result<()> {
        if self.stack.is_empty() {
            return Ok(());
        }
        self.unterminated()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let config: ConditionalConfig = serde_json::from_value(json!({
            "if": ["#if"],
            "endif": ["#endif"],
        }))
        .unwrap();
        assert_eq!(config.evaluator, "C++");
        assert!(config.else_tokens.is_empty());
        assert!(!config.whole_line && !config.trim && !config.strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn requires_if_and_endif() {
        let config: ConditionalConfig = serde_json::from_value(json!({ "if": ["#if"], "endif": [] })).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingToken { role: "endif", .. })
        ));
    }

    #[test]
    fn rejects_unknown_evaluator() {
        let config: ConditionalConfig = serde_json::from_value(json!({
            "if": ["#if"],
            "endif": ["#endif"],
            "evaluator": "VB",
        }))
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownEvaluator(_))));
    }

    #[test]
    fn rejects_empty_marker() {
        let config: ConditionalConfig = serde_json::from_value(json!({
            "if": ["#if"],
            "else": [""],
            "endif": ["#endif"],
        }))
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyToken { .. })));
    }
}
