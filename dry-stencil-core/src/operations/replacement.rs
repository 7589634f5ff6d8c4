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

//! Literal token replacement

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    operations::{Operation, require_non_empty},
    processor::{encoding_config::EncodingConfig, state::ProcessorState},
};

/// Replaces every occurrence of `original` with `replacement`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementConfig {
    pub original: String,
    #[serde(default)]
    pub replacement: String,
}

impl ReplacementConfig {
    pub fn new(original: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            replacement: replacement.into(),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        require_non_empty("replacements", [&self.original])
    }
}

pub struct Replacement {
    tokens: Vec<Vec<u8>>,
    replacement: Vec<u8>,
}

impl Replacement {
    pub fn new(config: &ReplacementConfig, encoding: &Arc<EncodingConfig>) -> Self {
        Self {
            tokens: vec![encoding.encode(&config.original)],
            replacement: encoding.encode(&config.replacement),
        }
    }
}

impl Operation for Replacement {
    fn tokens(&self) -> &[Vec<u8>] {
        &self.tokens
    }

    fn handle_match(&mut self, state: &mut ProcessorState<'_>, _token: usize) -> Result<usize> {
        Ok(state.write(&self.replacement)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encoding::Encoding, variables::VariableCollection};

    #[test]
    fn encodes_both_sides() {
        let config = Arc::new(EncodingConfig::new(
            Encoding::Utf16Le,
            &Arc::new(VariableCollection::new()),
            "{0}",
        ));
        let replacement = Replacement::new(&ReplacementConfig::new("ab", "c"), &config);
        assert_eq!(replacement.tokens(), [Encoding::Utf16Le.encode("ab")]);
        assert_eq!(replacement.replacement, Encoding::Utf16Le.encode("c"));
    }

    #[test]
    fn empty_replacement_is_allowed() {
        assert!(ReplacementConfig::new("x", "").validate().is_ok());
        assert!(ReplacementConfig::new("", "x").validate().is_err());
    }
}
