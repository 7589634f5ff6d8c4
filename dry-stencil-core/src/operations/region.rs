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

//! Included and excluded regions
//!
//! A region is delimited by a start and an end marker. The markers are always
//! removed. Content of an excluded region is skipped, honouring nested regions;
//! content of an included region is kept. When both markers are the same
//! sequence, each occurrence toggles the region.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    operations::{Operation, require_non_empty, whitespace::WhitespacePolicy},
    processor::{encoding_config::EncodingConfig, state::ProcessorState},
    trie::SimpleTrie,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionConfig {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub include: bool,
    #[serde(default)]
    pub whole_line: bool,
    #[serde(default)]
    pub trim: bool,
}

impl RegionConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        require_non_empty("region", [&self.start, &self.end])
    }
}

const START: usize = 0;

pub struct Region {
    tokens: Vec<Vec<u8>>,
    markers: SimpleTrie,
    toggle: bool,
    include: bool,
    whitespace: WhitespacePolicy,
    /// Included regions currently open
    depth: usize,
}

impl Region {
    pub fn new(config: &RegionConfig, encoding: &Arc<EncodingConfig>) -> Self {
        let toggle = config.start == config.end;
        let tokens = if toggle {
            vec![encoding.encode(&config.start)]
        } else {
            vec![encoding.encode(&config.start), encoding.encode(&config.end)]
        };
        Self {
            markers: SimpleTrie::from_tokens(&tokens),
            tokens,
            toggle,
            include: config.include,
            whitespace: WhitespacePolicy::from_flags(config.whole_line, config.trim),
            depth: 0,
        }
    }

    /// Skips to the end marker matching an already consumed start marker
    fn skip_region(&self, state: &mut ProcessorState<'_>) -> Result<()> {
        let mut depth = 0usize;
        while let Some(marker) = state.seek_source_forward_until(&self.markers, true)? {
            match marker {
                START if !self.toggle => depth += 1,
                _ if depth == 0 => break,
                _ => depth -= 1,
            }
        }
        Ok(())
    }
}

impl Operation for Region {
    fn tokens(&self) -> &[Vec<u8>] {
        &self.tokens
    }

    fn handle_match(&mut self, state: &mut ProcessorState<'_>, token: usize) -> Result<usize> {
        self.whitespace.before(state)?;
        let opening = if self.toggle { self.depth == 0 } else { token == START };
        match (opening, self.include) {
            (true, true) => self.depth += 1,
            (true, false) => self.skip_region(state)?,
            (false, _) => self.depth = self.depth.saturating_sub(1),
        }
        self.whitespace.after(state)?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let config: RegionConfig = serde_json::from_value(json!({ "start": "//-", "end": "//+" })).unwrap();
        assert!(!config.include);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn same_markers_toggle() {
        let config = RegionConfig {
            start: "##".into(),
            end: "##".into(),
            include: false,
            whole_line: false,
            trim: false,
        };
        let encoding = Arc::new(EncodingConfig::new(
            crate::encoding::Encoding::Utf8,
            &Arc::new(crate::variables::VariableCollection::new()),
            "{0}",
        ));
        let region = Region::new(&config, &encoding);
        assert!(region.toggle);
        assert_eq!(region.tokens().len(), 1);
    }
}
