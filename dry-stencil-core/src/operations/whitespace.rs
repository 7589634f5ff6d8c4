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

//! Whitespace handling around control tokens

use std::{io, sync::Arc};

use crate::processor::state::ProcessorState;

/// What is removed around a matched control token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhitespacePolicy {
    #[default]
    Keep,
    /// The whole line holding the token, line ending included
    WholeLine,
    /// Spaces and tabs directly next to the token
    Trim,
}

impl WhitespacePolicy {
    /// `whole_line` wins when both flags are set
    pub fn from_flags(whole_line: bool, trim: bool) -> Self {
        match (whole_line, trim) {
            (true, _) => Self::WholeLine,
            (false, true) => Self::Trim,
            (false, false) => Self::Keep,
        }
    }

    /// Removes already written output in front of the token
    pub fn before(self, state: &mut ProcessorState<'_>) -> io::Result<()> {
        let config = Arc::clone(state.encoding_config());
        match self {
            Self::Keep => Ok(()),
            Self::WholeLine => state.seek_target_back_until(&config.line_endings, false),
            Self::Trim => state.seek_target_back_while(&config.whitespace),
        }
    }

    /// Skips source following the token
    pub fn after(self, state: &mut ProcessorState<'_>) -> io::Result<()> {
        let config = Arc::clone(state.encoding_config());
        match self {
            Self::Keep => Ok(()),
            Self::WholeLine => state.seek_source_forward_through(&config.line_endings).map(|_| ()),
            Self::Trim => state.seek_source_forward_while(&config.whitespace),
        }
    }
}
