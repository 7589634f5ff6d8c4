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

//! Variable expansion
//!
//! Every visible variable contributes its formatted key as a token. With the
//! default `{0}` format that is the bare variable name.

use std::sync::Arc;

use tracing::trace;

use crate::{
    error::Result,
    operations::Operation,
    processor::{encoding_config::EncodingConfig, state::ProcessorState},
};

pub struct ExpandVariables {
    tokens: Vec<Vec<u8>>,
    config: Arc<EncodingConfig>,
}

impl ExpandVariables {
    pub fn new(config: &Arc<EncodingConfig>) -> Self {
        Self {
            tokens: config.variables().iter().map(|slot| slot.formatted_key.clone()).collect(),
            config: Arc::clone(config),
        }
    }
}

impl Operation for ExpandVariables {
    fn tokens(&self) -> &[Vec<u8>] {
        &self.tokens
    }

    /// Writes the current value of the variable; null writes nothing
    fn handle_match(&mut self, state: &mut ProcessorState<'_>, token: usize) -> Result<usize> {
        let value = self.config.resolve(token);
        trace!(variable = %self.config.variables()[token].name, "expanding variable");
        if value.is_null() {
            return Ok(0);
        }
        Ok(state.write(&self.config.encode(&value.to_string()))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encoding::Encoding, variables::VariableCollection};

    #[test]
    fn tokens_follow_variable_format() {
        let vars: VariableCollection = [("name", "App"), ("port", "80")].into_iter().collect();
        let config = Arc::new(EncodingConfig::new(Encoding::Utf8, &Arc::new(vars), "%{0}%"));
        let expand = ExpandVariables::new(&config);
        assert_eq!(expand.tokens(), [b"%name%".to_vec(), b"%port%".to_vec()]);
    }
}
