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

//! Streaming processor
//!
//! A [`Processor`] holds a validated configuration and can run any number of
//! times, each run reading one source stream and writing one target stream.
//! Bytes that match no token are copied through unchanged, a byte-order mark
//! included, so a run without matches reproduces its input exactly.
//!
//! # Example
//!
//! ```
//! use dry_stencil_core::{
//!     operations::{OperationProvider, replacement::ReplacementConfig},
//!     processor::{EngineConfig, Processor},
//!     variables::VariableCollection,
//! };
//!
//! let config = EngineConfig {
//!     operations: vec![OperationProvider::Replacements(ReplacementConfig::new("World", "Rust"))],
//!     ..EngineConfig::default()
//! };
//! let processor = Processor::new(config, VariableCollection::new()).unwrap();
//! let (output, modified) = processor.process_str("Hello World").unwrap();
//! assert_eq!(output, "Hello Rust");
//! assert!(modified);
//! ```

pub mod encoding_config;
pub mod state;

use std::{io::Read, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    convert::Converter,
    error::{ConfigError, Result},
    operations::OperationProvider,
    trie::OperationTrie,
    variables::VariableCollection,
};
use encoding_config::{EncodingConfig, VARIABLE_FORMAT_PLACEHOLDER};
use state::{ProcessorState, TargetStream};

const DEFAULT_BUFFER_SIZE: usize = 8 * 1024 * 1024;
const DEFAULT_FLUSH_THRESHOLD: usize = 8 * 1024 * 1024;

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_flush_threshold() -> usize {
    DEFAULT_FLUSH_THRESHOLD
}

fn default_variable_format() -> String {
    VARIABLE_FORMAT_PLACEHOLDER.to_string()
}

/// Buffering of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorOptions {
    /// Bytes of source held in memory at once
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Bytes written between two flushes of the target
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

impl ProcessorOptions {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroSize("bufferSize"));
        }
        if self.flush_threshold == 0 {
            return Err(ConfigError::ZeroSize("flushThreshold"));
        }
        Ok(())
    }
}

/// Everything a processor is configured with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// How a variable name appears in content, `{0}` standing for the name
    #[serde(default = "default_variable_format")]
    pub variable_format: String,
    #[serde(default)]
    pub operations: Vec<OperationProvider>,
    #[serde(flatten)]
    pub options: ProcessorOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            variable_format: default_variable_format(),
            operations: Vec::new(),
            options: ProcessorOptions::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.options.validate()?;
        if !self.variable_format.contains(VARIABLE_FORMAT_PLACEHOLDER) {
            return Err(ConfigError::VariableFormat(self.variable_format.clone()));
        }
        self.operations.iter().try_for_each(OperationProvider::validate)
    }
}

/// A validated, reusable processing configuration
#[derive(Debug, Clone)]
pub struct Processor {
    config: EngineConfig,
    variables: Arc<VariableCollection>,
    converter: Arc<Converter>,
}

impl Processor {
    pub fn new(config: EngineConfig, variables: VariableCollection) -> Result<Self> {
        Self::with_converter(config, variables, Converter::default())
    }

    /// Validates the configuration and computes macro variables
    pub fn with_converter(config: EngineConfig, variables: VariableCollection, converter: Converter) -> Result<Self> {
        config.validate()?;
        let converter = Arc::new(converter);
        let mut variables = Arc::new(variables);
        for provider in &config.operations {
            if let OperationProvider::Macros(macros) = provider {
                variables = macros.apply(variables, &converter)?;
            }
        }
        debug!(
            operations = config.operations.len(),
            variables = variables.len(),
            "processor configured"
        );
        Ok(Self {
            config,
            variables,
            converter,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Caller variables with macro results layered on top
    pub fn variables(&self) -> &Arc<VariableCollection> {
        &self.variables
    }

    /// Streams `source` to `target`, returning whether any token matched
    pub fn run<R: Read, W: TargetStream>(&self, mut source: R, mut target: W) -> Result<bool> {
        let variables = &self.variables;
        let format = self.config.variable_format.as_str();
        let mut state = ProcessorState::new(&mut source, &mut target, self.config.options.buffer_size, |encoding| {
            EncodingConfig::new(encoding, variables, format)
        })?;

        let encoding = Arc::clone(state.encoding_config());
        let mut operations = Vec::with_capacity(self.config.operations.len());
        for provider in &self.config.operations {
            if let Some(operation) = provider.materialize(&encoding, &self.converter)? {
                operations.push(operation);
            }
        }
        let trie = OperationTrie::create(&operations);
        state.reserve_lookahead(trie.max_length());
        debug!(
            encoding = %state.encoding(),
            operations = operations.len(),
            max_token = trie.max_length(),
            "processing stream"
        );

        let flush_threshold = self.config.options.flush_threshold;
        let mut modified = false;
        let mut last_written = 0;
        let mut written_since_flush = 0;
        loop {
            // keep enough lookahead for the longest token
            if !state.is_exhausted() && state.length() - state.position() < trie.max_length() {
                written_since_flush += state.write_range(last_written, state.position())?;
                last_written = 0;
                if !state.advance_buffer(state.position())? {
                    break;
                }
            }
            if state.position() >= state.length() {
                written_since_flush += state.write_range(last_written, state.length())?;
                last_written = 0;
                if !state.advance_buffer(state.length())? {
                    break;
                }
                continue;
            }

            let mut cursor = state.position();
            match trie.get_operation(state.buffer(), state.length(), &mut cursor) {
                Some(handler) => {
                    written_since_flush += state.write_range(last_written, state.position())?;
                    state.set_position(cursor);
                    written_since_flush += operations[handler.operation].handle_match(&mut state, handler.token)?;
                    last_written = state.position();
                    modified = true;
                }
                // nothing left can hold a token
                None if trie.is_empty() || (state.is_exhausted() && state.length() - state.position() < trie.min_length()) => {
                    state.set_position(state.length())
                }
                None => state.set_position(state.position() + 1),
            }

            if written_since_flush >= flush_threshold {
                state.flush()?;
                written_since_flush = 0;
            }
        }

        for operation in &mut operations {
            operation.finish()?;
        }
        state.flush()?;
        debug!(modified, "stream processed");
        Ok(modified)
    }

    /// Processes an in-memory input
    pub fn process_bytes(&self, input: &[u8]) -> Result<(Vec<u8>, bool)> {
        let mut output = Vec::with_capacity(input.len());
        let modified = self.run(input, &mut output)?;
        Ok((output, modified))
    }

    /// Processes UTF-8 text
    pub fn process_str(&self, input: &str) -> Result<(String, bool)> {
        let (output, modified) = self.process_bytes(input.as_bytes())?;
        Ok((String::from_utf8_lossy(&output).into_owned(), modified))
    }
}
