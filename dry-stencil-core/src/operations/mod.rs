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

//! Configurable rewrite operations
//!
//! An [`OperationProvider`] is the static, serializable description of an
//! operation as it appears in a template descriptor. Before each run it is
//! materialized in the detected encoding into an [`Operation`], which owns the
//! tokens it wants matched and handles those matches against the
//! [`ProcessorState`].

pub mod conditional;
pub mod expand_variables;
pub mod macros;
pub mod region;
pub mod replacement;
pub mod whitespace;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    convert::Converter,
    error::{ConfigError, Result},
    processor::{encoding_config::EncodingConfig, state::ProcessorState},
};
use conditional::{Conditional, ConditionalConfig};
use expand_variables::ExpandVariables;
use macros::MacrosConfig;
use region::{Region, RegionConfig};
use replacement::{Replacement, ReplacementConfig};

/// A materialized operation taking part in one run
pub trait Operation: Send {
    /// Byte sequences this operation handles, in the stream encoding
    fn tokens(&self) -> &[Vec<u8>];

    /// Handles a match of `tokens()[token]`
    ///
    /// The cursor sits right after the matched token and every byte before it has
    /// been written. Returns the number of bytes written to the target.
    fn handle_match(&mut self, state: &mut ProcessorState<'_>, token: usize) -> Result<usize>;

    /// Called once the source is exhausted
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Serializable description of an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OperationProvider {
    Conditionals(ConditionalConfig),
    Replacements(ReplacementConfig),
    Region(RegionConfig),
    VariableExpansion,
    Macros(MacrosConfig),
}

impl OperationProvider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Conditionals(_) => "conditionals",
            Self::Replacements(_) => "replacements",
            Self::Region(_) => "region",
            Self::VariableExpansion => "variable-expansion",
            Self::Macros(_) => "macros",
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match self {
            Self::Conditionals(config) => config.validate(),
            Self::Replacements(config) => config.validate(),
            Self::Region(config) => config.validate(),
            Self::VariableExpansion => Ok(()),
            Self::Macros(config) => config.validate(),
        }
    }

    /// Builds the operation for a run in the encoding of `config`
    ///
    /// Macros only contribute variables and materialize to nothing.
    pub fn materialize(
        &self,
        config: &Arc<EncodingConfig>,
        converter: &Arc<Converter>,
    ) -> std::result::Result<Option<Box<dyn Operation>>, ConfigError> {
        let operation: Box<dyn Operation> = match self {
            Self::Conditionals(settings) => Box::new(Conditional::new(settings, config, converter)?),
            Self::Replacements(settings) => Box::new(Replacement::new(settings, config)),
            Self::Region(settings) => Box::new(Region::new(settings, config)),
            Self::VariableExpansion => Box::new(ExpandVariables::new(config)),
            Self::Macros(_) => return Ok(None),
        };
        Ok(Some(operation))
    }
}

/// Checks that no token of `operation` is an empty string
pub(crate) fn require_non_empty<'a>(
    operation: &'static str,
    tokens: impl IntoIterator<Item = &'a String>,
) -> std::result::Result<(), ConfigError> {
    if tokens.into_iter().any(String::is_empty) {
        return Err(ConfigError::EmptyToken { operation });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserializes_tagged_providers() {
        let providers: Vec<OperationProvider> = serde_json::from_value(json!([
            { "type": "replacements", "original": "Company.Product", "replacement": "Acme.Rocket" },
            { "type": "variable-expansion" },
            { "type": "region", "start": "#begin", "end": "#end" },
        ]))
        .unwrap();
        assert_eq!(
            providers.iter().map(OperationProvider::name).collect::<Vec<_>>(),
            ["replacements", "variable-expansion", "region"]
        );
    }

    #[test]
    fn rejects_unknown_kind() {
        let result = serde_json::from_value::<OperationProvider>(json!({ "type": "include" }));
        assert!(result.is_err());
    }

    #[test]
    fn validates_empty_tokens() {
        let provider: OperationProvider =
            serde_json::from_value(json!({ "type": "replacements", "original": "", "replacement": "x" })).unwrap();
        assert!(matches!(
            provider.validate(),
            Err(ConfigError::EmptyToken {
                operation: "replacements"
            })
        ));
    }
}
