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

//! Per-encoding token tables
//!
//! Once a run has detected its stream encoding, every byte sequence the
//! operations and evaluators need is materialized in that encoding here: line
//! endings, horizontal whitespace and the variable table.

use std::{fmt, sync::Arc};

use crate::{encoding::Encoding, trie::SimpleTrie, value::Value, variables::VariableCollection};

/// Placeholder replaced by a variable name in the variable format
pub const VARIABLE_FORMAT_PLACEHOLDER: &str = "{0}";

/// One visible variable
pub struct VariableSlot {
    pub name: String,
    /// The raw name, as referenced from expressions
    pub key: Vec<u8>,
    /// The name inside the variable format, as expanded in content
    pub formatted_key: Vec<u8>,
    accessor: Box<dyn Fn() -> Value + Send + Sync>,
}

impl VariableSlot {
    pub fn value(&self) -> Value {
        (self.accessor)()
    }
}

impl fmt::Debug for VariableSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableSlot").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Byte forms of everything encoding dependent
#[derive(Debug)]
pub struct EncodingConfig {
    encoding: Encoding,
    pub line_endings: SimpleTrie,
    pub whitespace: SimpleTrie,
    variables: Vec<VariableSlot>,
}

impl EncodingConfig {
    /// Materializes tokens for `encoding`, binding an accessor to every visible variable
    pub fn new(encoding: Encoding, variables: &Arc<VariableCollection>, variable_format: &str) -> Self {
        let slots = variables
            .keys()
            .into_iter()
            .map(|name| {
                let scope = Arc::clone(variables);
                let lookup = name.clone();
                VariableSlot {
                    key: encoding.encode(&name),
                    formatted_key: encoding.encode(&variable_format.replace(VARIABLE_FORMAT_PLACEHOLDER, &name)),
                    accessor: Box::new(move || scope.get(&lookup).cloned().unwrap_or_default()),
                    name,
                }
            })
            .collect();
        Self {
            encoding,
            line_endings: SimpleTrie::from_tokens(["\r\n", "\n", "\r"].map(|t| encoding.encode(t))),
            whitespace: SimpleTrie::from_tokens([" ", "\t"].map(|t| encoding.encode(t))),
            variables: slots,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        self.encoding.encode(text)
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        self.encoding.decode(bytes)
    }

    pub fn variables(&self) -> &[VariableSlot] {
        &self.variables
    }

    /// Fetches the current value of the variable at `index`
    pub fn resolve(&self, index: usize) -> Value {
        self.variables.get(index).map(VariableSlot::value).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materializes_variable_keys() {
        let vars: VariableCollection = [("name", "App")].into_iter().collect();
        let config = EncodingConfig::new(Encoding::Utf16Le, &Arc::new(vars), "$({0})");
        let slot = &config.variables()[0];
        assert_eq!(slot.key, Encoding::Utf16Le.encode("name"));
        assert_eq!(slot.formatted_key, Encoding::Utf16Le.encode("$(name)"));
        assert_eq!(config.resolve(0), Value::from("App"));
        assert_eq!(config.resolve(9), Value::Null);
    }

    #[test]
    fn line_endings_in_encoding() {
        let config = EncodingConfig::new(Encoding::Utf8, &Arc::new(VariableCollection::new()), "{0}");
        assert_eq!(config.line_endings.match_suffix(b"a\r\n"), Some(2));
        assert_eq!(config.whitespace.max_length(), 1);
    }
}
