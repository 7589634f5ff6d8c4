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

//! Dynamic scalar values
//!
//! Variables, literals in conditions and the results of evaluating an expression
//! tree are all [`Value`]s. Conversions between the variants go through the
//! [`Converter`](crate::convert::Converter) registry.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A scalar value flowing through the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Infers the type of a bare literal found in an expression
    ///
    /// - `"text"` is a string with the quotes stripped
    /// - `true`/`false` and `null` are matched case-insensitively
    /// - `0x` prefixed numerals are hexadecimal integers
    /// - numerals containing `.` are floats, other numerals integers
    /// - anything else is null
    pub fn parse_literal(text: &str) -> Self {
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            return Self::String(text[1..text.len() - 1].to_string());
        }
        if text.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if text.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        if text.eq_ignore_ascii_case("null") {
            return Self::Null;
        }
        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            return i64::from_str_radix(hex, 16).map(Self::Int).unwrap_or(Self::Null);
        }
        if text.contains('.') {
            return text.parse().map(Self::Float).unwrap_or(Self::Null);
        }
        text.parse().map(Self::Int).unwrap_or(Self::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("\"Foo Bar\"", Value::String("Foo Bar".into()))]
    #[case("\"\"", Value::String(String::new()))]
    #[case("TRUE", Value::Bool(true))]
    #[case("False", Value::Bool(false))]
    #[case("NULL", Value::Null)]
    #[case("0x1F", Value::Int(31))]
    #[case("0xZZ", Value::Null)]
    #[case("1.5", Value::Float(1.5))]
    #[case("42", Value::Int(42))]
    #[case("-7", Value::Int(-7))]
    #[case("windows", Value::Null)]
    fn infers_literal_types(#[case] text: &str, #[case] expected: Value) {
        assert_eq!(Value::parse_literal(text), expected);
    }

    #[test]
    fn displays_as_template_text() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(3).to_string(), "3");
        assert_eq!(Value::from("x").to_string(), "x");
    }

    #[test]
    fn deserializes_untagged() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 1, 2.5, "s"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(1),
                Value::Float(2.5),
                Value::from("s")
            ]
        );
    }
}
