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

//! Error handling for the stencil engine
//!
//! Errors fall into three families:
//! - [`ConfigError`]: static misconfiguration, raised before any byte is processed
//! - [`ExpressionEvaluationError`]: malformed conditions or failed coercions
//! - I/O failures on the source or target stream
//!
//! All of them are carried by [`Error`], the error type of a processing run.

use std::io;

use thiserror::Error;

use crate::convert::TypeTag;

/// Returns the last 32 characters of a string for error context
pub(crate) fn rcap(src: &str) -> &str {
    static CAP_AT: usize = 32;

    match src.char_indices().rev().nth(CAP_AT - 1) {
        Some((start, _)) if start > 0 => &src[start..],
        _ => src,
    }
}

/// Static misconfiguration of an operation or of the engine itself
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{operation} registers an empty token")]
    EmptyToken { operation: &'static str },

    #[error("unknown evaluator \"{0}\"")]
    UnknownEvaluator(String),

    #[error("invalid regex \"{pattern}\": {cause}")]
    InvalidRegex {
        pattern: String,
        #[source]
        cause: regex::Error,
    },

    #[error("variable format \"{0}\" must contain the {{0}} placeholder")]
    VariableFormat(String),

    #[error("{0} must be greater than zero")]
    ZeroSize(&'static str),

    #[error("{operation} needs at least one {role} token")]
    MissingToken {
        operation: &'static str,
        role: &'static str,
    },

    #[error("invalid {kind} format \"{format}\"")]
    InvalidFormat { kind: &'static str, format: String },
}

/// Failure while building or evaluating an expression tree
#[derive(Debug, Error)]
pub enum ExpressionEvaluationError {
    #[error("cannot convert {value} to {target}")]
    Conversion { value: String, target: TypeTag },

    #[error("{message} near \"{near}\"")]
    Syntax { message: String, near: String },

    #[error("no converter registered for {0}")]
    MissingConverter(TypeTag),

    #[error("arithmetic error: {0}")]
    Arithmetic(&'static str),
}

impl ExpressionEvaluationError {
    /// Creates a syntax error with the tail of the offending expression as context
    pub(crate) fn syntax(message: impl Into<String>, near: &str) -> Self {
        Self::Syntax {
            message: message.into(),
            near: rcap(near).to_string(),
        }
    }

    pub(crate) fn conversion(value: impl ToString, target: TypeTag) -> Self {
        Self::Conversion {
            value: value.to_string(),
            target,
        }
    }
}

/// Error type for a processing run
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("expression evaluation failed: {0}")]
    Expression(#[from] ExpressionEvaluationError),

    #[error("unbalanced conditional: {0}")]
    UnbalancedConditional(String),
}

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rcap_keeps_short_input() {
        assert_eq!(rcap("a && b"), "a && b");
    }

    #[test]
    fn rcap_keeps_last_32_characters() {
        let src = "x".repeat(10) + &"y".repeat(32);
        assert_eq!(rcap(&src), "y".repeat(32));
    }

    #[test]
    fn rcap_respects_char_boundaries() {
        let src = "é".repeat(40);
        assert_eq!(rcap(&src).chars().count(), 32);
    }

    #[test]
    fn syntax_error_reports_context() {
        let err = ExpressionEvaluationError::syntax("unexpected )", "a && )");
        assert_eq!(err.to_string(), "unexpected ) near \"a && )\"");
    }
}
