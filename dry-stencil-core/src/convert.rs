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

//! Converter registry
//!
//! Operators coerce their operands through a [`Converter`]: an explicit map from a
//! target [`TypeTag`] to a conversion function. A registry is built once, usually
//! with [`Converter::default`], shared by reference with every evaluator and never
//! mutated while a run is in progress. Custom conversions can be registered before
//! the registry is handed to a [`Processor`](crate::processor::Processor).

use std::{collections::HashMap, fmt::Display};

use crate::{error::ExpressionEvaluationError, value::Value};

/// Target type of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    Int,
    Float,
    String,
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
        })
    }
}

/// Converts a value into the variant named by the registered tag
pub type ConvertFn = fn(&Value) -> Result<Value, ExpressionEvaluationError>;

/// Registry of conversion functions keyed by target type
#[derive(Debug, Clone)]
pub struct Converter {
    converters: HashMap<TypeTag, ConvertFn>,
}

impl Default for Converter {
    fn default() -> Self {
        let mut converter = Self::empty();
        converter
            .register(TypeTag::Bool, to_bool)
            .register(TypeTag::Int, to_int)
            .register(TypeTag::Float, to_float)
            .register(TypeTag::String, to_string);
        converter
    }
}

impl Converter {
    /// Creates a registry without any conversion
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Registers a conversion, replacing any earlier one for the same tag
    pub fn register(&mut self, tag: TypeTag, convert: ConvertFn) -> &mut Self {
        self.converters.insert(tag, convert);
        self
    }

    pub fn convert(&self, value: &Value, tag: TypeTag) -> Result<Value, ExpressionEvaluationError> {
        let convert = self
            .converters
            .get(&tag)
            .ok_or(ExpressionEvaluationError::MissingConverter(tag))?;
        convert(value)
    }

    pub fn to_bool(&self, value: &Value) -> Result<bool, ExpressionEvaluationError> {
        match self.convert(value, TypeTag::Bool)? {
            Value::Bool(b) => Ok(b),
            other => Err(ExpressionEvaluationError::conversion(other.kind(), TypeTag::Bool)),
        }
    }

    pub fn to_i64(&self, value: &Value) -> Result<i64, ExpressionEvaluationError> {
        match self.convert(value, TypeTag::Int)? {
            Value::Int(i) => Ok(i),
            other => Err(ExpressionEvaluationError::conversion(other.kind(), TypeTag::Int)),
        }
    }

    /// Converts to a 32-bit integer, used for shift amounts
    pub fn to_i32(&self, value: &Value) -> Result<i32, ExpressionEvaluationError> {
        let wide = self.to_i64(value)?;
        i32::try_from(wide).map_err(|_| ExpressionEvaluationError::conversion(wide, TypeTag::Int))
    }

    pub fn to_f64(&self, value: &Value) -> Result<f64, ExpressionEvaluationError> {
        match self.convert(value, TypeTag::Float)? {
            Value::Float(x) => Ok(x),
            other => Err(ExpressionEvaluationError::conversion(other.kind(), TypeTag::Float)),
        }
    }

    pub fn to_text(&self, value: &Value) -> Result<String, ExpressionEvaluationError> {
        match self.convert(value, TypeTag::String)? {
            Value::String(s) => Ok(s),
            other => Err(ExpressionEvaluationError::conversion(other.kind(), TypeTag::String)),
        }
    }
}

fn to_bool(value: &Value) -> Result<Value, ExpressionEvaluationError> {
    Ok(Value::Bool(match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(x) => *x != 0.0,
        Value::String(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") {
                true
            } else if s.eq_ignore_ascii_case("false") {
                false
            } else {
                return Err(ExpressionEvaluationError::conversion(format!("\"{}\"", s), TypeTag::Bool));
            }
        }
    }))
}

fn to_int(value: &Value) -> Result<Value, ExpressionEvaluationError> {
    Ok(Value::Int(match value {
        Value::Null => 0,
        Value::Bool(b) => i64::from(*b),
        Value::Int(i) => *i,
        Value::Float(x) => {
            let rounded = x.round_ties_even();
            if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
                return Err(ExpressionEvaluationError::conversion(x, TypeTag::Int));
            }
            rounded as i64
        }
        Value::String(s) => {
            let s = s.trim();
            let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => i64::from_str_radix(hex, 16),
                None => s.parse(),
            };
            parsed.map_err(|_| ExpressionEvaluationError::conversion(format!("\"{}\"", s), TypeTag::Int))?
        }
    }))
}

fn to_float(value: &Value) -> Result<Value, ExpressionEvaluationError> {
    Ok(Value::Float(match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Int(i) => *i as f64,
        Value::Float(x) => *x,
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| ExpressionEvaluationError::conversion(format!("\"{}\"", s), TypeTag::Float))?,
    }))
}

fn to_string(value: &Value) -> Result<Value, ExpressionEvaluationError> {
    Ok(Value::String(value.to_string()))
}
