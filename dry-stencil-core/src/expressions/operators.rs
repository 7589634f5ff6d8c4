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

//! Operator semantics shared by the evaluators
//!
//! Every function here has the shape of a tree evaluation callback. Operands are
//! always fully evaluated before these run, so `and`/`or` never short-circuit and a
//! conversion failure on either side is reported.

use std::cmp::Ordering;

use crate::{convert::Converter, error::ExpressionEvaluationError, value::Value};

type Outcome = Result<Value, ExpressionEvaluationError>;

pub fn not(converter: &Converter, operand: Value) -> Outcome {
    Ok(Value::Bool(!converter.to_bool(&operand)?))
}

pub fn and(converter: &Converter, left: Value, right: Value) -> Outcome {
    let (left, right) = (converter.to_bool(&left)?, converter.to_bool(&right)?);
    Ok(Value::Bool(left && right))
}

pub fn or(converter: &Converter, left: Value, right: Value) -> Outcome {
    let (left, right) = (converter.to_bool(&left)?, converter.to_bool(&right)?);
    Ok(Value::Bool(left || right))
}

pub fn xor(converter: &Converter, left: Value, right: Value) -> Outcome {
    Ok(Value::Bool(converter.to_bool(&left)? ^ converter.to_bool(&right)?))
}

/// Strings compare without regard to case, numbers compare by value
fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(a), Value::String(b)) => a.to_lowercase() == b.to_lowercase(),
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
        _ => left == right,
    }
}

pub fn equal_to(_: &Converter, left: Value, right: Value) -> Outcome {
    Ok(Value::Bool(equals(&left, &right)))
}

pub fn not_equal_to(_: &Converter, left: Value, right: Value) -> Outcome {
    Ok(Value::Bool(!equals(&left, &right)))
}

fn compare(converter: &Converter, left: &Value, right: &Value) -> Result<Option<Ordering>, ExpressionEvaluationError> {
    Ok(converter.to_f64(left)?.partial_cmp(&converter.to_f64(right)?))
}

pub fn greater_than(converter: &Converter, left: Value, right: Value) -> Outcome {
    Ok(Value::Bool(compare(converter, &left, &right)? == Some(Ordering::Greater)))
}

pub fn greater_than_or_equal_to(converter: &Converter, left: Value, right: Value) -> Outcome {
    let ordering = compare(converter, &left, &right)?;
    Ok(Value::Bool(matches!(ordering, Some(Ordering::Greater | Ordering::Equal))))
}

pub fn less_than(converter: &Converter, left: Value, right: Value) -> Outcome {
    Ok(Value::Bool(compare(converter, &left, &right)? == Some(Ordering::Less)))
}

pub fn less_than_or_equal_to(converter: &Converter, left: Value, right: Value) -> Outcome {
    let ordering = compare(converter, &left, &right)?;
    Ok(Value::Bool(matches!(ordering, Some(Ordering::Less | Ordering::Equal))))
}

pub fn bitwise_and(converter: &Converter, left: Value, right: Value) -> Outcome {
    Ok(Value::Int(converter.to_i64(&left)? & converter.to_i64(&right)?))
}

pub fn bitwise_or(converter: &Converter, left: Value, right: Value) -> Outcome {
    Ok(Value::Int(converter.to_i64(&left)? | converter.to_i64(&right)?))
}

/// The amount wraps at 64 like the hardware shift does
pub fn left_shift(converter: &Converter, left: Value, right: Value) -> Outcome {
    let amount = converter.to_i32(&right)?;
    Ok(Value::Int(converter.to_i64(&left)?.wrapping_shl(amount as u32)))
}

pub fn right_shift(converter: &Converter, left: Value, right: Value) -> Outcome {
    let amount = converter.to_i32(&right)?;
    Ok(Value::Int(converter.to_i64(&left)?.wrapping_shr(amount as u32)))
}

fn is_integral(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Bool(_) | Value::Int(_))
}

/// Integer arithmetic when both sides are integral, floating point otherwise
fn arithmetic(
    converter: &Converter,
    left: Value,
    right: Value,
    integral: fn(i64, i64) -> Option<i64>,
    floating: fn(f64, f64) -> f64,
    failure: &'static str,
) -> Outcome {
    if is_integral(&left) && is_integral(&right) {
        let (a, b) = (converter.to_i64(&left)?, converter.to_i64(&right)?);
        integral(a, b)
            .map(Value::Int)
            .ok_or(ExpressionEvaluationError::Arithmetic(failure))
    } else {
        Ok(Value::Float(floating(converter.to_f64(&left)?, converter.to_f64(&right)?)))
    }
}

/// Adds numbers, concatenates when either side is a string
pub fn add(converter: &Converter, left: Value, right: Value) -> Outcome {
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return Ok(Value::String(converter.to_text(&left)? + &converter.to_text(&right)?));
    }
    arithmetic(converter, left, right, i64::checked_add, |a, b| a + b, "addition overflow")
}

pub fn subtract(converter: &Converter, left: Value, right: Value) -> Outcome {
    arithmetic(converter, left, right, i64::checked_sub, |a, b| a - b, "subtraction overflow")
}

pub fn multiply(converter: &Converter, left: Value, right: Value) -> Outcome {
    arithmetic(converter, left, right, i64::checked_mul, |a, b| a * b, "multiplication overflow")
}

pub fn divide(converter: &Converter, left: Value, right: Value) -> Outcome {
    if is_integral(&left) && is_integral(&right) && converter.to_i64(&right)? == 0 {
        return Err(ExpressionEvaluationError::Arithmetic("division by zero"));
    }
    arithmetic(converter, left, right, i64::checked_div, |a, b| a / b, "division overflow")
}

pub fn remainder(converter: &Converter, left: Value, right: Value) -> Outcome {
    if is_integral(&left) && is_integral(&right) && converter.to_i64(&right)? == 0 {
        return Err(ExpressionEvaluationError::Arithmetic("division by zero"));
    }
    arithmetic(converter, left, right, i64::checked_rem, |a, b| a % b, "remainder overflow")
}

pub fn negate(converter: &Converter, operand: Value) -> Outcome {
    match operand {
        Value::Float(x) => Ok(Value::Float(-x)),
        other => converter
            .to_i64(&other)?
            .checked_neg()
            .map(Value::Int)
            .ok_or(ExpressionEvaluationError::Arithmetic("negation overflow")),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Value::from("Foo"), Value::from("foo"), true)]
    #[case(Value::from(1), Value::from(1.0), true)]
    #[case(Value::from("1"), Value::from(1), false)]
    #[case(Value::Null, Value::Null, true)]
    #[case(Value::from(true), Value::from(true), true)]
    fn equality(#[case] left: Value, #[case] right: Value, #[case] expected: bool) {
        let converter = Converter::default();
        assert_eq!(equal_to(&converter, left.clone(), right.clone()).unwrap(), Value::Bool(expected));
        assert_eq!(not_equal_to(&converter, left, right).unwrap(), Value::Bool(!expected));
    }

    #[test]
    fn not_treats_null_as_false() {
        assert_eq!(not(&Converter::default(), Value::Null).unwrap(), Value::Bool(true));
    }

    #[test]
    fn ordering_converts_strings_to_numbers() {
        let converter = Converter::default();
        assert_eq!(less_than(&converter, Value::from("1.5"), Value::from(2)).unwrap(), Value::Bool(true));
        assert!(greater_than(&converter, Value::from("abc"), Value::from(2)).is_err());
    }

    #[test]
    fn nan_is_unordered() {
        let converter = Converter::default();
        let nan = Value::Float(f64::NAN);
        assert_eq!(greater_than_or_equal_to(&converter, nan.clone(), nan).unwrap(), Value::Bool(false));
    }

    #[test]
    fn bitwise_and_shifts() {
        let converter = Converter::default();
        assert_eq!(bitwise_and(&converter, Value::from(6), Value::from(3)).unwrap(), Value::Int(2));
        assert_eq!(bitwise_or(&converter, Value::from(4), Value::from("0x1")).unwrap(), Value::Int(5));
        assert_eq!(left_shift(&converter, Value::from(1), Value::from(4)).unwrap(), Value::Int(16));
        assert_eq!(right_shift(&converter, Value::from(-16), Value::from(2)).unwrap(), Value::Int(-4));
    }

    #[test]
    fn logical_operators_coerce_both_sides() {
        let converter = Converter::default();
        assert_eq!(and(&converter, Value::from(1), Value::from("true")).unwrap(), Value::Bool(true));
        assert_eq!(xor(&converter, Value::from(true), Value::from(true)).unwrap(), Value::Bool(false));
        assert!(or(&converter, Value::from(true), Value::from("maybe")).is_err());
    }

    #[test]
    fn arithmetic_keeps_integers_integral() {
        let converter = Converter::default();
        assert_eq!(add(&converter, Value::from(2), Value::from(3)).unwrap(), Value::Int(5));
        assert_eq!(add(&converter, Value::from(2), Value::from(0.5)).unwrap(), Value::Float(2.5));
        assert_eq!(add(&converter, Value::from("v"), Value::from(2)).unwrap(), Value::from("v2"));
        assert_eq!(remainder(&converter, Value::from(7), Value::from(4)).unwrap(), Value::Int(3));
        assert_eq!(negate(&converter, Value::from(3)).unwrap(), Value::Int(-3));
    }

    #[test]
    fn division_by_zero_fails() {
        let converter = Converter::default();
        let err = divide(&converter, Value::from(1), Value::from(0)).unwrap_err();
        assert!(matches!(err, ExpressionEvaluationError::Arithmetic(_)));
        assert!(add(&converter, Value::Int(i64::MAX), Value::from(1)).is_err());
    }
}
