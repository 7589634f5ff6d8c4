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

//! Condition evaluators
//!
//! Two vocabularies are available, selected by name in the conditional
//! configuration:
//!
//! - `C++` (alias `cpp`): logical, comparison and bitwise operators with the
//!   precedence documented in [`cpp`]
//! - `C++2` (alias `cpp2`): the same plus arithmetic with C precedence, built on
//!   the generic [`builder`]
//!
//! Both read a condition straight from a [`Scanner`](lexer::Scanner) and stop at
//! the end of the line or at a configured terminator.

pub mod builder;
pub mod cpp;
pub mod cpp2;
pub mod lexer;
pub mod operators;
pub mod tree;

use std::{str::FromStr, sync::Arc};

use crate::{
    convert::Converter,
    encoding::Encoding,
    error::{ConfigError, Result},
    processor::encoding_config::{EncodingConfig, VARIABLE_FORMAT_PLACEHOLDER},
    variables::VariableCollection,
};
use cpp::CppEvaluator;
use cpp2::Cpp2Evaluator;
use lexer::{Scanner, SliceScanner};

/// Name of the evaluator used when none is configured
pub const DEFAULT_EVALUATOR: &str = "C++";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluatorKind {
    #[default]
    Cpp,
    Cpp2,
}

impl FromStr for EvaluatorKind {
    type Err = ConfigError;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "c++" | "cpp" => Ok(Self::Cpp),
            "c++2" | "cpp2" => Ok(Self::Cpp2),
            _ => Err(ConfigError::UnknownEvaluator(name.to_string())),
        }
    }
}

/// An evaluator materialized for one run
#[derive(Debug, Clone)]
pub enum ConditionEvaluator {
    Cpp(CppEvaluator),
    Cpp2(Cpp2Evaluator),
}

impl ConditionEvaluator {
    pub fn new(
        kind: EvaluatorKind,
        config: &Arc<EncodingConfig>,
        converter: &Arc<Converter>,
        terminators: &[String],
    ) -> Self {
        match kind {
            EvaluatorKind::Cpp => Self::Cpp(CppEvaluator::new(config, converter, terminators)),
            EvaluatorKind::Cpp2 => Self::Cpp2(Cpp2Evaluator::new(config, converter, terminators)),
        }
    }

    pub fn evaluate(&self, scanner: &mut dyn Scanner) -> Result<bool> {
        match self {
            Self::Cpp(evaluator) => evaluator.evaluate(scanner),
            Self::Cpp2(evaluator) => evaluator.evaluate(scanner),
        }
    }
}

/// Evaluates a standalone condition against a variable collection
pub fn evaluate_condition(
    kind: EvaluatorKind,
    condition: &str,
    variables: &Arc<VariableCollection>,
    converter: &Arc<Converter>,
) -> Result<bool> {
    let config = Arc::new(EncodingConfig::new(Encoding::Utf8, variables, VARIABLE_FORMAT_PLACEHOLDER));
    let evaluator = ConditionEvaluator::new(kind, &config, converter, &[]);
    evaluator.evaluate(&mut SliceScanner::new(condition.as_bytes()))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::value::Value;

    #[rstest]
    #[case("C++", EvaluatorKind::Cpp)]
    #[case("cpp", EvaluatorKind::Cpp)]
    #[case("C++2", EvaluatorKind::Cpp2)]
    #[case("CPP2", EvaluatorKind::Cpp2)]
    fn parses_evaluator_names(#[case] name: &str, #[case] kind: EvaluatorKind) {
        assert_eq!(name.parse::<EvaluatorKind>().unwrap(), kind);
    }

    #[test]
    fn rejects_unknown_evaluator() {
        let err = "VB".parse::<EvaluatorKind>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEvaluator(name) if name == "VB"));
    }

    #[test]
    fn evaluates_standalone_conditions() {
        let vars: VariableCollection = [("ENV", Value::from("prod")), ("REPLICAS", Value::from(3))]
            .into_iter()
            .collect();
        let vars = Arc::new(vars);
        let converter = Arc::new(Converter::default());
        assert!(evaluate_condition(EvaluatorKind::Cpp, "ENV == \"PROD\"", &vars, &converter).unwrap());
        assert!(evaluate_condition(EvaluatorKind::Cpp2, "REPLICAS * 2 > 5", &vars, &converter).unwrap());
        assert!(!evaluate_condition(EvaluatorKind::Cpp, "REPLICAS > 5", &vars, &converter).unwrap());
    }
}
