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

//! Computed variables
//!
//! Macros run once, when a processor is created, and add their results as a new
//! scope layered over the caller's variables. They run in order, so a macro can
//! read the output of an earlier one.

use std::{fmt::Write, sync::Arc};

use chrono::{
    Local, Utc,
    format::{Item, StrftimeItems},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
    convert::Converter,
    error::{ConfigError, Result},
    expressions::{DEFAULT_EVALUATOR, EvaluatorKind, evaluate_condition},
    value::Value,
    variables::VariableCollection,
};

fn default_evaluator() -> String {
    DEFAULT_EVALUATOR.to_string()
}

fn default_guid_format() -> char {
    'D'
}

fn default_now_format() -> String {
    "%Y-%m-%dT%H:%M:%S%:z".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacrosConfig {
    pub macros: Vec<MacroConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MacroConfig {
    /// A fixed value
    Constant {
        #[serde(rename = "variableName")]
        variable_name: String,
        value: Value,
    },
    /// Whether a condition holds
    Evaluate {
        #[serde(rename = "variableName")]
        variable_name: String,
        condition: String,
        #[serde(default = "default_evaluator")]
        evaluator: String,
    },
    /// A source variable rewritten by regex replacements applied in order
    Regex {
        #[serde(rename = "variableName")]
        variable_name: String,
        source: String,
        steps: Vec<RegexStep>,
    },
    /// A source variable in upper or lower case
    Casing {
        #[serde(rename = "variableName")]
        variable_name: String,
        source: String,
        #[serde(rename = "toLower", default)]
        to_lower: bool,
    },
    /// The value of the first case whose condition holds
    Switch {
        #[serde(rename = "variableName")]
        variable_name: String,
        #[serde(default = "default_evaluator")]
        evaluator: String,
        cases: Vec<SwitchCase>,
    },
    /// A random UUID, formatted as `N`, `D`, `B` or `P`
    Guid {
        #[serde(rename = "variableName")]
        variable_name: String,
        #[serde(default = "default_guid_format")]
        format: char,
    },
    /// The current time in strftime format
    Now {
        #[serde(rename = "variableName")]
        variable_name: String,
        #[serde(default = "default_now_format")]
        format: String,
        #[serde(default)]
        utc: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexStep {
    pub regex: String,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// A case without condition always matches
    #[serde(default)]
    pub condition: Option<String>,
    pub value: Value,
}

fn compile(pattern: &str) -> std::result::Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|cause| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        cause,
    })
}

fn check_now_format(format: &str) -> std::result::Result<(), ConfigError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidFormat {
            kind: "date",
            format: format.to_string(),
        });
    }
    Ok(())
}

fn format_guid(guid: Uuid, format: char) -> std::result::Result<String, ConfigError> {
    Ok(match format.to_ascii_uppercase() {
        'N' => guid.simple().to_string(),
        'D' => guid.hyphenated().to_string(),
        'B' => guid.braced().to_string(),
        'P' => format!("({})", guid.hyphenated()),
        _ => {
            return Err(ConfigError::InvalidFormat {
                kind: "guid",
                format: format.to_string(),
            });
        }
    })
}

impl MacroConfig {
    pub fn variable_name(&self) -> &str {
        match self {
            Self::Constant { variable_name, .. }
            | Self::Evaluate { variable_name, .. }
            | Self::Regex { variable_name, .. }
            | Self::Casing { variable_name, .. }
            | Self::Switch { variable_name, .. }
            | Self::Guid { variable_name, .. }
            | Self::Now { variable_name, .. } => variable_name,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match self {
            Self::Evaluate { evaluator, .. } | Self::Switch { evaluator, .. } => {
                evaluator.parse::<EvaluatorKind>()?;
            }
            Self::Regex { steps, .. } => {
                for step in steps {
                    compile(&step.regex)?;
                }
            }
            Self::Guid { format, .. } => {
                format_guid(Uuid::nil(), *format)?;
            }
            Self::Now { format, .. } => check_now_format(format)?,
            Self::Constant { .. } | Self::Casing { .. } => {}
        }
        Ok(())
    }

    /// Computes the value against the variables visible so far
    pub fn compute(&self, variables: &Arc<VariableCollection>, converter: &Arc<Converter>) -> Result<Value> {
        let text_of = |name: &str| -> Result<String> {
            let value = variables.get(name).cloned().unwrap_or_default();
            Ok(converter.to_text(&value)?)
        };
        Ok(match self {
            Self::Constant { value, .. } => value.clone(),
            Self::Evaluate {
                condition, evaluator, ..
            } => Value::Bool(evaluate_condition(evaluator.parse()?, condition, variables, converter)?),
            Self::Regex { source, steps, .. } => {
                let mut text = text_of(source)?;
                for step in steps {
                    text = compile(&step.regex)?.replace_all(&text, step.replacement.as_str()).into_owned();
                }
                Value::String(text)
            }
            Self::Casing { source, to_lower, .. } => {
                let text = text_of(source)?;
                Value::String(if *to_lower { text.to_lowercase() } else { text.to_uppercase() })
            }
            Self::Switch { evaluator, cases, .. } => {
                let kind = evaluator.parse()?;
                let mut selected = Value::Null;
                for case in cases {
                    let matched = match &case.condition {
                        Some(condition) => evaluate_condition(kind, condition, variables, converter)?,
                        None => true,
                    };
                    if matched {
                        selected = case.value.clone();
                        break;
                    }
                }
                selected
            }
            Self::Guid { format, .. } => Value::String(format_guid(Uuid::new_v4(), *format)?),
            Self::Now { format, utc, .. } => {
                check_now_format(format)?;
                let mut text = String::new();
                let written = if *utc {
                    write!(text, "{}", Utc::now().format(format))
                } else {
                    write!(text, "{}", Local::now().format(format))
                };
                written.map_err(|_| ConfigError::InvalidFormat {
                    kind: "date",
                    format: format.clone(),
                })?;
                Value::String(text)
            }
        })
    }
}

impl MacrosConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.macros.iter().try_for_each(MacroConfig::validate)
    }

    /// Layers the computed variables over `variables`
    pub fn apply(&self, variables: Arc<VariableCollection>, converter: &Arc<Converter>) -> Result<Arc<VariableCollection>> {
        let mut scope = VariableCollection::with_parent(variables);
        for entry in &self.macros {
            let value = entry.compute(&Arc::new(scope.clone()), converter)?;
            debug!(variable = entry.variable_name(), %value, "macro computed");
            scope.set(entry.variable_name(), value);
        }
        Ok(Arc::new(scope))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn apply(macros: serde_json::Value, variables: VariableCollection) -> Result<Arc<VariableCollection>> {
        let config: MacrosConfig = serde_json::from_value(json!({ "macros": macros })).unwrap();
        config.validate()?;
        config.apply(Arc::new(variables), &Arc::new(Converter::default()))
    }

    #[test]
    fn computes_in_order() {
        let vars: VariableCollection = [("name", "My.Web-App")].into_iter().collect();
        let scope = apply(
            json!([
                { "type": "regex", "variableName": "safe", "source": "name",
                  "steps": [{ "regex": "[.-]", "replacement": "_" }] },
                { "type": "casing", "variableName": "lower", "source": "safe", "toLower": true },
                { "type": "constant", "variableName": "port", "value": 8080 },
                { "type": "evaluate", "variableName": "high", "condition": "port > 1024" },
            ]),
            vars,
        )
        .unwrap();
        assert_eq!(scope.get("safe"), Some(&Value::from("My_Web_App")));
        assert_eq!(scope.get("lower"), Some(&Value::from("my_web_app")));
        assert_eq!(scope.get("port"), Some(&Value::Int(8080)));
        assert_eq!(scope.get("high"), Some(&Value::Bool(true)));
        assert_eq!(scope.get("name"), Some(&Value::from("My.Web-App")));
    }

    #[test]
    fn switch_takes_first_matching_case() {
        let vars: VariableCollection = [("os", "linux")].into_iter().collect();
        let scope = apply(
            json!([{ "type": "switch", "variableName": "shell", "cases": [
                { "condition": "os == \"windows\"", "value": "cmd" },
                { "condition": "os == \"LINUX\"", "value": "bash" },
                { "value": "sh" },
            ]}]),
            vars,
        )
        .unwrap();
        assert_eq!(scope.get("shell"), Some(&Value::from("bash")));
    }

    #[test]
    fn formats_guids() {
        let scope = apply(
            json!([
                { "type": "guid", "variableName": "n", "format": "N" },
                { "type": "guid", "variableName": "b", "format": "B" },
                { "type": "guid", "variableName": "d" },
            ]),
            VariableCollection::new(),
        )
        .unwrap();
        let length = |name: &str| scope.get(name).and_then(Value::as_str).map(str::len);
        assert_eq!(length("n"), Some(32));
        assert_eq!(length("b"), Some(38));
        assert_eq!(length("d"), Some(36));
    }

    #[test]
    fn formats_current_time() {
        let scope = apply(
            json!([{ "type": "now", "variableName": "year", "format": "%Y", "utc": true }]),
            VariableCollection::new(),
        )
        .unwrap();
        let year = scope.get("year").and_then(Value::as_str).unwrap();
        assert_eq!(year.len(), 4);
    }

    #[test]
    fn rejects_invalid_configuration() {
        let bad_regex = apply(
            json!([{ "type": "regex", "variableName": "x", "source": "y", "steps": [{ "regex": "(", "replacement": "" }] }]),
            VariableCollection::new(),
        );
        assert!(matches!(
            bad_regex,
            Err(crate::error::Error::Config(ConfigError::InvalidRegex { .. }))
        ));
        let bad_guid = apply(
            json!([{ "type": "guid", "variableName": "g", "format": "X" }]),
            VariableCollection::new(),
        );
        assert!(matches!(bad_guid, Err(crate::error::Error::Config(ConfigError::InvalidFormat { .. }))));
        let bad_date = apply(
            json!([{ "type": "now", "variableName": "t", "format": "%Q" }]),
            VariableCollection::new(),
        );
        assert!(bad_date.is_err());
    }
}
