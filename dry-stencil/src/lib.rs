//! Conditional templates and token substitution over byte streams
//!
//! ```
//! use dry_stencil::{EngineConfig, Processor, VariableCollection};
//!
//! let config: EngineConfig = serde_json::from_str(r##"{
//!     "operations": [
//!         { "type": "conditionals", "if": ["#if"], "else": ["#else"], "endif": ["#endif"], "wholeLine": true },
//!         { "type": "variable-expansion" }
//!     ],
//!     "variableFormat": "$({0})"
//! }"##).unwrap();
//! let variables: VariableCollection = [("name", "stencil"), ("docs", "true")].into_iter().collect();
//! let processor = Processor::new(config, variables).unwrap();
//!
//! let (text, _) = processor.process_str("#if docs\nsee $(name)\n#else\nnothing\n#endif\n").unwrap();
//! assert_eq!(text, "see stencil\n");
//! ```

pub use dry_stencil_core::operations::{
    conditional::ConditionalConfig,
    macros::{MacroConfig, MacrosConfig},
    region::RegionConfig,
    replacement::ReplacementConfig,
};
pub use dry_stencil_core::{
    ConfigError, Converter, Encoding, EngineConfig, Error, EvaluatorKind, ExpressionEvaluationError,
    OperationProvider, Processor, ProcessorOptions, Result, TargetStream, TypeTag, Value, VariableCollection,
    evaluate_condition,
};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    fn processor(descriptor: serde_json::Value, variables: VariableCollection) -> Processor {
        let config: EngineConfig = serde_json::from_value(descriptor).unwrap();
        Processor::new(config, variables).unwrap()
    }

    fn hash_conditionals(extra: serde_json::Value) -> serde_json::Value {
        let mut conditionals = json!({
            "type": "conditionals",
            "if": ["#if"],
            "elseif": ["#elseif"],
            "else": ["#else"],
            "endif": ["#endif"],
        });
        if let (Some(target), Some(extra)) = (conditionals.as_object_mut(), extra.as_object()) {
            target.extend(extra.clone());
        }
        json!({ "operations": [conditionals] })
    }

    fn flags() -> VariableCollection {
        [("A", true), ("B", false), ("C", true)].into_iter().collect()
    }

    #[test]
    fn only_one_branch_survives() {
        let processor = processor(hash_conditionals(json!({})), flags());
        let (text, modified) = processor
            .process_str("#if B\none\n#elseif A\ntwo\n#elseif C\nthree\n#else\nfour\n#endif\n")
            .unwrap();
        assert_eq!(text, "\ntwo\n\n");
        assert!(modified);
    }

    #[test]
    fn whole_line_removes_marker_lines() {
        let processor = processor(hash_conditionals(json!({ "wholeLine": true })), flags());
        //language=c
        let input = "int x;\n    #if A && !B\n    x = 1;\n    #else\n    x = 2;\n    #endif\nreturn x;\n";
        let (text, _) = processor.process_str(input).unwrap();
        assert_eq!(text, "int x;\n    x = 1;\nreturn x;\n");
    }

    #[test]
    fn whole_line_keeps_crlf_endings() {
        let processor = processor(hash_conditionals(json!({ "wholeLine": true })), flags());
        let (text, _) = processor.process_str("a\r\n#if B\r\nb\r\n#endif\r\nc\r\n").unwrap();
        assert_eq!(text, "a\r\nc\r\n");
    }

    #[test]
    fn trim_strips_spaces_around_markers() {
        let processor = processor(hash_conditionals(json!({ "trim": true, "terminators": [";"] })), flags());
        let (text, _) = processor.process_str("[  #if A;\tyes  #endif  ]").unwrap();
        assert_eq!(text, "[yes]");
    }

    #[test]
    fn nested_blocks_balance() {
        let processor = processor(hash_conditionals(json!({ "wholeLine": true })), flags());
        let input = "\
#if B
#if A
hidden
#else
hidden too
#endif
#elseif C
#if B
no
#else
nested else
#endif
#endif
done
";
        assert_eq!(processor.process_str(input).unwrap().0, "nested else\ndone\n");
    }

    #[test]
    fn later_conditions_are_not_evaluated_after_a_taken_branch() {
        let processor = processor(hash_conditionals(json!({ "wholeLine": true })), flags());
        // `1 < "x"` cannot be converted and would fail if evaluated
        let input = "#if A\nfirst\n#elseif 1 < \"x\"\nsecond\n#endif\n";
        assert_eq!(processor.process_str(input).unwrap().0, "first\n");
    }

    #[test]
    fn malformed_condition_is_an_error() {
        let processor = processor(hash_conditionals(json!({})), flags());
        let result = processor.process_str("#if A &&\nx\n#endif\n");
        assert!(matches!(result, Err(Error::Expression(ExpressionEvaluationError::Syntax { .. }))));
    }

    #[test]
    fn inline_markup_with_terminators() {
        let processor = processor(
            json!({ "operations": [{
                "type": "conditionals",
                "if": ["{{if"],
                "elseif": ["{{elseif"],
                "else": ["{{else}}"],
                "endif": ["{{endif}}"],
                "terminators": ["}}"],
            }]}),
            VariableCollection::new(),
        );
        //language=html
        let input = r#"<p>{{if false}}A{{elseif true}}B{{else}}C{{endif}}</p>"#;
        assert_eq!(processor.process_str(input).unwrap().0, "<p>B</p>");
    }

    #[test]
    fn unbalanced_markup_is_tolerated_by_default() {
        let processor = processor(hash_conditionals(json!({})), flags());
        assert_eq!(processor.process_str("x #endif y").unwrap().0, "x  y");
        assert_eq!(processor.process_str("x #if B\ny").unwrap().0, "x ");
    }

    #[test]
    fn strict_mode_rejects_unbalanced_markup() {
        let processor = processor(hash_conditionals(json!({ "strict": true })), flags());
        assert!(matches!(
            processor.process_str("x #endif y"),
            Err(Error::UnbalancedConditional(_))
        ));
        assert!(matches!(
            processor.process_str("#if A\nopen\n"),
            Err(Error::UnbalancedConditional(_))
        ));
        assert!(processor.process_str("#if A\nclosed\n#endif\n").is_ok());
    }

    #[test]
    fn replacements_and_variables() {
        let variables: VariableCollection = [("project", "Stencil"), ("version", "1.2")].into_iter().collect();
        let processor = processor(
            json!({
                "variableFormat": "${{0}}",
                "operations": [
                    { "type": "replacements", "original": "Copyright", "replacement": "(c)" },
                    { "type": "variable-expansion" },
                ],
            }),
            variables,
        );
        let (text, modified) = processor.process_str("Copyright ${project} v${version} ${unknown}").unwrap();
        assert_eq!(text, "(c) Stencil v1.2 ${unknown}");
        assert!(modified);
    }

    #[test]
    fn excluded_regions_are_removed() {
        let processor = processor(
            json!({ "operations": [
                { "type": "region", "start": "//-:cnd", "end": "//+:cnd", "wholeLine": true },
            ]}),
            VariableCollection::new(),
        );
        let input = "keep\n//-:cnd\ndrop\n//-:cnd\ndrop nested\n//+:cnd\ndrop\n//+:cnd\nkeep too\n";
        assert_eq!(processor.process_str(input).unwrap().0, "keep\nkeep too\n");
    }

    #[test]
    fn included_regions_lose_only_their_markers() {
        let processor = processor(
            json!({ "operations": [
                { "type": "region", "start": "<!--", "end": "-->", "include": true },
            ]}),
            VariableCollection::new(),
        );
        assert_eq!(processor.process_str("a<!--b-->c").unwrap().0, "abc");
    }

    #[test]
    fn toggled_regions() {
        let processor = processor(
            json!({ "operations": [{ "type": "region", "start": "@@", "end": "@@" }]}),
            VariableCollection::new(),
        );
        assert_eq!(processor.process_str("a@@secret@@b@@more@@c").unwrap().0, "abc");
    }

    #[test]
    fn macros_feed_conditions_and_expansion() {
        let variables: VariableCollection = [("name", "My.App"), ("framework", "net8.0")].into_iter().collect();
        let processor = processor(
            json!({ "operations": [
                { "type": "macros", "macros": [
                    { "type": "regex", "variableName": "safeName", "source": "name",
                      "steps": [{ "regex": "\\.", "replacement": "_" }] },
                    { "type": "evaluate", "variableName": "modern",
                      "condition": "framework == \"NET8.0\" || framework == \"net9.0\"" },
                ]},
                { "type": "conditionals", "if": ["#if"], "else": ["#else"], "endif": ["#endif"], "wholeLine": true },
                { "type": "variable-expansion" },
            ]}),
            variables,
        );
        assert_eq!(processor.variables().get("modern"), Some(&Value::Bool(true)));
        let input = "package safeName;\n#if modern\nfile scoped\n#else\nblock scoped\n#endif\n";
        assert_eq!(processor.process_str(input).unwrap().0, "package My_App;\nfile scoped\n");
    }

    #[test]
    fn cpp2_evaluator_handles_arithmetic() {
        let variables: VariableCollection = [("port", 8080)].into_iter().collect();
        let processor = processor(
            hash_conditionals(json!({ "evaluator": "C++2", "wholeLine": true })),
            variables,
        );
        let input = "#if port % 2 == 0 && port / 10 > 800\neven\n#else\nodd\n#endif\n";
        assert_eq!(processor.process_str(input).unwrap().0, "even\n");
    }

    #[test]
    fn custom_converter() {
        fn yes_means_true(value: &Value) -> std::result::Result<Value, ExpressionEvaluationError> {
            Ok(Value::Bool(matches!(value, Value::String(s) if s.eq_ignore_ascii_case("yes")) || value == &Value::Bool(true)))
        }
        let mut converter = Converter::default();
        converter.register(TypeTag::Bool, yes_means_true);
        let config: EngineConfig = serde_json::from_value(hash_conditionals(json!({ "wholeLine": true }))).unwrap();
        let variables: VariableCollection = [("enabled", "yes")].into_iter().collect();
        let processor = Processor::with_converter(config, variables, converter).unwrap();
        assert_eq!(processor.process_str("#if enabled\non\n#endif\n").unwrap().0, "on\n");
    }

    #[test]
    fn standalone_conditions() {
        let variables = Arc::new(flags());
        let converter = Arc::new(Converter::default());
        assert!(evaluate_condition(EvaluatorKind::Cpp, "A && (B || C)", &variables, &converter).unwrap());
        assert!(!evaluate_condition(EvaluatorKind::Cpp2, "!A", &variables, &converter).unwrap());
    }

    #[test]
    fn runs_are_independent() {
        let processor = Arc::new(processor(hash_conditionals(json!({ "wholeLine": true })), flags()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let processor = Arc::clone(&processor);
                std::thread::spawn(move || processor.process_str("#if A\nyes\n#endif\n").unwrap().0)
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "yes\n");
        }
    }
}
