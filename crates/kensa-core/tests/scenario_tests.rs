//! End-to-end scenarios for the shipped rules, run through the analysis engine
//! with configuration parsed from `kensa.toml` text.

use std::fs;
use std::path::Path;

use insta::assert_json_snapshot;
use kensa_core::config::{Config, load_config};
use kensa_core::{AnalysisEngine, Diagnostic};
use serde::Serialize;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/fixtures");

fn read_fixture(relative_path: &str) -> String {
    let path = Path::new(FIXTURES_DIR).join(relative_path);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e))
}

fn engine(config: &str) -> AnalysisEngine {
    let config: Config = toml::from_str(config).expect("valid config");
    AnalysisEngine::with_config(&config)
}

fn analyze(filename: &str, source: &str) -> Vec<Diagnostic> {
    AnalysisEngine::new().analyze_source(filename, source)
}

fn message_ids(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics
        .iter()
        .filter_map(|d| d.message_id.as_deref())
        .collect()
}

/// Text covered by a single-line diagnostic.
fn covered_text(source: &str, diagnostic: &Diagnostic) -> String {
    let line = source
        .lines()
        .nth(diagnostic.line - 1)
        .expect("diagnostic line exists");
    line.chars()
        .skip(diagnostic.column - 1)
        .take(diagnostic.end_column - diagnostic.column)
        .collect()
}

#[derive(Serialize)]
struct Finding<'d> {
    rule: &'d str,
    message_id: Option<&'d str>,
    message: &'d str,
    line: usize,
    column: usize,
    end_column: usize,
}

fn findings(diagnostics: &[Diagnostic]) -> Vec<Finding<'_>> {
    diagnostics
        .iter()
        .map(|d| Finding {
            rule: &d.rule_id,
            message_id: d.message_id.as_deref(),
            message: &d.message,
            line: d.line,
            column: d.column,
            end_column: d.end_column,
        })
        .collect()
}

mod no_unused_vars {
    use super::*;

    #[test]
    fn uninitialized_variable_is_reported() {
        let diagnostics = analyze("scenario.js", "let x; console.log('hi');");

        assert_json_snapshot!(findings(&diagnostics), @r#"
        [
          {
            "rule": "Q001",
            "message_id": "unusedVar",
            "message": "'x' is defined but never used.",
            "line": 1,
            "column": 5,
            "end_column": 6
          }
        ]
        "#);
    }

    #[test]
    fn used_parameter_is_not_reported() {
        let diagnostics = analyze("scenario.js", "function f(a) { return a; }\nf(1);");
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
    }

    #[test]
    fn only_unused_array_element_is_reported() {
        let source = "const [a, b] = pair; use(a);";
        let diagnostics = analyze("scenario.js", source);

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with("'b' "));
        assert_eq!(covered_text(source, &diagnostics[0]), "b");
    }

    #[test]
    fn array_element_ignore_pattern() {
        let engine = engine(
            r#"
[rules.options.no-unused-vars]
destructuredArrayIgnorePattern = "^_"
"#,
        );
        let diagnostics = engine.analyze_source("scenario.js", "const [_a, b] = pair; use(b);");
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
    }

    #[test]
    fn caught_errors_follow_configuration() {
        let source = "try {} catch (e) {}";

        let diagnostics = analyze("scenario.js", source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "'e' is defined but never used.");

        let engine = engine(
            r#"
[rules.options.no-unused-vars]
caughtErrors = "none"
"#,
        );
        assert!(engine.analyze_source("scenario.js", source).is_empty());
    }

    #[test]
    fn configured_pattern_is_named_in_message() {
        let engine = engine(
            r#"
[rules.options.Q001]
varsIgnorePattern = "^ignored"
"#,
        );
        let diagnostics = engine.analyze_source("scenario.js", "let value = 1;");

        assert_eq!(
            diagnostics[0].message,
            "'value' is assigned a value but never used. Allowed unused vars must match /^ignored/u."
        );
    }

    #[test]
    fn severity_override_applies() {
        let engine = engine(
            r#"
[rules.severity]
no-unused-vars = "error"
"#,
        );
        let diagnostics = engine.analyze_source("scenario.js", "let x;");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            serde_json::to_value(&diagnostics[0].severity).expect("serializable"),
            serde_json::json!("error")
        );
    }

    #[test]
    fn fixture_reports_only_dead_bindings() {
        let source = read_fixture("unused/mixed.ts");
        let diagnostics = analyze("mixed.ts", &source);

        let names: Vec<String> = diagnostics
            .iter()
            .filter(|d| d.rule_id == "Q001")
            .map(|d| covered_text(&source, d))
            .collect();

        for expected in ["writeFile", "Stats", "unusedCounter", "second", "err", "helper"] {
            assert!(names.iter().any(|n| n == expected), "{expected} missing from {names:?}");
        }
        for live in ["readFile", "run", "first", "label", "rest", "a", "b", "count", "mode"] {
            assert!(!names.iter().any(|n| n == live), "{live} wrongly reported");
        }
    }

    #[test]
    fn closures_fixture() {
        let source = read_fixture("unused/closures.js");
        let diagnostics = analyze("closures.js", &source);

        let names: Vec<String> = diagnostics.iter().map(|d| covered_text(&source, d)).collect();

        assert_eq!(names, vec!["ignoredTotal", "_reason", "shadow"]);
    }
}

mod strict_boolean_expressions {
    use super::*;

    const STRING_CONDITION: &str = "declare const someString: string;\nif (someString) {\n}\n";

    #[test]
    fn string_condition_allowed_by_default() {
        assert!(analyze("scenario.ts", STRING_CONDITION).is_empty());
    }

    #[test]
    fn string_condition_reported_when_disallowed() {
        let engine = engine(
            r#"
[rules.options.strict-boolean-expressions]
allowString = false
"#,
        );
        let diagnostics = engine.analyze_source("scenario.ts", STRING_CONDITION);

        assert_eq!(message_ids(&diagnostics), vec!["conditionErrorString"]);
        assert_eq!(diagnostics[0].line, 2);
        assert_eq!(covered_text(STRING_CONDITION, &diagnostics[0]), "someString");
    }

    #[test]
    fn nullable_object_follows_option() {
        let source = "interface Foo { a: number }\ndeclare const maybeNull: Foo | null;\nif (maybeNull) {}\n";
        assert!(analyze("scenario.ts", source).is_empty());

        let engine = engine(
            r#"
[rules.options.strict-boolean-expressions]
allowNullableObject = false
"#,
        );
        let diagnostics = engine.analyze_source("scenario.ts", source);
        assert_eq!(message_ids(&diagnostics), vec!["conditionErrorNullableObject"]);
    }

    #[test]
    fn javascript_files_are_not_checked() {
        assert!(analyze("scenario.js", "const n = 0;\nif (n) {}\n").is_empty());
    }

    #[test]
    fn missing_strict_null_checks_reported_once() {
        let engine = engine(
            r#"
[compiler]
strict_null_checks = false
"#,
        );
        let diagnostics =
            engine.analyze_source("scenario.ts", "declare const a: any;\nif (a) {}\nwhile (a) {}\n");

        assert_eq!(message_ids(&diagnostics), vec!["noStrictNullCheck"]);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 1));
    }

    #[test]
    fn fixture_default_findings() {
        let source = read_fixture("conditions/mixed.ts");
        let diagnostics = analyze("mixed.ts", &source);

        let reported: Vec<(&str, String)> = diagnostics
            .iter()
            .filter(|d| d.rule_id == "Q002")
            .map(|d| (d.message_id.as_deref().unwrap_or_default(), covered_text(&source, d)))
            .collect();

        assert!(reported.contains(&("conditionErrorNullableBoolean", "maybeFlag".to_string())));
        assert!(reported.contains(&("conditionErrorAny", "anything".to_string())));
        assert!(reported.contains(&("conditionErrorNullableEnum", "maybeLevel".to_string())));
        assert!(!reported.iter().any(|(_, text)| text == "text" || text == "\"non-empty\""));
    }
}

#[test]
fn configuration_file_drives_engine() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("kensa.toml");
    fs::write(
        &path,
        r#"
[rules]
disabled = ["Q002"]

[rules.options.no-unused-vars]
vars = "local"
"#,
    )
    .expect("write config");

    let config = load_config(&path).expect("config loads");
    let engine = AnalysisEngine::with_config(&config);
    let diagnostics = engine.analyze_source(
        "scenario.ts",
        "let moduleLevel = 1;\nfunction f() { let inner = 2; }\nf();\ndeclare const s: string | null;\nif (s) {}\n",
    );

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.starts_with("'inner' "));
}
