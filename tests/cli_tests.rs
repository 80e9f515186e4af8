#![cfg(feature = "cli")]

use jf_lang::Value;
use jf_lang::cli::{CliError, RunOptions, RunResult, execute_run, json_to_value};

fn options(query: &str, input: Option<&str>) -> RunOptions {
    RunOptions {
        query: query.to_string(),
        input: input.map(String::from),
        ..RunOptions::default()
    }
}

#[test]
fn test_run_success() {
    let result = execute_run(&options("map(.a), filter(x > 1)", Some(r#"[{"a": 1}, {"a": 2}]"#)));
    match result {
        Ok(RunResult::Success { records, output }) => {
            assert_eq!(records, vec![Value::Integer(2)]);
            assert_eq!(output, "[2]");
        }
        other => panic!("Expected success, got {:?}", other),
    }
}

#[test]
fn test_run_pretty_output() {
    let mut opts = options("map({id: .a})", Some(r#"[{"a": 1}]"#));
    opts.pretty = true;
    match execute_run(&opts) {
        Ok(RunResult::Success { output, .. }) => {
            assert_eq!(output, "[\n  {\n    \"id\": 1\n  }\n]")
        }
        other => panic!("Expected success, got {:?}", other),
    }
}

#[test]
fn test_explain_needs_no_input() {
    let mut opts = options("first(2)", None);
    opts.explain = true;
    match execute_run(&opts) {
        Ok(RunResult::Explain(text)) => {
            assert_eq!(text, "lambda arr: first(lambda x, *rest: (2), arr)")
        }
        other => panic!("Expected explanation, got {:?}", other),
    }
}

#[test]
fn test_missing_input() {
    assert!(matches!(
        execute_run(&options("map(.a)", None)),
        Err(CliError::NoInput)
    ));
}

#[test]
fn test_invalid_json() {
    assert!(matches!(
        execute_run(&options("map(.a)", Some("{\"a\": "))),
        Err(CliError::Json(_))
    ));
}

#[test]
fn test_compile_error_is_reported_first() {
    let err = execute_run(&options("{x.id]", Some("not json"))).unwrap_err();
    assert!(matches!(err, CliError::Compile(_)));
    assert!(err.to_string().starts_with("Syntax error"));
}

#[test]
fn test_eval_error() {
    let err = execute_run(&options("map(.a + 1)", Some(r#"[{"a": "s"}]"#))).unwrap_err();
    assert!(matches!(err, CliError::Eval(_)));
}

#[test]
fn test_json_numbers_keep_their_kind() {
    assert_eq!(json_to_value(serde_json::json!(1)), Value::Integer(1));
    assert_eq!(json_to_value(serde_json::json!(1.5)), Value::Float(1.5));
}
