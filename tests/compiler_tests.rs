// tests/compiler_tests.rs

use jf_lang::ast::{Callable, Expr, Stage, TaggedParam, Trailer};
use jf_lang::compiler::{guess_query_type, merge_lambdas, parse_part, tag_keywords};
use jf_lang::parser::parse_query_tree;
use jf_lang::tree::{FilteredTree, filter_tree};
use jf_lang::{CompileError, Evaluator, Value, compile};
use std::collections::HashMap;

fn compiled(query: &str) -> String {
    compile(query).unwrap().to_string()
}

fn candidate(query: &str) -> FilteredTree {
    let tree = filter_tree(&parse_query_tree(&format!("{query},")).unwrap());
    tree.children()[0].children()[0].clone()
}

// ============================================================================
// Stage calls
// ============================================================================

#[test]
fn test_simple_map() {
    assert_eq!(compiled("map(x.id)"), "lambda arr: map(lambda x, *rest: (x.id), arr)");
}

#[test]
fn test_implicit_field() {
    assert_eq!(
        compiled("filter(.id > 1)"),
        "lambda arr: filter(lambda x, *rest: (x.id > 1), arr)"
    );
}

#[test]
fn test_keyword_argument() {
    assert_eq!(
        compiled("sorted(.id, reverse=True)"),
        "lambda arr: sorted(lambda x, *rest: (x.id), arr, reverse=True)"
    );
}

#[test]
fn test_keyword_before_positional() {
    // a leading keyword never joins the callable
    let pipeline = compile("sorted(reverse=True, .id)");
    let stage = match pipeline {
        Ok(pipeline) => pipeline.stages[0].clone(),
        Err(err) => panic!("Expected a pipeline, got {}", err),
    };
    match stage {
        Stage::Call(call) => {
            assert_eq!(call.invocation.callable.exprs(), &[Expr::attr(Expr::Arg, "id")]);
            assert_eq!(call.invocation.kwarg("reverse"), Some(&Expr::Boolean(true)));
        }
        other => panic!("Expected a call, got {}", other),
    }
}

#[test]
fn test_multi_stage_order() {
    let pipeline = compile("map(x.id), filter(.id > 1), sorted(.id, reverse=True), first(2)").unwrap();
    let names: Vec<&str> = pipeline.stages.iter().map(Stage::name).collect();
    assert_eq!(names, vec!["map", "filter", "sorted", "first"]);
    assert_eq!(
        pipeline.to_string(),
        "lambda arr: map(lambda x, *rest: (x.id), arr),\
         lambda arr: filter(lambda x, *rest: (x.id > 1), arr),\
         lambda arr: sorted(lambda x, *rest: (x.id), arr, reverse=True),\
         lambda arr: first(lambda x, *rest: (2), arr)"
    );
}

#[test]
fn test_object_literal() {
    assert_eq!(
        compiled("map({id: x.a, data: x.b.d[0]})"),
        r#"lambda arr: map(lambda x, *rest: ({"id": x.a, "data": x.b.d[0]}), arr)"#
    );
}

#[test]
fn test_several_positional_parameters() {
    assert_eq!(
        compiled(r#"hide("data", "c")"#),
        r#"lambda arr: hide(lambda x, *rest: ("data", "c"), arr)"#
    );
    assert_eq!(
        compiled("islice(1, 4, 2)"),
        "lambda arr: islice(lambda x, *rest: (1, 4, 2), arr)"
    );
}

#[test]
fn test_empty_call() {
    assert_eq!(compiled("first()"), "lambda arr: first(lambda x, *rest: (), arr)");
}

#[test]
fn test_keyword_shaped_string_is_still_parsed() {
    let pipeline = compile(r#"map("a=b")"#).unwrap();
    match &pipeline.stages[0] {
        Stage::Call(call) => {
            assert_eq!(call.invocation.callable.exprs(), &[Expr::String("a=b".into())]);
            assert!(call.invocation.kwargs.is_empty());
        }
        other => panic!("Expected a call, got {}", other),
    }
}

#[test]
fn test_keyword_shaped_string_keeps_its_place() {
    assert_eq!(
        compiled(r#"map("a=b", x.id)"#),
        r#"lambda arr: map(lambda x, *rest: ("a=b", x.id), arr)"#
    );
    assert_eq!(
        compiled(r#"map(x.get("k=v"), x.id)"#),
        r#"lambda arr: map(lambda x, *rest: (x.get("k=v"), x.id), arr)"#
    );
}

#[test]
fn test_callables_evaluate_against_the_record() {
    let mut record = HashMap::new();
    record.insert("id".to_string(), Value::Integer(7));
    let record = Value::Object(record);

    let pipeline = compile("map(x.id), filter(.id > 1), sorted(.id, reverse=True)").unwrap();
    let results: Vec<Value> = pipeline
        .stages
        .iter()
        .map(|stage| match stage {
            Stage::Call(call) => Evaluator::new()
                .call_callable(&call.invocation.callable, &record)
                .unwrap(),
            other => panic!("Expected a call, got {}", other),
        })
        .collect();
    assert_eq!(
        results,
        vec![Value::Integer(7), Value::Boolean(true), Value::Integer(7)]
    );
}

// ============================================================================
// References and short-hands
// ============================================================================

#[test]
fn test_bare_reference() {
    let pipeline = compile("unique").unwrap();
    assert_eq!(pipeline.stages, vec![Stage::Reference("unique".into())]);
    assert_eq!(pipeline.to_string(), "unique");
}

#[test]
fn test_object_shorthand_is_map() {
    assert_eq!(compiled("{id: x.a}"), compiled("map({id: x.a})"));
}

#[test]
fn test_parenthesis_shorthand_is_filter() {
    assert_eq!(compiled("(.id > 1)"), compiled("filter(.id > 1)"));
}

#[test]
fn test_stageless_expressions() {
    assert_eq!(compiled(".id"), compiled("map(.id)"));
    assert_eq!(compiled("x.id > 1"), compiled("filter(x.id > 1)"));
    assert_eq!(compiled("x.get('a')"), compiled("map(x.get('a'))"));
}

#[test]
fn test_guess_query_type() {
    assert_eq!(guess_query_type(&candidate("x.a == 1")), "filter");
    assert_eq!(guess_query_type(&candidate("x.a != 1")), "filter");
    assert_eq!(guess_query_type(&candidate("x.a + 1")), "map");
}

// ============================================================================
// Dotted names and trailers
// ============================================================================

#[test]
fn test_dotted_stage_name() {
    let pipeline = compile("foo.bar(1)").unwrap();
    assert_eq!(pipeline.stages[0].name(), "foo.bar");
}

#[test]
fn test_trailers_after_call() {
    let pipeline = compile("first(2).items[0]").unwrap();
    match &pipeline.stages[0] {
        Stage::Call(call) => assert_eq!(
            call.trailers,
            vec![Trailer::Attr("items".into()), Trailer::Index(Expr::Integer(0))]
        ),
        other => panic!("Expected a call, got {}", other),
    }
    assert_eq!(
        pipeline.to_string(),
        "lambda arr: first(lambda x, *rest: (2), arr).items[0]"
    );
}

#[test]
fn test_parse_part() {
    let parts = candidate("first(3)");
    let call = parse_part(parts.children()).unwrap();
    assert_eq!(call.name, "first");
    assert_eq!(call.invocation.callable, Callable::Tuple(vec![Expr::Integer(3)]));
}

// ============================================================================
// Parameter tagging
// ============================================================================

#[test]
fn test_tag_keywords() {
    assert_eq!(tag_keywords("reverse = True"), TaggedParam::new("reverse = True", false));
    assert_eq!(tag_keywords(".a >= 1"), TaggedParam::new(".a >= 1", true));
    assert_eq!(tag_keywords(".a <= 1"), TaggedParam::new(".a <= 1", true));
}

#[test]
fn test_merge_lambdas_keeps_source_order() {
    let params = vec![
        TaggedParam::new(r#""a=b""#, false),
        TaggedParam::new(".id", true),
    ];
    let invocation = merge_lambdas(&params).unwrap();
    assert_eq!(
        invocation.callable.exprs(),
        &[Expr::String("a=b".into()), Expr::attr(Expr::Arg, "id")]
    );
    assert!(invocation.kwargs.is_empty());
}

#[test]
fn test_merge_lambdas_order() {
    let params = vec![
        TaggedParam::new("reverse=True", false),
        TaggedParam::new(".b", true),
        TaggedParam::new(".a", true),
    ];
    let invocation = merge_lambdas(&params).unwrap();
    assert_eq!(
        invocation.to_string(),
        "lambda x, *rest: (x.b, x.a), arr, reverse=True"
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_syntax_error() {
    assert!(matches!(compile("{x.id]"), Err(CompileError::Syntax(_))));
    assert!(matches!(compile("map(x.id"), Err(CompileError::Syntax(_))));
}

#[test]
fn test_ambiguous_part() {
    match compile("foo[0](1)") {
        Err(CompileError::Ambiguous { fragment }) => assert_eq!(fragment, "[0]"),
        other => panic!("Expected an ambiguous part, got {:?}", other),
    }
}

#[test]
fn test_error_messages() {
    let err = compile("{x.id]").unwrap_err();
    assert!(err.to_string().starts_with("Syntax error: "));
}
