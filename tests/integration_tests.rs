#![cfg(feature = "cli")]

use jf_lang::cli::parse_records;
use jf_lang::{Engine, EvalError, Value, compile, to_json};

fn run_query(query: &str, data: &str) -> Result<String, String> {
    let pipeline = compile(query).map_err(|e| e.to_string())?;
    let records = parse_records(data).map_err(|e| e.to_string())?;
    let output = Engine::new()
        .run(&pipeline, records)
        .collect::<Result<Vec<_>, EvalError>>()
        .map_err(|e| e.to_string())?;
    Ok(to_json(&Value::Array(output)))
}

fn assert_query(query: &str, data: &str, expected: &str) {
    assert_eq!(run_query(query, data).unwrap(), expected, "query: {}", query);
}

const NESTED: &str = r#"[
    {"a": 2, "b": {"c": 632, "d": [1, 2, 3, 4]}},
    {"a": 1, "b": {"c": 632, "d": [3, 4, 5, 6]}},
    {"a": 5, "b": {"c": 632, "d": [5, 6, 7, 8]}}
]"#;

const DATED: &str = r#"[
    {"a": 2, "b": "2018-01-30 16:28:40+00:00"},
    {"a": 1, "b": "2018-01-30 15:12:35+00:00"},
    {"a": 3, "b": "2018-01-10 15:12:35+00:00"},
    {"a": 5, "b": "2018-01-30 16:06:59+00:00"}
]"#;

const DATED_TZ: &str = r#"[
    {"a": 2, "b": "2018-01-30 16:28:40+00:00"},
    {"a": 1, "b": "2018-01-30 15:12:35+00:00"},
    {"a": 3, "b": "2018-01-10 15:12:35+00:00"},
    {"a": 5, "b": "2018-01-30 16:06:59+03:00"}
]"#;

const BY_AGE: &str = "map({id: x.a, date: x.b}), sorted(age(.date), reverse=True), map(.id)";

// ============================================================================
// Field access
// ============================================================================

#[test]
fn test_simple_query() {
    assert_query("map(x.a)", r#"[{"a": 1}]"#, "[1]");
}

#[test]
fn test_get_item() {
    assert_query(r#"map(x["a"])"#, r#"[{"a": 1}]"#, "[1]");
}

#[test]
fn test_get_null_item() {
    assert_query(r#"map(x["b"])"#, r#"[{"a": 1}]"#, "[null]");
}

#[test]
fn test_complex_query() {
    assert_query(
        r#"map({"id": x.a, "data": x.b.d})"#,
        r#"[{"a": 1, "b": {"c": 632, "d": [1, 2, 3, 4]}}]"#,
        r#"[{"data":[1,2,3,4],"id":1}]"#,
    );
}

#[test]
fn test_bare_keys() {
    assert_query(
        "map({id: x.a, data: x.b.d})",
        r#"[{"a": 1, "b": {"c": 632, "d": [1, 2, 3, 4]}}]"#,
        r#"[{"data":[1,2,3,4],"id":1}]"#,
    );
}

#[test]
fn test_keyword_shaped_argument_keeps_its_place() {
    assert_query(
        r#"map(x.get("k=v"), x.id)"#,
        r#"[{"id": 1, "k=v": 9}]"#,
        "[[9,1]]",
    );
}

#[test]
fn test_stream_input() {
    assert_query("map(.a)", "{\"a\": 1}\n{\"a\": 2}\n", "[1,2]");
}

// ============================================================================
// hide / update
// ============================================================================

#[test]
fn test_hide() {
    assert_query(
        r#"map({"id": x.a, "data": x.b.d}), hide("data")"#,
        r#"[{"a": 1, "b": {"c": 632, "d": [1, 2, 3, 4]}}]"#,
        r#"[{"id":1}]"#,
    );
}

#[test]
fn test_hide_many() {
    assert_query(
        r#"map({"id": x.a, "c": x.b.c, "data": x.b.d, "x": x["f"]}), hide("data", "c")"#,
        r#"[
            {"a": 1, "b": {"c": 632, "d": [1, 2, 3, 4]}},
            {"a": 2, "f": 4, "b": {"c": 632, "d": [1, 2, 3, 4]}}
        ]"#,
        r#"[{"id":1,"x":null},{"id":2,"x":4}]"#,
    );
}

#[test]
fn test_update_then_project() {
    assert_query(
        "update({y: len(.a) * len(.a)}), .y",
        r#"[{"a": "123"}]"#,
        "[9]",
    );
}

// ============================================================================
// filter
// ============================================================================

#[test]
fn test_filter_greater() {
    assert_query(
        "map({id: x.a, data: x.b.d[0]}), filter(.id > 1)",
        NESTED,
        r#"[{"data":1,"id":2},{"data":5,"id":5}]"#,
    );
}

#[test]
fn test_filter_equal() {
    assert_query(
        "map({id: x.a, data: x.b.d[0]}), filter(.id == 1)",
        NESTED,
        r#"[{"data":3,"id":1}]"#,
    );
}

#[test]
fn test_filter_less() {
    assert_query(
        "map({id: x.a, data: x.b.d[0]}), filter(.id < 2)",
        NESTED,
        r#"[{"data":3,"id":1}]"#,
    );
}

#[test]
fn test_filter_between_fields() {
    assert_query(
        "map({id: x.a, data: x.b.d[0]}), filter(.id < .data)",
        NESTED,
        r#"[{"data":3,"id":1}]"#,
    );
}

#[test]
fn test_filter_shorthand() {
    assert_query(
        "{id: x.a, data: x.b.d[0]}, (.id > 1), .id",
        NESTED,
        "[2,5]",
    );
}

#[test]
fn test_filter_not_in() {
    assert_query(
        r#"filter("a" not in .tags), map(.id)"#,
        r#"[{"id": 1, "tags": ["a", "b"]}, {"id": 2, "tags": ["c"]}]"#,
        "[2]",
    );
}

#[test]
fn test_guessed_filter() {
    assert_query("x.a > 1, .a", NESTED, "[2,5]");
}

// ============================================================================
// sorted / age
// ============================================================================

#[test]
fn test_sorting_query() {
    assert_query(
        "map({id: x.a, data: x.b.d[0]}), sorted(.id, reverse=True)",
        NESTED,
        r#"[{"data":5,"id":5},{"data":1,"id":2},{"data":3,"id":1}]"#,
    );
}

#[test]
fn test_reverse_sort_is_stable() {
    assert_query(
        "sorted(.k, reverse=True), map(.n)",
        r#"[{"k": 1, "n": "a"}, {"k": 2, "n": "b"}, {"k": 1, "n": "c"}]"#,
        r#"["b","a","c"]"#,
    );
}

#[test]
fn test_age() {
    assert_query(BY_AGE, DATED, "[3,1,5,2]");
}

#[test]
fn test_age_output() {
    assert_query(
        "map({id: x.a, date: x.b}), sorted(age(.date), reverse=True), first()",
        r#"[
            {"a": 2, "b": "2018-01-30 16:28:40+00:00"},
            {"a": 1, "b": "2018-01-30 15:12:35+00:00"}
        ]"#,
        r#"[{"date":"2018-01-30 15:12:35+00:00","id":1}]"#,
    );
}

#[test]
fn test_age_tz() {
    assert_query(BY_AGE, DATED_TZ, "[3,5,1,2]");
}

#[test]
fn test_age_against_duration() {
    assert_query(
        r#"filter(age(.b) > age("1 days")), map(.a)"#,
        DATED,
        "[2,1,3,5]",
    );
}

// ============================================================================
// first / last / islice
// ============================================================================

#[test]
fn test_islice_stop() {
    assert_query(&format!("{BY_AGE}, islice(1)"), DATED_TZ, "[3]");
}

#[test]
fn test_islice_start_stop() {
    assert_query(&format!("{BY_AGE}, islice(1, 2)"), DATED_TZ, "[5]");
}

#[test]
fn test_islice_step() {
    assert_query(&format!("{BY_AGE}, islice(1, 4, 2)"), DATED_TZ, "[5,2]");
}

#[test]
fn test_last() {
    assert_query(&format!("{BY_AGE}, last()"), DATED_TZ, "[2]");
}

#[test]
fn test_last_two() {
    assert_query(&format!("{BY_AGE}, last(2)"), DATED_TZ, "[1,2]");
}

#[test]
fn test_first() {
    assert_query(&format!("{BY_AGE}, first()"), DATED_TZ, "[3]");
}

#[test]
fn test_last_two_with_sort() {
    assert_query(
        "map({id: x.a, date: x.b}), sorted(age(.date), reverse=False), map(.id), first(2)",
        DATED_TZ,
        "[2,1]",
    );
}

// ============================================================================
// unique / yield_all / reduce_list
// ============================================================================

#[test]
fn test_unique_by_key() {
    assert_query(
        "unique(.b), map(.a)",
        r#"[{"a": 1, "b": 1}, {"a": 2, "b": 1}, {"a": 3, "b": 2}]"#,
        "[1,3]",
    );
}

#[test]
fn test_unique_keeps_types_apart() {
    assert_query("unique", r#"[1, "1", true, "true", 1]"#, r#"[1,"1",true,"true"]"#);
}

#[test]
fn test_yield_all() {
    assert_query("yield_all(.d)", r#"[{"d": [1, 2]}, {"d": [3]}]"#, "[1,2,3]");
}

#[test]
fn test_reduce_list() {
    assert_query("map(.a), reduce_list", r#"[{"a": 1}, {"a": 2}]"#, "[[1,2]]");
}

// ============================================================================
// math
// ============================================================================

#[test]
fn test_math_query() {
    assert_query(
        "update({y: math.log(len(.a) * len(.a))}), .y",
        r#"[{"a": "123"}]"#,
        &format!("[{}]", to_json(&Value::Float(9f64.ln()))),
    );
}

#[test]
fn test_math_functions() {
    assert_query(
        "map([math.sqrt(.a), math.floor(2.5), math.ceil(2.5), math.pow(.a, 2)])",
        r#"[{"a": 16}]"#,
        "[[4.0,2,3,256.0]]",
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_query_syntax_error() {
    let err = run_query("map({id: x.a, data: x.b.d", NESTED).unwrap_err();
    assert!(err.starts_with("Syntax error"), "{}", err);
}

#[test]
fn test_unknown_stage() {
    let err = run_query("explode(.a)", NESTED).unwrap_err();
    assert_eq!(err, "Unknown stage: explode");
}

#[test]
fn test_unexpected_keyword() {
    let err = run_query("map(.a, reverse=True)", NESTED).unwrap_err();
    assert!(err.contains("unexpected keyword argument 'reverse'"), "{}", err);
}

#[test]
fn test_islice_zero_step() {
    let err = run_query("islice(0, 2, 0)", NESTED).unwrap_err();
    assert!(err.contains("step must be positive"), "{}", err);
}
