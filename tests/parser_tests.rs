// tests/parser_tests.rs

use jf_lang::ast::{Argument, BinOp, Expr, Rule, SyntaxNode};
use jf_lang::lower::{parse_argument_list, parse_expr};
use jf_lang::parser::{Parser, parse_query_tree};
use jf_lang::{CompileError, compile};

// ============================================================================
// Concrete syntax tree
// ============================================================================

#[test]
fn test_query_keeps_every_token() {
    let tree = parse_query_tree("map(x.id), filter(.id > 1),").unwrap();
    assert_eq!(
        tree.tokens(),
        vec![
            "map", "(", "x", ".", "id", ")", ",", "filter", "(", ".", "id", ">", "1", ")", ",", ""
        ]
    );
}

#[test]
fn test_query_shape() {
    let tree = parse_query_tree("unique,").unwrap();
    assert_eq!(tree.rule(), Some(Rule::Query));

    let list = &tree.children()[0];
    assert_eq!(list.rule(), Some(Rule::ExprList));
    assert_eq!(list.children().len(), 2);
    assert_eq!(list.children()[0].rule(), Some(Rule::Postfix));
}

#[test]
fn test_single_child_rules_collapse() {
    // `1` passes through Or/And/Comparison/Arith/Term without wrappers
    let tree = Parser::new("1").unwrap().parse_expression().unwrap();
    assert_eq!(tree.rule(), Some(Rule::Postfix));
    assert!(matches!(tree.children(), [SyntaxNode::Terminal { .. }]));
}

#[test]
fn test_trailers() {
    let tree = Parser::new("x.b.d[0]").unwrap().parse_expression().unwrap();
    let rules: Vec<Option<Rule>> = tree.children().iter().map(SyntaxNode::rule).collect();
    assert_eq!(
        rules,
        vec![None, Some(Rule::Trailer), Some(Rule::Trailer), Some(Rule::Trailer)]
    );
}

#[test]
fn test_dict_items_are_flat() {
    let tree = Parser::new("{id: x.a, data: x.b}").unwrap().parse_expression().unwrap();
    let dict = &tree.children()[0];
    assert_eq!(dict.rule(), Some(Rule::Dict));
    let items = &dict.children()[1];
    assert_eq!(items.rule(), Some(Rule::DictItems));
    assert_eq!(items.children().len(), 7);
}

#[test]
fn test_unbalanced_brackets() {
    let err = parse_query_tree("{x.id],").unwrap_err();
    assert_eq!(err.offset, 5);
    assert!(err.message.contains("found ']'"));
}

#[test]
fn test_keyword_argument_needs_a_name() {
    assert!(parse_query_tree("sorted(x.a = 1),").is_err());
}

#[test]
fn test_missing_close_paren() {
    let err = parse_query_tree("map({id: x.a, data: x.b.d}").unwrap_err();
    assert!(err.message.contains("')'"));
}

// ============================================================================
// Lowering
// ============================================================================

#[test]
fn test_attribute_chain() {
    let expr = parse_expr("x.b.d").unwrap();
    assert_eq!(expr, Expr::attr(Expr::attr(Expr::Arg, "b"), "d"));
}

#[test]
fn test_precedence() {
    let expr = parse_expr("(1 + 2) * 3").unwrap();
    match expr {
        Expr::BinaryOp {
            op: BinOp::Multiply,
            left,
            right,
        } => {
            assert!(matches!(*left, Expr::BinaryOp { op: BinOp::Add, .. }));
            assert_eq!(*right, Expr::Integer(3));
        }
        other => panic!("Expected multiplication, got {:?}", other),
    }
}

#[test]
fn test_logical_precedence() {
    // and binds tighter than or
    let expr = parse_expr(".a or .b and .c").unwrap();
    match expr {
        Expr::BinaryOp {
            op: BinOp::Or,
            right,
            ..
        } => assert!(matches!(*right, Expr::BinaryOp { op: BinOp::And, .. })),
        other => panic!("Expected or, got {:?}", other),
    }
}

#[test]
fn test_not_and_negation() {
    assert!(matches!(parse_expr("not .a").unwrap(), Expr::Not(_)));
    assert_eq!(parse_expr("-1").unwrap(), Expr::Negate(Box::new(Expr::Integer(1))));
}

#[test]
fn test_call_with_keywords() {
    let expr = parse_expr("x.get('a', default=0)").unwrap();
    match expr {
        Expr::Call { args, kwargs, .. } => {
            assert_eq!(args, vec![Expr::String("a".into())]);
            assert_eq!(kwargs, vec![("default".to_string(), Expr::Integer(0))]);
        }
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_collections() {
    assert_eq!(parse_expr("[]").unwrap(), Expr::Array(vec![]));
    assert_eq!(parse_expr("[1]").unwrap(), Expr::Array(vec![Expr::Integer(1)]));
    assert_eq!(
        parse_expr("(1, 2)").unwrap(),
        Expr::Tuple(vec![Expr::Integer(1), Expr::Integer(2)])
    );
    assert_eq!(parse_expr("{}").unwrap(), Expr::Object(vec![]));
}

#[test]
fn test_top_level_list_is_tuple() {
    assert_eq!(
        parse_expr(".a, .b").unwrap(),
        Expr::Tuple(vec![Expr::attr(Expr::Arg, "a"), Expr::attr(Expr::Arg, "b")])
    );
}

#[test]
fn test_display_round_trip() {
    let expr = parse_expr(r#"{"id": x.a, "x": x["f"]}"#).unwrap();
    assert_eq!(expr.to_string(), r#"{"id": x.a, "x": x["f"]}"#);
}

#[test]
fn test_argument_list_mixed() {
    let args = parse_argument_list(r#""data","c""#).unwrap();
    assert_eq!(
        args,
        vec![
            Argument::Positional(Expr::String("data".into())),
            Argument::Positional(Expr::String("c".into())),
        ]
    );
}

#[test]
fn test_large_integer_becomes_float() {
    assert_eq!(
        parse_expr("99999999999999999999").unwrap(),
        Expr::Float(1e20)
    );
}

// ============================================================================
// Nesting limit
// ============================================================================

#[test]
fn test_deep_parentheses_are_rejected() {
    let query = format!("map({}1{})", "(".repeat(1000), ")".repeat(1000));
    assert!(matches!(compile(&query), Err(CompileError::Syntax(_))));
}

#[test]
fn test_deep_unary_operators_are_rejected() {
    let nots = format!("filter({}.a)", "not ".repeat(1000));
    assert!(matches!(compile(&nots), Err(CompileError::Syntax(_))));

    let signs = format!("map({}1)", "-".repeat(1000));
    assert!(matches!(compile(&signs), Err(CompileError::Syntax(_))));
}

#[test]
fn test_deep_lists_are_rejected() {
    let text = format!("{}1{}", "[".repeat(1000), "]".repeat(1000));
    let err = parse_expr(&text).unwrap_err();
    assert_eq!(err.message, "Expression is nested too deeply");
}

#[test]
fn test_moderate_nesting_compiles() {
    let query = format!("map({}x.id{})", "(".repeat(20), ")".repeat(20));
    assert!(compile(&query).is_ok());
}

// ============================================================================
// not in
// ============================================================================

#[test]
fn test_not_in_is_one_operator() {
    let tree = Parser::new("1 not in x").unwrap().parse_expression().unwrap();
    assert_eq!(tree.rule(), Some(Rule::Comparison));
    assert_eq!(tree.tokens(), vec!["1", "not", "in", "x"]);
}

#[test]
fn test_not_in_lowers_to_negated_in() {
    assert_eq!(
        parse_expr("1 not in [2]").unwrap(),
        Expr::Not(Box::new(Expr::binary(
            BinOp::In,
            Expr::Integer(1),
            Expr::Array(vec![Expr::Integer(2)])
        )))
    );
}

#[test]
fn test_not_in_display_round_trip() {
    let expr = parse_expr("x.a not in x.b").unwrap();
    assert_eq!(parse_expr(&expr.to_string()).unwrap(), expr);
}
