//! Query compiler: turns query text into a [`Pipeline`] of stage calls.
//!
//! ```text
//! map(x.id), filter(.id > 1)
//! ```
//!
//! is parsed once by the expression grammar, reduced to a [`FilteredTree`]
//! and then split into top-level candidates, one per stage. Each candidate is
//! either a bare stage name, a stage call, or a stage-less expression whose
//! stage is inferred (`{...}` maps, `(...)` filters).
//!
//! Stage arguments are rebuilt as text from their tokens, tagged as
//! positional or keyword, and parsed again as argument lists to produce the
//! stage's [`Invocation`].

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::{
    ast::{Argument, Callable, Invocation, Pipeline, Stage, StageCall, TaggedParam, Trailer},
    lower::{parse_argument_list, parse_expr, split_arguments},
    parser::{SyntaxError, parse_query_tree},
    tree::{FilteredTree, filter_tree, flatten, join_tokens, make_param_list, maxdepth},
};

/// `name=value` with no comparison operator on either side of the `=`.
static KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^!><=]+=[^><=]+").expect("keyword pattern is valid"));

const RELATIONAL: [&str; 6] = ["==", ">", "<", "!=", ">=", "<="];

const LITERALS: [&str; 10] = [
    "True", "False", "None", "true", "false", "null", "and", "or", "not", "in",
];

/// Errors raised while compiling a query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The query (or one of its parameter texts) is not valid syntax
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// A top-level part matches none of the stage shapes
    #[error("Cannot compile '{fragment}' into a stage")]
    Ambiguous { fragment: String },
}

impl CompileError {
    fn ambiguous(tree: &FilteredTree) -> Self {
        CompileError::Ambiguous {
            fragment: join_tokens(&flatten(tree)),
        }
    }
}

/// Compiles a query into a pipeline.
///
/// # Example
/// ```
/// use jf_lang::compile;
///
/// let pipeline = compile("sorted(.id, reverse=True)").unwrap();
/// assert_eq!(
///     pipeline.to_string(),
///     "lambda arr: sorted(lambda x, *rest: (x.id), arr, reverse=True)"
/// );
/// ```
pub fn compile(query: &str) -> Result<Pipeline, CompileError> {
    parse_query(query)
}

/// Classifies a parameter text as keyword (`name=value`) or positional.
pub fn tag_keywords(text: &str) -> TaggedParam {
    TaggedParam::new(text, !KEYWORD.is_match(text))
}

/// `"filter"` if the expression compares anything, `"map"` otherwise.
pub fn guess_query_type(tree: &FilteredTree) -> &'static str {
    if flatten(tree)
        .iter()
        .any(|token| RELATIONAL.contains(&token.as_str()))
    {
        "filter"
    } else {
        "map"
    }
}

/// Builds a stage invocation from tagged parameter texts.
///
/// Texts are walked in source order and each is parsed as an argument
/// list. Positional items join the callable tuple and keyword items become
/// stage keywords, so the tag never reorders the callable.
/// Without any parameter the callable passes records through unchanged.
pub fn merge_lambdas(params: &[TaggedParam]) -> Result<Invocation, SyntaxError> {
    if params.is_empty() {
        return Ok(Invocation {
            callable: Callable::Passthrough,
            kwargs: vec![],
        });
    }

    let mut exprs = Vec::new();
    let mut kwargs = Vec::new();
    for param in params {
        if param.text.trim().is_empty() {
            continue;
        }
        for argument in parse_argument_list(&param.text)? {
            match argument {
                Argument::Positional(expr) => exprs.push(expr),
                Argument::Keyword(name, expr) => kwargs.push((name, expr)),
            }
        }
    }

    Ok(Invocation {
        callable: Callable::Tuple(exprs),
        kwargs,
    })
}

fn param_texts(group: &FilteredTree) -> Vec<String> {
    match group.children() {
        [_, inner, _] => make_param_list(inner),
        _ => vec![String::new()],
    }
}

fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && !LITERALS.contains(&text)
}

/// A name that can start a stage; `x` is the record itself.
fn is_stage_name(text: &str) -> bool {
    is_name(text) && text != "x"
}

/// `.name` part, as produced by an attribute trailer.
fn attr_name(part: &FilteredTree) -> Option<&str> {
    match part.children() {
        [dot, name] if dot.leaf_text() == Some(".") => name.leaf_text(),
        _ => None,
    }
}

/// Compiles the parts of one stage call: its name followed by call,
/// attribute and index groups.
pub fn parse_part(parts: &[FilteredTree]) -> Result<StageCall, CompileError> {
    let (first, rest) = parts
        .split_first()
        .ok_or_else(|| CompileError::Ambiguous {
            fragment: String::new(),
        })?;
    let mut name = first
        .leaf_text()
        .ok_or_else(|| CompileError::ambiguous(first))?
        .to_string();

    let mut invocation: Option<Invocation> = None;
    let mut trailers = Vec::new();

    for part in rest {
        debug!("part {}", part);
        match part.head() {
            Some("(") => {
                let texts = param_texts(part);
                debug!("paramlist {:?}", texts);
                if invocation.is_none() {
                    let params: Vec<TaggedParam> = texts.iter().map(|t| tag_keywords(t)).collect();
                    invocation = Some(merge_lambdas(&params)?);
                } else {
                    let arguments = parse_argument_list(&texts.join(","))?;
                    let (args, kwargs) = split_arguments(arguments);
                    trailers.push(Trailer::Call { args, kwargs });
                }
            }
            Some(".") => {
                let attr = attr_name(part).ok_or_else(|| CompileError::ambiguous(part))?;
                if invocation.is_none() {
                    name.push('.');
                    name.push_str(attr);
                } else {
                    trailers.push(Trailer::Attr(attr.to_string()));
                }
            }
            Some("[") if invocation.is_some() => {
                let index = match part.children() {
                    [_, inner, _] => parse_expr(&join_tokens(&flatten(inner)))?,
                    _ => return Err(CompileError::ambiguous(part)),
                };
                trailers.push(Trailer::Index(index));
            }
            _ => return Err(CompileError::ambiguous(part)),
        }
    }

    let invocation = invocation.ok_or_else(|| CompileError::Ambiguous { fragment: name.clone() })?;
    Ok(StageCall {
        name,
        invocation,
        trailers,
    })
}

/// Wraps a stage-less expression as `kind( expr )`.
fn wrap(kind: &str, tree: FilteredTree) -> FilteredTree {
    FilteredTree::Group(vec![
        FilteredTree::leaf(kind),
        FilteredTree::Group(vec![FilteredTree::leaf("("), tree, FilteredTree::leaf(")")]),
    ])
}

/// A named call such as `map(...)` or `foo.bar(...)`, as opposed to an
/// expression that only needs a stage inferred for it.
fn is_stage_call(candidate: &FilteredTree) -> bool {
    let parts = candidate.children();
    let named = parts
        .first()
        .and_then(FilteredTree::leaf_text)
        .is_some_and(is_stage_name);
    named && parts[1..].iter().any(|part| part.head() == Some("("))
}

fn compile_candidate(candidate: FilteredTree) -> Result<Stage, CompileError> {
    if maxdepth(&candidate) < 3 {
        if let Some(name) = candidate.leaf_text().filter(|n| is_stage_name(n)) {
            debug!("stage reference {}", name);
            return Ok(Stage::Reference(name.to_string()));
        }
    }

    let candidate = match candidate.head() {
        Some("{") => {
            debug!("short-hand object, using map");
            wrap("map", candidate)
        }
        Some("(") => {
            debug!("short-hand parenthesis, using filter");
            FilteredTree::Group(vec![FilteredTree::leaf("filter"), candidate])
        }
        _ if !is_stage_call(&candidate) => {
            let kind = guess_query_type(&candidate);
            debug!("stage-less expression, guessed {}", kind);
            wrap(kind, candidate)
        }
        _ => candidate,
    };

    let parts = candidate.children();
    debug!("parsing {} parts: {}", parts.len(), candidate);
    let call = match parts.len() {
        2 => parse_part(parts)?,
        3 => match (parts[0].leaf_text(), attr_name(&parts[1])) {
            (Some(object), Some(method)) => {
                let folded = [FilteredTree::leaf(format!("{object}.{method}")), parts[2].clone()];
                parse_part(&folded)?
            }
            _ => parse_part(parts)?,
        },
        n if n > 3 => parse_part(parts)?,
        _ => return Err(CompileError::ambiguous(&candidate)),
    };
    Ok(Stage::Call(call))
}

/// Compiles a query into a pipeline; see [`compile`].
pub fn parse_query(query: &str) -> Result<Pipeline, CompileError> {
    debug!("parsing: {}", query);
    let tree = parse_query_tree(&format!("{query},"))?;
    let candidates = match filter_tree(&tree) {
        FilteredTree::Group(mut children) if !children.is_empty() => children.remove(0),
        other => return Err(CompileError::ambiguous(&other)),
    };

    let mut stages = Vec::new();
    for candidate in candidates.children() {
        if candidate.leaf_text() == Some(",") {
            continue;
        }
        let stage = compile_candidate(candidate.clone())?;
        debug!("stage: {}", stage);
        stages.push(stage);
    }
    Ok(Pipeline { stages })
}
