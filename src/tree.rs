//! Token-tree utilities used by the stage compiler.
//!
//! The compiler does not work on the concrete syntax tree directly. It first
//! reduces it to a [`FilteredTree`], which keeps only token texts and the
//! nesting that matters, then rebuilds parameter texts from those tokens.

use std::fmt;

use log::debug;

use crate::ast::SyntaxNode;

/// Characters that glue to their neighbours when tokens are re-joined.
const PUNCTUATION: &str = "(){}[],.:\"'";

/// A syntax tree reduced to token texts and meaningful nesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilteredTree {
    Token(String),
    Group(Vec<FilteredTree>),
}

impl FilteredTree {
    pub fn token(text: impl Into<String>) -> Self {
        FilteredTree::Token(text.into())
    }

    /// A one-token group, the filtered form of a terminal.
    pub fn leaf(text: impl Into<String>) -> Self {
        FilteredTree::Group(vec![FilteredTree::Token(text.into())])
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            FilteredTree::Token(text) => Some(text),
            FilteredTree::Group(_) => None,
        }
    }

    /// Children of a group; a plain token has none.
    pub fn children(&self) -> &[FilteredTree] {
        match self {
            FilteredTree::Token(_) => &[],
            FilteredTree::Group(children) => children,
        }
    }

    pub fn len(&self) -> usize {
        self.children().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children().is_empty()
    }

    /// Token text of a leaf group like `["map"]`.
    pub fn leaf_text(&self) -> Option<&str> {
        match self.children() {
            [FilteredTree::Token(text)] => Some(text),
            _ => None,
        }
    }

    /// Token at position `[0][0]`, i.e. the opening token of the first part.
    pub fn head(&self) -> Option<&str> {
        match self.children().first()? {
            FilteredTree::Token(text) => Some(text),
            FilteredTree::Group(inner) => inner.first().and_then(FilteredTree::as_token),
        }
    }
}

impl fmt::Display for FilteredTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilteredTree::Token(text) => write!(f, "{:?}", text),
            FilteredTree::Group(children) => {
                f.write_str("[")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Reduces a syntax tree to its tokens.
///
/// A terminal becomes a one-token group. A composite becomes the group of
/// its filtered children, or its only filtered child when it has just one.
pub fn filter_tree(node: &SyntaxNode) -> FilteredTree {
    match node {
        SyntaxNode::Terminal { text, .. } => FilteredTree::leaf(text.clone()),
        SyntaxNode::Composite { children, .. } => {
            let mut subtrees: Vec<FilteredTree> = children.iter().map(filter_tree).collect();
            if subtrees.len() == 1 {
                subtrees.remove(0)
            } else {
                FilteredTree::Group(subtrees)
            }
        }
    }
}

/// Nesting depth: 0 for a token, one more than the deepest child otherwise.
pub fn maxdepth(tree: &FilteredTree) -> usize {
    match tree {
        FilteredTree::Token(_) => 0,
        FilteredTree::Group(children) => 1 + children.iter().map(maxdepth).max().unwrap_or(0),
    }
}

/// Token texts of a tree in order, all nesting removed.
pub fn flatten(tree: &FilteredTree) -> Vec<String> {
    match tree {
        FilteredTree::Token(text) => vec![text.clone()],
        FilteredTree::Group(children) => children.iter().flat_map(flatten).collect(),
    }
}

fn is_punctuation(ch: Option<char>) -> bool {
    ch.is_some_and(|c| PUNCTUATION.contains(c))
}

/// Re-joins tokens into source-like text.
///
/// A space goes between two tokens unless either side of the join is
/// punctuation: `["x", ".", "id"]` gives `x.id`, `["x", ">", "1"]` gives
/// `x > 1`.
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    debug!(
        "join_tokens {:?}",
        tokens.iter().map(AsRef::as_ref).collect::<Vec<_>>()
    );
    let mut joined = String::new();
    for token in tokens {
        let token = token.as_ref();
        if !joined.is_empty()
            && !is_punctuation(joined.chars().next_back())
            && !is_punctuation(token.chars().next())
        {
            joined.push(' ');
        }
        joined.push_str(token);
    }
    joined
}

/// Iterator returned by [`merge_not`].
pub struct MergeNot<I> {
    tokens: I,
    delimiter: String,
    done: bool,
}

impl<I> Iterator for MergeNot<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        let mut merged = String::new();
        for token in self.tokens.by_ref() {
            let token = token.as_ref();
            if token == self.delimiter {
                return Some(merged);
            }
            if !merged.is_empty() {
                merged.push(' ');
            }
            merged.push_str(token);
        }
        self.done = true;
        // a trailing part without a delimiter still counts
        (!merged.is_empty()).then_some(merged)
    }
}

/// Splits tokens at each `delimiter`, space-joining the tokens in between.
///
/// An empty part before a delimiter is yielded as an empty string; an empty
/// trailing part is not.
pub fn merge_not<I>(tokens: I, delimiter: &str) -> MergeNot<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    MergeNot {
        tokens: tokens.into_iter(),
        delimiter: delimiter.to_string(),
        done: false,
    }
}

/// Rebuilds the parameter texts of one argument group.
///
/// The group is nested until it is at least four levels deep so that each
/// top-level child stands for one parameter (or a separator); children are
/// flattened, re-joined and finally split at top-level commas.
pub fn make_param_list(part: &FilteredTree) -> Vec<String> {
    debug!("make_param_list {}", part);
    if let Some(text) = part.leaf_text() {
        return vec![text.to_string()];
    }
    if let FilteredTree::Token(text) = part {
        return vec![text.clone()];
    }

    let mut part = part.clone();
    while maxdepth(&part) < 4 {
        part = FilteredTree::Group(vec![part]);
    }
    let texts: Vec<String> = part
        .children()
        .iter()
        .map(|child| join_tokens(&flatten(child)))
        .collect();
    merge_not(texts, ",").collect()
}
