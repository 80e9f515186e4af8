use crate::ast::TokenKind;

/// Grammar rules that produce composite syntax nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Whole input: an expression list followed by end of input
    Query,
    /// Comma-separated expressions (top-level stages, tuple and list items)
    ExprList,
    Or,
    And,
    Not,
    Comparison,
    /// The two-token `not in` comparison operator
    NotIn,
    Arith,
    Term,
    /// Unary sign
    Factor,
    /// An atom followed by its trailers
    Postfix,
    /// `(args)`, `[index]` or `.name` after an atom
    Trailer,
    ArgList,
    /// `expr` or `name = expr`
    Argument,
    /// `( ... )`
    Paren,
    /// `[ ... ]`
    List,
    /// `{ ... }`
    Dict,
    /// Flat `key : value , key : value` sequence inside braces
    DictItems,
    /// `.name` with no object in front, i.e. a field of the implicit argument
    ImplicitField,
}

/// Concrete syntax tree produced by the grammar.
///
/// Every token of the input appears as a terminal, in source order. Rule
/// nodes are only created where the rule actually matched something beyond a
/// single child, except for [`Rule::Query`], [`Rule::Postfix`] and
/// [`Rule::ArgList`] which are always present.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    Terminal {
        kind: TokenKind,
        text: String,
        offset: usize,
    },
    Composite {
        rule: Rule,
        children: Vec<SyntaxNode>,
    },
}

impl SyntaxNode {
    pub fn terminal(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        SyntaxNode::Terminal {
            kind,
            text: text.into(),
            offset,
        }
    }

    pub fn composite(rule: Rule, children: Vec<SyntaxNode>) -> Self {
        SyntaxNode::Composite { rule, children }
    }

    /// Terminal kind, if this is a terminal
    pub fn kind(&self) -> Option<TokenKind> {
        match self {
            SyntaxNode::Terminal { kind, .. } => Some(*kind),
            SyntaxNode::Composite { .. } => None,
        }
    }

    /// Rule, if this is a composite
    pub fn rule(&self) -> Option<Rule> {
        match self {
            SyntaxNode::Terminal { .. } => None,
            SyntaxNode::Composite { rule, .. } => Some(*rule),
        }
    }

    pub fn children(&self) -> &[SyntaxNode] {
        match self {
            SyntaxNode::Terminal { .. } => &[],
            SyntaxNode::Composite { children, .. } => children,
        }
    }

    /// Terminal texts in source order.
    pub fn tokens(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            SyntaxNode::Terminal { text, .. } => out.push(text),
            SyntaxNode::Composite { children, .. } => {
                for child in children {
                    child.collect_tokens(out);
                }
            }
        }
    }
}
