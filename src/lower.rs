//! Lowering from the concrete syntax tree to evaluable [`Expr`] trees.

use crate::{
    ast::{Argument, BinOp, Expr, Rule, SyntaxNode, TokenKind},
    parser::{self, SyntaxError},
};

/// Parses `text` as an expression.
pub fn parse_expr(text: &str) -> Result<Expr, SyntaxError> {
    let tree = parser::Parser::new(text)?.parse_query()?;
    let lowerer = Lowerer { source: text };
    lowerer.expr(&tree)
}

/// Parses `text` as a call argument list.
pub fn parse_argument_list(text: &str) -> Result<Vec<Argument>, SyntaxError> {
    let tree = parser::parse_arguments(text)?;
    let lowerer = Lowerer { source: text };
    lowerer.arguments(&tree)
}

struct Lowerer<'a> {
    source: &'a str,
}

/// First terminal offset in a node, for error positions.
fn first_offset(node: &SyntaxNode) -> usize {
    match node {
        SyntaxNode::Terminal { offset, .. } => *offset,
        SyntaxNode::Composite { children, .. } => children.first().map(first_offset).unwrap_or(0),
    }
}

fn binop(kind: TokenKind) -> Option<BinOp> {
    Some(match kind {
        TokenKind::EqEq => BinOp::Equal,
        TokenKind::NotEq => BinOp::NotEqual,
        TokenKind::Lt => BinOp::LessThan,
        TokenKind::Gt => BinOp::GreaterThan,
        TokenKind::LtEq => BinOp::LessEqual,
        TokenKind::GtEq => BinOp::GreaterEqual,
        TokenKind::In => BinOp::In,
        TokenKind::Plus => BinOp::Add,
        TokenKind::Minus => BinOp::Subtract,
        TokenKind::Star => BinOp::Multiply,
        TokenKind::Slash => BinOp::Divide,
        TokenKind::Percent => BinOp::Modulo,
        TokenKind::And => BinOp::And,
        TokenKind::Or => BinOp::Or,
        _ => return None,
    })
}

/// Resolves backslash escapes in a quoted literal, dropping the quotes.
pub fn unescape(literal: &str) -> String {
    let mut chars = literal.chars();
    chars.next();
    chars.next_back();

    let mut result = String::new();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some(c @ ('"' | '\'' | '\\')) => result.push(c),
            Some(c) => {
                result.push('\\');
                result.push(c);
            }
            None => result.push('\\'),
        }
    }
    result
}

impl Lowerer<'_> {
    fn error(&self, message: impl Into<String>, node: &SyntaxNode) -> SyntaxError {
        SyntaxError::at(message, self.source, first_offset(node))
    }

    fn expr(&self, node: &SyntaxNode) -> Result<Expr, SyntaxError> {
        match node {
            SyntaxNode::Terminal { kind, text, .. } => self.terminal(*kind, text, node),
            SyntaxNode::Composite { rule, children } => match rule {
                Rule::Query => match children[0].children() {
                    [single] => self.expr(single),
                    _ => self.expr(&children[0]),
                },
                Rule::ExprList => Ok(Expr::Tuple(self.items(children)?)),
                Rule::Or
                | Rule::And
                | Rule::Arith
                | Rule::Term => self.binary_chain(children),
                Rule::Comparison => self.comparison_chain(children),
                Rule::Not => Ok(Expr::Not(Box::new(self.expr(&children[1])?))),
                Rule::Factor => {
                    let operand = self.expr(&children[1])?;
                    if children[0].kind() == Some(TokenKind::Minus) {
                        Ok(Expr::Negate(Box::new(operand)))
                    } else {
                        Ok(operand)
                    }
                }
                Rule::Postfix => self.postfix(children),
                Rule::Paren => match children.len() {
                    2 => Ok(Expr::Tuple(vec![])),
                    _ => self.expr(&children[1]),
                },
                Rule::List => match children.len() {
                    2 => Ok(Expr::Array(vec![])),
                    _ => match self.expr(&children[1])? {
                        Expr::Tuple(items) if children[1].rule() == Some(Rule::ExprList) => {
                            Ok(Expr::Array(items))
                        }
                        item => Ok(Expr::Array(vec![item])),
                    },
                },
                Rule::Dict => match children.len() {
                    2 => Ok(Expr::Object(vec![])),
                    _ => self.dict_items(children[1].children()),
                },
                Rule::ImplicitField => Ok(Expr::attr(Expr::Arg, self.name(&children[1])?)),
                Rule::Argument => Err(self.error("Keyword argument outside of a call", node)),
                Rule::ArgList | Rule::Trailer | Rule::DictItems | Rule::NotIn => {
                    Err(self.error(format!("Unexpected {:?} in expression", rule), node))
                }
            },
        }
    }

    fn terminal(&self, kind: TokenKind, text: &str, node: &SyntaxNode) -> Result<Expr, SyntaxError> {
        match kind {
            TokenKind::Integer => match text.parse::<i64>() {
                Ok(n) => Ok(Expr::Integer(n)),
                // too large for i64, keep it as a float like JSON would
                Err(_) => text
                    .parse::<f64>()
                    .map(Expr::Float)
                    .map_err(|_| self.error(format!("Invalid integer '{}'", text), node)),
            },
            TokenKind::Float => text
                .parse::<f64>()
                .map(Expr::Float)
                .map_err(|_| self.error(format!("Invalid float '{}'", text), node)),
            TokenKind::String => Ok(Expr::String(unescape(text))),
            TokenKind::True => Ok(Expr::Boolean(true)),
            TokenKind::False => Ok(Expr::Boolean(false)),
            TokenKind::Null => Ok(Expr::Null),
            TokenKind::Identifier if text == "x" => Ok(Expr::Arg),
            TokenKind::Identifier => Ok(Expr::Name(text.to_string())),
            _ => Err(self.error(format!("Unexpected '{}' in expression", text), node)),
        }
    }

    fn name(&self, node: &SyntaxNode) -> Result<String, SyntaxError> {
        match node {
            SyntaxNode::Terminal { text, .. } => Ok(text.clone()),
            _ => Err(self.error("Expected a name", node)),
        }
    }

    /// Comma-separated items, commas dropped.
    fn items(&self, children: &[SyntaxNode]) -> Result<Vec<Expr>, SyntaxError> {
        children
            .iter()
            .filter(|c| c.kind() != Some(TokenKind::Comma))
            .map(|c| self.expr(c))
            .collect()
    }

    /// `operand (op operand)*`, folded left to right.
    fn binary_chain(&self, children: &[SyntaxNode]) -> Result<Expr, SyntaxError> {
        let mut left = self.expr(&children[0])?;
        for pair in children[1..].chunks(2) {
            let op = pair[0]
                .kind()
                .and_then(binop)
                .ok_or_else(|| self.error("Expected an operator", &pair[0]))?;
            let right = self.expr(&pair[1])?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// `a < b < c` means `a < b and b < c`.
    fn comparison_chain(&self, children: &[SyntaxNode]) -> Result<Expr, SyntaxError> {
        let mut operands = vec![self.expr(&children[0])?];
        let mut comparisons = Vec::new();
        for pair in children[1..].chunks(2) {
            let right = self.expr(&pair[1])?;
            let left = operands[operands.len() - 1].clone();
            if pair[0].rule() == Some(Rule::NotIn) {
                let contained = Expr::binary(BinOp::In, left, right.clone());
                comparisons.push(Expr::Not(Box::new(contained)));
            } else {
                let op = pair[0]
                    .kind()
                    .and_then(binop)
                    .ok_or_else(|| self.error("Expected a comparison operator", &pair[0]))?;
                comparisons.push(Expr::binary(op, left, right.clone()));
            }
            operands.push(right);
        }

        let mut comparisons = comparisons.into_iter();
        let first = comparisons
            .next()
            .ok_or_else(|| self.error("Expected a comparison", &children[0]))?;
        Ok(comparisons.fold(first, |acc, cmp| Expr::binary(BinOp::And, acc, cmp)))
    }

    fn postfix(&self, children: &[SyntaxNode]) -> Result<Expr, SyntaxError> {
        let mut expr = self.expr(&children[0])?;
        for trailer in &children[1..] {
            let parts = trailer.children();
            expr = match parts.first().and_then(SyntaxNode::kind) {
                Some(TokenKind::LParen) => {
                    let (args, kwargs) = match parts.len() {
                        2 => (vec![], vec![]),
                        _ => split_arguments(self.arguments(&parts[1])?),
                    };
                    Expr::Call {
                        function: Box::new(expr),
                        args,
                        kwargs,
                    }
                }
                Some(TokenKind::LBracket) => Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(self.expr(&parts[1])?),
                },
                Some(TokenKind::Dot) => Expr::attr(expr, self.name(&parts[1])?),
                _ => return Err(self.error("Malformed trailer", trailer)),
            };
        }
        Ok(expr)
    }

    fn arguments(&self, node: &SyntaxNode) -> Result<Vec<Argument>, SyntaxError> {
        node.children()
            .iter()
            .filter(|c| c.kind() != Some(TokenKind::Comma))
            .map(|c| match c.rule() {
                Some(Rule::Argument) => {
                    let parts = c.children();
                    let name = parts[0]
                        .tokens()
                        .first()
                        .map(|s| s.to_string())
                        .ok_or_else(|| self.error("Expected keyword name", c))?;
                    Ok(Argument::Keyword(name, self.expr(&parts[2])?))
                }
                _ => Ok(Argument::Positional(self.expr(c)?)),
            })
            .collect()
    }

    fn dict_items(&self, children: &[SyntaxNode]) -> Result<Expr, SyntaxError> {
        let mut pairs = Vec::new();
        let mut rest = children;
        while rest.len() >= 3 {
            let key = match rest[0].tokens().as_slice() {
                [name] if is_identifier(&rest[0]) => Expr::String(name.to_string()),
                _ => self.expr(&rest[0])?,
            };
            pairs.push((key, self.expr(&rest[2])?));
            rest = if rest.len() > 3 { &rest[4..] } else { &[] };
        }
        Ok(Expr::Object(pairs))
    }
}

/// A node that is one identifier token, through single-child wrappers.
fn is_identifier(node: &SyntaxNode) -> bool {
    match node {
        SyntaxNode::Terminal { kind, .. } => *kind == TokenKind::Identifier,
        SyntaxNode::Composite { children, .. } => children.len() == 1 && is_identifier(&children[0]),
    }
}

/// Splits lowered arguments into positional and keyword lists.
pub fn split_arguments(arguments: Vec<Argument>) -> (Vec<Expr>, Vec<(String, Expr)>) {
    let mut args = Vec::new();
    let mut kwargs = Vec::new();
    for argument in arguments {
        match argument {
            Argument::Positional(expr) => args.push(expr),
            Argument::Keyword(name, expr) => kwargs.push((name, expr)),
        }
    }
    (args, kwargs)
}
