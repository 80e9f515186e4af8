//! Grammar adapter: turns query text into a concrete syntax tree.
//!
//! The tree keeps every token, in order, so later passes can work on the
//! token structure alone. See [`Rule`] for the composite node kinds.

use thiserror::Error;

use crate::{
    ast::{Lexeme, Rule, SyntaxNode, TokenKind},
    lexer::Lexer,
};

/// The input could not be parsed by the expression grammar.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} (line {line}, column {column}, offset {offset})")]
pub struct SyntaxError {
    pub message: String,
    /// Character offset into the parsed text
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    pub fn at(message: impl Into<String>, source: &str, offset: usize) -> Self {
        let mut line = 1usize;
        let mut column = 1usize;
        for ch in source.chars().take(offset) {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        SyntaxError {
            message: message.into(),
            offset,
            line,
            column,
        }
    }
}

/// Parses a whole query (`exprlist EOF`).
pub fn parse_query_tree(input: &str) -> Result<SyntaxNode, SyntaxError> {
    Parser::new(input)?.parse_query()
}

/// Parses a call argument list (`[arglist] EOF`) and returns the
/// [`Rule::ArgList`] node.
pub fn parse_arguments(input: &str) -> Result<SyntaxNode, SyntaxError> {
    Parser::new(input)?.parse_arguments()
}

/// Deepest nesting of expressions the grammar accepts.
const MAX_DEPTH: usize = 64;

/// Builds a rule node, or returns the only child unchanged.
fn node(rule: Rule, mut children: Vec<SyntaxNode>) -> SyntaxNode {
    if children.len() == 1 {
        children.remove(0)
    } else {
        SyntaxNode::composite(rule, children)
    }
}

/// The identifier a node stands for, looking through single-child wrappers.
fn bare_identifier(node: &SyntaxNode) -> Option<&str> {
    match node {
        SyntaxNode::Terminal {
            kind: TokenKind::Identifier,
            text,
            ..
        } => Some(text),
        SyntaxNode::Composite { children, .. } if children.len() == 1 => {
            bare_identifier(&children[0])
        }
        _ => None,
    }
}

pub struct Parser {
    source: String,
    lexemes: Vec<Lexeme>,
    position: usize,
    depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, SyntaxError> {
        let lexemes = Lexer::new(input).tokenize()?;
        Ok(Parser {
            source: input.to_string(),
            lexemes,
            position: 0,
            depth: 0,
        })
    }

    fn current(&self) -> &Lexeme {
        // tokenize() always ends with Eof, and bump() never moves past it
        &self.lexemes[self.position.min(self.lexemes.len() - 1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.lexemes
            .get(self.position + 1)
            .is_some_and(|lexeme| lexeme.kind == kind)
    }

    /// Runs `parse` one nesting level deeper, failing past [`MAX_DEPTH`].
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth >= MAX_DEPTH {
            return Err(SyntaxError::at(
                "Expression is nested too deeply",
                &self.source,
                self.current().offset,
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Consumes the current token as a terminal node.
    fn bump(&mut self) -> SyntaxNode {
        let lexeme = self.current().clone();
        if lexeme.kind != TokenKind::Eof {
            self.position += 1;
        }
        SyntaxNode::terminal(lexeme.kind, lexeme.text, lexeme.offset)
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let lexeme = self.current();
        let found = if lexeme.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", lexeme.text)
        };
        SyntaxError::at(
            format!("Expected {}, found {}", expected, found),
            &self.source,
            lexeme.offset,
        )
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<SyntaxNode, SyntaxError> {
        if self.check(kind) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(expected))
        }
    }

    pub fn parse_query(&mut self) -> Result<SyntaxNode, SyntaxError> {
        let list = self.parse_expr_list_node()?;
        let eof = self.expect(TokenKind::Eof, "',' or end of input")?;
        Ok(SyntaxNode::composite(Rule::Query, vec![list, eof]))
    }

    pub fn parse_arguments(&mut self) -> Result<SyntaxNode, SyntaxError> {
        let args = if self.check(TokenKind::Eof) {
            SyntaxNode::composite(Rule::ArgList, vec![])
        } else {
            self.parse_arglist(TokenKind::Eof)?
        };
        self.expect(TokenKind::Eof, "',' or end of input")?;
        Ok(args)
    }

    /// Top-level list, always a [`Rule::ExprList`] node.
    fn parse_expr_list_node(&mut self) -> Result<SyntaxNode, SyntaxError> {
        let children = self.parse_expr_items(TokenKind::Eof)?;
        Ok(SyntaxNode::composite(Rule::ExprList, children))
    }

    /// `expr (',' expr)* [',']`, stopping before `closing`.
    fn parse_expr_items(&mut self, closing: TokenKind) -> Result<Vec<SyntaxNode>, SyntaxError> {
        let mut children = vec![self.parse_expression()?];
        while self.check(TokenKind::Comma) {
            children.push(self.bump());
            if self.check(closing) {
                break;
            }
            children.push(self.parse_expression()?);
        }
        Ok(children)
    }

    pub fn parse_expression(&mut self) -> Result<SyntaxNode, SyntaxError> {
        self.nested(Self::parse_or)
    }

    fn parse_or(&mut self) -> Result<SyntaxNode, SyntaxError> {
        let mut children = vec![self.parse_and()?];
        while self.check(TokenKind::Or) {
            children.push(self.bump());
            children.push(self.parse_and()?);
        }
        Ok(node(Rule::Or, children))
    }

    fn parse_and(&mut self) -> Result<SyntaxNode, SyntaxError> {
        let mut children = vec![self.parse_not()?];
        while self.check(TokenKind::And) {
            children.push(self.bump());
            children.push(self.parse_not()?);
        }
        Ok(node(Rule::And, children))
    }

    fn parse_not(&mut self) -> Result<SyntaxNode, SyntaxError> {
        if self.check(TokenKind::Not) {
            let op = self.bump();
            let operand = self.nested(Self::parse_not)?;
            return Ok(SyntaxNode::composite(Rule::Not, vec![op, operand]));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<SyntaxNode, SyntaxError> {
        let mut children = vec![self.parse_arith()?];
        loop {
            if self.current().kind.is_relational() || self.check(TokenKind::In) {
                children.push(self.bump());
            } else if self.check(TokenKind::Not) && self.check_next(TokenKind::In) {
                let not = self.bump();
                let is_in = self.bump();
                children.push(SyntaxNode::composite(Rule::NotIn, vec![not, is_in]));
            } else {
                break;
            }
            children.push(self.parse_arith()?);
        }
        Ok(node(Rule::Comparison, children))
    }

    fn parse_arith(&mut self) -> Result<SyntaxNode, SyntaxError> {
        let mut children = vec![self.parse_term()?];
        while self.check(TokenKind::Plus) || self.check(TokenKind::Minus) {
            children.push(self.bump());
            children.push(self.parse_term()?);
        }
        Ok(node(Rule::Arith, children))
    }

    fn parse_term(&mut self) -> Result<SyntaxNode, SyntaxError> {
        let mut children = vec![self.parse_factor()?];
        while matches!(
            self.current().kind,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent
        ) {
            children.push(self.bump());
            children.push(self.parse_factor()?);
        }
        Ok(node(Rule::Term, children))
    }

    fn parse_factor(&mut self) -> Result<SyntaxNode, SyntaxError> {
        if self.check(TokenKind::Minus) || self.check(TokenKind::Plus) {
            let sign = self.bump();
            let operand = self.nested(Self::parse_factor)?;
            return Ok(SyntaxNode::composite(Rule::Factor, vec![sign, operand]));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<SyntaxNode, SyntaxError> {
        let mut children = vec![self.parse_atom()?];

        loop {
            if self.check(TokenKind::LParen) {
                let open = self.bump();
                let mut trailer = vec![open];
                if !self.check(TokenKind::RParen) {
                    trailer.push(self.parse_arglist(TokenKind::RParen)?);
                }
                trailer.push(self.expect(TokenKind::RParen, "')'")?);
                children.push(SyntaxNode::composite(Rule::Trailer, trailer));
            } else if self.check(TokenKind::LBracket) {
                let open = self.bump();
                let index = self.parse_expression()?;
                let close = self.expect(TokenKind::RBracket, "']'")?;
                children.push(SyntaxNode::composite(Rule::Trailer, vec![open, index, close]));
            } else if self.check(TokenKind::Dot) {
                let dot = self.bump();
                let name = self.parse_attribute_name()?;
                children.push(SyntaxNode::composite(Rule::Trailer, vec![dot, name]));
            } else {
                break;
            }
        }

        Ok(SyntaxNode::composite(Rule::Postfix, children))
    }

    /// Keywords are valid attribute names (`x.in`, `x.not`).
    fn parse_attribute_name(&mut self) -> Result<SyntaxNode, SyntaxError> {
        match self.current().kind {
            TokenKind::Identifier
            | TokenKind::And
            | TokenKind::Or
            | TokenKind::Not
            | TokenKind::In
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null => Ok(self.bump()),
            _ => Err(self.unexpected("attribute name after '.'")),
        }
    }

    fn parse_arglist(&mut self, closing: TokenKind) -> Result<SyntaxNode, SyntaxError> {
        let mut children = vec![self.parse_argument()?];
        while self.check(TokenKind::Comma) {
            children.push(self.bump());
            if self.check(closing) {
                break;
            }
            children.push(self.parse_argument()?);
        }
        Ok(SyntaxNode::composite(Rule::ArgList, children))
    }

    fn parse_argument(&mut self) -> Result<SyntaxNode, SyntaxError> {
        let start = self.current().offset;
        let value = self.parse_expression()?;
        if !self.check(TokenKind::Assign) {
            return Ok(value);
        }
        if bare_identifier(&value).is_none() {
            return Err(SyntaxError::at(
                "Keyword argument name must be an identifier",
                &self.source,
                start,
            ));
        }
        let assign = self.bump();
        let bound = self.parse_expression()?;
        Ok(SyntaxNode::composite(Rule::Argument, vec![value, assign, bound]))
    }

    fn parse_atom(&mut self) -> Result<SyntaxNode, SyntaxError> {
        match self.current().kind {
            TokenKind::Integer
            | TokenKind::Float
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::Identifier => Ok(self.bump()),
            TokenKind::Dot => {
                let dot = self.bump();
                let name = self.parse_attribute_name()?;
                Ok(SyntaxNode::composite(Rule::ImplicitField, vec![dot, name]))
            }
            TokenKind::LParen => self.parse_delimited(Rule::Paren, TokenKind::RParen, "')'"),
            TokenKind::LBracket => self.parse_delimited(Rule::List, TokenKind::RBracket, "']'"),
            TokenKind::LBrace => {
                let open = self.bump();
                let mut children = vec![open];
                if !self.check(TokenKind::RBrace) {
                    children.push(self.parse_dict_items()?);
                }
                children.push(self.expect(TokenKind::RBrace, "'}'")?);
                Ok(SyntaxNode::composite(Rule::Dict, children))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `open [exprlist] close`
    fn parse_delimited(
        &mut self,
        rule: Rule,
        closing: TokenKind,
        expected: &str,
    ) -> Result<SyntaxNode, SyntaxError> {
        let open = self.bump();
        let mut children = vec![open];
        if !self.check(closing) {
            let items = self.parse_expr_items(closing)?;
            children.push(node(Rule::ExprList, items));
        }
        children.push(self.expect(closing, expected)?);
        Ok(SyntaxNode::composite(rule, children))
    }

    /// `key ':' expr (',' key ':' expr)* [',']`, kept flat.
    fn parse_dict_items(&mut self) -> Result<SyntaxNode, SyntaxError> {
        let mut children = Vec::new();
        loop {
            children.push(self.parse_expression()?);
            children.push(self.expect(TokenKind::Colon, "':'")?);
            children.push(self.parse_expression()?);
            if !self.check(TokenKind::Comma) {
                break;
            }
            children.push(self.bump());
            if self.check(TokenKind::RBrace) {
                break;
            }
        }
        Ok(SyntaxNode::composite(Rule::DictItems, children))
    }
}
