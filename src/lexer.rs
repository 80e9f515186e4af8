use crate::{
    ast::{Lexeme, TokenKind},
    parser::SyntaxError,
};

pub struct Lexer {
    source: String,
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            source: input.to_string(),
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> SyntaxError {
        SyntaxError::at(message, &self.source, offset)
    }

    fn text_from(&self, start: usize) -> String {
        self.input[start..self.position].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let start = self.position;
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        self.text_from(start)
    }

    /// Reads a quoted string, keeping quotes and escapes as written.
    fn read_string(&mut self, quote: char) -> Result<String, SyntaxError> {
        let start = self.position;
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(self.text_from(start));
                }
                '\\' => {
                    self.advance();
                    if self.current_char().is_none() {
                        break;
                    }
                    self.advance();
                }
                _ => self.advance(),
            }
        }

        Err(self.error("Unterminated string: missing closing quote", start))
    }

    fn read_number(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.position;
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                self.advance();
            } else if (ch == 'e' || ch == 'E')
                && (self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
                    || (matches!(self.peek_char(1), Some('+') | Some('-'))
                        && self.peek_char(2).is_some_and(|c| c.is_ascii_digit())))
            {
                is_float = true;
                self.advance();
                if matches!(self.current_char(), Some('+') | Some('-')) {
                    self.advance();
                }
            } else {
                break;
            }
        }

        if self.current_char().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return Err(self.error(
                format!("Invalid number literal '{}'", self.text_from(start)),
                start,
            ));
        }

        Ok(if is_float {
            TokenKind::Float
        } else {
            TokenKind::Integer
        })
    }

    /// Consumes `len` characters as one token of the given kind.
    fn symbol(&mut self, kind: TokenKind, len: usize) -> (TokenKind, String) {
        let start = self.position;
        self.position += len;
        (kind, self.text_from(start))
    }

    pub fn next_token(&mut self) -> Result<Lexeme, SyntaxError> {
        self.skip_whitespace();
        let offset = self.position;

        let (kind, text) = match self.current_char() {
            None => (TokenKind::Eof, String::new()),
            Some('(') => self.symbol(TokenKind::LParen, 1),
            Some(')') => self.symbol(TokenKind::RParen, 1),
            Some('[') => self.symbol(TokenKind::LBracket, 1),
            Some(']') => self.symbol(TokenKind::RBracket, 1),
            Some('{') => self.symbol(TokenKind::LBrace, 1),
            Some('}') => self.symbol(TokenKind::RBrace, 1),
            Some(',') => self.symbol(TokenKind::Comma, 1),
            Some(':') => self.symbol(TokenKind::Colon, 1),
            Some('+') => self.symbol(TokenKind::Plus, 1),
            Some('-') => self.symbol(TokenKind::Minus, 1),
            Some('*') => self.symbol(TokenKind::Star, 1),
            Some('/') => self.symbol(TokenKind::Slash, 1),
            Some('%') => self.symbol(TokenKind::Percent, 1),
            Some('.') => {
                if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error("Number literals must start with a digit", offset));
                }
                self.symbol(TokenKind::Dot, 1)
            }
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.symbol(TokenKind::EqEq, 2)
                } else {
                    self.symbol(TokenKind::Assign, 1)
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.symbol(TokenKind::NotEq, 2)
                } else {
                    return Err(self.error("Unexpected '!' (did you mean '!=' or 'not'?)", offset));
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.symbol(TokenKind::LtEq, 2)
                } else {
                    self.symbol(TokenKind::Lt, 1)
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.symbol(TokenKind::GtEq, 2)
                } else {
                    self.symbol(TokenKind::Gt, 1)
                }
            }
            Some(q @ ('"' | '\'')) => (TokenKind::String, self.read_string(q)?),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();
                let kind = match ident.as_str() {
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "not" => TokenKind::Not,
                    "in" => TokenKind::In,
                    "True" | "true" => TokenKind::True,
                    "False" | "false" => TokenKind::False,
                    "None" | "null" => TokenKind::Null,
                    _ => TokenKind::Identifier,
                };
                (kind, ident)
            }
            Some(ch) if ch.is_ascii_digit() => {
                let kind = self.read_number()?;
                (kind, self.text_from(offset))
            }
            Some(ch) => {
                return Err(self.error(format!("Unexpected character '{}'", ch), offset));
            }
        };

        Ok(Lexeme { kind, text, offset })
    }

    /// Lexes the whole input; the last lexeme is always [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Lexeme>, SyntaxError> {
        let mut lexemes = Vec::new();
        loop {
            let lexeme = self.next_token()?;
            let done = lexeme.kind == TokenKind::Eof;
            lexemes.push(lexeme);
            if done {
                return Ok(lexemes);
            }
        }
    }
}

#[cfg(test)]
fn kinds(input: &str) -> Vec<TokenKind> {
    Lexer::new(input)
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|l| l.kind)
        .collect()
}

#[test]
fn test_keywords() {
    assert_eq!(
        kinds("and or not in True false None"),
        vec![
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Not,
            TokenKind::In,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Null,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_stage_call() {
    let lexemes = Lexer::new("filter(.id >= 1)").tokenize().unwrap();
    let texts: Vec<&str> = lexemes.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["filter", "(", ".", "id", ">=", "1", ")", ""]);
    assert_eq!(lexemes[4].kind, TokenKind::GtEq);
    assert_eq!(lexemes[4].offset, 11);
}

#[test]
fn test_assign_vs_equality() {
    assert_eq!(
        kinds("a=b==c"),
        vec![
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::Identifier,
            TokenKind::EqEq,
            TokenKind::Identifier,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_string_keeps_quotes() {
    let lexemes = Lexer::new(r#"x["a\"b"]"#).tokenize().unwrap();
    assert_eq!(lexemes[2].kind, TokenKind::String);
    assert_eq!(lexemes[2].text, r#""a\"b""#);
}

#[test]
fn test_unterminated_string() {
    let err = Lexer::new("map('abc)").tokenize().unwrap_err();
    assert_eq!(err.offset, 4);
}
