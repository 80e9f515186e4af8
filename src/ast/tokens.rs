/// Lexical token kinds.
///
/// The literal text of a token is kept next to its kind (see [`Lexeme`]) so the
/// compiler can re-join tokens into parameter text without losing spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    /// Integer literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 0
    /// ```
    Integer,

    /// Floating point literal
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 1e3
    /// ```
    Float,

    /// String literal in single or double quotes, quotes included in the text
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'item #1'
    /// ```
    String,

    /// `True` / `true`
    True,

    /// `False` / `false`
    False,

    /// `None` / `null`
    Null,

    /// Stage name, field name or the implicit argument `x`
    ///
    /// # Examples
    /// ```text
    /// map
    /// x
    /// reverse
    /// ```
    Identifier,

    // Keywords
    /// Logical AND (word, not symbol)
    And,

    /// Logical OR (word, not symbol)
    Or,

    /// Logical negation
    Not,

    /// Membership test
    In,

    // Comparison
    /// `==`
    EqEq,

    /// `!=`
    NotEq,

    /// `<`
    Lt,

    /// `>`
    Gt,

    /// `<=`
    LtEq,

    /// `>=`
    GtEq,

    // Arithmetic
    /// Addition or concatenation
    Plus,

    /// Subtraction or unary minus
    Minus,

    /// Multiplication
    Star,

    /// Division
    Slash,

    /// Modulo
    Percent,

    /// Keyword argument binding
    ///
    /// # Examples
    /// ```text
    /// sorted(.id, reverse=True)
    /// ```
    Assign,

    // Delimiters
    /// `(`
    LParen,

    /// `)`
    RParen,

    /// `[`
    LBracket,

    /// `]`
    RBracket,

    /// `{`
    LBrace,

    /// `}`
    RBrace,

    /// Attribute access or implicit-argument field (`.id`)
    Dot,

    /// Separates stages, arguments and collection items
    Comma,

    /// Object literal key/value separator
    Colon,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Relational and equality operators. A bare expression containing one
    /// of these is short-hand for a filter.
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::LtEq
                | TokenKind::GtEq
        )
    }
}

/// A token together with its source spelling and byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
}
