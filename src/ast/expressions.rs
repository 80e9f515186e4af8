use std::fmt;

use crate::ast::BinOp;

/// Evaluable expression tree for the body of a stage callable.
///
/// Built by lowering the concrete syntax tree of one parameter. Evaluation
/// happens against a single implicit argument, spelled `x` in queries.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    /// Literal integer
    ///
    /// # Example
    /// ```text
    /// 42
    /// ```
    Integer(i64),

    /// Literal floating point number
    ///
    /// # Example
    /// ```text
    /// 42.0
    /// ```
    Float(f64),

    /// String literal, escapes already resolved
    String(String),

    /// `True` / `False`
    Boolean(bool),

    /// `None`
    Null,

    // References
    /// The implicit argument (`x`)
    Arg,

    /// Any other bare identifier
    ///
    /// Resolves to a builtin function when called, otherwise it is an
    /// evaluation error.
    Name(String),

    // Access
    /// Attribute access
    ///
    /// # Examples
    /// ```text
    /// x.id
    /// .id          // short for x.id
    /// x.b.d
    /// ```
    Attr { object: Box<Expr>, name: String },

    /// Subscript access
    ///
    /// # Examples
    /// ```text
    /// x["a"]
    /// x.b.d[0]
    /// ```
    Index { object: Box<Expr>, index: Box<Expr> },

    /// Function or method call
    ///
    /// # Examples
    /// ```text
    /// len(.a)
    /// x.get("a", 0)
    /// ```
    Call {
        function: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },

    // Operations
    /// Binary operation (arithmetic, comparison, logical)
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `not expr`
    Not(Box<Expr>),

    /// `-expr`
    Negate(Box<Expr>),

    // Collections
    /// Array literal
    ///
    /// # Example
    /// ```text
    /// [x.a, x.b]
    /// ```
    Array(Vec<Expr>),

    /// Parenthesised, comma-separated expressions
    Tuple(Vec<Expr>),

    /// Object literal; keys are expressions so `{id: x.a}` and
    /// `{"id": x.a}` both work (a bare identifier key is a string)
    Object(Vec<(Expr, Expr)>),
}

impl Expr {
    pub fn attr(object: Expr, name: impl Into<String>) -> Self {
        Expr::Attr {
            object: Box::new(object),
            name: name.into(),
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

/// Renders the expression back to query syntax, fully parenthesising nested
/// binary operations.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Integer(n) => write!(f, "{n}"),
            Expr::Float(n) => write!(f, "{n:?}"),
            Expr::String(s) => write_string(f, s),
            Expr::Boolean(true) => f.write_str("True"),
            Expr::Boolean(false) => f.write_str("False"),
            Expr::Null => f.write_str("None"),
            Expr::Arg => f.write_str("x"),
            Expr::Name(name) => f.write_str(name),
            Expr::Attr { object, name } => write!(f, "{object}.{name}"),
            Expr::Index { object, index } => write!(f, "{object}[{index}]"),
            Expr::Call {
                function,
                args,
                kwargs,
            } => {
                write!(f, "{function}(")?;
                write_list(f, args)?;
                for (i, (name, value)) in kwargs.iter().enumerate() {
                    if i > 0 || !args.is_empty() {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                f.write_str(")")
            }
            Expr::BinaryOp { op, left, right } => {
                let wrap = |e: &Expr| matches!(e, Expr::BinaryOp { .. });
                if wrap(left) {
                    write!(f, "({left})")?;
                } else {
                    write!(f, "{left}")?;
                }
                write!(f, " {op} ")?;
                if wrap(right) {
                    write!(f, "({right})")
                } else {
                    write!(f, "{right}")
                }
            }
            Expr::Not(inner) => write!(f, "not {inner}"),
            Expr::Negate(inner) => write!(f, "-{inner}"),
            Expr::Array(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Expr::Tuple(items) => {
                f.write_str("(")?;
                write_list(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Expr::Object(pairs) => {
                f.write_str("{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}
