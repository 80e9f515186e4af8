use std::fmt;

use crate::ast::Expr;

/// One lowered call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Positional(Expr),
    Keyword(String, Expr),
}

/// A parameter string classified as positional or keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedParam {
    pub text: String,
    /// `false` iff the text has the `name=value` shape
    pub positional: bool,
}

impl TaggedParam {
    pub fn new(text: impl Into<String>, positional: bool) -> Self {
        TaggedParam {
            text: text.into(),
            positional,
        }
    }
}

/// Per-record callable of a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Callable {
    /// No parameters at all; the stage sees records unchanged
    Passthrough,
    /// Positional expressions, evaluated together against the record
    Tuple(Vec<Expr>),
}

impl Callable {
    pub fn exprs(&self) -> &[Expr] {
        match self {
            Callable::Passthrough => &[],
            Callable::Tuple(exprs) => exprs,
        }
    }
}

/// Callable plus the arguments forwarded to the stage itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub callable: Callable,
    /// Keyword arguments in source order
    pub kwargs: Vec<(String, Expr)>,
}

impl Invocation {
    pub fn kwarg(&self, name: &str) -> Option<&Expr> {
        self.kwargs.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

/// Suffix following the first call group of a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Trailer {
    /// `.name`
    Attr(String),
    /// `[expr]`
    Index(Expr),
    /// `(args)`
    Call {
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
}

/// A compiled stage call.
///
/// # Example
/// ```text
/// sorted(.id, reverse=True)
/// ```
/// compiles to name `sorted`, callable `(x.id)`, keyword `reverse=True`.
#[derive(Debug, Clone, PartialEq)]
pub struct StageCall {
    /// Stage name, possibly dotted (`x.update`)
    pub name: String,
    pub invocation: Invocation,
    pub trailers: Vec<Trailer>,
}

/// One pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Call(StageCall),
    /// A bare stage name without arguments, e.g. `unique`
    Reference(String),
}

impl Stage {
    pub fn name(&self) -> &str {
        match self {
            Stage::Call(call) => &call.name,
            Stage::Reference(name) => name,
        }
    }
}

/// Ordered list of compiled stages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

fn write_kwargs(f: &mut fmt::Formatter<'_>, kwargs: &[(String, Expr)]) -> fmt::Result {
    for (name, value) in kwargs {
        write!(f, ", {name}={value}")?;
    }
    Ok(())
}

/// `lambda x, *rest: (a, b), arr, key=value`
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.callable {
            Callable::Passthrough => f.write_str("lambda x, *rest: arr")?,
            Callable::Tuple(exprs) => {
                f.write_str("lambda x, *rest: (")?;
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{expr}")?;
                }
                f.write_str("), arr")?;
            }
        }
        write_kwargs(f, &self.kwargs)
    }
}

impl fmt::Display for Trailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trailer::Attr(name) => write!(f, ".{name}"),
            Trailer::Index(index) => write!(f, "[{index}]"),
            Trailer::Call { args, kwargs } => {
                f.write_str("(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                for (i, (name, value)) in kwargs.iter().enumerate() {
                    if i > 0 || !args.is_empty() {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Reference(name) => f.write_str(name),
            Stage::Call(call) => {
                write!(f, "lambda arr: {}({})", call.name, call.invocation)?;
                for trailer in &call.trailers {
                    write!(f, "{trailer}")?;
                }
                Ok(())
            }
        }
    }
}

/// Textual pipeline description, stages separated by `,`.
impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}
