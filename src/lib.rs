pub mod age;
pub mod ast;
pub mod compiler;
pub mod engine;
pub mod evaluator;
pub mod lexer;
pub mod lower;
pub mod output;
pub mod parser;
pub mod tree;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{BinOp, Callable, Expr, Invocation, Pipeline, Stage, StageCall, Trailer};
pub use compiler::{CompileError, compile, parse_query};
pub use engine::{Engine, Records};
pub use evaluator::{EvalError, Evaluator};
pub use lexer::Lexer;
pub use output::{to_json, to_json_pretty};
pub use parser::{Parser, SyntaxError};
pub use tree::FilteredTree;
pub use value::Value;
