//! # jf query language - syntax trees
//!
//! Four layers of tree live here:
//!
//! - **[tokens]** - lexical token kinds, with their spelling kept alongside
//! - **[syntax]** - the concrete syntax tree produced by the grammar
//! - **[expressions]** / **[operators]** - the evaluable expression tree that
//!   stage callables are made of
//! - **[pipeline]** - compiled stages and the pipeline that orders them
//!
//! ## Quick Start
//!
//! ```text
//! map(x.id), filter(.id > 1), sorted(.id, reverse=True), first(2)
//! ```
//!
//! Each comma-separated part is one stage. The arguments of a stage become
//! either the per-record callable (positional) or options of the stage
//! itself (keyword).
//!
//! ## Implicit argument
//!
//! Inside a stage the current record is `x`. A leading dot is short for it:
//! `.id` is `x.id`.
//!
//! ## Short-hand
//!
//! ```text
//! {id: x.a}        // map({id: x.a})
//! (.id > 1)        // filter(.id > 1)
//! ```
//!
//! ## math
//!
//! `math.log`, `math.sqrt`, `math.floor` and the rest of the `math` table
//! are callable without an import: `map(math.sqrt(.area))`.
pub mod tokens;
pub mod syntax;
pub mod expressions;
pub mod operators;
pub mod pipeline;

pub use tokens::{Lexeme, TokenKind};
pub use syntax::{Rule, SyntaxNode};
pub use expressions::Expr;
pub use operators::BinOp;
pub use pipeline::{Argument, Callable, Invocation, Pipeline, Stage, StageCall, TaggedParam, Trailer};
