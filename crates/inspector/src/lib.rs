//! # The Inspector: spec-file parsing & rule dispatch
//!
//! **Role**: Turns Ruby spec sources into an arena [`SyntaxTree`] and runs the
//! registered [`Rule`]s over it, collecting [`common::Offense`]s.
//!
//! **Core Types**:
//! - `SyntaxTree` / `NodeKind`: parser-gem shaped nodes addressed by `NodeId`.
//! - `ParserHost`: tree-sitter Ruby front end.
//! - `Rule` / `Reporter`: the rule interface and its offense sink.
//! - `Dispatcher`: method-name interest index that routes sends to rules.
//!
//! **Design**:
//! - Rules see only call nodes whose method name they registered for.
//! - Rules are stateless; one `Dispatcher` can serve many files concurrently.

pub mod dispatch;
pub mod parser;
pub mod path_util;
pub mod pipeline;
pub mod rules;
pub mod scan;
pub mod tree;

pub use dispatch::Dispatcher;
pub use parser::ParserHost;
pub use pipeline::{FileReport, LintResult};
pub use rules::{Reporter, Rule, RuleContext};
pub use tree::{Block, MethodCall, Node, NodeId, NodeKind, SyntaxTree};

/// Errors produced by the Inspector crate.
#[derive(Debug, thiserror::Error)]
pub enum InspectorError {
    /// Tree-sitter parsing failed.
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// I/O error (file read, directory walk).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Syntax nested deeper than the lowering limit.
    #[error("Nesting too deep: exceeds {0} levels")]
    NestingTooDeep(usize),

    /// Byte range exceeds u32::MAX (file too large).
    #[error("Byte range overflow: file size exceeds 4GB limit")]
    ByteRangeOverflow,
}
