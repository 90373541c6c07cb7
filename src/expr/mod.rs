//! The expression language: lexer, parser, AST, and format strings.
//!
//! Shared by `!expr`, `!fmt` (for the `{...}` slots), `!lambda`, and
//! `!composite` parts. Every node carries the span of its source text in
//! the original YAML document.

pub mod ast;
pub mod fmt;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{Expr, ExprKind, ExprRef, FmtPart, FmtString, LambdaDef};
pub use fmt::parse_format;
pub use parser::{parse_expression, parse_lambda};
