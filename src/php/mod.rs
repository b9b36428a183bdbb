//! PHP front end
//!
//! Just enough of PHP to find every `include`/`require`, resolve constant
//! targets and see which variables a file's top-level scope touches:
//! - `lexer` - tokens with byte spans, inline HTML included
//! - `parser` - statements and a Pratt expression parser
//! - `ast` - closed syntax tree
//! - `visit` - exhaustive traversal

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod visit;

pub use ast::{Expr, ExprKind, IncludeKind, Program, Span, Stmt, StmtKind};
pub use lexer::line_col;
pub use parser::{parse, ParseError};
pub use visit::{walk_expr, walk_stmt, walk_stmts, Visitor};
