//! Quill IR - AST and shared identifier types for the Quill runtime.
//!
//! This crate holds the data-only inputs to semantic analysis and
//! evaluation:
//!
//! - `Name` / `StringInterner`: interned identifiers
//! - `Span`: source locations for diagnostics
//! - `AstArena` / `NodeKind` / `Program`: the closed AST node enum
//!
//! Lexing and parsing live outside the runtime; anything that can build a
//! `Program` (a front end, or a test assembling nodes by hand) can feed the
//! rest of the pipeline.

mod ast;
mod name;
mod span;

pub use ast::{AstArena, BinaryOp, Node, NodeId, NodeKind, NodeRange, Program, UnaryOp};
pub use name::{Name, SharedInterner, StringInterner};
pub use span::{Span, Spanned};
