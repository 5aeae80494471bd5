//! The openCypher query AST consumed by the translator, and its walker.

pub mod ast;
pub mod walk;

pub use ast::*;
pub use walk::{visit, walk, Node, Visitor};
