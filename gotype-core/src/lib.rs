//! Core pipeline of the GoType transpiler.
//!
//! GoType is a small, indentation-sensitive, Python-like dialect that is
//! translated into Go source. The pipeline is:
//!
//!   source .py
//!     -> lexer      (tokens with INDENT markers)
//!     -> indent     (explicit block-close markers)
//!     -> parser     (AST + hoisted function list)
//!     -> analyzer   (declare-before-use, nominal types)
//!     -> codegen_go (Go text)
//!
//! The crate does no I/O. Tools (the CLI, tests) call [`compile`] or the
//! individual phase functions.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing, indentation and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod indent;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Semantic layer: types, builtins, analysis
// ---------------------------------------------------------------------

pub mod types;
pub mod builtins;
pub mod analyzer;

// ---------------------------------------------------------------------
// Back-end: code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod codegen_go;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use analyzer::analyze;
pub use codegen_go::emit;
pub use compiler::compile;
pub use diagnostic::Diagnostic;
pub use error::{AnalysisRule, CoreError};
pub use indent::normalize;
pub use lexer::lex;
pub use parser::parse;
