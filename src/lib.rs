//! Kleene – a runtime for a finite-state rule language
//!
//! This crate implements:
//! - A pair-labelled finite-state automaton backend with wildcard-aware sigma handling
//! - A tree-walking interpreter with lexically scoped frames and typed identifiers
//! - A compiler for parallel, contextual and extremal alternation rules
//! - A linker turning right-linear grammars of productions into one automaton

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Interpreter configuration
pub mod config;
/// Finite-state automata and their algebra
pub mod fsm;
/// Right-linear grammar linking
pub mod grammar;
/// Lexer, parser and evaluator for the rule language
pub mod interpreter;
/// Alternation rule compilation
pub mod rules;
/// Symbol table shared by an interpreter and its automata
pub mod symbols;

// Re-export key types for convenience
pub use config::{InterpreterConfig, RtnConvention};
pub use fsm::Fst;
pub use interpreter::{EvalError, Interpreter, RunReport, Value};

/// Current version of the Kleene runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
