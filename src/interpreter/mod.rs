//! Tree-walking interpreter for the rule language.
//!
//! Source text is tokenized by [`lexer`], parsed into [`ast`] nodes by
//! [`parser`] and evaluated by [`Interpreter`] against a lexically scoped
//! [`env::Environment`]. Expressions produce typed [`Value`]s; statements
//! report how they finished through [`control::Flow`].

/// Abstract syntax tree definitions for the rule language.
pub mod ast;
/// Functions implemented by the interpreter itself.
pub mod builtins;
/// Closures and argument binding.
pub mod call;
/// Statement completion signals.
pub mod control;
/// Frame arena with static and dynamic parent links.
pub mod env;
/// Evaluation of statements and expressions.
pub mod eval;
/// Optional observer hooks for interactive front ends.
pub mod frontend;
/// Tokenizer for the rule language.
pub mod lexer;
/// Recursive-descent parser producing the AST.
pub mod parser;
/// Runtime values.
pub mod value;

pub use ast::{Expr, Ident, IdentKind, Program, Stmt};
pub use call::{Closure, FuncKind};
pub use control::Flow;
pub use eval::{Interpreter, RunReport, StatementError};
pub use frontend::{Frontend, RecordingFrontend};
pub use parser::{ParseError, parse_program};
pub use value::{NetValue, Number, Value};

use thiserror::Error;

use crate::fsm::FsmError;
use crate::grammar::GrammarError;

/// Convenience result alias for interpreter operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors raised while evaluating a program.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A name has no binding in any enclosing frame.
    #[error("undefined identifier {name}")]
    UndefinedIdentifier {
        /// Identifier text
        name: String,
    },

    /// A value of the wrong category reached a typed position.
    #[error("{context} expects a {expected}, got a {found}")]
    TypeMismatch {
        /// Where the value was used
        context: String,
        /// Required category
        expected: &'static str,
        /// Category actually supplied
        found: &'static str,
    },

    /// More positional arguments than parameters.
    #[error("{function} takes {expected} argument(s), {found} given")]
    TooManyArguments {
        /// Called function
        function: String,
        /// Number of parameters
        expected: usize,
        /// Number of positional arguments
        found: usize,
    },

    /// A named argument matches no parameter.
    #[error("{function} has no parameter {name}")]
    UnknownParameter {
        /// Called function
        function: String,
        /// Argument name
        name: String,
    },

    /// A parameter was given both positionally and by name, or twice by name.
    #[error("parameter {name} of {function} is bound more than once")]
    DuplicateArgument {
        /// Called function
        function: String,
        /// Parameter name
        name: String,
    },

    /// A parameter without default received no argument.
    #[error("missing argument {name} for {function}")]
    MissingArgument {
        /// Called function
        function: String,
        /// Parameter name
        name: String,
    },

    /// A function returned nothing or the wrong category.
    #[error("{function} must return a {expected}, returned {found}")]
    ReturnType {
        /// Called function
        function: String,
        /// Declared return category
        expected: &'static str,
        /// What the body produced
        found: &'static str,
    },

    /// A rule is malformed.
    #[error("invalid rule: {0}")]
    RuleSemantic(String),

    /// Matched where-clause lists differ in length.
    #[error("where-clause variable {name} ranges over {found} item(s), expected {expected}")]
    WhereClauseLength {
        /// Variable whose list has the wrong length
        name: String,
        /// Length of the first list in the clause
        expected: usize,
        /// Length of this variable's list
        found: usize,
    },

    /// A list index or numeric argument is out of range.
    #[error("index {index} is out of range for {name} (length {length})")]
    ArgumentRange {
        /// List or argument name
        name: String,
        /// Offending value
        index: i64,
        /// Valid length
        length: usize,
    },

    /// An `assert` statement failed.
    #[error("assertion failed: {message}")]
    AssertionFailed {
        /// User message or a default
        message: String,
    },

    /// A `require` statement found an empty language.
    #[error("requirement failed: {message}")]
    RequirementFailed {
        /// User message or a default
        message: String,
    },

    /// A name read from an enclosing frame was rebound locally.
    #[error("{name} refers to an enclosing binding and cannot be redefined here")]
    ShadowsFreeVariable {
        /// Identifier text
        name: String,
    },

    /// Integer division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Grammar linking failed.
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// An automaton operation failed.
    #[error(transparent)]
    Fsm(#[from] FsmError),

    /// The program text could not be parsed.
    #[error(transparent)]
    Syntax(#[from] ParseError),
}
