//! MiniLisp - a minimal Lisp front-end and tree-walking evaluator
//!
//! This crate turns parenthesized source text into an [`ast::Expression`] tree and
//! evaluates it against a lexically scoped environment chain. The language is
//! deliberately small:
//!
//! ```scheme
//! (define fact (fun (n) (if (< n 2) 1 (* n (fact (- n 1))))))
//! (print-num (fact 5))        ; 120
//! (print-bool (and #t (> 3 2)))
//! ```
//!
//! ## Strict Typing
//!
//! There are exactly three kinds of runtime value: integers, booleans and
//! procedures. Builtins never coerce:
//! - Arithmetic and comparison operators accept only integers
//! - `and`, `or`, `not` and the `if` test accept only booleans
//! - Every builtin checks its argument count before its argument types
//! - Integer arithmetic reports overflow and division by zero
//!
//! ## Modules
//!
//! - `lexer`: splits source text into parenthesis and atom tokens
//! - `parser`: recursive-descent construction of the expression tree
//! - `environment`: reference-counted scope chain
//! - `evaluator`: special forms, procedure application and closures
//! - `builtinops`: the native procedure table with arity/type rules
//! - `source`: collecting interactively entered program text

use std::fmt;

pub use builtinops::Arity;
pub use value::ValueKind;

/// Structural failures detected while reading program text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// Input ended while a list was still open
    #[error("unexpected EOF: missing ')'")]
    UnexpectedEndOfInput,
    /// A `)` appeared with no matching `(`
    #[error("unexpected ')'")]
    UnmatchedCloseParen,
    /// List nesting exceeded the configured parse depth
    #[error("expression too deeply nested (max depth: {max_depth})")]
    TooDeeplyNested { max_depth: usize },
    /// A numeric literal that does not fit the integer type
    #[error("integer literal out of range: {0}")]
    IntegerOutOfRange(String),
    /// Tokenization stalled; unreachable for well-formed UTF-8 text
    #[error("unreadable input at byte offset {offset}")]
    Lex { offset: usize },
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("ParseError: {0}")]
    Parse(#[from] ParseError),
    #[error("Name {0} is not defined")]
    UnboundName(String),
    #[error("Expect '{expected}' but got '{found}'.")]
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("ArityError: {procedure} expected {expected} arguments, got {got}")]
    ArityMismatch {
        procedure: String,
        expected: Arity,
        got: usize,
    },
    #[error("Cannot apply a value of type '{0}'")]
    NotAProcedure(ValueKind),
    #[error("Malformed {form} form: {reason}")]
    MalformedForm { form: &'static str, reason: String },
    #[error("Division by zero in '{0}'")]
    DivisionByZero(&'static str),
    #[error("Integer overflow in '{0}'")]
    IntegerOverflow(&'static str),
    #[error("Evaluation depth limit exceeded (max: {0})")]
    DepthLimitExceeded(usize),
    #[error("Failed to write output: {0}")]
    Output(String),
}

impl Error {
    pub(crate) fn arity(procedure: impl fmt::Display, expected: Arity, got: usize) -> Self {
        Error::ArityMismatch {
            procedure: procedure.to_string(),
            expected,
            got,
        }
    }

    pub(crate) fn malformed(form: &'static str, reason: impl Into<String>) -> Self {
        Error::MalformedForm {
            form,
            reason: reason.into(),
        }
    }
}

pub mod ast;
pub mod builtinops;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod source;
pub mod value;

pub use evaluator::{EvalConfig, run, run_with_output};
pub use parser::{ParseConfig, parse_program};
