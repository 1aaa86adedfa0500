//! Abstract syntax tree produced by the parser.
//!
//! An [`Expression`] is either an atom (a [`Expression::Symbol`] or an
//! [`Expression::Number`]) or a [`Expression::List`] of further expressions.
//! There is no separate list or string value at runtime; code is the only
//! compound data. The helpers [`sym`], [`num`] and [`list`] keep hand-built
//! trees in tests readable.

use std::fmt;

/// Type alias for integer values in the interpreter
pub type NumberType = i64;

/// Core AST type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// Identifiers, including operator names such as `+` and literals such as `#t`
    Symbol(String),
    /// Integer literals
    Number(NumberType),
    /// Compound forms; the head decides between special form and application
    List(Vec<Expression>),
}

impl Expression {
    /// The symbol name when this expression is a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expression::Symbol(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Symbol(name) => write!(f, "{name}"),
            Expression::Number(n) => write!(f, "{n}"),
            Expression::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Helper function for creating symbols
pub fn sym<S: AsRef<str>>(name: S) -> Expression {
    Expression::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating number literals
pub fn num(n: NumberType) -> Expression {
    Expression::Number(n)
}

/// Helper function for creating list forms
pub fn list<I: IntoIterator<Item = Expression>>(items: I) -> Expression {
    Expression::List(items.into_iter().collect())
}
