//! Runtime values.
//!
//! Evaluation produces one of three kinds of [`Value`]: an integer, a boolean or
//! a procedure. Procedures are either native builtins from the static registry
//! or user-defined [`Closure`]s that share their defining environment.

use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::ast::{Expression, NumberType};
use crate::builtinops::BuiltinOp;
use crate::environment::Environment;

/// The kind of a value, as reported in type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Boolean,
    Procedure,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Procedure => "procedure",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone)]
pub enum Value {
    Integer(NumberType),
    Boolean(bool),
    Procedure(Procedure),
}

#[derive(Clone)]
pub enum Procedure {
    /// Builtin from the static registry, compared by name
    Native(&'static BuiltinOp),
    /// User-defined function, compared by identity
    Closure(Rc<Closure>),
}

/// A user-defined procedure together with the scope it was created in.
pub struct Closure {
    pub params: Vec<String>,
    /// Never empty; `fun` rejects a missing body
    pub body: Rc<[Expression]>,
    pub env: Environment,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Number,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Procedure(_) => ValueKind::Procedure,
        }
    }

    pub(crate) fn as_integer(&self) -> Result<NumberType, Error> {
        match self {
            Value::Integer(n) => Ok(*n),
            other => Err(Error::TypeMismatch {
                expected: ValueKind::Number,
                found: other.kind(),
            }),
        }
    }

    pub(crate) fn as_boolean(&self) -> Result<bool, Error> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(Error::TypeMismatch {
                expected: ValueKind::Boolean,
                found: other.kind(),
            }),
        }
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Integer(NumberType::from(n))
            }
        }
    };
}

impl_from_integer!(i32);
impl_from_integer!(NumberType);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Procedure(a), Value::Procedure(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Procedure::Native(a), Procedure::Native(b)) => a.name == b.name,
            (Procedure::Closure(a), Procedure::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Procedure(Procedure::Native(op)) => write!(f, "#<builtin:{}>", op.name),
            Value::Procedure(Procedure::Closure(_)) => write!(f, "#<closure>"),
        }
    }
}

// The captured environment is left out: it usually contains the closure itself.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::Procedure(Procedure::Native(op)) => write!(f, "Native({})", op.name),
            Value::Procedure(Procedure::Closure(closure)) => {
                write!(f, "Closure(params={:?}, body=[", closure.params)?;
                for (i, expr) in closure.body.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{expr}")?;
                }
                write!(f, "])")
            }
        }
    }
}
