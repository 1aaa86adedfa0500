//! Built-in procedure registry.
//!
//! Every native procedure is described by a [`BuiltinOp`]: its name, an
//! [`Arity`] rule and an implementation that fixes the operand type. Calls go
//! through [`BuiltinOp::call`], which checks the argument count first and the
//! argument types second, so `(- #t)` reports an arity error rather than a type
//! error.
//!
//! | name | arity | operands |
//! |---|---|---|
//! | `print-num` | 1 | number |
//! | `print-bool` | 1 | boolean |
//! | `+`, `*`, `=` | 2 or more | number |
//! | `-`, `/`, `mod`, `>`, `<` | 2 | number |
//! | `and`, `or` | 2 or more | boolean |
//! | `not` | 1 | boolean |
//!
//! ## Adding New Operations
//!
//! 1. **Implement the function** over already-typed operands:
//!    `fn(&[NumberType], &mut dyn Write) -> Result<Value, Error>` or the `bool` equivalent
//! 2. **Add to BUILTIN_OPS** with its name and arity
//! 3. **Add test cases** to `test_builtin_function_implementations`

use std::fmt;
use std::io::Write;

use crate::Error;
use crate::ast::NumberType;
use crate::value::Value;

/// Argument-count rule for a procedure or special form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, got: usize) -> bool {
        match self {
            Arity::Exact(n) => got == n,
            Arity::AtLeast(n) => got >= n,
        }
    }

    /// Check `got` against this rule, naming `procedure` in the error.
    pub fn validate(self, procedure: &str, got: usize) -> Result<(), Error> {
        if self.accepts(got) {
            Ok(())
        } else {
            Err(Error::arity(procedure, self, got))
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "{n} or more"),
        }
    }
}

type IntegerFn = fn(&[NumberType], &mut dyn Write) -> Result<Value, Error>;
type BooleanFn = fn(&[bool], &mut dyn Write) -> Result<Value, Error>;

/// Implementation of a builtin; the variant is the operand type rule.
#[derive(Clone, Copy)]
pub(crate) enum OpKind {
    Integers(IntegerFn),
    Booleans(BooleanFn),
}

impl fmt::Debug for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Integers(_) => write!(f, "Integers(<fn>)"),
            OpKind::Booleans(_) => write!(f, "Booleans(<fn>)"),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug)]
pub struct BuiltinOp {
    pub name: &'static str,
    pub arity: Arity,
    pub(crate) op_kind: OpKind,
}

impl BuiltinOp {
    /// Validate arity, then operand types, then compute the result.
    pub fn call(&self, args: &[Value], out: &mut dyn Write) -> Result<Value, Error> {
        self.arity.validate(self.name, args.len())?;
        match self.op_kind {
            OpKind::Integers(f) => {
                let operands = args
                    .iter()
                    .map(Value::as_integer)
                    .collect::<Result<Vec<_>, _>>()?;
                f(&operands, out)
            }
            OpKind::Booleans(f) => {
                let operands = args
                    .iter()
                    .map(Value::as_boolean)
                    .collect::<Result<Vec<_>, _>>()?;
                f(&operands, out)
            }
        }
    }
}

//
// Builtin Function Implementations
//

fn output_error(err: std::io::Error) -> Error {
    Error::Output(err.to_string())
}

fn builtin_print_num(args: &[NumberType], out: &mut dyn Write) -> Result<Value, Error> {
    let n = args[0];
    writeln!(out, "{n}").map_err(output_error)?;
    Ok(Value::Integer(n))
}

fn builtin_print_bool(args: &[bool], out: &mut dyn Write) -> Result<Value, Error> {
    let b = args[0];
    writeln!(out, "{}", if b { "#t" } else { "#f" }).map_err(output_error)?;
    Ok(Value::Boolean(b))
}

// Macro to generate left-fold arithmetic with overflow detection
macro_rules! checked_fold {
    ($name:ident, $checked:ident, $identity:expr, $op_str:expr) => {
        fn $name(args: &[NumberType], _out: &mut dyn Write) -> Result<Value, Error> {
            let mut acc: NumberType = $identity;
            for &n in args {
                acc = acc.$checked(n).ok_or(Error::IntegerOverflow($op_str))?;
            }
            Ok(Value::Integer(acc))
        }
    };
}

checked_fold!(builtin_add, checked_add, 0, "+");
checked_fold!(builtin_mul, checked_mul, 1, "*");

fn builtin_sub(args: &[NumberType], _out: &mut dyn Write) -> Result<Value, Error> {
    args[0]
        .checked_sub(args[1])
        .map(Value::Integer)
        .ok_or(Error::IntegerOverflow("-"))
}

/// Quotient rounded toward negative infinity.
pub(crate) fn floor_div(a: NumberType, b: NumberType) -> Result<NumberType, Error> {
    if b == 0 {
        return Err(Error::DivisionByZero("/"));
    }
    let q = a.checked_div(b).ok_or(Error::IntegerOverflow("/"))?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

/// Remainder carrying the sign of the divisor.
pub(crate) fn floor_mod(a: NumberType, b: NumberType) -> Result<NumberType, Error> {
    if b == 0 {
        return Err(Error::DivisionByZero("mod"));
    }
    // checked_rem only fails for MIN % -1, whose remainder is zero
    let r = a.checked_rem(b).unwrap_or(0);
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

fn builtin_div(args: &[NumberType], _out: &mut dyn Write) -> Result<Value, Error> {
    floor_div(args[0], args[1]).map(Value::Integer)
}

fn builtin_mod(args: &[NumberType], _out: &mut dyn Write) -> Result<Value, Error> {
    floor_mod(args[0], args[1]).map(Value::Integer)
}

fn builtin_gt(args: &[NumberType], _out: &mut dyn Write) -> Result<Value, Error> {
    Ok(Value::Boolean(args[0] > args[1]))
}

fn builtin_lt(args: &[NumberType], _out: &mut dyn Write) -> Result<Value, Error> {
    Ok(Value::Boolean(args[0] < args[1]))
}

fn builtin_eq(args: &[NumberType], _out: &mut dyn Write) -> Result<Value, Error> {
    Ok(Value::Boolean(args.windows(2).all(|pair| pair[0] == pair[1])))
}

fn builtin_and(args: &[bool], _out: &mut dyn Write) -> Result<Value, Error> {
    Ok(Value::Boolean(args.iter().all(|&b| b)))
}

fn builtin_or(args: &[bool], _out: &mut dyn Write) -> Result<Value, Error> {
    Ok(Value::Boolean(args.iter().any(|&b| b)))
}

fn builtin_not(args: &[bool], _out: &mut dyn Write) -> Result<Value, Error> {
    Ok(Value::Boolean(!args[0]))
}

/// Global registry of all built-in operations.
static BUILTIN_OPS: [BuiltinOp; 13] = [
    // Output
    BuiltinOp {
        name: "print-num",
        arity: Arity::Exact(1),
        op_kind: OpKind::Integers(builtin_print_num),
    },
    BuiltinOp {
        name: "print-bool",
        arity: Arity::Exact(1),
        op_kind: OpKind::Booleans(builtin_print_bool),
    },
    // Arithmetic operations
    BuiltinOp {
        name: "+",
        arity: Arity::AtLeast(2),
        op_kind: OpKind::Integers(builtin_add),
    },
    BuiltinOp {
        name: "-",
        arity: Arity::Exact(2),
        op_kind: OpKind::Integers(builtin_sub),
    },
    BuiltinOp {
        name: "*",
        arity: Arity::AtLeast(2),
        op_kind: OpKind::Integers(builtin_mul),
    },
    BuiltinOp {
        name: "/",
        arity: Arity::Exact(2),
        op_kind: OpKind::Integers(builtin_div),
    },
    BuiltinOp {
        name: "mod",
        arity: Arity::Exact(2),
        op_kind: OpKind::Integers(builtin_mod),
    },
    // Comparison operations
    BuiltinOp {
        name: ">",
        arity: Arity::Exact(2),
        op_kind: OpKind::Integers(builtin_gt),
    },
    BuiltinOp {
        name: "<",
        arity: Arity::Exact(2),
        op_kind: OpKind::Integers(builtin_lt),
    },
    BuiltinOp {
        name: "=",
        arity: Arity::AtLeast(2),
        op_kind: OpKind::Integers(builtin_eq),
    },
    // Logical operations
    BuiltinOp {
        name: "and",
        arity: Arity::AtLeast(2),
        op_kind: OpKind::Booleans(builtin_and),
    },
    BuiltinOp {
        name: "or",
        arity: Arity::AtLeast(2),
        op_kind: OpKind::Booleans(builtin_or),
    },
    BuiltinOp {
        name: "not",
        arity: Arity::Exact(1),
        op_kind: OpKind::Booleans(builtin_not),
    },
];

/// Get all builtin operations (used to populate the global environment)
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    &BUILTIN_OPS
}

/// Find a builtin operation by name
pub fn find_builtin(name: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_OPS.iter().find(|op| op.name == name)
}
