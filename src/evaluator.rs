use std::io::{self, Write};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::Error;
use crate::ast::Expression;
use crate::builtinops::{Arity, get_builtin_ops};
use crate::environment::Environment;
use crate::value::{Closure, Procedure, Value, ValueKind};

/// Default maximum evaluation depth.
/// Each nested expression and each procedure call adds one level, so this
/// bounds native stack usage for deeply recursive programs. Sized to fit the
/// 2 MiB stack of a spawned thread in an unoptimized build.
pub const DEFAULT_MAX_EVAL_DEPTH: usize = 500;

/// Configuration for evaluating programs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    pub max_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            max_depth: DEFAULT_MAX_EVAL_DEPTH,
        }
    }
}

/// Create a global environment with built-in procedures and the boolean literals
pub fn create_global_env() -> Environment {
    let env = Environment::new();

    for builtin_op in get_builtin_ops() {
        env.bind(builtin_op.name, Value::Procedure(Procedure::Native(builtin_op)));
    }

    // Ordinary bindings rather than syntax, so `define` may shadow them
    env.bind("#t", Value::Boolean(true));
    env.bind("#f", Value::Boolean(false));

    env
}

/// Tree-walking evaluator.
///
/// Holds the output sink that `print-num` and `print-bool` write to, and the
/// recursion limit. It carries no other state between calls; all bindings live
/// in the [`Environment`] passed to [`Evaluator::eval`].
pub struct Evaluator<'o> {
    out: &'o mut dyn Write,
    config: EvalConfig,
}

impl<'o> Evaluator<'o> {
    pub fn new(out: &'o mut dyn Write, config: EvalConfig) -> Self {
        Evaluator { out, config }
    }

    /// Evaluate one expression in `env`
    pub fn eval(&mut self, expr: &Expression, env: &Environment) -> Result<Value, Error> {
        self.eval_with_depth_tracking(expr, env, 0)
    }

    fn eval_with_depth_tracking(
        &mut self,
        expr: &Expression,
        env: &Environment,
        depth: usize,
    ) -> Result<Value, Error> {
        if depth >= self.config.max_depth {
            return Err(Error::DepthLimitExceeded(self.config.max_depth));
        }
        match expr {
            Expression::Symbol(name) => env.lookup(name),
            Expression::Number(n) => Ok(Value::Integer(*n)),
            Expression::List(elements) => match elements.as_slice() {
                [] => Err(Error::malformed("application", "cannot evaluate an empty list")),
                [Expression::Symbol(keyword), args @ ..] if keyword == "if" => {
                    self.eval_if(args, env, depth)
                }
                [Expression::Symbol(keyword), args @ ..] if keyword == "define" => {
                    self.eval_define(args, env, depth)
                }
                [Expression::Symbol(keyword), args @ ..] if keyword == "fun" => {
                    eval_fun(args, env)
                }
                [head, arg_exprs @ ..] => self.eval_application(head, arg_exprs, env, depth),
            },
        }
    }

    /// `(if test conseq alt)`; the test is evaluated exactly once
    fn eval_if(
        &mut self,
        args: &[Expression],
        env: &Environment,
        depth: usize,
    ) -> Result<Value, Error> {
        match args {
            [test, conseq, alt] => match self.eval_with_depth_tracking(test, env, depth + 1)? {
                Value::Boolean(true) => self.eval_with_depth_tracking(conseq, env, depth + 1),
                Value::Boolean(false) => self.eval_with_depth_tracking(alt, env, depth + 1),
                other => Err(Error::TypeMismatch {
                    expected: ValueKind::Boolean,
                    found: other.kind(),
                }),
            },
            _ => Err(Error::arity("if", Arity::Exact(3), args.len())),
        }
    }

    /// `(define name expr)`; binds in the current scope and returns the bound value
    fn eval_define(
        &mut self,
        args: &[Expression],
        env: &Environment,
        depth: usize,
    ) -> Result<Value, Error> {
        match args {
            [Expression::Symbol(name), expr] => {
                let value = self.eval_with_depth_tracking(expr, env, depth + 1)?;
                debug!(name = %name, value = %value, "define");
                env.bind(name.clone(), value.clone());
                Ok(value)
            }
            [target, _] => Err(Error::malformed(
                "define",
                format!("target must be a symbol, got {target}"),
            )),
            _ => Err(Error::arity("define", Arity::Exact(2), args.len())),
        }
    }

    fn eval_application(
        &mut self,
        head: &Expression,
        arg_exprs: &[Expression],
        env: &Environment,
        depth: usize,
    ) -> Result<Value, Error> {
        let procedure = match self.eval_with_depth_tracking(head, env, depth + 1)? {
            Value::Procedure(procedure) => procedure,
            other => return Err(Error::NotAProcedure(other.kind())),
        };

        let args = arg_exprs
            .iter()
            .map(|arg| self.eval_with_depth_tracking(arg, env, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;

        match procedure {
            Procedure::Native(op) => op.call(&args, &mut *self.out),
            Procedure::Closure(closure) => self.call_closure(&closure, args, depth),
        }
    }

    /// Invoke a closure in a fresh child of its captured environment
    fn call_closure(
        &mut self,
        closure: &Closure,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Value, Error> {
        Arity::Exact(closure.params.len()).validate("fun", args.len())?;
        trace!(params = ?closure.params, depth, "invoking closure");

        let scope = closure.env.child(&closure.params, args);
        let Some((last, init)) = closure.body.split_last() else {
            return Err(Error::malformed("fun", "empty body"));
        };
        for expr in init {
            self.eval_with_depth_tracking(expr, &scope, depth + 1)?;
        }
        self.eval_with_depth_tracking(last, &scope, depth + 1)
    }
}

/// `(fun (params...) body...)`; captures `env` without evaluating the body
fn eval_fun(args: &[Expression], env: &Environment) -> Result<Value, Error> {
    let [param_list, body @ ..] = args else {
        return Err(Error::arity("fun", Arity::AtLeast(2), args.len()));
    };
    if body.is_empty() {
        return Err(Error::arity("fun", Arity::AtLeast(2), args.len()));
    }
    let Expression::List(param_exprs) = param_list else {
        return Err(Error::malformed(
            "fun",
            format!("parameters must be a list, got {param_list}"),
        ));
    };

    let mut params: Vec<String> = Vec::with_capacity(param_exprs.len());
    for param in param_exprs {
        match param {
            Expression::Symbol(name) => {
                if params.contains(name) {
                    return Err(Error::malformed(
                        "fun",
                        format!("duplicate parameter name: {name}"),
                    ));
                }
                params.push(name.clone());
            }
            other => {
                return Err(Error::malformed(
                    "fun",
                    format!("parameters must be symbols, got {other}"),
                ));
            }
        }
    }

    trace!(params = ?params, body_len = body.len(), "creating closure");
    Ok(Value::Procedure(Procedure::Closure(Rc::new(Closure {
        params,
        body: Rc::from(body),
        env: env.clone(),
    }))))
}

/// Evaluate an expression against `env`, printing to `out`, with default limits
pub fn eval(expr: &Expression, env: &Environment, out: &mut dyn Write) -> Result<Value, Error> {
    Evaluator::new(out, EvalConfig::default()).eval(expr, env)
}

/// Evaluate a program against a fresh global environment, printing to stdout.
///
/// Top-level expressions run left to right; the first failure stops the run.
pub fn run(program: &[Expression]) -> Result<(), Error> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_output(program, &mut out, EvalConfig::default())
}

/// Evaluate a program against a fresh global environment, printing to `out`
pub fn run_with_output(
    program: &[Expression],
    out: &mut dyn Write,
    config: EvalConfig,
) -> Result<(), Error> {
    let env = create_global_env();
    debug!(expressions = program.len(), "running program");

    let mut evaluator = Evaluator::new(&mut *out, config);
    for (index, expr) in program.iter().enumerate() {
        debug!(index, %expr, "evaluating top-level expression");
        evaluator.eval(expr, &env)?;
    }

    out.flush().map_err(|e| Error::Output(e.to_string()))
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ParseError;
    use crate::ast::{list, num, sym};
    use crate::parser::parse_program;

    /// Test result variants for comprehensive testing
    #[derive(Debug)]
    enum TestResult {
        EvalResult(Value),           // Evaluation should succeed with this value
        SpecificError(&'static str), // Evaluation should fail with error containing this string
        ExactError(Error),           // Evaluation should fail with exactly this error
        ProcedureResult,             // Evaluation should succeed with some procedure
    }
    use TestResult::*;

    /// Test environment containing test cases that share state
    struct TestEnvironment(Vec<(&'static str, TestResult)>);

    /// Micro-helper for success cases in comprehensive tests
    fn success<T: Into<Value>>(value: T) -> TestResult {
        EvalResult(value.into())
    }

    fn eval_source(input: &str, env: &Environment, out: &mut Vec<u8>) -> Result<Value, Error> {
        let program = parse_program(input)?;
        let mut evaluator = Evaluator::new(out, EvalConfig::default());
        let mut last = None;
        for expr in &program {
            last = Some(evaluator.eval(expr, env)?);
        }
        Ok(last.unwrap_or_else(|| panic!("no expression in {input:?}")))
    }

    /// Execute a single test case with detailed error reporting
    fn execute_test_case(input: &str, expected: &TestResult, env: &Environment, test_id: &str) {
        let mut out = Vec::new();
        match (eval_source(input, env, &mut out), expected) {
            (Ok(actual), EvalResult(expected_val)) => {
                assert_eq!(&actual, expected_val, "{test_id}: wrong value for '{input}'");
            }
            (Err(e), SpecificError(expected_text)) => {
                let error_msg = format!("{e}");
                assert!(
                    error_msg.contains(expected_text),
                    "{test_id}: error should contain '{expected_text}', got: {error_msg}"
                );
            }
            (Err(e), ExactError(expected_err)) => {
                assert_eq!(&e, expected_err, "{test_id}: wrong error for '{input}'");
            }
            (Ok(actual), ProcedureResult) => {
                assert_eq!(actual.kind(), ValueKind::Procedure, "{test_id}: '{input}'");
            }
            (Ok(actual), expected) => {
                panic!("{test_id}: expected {expected:?}, got {actual:?}");
            }
            (Err(err), expected) => {
                panic!("{test_id}: expected {expected:?}, got error {err:?}");
            }
        }
    }

    /// Run tests in isolated environments with shared state
    fn run_tests_in_environment(test_environments: Vec<TestEnvironment>) {
        for (env_idx, TestEnvironment(test_cases)) in test_environments.iter().enumerate() {
            let env = create_global_env();
            for (test_idx, (input, expected)) in test_cases.iter().enumerate() {
                let test_id = format!("Environment #{} test #{}", env_idx + 1, test_idx + 1);
                execute_test_case(input, expected, &env, &test_id);
            }
        }
    }

    /// Each case runs in its own fresh global environment
    fn run_comprehensive_tests(test_cases: Vec<(&'static str, TestResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let env = create_global_env();
            execute_test_case(input, expected, &env, &format!("Test #{}", i + 1));
        }
    }

    fn type_mismatch(expected: ValueKind, found: ValueKind) -> TestResult {
        ExactError(Error::TypeMismatch { expected, found })
    }

    fn arity_mismatch(procedure: &str, expected: Arity, got: usize) -> TestResult {
        ExactError(Error::ArityMismatch {
            procedure: procedure.to_owned(),
            expected,
            got,
        })
    }

    #[test]
    fn test_atoms_and_builtins() {
        run_comprehensive_tests(vec![
            ("42", success(42)),
            ("-3", success(-3)),
            ("#t", success(true)),
            ("#f", success(false)),
            ("(+ 1 2 3 4)", success(10)),
            ("(* 2 3 4)", success(24)),
            ("(- 5 3)", success(2)),
            ("(/ 7 2)", success(3)),
            ("(mod 7 2)", success(1)),
            ("(> 3 2)", success(true)),
            ("(< 3 2)", success(false)),
            ("(= 1 1 1)", success(true)),
            ("(= 1 2)", success(false)),
            ("(and #t #f)", success(false)),
            ("(or #f #t)", success(true)),
            ("(not #t)", success(false)),
            ("(+ (* 2 3) (- 10 4))", success(12)),
            ("(not (> (mod 10 3) 0))", success(false)),
            ("(- 1 2 3)", arity_mismatch("-", Arity::Exact(2), 3)),
            ("(+ 1)", arity_mismatch("+", Arity::AtLeast(2), 1)),
            (
                "(+ #t 1)",
                type_mismatch(ValueKind::Number, ValueKind::Boolean),
            ),
            (
                "(and #t 1)",
                type_mismatch(ValueKind::Boolean, ValueKind::Number),
            ),
            (
                "(+ 1 +)",
                type_mismatch(ValueKind::Number, ValueKind::Procedure),
            ),
            ("(+ #t 1)", SpecificError("Expect 'number' but got 'boolean'.")),
            ("(/ 1 0)", ExactError(Error::DivisionByZero("/"))),
        ]);
    }

    #[test]
    fn test_special_forms() {
        run_comprehensive_tests(vec![
            ("(if #t 1 2)", success(1)),
            ("(if #f 1 2)", success(2)),
            ("(if (< 1 2) (+ 1 1) (undefined))", success(2)),
            ("(if (> 1 2) (undefined) 7)", success(7)),
            ("(if 1 2 3)", type_mismatch(ValueKind::Boolean, ValueKind::Number)),
            ("(if #t 1)", arity_mismatch("if", Arity::Exact(3), 2)),
            ("(if #t 1 2 3)", arity_mismatch("if", Arity::Exact(3), 4)),
            ("(define x 5)", success(5)),
            ("(define x)", arity_mismatch("define", Arity::Exact(2), 1)),
            ("(define x 1 2)", arity_mismatch("define", Arity::Exact(2), 3)),
            ("(define 1 2)", SpecificError("target must be a symbol")),
            ("(define x (+ 1 #t))", type_mismatch(ValueKind::Number, ValueKind::Boolean)),
            ("((fun (x) (* x x)) 7)", success(49)),
            ("((fun () 3))", success(3)),
            ("((fun (x) 1 2 (+ x 3)) 4)", success(7)),
            ("(fun (x))", arity_mismatch("fun", Arity::AtLeast(2), 1)),
            ("(fun)", arity_mismatch("fun", Arity::AtLeast(2), 0)),
            ("(fun x x)", SpecificError("parameters must be a list")),
            ("(fun (x 1) x)", SpecificError("parameters must be symbols")),
            ("(fun (x x) x)", SpecificError("duplicate parameter name: x")),
            ("((fun (x y) x) 1)", arity_mismatch("fun", Arity::Exact(2), 1)),
            ("((fun (x) x) 1 2)", arity_mismatch("fun", Arity::Exact(1), 2)),
        ]);
    }

    #[test]
    fn test_application_errors() {
        run_comprehensive_tests(vec![
            ("y", ExactError(Error::UnboundName("y".to_owned()))),
            ("(f 1)", ExactError(Error::UnboundName("f".to_owned()))),
            ("(1 2 3)", ExactError(Error::NotAProcedure(ValueKind::Number))),
            ("(#t)", ExactError(Error::NotAProcedure(ValueKind::Boolean))),
            ("((+ 1 2) 3)", ExactError(Error::NotAProcedure(ValueKind::Number))),
            ("()", SpecificError("cannot evaluate an empty list")),
            ("(+ 1 undefined)", ExactError(Error::UnboundName("undefined".to_owned()))),
        ]);
    }

    #[test]
    fn test_scoping_and_closures() {
        run_tests_in_environment(vec![
            // Parameters shadow outer bindings without overwriting them
            TestEnvironment(vec![
                ("(define x 1)", success(1)),
                ("(define f (fun (x) (+ x 1)))", ProcedureResult),
                ("(f 5)", success(6)),
                ("x", success(1)),
            ]),
            // define inside a body binds locally, never in the caller's scope
            TestEnvironment(vec![
                ("(define y 10)", success(10)),
                ("(define g (fun (n) (define y n) (* y 2)))", ProcedureResult),
                ("(g 4)", success(8)),
                ("y", success(10)),
            ]),
            // Returned closures keep their defining scope alive
            TestEnvironment(vec![
                ("(define make-adder (fun (n) (fun (m) (+ n m))))", ProcedureResult),
                ("(define add5 (make-adder 5))", ProcedureResult),
                ("(define add7 (make-adder 7))", ProcedureResult),
                ("(add5 1)", success(6)),
                ("(add7 1)", success(8)),
                ("((make-adder 100) 1)", success(101)),
                ("n", ExactError(Error::UnboundName("n".to_owned()))),
            ]),
            // Lexical, not dynamic, scoping: the callee sees its definition site
            TestEnvironment(vec![
                ("(define z 1)", success(1)),
                ("(define get-z (fun () z))", ProcedureResult),
                ("(define shadow (fun (z) (get-z)))", ProcedureResult),
                ("(shadow 99)", success(1)),
            ]),
            // Recursion resolves the function name through the global scope
            TestEnvironment(vec![
                (
                    "(define fact (fun (n) (if (< n 2) 1 (* n (fact (- n 1))))))",
                    ProcedureResult,
                ),
                ("(fact 5)", success(120)),
                ("(fact 10)", success(3628800)),
                (
                    "(define fib (fun (n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2))))))",
                    ProcedureResult,
                ),
                ("(fib 15)", success(610)),
            ]),
            // Later definitions are visible to closures created earlier
            TestEnvironment(vec![
                ("(define use-later (fun () (later)))", ProcedureResult),
                ("(use-later)", ExactError(Error::UnboundName("later".to_owned()))),
                ("(define later (fun () 3))", ProcedureResult),
                ("(use-later)", success(3)),
            ]),
            // Boolean literals and builtins are ordinary, shadowable bindings
            TestEnvironment(vec![
                ("(define #t 0)", success(0)),
                ("(+ #t 1)", success(1)),
                ("(define plus +)", ProcedureResult),
                ("(plus 2 3)", success(5)),
                ("(define + -)", ProcedureResult),
                ("(+ 2 3)", success(-1)),
            ]),
            // Special-form keywords are matched syntactically in head position
            TestEnvironment(vec![
                ("(define if 3)", success(3)),
                ("(if #t if 0)", success(3)),
            ]),
            // Higher-order procedures
            TestEnvironment(vec![
                ("(define twice (fun (f x) (f (f x))))", ProcedureResult),
                ("(twice (fun (x) (* x 3)) 2)", success(18)),
                ("(define compose (fun (f g) (fun (x) (f (g x)))))", ProcedureResult),
                ("((compose not not) #t)", success(true)),
            ]),
        ]);
    }

    #[test]
    fn test_if_test_evaluated_once() {
        let env = create_global_env();
        let mut out = Vec::new();
        let result = eval_source(
            "(if (print-bool (> 2 1)) (print-num 1) (print-num 2))",
            &env,
            &mut out,
        )
        .unwrap();
        assert_eq!(result, Value::Integer(1));
        assert_eq!(String::from_utf8(out).unwrap(), "#t\n1\n");
    }

    #[test]
    fn test_pure_evaluation_is_deterministic() {
        let env = create_global_env();
        env.bind("k", Value::Integer(4));
        let expr = list([sym("*"), sym("k"), list([sym("+"), num(1), num(2)])]);

        let mut out = Vec::new();
        let first = eval(&expr, &env, &mut out).unwrap();
        let second = eval(&expr, &env, &mut out).unwrap();
        assert_eq!(first, Value::Integer(12));
        assert_eq!(first, second);
        assert!(out.is_empty());
        assert_eq!(env.lookup("k").unwrap(), Value::Integer(4));
    }

    #[test]
    fn test_global_env_contents() {
        let env = create_global_env();
        assert_eq!(env.lookup("#t").unwrap(), Value::Boolean(true));
        assert_eq!(env.lookup("#f").unwrap(), Value::Boolean(false));
        for name in ["print-num", "print-bool", "+", "-", "*", "/", "mod", ">", "<", "=", "and", "or", "not"] {
            assert_eq!(env.lookup(name).unwrap().kind(), ValueKind::Procedure, "{name}");
        }
        assert_eq!(env.bindings().len(), 15);
        assert!(env.lookup("if").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let env = create_global_env();
        let mut out = Vec::new();
        let program = parse_program(
            "(define count (fun (n) (if (= n 0) 0 (+ 1 (count (- n 1))))))",
        )
        .unwrap();
        let config = EvalConfig { max_depth: 200 };
        let mut evaluator = Evaluator::new(&mut out, config);
        evaluator.eval(&program[0], &env).unwrap();

        let shallow = parse_program("(count 5)").unwrap();
        assert_eq!(evaluator.eval(&shallow[0], &env).unwrap(), Value::Integer(5));

        let deep = parse_program("(count 1000)").unwrap();
        assert_eq!(
            evaluator.eval(&deep[0], &env).unwrap_err(),
            Error::DepthLimitExceeded(200)
        );
    }

    #[test]
    fn test_default_depth_limit_on_spawned_thread() {
        // Spawned threads get the smaller default stack, unlike the main thread
        let result = std::thread::spawn(|| {
            let program = parse_program(
                "(define count (fun (n) (if (= n 0) 0 (+ 1 (count (- n 1))))))
                 (count 100000)",
            )
            .unwrap();
            let mut out = Vec::new();
            run_with_output(&program, &mut out, EvalConfig::default())
        })
        .join()
        .unwrap();
        assert_eq!(result, Err(Error::DepthLimitExceeded(DEFAULT_MAX_EVAL_DEPTH)));
    }

    #[test]
    fn test_run_stops_at_first_failure() {
        let program =
            parse_program("(print-num 1) (print-num (+ 1 #t)) (print-num 3)").unwrap();
        let mut out = Vec::new();
        let err = run_with_output(&program, &mut out, EvalConfig::default()).unwrap_err();
        assert_eq!(
            err,
            Error::TypeMismatch {
                expected: ValueKind::Number,
                found: ValueKind::Boolean
            }
        );
        assert_eq!(String::from_utf8(out).unwrap(), "1\n");
    }

    #[test]
    fn test_run_uses_fresh_environment() {
        let mut out = Vec::new();
        let first = parse_program("(define x 1) (print-num x)").unwrap();
        run_with_output(&first, &mut out, EvalConfig::default()).unwrap();

        let second = parse_program("(print-num x)").unwrap();
        let err = run_with_output(&second, &mut out, EvalConfig::default()).unwrap_err();
        assert_eq!(err, Error::UnboundName("x".to_owned()));
    }

    #[test]
    fn test_parse_errors_convert() {
        let err: Error = parse_program("(+ 1").unwrap_err().into();
        assert_eq!(err, Error::Parse(ParseError::UnexpectedEndOfInput));
        assert_eq!(err.to_string(), "ParseError: unexpected EOF: missing ')'");
    }
}
