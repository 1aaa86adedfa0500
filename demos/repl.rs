use minilisp::ast::Expression;
use minilisp::environment::Environment;
use minilisp::evaluator::{EvalConfig, Evaluator, create_global_env};
use minilisp::parser::{ParseConfig, parse_program_with_config};
use minilisp::value::{Procedure, Value};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run_repl() {
        eprintln!("The REPL encountered an unexpected error and must exit: {err}");
        process::exit(1);
    }
}

fn run_repl() -> Result<(), ReadlineError> {
    println!("MiniLisp REPL");
    println!("Enter expressions like: (+ 1 2) or (define sq (fun (x) (* x x)))");
    println!("Type :help for more commands, or Ctrl+D to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;
    let env = create_global_env();
    let config = ParseConfig {
        handle_comments: true,
        ..ParseConfig::default()
    };

    loop {
        match rl.readline("minilisp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                let program = match parse_program_with_config(line, config) {
                    Ok(program) => program,
                    Err(e) => {
                        println!("Error: {e}");
                        continue;
                    }
                };

                let stdout = io::stdout();
                let mut out = stdout.lock();
                let mut evaluator = Evaluator::new(&mut out, EvalConfig::default());
                for expr in &program {
                    match evaluator.eval(expr, &env) {
                        // Definitions echo nothing; everything else shows its value
                        Ok(_) if is_definition(expr) => {}
                        Ok(value) => println!("{value}"),
                        Err(e) => {
                            println!("Error: {e}");
                            break;
                        }
                    }
                }
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn is_definition(expr: &Expression) -> bool {
    match expr {
        Expression::List(elements) => {
            elements.first().and_then(Expression::as_symbol) == Some("define")
        }
        _ => false,
    }
}

fn print_help() {
    println!("MiniLisp Interpreter:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+D     - Exit the interpreter");
    println!();
    println!("Special forms:");
    println!("  (if test then else)  (define name expr)  (fun (params...) body...)");
    println!();
    println!("Builtins:");
    println!("  Arithmetic: + - * / mod");
    println!("  Comparison: > < =");
    println!("  Logic: and or not");
    println!("  Output: print-num print-bool");
    println!();
}

fn print_environment(env: &Environment) {
    let bindings = env.bindings();

    // Separate built-in procedures from user-defined values
    let mut builtins = Vec::new();
    let mut user_defined = Vec::new();
    for (name, value) in bindings {
        match value {
            Value::Procedure(Procedure::Native(_)) => builtins.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !builtins.is_empty() {
        println!("Built-in procedures ({}):", builtins.len());
        let mut col = 0;
        for name in builtins {
            print!("  {name:<12}");
            col += 1;
            if col % 5 == 0 {
                println!();
            }
        }
        if col % 5 != 0 {
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("Values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
