use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use minilisp::evaluator::DEFAULT_MAX_EVAL_DEPTH;
use minilisp::parser::parse_program_with_config;
use minilisp::source::{LineStatus, ProgramBuffer};
use minilisp::{EvalConfig, ParseConfig, run_with_output};

/// Run a MiniLisp program from a file or from standard input.
#[derive(Debug, Parser)]
#[command(name = "minilisp", version, about)]
struct Cli {
    /// Program file; when omitted, lines are read until a line containing `eol`
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Show the full diagnostic for a failure instead of a one-line message
    #[arg(short = 's', long = "show-trace")]
    show_trace: bool,

    /// Maximum evaluation depth before a run is aborted
    #[arg(long, default_value_t = DEFAULT_MAX_EVAL_DEPTH)]
    max_depth: usize,

    /// Treat `;` as the start of a line comment
    #[arg(long)]
    comments: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if cli.show_trace {
                eprintln!("Error: {err:?}");
            } else {
                eprintln!("Error: {err}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let source = match &cli.file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => read_interactive()?,
    };

    let parse_config = ParseConfig {
        handle_comments: cli.comments,
        ..ParseConfig::default()
    };
    let program = parse_program_with_config(&source, parse_config)?;
    tracing::debug!(expressions = program.len(), "parsed program");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let config = EvalConfig {
        max_depth: cli.max_depth,
    };
    run_with_output(&program, &mut out, config)?;
    Ok(())
}

/// Read program lines until the end marker or end of input
fn read_interactive() -> anyhow::Result<String> {
    let mut editor = DefaultEditor::new().context("failed to initialize line editor")?;
    let mut buffer = ProgramBuffer::new();

    loop {
        match editor.readline("") {
            Ok(line) => {
                if buffer.push_line(&line) == LineStatus::Complete {
                    break;
                }
            }
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => anyhow::bail!("input interrupted"),
            Err(err) => return Err(err).context("failed to read program input"),
        }
    }

    Ok(buffer.into_source())
}
