//! Kleene CLI - run and check rule-language scripts

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kleene::interpreter::parse_program;
use kleene::{Interpreter, InterpreterConfig};

#[derive(Parser)]
#[command(name = "kleene")]
#[command(about = "Finite-state rule language interpreter", long_about = None)]
#[command(version = kleene::VERSION)]
struct Cli {
    /// JSON interpreter configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scripts in order, sharing one interpreter
    Run {
        /// Script files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Stop at the first failing statement
        #[arg(long)]
        halt_on_error: bool,

        /// Log every top-level statement
        #[arg(long)]
        trace: bool,
    },

    /// Parse a script without running it
    Check {
        /// Script file
        file: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => InterpreterConfig::load(path)?,
        None => InterpreterConfig::default(),
    };

    match cli.command {
        Commands::Run {
            files,
            halt_on_error,
            trace,
        } => {
            config.halt_on_error |= halt_on_error;
            config.trace |= trace;
            let mut interp = Interpreter::new(config);
            let mut failed = 0;

            for file in &files {
                let source = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let report = interp
                    .run_source(&source)
                    .with_context(|| format!("Failed to parse {}", file.display()))?;
                for line in interp.take_output() {
                    println!("{line}");
                }
                for failure in &report.errors {
                    eprintln!("{}:{}: {}", file.display(), failure.line, failure.error);
                }
                failed += report.errors.len();
                if report.quit || (failed > 0 && interp.config().halt_on_error) {
                    break;
                }
            }

            if failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Check { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let program = parse_program(&source)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            println!(
                "{}: {} statement(s)",
                file.display(),
                program.statements.len()
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}
