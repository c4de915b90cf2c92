use clap::Parser as CliParser;
use falcon::error::FalconError;
use falcon::repl::{self, Mode};
use falcon::runner;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Scanner and parser front-end for the Falcon scripting language
#[derive(CliParser, Debug)]
#[command(name = "falcon", version)]
struct Cli {
    /// The script file to parse
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Start in interactive REPL mode
    #[arg(short, long)]
    interactive: bool,

    /// What to print for each input
    #[arg(short, long, value_enum, default_value_t = Mode::Ast)]
    mode: Mode,
}

/// Enable with `RUST_LOG=falcon=debug` or `RUST_LOG=falcon=trace`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match cli.file {
        Some(ref path) if !cli.interactive => match run_file(path, cli.mode) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(error) => {
                eprintln!("Error: {}", error);
                ExitCode::FAILURE
            }
        },
        _ => {
            repl::start(cli.mode);
            ExitCode::SUCCESS
        }
    }
}

fn run_file(path: &Path, mode: Mode) -> Result<bool, FalconError> {
    let source = fs::read_to_string(path).map_err(|e| {
        FalconError::io_error(format!("cannot read '{}': {}", path.display(), e))
    })?;

    let filename = path.display().to_string();
    Ok(runner::run(&source, Some(&filename), mode))
}
