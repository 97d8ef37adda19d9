use std::io::{self, BufReader, IsTerminal};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dbbox::cli::{Args, Operation};
use dbbox::commands::{Session, Status, StdinConfirm};
use dbbox::config::DbboxConfig;
use dbbox::DbboxError;

/// Exit code for an interrupted command.
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => match e.downcast_ref::<DbboxError>() {
            Some(DbboxError::Interrupted) => {
                eprintln!("\nAborted");
                ExitCode::from(EXIT_INTERRUPTED)
            }
            // Engine errors already carry their source in the message.
            Some(err) => {
                eprintln!("Error: {err}");
                ExitCode::FAILURE
            }
            None => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("dbbox=debug")
        } else {
            EnvFilter::new("dbbox=warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn run(args: &Args) -> Result<Status> {
    let config = match &args.config {
        Some(path) => DbboxConfig::from_file(path)?,
        None => DbboxConfig::load_default()?,
    };
    let data_dir = config.resolve_data_dir(args.data_dir.as_deref())?;
    debug!(data_dir = %data_dir.display(), "resolved data directory");

    let operation = Operation::resolve(args)?;

    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let mut stdin = BufReader::new(io::stdin());
    let mut confirm = StdinConfirm;
    let mut session = Session {
        data_dir,
        default_format: config.default_format()?,
        out: &mut stdout,
        err: &mut stderr,
        input: &mut stdin,
        confirm: &mut confirm,
    };
    Ok(session.execute(operation)?)
}
