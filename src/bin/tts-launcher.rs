//! `tts-launcher` binary.
//!
//! Usage:
//!   tts-launcher "Hello world"
//!   tts-launcher "Hello world" -o audio/ --cpu
//!   tts-launcher --info
//!
//! Exit status is 0 on success and 1 on any failure.

use std::process::ExitCode;

use clap::{error::ErrorKind, CommandFactory, Parser};
use tts_launcher::{cli::Cli, Launcher, LauncherError};

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let (config, invocation) = cli.resolve()?;
    Launcher::new(config).run(&invocation)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {e:#}");
            if matches!(e.downcast_ref::<LauncherError>(), Some(LauncherError::MissingText)) {
                eprintln!();
                let _ = Cli::command().print_help();
            }
            ExitCode::FAILURE
        }
    }
}
