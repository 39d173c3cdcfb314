use clap::Parser;
use std::process::ExitCode;
use tracker_store::cli::{self, Cli};
use tracker_store::logging::init_logging;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {err}");
    }

    match cli::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.code();
            tracing::debug!(code = code.as_str(), "Command failed");
            eprintln!("Error: {err}");
            ExitCode::from(u8::try_from(code.exit_status()).unwrap_or(1))
        }
    }
}
