//! dlindex CLI binary.
//!
//! This is the entry point for the `dlindex` command-line tool. It initializes
//! logging via `tracing`, parses arguments with `clap`, dispatches to the
//! appropriate command handler and turns errors into the process exit code.

mod cli;
mod commands;

use dlindex_util::errors::DlIndexError;
use tracing_subscriber::EnvFilter;

const VERBOSE_FILTER: &str =
    "warn,dlindex_cli=debug,dlindex_ops=debug,dlindex_store=debug,dlindex_core=debug,dlindex_util=debug";

#[tokio::main]
async fn main() {
    let args = cli::parse();

    // Keep long messages on one line.
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().wrap_lines(false).build())
    }));

    let default_filter = if args.verbose { VERBOSE_FILTER } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(report) = commands::dispatch(args).await {
        let code = report
            .downcast_ref::<DlIndexError>()
            .map_or(1, DlIndexError::exit_code);
        eprintln!("{report:?}");
        std::process::exit(code);
    }
}
