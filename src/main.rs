//! # benchpad Main Entry Point

use anyhow::Result;
use benchpad::cmd_args::CommandLineArgs;
use benchpad::repl::io::{TerminalEventStream, TerminalRenderStream};
use benchpad::AppController;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt::time::ChronoLocal, EnvFilter};

/// File the log is written to; logging is off when unset
const LOG_FILE_ENV_VAR: &str = "BENCHPAD_LOG_FILE";

/// Log filter, e.g. `debug` or `benchpad=trace`
const LOG_LEVEL_ENV_VAR: &str = "BENCHPAD_LOG_LEVEL";

#[tokio::main]
async fn main() -> Result<()> {
    let cmd_args = CommandLineArgs::parse();
    init_tracing_subscriber(cmd_args.verbose())?;

    let mut app = AppController::with_io_streams(
        cmd_args,
        TerminalEventStream::new(),
        TerminalRenderStream::new(),
    )?;
    app.run().await
}

/// Log to the file named by `BENCHPAD_LOG_FILE`. The terminal belongs to
/// the editor, so nothing is ever written to stdout or stderr.
fn init_tracing_subscriber(verbose: bool) -> Result<()> {
    let Some(path) = std::env::var_os(LOG_FILE_ENV_VAR) else {
        return Ok(());
    };

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_level))
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("hyper_util=warn".parse()?)
        .add_directive("rustls=warn".parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("benchpad {} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}
