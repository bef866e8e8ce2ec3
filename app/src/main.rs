use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use quarry_adapters::MysqlExecutionBackend;
use quarry_core::config::{self, QuarryConfig};
use quarry_core::Session;
use quarry_tui::{TerminalSurface, TuiError};
use tokio::runtime::{Builder, Handle};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

const LOG_ENV: &str = "QUARRY_LOG";
const LOG_FILE: &str = "quarry.log";

type AppSession = Session<MysqlExecutionBackend, TerminalSurface>;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Logs go to a file because the terminal belongs to the UI.
fn init_logging(log_dir: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(log_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true);

    Registry::default()
        .with(env_filter())
        .with(file_layer)
        .try_init()?;
    Ok(())
}

fn run_app(
    config: &QuarryConfig,
    run_tui: impl FnOnce(Handle, AppSession) -> Result<(), TuiError>,
) -> Result<(), Box<dyn Error>> {
    let runtime = Builder::new_multi_thread().enable_all().build()?;
    let backend = MysqlExecutionBackend::new(config.results.clone());
    let session = runtime.block_on(Session::new(
        backend,
        TerminalSurface::new(),
        config.session_options(),
    ))?;
    tracing::info!(
        connections = session.registry().len(),
        active = ?session.active_id(),
        "session started"
    );

    run_tui(runtime.handle().clone(), session)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging(&config::config_dir()?)?;
    let config = config::load_default()?;
    run_app(&config, quarry_tui::run)
}
