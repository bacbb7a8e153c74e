//! mgsearch - multi-tenant search backend
//!
//! Serves the credential and tenant-isolation API: user accounts, tenants and
//! their API keys, the platform OAuth install flow, store sessions,
//! storefront keys and signed webhooks.

use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    prelude::*,
    registry::LookupSpan,
    EnvFilter, Layer,
};

use mgsearch::{
    api,
    config::{LogFormat, LogTarget, LoggingConfig},
    db, AppConfig, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("mgsearch {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration first so logging knows its format
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Dropping the guard flushes pending file output
    let _log_guard = init_logging(&config.logging);

    info!("mgsearch {} starting up", env!("CARGO_PKG_VERSION"));

    ensure_data_directory(&config)?;

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    let state = AppState::new(config.clone(), db).context("Failed to initialize services")?;
    let app = api::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

/// Initialize the logging/tracing infrastructure
fn init_logging(log_config: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    let (file_writer, guard) = match log_config.target {
        LogTarget::Console => (None, None),
        LogTarget::File | LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            (Some(writer), Some(guard))
        }
    };

    let console = matches!(log_config.target, LogTarget::Console | LogTarget::Both)
        .then(|| format_layer(&log_config.format, std::io::stdout));
    let file = file_writer.map(|writer| format_layer(&log_config.format, writer));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    guard
}

/// One fmt layer in the configured format
fn format_layer<S, W>(format: &LogFormat, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(writer)
            .boxed(),
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Create the parent directory of a file-backed SQLite database
fn ensure_data_directory(config: &AppConfig) -> Result<()> {
    let Some(rest) = config.database.url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or(rest);

    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
            info!("Created data directory: {:?}", parent);
        }
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"mgsearch {}

USAGE:
    mgsearch [OPTIONS]

OPTIONS:
    -h, --help          Print this help message
    -V, --version       Print version information

ENVIRONMENT:
    MGSEARCH_CONFIG     Path to configuration file (default: config.yaml)
    JWT_SIGNING_KEY     Token signing key (at least 32 characters)
    ENCRYPTION_KEY      64 hex characters (32-byte vault key)
    SHOPIFY_API_KEY, SHOPIFY_API_SECRET, SHOPIFY_APP_URL, SHOPIFY_WEBHOOK_SECRET
    MEILISEARCH_URL, MEILISEARCH_API_KEY
    SESSION_API_KEY     Optional key gating the session endpoints
    RUST_LOG            Log filter (overrides logging.level)"#,
        env!("CARGO_PKG_VERSION")
    );
}
