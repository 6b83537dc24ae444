//! Configurable mock-API server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────▶ http server ──▶ runtime gate ──▶ route table ──▶ scenario
//!                 (request id,    (api key,        (snapshot,      selector
//!                  trace, cors)    rate limit)      path match)        │
//!                                                                      ▼
//!     Client Response ◀──────────────────────────────────────── template render
//!
//!     Admin import / document watcher ──▶ compiler ──▶ snapshot store (atomic swap)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use mock_api_server::config::loader::{apply_env_overrides, load_config, load_document};
use mock_api_server::config::validation::validate_config;
use mock_api_server::config::watcher::DocumentWatcher;
use mock_api_server::lifecycle::signals::forward_signals;
use mock_api_server::observability::{logging, metrics};
use mock_api_server::routing::compile;
use mock_api_server::{HttpServer, RouteTable, ServerConfig, Shutdown, SnapshotStore};

#[derive(Parser, Debug)]
#[command(name = "mock-api-server")]
#[command(about = "Serve mock HTTP APIs from a declarative document", long_about = None)]
struct Args {
    /// Server configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mock document to serve at startup (JSON or YAML)
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Listen address, overriding the configuration
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    if let Some(document) = &args.document {
        config.mock.document = Some(document.display().to_string());
    }
    apply_env_overrides(&mut config);
    if let Err(errors) = validate_config(&config) {
        for e in &errors {
            eprintln!("invalid configuration: {e}");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mock-api-server starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                error = %e,
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let document_path = config.mock.document.as_ref().map(PathBuf::from);
    let initial = match &document_path {
        Some(path) => {
            let table = compile(&load_document(path)?)?;
            tracing::info!(
                path = %path.display(),
                project = %table.project,
                routes = table.routes.len(),
                "Initial document compiled"
            );
            table
        }
        None => {
            tracing::warn!("No mock document configured; waiting for an admin import");
            RouteTable::empty()
        }
    };
    let store = Arc::new(SnapshotStore::new(initial));

    // Kept alive until main returns; dropping it stops the watch.
    let mut _watcher = None;
    let documents = match (&document_path, config.mock.watch) {
        (Some(path), true) => {
            let (watcher, rx) = DocumentWatcher::new(path);
            _watcher = Some(watcher.run()?);
            tracing::info!(path = %path.display(), "Watching mock document for changes");
            rx
        }
        _ => mpsc::unbounded_channel().1,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        request_timeout_secs = config.timeouts.request_secs,
        max_body_bytes = config.listener.max_body_bytes,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(forward_signals(shutdown));

    HttpServer::new(&config, store)
        .run(listener, documents, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
