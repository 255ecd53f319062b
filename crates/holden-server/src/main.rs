//! Holden server binary.
//!
//! Usage: `holden-server [config-path]`. Without an argument the path comes
//! from `HOLDEN_CONFIG_PATH`, then `config.toml`.

use holden_server::{
    app,
    config::{self, LoggingConfig},
    AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn config_path() -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HOLDEN_CONFIG_PATH").ok())
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Logs `message` with the error and exits. Used for startup failures,
/// after which the server must not serve.
fn fatal(message: &str, error: impl std::fmt::Display) -> ! {
    tracing::error!(error = %error, "{message}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let path = config_path();
    let config = match config::load_config(Some(&path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("holden-server: cannot load {path}: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging);
    tracing::info!(config = %path, "configuration loaded");

    let pool = holden_store::open_store(&config.database.path, config.database.handle_settings())
        .unwrap_or_else(|e| fatal("database bootstrap failed", e));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| fatal("failed to bind listener", e));

    tracing::info!(%addr, db = %config.database.path, "holden server listening");

    if let Err(e) = axum::serve(listener, app(AppState { pool }))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        fatal("server error", e);
    }

    tracing::info!("holden server stopped");
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!(signal = "SIGINT", "shutting down"),
        () = terminate => tracing::info!(signal = "SIGTERM", "shutting down"),
    }
}
