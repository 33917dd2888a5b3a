//! staticgate -- static site gateway for S3-compatible object storage.
//!
//! Stateless: nothing is cached between requests, so startup only has to
//! load configuration and build the store client.  SIGTERM/SIGINT stop
//! accepting connections and let in-flight responses finish.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Notify;
use tracing::{info, warn};

use staticgate::config::{parse_bool_flag, Config, LoggingConfig, Overrides};
use staticgate::storage::memory::MemoryStore;
use staticgate::storage::s3::S3Store;
use staticgate::storage::ObjectStore;

/// Command-line arguments for the staticgate server.
#[derive(Parser, Debug)]
#[command(
    name = "staticgate",
    version,
    about = "Subdomain-routed static site gateway for S3-compatible storage"
)]
struct Cli {
    /// Path to a YAML configuration file.  Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,

    /// Listen port.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Object store endpoint (`host:port` or URL).
    #[arg(long, env = "MINIO_ENDPOINT")]
    endpoint: Option<String>,

    /// Object store access key.
    #[arg(long, env = "MINIO_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    /// Object store secret key.
    #[arg(long, env = "MINIO_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Use HTTPS for a scheme-less endpoint.
    #[arg(long, env = "MINIO_USE_SSL", value_parser = parse_bool_flag)]
    use_ssl: Option<bool>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            port: self.port,
            endpoint: self.endpoint.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            use_ssl: self.use_ssl,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => staticgate::config::load_config(path)?,
        None => Config::default(),
    };
    config.apply_overrides(&cli.overrides());

    init_tracing(&config.logging);
    match &cli.config {
        Some(path) => info!("Loaded configuration from {}", path),
        None => info!("No configuration file given, using defaults"),
    }

    config.check()?;

    let bind_addr = cli.bind.clone().unwrap_or_else(|| config.bind_addr());
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);

    let metrics = if config.observability.metrics {
        let handle = staticgate::metrics::init_metrics();
        info!("Prometheus metrics initialized");
        Some(handle)
    } else {
        None
    };

    // Initialize the object store based on config.
    let store: Arc<dyn ObjectStore> = match config.storage.backend.as_str() {
        "memory" => {
            let store = match &config.storage.memory.seed_dir {
                Some(dir) => {
                    let store = MemoryStore::from_dir(dir)?;
                    info!("In-memory object store seeded from {}", dir);
                    store
                }
                None => {
                    info!("In-memory object store initialized (empty)");
                    MemoryStore::new()
                }
            };
            Arc::new(store)
        }
        _ => Arc::new(S3Store::new(&config.storage.s3).await?),
    };

    let state = Arc::new(staticgate::AppState {
        config,
        store,
        metrics,
    });

    let app = staticgate::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("staticgate listening on {}", bind_addr);

    // Stop accepting on SIGTERM/SIGINT, then give in-flight responses
    // `shutdown_timeout` seconds to drain before exiting anyway.
    let signalled = Arc::new(Notify::new());
    let notify = signalled.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            notify.notify_one();
        })
        .into_future();

    tokio::select! {
        result = server => result?,
        _ = async {
            signalled.notified().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!(
                "In-flight requests still running after {}s, exiting",
                shutdown_timeout.as_secs()
            );
        }
    }

    info!("staticgate shut down");

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_use_ssl_accepts_bool_spellings() {
        let cli = Cli::try_parse_from(["staticgate", "--use-ssl", "T"]).unwrap();
        assert_eq!(cli.overrides().use_ssl, Some(true));

        let cli = Cli::try_parse_from(["staticgate", "--use-ssl", "0"]).unwrap();
        assert_eq!(cli.overrides().use_ssl, Some(false));
    }

    #[test]
    fn test_use_ssl_rejects_unknown_value() {
        assert!(Cli::try_parse_from(["staticgate", "--use-ssl", "maybe"]).is_err());
    }
}
