//! Draftsync store server.
//!
//! Serves the shared newsletter draft to polling editor sessions. Holds the
//! single draft blob with its version counter and last-editor tag; all
//! conflict resolution happens client-side.
//!
//! # Configuration
//!
//! Environment variables:
//! - `DRAFTSYNC_PORT`: Port to listen on (default: 8080)
//! - `DRAFTSYNC_DATA_DIR`: Directory to store the draft
//!   (default: ~/.local/share/draftsync-server)
//!
//! If the data directory cannot be created the server still starts, but
//! answers every draft request with `503` so clients fall back to
//! local-only editing.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check
//! - `GET /draft`: Latest draft with version and last editor
//! - `GET /draft?meta=true`: Version and last editor only (cheap poll)
//! - `POST /draft`: Write a new draft revision

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use draftsync::server::{router, AppState, DraftStorage};

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
struct Config {
    port: u16,
    data_dir: PathBuf,
}

impl Config {
    fn from_env() -> Self {
        let port = std::env::var("DRAFTSYNC_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("DRAFTSYNC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("draftsync-server")
            });

        Self { port, data_dir }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "draftsync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    // Degrade to the unconfigured state instead of exiting: clients can
    // still run local-only against a 503-ing store
    let state = match std::fs::create_dir_all(&config.data_dir) {
        Ok(()) => {
            tracing::info!("Data directory: {}", config.data_dir.display());
            AppState::new(DraftStorage::new(&config.data_dir))
        }
        Err(e) => {
            tracing::error!(
                "Failed to create data directory {}: {}; serving without a store",
                config.data_dir.display(),
                e
            );
            AppState::unconfigured()
        }
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
