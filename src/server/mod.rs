//! Draft store server: the REST surface over [`DraftStorage`].
//!
//! Three operations, consumed by the client sync manager:
//!
//! - `GET /draft` - full read: `{ state, version, userId }`
//! - `GET /draft?meta=true` - metadata only: `{ version, userId }`
//! - `POST /draft` with `{ state, userId }` - write, returns `{ version }`
//!
//! `404` means no draft has been written yet; `503` means the server is
//! running without a provisioned store (clients degrade to local-only). The
//! server performs no conflict resolution: last write wins, version numbers
//! are handed out in order, and merging is entirely the clients' job.

pub mod storage;

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::document::Draft;
use crate::store::DraftMeta;

pub use storage::{DraftStorage, ServerStorageError};

/// Shared server state.
///
/// `storage` is `None` when the deployment has no store provisioned; every
/// draft endpoint then answers `503`.
#[derive(Clone)]
pub struct AppState {
    storage: Option<Arc<RwLock<DraftStorage>>>,
}

impl AppState {
    /// State backed by the given storage.
    pub fn new(storage: DraftStorage) -> Self {
        Self {
            storage: Some(Arc::new(RwLock::new(storage))),
        }
    }

    /// State for a deployment without a provisioned store.
    pub fn unconfigured() -> Self {
        Self { storage: None }
    }
}

/// Builds the draft server router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/draft", get(get_draft).post(post_draft))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

fn not_configured() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorBody {
            error: "not_configured",
        }),
    )
        .into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct DraftQuery {
    #[serde(default)]
    meta: bool,
}

async fn get_draft(State(state): State<AppState>, Query(query): Query<DraftQuery>) -> Response {
    let Some(storage) = &state.storage else {
        return not_configured();
    };

    let storage = storage.read().await;
    match storage.load() {
        Ok(Some(record)) => {
            if query.meta {
                Json(DraftMeta {
                    version: record.version,
                    user_id: record.user_id,
                })
                .into_response()
            } else {
                Json(record).into_response()
            }
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody { error: "not_found" }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to load draft: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody { error: "storage" }),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PutDraftRequest {
    state: Draft,
    user_id: String,
}

#[derive(Serialize)]
struct PutDraftResponse {
    version: u64,
}

async fn post_draft(
    State(state): State<AppState>,
    Json(body): Json<PutDraftRequest>,
) -> Response {
    let Some(storage) = &state.storage else {
        return not_configured();
    };

    // The write lock makes the read-increment-write version cycle exclusive
    let storage = storage.write().await;
    match storage.put(&body.state, &body.user_id) {
        Ok(version) => {
            tracing::debug!(version, user_id = %body.user_id, "Draft written");
            Json(PutDraftResponse { version }).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to write draft: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody { error: "storage" }),
            )
                .into_response()
        }
    }
}
