//! HTTP surface for Curator.
//!
//! [`router`] builds the axum application over a
//! [`CuratorService`]; [`serve`] binds it to an address. Mutating endpoints
//! hold an [`InFlight`] key for their duration so a duplicate request for the
//! same batch (or a second checkout) gets 409 instead of racing the first.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use curator_core::CuratorService;

pub mod errors;
pub mod guard;
pub mod handlers;

pub use errors::ApiError;
pub use guard::{InFlight, InFlightGuard};

/// Shared handler state.
#[derive(Debug)]
pub struct AppState {
    pub service: CuratorService,
    pub in_flight: InFlight,
}

impl AppState {
    pub fn new(service: CuratorService) -> Self {
        Self {
            service,
            in_flight: InFlight::default(),
        }
    }
}

pub fn router(service: CuratorService) -> Router {
    router_with_state(Arc::new(AppState::new(service)))
}

/// Router over existing state, for callers that need to observe it.
pub fn router_with_state(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/graph-data", get(handlers::graph_data))
        .route("/batch", get(handlers::batch_view))
        .route("/projects", get(handlers::list_projects))
        .route("/batches", get(handlers::list_batches))
        .route("/merged-graph", get(handlers::merged_graph))
        .route("/commits", get(handlers::list_commits))
        .route("/generate-candidate", post(handlers::generate_candidate))
        .route("/publish", post(handlers::publish))
        .route("/update-review-status", post(handlers::update_review_status))
        .route("/rollback", post(handlers::rollback))
        .route("/reset-latest", post(handlers::reset_latest))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(service: CuratorService, bind: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(address = %listener.local_addr()?, "Curator HTTP server listening");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
}
