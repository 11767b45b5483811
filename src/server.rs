use axum::{
    Router,
    routing::{delete, get},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use crate::handlers::{health_handler, metrics_handler, rate_limit_handler, reset_handler};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/rate-limiter", get(rate_limit_handler))
        .route("/rate-limiter/{client}", delete(reset_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Serve until `shutdown` resolves. Peer addresses are exposed to handlers
/// for identifier fallback.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
