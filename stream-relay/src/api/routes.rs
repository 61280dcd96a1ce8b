use axum::Router;
use axum::extract::State;
use axum::routing::get;
use std::sync::Arc;

/// Router answering `GET /` with a fixed liveness message.
pub fn create_router(message: impl Into<Arc<str>>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .with_state(message.into())
}

async fn liveness(State(message): State<Arc<str>>) -> String {
    tracing::info!("Ping received");
    message.to_string()
}
