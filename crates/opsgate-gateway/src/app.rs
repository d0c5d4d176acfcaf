use axum::{routing::get, Router};
use opsgate_core::config::OpsgateConfig;
use opsgate_exec::UntrustedRunner;
use opsgate_model::GenerativeModel;
use std::sync::Arc;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
///
/// The model and runner are held as trait objects: the client holds no
/// conversation state so one shared handle is safe (every `ChatSession` is
/// connection-local), and the seams let tests drive the connection loops
/// with scripted implementations.
pub struct AppState {
    pub config: OpsgateConfig,
    pub model: Arc<dyn GenerativeModel>,
    pub runner: Arc<dyn UntrustedRunner>,
}

impl AppState {
    pub fn new(
        config: OpsgateConfig,
        model: Arc<dyn GenerativeModel>,
        runner: Arc<dyn UntrustedRunner>,
    ) -> Self {
        Self {
            config,
            model,
            runner,
        }
    }
}

/// Assemble the full Axum router.
///
/// Three WS endpoints share the same transport and model plumbing; the
/// fallback answers plain HTTP on every other path with permissive CORS
/// (the CorsLayer also handles OPTIONS preflight as a no-op 200).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ai", get(crate::ws::relay::ws_handler))
        .route("/start-chat", get(crate::ws::chat::ws_handler))
        .route("/ops", get(crate::ws::ops::ws_handler))
        .fallback(crate::http::root::root_handler)
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
