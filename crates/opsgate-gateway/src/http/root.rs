use axum::http::StatusCode;

/// Catch-all HTTP handler: 200 with no body. CORS headers are added by the
/// permissive CorsLayer on the router.
pub async fn root_handler() -> StatusCode {
    StatusCode::OK
}
