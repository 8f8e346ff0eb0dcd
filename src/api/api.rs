//! Auth API Routes

use super::{
    guard::{request_guard, security_headers, RequestGuard},
    handlers::*,
};
use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Auth API router
pub struct AuthApi;

impl AuthApi {
    /// Create the auth API router
    pub fn create_router(state: AppState) -> Router {
        let guard = Arc::new(RequestGuard::new(
            vec![Method::POST],
            state.max_body_bytes,
            state.trust_proxy_headers,
            state.metrics.clone(),
        ));

        // Operational routes (no method guard)
        let public_routes = Router::new()
            .route("/health", get(health_check))
            .route("/metrics", get(export_metrics));

        let auth_routes = Router::new()
            .route("/create-session", post(create_session))
            .route("/validate-session", post(validate_session))
            .route("/update-activity", post(update_activity))
            .route("/invalidate-session", post(invalidate_session))
            .route("/check-rate-limit", post(check_rate_limit))
            .route("/validate-password", post(validate_password))
            .route("/validate-csrf", post(validate_csrf))
            .layer(middleware::from_fn_with_state(guard, request_guard));

        Router::new()
            .nest("/api/auth", auth_routes)
            .merge(public_routes)
            .with_state(state)
            .layer(middleware::map_response(security_headers))
            .layer(TraceLayer::new_for_http())
    }
}
