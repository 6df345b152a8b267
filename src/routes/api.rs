use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// API Router Module
///
/// Endpoints outside the navigation table. None of them render a view.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /api/routes
        // The route table as data, so the frontend can build its menus from it.
        .route("/api/routes", get(handlers::list_routes))
        // GET/POST/DELETE /api/session
        // Inspect, switch (development only) or clear the session role.
        .route(
            "/api/session",
            get(handlers::get_session)
                .post(handlers::set_session_role)
                .delete(handlers::clear_session),
        )
}
