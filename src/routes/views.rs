use crate::{AppState, handlers, navigation::RouteTable};
use axum::{Router, routing::get};

/// View Router Module
///
/// Registers one GET route per route table entry, all served by `render_view`.
///
/// Access Control:
/// The caller must wrap the returned router with `route_guard` (via `route_layer`). The
/// middleware resolves the path against the same table, runs the entry's guard and either
/// lets the request through to `render_view` or answers with a redirect to `/login`.
/// Redirect-only entries such as `/` never reach the handler.
pub fn view_routes(table: &RouteTable) -> Router<AppState> {
    table
        .entries()
        .iter()
        .fold(Router::new(), |router, entry| {
            router.route(entry.path, get(handlers::render_view))
        })
}
