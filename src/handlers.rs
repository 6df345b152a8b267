use crate::{
    AppState,
    models::{RouteSummary, SessionResponse, SetRoleRequest, ViewResponse},
    session::SessionHandle,
};
use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

// --- View Handlers ---

/// render_view
///
/// [Navigable Route] Renders the view descriptor prepared by the `route_guard` middleware.
/// Only reached after the route's guard permitted the navigation.
#[utoipa::path(
    get,
    path = "/{view_path}",
    params(("view_path" = String, Path, description = "One of login, register, student, teacher, admin")),
    responses(
        (status = 200, description = "View permitted", body = ViewResponse),
        (status = 303, description = "Denied or redirected; Location points at /login"),
        (status = 404, description = "No route table entry")
    )
)]
pub async fn render_view(Extension(rendered): Extension<ViewResponse>) -> Json<ViewResponse> {
    Json(rendered)
}

// --- API Handlers ---

/// list_routes
///
/// [Public Route] Describes the route table: each path, where it leads, and the role it requires.
#[utoipa::path(
    get,
    path = "/api/routes",
    responses((status = 200, description = "Route table", body = [RouteSummary]))
)]
pub async fn list_routes(State(state): State<AppState>) -> Json<Vec<RouteSummary>> {
    Json(state.table.summaries())
}

/// get_session
///
/// [Public Route] Reports the role held by the caller's session, if any.
#[utoipa::path(
    get,
    path = "/api/session",
    responses((status = 200, description = "Current session", body = SessionResponse))
)]
pub async fn get_session(handle: SessionHandle) -> Json<SessionResponse> {
    Json(SessionResponse {
        role: handle.session.role(),
    })
}

/// set_session_role
///
/// [Development Route] Switches the caller's session to the requested role, standing in for
/// the login form. Rejected with 403 outside the development environment.
#[utoipa::path(
    post,
    path = "/api/session",
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role set", body = SessionResponse),
        (status = 403, description = "Not available outside development")
    )
)]
pub async fn set_session_role(
    State(state): State<AppState>,
    mut handle: SessionHandle,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Response, StatusCode> {
    if !state.config.env.is_development() {
        tracing::warn!(requested = %payload.role, "role switch refused outside development");
        return Err(StatusCode::FORBIDDEN);
    }

    let previous = handle.session.set_role(payload.role);
    tracing::info!(
        session_id = %handle.session.id,
        role = %payload.role,
        ?previous,
        "session role switched"
    );
    state.sessions.save(handle.session.clone()).await;

    let mut response = Json(SessionResponse {
        role: Some(payload.role),
    })
    .into_response();
    handle.attach_cookie(&mut response);
    Ok(response)
}

/// clear_session
///
/// [Public Route] Logs out: drops the role from the caller's session.
#[utoipa::path(
    delete,
    path = "/api/session",
    responses((status = 204, description = "Role cleared"))
)]
pub async fn clear_session(State(state): State<AppState>, mut handle: SessionHandle) -> StatusCode {
    if handle.is_new() {
        return StatusCode::NO_CONTENT;
    }
    if let Some(previous) = handle.session.clear_role() {
        tracing::info!(session_id = %handle.session.id, role = %previous, "session role cleared");
        state.sessions.save(handle.session).await;
    }
    StatusCode::NO_CONTENT
}
