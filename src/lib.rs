use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::{HeaderName, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Navigation core: the route table, its guards and the notification channel.
pub mod guard;
pub mod models;
pub mod navigation;
pub mod notify;

// Service components.
pub mod config;
pub mod flash;
pub mod handlers;
pub mod session;

// Module for routing segregation (table-driven views, JSON API).
pub mod routes;
use routes::{api, views};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use navigation::{NavigationOutcome, Navigator, RouteTable};
pub use session::{MemorySessionStore, SessionHandle, SessionState};

use models::{NavigationIntent, ViewResponse};
use notify::NoticeBuffer;

/// ApiDoc
///
/// Aggregates the documented handlers and schemas into the OpenAPI document served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::render_view, handlers::list_routes, handlers::get_session,
        handlers::set_session_role, handlers::clear_session
    ),
    components(
        schemas(
            models::Role, models::View, models::Severity, models::Notification,
            models::ViewResponse, models::SessionResponse, models::SetRoleRequest,
            models::RouteSummary,
        )
    ),
    tags(
        (name = "edu-eval", description = "Educational evaluation navigation shell")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single shared container for the session store, the route table and the configuration.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionState,
    /// Built once at startup; never mutated afterwards.
    pub table: Arc<RouteTable>,
    pub config: AppConfig,
}

impl AppState {
    /// State with the standard route table.
    pub fn new(config: AppConfig, sessions: SessionState) -> Self {
        Self {
            sessions,
            table: Arc::new(RouteTable::standard()),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for Arc<RouteTable> {
    fn from_ref(app_state: &AppState) -> Arc<RouteTable> {
        app_state.table.clone()
    }
}

/// route_guard
///
/// Middleware in front of every route table path. It runs one navigation for the request
/// path against the caller's session:
/// - `Rendered`: a pending flash notice is moved into the `ViewResponse` extension, the flash
///   cookie is expired, and the request continues to `render_view`.
/// - `Redirected` (denial or redirect entry): 303 to the target; a denial sets the flash
///   cookie so the notice shows on the next rendered view.
/// - `NotFound`: 404.
///
/// Navigation only reads the session. It is saved, and a new one given its cookie, only when
/// the login bypass changed the role.
async fn route_guard(
    State(state): State<AppState>,
    mut handle: SessionHandle,
    mut request: Request,
    next: Next,
) -> Response {
    let source_path = request
        .headers()
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let intent = NavigationIntent::new(request.uri().path(), source_path);
    let flashed = flash::read(request.headers());

    let notices = NoticeBuffer::new();
    let mut navigator = Navigator::new(state.table.clone(), state.config.dev_bypass());
    let role_before = handle.session.role();
    let outcome = navigator.dispatch(intent, &mut handle.session, &notices);

    let role_changed = handle.session.role() != role_before;
    if role_changed {
        state.sessions.save(handle.session.clone()).await;
    }

    let mut response = match outcome {
        NavigationOutcome::Rendered { path, view } => {
            let rendered = ViewResponse {
                path,
                view,
                role: handle.session.role(),
                notices: flashed.map(flash::notice).into_iter().collect(),
            };
            request.extensions_mut().insert(rendered);
            let mut response = next.run(request).await;
            if flashed.is_some() {
                response
                    .headers_mut()
                    .append(header::SET_COOKIE, flash::clear_cookie());
            }
            response
        }
        NavigationOutcome::Redirected { to, denied, .. } => {
            let mut response = Redirect::to(&to).into_response();
            if let Some(cookie) = denied.as_ref().and_then(flash::set_cookie) {
                tracing::debug!(queued = notices.len(), "denial notice flashed");
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            response
        }
        NavigationOutcome::NotFound { .. } => StatusCode::NOT_FOUND.into_response(),
        // `dispatch` reports redirects without following them; only `navigate` can loop.
        NavigationOutcome::RedirectLoop { path } => {
            tracing::error!(%path, "redirect loop reported by a single dispatch");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };

    if role_changed {
        handle.attach_cookie(&mut response);
    }
    response
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and registers the
/// application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // API Routes: checks live in the handlers.
        .merge(api::api_routes())
        // View Routes: every table path is guarded by `route_guard`.
        .merge(
            views::view_routes(&state.table).route_layer(middleware::from_fn_with_state(
                state.clone(),
                route_guard,
            )),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of one request carries its x-request-id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
