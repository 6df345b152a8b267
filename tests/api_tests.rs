use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use async_trait::async_trait;
use edu_eval_portal::{
    AppConfig, AppState, MemorySessionStore, create_router,
    config::Env,
    models::{Role, RouteSummary, SessionResponse, View, ViewResponse},
    session::{Session, SessionState, SessionStore},
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use uuid::Uuid;
use tokio::net::TcpListener;
use tower::ServiceExt;

// --- Helper Functions ---

fn test_app(config: AppConfig) -> (Router, SessionState) {
    let sessions = Arc::new(MemorySessionStore::new()) as SessionState;
    let router = create_router(AppState::new(config, sessions.clone()));
    (router, sessions)
}

fn dev_config(bypass: bool) -> AppConfig {
    AppConfig {
        dev_bypass_enabled: bypass,
        dev_bypass_role: Role::Admin,
        ..AppConfig::default()
    }
}

async fn send(app: &Router, method: &str, uri: &str, cookie: Option<&str>, json: Option<&str>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let body = match json {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    send(app, "GET", uri, cookie, None).await
}

/// The `name=value` pair of the Set-Cookie header for cookie `name`.
fn cookie_named(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{name}=")))
        .map(str::to_owned)
}

fn session_cookie(response: &Response) -> Option<String> {
    cookie_named(response, "edu_session")
}

/// Memory store that counts writes.
#[derive(Default)]
struct CountingStore {
    inner: MemorySessionStore,
    saves: AtomicUsize,
}

#[async_trait]
impl SessionStore for CountingStore {
    async fn load(&self, id: Uuid) -> Option<Session> {
        self.inner.load(id).await
    }

    async fn save(&self, session: Session) {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(session).await;
    }

    async fn remove(&self, id: Uuid) -> bool {
        self.inner.remove(id).await
    }

    async fn count(&self) -> usize {
        self.inner.count().await
    }
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let (app, _) = test_app(AppConfig::default());
    let response = get(&app, "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_root_redirects_to_login() {
    let (app, sessions) = test_app(AppConfig::default());
    let response = get(&app, "/", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    // Nothing worth remembering about an anonymous visit.
    assert!(session_cookie(&response).is_none());
    assert_eq!(sessions.count().await, 0);
}

#[tokio::test]
async fn test_register_is_public() {
    let (app, _) = test_app(AppConfig::default());
    let response = get(&app, "/register", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let view: ViewResponse = json_body(response).await;
    assert_eq!(view.view, View::Register);
    assert_eq!(view.role, None);
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let (app, _) = test_app(AppConfig::default());
    let response = get(&app, "/gradebook", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_denied_visit_redirects_and_flashes_notice_once() {
    let (app, sessions) = test_app(dev_config(false));

    let denied = get(&app, "/teacher", None).await;
    assert_eq!(denied.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&denied), "/login");
    assert!(session_cookie(&denied).is_none());
    let flash = cookie_named(&denied, "edu_flash").expect("denial must flash its notice");
    assert_eq!(flash, "edu_flash=teacher");
    assert_eq!(sessions.count().await, 0);

    let login = get(&app, "/login", Some(&flash)).await;
    assert_eq!(login.status(), StatusCode::OK);
    assert_eq!(cookie_named(&login, "edu_flash").as_deref(), Some("edu_flash="));
    let view: ViewResponse = json_body(login).await;
    assert_eq!(view.view, View::Login);
    assert_eq!(view.role, None);
    assert_eq!(view.notices.len(), 1);
    assert_eq!(view.notices[0].message, "仅限教师访问");

    // The browser dropped the expired flash cookie.
    let again = get(&app, "/login", None).await;
    assert!(cookie_named(&again, "edu_flash").is_none());
    let again: ViewResponse = json_body(again).await;
    assert!(again.notices.is_empty(), "notices are shown once");
}

#[tokio::test]
async fn test_anonymous_denials_store_no_sessions() {
    let (app, sessions) = test_app(dev_config(false));

    for _ in 0..50 {
        let response = get(&app, "/teacher", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(session_cookie(&response).is_none());
        assert!(cookie_named(&response, "edu_flash").is_some());
    }
    assert_eq!(sessions.count().await, 0);
}

#[tokio::test]
async fn test_navigation_does_not_rewrite_stored_session() {
    let store = Arc::new(CountingStore::default());
    let app = create_router(AppState::new(dev_config(false), store.clone() as SessionState));

    let switched = send(&app, "POST", "/api/session", None, Some(r#"{"role":"student"}"#)).await;
    let cookie = session_cookie(&switched).unwrap();
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);

    assert_eq!(get(&app, "/student", Some(&cookie)).await.status(), StatusCode::OK);
    assert_eq!(get(&app, "/register", Some(&cookie)).await.status(), StatusCode::OK);
    assert_eq!(get(&app, "/admin", Some(&cookie)).await.status(), StatusCode::SEE_OTHER);
    assert_eq!(get(&app, "/", Some(&cookie)).await.status(), StatusCode::SEE_OTHER);

    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    let current: SessionResponse = json_body(get(&app, "/api/session", Some(&cookie)).await).await;
    assert_eq!(current.role, Some(Role::Student));
}

#[tokio::test]
async fn test_dev_bypass_login_grants_admin() {
    let (app, _) = test_app(dev_config(true));

    let login = get(&app, "/login", None).await;
    assert_eq!(login.status(), StatusCode::OK);
    let cookie = session_cookie(&login).expect("bypass session must be persisted");
    let view: ViewResponse = json_body(login).await;
    assert_eq!(view.role, Some(Role::Admin));

    let admin = get(&app, "/admin", Some(&cookie)).await;
    assert_eq!(admin.status(), StatusCode::OK);
    let view: ViewResponse = json_body(admin).await;
    assert_eq!(view.view, View::AdminHome);

    let student = get(&app, "/student", Some(&cookie)).await;
    assert_eq!(student.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_login_without_bypass_leaves_role_unset() {
    let (app, sessions) = test_app(dev_config(false));

    let login = get(&app, "/login", None).await;
    assert!(session_cookie(&login).is_none());
    let view: ViewResponse = json_body(login).await;
    assert_eq!(view.role, None);
    assert_eq!(sessions.count().await, 0);
}

#[tokio::test]
async fn test_role_switch_and_logout() {
    let (app, _) = test_app(dev_config(false));

    let switched = send(&app, "POST", "/api/session", None, Some(r#"{"role":"student"}"#)).await;
    assert_eq!(switched.status(), StatusCode::OK);
    let cookie = session_cookie(&switched).unwrap();
    let body: SessionResponse = json_body(switched).await;
    assert_eq!(body.role, Some(Role::Student));

    assert_eq!(get(&app, "/student", Some(&cookie)).await.status(), StatusCode::OK);
    assert_eq!(get(&app, "/admin", Some(&cookie)).await.status(), StatusCode::SEE_OTHER);

    let current: SessionResponse = json_body(get(&app, "/api/session", Some(&cookie)).await).await;
    assert_eq!(current.role, Some(Role::Student));

    let logout = send(&app, "DELETE", "/api/session", Some(&cookie), None).await;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    let after = get(&app, "/student", Some(&cookie)).await;
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&after), "/login");
}

#[tokio::test]
async fn test_role_switch_refused_in_production() {
    let config = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };
    let (app, sessions) = test_app(config);

    let response = send(&app, "POST", "/api/session", None, Some(r#"{"role":"admin"}"#)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(sessions.count().await, 0);
}

#[tokio::test]
async fn test_stale_cookie_starts_fresh_session() {
    let (app, sessions) = test_app(dev_config(true));
    let cookie = "edu_session=00000000-0000-0000-0000-000000000001";

    let denied = get(&app, "/admin", Some(cookie)).await;
    assert_eq!(denied.status(), StatusCode::SEE_OTHER);
    assert!(session_cookie(&denied).is_none());

    // The bypass login replaces the stale id with a stored one.
    let login = get(&app, "/login", Some(cookie)).await;
    let issued = session_cookie(&login).unwrap();
    assert_ne!(issued, cookie);
    assert_eq!(sessions.count().await, 1);
}

#[tokio::test]
async fn test_route_listing() {
    let (app, _) = test_app(AppConfig::default());
    let routes: Vec<RouteSummary> = json_body(get(&app, "/api/routes", None).await).await;

    assert_eq!(routes.len(), 6);
    let teacher = routes.iter().find(|r| r.path == "/teacher").unwrap();
    assert_eq!(teacher.required_role, Some(Role::Teacher));
    assert_eq!(teacher.view, Some(View::TeacherHome));
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let (app, _) = test_app(AppConfig::default());
    let response = get(&app, "/health", None).await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_served_over_tcp() {
    let (router, _) = test_app(dev_config(true));
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let root = client.get(format!("{address}/")).send().await.unwrap();
    assert_eq!(root.status(), reqwest::StatusCode::SEE_OTHER);
    assert_eq!(root.headers()[reqwest::header::LOCATION], "/login");

    let login = client.get(format!("{address}/login")).send().await.unwrap();
    assert_eq!(login.status(), reqwest::StatusCode::OK);
    let view: ViewResponse = login.json().await.unwrap();
    assert_eq!(view.role, Some(Role::Admin));
}
