use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Path Constants ---

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const STUDENT_PATH: &str = "/student";
pub const TEACHER_PATH: &str = "/teacher";
pub const ADMIN_PATH: &str = "/admin";

/// Default lifetime of a transient notification before the client dismisses it.
pub const NOTICE_DURATION_MS: u64 = 3000;

// --- Core Schemas ---

/// Role
///
/// The RBAC tag carried by a session. Exactly one role (or none) is active per session.
/// Serialized lowercase: "student" | "teacher" | "admin".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Teacher, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }

    /// The guarded landing path reserved for this role.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Student => STUDENT_PATH,
            Role::Teacher => TEACHER_PATH,
            Role::Admin => ADMIN_PATH,
        }
    }

    /// The user-visible message shown when a navigation requiring this role is rejected.
    pub fn denial_message(&self) -> &'static str {
        match self {
            Role::Student => "仅限学生访问",
            Role::Teacher => "仅限教师访问",
            Role::Admin => "仅限管理员访问",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UnknownRole
///
/// Returned when a string does not name one of the three known roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// View
///
/// Opaque handle to a renderable page. The navigation layer only ever passes these around;
/// the page contents live in the frontend bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum View {
    Login,
    Register,
    StudentHome,
    TeacherHome,
    AdminHome,
}

/// Severity
///
/// Display level of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Notification
///
/// A transient, auto-dismissing message for the user. Produced by the guard layer on denial
/// and consumed exactly once by the next rendered view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    /// How long the client keeps the message on screen.
    pub duration_ms: u64,
    #[ts(type = "string")]
    pub issued_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            duration_ms: NOTICE_DURATION_MS,
            issued_at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

/// NavigationIntent
///
/// An ephemeral request to move to `target_path`. Consumed once by the navigator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationIntent {
    pub target_path: String,
    pub source_path: Option<String>,
}

impl NavigationIntent {
    pub fn new(target_path: impl Into<String>, source_path: Option<String>) -> Self {
        Self {
            target_path: target_path.into(),
            source_path,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// SetRoleRequest
///
/// Input payload for the developer login switch (POST /api/session).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetRoleRequest {
    pub role: Role,
}

// --- Response Schemas (Output) ---

/// ViewResponse
///
/// Returned for every permitted navigation: the view to mount, the role it was rendered for,
/// and any notices queued since the last render (e.g. the reason for a redirect).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ViewResponse {
    pub path: String,
    pub view: View,
    pub role: Option<Role>,
    pub notices: Vec<Notification>,
}

/// SessionResponse
///
/// The session's current role (GET/POST /api/session).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionResponse {
    pub role: Option<Role>,
}

/// RouteSummary
///
/// Read-only description of one route table entry (GET /api/routes).
/// Exactly one of `view` and `redirect` is set.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteSummary {
    pub path: String,
    pub view: Option<View>,
    pub redirect: Option<String>,
    pub required_role: Option<Role>,
}
