use std::sync::Arc;

use crate::{
    guard::{AccessDenied, DevBypass, Guard, GuardDecision},
    models::{
        ADMIN_PATH, LOGIN_PATH, NavigationIntent, Notification, REGISTER_PATH, ROOT_PATH, Role,
        RouteSummary, STUDENT_PATH, TEACHER_PATH, View,
    },
    notify::Notifier,
    session::Session,
};

/// Upper bound on redirects followed by a single `Navigator::navigate` call.
pub const MAX_REDIRECTS: usize = 4;

// --- Route Table ---

/// RouteTarget
///
/// What a matched path leads to: a view, or another path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    View(View),
    Redirect(&'static str),
}

/// RouteEntry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub path: &'static str,
    pub target: RouteTarget,
    pub guard: Option<Guard>,
}

impl RouteEntry {
    pub fn view(path: &'static str, view: View) -> Self {
        Self {
            path,
            target: RouteTarget::View(view),
            guard: None,
        }
    }

    pub fn redirect(path: &'static str, to: &'static str) -> Self {
        Self {
            path,
            target: RouteTarget::Redirect(to),
            guard: None,
        }
    }

    pub fn guarded(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn summary(&self) -> RouteSummary {
        let (view, redirect) = match self.target {
            RouteTarget::View(view) => (Some(view), None),
            RouteTarget::Redirect(to) => (None, Some(to.to_string())),
        };
        RouteSummary {
            path: self.path.to_string(),
            view,
            redirect,
            required_role: self.guard.and_then(|g| g.required_role()),
        }
    }
}

/// Resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Found(&'a RouteEntry),
    NotFound,
}

/// RouteTable
///
/// Fixed path -> (target, guard) mapping. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    /// The application's route table.
    pub fn standard() -> Self {
        Self::new(vec![
            RouteEntry::redirect(ROOT_PATH, LOGIN_PATH),
            RouteEntry::view(LOGIN_PATH, View::Login).guarded(Guard::DevLogin),
            RouteEntry::view(REGISTER_PATH, View::Register),
            RouteEntry::view(STUDENT_PATH, View::StudentHome)
                .guarded(Guard::RequireRole(Role::Student)),
            RouteEntry::view(TEACHER_PATH, View::TeacherHome)
                .guarded(Guard::RequireRole(Role::Teacher)),
            RouteEntry::view(ADMIN_PATH, View::AdminHome).guarded(Guard::RequireRole(Role::Admin)),
        ])
    }

    /// Exact string match; no wildcards or parameters.
    pub fn resolve(&self, path: &str) -> Resolution<'_> {
        self.entries
            .iter()
            .find(|entry| entry.path == path)
            .map_or(Resolution::NotFound, Resolution::Found)
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn summaries(&self) -> Vec<RouteSummary> {
        self.entries.iter().map(RouteEntry::summary).collect()
    }
}

// --- Navigator ---

/// NavState
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Idle,
    Resolving,
}

/// NavigationOutcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The guard (if any) permitted; the view renders.
    Rendered { path: String, view: View },
    /// The entry redirects, or a guard denied and the user is sent to the login page.
    Redirected {
        from: String,
        to: String,
        denied: Option<AccessDenied>,
    },
    /// No table entry; left to the shell's not-found handling.
    NotFound { path: String },
    /// `navigate` gave up after `MAX_REDIRECTS` hops.
    RedirectLoop { path: String },
}

/// Navigator
///
/// Drives navigation intents through the route table one at a time. Each dispatch runs
/// synchronously from `Resolving` back to `Idle`; there are no suspension points in between.
pub struct Navigator {
    table: Arc<RouteTable>,
    bypass: DevBypass,
    state: NavState,
    current: Option<String>,
}

impl Navigator {
    pub fn new(table: Arc<RouteTable>, bypass: DevBypass) -> Self {
        Self {
            table,
            bypass,
            state: NavState::Idle,
            current: None,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// Path of the last rendered view.
    pub fn current_path(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Builds an intent for `target`, sourced from the current path.
    pub fn intent(&self, target: &str) -> NavigationIntent {
        NavigationIntent::new(target, self.current.clone())
    }

    /// Processes one intent. A denial notifies once and yields exactly one redirect to the
    /// login path; redirects are reported, not followed.
    pub fn dispatch(
        &mut self,
        intent: NavigationIntent,
        session: &mut Session,
        notifier: &dyn Notifier,
    ) -> NavigationOutcome {
        self.state = NavState::Resolving;
        let outcome = self.evaluate(intent, session, notifier);
        self.state = NavState::Idle;

        if let NavigationOutcome::Rendered { path, .. } = &outcome {
            self.current = Some(path.clone());
        }
        tracing::debug!(?outcome, "navigation settled");
        outcome
    }

    fn evaluate(
        &self,
        intent: NavigationIntent,
        session: &mut Session,
        notifier: &dyn Notifier,
    ) -> NavigationOutcome {
        let NavigationIntent {
            target_path,
            source_path,
        } = intent;

        let entry = match self.table.resolve(&target_path) {
            Resolution::Found(entry) => entry,
            Resolution::NotFound => {
                return NavigationOutcome::NotFound { path: target_path };
            }
        };

        let view = match entry.target {
            RouteTarget::Redirect(to) => {
                return NavigationOutcome::Redirected {
                    from: target_path,
                    to: to.to_string(),
                    denied: None,
                };
            }
            RouteTarget::View(view) => view,
        };

        if let Some(guard) = entry.guard {
            guard.before_enter(session, &self.bypass);
            if let GuardDecision::Deny(denied) = guard.check(session) {
                tracing::warn!(
                    target_path = %target_path,
                    source_path = ?source_path,
                    required = %denied.required,
                    actual = ?session.role(),
                    "navigation denied"
                );
                notifier.notify(Notification::error(denied.to_string()));
                return NavigationOutcome::Redirected {
                    from: target_path,
                    to: LOGIN_PATH.to_string(),
                    denied: Some(denied),
                };
            }
        }

        NavigationOutcome::Rendered {
            path: target_path,
            view,
        }
    }

    /// Navigates to `target`, following redirects until a view renders, the path is unknown,
    /// or `MAX_REDIRECTS` is exceeded.
    pub fn navigate(
        &mut self,
        target: &str,
        session: &mut Session,
        notifier: &dyn Notifier,
    ) -> NavigationOutcome {
        let mut intent = self.intent(target);
        for _ in 0..=MAX_REDIRECTS {
            match self.dispatch(intent, session, notifier) {
                NavigationOutcome::Redirected { from, to, .. } => {
                    intent = NavigationIntent::new(to, Some(from));
                }
                settled => return settled,
            }
        }
        tracing::error!(target_path = %target, "redirect limit exceeded");
        NavigationOutcome::RedirectLoop {
            path: target.to_string(),
        }
    }
}
