use crate::{models::Role, session::Session};

/// AccessDenied
///
/// The only user-visible failure of a navigation. It never leaves the navigator: it is turned
/// into a notification plus a redirect to the login page. Displays as the role-specific message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{}", .required.denial_message())]
pub struct AccessDenied {
    pub required: Role,
}

/// GuardDecision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Permit,
    Deny(AccessDenied),
}

impl GuardDecision {
    pub fn is_permit(&self) -> bool {
        matches!(self, GuardDecision::Permit)
    }
}

/// DevBypass
///
/// Injected development switch for the login route. When enabled, entering `/login` writes
/// `role` into the session so guarded pages can be reached without a login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevBypass {
    pub enabled: bool,
    pub role: Role,
}

impl DevBypass {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            role: Role::Admin,
        }
    }

    pub fn enabled(role: Role) -> Self {
        Self {
            enabled: true,
            role,
        }
    }
}

/// Guard
///
/// Access predicate attached to a route entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Permit only sessions whose role equals the given role.
    RequireRole(Role),
    /// Always permits; applies the development bypass on entry.
    DevLogin,
}

impl Guard {
    /// The role a session must hold to pass, if any.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Guard::RequireRole(role) => Some(*role),
            Guard::DevLogin => None,
        }
    }

    /// Side effects applied before `check`. Only the login guard has any.
    pub fn before_enter(&self, session: &mut Session, bypass: &DevBypass) {
        if let Guard::DevLogin = self {
            if bypass.enabled {
                let previous = session.set_role(bypass.role);
                tracing::debug!(
                    session_id = %session.id,
                    role = %bypass.role,
                    ?previous,
                    "development bypass applied on login route"
                );
            }
        }
    }

    /// Evaluates the predicate. Reads the session only, so repeated evaluation against an
    /// unchanged session yields the same decision.
    pub fn check(&self, session: &Session) -> GuardDecision {
        match self {
            Guard::DevLogin => GuardDecision::Permit,
            Guard::RequireRole(required) => {
                if is_authenticated(session) && session.role() == Some(*required) {
                    GuardDecision::Permit
                } else {
                    GuardDecision::Deny(AccessDenied {
                        required: *required,
                    })
                }
            }
        }
    }
}

/// Authentication-presence check: a session counts as authenticated once it carries a role.
/// No credential is verified here.
pub fn is_authenticated(session: &Session) -> bool {
    session.role().is_some()
}
