use std::env;

use crate::{guard::DevBypass, models::Role};

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and pulled into
/// handlers via FromRef, like every other part of the shared state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. `Local` is the development execution mode.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Whether entering /login writes `dev_bypass_role` into the session.
    pub dev_bypass_enabled: bool,
    pub dev_bypass_role: Role,
    // Name of the cookie carrying the session id.
    pub session_cookie: String,
}

/// Env
///
/// Defines the runtime context, used to switch between development conveniences (login
/// bypass, role switch endpoint) and deployed behavior.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Env {
    pub fn is_development(&self) -> bool {
        *self == Env::Local
    }
}

/// ConfigError
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid role: {value:?}")]
    InvalidRole { var: &'static str, value: String },
    #[error("{var} must be true/false/1/0, got {value:?}")]
    InvalidFlag { var: &'static str, value: String },
    #[error("DEV_BYPASS_ENABLED cannot be turned on when APP_ENV=production")]
    BypassInProduction,
}

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SESSION_COOKIE: &str = "edu_session";

impl Default for AppConfig {
    /// Safe configuration for test setup: local environment with the bypass switched off, so
    /// tests opt into it explicitly.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            dev_bypass_enabled: false,
            dev_bypass_role: Role::Admin,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Production refuses to start with
    /// the login bypass enabled.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let dev_bypass_enabled = match env::var("DEV_BYPASS_ENABLED") {
            Ok(value) => parse_flag("DEV_BYPASS_ENABLED", &value)?,
            Err(_) => env.is_development(),
        };
        if dev_bypass_enabled && env == Env::Production {
            return Err(ConfigError::BypassInProduction);
        }

        let dev_bypass_role = match env::var("DEV_BYPASS_ROLE") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidRole {
                var: "DEV_BYPASS_ROLE",
                value,
            })?,
            Err(_) => Role::Admin,
        };

        Ok(Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            dev_bypass_enabled,
            dev_bypass_role,
            session_cookie: env::var("SESSION_COOKIE")
                .unwrap_or_else(|_| DEFAULT_SESSION_COOKIE.to_string()),
        })
    }

    pub fn dev_bypass(&self) -> DevBypass {
        DevBypass {
            enabled: self.dev_bypass_enabled,
            role: self.dev_bypass_role,
        }
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}
