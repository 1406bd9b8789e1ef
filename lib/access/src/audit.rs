//! Structured audit events.
//!
//! Each event is emitted as a single `tracing` event under the
//! [`AUDIT_TARGET`] target, tagged with an `event` field naming its kind and
//! a UTC `timestamp`. Where the lines end up is decided by whatever
//! subscriber the process installs.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::Level;

/// Tracing target for audit events.
pub const AUDIT_TARGET: &str = "audit";

/// A security-relevant occurrence worth one log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent<'a> {
    /// A visitor was sent to the provider to log in.
    LoginAttempt { ip: Option<IpAddr> },
    /// The provider callback produced a session.
    LoginSuccess {
        user_id: &'a str,
        email: Option<&'a str>,
    },
    /// An anonymous visitor hit a gated route.
    UnauthorizedAccess {
        ip: Option<IpAddr>,
        route: &'a str,
    },
    /// A signed-in user fetched a gated resource.
    ProtectedAccess {
        user_id: &'a str,
        email: Option<&'a str>,
    },
    /// A response went out with status 401.
    UnauthorizedError { ip: Option<IpAddr>, path: &'a str },
}

impl AuditEvent<'_> {
    /// Returns the event kind tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoginAttempt { .. } => "LOGIN_ATTEMPT",
            Self::LoginSuccess { .. } => "LOGIN_SUCCESS",
            Self::UnauthorizedAccess { .. } => "UNAUTHORIZED_ACCESS",
            Self::ProtectedAccess { .. } => "PROTECTED_ACCESS",
            Self::UnauthorizedError { .. } => "UNAUTHORIZED_ERROR",
        }
    }

    /// Returns the severity the event is logged at.
    #[must_use]
    pub fn level(&self) -> Level {
        match self {
            Self::LoginAttempt { .. } | Self::LoginSuccess { .. } | Self::ProtectedAccess { .. } => {
                Level::INFO
            }
            Self::UnauthorizedAccess { .. } | Self::UnauthorizedError { .. } => Level::WARN,
        }
    }

    /// Emits the event stamped with the current time.
    pub fn emit(&self) {
        self.emit_at(Utc::now());
    }

    /// Emits the event stamped with `at`.
    pub fn emit_at(&self, at: DateTime<Utc>) {
        let event = self.kind();
        let timestamp = at.to_rfc3339_opts(SecondsFormat::Micros, true);

        match *self {
            Self::LoginAttempt { ip } => {
                tracing::info!(
                    target: AUDIT_TARGET,
                    event,
                    ip = %ClientAddr(ip),
                    %timestamp,
                    "login attempt"
                );
            }
            Self::LoginSuccess { user_id, email } => {
                tracing::info!(
                    target: AUDIT_TARGET,
                    event,
                    user_id,
                    email = email.unwrap_or_default(),
                    %timestamp,
                    "login succeeded"
                );
            }
            Self::UnauthorizedAccess { ip, route } => {
                tracing::warn!(
                    target: AUDIT_TARGET,
                    event,
                    ip = %ClientAddr(ip),
                    route,
                    %timestamp,
                    "unauthorized access attempt"
                );
            }
            Self::ProtectedAccess { user_id, email } => {
                tracing::info!(
                    target: AUDIT_TARGET,
                    event,
                    user_id,
                    email = email.unwrap_or_default(),
                    %timestamp,
                    "protected resource accessed"
                );
            }
            Self::UnauthorizedError { ip, path } => {
                tracing::warn!(
                    target: AUDIT_TARGET,
                    event,
                    ip = %ClientAddr(ip),
                    path,
                    %timestamp,
                    "unauthorized response"
                );
            }
        }
    }
}

/// Peer address as it appears in audit lines.
struct ClientAddr(Option<IpAddr>);

impl fmt::Display for ClientAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ip) => write!(f, "{ip}"),
            None => write!(f, "unknown"),
        }
    }
}
