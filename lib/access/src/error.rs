//! Error types for the access crate.
//!
//! Session errors never reach the client: a cookie that fails to decode is
//! treated as an empty session by the server.

use std::fmt;

/// Errors from decoding or encoding a session payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The cookie value is not valid base64url.
    Encoding { reason: String },
    /// The decoded bytes are not a valid session document.
    Malformed { reason: String },
    /// The session lifetime has elapsed.
    Expired,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoding { reason } => {
                write!(f, "session cookie is not valid base64: {reason}")
            }
            Self::Malformed { reason } => {
                write!(f, "session payload is malformed: {reason}")
            }
            Self::Expired => {
                write!(f, "session has expired")
            }
        }
    }
}

impl std::error::Error for SessionError {}
