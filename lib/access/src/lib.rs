//! Identity, session, and audit types for the gatehouse gateway.
//!
//! This crate provides:
//! - Identity claims returned by the OIDC provider (`IdentityClaims`)
//! - The signed-cookie session payload (`SessionData`, `PendingLogin`)
//! - Provider configuration (`ProviderConfig`)
//! - Structured audit events (`AuditEvent`)
//!
//! Nothing here touches HTTP; the server crate wires these types into axum.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use gatehouse_access::{IdentityClaims, SessionData};
//!
//! let claims = IdentityClaims::new("auth0|123456".to_string())
//!     .with_email(Some("alice@example.com".to_string()));
//!
//! let mut session = SessionData::default();
//! assert!(!session.is_authenticated());
//!
//! session.set_user(claims.clone());
//! session.refresh_expiry(Utc::now(), Duration::hours(8));
//!
//! let encoded = session.encode().expect("encode");
//! let decoded = SessionData::decode(&encoded, Utc::now()).expect("decode");
//! assert_eq!(decoded.user(), Some(&claims));
//! ```

pub mod audit;
pub mod claims;
pub mod error;
pub mod provider;
pub mod session;

// Re-export main types at crate root
pub use audit::{AUDIT_TARGET, AuditEvent};
pub use claims::IdentityClaims;
pub use error::SessionError;
pub use provider::ProviderConfig;
pub use session::{PendingLogin, SessionData};
