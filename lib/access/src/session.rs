//! Session payload carried in the signed session cookie.
//!
//! The server keeps no session table. Everything a session knows lives in
//! [`SessionData`], which is serialized into the cookie value and signed by
//! the web layer. Signing is the web layer's job; this module only handles
//! the payload codec and the expiry check.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::claims::IdentityClaims;
use crate::error::SessionError;

/// Authorization-flow state held between `/login` and `/callback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    /// The `state` parameter sent to the provider.
    pub csrf_token: String,
    /// PKCE code verifier matching the challenge sent to the provider.
    pub pkce_verifier: String,
    /// Nonce the ID token must echo back.
    pub nonce: String,
}

/// The contents of a browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Claims of the signed-in user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<IdentityClaims>,
    /// Login started but not yet completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_login: Option<PendingLogin>,
    /// When this payload stops being honored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl SessionData {
    /// Returns the signed-in user's claims, if any.
    #[must_use]
    pub fn user(&self) -> Option<&IdentityClaims> {
        self.user.as_ref()
    }

    /// Returns true if a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Stores the signed-in user, replacing any previous one.
    pub fn set_user(&mut self, claims: IdentityClaims) {
        self.user = Some(claims);
    }

    /// Returns the in-flight login state, if any.
    #[must_use]
    pub fn pending_login(&self) -> Option<&PendingLogin> {
        self.pending_login.as_ref()
    }

    /// Records a login that has been handed off to the provider.
    pub fn set_pending_login(&mut self, pending: PendingLogin) {
        self.pending_login = Some(pending);
    }

    /// Removes and returns the in-flight login state.
    ///
    /// The state is single-use: a second callback with the same state finds
    /// nothing.
    pub fn take_pending_login(&mut self) -> Option<PendingLogin> {
        self.pending_login.take()
    }

    /// Returns the expiry instant, if one has been set.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Extends the session so that it expires `lifetime` after `now`.
    pub fn refresh_expiry(&mut self, now: DateTime<Utc>, lifetime: Duration) {
        self.expires_at = Some(now + lifetime);
    }

    /// Returns true if the session has outlived its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Encodes the payload as base64url JSON for use as a cookie value.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String, SessionError> {
        let json = serde_json::to_vec(self).map_err(|e| SessionError::Malformed {
            reason: e.to_string(),
        })?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decodes a cookie value produced by [`SessionData::encode`].
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not valid base64url JSON, or if the
    /// session has expired as of `now`.
    pub fn decode(value: &str, now: DateTime<Utc>) -> Result<Self, SessionError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| SessionError::Encoding {
                reason: e.to_string(),
            })?;

        let data: Self = serde_json::from_slice(&bytes).map_err(|e| SessionError::Malformed {
            reason: e.to_string(),
        })?;

        if data.is_expired(now) {
            return Err(SessionError::Expired);
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> IdentityClaims {
        IdentityClaims::new("auth0|alice".to_string())
            .with_email(Some("alice@example.com".to_string()))
            .with_name(Some("Alice".to_string()))
    }

    fn pending() -> PendingLogin {
        PendingLogin {
            csrf_token: "state-123".to_string(),
            pkce_verifier: "verifier-abc".to_string(),
            nonce: "nonce-xyz".to_string(),
        }
    }

    #[test]
    fn default_session_is_anonymous() {
        let session = SessionData::default();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert!(session.pending_login().is_none());
    }

    #[test]
    fn set_user_overwrites_previous_user() {
        let mut session = SessionData::default();
        session.set_user(alice());
        session.set_user(IdentityClaims::new("auth0|bob".to_string()));

        assert!(session.is_authenticated());
        assert_eq!(session.user().map(|u| u.sub.as_str()), Some("auth0|bob"));
    }

    #[test]
    fn pending_login_is_single_use() {
        let mut session = SessionData::default();
        session.set_pending_login(pending());

        assert_eq!(session.take_pending_login(), Some(pending()));
        assert_eq!(session.take_pending_login(), None);
    }

    #[test]
    fn encoded_session_decodes_to_same_claims() {
        let now = Utc::now();
        let mut session = SessionData::default();
        session.set_user(alice());
        session.refresh_expiry(now, Duration::minutes(30));

        let encoded = session.encode().expect("encode");
        let decoded = SessionData::decode(&encoded, now).expect("decode");

        assert_eq!(decoded, session);
        assert_eq!(decoded.user(), Some(&alice()));
    }

    #[test]
    fn encoded_value_is_cookie_safe() {
        let mut session = SessionData::default();
        session.set_user(alice());
        session.set_pending_login(pending());

        let encoded = session.encode().expect("encode");

        assert!(
            encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn expired_session_is_rejected() {
        let issued = Utc::now();
        let mut session = SessionData::default();
        session.set_user(alice());
        session.refresh_expiry(issued, Duration::minutes(5));

        let encoded = session.encode().expect("encode");
        let later = issued + Duration::minutes(6);

        assert_eq!(
            SessionData::decode(&encoded, later),
            Err(SessionError::Expired)
        );
    }

    #[test]
    fn session_without_expiry_never_expires() {
        let session = SessionData::default();
        assert!(!session.is_expired(Utc::now() + Duration::days(3650)));
    }

    #[test]
    fn garbage_value_is_an_encoding_error() {
        let result = SessionData::decode("not base64!", Utc::now());
        assert!(matches!(result, Err(SessionError::Encoding { .. })));
    }

    #[test]
    fn non_json_payload_is_malformed() {
        let value = URL_SAFE_NO_PAD.encode(b"user=alice");
        let result = SessionData::decode(&value, Utc::now());
        assert!(matches!(result, Err(SessionError::Malformed { .. })));
    }

    #[test]
    fn empty_value_is_malformed() {
        let result = SessionData::decode("", Utc::now());
        assert!(matches!(result, Err(SessionError::Malformed { .. })));
    }
}
