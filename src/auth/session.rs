//! Session management for authentication

use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::Error;

/// Session data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The access token
    pub access_token: String,

    /// The refresh token
    pub refresh_token: String,

    /// The user ID
    pub user_id: String,

    /// The expiry timestamp, in seconds since the epoch
    pub expires_at: Option<i64>,
}

/// The claims read from an access token
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user ID
    pub sub: String,

    /// Expiry, in seconds since the epoch
    pub exp: Option<i64>,

    /// Email of the signed-in user
    pub email: Option<String>,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}

impl Session {
    /// Create a new session expiring `expires_in` seconds from now
    pub fn new(
        access_token: String,
        refresh_token: String,
        user_id: String,
        expires_in: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            user_id,
            expires_at: Some(now_secs() + expires_in),
        }
    }

    /// Build a session from the token's own claims
    pub fn from_token(access_token: String, refresh_token: String) -> Result<Self, Error> {
        let claims = read_claims(&access_token)?;
        Ok(Self {
            access_token,
            refresh_token,
            user_id: claims.sub,
            expires_at: claims.exp,
        })
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => now_secs() >= expires_at,
            None => false,
        }
    }
}

/// Read the claims of an access token without verifying its signature.
///
/// The token was just issued to us by the auth provider; the backend
/// verifies it on every request.
pub fn read_claims(token: &str) -> Result<TokenClaims, Error> {
    let header = decode_header(token)?;
    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

/// Shared slot holding the current session.
///
/// Every hosted client holds a clone so requests carry the signed-in
/// user's token.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    /// Create an empty session slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current session
    pub fn get(&self) -> Option<Session> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the current session
    pub fn set(&self, session: Option<Session>) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = session;
    }

    /// The access token of a live session
    pub fn access_token(&self) -> Option<String> {
        self.get()
            .filter(|session| !session.is_expired())
            .map(|session| session.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn token(exp: i64) -> String {
        encode(
            &Header::default(),
            &json!({ "sub": "user-1", "exp": exp, "email": "a@example.com" }),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap()
    }

    #[test]
    fn session_from_token_claims() {
        let exp = now_secs() + 3600;
        let session = Session::from_token(token(exp), "refresh".to_string()).unwrap();
        assert_eq!(session.user_id, "user-1");
        assert_eq!(session.expires_at, Some(exp));
        assert!(!session.is_expired());
    }

    #[test]
    fn expired_session_has_no_token() {
        let store = SessionStore::new();
        store.set(Some(Session::new("t".into(), "r".into(), "u".into(), -10)));
        assert!(store.get().is_some());
        assert!(store.access_token().is_none());

        store.set(Some(Session::new("t".into(), "r".into(), "u".into(), 60)));
        assert_eq!(store.access_token().as_deref(), Some("t"));
    }
}
