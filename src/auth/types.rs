//! Types for authentication and user management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The signed-in user as the rest of the crate sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user ID
    pub uid: String,

    /// The user's email address
    pub email: Option<String>,

    /// Name shown next to the user's comments
    pub display_name: Option<String>,
}

impl Identity {
    /// Create an identity with only a user ID
    pub fn new(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            email: None,
            display_name: None,
        }
    }

    /// Set the email address
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Set the display name
    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }
}

/// Authentication response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The user data
    pub user: Option<User>,

    /// The access token
    pub access_token: Option<String>,

    /// The refresh token
    pub refresh_token: Option<String>,

    /// The expiry time in seconds
    pub expires_in: Option<i64>,
}

/// User data returned by the auth provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: String,

    /// The user's email address
    pub email: Option<String>,

    /// The user metadata
    #[serde(default)]
    pub user_metadata: HashMap<String, serde_json::Value>,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        let display_name = user
            .user_metadata
            .get("name")
            .or_else(|| user.user_metadata.get("full_name"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Identity {
            uid: user.id,
            email: user.email,
            display_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_takes_name_from_metadata() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "email": "a@example.com",
            "user_metadata": { "name": "Ada" }
        }))
        .unwrap();
        let identity = Identity::from(user);
        assert_eq!(identity.uid, "u1");
        assert_eq!(identity.display_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn metadata_is_optional() {
        let user: User = serde_json::from_value(json!({ "id": "u2", "email": null })).unwrap();
        assert_eq!(Identity::from(user).display_name, None);
    }
}
