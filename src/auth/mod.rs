//! Authentication: email/password sign-in, registration and sign-out

mod memory;
mod session;
mod types;

use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::Client;
use serde_json::json;

use crate::error::Error;
use crate::fetch::Fetch;

pub use memory::MemoryAuth;
pub use session::*;
pub use types::*;

/// An email/password identity provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a new user and sign them in
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, Error>;

    /// Sign in an existing user
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, Error>;

    /// Sign out the current user
    async fn sign_out(&self) -> Result<(), Error>;

    /// The currently signed-in user, if any
    fn current_user(&self) -> Option<Identity>;
}

/// Client for the hosted auth service
pub struct Auth {
    /// The base URL for the backend project
    url: String,

    /// The public API key for the backend project
    key: String,

    /// HTTP client used for requests
    client: Client,

    /// The current session, shared with the other hosted clients
    session: SessionStore,

    /// The user of the current session
    user: std::sync::Mutex<Option<Identity>>,
}

impl Auth {
    /// Create a new Auth client
    pub fn new(url: &str, key: &str, client: Client, session: SessionStore) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            client,
            session,
            user: std::sync::Mutex::new(None),
        }
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    fn set_user(&self, identity: Option<Identity>) {
        let mut guard = match self.user.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = identity;
    }

    /// Store the session carried by an auth response and derive the identity
    fn accept(&self, response: AuthResponse, email: &str) -> Result<Identity, Error> {
        let identity = match (response.access_token, response.user.clone()) {
            (Some(access_token), user) => {
                let refresh_token = response.refresh_token.unwrap_or_default();
                let session = match (&user, response.expires_in) {
                    (Some(user), Some(expires_in)) => {
                        Session::new(access_token, refresh_token, user.id.clone(), expires_in)
                    }
                    _ => Session::from_token(access_token, refresh_token)?,
                };
                let identity = match user {
                    Some(user) => Identity::from(user),
                    None => Identity::new(&session.user_id).with_email(email),
                };
                self.session.set(Some(session));
                identity
            }
            (None, Some(user)) => {
                warn!("Auth response for {} carried no session", user.id);
                Identity::from(user)
            }
            (None, None) => {
                return Err(Error::auth("Auth response carried neither user nor session"))
            }
        };

        self.set_user(Some(identity.clone()));
        Ok(identity)
    }

    /// Get the current session
    pub fn get_session(&self) -> Option<Session> {
        self.session.get()
    }
}

#[async_trait]
impl AuthProvider for Auth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, Error> {
        let url = self.get_auth_url("/signup");

        let mut body = json!({ "email": email, "password": password });
        if let Some(name) = display_name {
            body["data"] = json!({ "name": name });
        }

        let response = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .on_error(Error::auth)
            .json(&body)?
            .execute::<AuthResponse>()
            .await
            .map_err(|e| {
                error!("Error registering new user: {}", e);
                e
            })?;

        let identity = self.accept(response, email)?;
        info!("User created successfully: {}", identity.uid);
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, Error> {
        let url = self.get_auth_url("/token");

        let body = json!({ "email": email, "password": password });

        let response = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .query("grant_type", "password")
            .on_error(Error::auth)
            .json(&body)?
            .execute::<AuthResponse>()
            .await
            .map_err(|e| {
                error!("Error logging in: {}", e);
                e
            })?;

        let identity = self.accept(response, email)?;
        info!("User logged in successfully: {}", identity.uid);
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), Error> {
        let url = self.get_auth_url("/logout");

        let token = match self.session.get() {
            Some(session) => session.access_token,
            None => return Err(Error::auth("Not logged in")),
        };

        Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .bearer_auth(&token)
            .on_error(Error::auth)
            .execute_empty()
            .await
            .map_err(|e| {
                error!("Error signing out: {}", e);
                e
            })?;

        self.session.set(None);
        self.set_user(None);
        info!("User signed out successfully");
        Ok(())
    }

    fn current_user(&self) -> Option<Identity> {
        self.session.get()?;
        match self.user.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
