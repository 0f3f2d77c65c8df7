//! Server-side callable functions

mod make_admin;

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::SessionStore;
use crate::error::Error;
use crate::fetch::Fetch;

pub use make_admin::{make_user_admin, LocalFunctions, MAKE_USER_ADMIN};

/// Invokes named callable functions
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Call `name` with `data` and return its result
    async fn call(&self, name: &str, data: Value) -> Result<Value, Error>;
}

/// Client for the hosted callable functions
pub struct FunctionsClient {
    /// The base URL for the backend project
    url: String,

    /// The public API key for the backend project
    key: String,

    /// HTTP client
    client: Client,

    /// The current session; identifies the caller to the function
    session: SessionStore,
}

#[derive(Debug, Deserialize)]
struct CallableError {
    status: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CallableResponse {
    result: Option<Value>,
    error: Option<CallableError>,
}

impl FunctionsClient {
    /// Create a new FunctionsClient
    pub fn new(url: &str, key: &str, client: Client, session: SessionStore) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            client,
            session,
        }
    }

    /// Get the URL of a function
    fn get_url(&self, function_name: &str) -> String {
        format!("{}/functions/v1/{}", self.url, function_name)
    }
}

#[async_trait]
impl FunctionInvoker for FunctionsClient {
    async fn call(&self, name: &str, data: Value) -> Result<Value, Error> {
        let url = self.get_url(name);

        let response = Fetch::post(&self.client, &url)
            .authorize(&self.key, &self.session)
            .json(&json!({ "data": data }))?
            .execute_raw()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // Callable errors carry their own status code in the body
        let parsed: Option<CallableResponse> = serde_json::from_str(&text).ok();
        if let Some(CallableResponse { error: Some(err), .. }) = parsed {
            error!("Function {} failed: {} {}", name, err.status, err.message);
            return Err(Error::from_callable_status(&err.status, err.message));
        }
        if !status.is_success() {
            return Err(Error::from_status(status.as_u16(), &text, Error::Function));
        }

        match parsed {
            Some(CallableResponse { result: Some(result), .. }) => Ok(result),
            _ => Err(Error::function(format!("Function {} returned no result", name))),
        }
    }
}
