//! Configuration for the PodPulse client

use std::env;
use std::time::Duration;

use crate::error::Error;

/// Environment variable holding the backend base URL
pub const URL_VAR: &str = "PODPULSE_URL";
/// Environment variable holding the public API key
pub const KEY_VAR: &str = "PODPULSE_KEY";
/// Environment variable overriding the storage bucket
pub const BUCKET_VAR: &str = "PODPULSE_BUCKET";
/// Environment variable overriding the request timeout, in seconds
pub const TIMEOUT_VAR: &str = "PODPULSE_TIMEOUT_SECS";

/// Connection settings for the hosted backend.
///
/// Built once at process start and handed to [`crate::PodPulse::connect`].
#[derive(Debug, Clone)]
pub struct Config {
    /// The base URL for the backend project
    pub url: String,

    /// The public API key for the backend project
    pub key: String,

    /// Client options
    pub options: ClientOptions,
}

impl Config {
    /// Create a configuration with default options
    pub fn new(url: &str, key: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            options: ClientOptions::default(),
        }
    }

    /// Replace the client options
    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Read the configuration from `PODPULSE_*` environment variables
    pub fn from_env() -> Result<Self, Error> {
        let url = env::var(URL_VAR).map_err(|_| Error::Config(format!("{} must be set", URL_VAR)))?;
        let key = env::var(KEY_VAR).map_err(|_| Error::Config(format!("{} must be set", KEY_VAR)))?;

        let mut options = ClientOptions::default();
        if let Ok(bucket) = env::var(BUCKET_VAR) {
            options = options.with_storage_bucket(&bucket);
        }
        if let Ok(secs) = env::var(TIMEOUT_VAR) {
            let secs: u64 = secs
                .parse()
                .map_err(|_| {
                    Error::Config(format!("{} must be a number of seconds", TIMEOUT_VAR))
                })?;
            options = options.with_request_timeout(Some(Duration::from_secs(secs)));
        }

        Ok(Self::new(&url, &key).with_options(options))
    }
}

/// Configuration options for the PodPulse client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The database schema
    pub db_schema: String,

    /// The bucket holding podcast audio and images
    pub storage_bucket: String,

    /// Interval between realtime heartbeats
    pub heartbeat_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            db_schema: "public".to_string(),
            storage_bucket: "media".to_string(),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }

    /// Set the storage bucket
    pub fn with_storage_bucket(mut self, value: &str) -> Self {
        self.storage_bucket = value.to_string();
        self
    }

    /// Set the realtime heartbeat interval
    pub fn with_heartbeat_interval(mut self, value: Duration) -> Self {
        self.heartbeat_interval = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped() {
        let config = Config::new("https://example.test/", "anon");
        assert_eq!(config.url, "https://example.test");
        assert_eq!(config.options.storage_bucket, "media");
    }

    #[test]
    fn builder_overrides_defaults() {
        let options = ClientOptions::default()
            .with_storage_bucket("podcasts")
            .with_request_timeout(None)
            .with_db_schema("app");
        assert_eq!(options.storage_bucket, "podcasts");
        assert!(options.request_timeout.is_none());
        assert_eq!(options.db_schema, "app");
    }
}
