//! Object storage for podcast audio and images

mod types;

use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;
use reqwest::{multipart, Client};
use tokio::sync::Mutex;

use crate::auth::SessionStore;
use crate::error::Error;
use crate::fetch::Fetch;

pub use types::*;

/// A path-addressed blob store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a file to `path` and return its public URL
    async fn upload(&self, path: &str, upload: &Upload) -> Result<String, Error>;

    /// Remove the file at `path`
    async fn remove(&self, path: &str) -> Result<(), Error>;
}

/// Client for one bucket of the hosted storage service
pub struct StorageClient {
    /// The base URL for the backend project
    url: String,

    /// The public API key for the backend project
    key: String,

    /// The bucket ID
    bucket_id: String,

    /// HTTP client used for requests
    client: Client,

    /// The current session
    session: SessionStore,
}

impl StorageClient {
    /// Create a new StorageClient
    pub fn new(
        url: &str,
        key: &str,
        bucket_id: &str,
        client: Client,
        session: SessionStore,
    ) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            bucket_id: bucket_id.to_string(),
            client,
            session,
        }
    }

    /// Get the base URL for storage operations
    fn get_url(&self, path: &str) -> String {
        format!("{}/storage/v1{}", self.url, path)
    }

    /// Get the public URL for a file
    pub fn get_public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.url, self.bucket_id, path)
    }
}

#[async_trait]
impl ObjectStore for StorageClient {
    async fn upload(&self, path: &str, upload: &Upload) -> Result<String, Error> {
        let url = self.get_url(&format!("/object/{}/{}", self.bucket_id, path));

        let mut part =
            multipart::Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
        if let Some(content_type) = &upload.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = multipart::Form::new().part("file", part);

        let token = self.session.access_token().unwrap_or_else(|| self.key.clone());
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", token))
            .header("Cache-Control", "3600")
            .header("x-upsert", "false")
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status, &text, Error::Storage));
        }

        debug!("File uploaded successfully to {}", path);
        Ok(self.get_public_url(path))
    }

    async fn remove(&self, path: &str) -> Result<(), Error> {
        let url = self.get_url(&format!("/object/{}", self.bucket_id));

        let body = serde_json::json!({ "prefixes": [path] });

        Fetch::delete(&self.client, &url)
            .authorize(&self.key, &self.session)
            .on_error(Error::Storage)
            .json(&body)?
            .execute_empty()
            .await
    }
}

/// In-process object store; URLs use the `memory://` scheme
#[derive(Default)]
pub struct MemoryObjects {
    files: Mutex<HashMap<String, Upload>>,
}

impl MemoryObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths currently stored
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.files.lock().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Contents stored at `path`
    pub async fn get(&self, path: &str) -> Option<Upload> {
        self.files.lock().await.get(path).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn upload(&self, path: &str, upload: &Upload) -> Result<String, Error> {
        let mut files = self.files.lock().await;
        if files.contains_key(path) {
            return Err(Error::storage(format!("{} already exists", path)));
        }
        files.insert(path.to_string(), upload.clone());
        Ok(format!("memory://{}", path))
    }

    async fn remove(&self, path: &str) -> Result<(), Error> {
        self.files.lock().await.remove(path);
        Ok(())
    }
}
