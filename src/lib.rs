//! PodPulse client core
//!
//! Catalog browsing, live comment threads, per-user favorites, accounts and
//! admin tools for a podcast discovery app. Persistence, auth, file storage
//! and change notifications are delegated to a hosted backend, reached
//! through the service traits in [`auth`], [`store`], [`storage`],
//! [`realtime`] and [`functions`].

pub mod access;
pub mod account;
pub mod admin;
pub mod auth;
pub mod catalog;
pub mod comments;
pub mod config;
pub mod error;
pub mod favorites;
pub mod fetch;
pub mod functions;
pub mod gateway;
pub mod generation;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod storage;
pub mod store;
pub mod tracked;

use std::sync::Arc;

use log::debug;
use reqwest::Client;

use crate::auth::{Auth, AuthProvider, Identity, MemoryAuth, SessionStore};
use crate::config::Config;
use crate::error::Error;
use crate::functions::{FunctionInvoker, FunctionsClient, LocalFunctions};
use crate::realtime::{ChangeFeed, RealtimeClient};
use crate::storage::{MemoryObjects, ObjectStore, StorageClient};
use crate::store::{DocumentStore, MemoryStore, RestStore};

/// Handle to the backend services; every operation takes one by reference.
///
/// Cloning is cheap and shares the underlying clients.
#[derive(Clone)]
pub struct PodPulse {
    config: Config,
    auth: Arc<dyn AuthProvider>,
    documents: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStore>,
    changes: Arc<dyn ChangeFeed>,
    functions: Arc<dyn FunctionInvoker>,
}

impl PodPulse {
    /// Connect to the hosted backend described by `config`
    ///
    /// # Example
    ///
    /// ```
    /// use podpulse::{config::Config, PodPulse};
    ///
    /// let config = Config::new("https://your-project.example.com", "your-anon-key");
    /// let app = PodPulse::connect(config).unwrap();
    /// assert!(app.current_user().is_none());
    /// ```
    pub fn connect(config: Config) -> Result<Self, Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;
        let session = SessionStore::new();
        let options = &config.options;

        let auth = Auth::new(&config.url, &config.key, http_client.clone(), session.clone());
        let documents = RestStore::new(
            &config.url,
            &config.key,
            &options.db_schema,
            http_client.clone(),
            session.clone(),
        );
        let storage = StorageClient::new(
            &config.url,
            &config.key,
            &options.storage_bucket,
            http_client.clone(),
            session.clone(),
        );
        let changes = RealtimeClient::new(
            &config.url,
            &config.key,
            &options.db_schema,
            options.heartbeat_interval,
            session.clone(),
        );
        let functions = FunctionsClient::new(&config.url, &config.key, http_client, session);

        debug!("Connected client for {}", config.url);
        Ok(Self {
            auth: Arc::new(auth),
            documents: Arc::new(documents),
            storage: Arc::new(storage),
            changes: Arc::new(changes),
            functions: Arc::new(functions),
            config,
        })
    }

    /// A self-contained backend living in this process
    ///
    /// # Example
    ///
    /// ```
    /// use podpulse::PodPulse;
    ///
    /// let app = PodPulse::in_memory();
    /// assert!(app.current_user().is_none());
    /// ```
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        let auth: Arc<dyn AuthProvider> = Arc::new(MemoryAuth::new());
        let functions = LocalFunctions::new(store.clone(), auth.clone());

        Self {
            config: Config::new("memory", ""),
            auth,
            documents: store.clone(),
            storage: Arc::new(MemoryObjects::new()),
            changes: store,
            functions: Arc::new(functions),
        }
    }

    /// Assemble a handle from individual service implementations
    pub fn from_parts(
        config: Config,
        auth: Arc<dyn AuthProvider>,
        documents: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStore>,
        changes: Arc<dyn ChangeFeed>,
        functions: Arc<dyn FunctionInvoker>,
    ) -> Self {
        Self {
            config,
            auth,
            documents,
            storage,
            changes,
            functions,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    pub fn documents(&self) -> &dyn DocumentStore {
        self.documents.as_ref()
    }

    pub fn storage(&self) -> &dyn ObjectStore {
        self.storage.as_ref()
    }

    pub fn changes(&self) -> &dyn ChangeFeed {
        self.changes.as_ref()
    }

    pub fn functions(&self) -> &dyn FunctionInvoker {
        self.functions.as_ref()
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<Identity> {
        self.auth.current_user()
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::access::AdminStatus;
    pub use crate::auth::Identity;
    pub use crate::catalog::{CategoryFilter, PodcastList};
    pub use crate::comments::{CommentSort, CommentThread};
    pub use crate::config::{ClientOptions, Config};
    pub use crate::error::Error;
    pub use crate::favorites::FavoriteToggle;
    pub use crate::gateway::PodcastSort;
    pub use crate::models::{Comment, Podcast, PodcastCategory, UserProfile};
    pub use crate::routes::Route;
    pub use crate::storage::Upload;
    pub use crate::PodPulse;
}
