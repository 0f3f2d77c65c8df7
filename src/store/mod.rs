//! Document store access: collections of schema-less JSON documents

mod memory;
mod rest;
mod types;

use async_trait::async_trait;

use crate::error::Error;

pub use memory::MemoryStore;
pub use rest::RestStore;
pub use types::*;

/// A hosted document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a query against a collection
    async fn query(&self, collection: &Collection, query: &Query) -> Result<Vec<Document>, Error>;

    /// Fetch one document by id
    async fn get(&self, collection: &Collection, id: &str) -> Result<Option<Document>, Error>;

    /// Add a document and return its assigned id
    async fn insert(&self, collection: &Collection, fields: Fields) -> Result<String, Error>;

    /// Create or overwrite the document with the given id
    async fn set(&self, collection: &Collection, id: &str, fields: Fields) -> Result<(), Error>;

    /// Merge fields into an existing document; fails with not-found when absent
    async fn update(&self, collection: &Collection, id: &str, patch: Fields) -> Result<(), Error>;

    /// Delete a document; deleting an absent id succeeds
    async fn delete(&self, collection: &Collection, id: &str) -> Result<(), Error>;
}
