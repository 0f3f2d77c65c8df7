//! Document store over a PostgREST-style REST API

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;

use super::{Collection, Document, DocumentStore, Fields, Query};
use crate::auth::SessionStore;
use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};

/// Client for table operations on the hosted database
pub struct RestStore {
    /// The base URL for the backend project
    url: String,

    /// The public API key for the backend project
    key: String,

    /// The database schema
    schema: String,

    /// HTTP client
    client: Client,

    /// The current session
    session: SessionStore,
}

/// Render a filter value the way the REST API expects it after `eq.`
fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl RestStore {
    /// Create a new RestStore
    pub fn new(url: &str, key: &str, schema: &str, client: Client, session: SessionStore) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            schema: schema.to_string(),
            client,
            session,
        }
    }

    /// Get the base URL for REST API requests
    fn get_url(&self, collection: &Collection) -> String {
        format!("{}/rest/v1/{}", self.url, collection.table())
    }

    fn prepare<'a>(&self, fetch: FetchBuilder<'a>, collection: &Collection) -> FetchBuilder<'a> {
        let fetch = fetch
            .authorize(&self.key, &self.session)
            .header("Accept-Profile", &self.schema)
            .header("Content-Profile", &self.schema)
            .on_error(Error::database);

        match collection.scope() {
            Some((column, value)) => fetch.query(column, &format!("eq.{}", value)),
            None => fetch,
        }
    }

    /// Add the scoping column to a body written into a subcollection
    fn scoped(collection: &Collection, mut fields: Fields) -> Fields {
        if let Some((column, value)) = collection.scope() {
            fields.insert(column.to_string(), Value::String(value.to_string()));
        }
        fields
    }

    /// Turn a returned row into a document, dropping the id and scope columns
    fn to_document(collection: &Collection, row: Value) -> Result<Document, Error> {
        let mut fields = match row {
            Value::Object(fields) => fields,
            other => return Err(Error::database(format!("unexpected row: {}", other))),
        };
        let id = match fields.remove("id") {
            Some(Value::String(id)) => id,
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(Error::database("row without an id column")),
        };
        if let Some((column, _)) = collection.scope() {
            fields.remove(column);
        }
        Ok(Document { id, fields })
    }
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn query(&self, collection: &Collection, query: &Query) -> Result<Vec<Document>, Error> {
        let url = self.get_url(collection);
        let mut fetch = self
            .prepare(Fetch::get(&self.client, &url), collection)
            .query("select", "*");

        for filter in &query.filters {
            fetch = fetch.query(&filter.field, &format!("eq.{}", filter_value(&filter.value)));
        }
        if let Some(order) = &query.order {
            fetch = fetch.query("order", &format!("{}.{}", order.field, order.direction.as_str()));
        }
        if let Some(limit) = query.limit {
            fetch = fetch.query("limit", &limit.to_string());
        }

        let rows = fetch.execute::<Vec<Value>>().await?;
        debug!("{} returned {} rows", collection.path(), rows.len());
        rows.into_iter()
            .map(|row| Self::to_document(collection, row))
            .collect()
    }

    async fn get(&self, collection: &Collection, id: &str) -> Result<Option<Document>, Error> {
        let url = self.get_url(collection);
        let rows = self
            .prepare(Fetch::get(&self.client, &url), collection)
            .query("select", "*")
            .query("id", &format!("eq.{}", id))
            .query("limit", "1")
            .execute::<Vec<Value>>()
            .await?;

        rows.into_iter()
            .next()
            .map(|row| Self::to_document(collection, row))
            .transpose()
    }

    async fn insert(&self, collection: &Collection, fields: Fields) -> Result<String, Error> {
        let url = self.get_url(collection);
        let body = Self::scoped(collection, fields);
        let rows = self
            .prepare(Fetch::post(&self.client, &url), collection)
            .header("Prefer", "return=representation")
            .json(&body)?
            .execute::<Vec<Value>>()
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::database("insert returned no representation"))?;
        Ok(Self::to_document(collection, row)?.id)
    }

    async fn set(&self, collection: &Collection, id: &str, fields: Fields) -> Result<(), Error> {
        let url = self.get_url(collection);
        let mut body = Self::scoped(collection, fields);
        body.insert("id".to_string(), Value::String(id.to_string()));

        let mut fetch = self
            .prepare(Fetch::post(&self.client, &url), collection)
            .header("Prefer", "resolution=merge-duplicates,return=minimal");
        // memberships are unique per user, not per id
        if let Some((column, _)) = collection.scope() {
            fetch = fetch.query("on_conflict", &format!("{},id", column));
        }
        fetch.json(&body)?.execute_empty().await
    }

    async fn update(&self, collection: &Collection, id: &str, patch: Fields) -> Result<(), Error> {
        let url = self.get_url(collection);
        let rows = self
            .prepare(Fetch::patch(&self.client, &url), collection)
            .query("id", &format!("eq.{}", id))
            .header("Prefer", "return=representation")
            .json(&patch)?
            .execute::<Vec<Value>>()
            .await?;

        if rows.is_empty() {
            return Err(Error::NotFound(format!("{}/{}", collection.path(), id)));
        }
        Ok(())
    }

    async fn delete(&self, collection: &Collection, id: &str) -> Result<(), Error> {
        let url = self.get_url(collection);
        self.prepare(Fetch::delete(&self.client, &url), collection)
            .query("id", &format!("eq.{}", id))
            .execute_empty()
            .await
    }
}
