use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use super::{Collection, Direction, Document, DocumentStore, Fields, Query};
use crate::error::Error;
use crate::realtime::{ChangeEvent, ChangeFeed, ChangeKind, ChangeStream};

/// In-process document store.
///
/// Collections keep insertion order; every write is broadcast to the
/// watchers of its collection.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
        }
    }
}

/// Ordering of two field values; timestamps compare as instants
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => {
            match (a.parse::<DateTime<Utc>>(), b.parse::<DateTime<Utc>>()) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn publish(&self, collection: &Collection, kind: ChangeKind, id: &str, record: Option<Fields>) {
        // no receivers is fine
        let _ = self.changes.send(ChangeEvent {
            collection: collection.path(),
            kind,
            id: Some(id.to_string()),
            record,
        });
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(&self, collection: &Collection, query: &Query) -> Result<Vec<Document>, Error> {
        let guard = self.collections.read().await;
        let mut docs: Vec<Document> = guard
            .get(&collection.path())
            .map(|docs| docs.iter().filter(|d| query.matches(&d.fields)).cloned().collect())
            .unwrap_or_default();
        drop(guard);

        if let Some(order) = &query.order {
            // documents lacking the ordering field are left out
            docs.retain(|d| d.fields.contains_key(&order.field));
            docs.sort_by(|a, b| {
                let ord = compare_values(&a.fields[&order.field], &b.fields[&order.field]);
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    async fn get(&self, collection: &Collection, id: &str) -> Result<Option<Document>, Error> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection.path())
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn insert(&self, collection: &Collection, fields: Fields) -> Result<String, Error> {
        let id = Uuid::new_v4().simple().to_string();
        self.collections
            .write()
            .await
            .entry(collection.path())
            .or_default()
            .push(Document::new(&id, fields.clone()));

        self.publish(collection, ChangeKind::Insert, &id, Some(fields));
        Ok(id)
    }

    async fn set(&self, collection: &Collection, id: &str, fields: Fields) -> Result<(), Error> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.path()).or_default();
        let kind = match docs.iter_mut().find(|d| d.id == id) {
            Some(doc) => {
                doc.fields = fields.clone();
                ChangeKind::Update
            }
            None => {
                docs.push(Document::new(id, fields.clone()));
                ChangeKind::Insert
            }
        };
        drop(guard);

        self.publish(collection, kind, id, Some(fields));
        Ok(())
    }

    async fn update(&self, collection: &Collection, id: &str, patch: Fields) -> Result<(), Error> {
        let mut guard = self.collections.write().await;
        let doc = guard
            .get_mut(&collection.path())
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| Error::NotFound(format!("{}/{}", collection.path(), id)))?;
        doc.fields.extend(patch);
        let fields = doc.fields.clone();
        drop(guard);

        self.publish(collection, ChangeKind::Update, id, Some(fields));
        Ok(())
    }

    async fn delete(&self, collection: &Collection, id: &str) -> Result<(), Error> {
        let mut guard = self.collections.write().await;
        let removed = guard.get_mut(&collection.path()).and_then(|docs| {
            let index = docs.iter().position(|d| d.id == id)?;
            Some(docs.remove(index))
        });
        drop(guard);

        if let Some(doc) = removed {
            self.publish(collection, ChangeKind::Delete, id, Some(doc.fields));
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for MemoryStore {
    async fn watch(&self, collection: &Collection) -> Result<ChangeStream, Error> {
        let mut changes = self.changes.subscribe();
        let path = collection.path();
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(event) if event.collection == path => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // tell the watcher something changed so it refetches
                        log::warn!("Change watcher on {} lagged by {} events", path, missed);
                        let resync = ChangeEvent {
                            collection: path.clone(),
                            kind: ChangeKind::Update,
                            id: None,
                            record: None,
                        };
                        if tx.send(resync).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(ChangeStream::new(rx, Some(task)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn orders_timestamps_as_instants() {
        let store = MemoryStore::new();
        let c = Collection::Podcasts;
        let earlier = json!({ "title": "b", "createdAt": "2024-01-01T00:00:00Z" });
        store.insert(&c, fields(earlier)).await.unwrap();
        let later = json!({ "title": "a", "createdAt": "2024-01-01T00:00:00.500Z" });
        store.insert(&c, fields(later)).await.unwrap();
        store.insert(&c, fields(json!({ "title": "untimed" }))).await.unwrap();

        let docs = store
            .query(&c, &Query::new().order(super::super::Order::desc("createdAt")))
            .await
            .unwrap();
        let titles: Vec<_> = docs.iter().map(|d| d.fields["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store.update(&Collection::Users, "nobody", Fields::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        // delete stays idempotent
        store.delete(&Collection::Users, "nobody").await.unwrap();
    }

    #[tokio::test]
    async fn watchers_only_see_their_collection() {
        let store = MemoryStore::new();
        let mut stream = store.watch(&Collection::Comments).await.unwrap();

        store.insert(&Collection::Podcasts, Fields::new()).await.unwrap();
        let id = store
            .insert(&Collection::Comments, fields(json!({ "text": "hi" })))
            .await
            .unwrap();

        let event = stream.next().await.unwrap();
        assert_eq!(event.collection, "comments");
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.id, Some(id));
    }
}
