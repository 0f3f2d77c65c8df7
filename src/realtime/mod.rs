//! Live change notifications for document collections

mod client;
mod message;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::store::{Collection, Fields};

pub use client::RealtimeClient;
pub use message::RealtimeMessage;

/// Kind of change applied to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One change to one document
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Path of the changed collection
    pub collection: String,

    /// What happened
    pub kind: ChangeKind,

    /// Id of the changed document, when the feed reports it
    pub id: Option<String>,

    /// The document after the change (before it, for deletes), when known
    pub record: Option<Fields>,
}

impl ChangeEvent {
    /// Whether the change may affect documents whose `field` equals `value`.
    ///
    /// Changes without a record (typical for deletes) may affect anything.
    pub fn may_touch(&self, field: &str, value: &str) -> bool {
        match &self.record {
            Some(record) => match record.get(field) {
                Some(serde_json::Value::String(v)) => v == value,
                Some(_) => false,
                None => true,
            },
            None => true,
        }
    }
}

/// A live stream of changes for one collection.
///
/// Dropping the stream stops the task feeding it and releases the
/// connection behind it.
pub struct ChangeStream {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl ChangeStream {
    /// Wrap a receiver fed by `task`
    pub fn new(rx: mpsc::UnboundedReceiver<ChangeEvent>, task: Option<JoinHandle<()>>) -> Self {
        Self { rx, task }
    }

    /// Wait for the next change; `None` once the feed has ended
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// A source of live change notifications
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Start watching a collection
    async fn watch(&self, collection: &Collection) -> Result<ChangeStream, Error>;

    /// Start watching the documents of a collection whose `field` equals `value`.
    ///
    /// Feeds that cannot filter at the source deliver every change of the
    /// collection, so consumers still check [`ChangeEvent::may_touch`].
    async fn watch_matching(
        &self,
        collection: &Collection,
        _field: &str,
        _value: &str,
    ) -> Result<ChangeStream, Error> {
        self.watch(collection).await
    }
}
