use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ChangeEvent, ChangeKind};
use crate::store::Collection;

pub(crate) const EVENT_JOIN: &str = "phx_join";
pub(crate) const EVENT_REPLY: &str = "phx_reply";
pub(crate) const EVENT_ERROR: &str = "phx_error";
pub(crate) const EVENT_CLOSE: &str = "phx_close";
pub(crate) const EVENT_HEARTBEAT: &str = "heartbeat";
pub(crate) const EVENT_CHANGES: &str = "postgres_changes";

/// A full message received or sent over the WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeMessage {
    pub topic: String,
    pub event: String,
    pub payload: Value,
    #[serde(rename = "ref")]
    pub message_ref: Option<String>,
}

impl RealtimeMessage {
    /// Join request for the changes of one collection, optionally narrowed
    /// to rows whose `field` equals `value`.
    ///
    /// Subcollections are always narrowed to their scope instead.
    pub(crate) fn join(
        topic: &str,
        schema: &str,
        collection: &Collection,
        matching: Option<(&str, &str)>,
        access_token: Option<&str>,
        message_ref: String,
    ) -> Self {
        let change = |event: &str, filter: Option<String>| {
            let mut change = json!({
                "event": event,
                "schema": schema,
                "table": collection.table(),
            });
            if let Some(filter) = filter {
                change["filter"] = json!(filter);
            }
            change
        };
        let changes = match (collection.scope(), matching) {
            (Some((column, value)), _) => {
                vec![change("*", Some(format!("{}=eq.{}", column, value)))]
            }
            (None, Some((field, value))) => {
                let filter = format!("{}=eq.{}", field, value);
                // deletes cannot be filtered at the source
                vec![
                    change("INSERT", Some(filter.clone())),
                    change("UPDATE", Some(filter)),
                    change("DELETE", None),
                ]
            }
            (None, None) => vec![change("*", None)],
        };

        let mut payload = json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": changes,
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = json!(token);
        }

        Self {
            topic: topic.to_string(),
            event: EVENT_JOIN.to_string(),
            payload,
            message_ref: Some(message_ref),
        }
    }

    pub(crate) fn heartbeat(message_ref: String) -> Self {
        Self {
            topic: "phoenix".to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: json!({}),
            message_ref: Some(message_ref),
        }
    }

    /// Status of a `phx_reply` (`ok` or `error`)
    pub(crate) fn reply_status(&self) -> Option<&str> {
        self.payload.get("status").and_then(Value::as_str)
    }

    /// Decode a `postgres_changes` payload
    pub(crate) fn to_change(&self, collection: &Collection) -> Option<ChangeEvent> {
        let data = self.payload.get("data")?;
        let kind: ChangeKind = serde_json::from_value(data.get("type")?.clone()).ok()?;

        let record = match kind {
            ChangeKind::Delete => data.get("old_record"),
            _ => data.get("record"),
        }
        .and_then(Value::as_object)
        .cloned();

        let id = record.as_ref().and_then(|r| match r.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        });

        Some(ChangeEvent {
            collection: collection.path(),
            kind,
            id,
            record,
        })
    }
}
