use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::message::{RealtimeMessage, EVENT_CHANGES, EVENT_CLOSE, EVENT_ERROR, EVENT_REPLY};
use super::{ChangeFeed, ChangeStream};
use crate::auth::SessionStore;
use crate::error::Error;
use crate::store::Collection;

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

fn encode(message: &RealtimeMessage) -> Result<Message, Error> {
    Ok(Message::Text(serde_json::to_string(message)?))
}

/// Client for the hosted realtime service.
///
/// Each watch opens its own socket, owned by the returned stream.
pub struct RealtimeClient {
    url: String,
    key: String,
    schema: String,
    heartbeat_interval: Duration,
    session: SessionStore,
    next_ref: AtomicU32,
}

impl RealtimeClient {
    /// Create a new RealtimeClient
    pub fn new(
        url: &str,
        key: &str,
        schema: &str,
        heartbeat_interval: Duration,
        session: SessionStore,
    ) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            schema: schema.to_string(),
            heartbeat_interval,
            session,
            next_ref: AtomicU32::new(1),
        }
    }

    /// Get the WebSocket URL for the realtime API
    pub fn get_url(&self) -> Result<Url, Error> {
        let mut url = Url::parse(&self.url)?.join("/realtime/v1/websocket")?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            s => return Err(Error::realtime(format!("Unsupported URL scheme: {}", s))),
        };
        url.set_scheme(scheme)
            .map_err(|_| Error::realtime("cannot switch URL scheme"))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }

    fn next_ref(&self) -> String {
        self.next_ref.fetch_add(1, Ordering::SeqCst).to_string()
    }

    fn topic(&self, collection: &Collection) -> String {
        format!("realtime:{}:{}", self.schema, collection.table())
    }

    /// Open a socket, join the collection's channel and stream its changes
    async fn subscribe(
        &self,
        collection: &Collection,
        matching: Option<(&str, &str)>,
    ) -> Result<ChangeStream, Error> {
        let ws_url = self.get_url()?;
        let topic = self.topic(collection);
        debug!("Connecting realtime socket for {}", topic);

        let (socket, _) = connect_async(ws_url.as_str()).await.map_err(|e| {
            error!("WebSocket connection failed: {}", e);
            Error::from(e)
        })?;
        let (mut write, mut read) = socket.split();

        let join_ref = self.next_ref();
        let token = self.session.access_token();
        let join = RealtimeMessage::join(
            &topic,
            &self.schema,
            collection,
            matching,
            token.as_deref(),
            join_ref.clone(),
        );
        write.send(encode(&join)?).await?;

        // Wait for the join to be acknowledged before handing out the stream
        let joined = timeout(JOIN_TIMEOUT, async {
            while let Some(frame) = read.next().await {
                let text = match frame? {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };
                let msg: RealtimeMessage = serde_json::from_str(&text)?;
                if msg.event == EVENT_REPLY
                    && msg.message_ref.as_deref() == Some(join_ref.as_str())
                {
                    return match msg.reply_status() {
                        Some("ok") => Ok(()),
                        status => Err(Error::realtime(format!(
                            "join of {} refused ({}): {}",
                            msg.topic,
                            status.unwrap_or("no status"),
                            msg.payload
                        ))),
                    };
                }
            }
            Err::<(), Error>(Error::realtime("socket closed before join was acknowledged"))
        })
        .await
        .map_err(|_| Error::realtime(format!("join of {} timed out", topic)))?;
        joined?;
        info!("Subscribed to {}", topic);

        let (tx, rx) = mpsc::unbounded_channel();
        let collection = collection.clone();
        let heartbeat_every = self.heartbeat_interval;
        let first_ref = self.next_ref.fetch_add(1000, Ordering::SeqCst);

        let task = tokio::spawn(async move {
            let mut heartbeat = interval(heartbeat_every);
            heartbeat.tick().await;
            let mut heartbeat_ref = first_ref;

            loop {
                tokio::select! {
                    frame = read.next() => {
                        let text = match frame {
                            Some(Ok(Message::Text(text))) => text,
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Realtime socket for {} closed by remote", topic);
                                break;
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                error!("Realtime read error on {}: {}", topic, e);
                                break;
                            }
                        };
                        let msg: RealtimeMessage = match serde_json::from_str(&text) {
                            Ok(msg) => msg,
                            Err(e) => {
                                warn!("Unparseable realtime message: {}. Raw: {}", e, text);
                                continue;
                            }
                        };
                        match msg.event.as_str() {
                            EVENT_CHANGES => {
                                if let Some(change) = msg.to_change(&collection) {
                                    trace!("{:?} on {}", change.kind, change.collection);
                                    if tx.send(change).is_err() {
                                        break;
                                    }
                                }
                            }
                            EVENT_ERROR | EVENT_CLOSE if msg.topic == topic => {
                                warn!("Channel {} closed: {}", topic, msg.payload);
                                break;
                            }
                            _ => trace!("Ignoring {} on {}", msg.event, msg.topic),
                        }
                    }
                    _ = heartbeat.tick() => {
                        heartbeat_ref += 1;
                        let beat = RealtimeMessage::heartbeat(heartbeat_ref.to_string());
                        let sent = match encode(&beat) {
                            Ok(frame) => write.send(frame).await.map_err(Error::from),
                            Err(e) => Err(e),
                        };
                        if let Err(e) = sent {
                            error!("Failed to send heartbeat on {}: {}", topic, e);
                            break;
                        }
                    }
                }
            }

            let _ = write.close().await;
            debug!("Realtime task for {} finished", topic);
        });

        Ok(ChangeStream::new(rx, Some(task)))
    }
}

#[async_trait]
impl ChangeFeed for RealtimeClient {
    async fn watch(&self, collection: &Collection) -> Result<ChangeStream, Error> {
        self.subscribe(collection, None).await
    }

    async fn watch_matching(
        &self,
        collection: &Collection,
        field: &str,
        value: &str,
    ) -> Result<ChangeStream, Error> {
        self.subscribe(collection, Some((field, value))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_url_switches_scheme() {
        let client = RealtimeClient::new(
            "https://project.example.test",
            "anon",
            "public",
            Duration::from_secs(30),
            SessionStore::new(),
        );
        let url = client.get_url().unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/realtime/v1/websocket");
        assert!(url.query().unwrap().contains("apikey=anon"));
        assert_eq!(client.topic(&Collection::Comments), "realtime:public:comments");
    }
}
