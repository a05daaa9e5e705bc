//! Insert notifications over the Supabase realtime websocket.
//!
//! The server speaks the Phoenix channel protocol: join a topic with a
//! `postgres_changes` config, send a heartbeat every 25 seconds, and receive
//! one `postgres_changes` frame per matching row.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::backend::supabase::SupabaseClient;
use crate::backend::traits::ChangeFeed;
use crate::backend::types::Subscription;
use crate::error::{Result, SooqError};
use crate::models::Listing;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const TOPIC: &str = "realtime:public:products";

#[derive(Debug, Serialize, Deserialize)]
struct PhoenixMessage {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
    #[serde(rename = "ref", default)]
    reference: Option<String>,
}

impl SupabaseClient {
    fn realtime_url(&self) -> String {
        let socket_base = if let Some(host) = self.base_url.strip_prefix("https://") {
            format!("wss://{host}")
        } else if let Some(host) = self.base_url.strip_prefix("http://") {
            format!("ws://{host}")
        } else {
            self.base_url.clone()
        };
        format!(
            "{socket_base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            self.anon_key
        )
    }
}

fn join_message(category: Option<&str>, access_token: &str) -> PhoenixMessage {
    let mut change = json!({
        "event": "INSERT",
        "schema": "public",
        "table": "products",
    });
    if let Some(category) = category {
        change["filter"] = json!(format!("category=eq.{category}"));
    }

    PhoenixMessage {
        topic: TOPIC.to_string(),
        event: "phx_join".to_string(),
        payload: json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [change],
            },
            "access_token": access_token,
        }),
        reference: Some("1".to_string()),
    }
}

fn heartbeat(reference: u64) -> PhoenixMessage {
    PhoenixMessage {
        topic: "phoenix".to_string(),
        event: "heartbeat".to_string(),
        payload: json!({}),
        reference: Some(reference.to_string()),
    }
}

/// The row carried by an INSERT `postgres_changes` frame
fn inserted_listing(frame: &str) -> Option<Listing> {
    let message: PhoenixMessage = serde_json::from_str(frame).ok()?;
    if message.event != "postgres_changes" {
        return None;
    }
    let data = message.payload.get("data")?;
    if data.get("type").and_then(Value::as_str) != Some("INSERT") {
        return None;
    }
    match serde_json::from_value(data.get("record")?.clone()) {
        Ok(listing) => Some(listing),
        Err(err) => {
            warn!(error = %err, "Dropping malformed realtime record");
            None
        }
    }
}

fn log_control_frame(frame: &str) {
    let Ok(message) = serde_json::from_str::<PhoenixMessage>(frame) else {
        debug!("Ignoring non-JSON realtime frame");
        return;
    };
    let status = message.payload.get("status").and_then(Value::as_str);
    match (message.event.as_str(), status) {
        ("phx_reply", Some("error")) | ("phx_error", _) => {
            warn!(topic = %message.topic, payload = %message.payload, "Realtime channel rejected");
        }
        ("phx_reply", Some("ok")) if message.reference.as_deref() == Some("1") => {
            info!(topic = %message.topic, "Joined realtime channel");
        }
        (event, _) => debug!(event, "Realtime control frame"),
    }
}

#[async_trait]
impl ChangeFeed for SupabaseClient {
    async fn subscribe_inserts(&self, category: Option<&str>) -> Result<Subscription> {
        let url = self.realtime_url();
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| SooqError::Realtime(format!("connect failed: {e}")))?;
        let (mut sink, mut stream) = socket.split();

        let join = serde_json::to_string(&join_message(category, &self.bearer()))?;
        sink.send(Message::Text(join))
            .await
            .map_err(|e| SooqError::Realtime(format!("join failed: {e}")))?;
        debug!(?category, "Requested realtime join");

        let (tx, rx) = mpsc::channel(32);
        let worker = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
            ticker.tick().await;
            let mut next_ref: u64 = 2;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Ok(text) = serde_json::to_string(&heartbeat(next_ref)) else {
                            continue;
                        };
                        next_ref += 1;
                        if let Err(err) = sink.send(Message::Text(text)).await {
                            warn!(error = %err, "Realtime heartbeat failed");
                            break;
                        }
                    }
                    frame = stream.next() => match frame {
                        Some(Ok(Message::Text(text))) => match inserted_listing(&text) {
                            Some(listing) => {
                                if tx.send(listing).await.is_err() {
                                    break;
                                }
                            }
                            None => log_control_frame(&text),
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Realtime channel closed");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!(error = %err, "Realtime channel error");
                            break;
                        }
                    },
                }
            }
        });

        Ok(Subscription::new(rx, worker))
    }
}
