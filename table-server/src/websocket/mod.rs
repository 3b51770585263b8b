use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use warp::ws::{Message, WebSocket};

use table_types::Identity;

pub mod connection;

pub use connection::{ChannelHandle, ConnectionId, ConnectionRegistry};

/// Token bucket guarding the inbound side of a channel. Inbound payloads are
/// a no-op today, so the budget only has to stop floods.
struct InboundBudget {
    tokens: u32,
    max_tokens: u32,
    refill_interval: Duration,
    last_refill: Instant,
}

impl InboundBudget {
    fn new() -> Self {
        Self {
            tokens: 30,
            max_tokens: 30,
            refill_interval: Duration::from_secs(2),
            last_refill: Instant::now(),
        }
    }

    fn allow(&mut self) -> bool {
        let elapsed = self.last_refill.elapsed();
        if elapsed >= self.refill_interval {
            let refilled = (elapsed.as_secs() / self.refill_interval.as_secs()) as u32;
            self.tokens = (self.tokens + refilled).min(self.max_tokens);
            self.last_refill = Instant::now();
        }

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }
}

/// Pumps one upgraded websocket: binds it as the identity's live channel,
/// forwards queued events out, and drains (currently ignored) inbound
/// frames. Runs until either side closes, then removes the binding unless a
/// newer connection for the same identity already took it over.
pub async fn handle_connection(
    websocket: WebSocket,
    identity: Identity,
    connections: Arc<ConnectionRegistry>,
) {
    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (connection_id, mut events) = connections.bind(identity).await;
    info!("Channel {} open for identity {}", connection_id, identity);

    let incoming = async move {
        let mut budget = InboundBudget::new();

        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) => {
                    if msg.is_close() {
                        break;
                    }
                    if !budget.allow() {
                        // Dropping the frame is enough; only a failed
                        // upgrade may force a socket closed.
                        warn!("Inbound flood on channel {}, dropping frame", connection_id);
                        continue;
                    }
                    // Extension point: nothing consumes inbound payloads yet.
                    if let Ok(text) = msg.to_str() {
                        debug!("Ignoring message from identity {}: {}", identity, text);
                    }
                }
                Err(e) => {
                    warn!("WebSocket error on channel {}: {}", connection_id, e);
                    break;
                }
            }
        }
    };

    let outgoing = async move {
        while let Some(event) = events.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize event: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send on channel {}: {:?}", connection_id, e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming => {},
        _ = outgoing => {},
    }

    connections.unbind_if_current(identity, connection_id).await;
    info!("Channel {} closed for identity {}", connection_id, identity);
}
