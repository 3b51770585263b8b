use std::sync::Arc;

use tracing::warn;

use table_types::{GameId, ServerMessage};

use crate::game_registry::GameRegistry;
use crate::websocket::ConnectionRegistry;

/// Delivers one event to the live channel of every participant of a game.
pub struct NotificationFanout {
    games: Arc<GameRegistry>,
    connections: Arc<ConnectionRegistry>,
}

impl NotificationFanout {
    pub fn new(games: Arc<GameRegistry>, connections: Arc<ConnectionRegistry>) -> Self {
        Self { games, connections }
    }

    /// Fire-and-forget broadcast. Participants with no open channel are
    /// skipped silently; a full or closing channel is logged and skipped.
    /// No failure here aborts delivery to the remaining participants or
    /// surfaces to the action that triggered the broadcast.
    pub async fn broadcast(&self, game_id: GameId, event: ServerMessage) {
        // Snapshot the participant list under the registry lock, deliver
        // without it. A join or draw landing mid-broadcast is fine; it will
        // be covered by its own broadcast.
        let Some(participants) = self.games.participants(game_id).await else {
            warn!("Broadcast requested for unknown game {}", game_id);
            return;
        };

        for participant in participants {
            let Some(handle) = self.connections.lookup(participant.identity).await else {
                continue;
            };
            if let Err(reason) = handle.deliver(event.clone()) {
                warn!(
                    "Dropping event for identity {}: {}",
                    participant.identity, reason
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn fanout_fixture() -> (Arc<GameRegistry>, Arc<ConnectionRegistry>, NotificationFanout) {
        let games = Arc::new(GameRegistry::new());
        let connections = Arc::new(ConnectionRegistry::new(8));
        let fanout = NotificationFanout::new(games.clone(), connections.clone());
        (games, connections, fanout)
    }

    fn event_for(game_id: GameId) -> ServerMessage {
        ServerMessage::CardDrawn {
            game_id,
            cards_held: 1,
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_open_channel() {
        let (games, connections, fanout) = fanout_fixture();
        let game_id = games.create_game().await;

        let mut receivers = Vec::new();
        for _ in 0..3 {
            let identity = Uuid::new_v4();
            games.join(game_id, identity).await.unwrap();
            let (_, receiver) = connections.bind(identity).await;
            receivers.push(receiver);
        }

        fanout.broadcast(game_id, event_for(game_id)).await;

        for receiver in &mut receivers {
            let event = receiver.try_recv().expect("every channel hears the draw");
            assert!(matches!(event, ServerMessage::CardDrawn { .. }));
            // Exactly one event each.
            assert!(receiver.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_broadcast_skips_participants_without_channels() {
        let (games, connections, fanout) = fanout_fixture();
        let game_id = games.create_game().await;

        let connected = Uuid::new_v4();
        let offline = Uuid::new_v4();
        games.join(game_id, connected).await.unwrap();
        games.join(game_id, offline).await.unwrap();
        let (_, mut receiver) = connections.bind(connected).await;

        fanout.broadcast(game_id, event_for(game_id)).await;

        assert!(receiver.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_stalled_channel_does_not_block_the_rest() {
        let (games, connections, fanout) = fanout_fixture();
        let game_id = games.create_game().await;

        let stalled = Uuid::new_v4();
        let healthy = Uuid::new_v4();
        games.join(game_id, stalled).await.unwrap();
        games.join(game_id, healthy).await.unwrap();

        // Fill the stalled channel's buffer so the broadcast's enqueue
        // fails on it.
        let (_, _stalled_receiver) = connections.bind(stalled).await;
        let stalled_handle = connections.lookup(stalled).await.unwrap();
        for _ in 0..8 {
            stalled_handle.deliver(event_for(game_id)).unwrap();
        }

        let (_, mut healthy_receiver) = connections.bind(healthy).await;

        fanout.broadcast(game_id, event_for(game_id)).await;

        // The healthy participant still got its event even though the
        // stalled one's buffer rejected the enqueue.
        assert!(healthy_receiver.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_for_unknown_game_is_a_no_op() {
        let (_, _, fanout) = fanout_fixture();
        let missing = Uuid::new_v4();

        // Must not panic or deliver anything.
        fanout.broadcast(missing, event_for(missing)).await;
    }
}
