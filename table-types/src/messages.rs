use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::GameId;

/// Events pushed to clients over their websocket channel.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    /// A participant of `game_id` drew a card. `cards_held` is the drawer's
    /// updated hand size.
    CardDrawn { game_id: GameId, cards_held: u32 },
}
