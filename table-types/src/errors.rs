use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::GameId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, Error)]
#[ts(export)]
pub enum GameError {
    #[error("game {game_id} does not exist")]
    GameNotFound { game_id: GameId },
    #[error("you can only be in one game")]
    AlreadyInAGame,
    #[error("you are not a participant of that game")]
    NotAParticipant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, Error)]
#[ts(export)]
pub enum SessionError {
    #[error("already logged in")]
    AlreadyAuthenticated,
    #[error("authentication required")]
    Unauthenticated,
}
