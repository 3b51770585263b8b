use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use table_types::{GameError, GameId, Identity};

use crate::game::{Game, Participant};

/// All game state, owned in one place. Not thread-safe by itself; the server
/// wraps it in a single lock so that the membership check and the participant
/// append in [`GameTable::join`] stay one atomic step.
///
/// `membership` is a reverse index (identity -> game) kept in sync with
/// `games` on every join. An identity may appear in at most one game, so the
/// index doubles as the cross-game membership check.
#[derive(Debug, Default)]
pub struct GameTable {
    games: HashMap<GameId, Game>,
    membership: HashMap<Identity, GameId>,
}

impl GameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new empty game and returns its identifier. Always
    /// succeeds.
    pub fn create_game(&mut self) -> GameId {
        let game_id = Uuid::new_v4();
        self.games.insert(game_id, Game::new(game_id));
        debug!("created game {}", game_id);
        game_id
    }

    /// Snapshot of a game's participants, or `None` if the game is unknown.
    pub fn participants(&self, game_id: GameId) -> Option<&[Participant]> {
        self.games.get(&game_id).map(|g| g.participants.as_slice())
    }

    pub fn is_member_of_any_game(&self, identity: Identity) -> bool {
        self.membership.contains_key(&identity)
    }

    pub fn member_game(&self, identity: Identity) -> Option<GameId> {
        self.membership.get(&identity).copied()
    }

    /// Adds `identity` to the game. The caller must hold exclusive access to
    /// the whole table: the cross-game membership check and the append below
    /// are one critical section.
    pub fn join(&mut self, game_id: GameId, identity: Identity) -> Result<(), GameError> {
        let game = self
            .games
            .get_mut(&game_id)
            .ok_or(GameError::GameNotFound { game_id })?;

        if self.membership.contains_key(&identity) {
            return Err(GameError::AlreadyInAGame);
        }

        game.participants.push(Participant::new(identity));
        self.membership.insert(identity, game_id);
        debug!("identity {} joined game {}", identity, game_id);
        Ok(())
    }

    /// Records one card draw and returns the drawer's updated hand size.
    pub fn record_draw(&mut self, game_id: GameId, identity: Identity) -> Result<usize, GameError> {
        let game = self
            .games
            .get_mut(&game_id)
            .ok_or(GameError::GameNotFound { game_id })?;

        game.draw(identity)
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }
}
