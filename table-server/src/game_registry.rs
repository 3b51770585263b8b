use tokio::sync::RwLock;

use table_core::{GameTable, Participant};
use table_types::{GameError, GameId, Identity};

/// All game state behind a single lock.
///
/// The cross-game membership check in `join` spans every game, so the lock
/// has to cover the whole table for check-then-append to be atomic. Draws
/// are serialized by the same lock.
#[derive(Default)]
pub struct GameRegistry {
    table: RwLock<GameTable>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(GameTable::new()),
        }
    }

    pub async fn create_game(&self) -> GameId {
        self.table.write().await.create_game()
    }

    /// Snapshot of a game's participants, taken under the read lock so a
    /// broadcast can iterate it without holding the registry.
    pub async fn participants(&self, game_id: GameId) -> Option<Vec<Participant>> {
        self.table
            .read()
            .await
            .participants(game_id)
            .map(<[Participant]>::to_vec)
    }

    pub async fn is_member_of_any_game(&self, identity: Identity) -> bool {
        self.table.read().await.is_member_of_any_game(identity)
    }

    pub async fn join(&self, game_id: GameId, identity: Identity) -> Result<(), GameError> {
        self.table.write().await.join(game_id, identity)
    }

    pub async fn record_draw(
        &self,
        game_id: GameId,
        identity: Identity,
    ) -> Result<usize, GameError> {
        self.table.write().await.record_draw(game_id, identity)
    }

    pub async fn game_count(&self) -> usize {
        self.table.read().await.game_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_concurrent_joins_for_one_identity_admit_exactly_one() {
        // Two games, one brand-new identity, two simultaneous joins: the
        // registry must admit exactly one of them.
        let registry = Arc::new(GameRegistry::new());
        let game_a = registry.create_game().await;
        let game_b = registry.create_game().await;
        let identity = Uuid::new_v4();

        let join_a = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.join(game_a, identity).await })
        };
        let join_b = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.join(game_b, identity).await })
        };

        let results = [join_a.await.unwrap(), join_b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(GameError::AlreadyInAGame)))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);

        // Exactly one game gained the participant.
        let in_a = registry.participants(game_a).await.unwrap().len();
        let in_b = registry.participants(game_b).await.unwrap().len();
        assert_eq!(in_a + in_b, 1);
    }

    #[tokio::test]
    async fn test_concurrent_draws_are_all_counted() {
        let registry = Arc::new(GameRegistry::new());
        let game_id = registry.create_game().await;
        let identity = Uuid::new_v4();
        registry.join(game_id, identity).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.record_draw(game_id, identity).await.unwrap()
            }));
        }

        let mut counts = Vec::new();
        for handle in handles {
            counts.push(handle.await.unwrap());
        }

        // Every draw landed, and the returned counts are all distinct
        // because each append ran under the exclusive lock.
        counts.sort_unstable();
        assert_eq!(counts, (1..=20).collect::<Vec<_>>());

        let participants = registry.participants(game_id).await.unwrap();
        assert_eq!(participants[0].cards_held(), 20);
    }

    #[tokio::test]
    async fn test_failed_join_does_not_mutate_registry() {
        let registry = GameRegistry::new();
        let missing = Uuid::new_v4();
        let identity = Uuid::new_v4();

        let result = registry.join(missing, identity).await;

        assert_eq!(result, Err(GameError::GameNotFound { game_id: missing }));
        assert_eq!(registry.game_count().await, 0);
        assert!(!registry.is_member_of_any_game(identity).await);
    }
}
