use table_core::GameTable;
use table_types::Identity;
use uuid::Uuid;

pub fn create_test_identity() -> Identity {
    Uuid::new_v4()
}

/// A table with one game and the given identities already joined.
pub fn create_populated_table(identities: &[Identity]) -> (GameTable, table_types::GameId) {
    let mut table = GameTable::new();
    let game_id = table.create_game();
    for &identity in identities {
        table.join(game_id, identity).expect("join should succeed");
    }
    (table, game_id)
}
