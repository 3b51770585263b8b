pub mod game;
pub mod table;

// Re-export main components
pub use game::*;
pub use table::*;
