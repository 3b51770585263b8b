pub mod errors;
pub mod ids;
pub mod messages;

// Re-export all types
pub use errors::*;
pub use ids::*;
pub use messages::*;
