use uuid::Uuid;

/// Identifier of one game table.
pub type GameId = Uuid;

/// Opaque token representing one authenticated visitor for the lifetime of
/// their session. Never reused once revoked.
pub type Identity = Uuid;

/// The value carried by the `sid` cookie. Maps to at most one [`Identity`].
pub type SessionToken = Uuid;
