use table_types::{GameError, GameId, Identity};
use uuid::Uuid;

/// Token minted for each drawn card. The game has no rules beyond drawing,
/// so the token carries no rank or suit.
pub type CardToken = Uuid;

/// One identity's record inside a single game.
#[derive(Debug, Clone)]
pub struct Participant {
    pub identity: Identity,
    pub cards: Vec<CardToken>,
}

impl Participant {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            cards: Vec::new(),
        }
    }

    pub fn cards_held(&self) -> usize {
        self.cards.len()
    }
}

/// A single game: an ordered list of participants. Games start empty and are
/// never destroyed.
#[derive(Debug)]
pub struct Game {
    pub id: GameId,
    pub participants: Vec<Participant>,
}

impl Game {
    pub fn new(id: GameId) -> Self {
        Self {
            id,
            participants: Vec::new(),
        }
    }

    pub fn participant(&self, identity: Identity) -> Option<&Participant> {
        self.participants.iter().find(|p| p.identity == identity)
    }

    pub fn is_participant(&self, identity: Identity) -> bool {
        self.participant(identity).is_some()
    }

    /// Appends one card token to the identity's hand and returns the updated
    /// hand size.
    pub fn draw(&mut self, identity: Identity) -> Result<usize, GameError> {
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.identity == identity)
            .ok_or(GameError::NotAParticipant)?;

        participant.cards.push(Uuid::new_v4());
        Ok(participant.cards.len())
    }
}
