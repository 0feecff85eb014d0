//! Events that can occur in a negotiation

use crate::policy::Decision;
use uuid::Uuid;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Lifecycle events
    /// Begin a new game. The id is minted by the caller so the transition stays pure.
    Start { game_id: Uuid },
    Reset,

    // Player events
    PlayerPropose { player_share: u32 },
    PlayerAccept,

    // Counterpart events
    CounterpartDecision { decision: Decision },
}
