//! Effects produced by state transitions

use crate::state_machine::state::{NegotiationStatus, Offer, Split};

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the automated counterpart to answer the player's proposal
    ConsultCounterpart { proposal: Split },

    /// The negotiation reached a terminal state
    NotifySettled {
        status: NegotiationStatus,
        settlement: Offer,
    },
}

impl Effect {
    pub fn consult(proposal: Split) -> Self {
        Effect::ConsultCounterpart { proposal }
    }

    pub fn accepted(settlement: Offer) -> Self {
        Effect::NotifySettled {
            status: NegotiationStatus::Accepted,
            settlement,
        }
    }

    pub fn exhausted(settlement: Offer) -> Self {
        Effect::NotifySettled {
            status: NegotiationStatus::RoundsExhausted,
            settlement,
        }
    }
}
