//! Pure state transition function
//!
//! Given the same snapshot, context and event this always produces the
//! same result. Random draws and delays live with the caller, who runs
//! the returned effects.

use super::state::{
    Agent, HistoryEntry, HistoryKind, NegotiationContext, NegotiationSnapshot, NegotiationState,
    Offer, Split,
};
use super::{Effect, Event};
use crate::policy::Decision;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_snapshot: NegotiationSnapshot,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(snapshot: NegotiationSnapshot) -> Self {
        Self {
            new_snapshot: snapshot,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition. None of them change the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Invalid proposal: share {share} is outside 0..={total}")]
    InvalidProposal { share: u32, total: u32 },
    #[error("It is not the player's turn")]
    NotPlayersTurn,
    #[error("There is no counterpart offer to accept")]
    NoOfferToAccept,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    snapshot: &NegotiationSnapshot,
    context: &NegotiationContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (&snapshot.state, event) {
        // ============================================================
        // Lifecycle
        // ============================================================

        // Start from anywhere re-initialises the game
        (_, Event::Start { game_id }) => Ok(TransitionResult::new(NegotiationSnapshot::started(
            context, game_id,
        ))),

        (_, Event::Reset) => Ok(TransitionResult::new(NegotiationSnapshot::initial(context))),

        // ============================================================
        // Player Proposals
        // ============================================================

        // AwaitingPlayer + PlayerPropose -> AwaitingCounterpart
        (NegotiationState::AwaitingPlayer { .. }, Event::PlayerPropose { player_share }) => {
            let total = snapshot.total_resources;
            let proposal = Split::from_player_share(player_share, total)
                .ok_or(TransitionError::InvalidProposal {
                    share: player_share,
                    total,
                })?;

            let mut next = snapshot.clone();
            next.state = NegotiationState::AwaitingCounterpart { proposal };
            next.history.push(HistoryEntry::new(
                snapshot.current_round,
                Agent::Player,
                HistoryKind::Offered { split: proposal },
            ));

            Ok(TransitionResult::new(next).with_effect(Effect::consult(proposal)))
        }

        (_, Event::PlayerPropose { .. }) => Err(TransitionError::NotPlayersTurn),

        // ============================================================
        // Player Acceptance
        // ============================================================

        // AwaitingPlayer (counterpart offer on the table) + PlayerAccept -> Accepted
        (
            NegotiationState::AwaitingPlayer {
                last_offer: Some(offer),
            },
            Event::PlayerAccept,
        ) if offer.by == Agent::Counterpart => {
            let settlement = *offer;
            let mut next = snapshot.clone();
            next.state = NegotiationState::Accepted { settlement };
            next.history.push(HistoryEntry::new(
                snapshot.current_round,
                Agent::Player,
                HistoryKind::Accepted {
                    split: settlement.split,
                },
            ));

            Ok(TransitionResult::new(next).with_effect(Effect::accepted(settlement)))
        }

        // No counterpart offer pending: before start, mid-decision, or settled
        (_, Event::PlayerAccept) => Err(TransitionError::NoOfferToAccept),

        // ============================================================
        // Counterpart Decisions
        // ============================================================

        // AwaitingCounterpart + Accept -> Accepted (player's proposal stands)
        (
            NegotiationState::AwaitingCounterpart { proposal },
            Event::CounterpartDecision {
                decision: Decision::Accept,
            },
        ) => {
            let settlement = Offer::new(Agent::Player, *proposal);
            let mut next = snapshot.clone();
            next.state = NegotiationState::Accepted { settlement };
            next.history.push(HistoryEntry::new(
                snapshot.current_round,
                Agent::Counterpart,
                HistoryKind::Accepted { split: *proposal },
            ));

            Ok(TransitionResult::new(next).with_effect(Effect::accepted(settlement)))
        }

        // AwaitingCounterpart + Counter -> AwaitingPlayer (next round) or RoundsExhausted
        (
            NegotiationState::AwaitingCounterpart { .. },
            Event::CounterpartDecision {
                decision: Decision::Counter(counter),
            },
        ) => {
            if !counter.divides(snapshot.total_resources) {
                return Err(TransitionError::InvalidTransition(format!(
                    "counter-proposal {}/{} does not divide {}",
                    counter.player, counter.counterpart, snapshot.total_resources
                )));
            }

            let offer = Offer::new(Agent::Counterpart, counter);
            let mut next = snapshot.clone();
            next.history.push(HistoryEntry::new(
                snapshot.current_round,
                Agent::Counterpart,
                HistoryKind::Offered { split: counter },
            ));
            next.current_round = snapshot.current_round.saturating_add(1);

            if next.current_round > snapshot.max_rounds {
                next.state = NegotiationState::RoundsExhausted { settlement: offer };
                next.history.push(HistoryEntry::new(
                    next.current_round,
                    Agent::Counterpart,
                    HistoryKind::RoundsExhausted { split: counter },
                ));
                Ok(TransitionResult::new(next).with_effect(Effect::exhausted(offer)))
            } else {
                next.state = NegotiationState::AwaitingPlayer {
                    last_offer: Some(offer),
                };
                Ok(TransitionResult::new(next))
            }
        }

        (state, Event::CounterpartDecision { decision }) => {
            Err(TransitionError::InvalidTransition(format!(
                "No transition from {state:?} with counterpart decision {decision:?}"
            )))
        }
    }
}
