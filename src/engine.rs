//! Synchronous negotiation engine
//!
//! Owns the current snapshot and the counterpart's bonus source. Every
//! command is folded through [`transition`]; effects are run in place and
//! any event they produce is fed straight back in, so a proposal and the
//! counterpart's answer land as one snapshot.

use crate::config::{ConfigError, NegotiationConfig};
use crate::policy::{BonusSource, CounterpartPolicy, ThreadRngBonus};
use crate::state_machine::{
    transition, Effect, Event, NegotiationContext, NegotiationSnapshot, TransitionError,
};
use uuid::Uuid;

pub struct NegotiationEngine<B: BonusSource = ThreadRngBonus> {
    context: NegotiationContext,
    policy: CounterpartPolicy,
    bonus: B,
    snapshot: NegotiationSnapshot,
}

impl NegotiationEngine<ThreadRngBonus> {
    /// Engine with the production bonus source
    pub fn new(config: &NegotiationConfig) -> Result<Self, ConfigError> {
        Self::with_bonus_source(config, ThreadRngBonus)
    }
}

impl<B: BonusSource> NegotiationEngine<B> {
    /// Fails if `config` does not pass [`NegotiationConfig::validate`]
    pub fn with_bonus_source(config: &NegotiationConfig, bonus: B) -> Result<Self, ConfigError> {
        config.validate()?;
        let context = config.context();
        Ok(Self {
            context,
            policy: config.policy(),
            bonus,
            snapshot: NegotiationSnapshot::initial(&context),
        })
    }

    /// Current snapshot
    pub fn snapshot(&self) -> &NegotiationSnapshot {
        &self.snapshot
    }

    /// Start (or restart) a game
    pub fn start(&mut self) -> NegotiationSnapshot {
        let snapshot = NegotiationSnapshot::started(&self.context, Uuid::new_v4());
        self.commit(snapshot.clone());
        snapshot
    }

    /// Player keeps `player_share`; the counterpart answers immediately
    pub fn propose(&mut self, player_share: u32) -> Result<NegotiationSnapshot, TransitionError> {
        self.apply(Event::PlayerPropose { player_share })
    }

    /// Player takes the counterpart's standing offer
    pub fn accept_current_offer(&mut self) -> Result<NegotiationSnapshot, TransitionError> {
        self.apply(Event::PlayerAccept)
    }

    /// Discard everything and return to the default snapshot
    pub fn reset(&mut self) -> NegotiationSnapshot {
        let snapshot = NegotiationSnapshot::initial(&self.context);
        self.commit(snapshot.clone());
        snapshot
    }

    /// Evaluate and commit in one step
    pub(crate) fn apply(&mut self, event: Event) -> Result<NegotiationSnapshot, TransitionError> {
        let next = self.evaluate(event)?;
        self.commit(next.clone());
        Ok(next)
    }

    /// Compute the snapshot `event` leads to without publishing it.
    ///
    /// Runs effects to completion. On error nothing is retained.
    pub(crate) fn evaluate(&mut self, event: Event) -> Result<NegotiationSnapshot, TransitionError> {
        let mut snapshot = self.snapshot.clone();
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let result = match transition(&snapshot, &self.context, current_event) {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!(
                        game_id = ?self.snapshot.game_id,
                        round = self.snapshot.current_round,
                        error = %e,
                        "Command rejected"
                    );
                    return Err(e);
                }
            };
            snapshot = result.new_snapshot;

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(&snapshot, effect) {
                    events_to_process.push(generated_event);
                }
            }
        }

        Ok(snapshot)
    }

    /// Replace the published snapshot wholesale
    pub(crate) fn commit(&mut self, snapshot: NegotiationSnapshot) {
        if snapshot.game_id != self.snapshot.game_id {
            tracing::info!(
                game_id = ?snapshot.game_id,
                status = ?snapshot.status(),
                "Negotiation (re)initialised"
            );
        }
        self.snapshot = snapshot;
    }

    fn execute_effect(&mut self, snapshot: &NegotiationSnapshot, effect: Effect) -> Option<Event> {
        match effect {
            Effect::ConsultCounterpart { proposal } => {
                let decision = self.policy.decide(snapshot, proposal, &mut self.bonus);
                tracing::info!(
                    game_id = ?snapshot.game_id,
                    round = snapshot.current_round,
                    player_share = proposal.player,
                    decision = ?decision,
                    "Counterpart answered proposal"
                );
                Some(Event::CounterpartDecision { decision })
            }

            Effect::NotifySettled { status, settlement } => {
                tracing::info!(
                    game_id = ?snapshot.game_id,
                    round = snapshot.current_round,
                    status = ?status,
                    player_share = settlement.split.player,
                    counterpart_share = settlement.split.counterpart,
                    "Negotiation settled"
                );
                None
            }
        }
    }
}
