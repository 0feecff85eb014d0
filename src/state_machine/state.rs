//! Negotiation state types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Agents and Splits
// ============================================================================

/// One of the two negotiating parties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agent {
    Player,
    Counterpart,
}

impl Agent {
    /// The agent on the other side of the table
    pub fn other(self) -> Self {
        match self {
            Agent::Player => Agent::Counterpart,
            Agent::Counterpart => Agent::Player,
        }
    }
}

/// A division of the resource pool, keyed by agent
///
/// Shares are stored per agent rather than per proposer so the two
/// components cannot be read back in the wrong order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub player: u32,
    pub counterpart: u32,
}

impl Split {
    /// Split where the player keeps `player_share` of `total`.
    /// Returns `None` when the share exceeds the pool.
    pub fn from_player_share(player_share: u32, total: u32) -> Option<Self> {
        let counterpart = total.checked_sub(player_share)?;
        Some(Self {
            player: player_share,
            counterpart,
        })
    }

    /// Split where the counterpart keeps `counterpart_share` of `total`.
    pub fn from_counterpart_share(counterpart_share: u32, total: u32) -> Option<Self> {
        let player = total.checked_sub(counterpart_share)?;
        Some(Self {
            player,
            counterpart: counterpart_share,
        })
    }

    pub fn share_of(&self, agent: Agent) -> u32 {
        match agent {
            Agent::Player => self.player,
            Agent::Counterpart => self.counterpart,
        }
    }

    /// Sum of both shares (widened so a malformed split cannot overflow)
    pub fn total(&self) -> u64 {
        u64::from(self.player) + u64::from(self.counterpart)
    }

    /// Whether this split divides exactly `total`
    pub fn divides(&self, total: u32) -> bool {
        self.total() == u64::from(total)
    }
}

/// A split together with the agent who put it on the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub by: Agent,
    pub split: Split,
}

impl Offer {
    pub fn new(by: Agent, split: Split) -> Self {
        Self { by, split }
    }

    /// Share the proposer keeps
    pub fn proposer_share(&self) -> u32 {
        self.split.share_of(self.by)
    }

    /// Share offered to the other party
    pub fn recipient_share(&self) -> u32 {
        self.split.share_of(self.by.other())
    }
}

// ============================================================================
// Negotiation State
// ============================================================================

/// Coarse status, derived from [`NegotiationState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    NotStarted,
    InProgress,
    Accepted,
    RoundsExhausted,
}

impl NegotiationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::RoundsExhausted)
    }
}

/// Negotiation state
///
/// Turn, status and last offer are folded into one variant so that an
/// accepted game with a pending turn, or a counter attributed to the
/// player, cannot be expressed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NegotiationState {
    /// No game running
    #[default]
    NotStarted,

    /// Player to move. `last_offer` is the counterpart's latest counter, if any.
    AwaitingPlayer { last_offer: Option<Offer> },

    /// Player proposed, counterpart deciding. Never published by the engine.
    AwaitingCounterpart { proposal: Split },

    /// One side agreed to the other's offer
    Accepted { settlement: Offer },

    /// Round limit hit; the last counter stands as the forced settlement
    RoundsExhausted { settlement: Offer },
}

impl NegotiationState {
    pub fn status(&self) -> NegotiationStatus {
        match self {
            NegotiationState::NotStarted => NegotiationStatus::NotStarted,
            NegotiationState::AwaitingPlayer { .. }
            | NegotiationState::AwaitingCounterpart { .. } => NegotiationStatus::InProgress,
            NegotiationState::Accepted { .. } => NegotiationStatus::Accepted,
            NegotiationState::RoundsExhausted { .. } => NegotiationStatus::RoundsExhausted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Whose move it is. `None` once the negotiation is settled.
    pub fn current_turn(&self) -> Option<Agent> {
        match self {
            NegotiationState::NotStarted | NegotiationState::AwaitingPlayer { .. } => {
                Some(Agent::Player)
            }
            NegotiationState::AwaitingCounterpart { .. } => Some(Agent::Counterpart),
            NegotiationState::Accepted { .. } | NegotiationState::RoundsExhausted { .. } => None,
        }
    }

    /// Most recent offer on the table
    pub fn last_offer(&self) -> Option<Offer> {
        match self {
            NegotiationState::NotStarted => None,
            NegotiationState::AwaitingPlayer { last_offer } => *last_offer,
            NegotiationState::AwaitingCounterpart { proposal } => {
                Some(Offer::new(Agent::Player, *proposal))
            }
            NegotiationState::Accepted { settlement }
            | NegotiationState::RoundsExhausted { settlement } => Some(*settlement),
        }
    }

    /// Settled division, present only in terminal states
    pub fn final_proposal(&self) -> Option<Offer> {
        match self {
            NegotiationState::Accepted { settlement }
            | NegotiationState::RoundsExhausted { settlement } => Some(*settlement),
            _ => None,
        }
    }
}

// ============================================================================
// History
// ============================================================================

/// What happened in a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryKind {
    Started,
    Offered { split: Split },
    Accepted { split: Split },
    RoundsExhausted { split: Split },
}

/// One entry of the append-only negotiation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub round: u32,
    pub agent: Agent,
    pub kind: HistoryKind,
}

impl HistoryEntry {
    pub fn new(round: u32, agent: Agent, kind: HistoryKind) -> Self {
        Self { round, agent, kind }
    }

    /// The split this entry refers to, if any
    pub fn split(&self) -> Option<Split> {
        match self.kind {
            HistoryKind::Started => None,
            HistoryKind::Offered { split }
            | HistoryKind::Accepted { split }
            | HistoryKind::RoundsExhausted { split } => Some(split),
        }
    }
}

// ============================================================================
// Snapshot and Context
// ============================================================================

/// Fixed rules of a game (immutable configuration)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationContext {
    pub total_resources: u32,
    pub max_rounds: u32,
}

/// Default pool size
pub const DEFAULT_TOTAL_RESOURCES: u32 = 100;

/// Default round limit
pub const DEFAULT_MAX_ROUNDS: u32 = 10;

impl Default for NegotiationContext {
    fn default() -> Self {
        Self {
            total_resources: DEFAULT_TOTAL_RESOURCES,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// Full, immutable view of a negotiation at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationSnapshot {
    /// Assigned when a game starts
    pub game_id: Option<Uuid>,
    pub total_resources: u32,
    /// 0 before start, 1-based afterwards
    pub current_round: u32,
    pub max_rounds: u32,
    pub state: NegotiationState,
    pub history: Vec<HistoryEntry>,
}

impl NegotiationSnapshot {
    /// The default snapshot: nothing started, nothing offered
    pub fn initial(context: &NegotiationContext) -> Self {
        Self {
            game_id: None,
            total_resources: context.total_resources,
            current_round: 0,
            max_rounds: context.max_rounds,
            state: NegotiationState::NotStarted,
            history: Vec::new(),
        }
    }

    /// A freshly started game in round 1 with the player to move
    pub fn started(context: &NegotiationContext, game_id: Uuid) -> Self {
        Self {
            game_id: Some(game_id),
            total_resources: context.total_resources,
            current_round: 1,
            max_rounds: context.max_rounds,
            state: NegotiationState::AwaitingPlayer { last_offer: None },
            history: vec![HistoryEntry::new(1, Agent::Player, HistoryKind::Started)],
        }
    }

    pub fn status(&self) -> NegotiationStatus {
        self.state.status()
    }

    pub fn current_turn(&self) -> Option<Agent> {
        self.state.current_turn()
    }

    pub fn last_offer(&self) -> Option<Offer> {
        self.state.last_offer()
    }

    pub fn final_proposal(&self) -> Option<Offer> {
        self.state.final_proposal()
    }

    /// Whether the player may accept what is on the table
    pub fn can_accept(&self) -> bool {
        matches!(
            self.state,
            NegotiationState::AwaitingPlayer {
                last_offer: Some(Offer {
                    by: Agent::Counterpart,
                    ..
                })
            }
        )
    }

    /// Every split this snapshot knows about, current state and history
    pub fn splits(&self) -> impl Iterator<Item = Split> + '_ {
        self.state
            .last_offer()
            .map(|offer| offer.split)
            .into_iter()
            .chain(self.history.iter().filter_map(HistoryEntry::split))
    }
}
