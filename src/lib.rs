//! Bargain - turn-based resource-division negotiation engine
//!
//! A player and an automated counterpart take turns proposing how to
//! split a fixed pool until one side accepts or the round limit runs out.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::must_use_candidate)] // Snapshot accessors are plain reads
#![allow(clippy::missing_errors_doc)] // Error enums document themselves

pub mod config;
pub mod engine;
pub mod policy;
pub mod runtime;
pub mod state_machine;

pub use config::{ConfigError, NegotiationConfig};
pub use engine::NegotiationEngine;
pub use policy::{BonusSource, CounterpartPolicy, Decision, FixedBonus, SeededBonus, ThreadRngBonus};
pub use runtime::{EngineEvent, NegotiationHandle, NegotiationRuntime, RuntimeError};
pub use state_machine::{
    Agent, HistoryEntry, HistoryKind, NegotiationSnapshot, NegotiationState, NegotiationStatus,
    Offer, Split, TransitionError,
};
