//! Core negotiation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{
    Agent, HistoryEntry, HistoryKind, NegotiationContext, NegotiationSnapshot, NegotiationState,
    NegotiationStatus, Offer, Split,
};
pub use transition::{transition, TransitionError, TransitionResult};
