//! Async runtime around the negotiation engine
//!
//! Commands are serialized through one task that owns the engine. The
//! outcome of a command is computed up front, held for the simulated
//! delay, then committed. A reset cancels whatever is pending and wins.

mod executor;
pub mod traits;

#[cfg(test)]
mod testing;

pub use executor::NegotiationRuntime;
pub use traits::*;

use crate::state_machine::{NegotiationSnapshot, TransitionError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Reply channel carried by every command
pub type Reply = oneshot::Sender<Result<NegotiationSnapshot, RuntimeError>>;

/// Errors surfaced to runtime callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Another operation is still in progress")]
    Busy,
    #[error("Operation was superseded by a reset")]
    Superseded,
    #[error("Negotiation runtime has stopped")]
    Closed,
}

/// Commands accepted by the runtime task
#[derive(Debug)]
pub enum Command {
    Start { reply: Reply },
    Propose { player_share: u32, reply: Reply },
    Accept { reply: Reply },
    Reset { reply: Reply },
    Snapshot { reply: Reply },
}

/// Events broadcast to the presentation layer
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A new snapshot was committed
    SnapshotChanged { snapshot: NegotiationSnapshot },
    /// An operation began or finished its simulated delay
    Busy { busy: bool },
    /// A command was rejected
    Error { message: String },
}

/// Handle to interact with a running negotiation
#[derive(Clone)]
pub struct NegotiationHandle {
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<EngineEvent>,
    busy: Arc<AtomicBool>,
}

impl NegotiationHandle {
    pub async fn start(&self) -> Result<NegotiationSnapshot, RuntimeError> {
        self.request(|reply| Command::Start { reply }).await
    }

    pub async fn propose(&self, player_share: u32) -> Result<NegotiationSnapshot, RuntimeError> {
        self.request(|reply| Command::Propose {
            player_share,
            reply,
        })
        .await
    }

    pub async fn accept_current_offer(&self) -> Result<NegotiationSnapshot, RuntimeError> {
        self.request(|reply| Command::Accept { reply }).await
    }

    pub async fn reset(&self) -> Result<NegotiationSnapshot, RuntimeError> {
        self.request(|reply| Command::Reset { reply }).await
    }

    /// Latest committed snapshot
    pub async fn snapshot(&self) -> Result<NegotiationSnapshot, RuntimeError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Whether an operation is waiting out its delay
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.broadcast_tx.subscribe()
    }

    async fn request(
        &self,
        make: impl FnOnce(Reply) -> Command,
    ) -> Result<NegotiationSnapshot, RuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| RuntimeError::Closed)?;
        reply_rx.await.map_err(|_| RuntimeError::Closed)?
    }
}
