//! Negotiation runtime executor

use super::traits::ThinkingDelay;
use super::{Command, EngineEvent, NegotiationHandle, Reply, RuntimeError};

use crate::config::{ConfigError, NegotiationConfig};
use crate::engine::NegotiationEngine;
use crate::policy::BonusSource;
use crate::state_machine::{Event, NegotiationSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// An evaluated command waiting out its delay
struct PendingOperation {
    id: u64,
    snapshot: NegotiationSnapshot,
    reply: Reply,
    cancel: CancellationToken,
}

/// Owns the engine and processes commands one at a time
pub struct NegotiationRuntime<B, D>
where
    B: BonusSource + Send + 'static,
    D: ThinkingDelay + 'static,
{
    engine: NegotiationEngine<B>,
    delay: Arc<D>,
    counterpart_delay: Duration,
    response_delay: Duration,
    command_rx: mpsc::Receiver<Command>,
    /// Delay tasks report completion here, tagged with their operation id
    done_tx: mpsc::Sender<u64>,
    done_rx: mpsc::Receiver<u64>,
    broadcast_tx: broadcast::Sender<EngineEvent>,
    busy: Arc<AtomicBool>,
    pending: Option<PendingOperation>,
    next_operation_id: u64,
}

impl<B, D> NegotiationRuntime<B, D>
where
    B: BonusSource + Send + 'static,
    D: ThinkingDelay + 'static,
{
    /// Fails if `config` does not validate
    pub fn new(
        config: &NegotiationConfig,
        bonus: B,
        delay: D,
    ) -> Result<(Self, NegotiationHandle), ConfigError> {
        let engine = NegotiationEngine::with_bonus_source(config, bonus)?;
        let (command_tx, command_rx) = mpsc::channel(32);
        let (done_tx, done_rx) = mpsc::channel(8);
        let (broadcast_tx, _) = broadcast::channel(128);
        let busy = Arc::new(AtomicBool::new(false));

        let handle = NegotiationHandle {
            command_tx,
            broadcast_tx: broadcast_tx.clone(),
            busy: busy.clone(),
        };

        let runtime = Self {
            engine,
            delay: Arc::new(delay),
            counterpart_delay: config.counterpart_delay,
            response_delay: config.response_delay,
            command_rx,
            done_tx,
            done_rx,
            broadcast_tx,
            busy,
            pending: None,
            next_operation_id: 0,
        };

        Ok((runtime, handle))
    }

    /// Create a runtime and run it on the current tokio runtime
    pub fn spawn(
        config: &NegotiationConfig,
        bonus: B,
        delay: D,
    ) -> Result<NegotiationHandle, ConfigError> {
        let (runtime, handle) = Self::new(config, bonus, delay)?;
        tokio::spawn(runtime.run());
        Ok(handle)
    }

    pub async fn run(mut self) {
        tracing::info!("Starting negotiation runtime");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    // Every handle dropped
                    None => break,
                },
                Some(operation_id) = self.done_rx.recv() => {
                    self.finish_operation(operation_id);
                }
            }
        }

        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
        }
        tracing::info!("Negotiation runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Snapshot { reply } => {
                let _ = reply.send(Ok(self.engine.snapshot().clone()));
            }

            // Reset always wins over whatever is in flight
            Command::Reset { reply } => {
                if let Some(pending) = self.pending.take() {
                    pending.cancel.cancel();
                    tracing::debug!(operation = pending.id, "Pending operation superseded by reset");
                    let _ = pending.reply.send(Err(RuntimeError::Superseded));
                    self.set_busy(false);
                }
                let snapshot = self.engine.reset();
                self.publish(&snapshot);
                let _ = reply.send(Ok(snapshot));
            }

            Command::Start { reply } => {
                let event = Event::Start {
                    game_id: Uuid::new_v4(),
                };
                self.begin_operation(event, self.response_delay, reply);
            }

            Command::Propose {
                player_share,
                reply,
            } => {
                self.begin_operation(
                    Event::PlayerPropose { player_share },
                    self.counterpart_delay,
                    reply,
                );
            }

            Command::Accept { reply } => {
                self.begin_operation(Event::PlayerAccept, self.response_delay, reply);
            }
        }
    }

    /// Evaluate `event` now, publish the result once the delay has passed
    fn begin_operation(&mut self, event: Event, delay: Duration, reply: Reply) {
        if self.pending.is_some() {
            let _ = self.broadcast_tx.send(EngineEvent::Error {
                message: RuntimeError::Busy.to_string(),
            });
            let _ = reply.send(Err(RuntimeError::Busy));
            return;
        }

        let snapshot = match self.engine.evaluate(event) {
            Ok(s) => s,
            Err(e) => {
                // Rejections are user-facing (e.g., "not the player's turn")
                let _ = self.broadcast_tx.send(EngineEvent::Error {
                    message: e.to_string(),
                });
                let _ = reply.send(Err(e.into()));
                return;
            }
        };

        self.next_operation_id += 1;
        let id = self.next_operation_id;
        let cancel = CancellationToken::new();

        let cancel_token = cancel.clone();
        let thinking = self.delay.clone();
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = cancel_token.cancelled() => {
                    tracing::debug!(operation = id, "Delay cancelled");
                }

                () = thinking.pause(delay) => {
                    let _ = done_tx.send(id).await;
                }
            }
        });

        self.pending = Some(PendingOperation {
            id,
            snapshot,
            reply,
            cancel,
        });
        self.set_busy(true);
    }

    fn finish_operation(&mut self, operation_id: u64) {
        match self.pending.take() {
            Some(pending) if pending.id == operation_id => {
                self.engine.commit(pending.snapshot.clone());
                self.set_busy(false);
                self.publish(&pending.snapshot);
                let _ = pending.reply.send(Ok(pending.snapshot));
            }
            other => {
                tracing::debug!(operation = operation_id, "Ignoring stale operation completion");
                self.pending = other;
            }
        }
    }

    fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
        let _ = self.broadcast_tx.send(EngineEvent::Busy { busy });
    }

    fn publish(&self, snapshot: &NegotiationSnapshot) {
        let _ = self.broadcast_tx.send(EngineEvent::SnapshotChanged {
            snapshot: snapshot.clone(),
        });
    }
}
