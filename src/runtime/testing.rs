//! Mock implementations and runtime integration tests

use super::traits::{NoDelay, ThinkingDelay};
use super::{EngineEvent, NegotiationHandle, NegotiationRuntime};
use crate::config::NegotiationConfig;
use crate::policy::FixedBonus;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};

// ============================================================================
// Mock Delays
// ============================================================================

/// Delay that holds every operation open until the test releases it
#[derive(Clone)]
pub struct GatedDelay {
    gate: Arc<Semaphore>,
    /// Number of pauses requested so far
    pub calls: Arc<AtomicUsize>,
}

impl GatedDelay {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Let `count` pending delays complete
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }
}

#[async_trait]
impl ThinkingDelay for GatedDelay {
    async fn pause(&self, _duration: Duration) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
    }
}

// ============================================================================
// Test Runtime Builder
// ============================================================================

pub struct TestRuntime<D: ThinkingDelay + 'static> {
    config: NegotiationConfig,
    bonus: f64,
    delay: D,
}

impl TestRuntime<NoDelay> {
    pub fn new() -> Self {
        Self {
            config: NegotiationConfig::default(),
            bonus: 0.05,
            delay: NoDelay,
        }
    }
}

impl<D: ThinkingDelay + 'static> TestRuntime<D> {
    pub fn config(mut self, config: NegotiationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn delay<E: ThinkingDelay + 'static>(self, delay: E) -> TestRuntime<E> {
        TestRuntime {
            config: self.config,
            bonus: self.bonus,
            delay,
        }
    }

    pub fn build(self) -> NegotiationHandle {
        NegotiationRuntime::spawn(&self.config, FixedBonus(self.bonus), self.delay)
            .expect("test config should be valid")
    }
}

/// Wait until the handle reports an operation in flight
pub async fn wait_until_busy(handle: &NegotiationHandle, timeout: Duration) -> bool {
    tokio::time::timeout(timeout, async {
        while !handle.is_busy() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .is_ok()
}

/// Drain broadcast events until one matches
pub async fn wait_for_event(
    rx: &mut broadcast::Receiver<EngineEvent>,
    timeout: Duration,
    matches: impl Fn(&EngineEvent) -> bool,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
            Ok(Ok(event)) if matches(&event) => return true,
            _ => continue,
        }
    }
    false
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::runtime::{RuntimeError, TokioDelay};
    use crate::state_machine::{NegotiationContext, NegotiationSnapshot, NegotiationStatus};
    use crate::state_machine::TransitionError;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_full_negotiation_without_delay() {
        let handle = TestRuntime::new().build();

        let started = handle.start().await.unwrap();
        assert_eq!(started.status(), NegotiationStatus::InProgress);

        let countered = handle.propose(90).await.unwrap();
        assert_eq!(countered.current_round, 2);
        assert!(countered.can_accept());

        let accepted = handle.accept_current_offer().await.unwrap();
        assert_eq!(accepted.status(), NegotiationStatus::Accepted);
        assert_eq!(handle.snapshot().await.unwrap(), accepted);
        assert!(!handle.is_busy());
    }

    #[tokio::test]
    async fn test_rejected_command_reports_error() {
        let handle = TestRuntime::new().build();
        let mut rx = handle.subscribe();

        let result = handle.propose(50).await;
        assert_eq!(
            result,
            Err(RuntimeError::Transition(TransitionError::NotPlayersTurn))
        );
        assert!(
            wait_for_event(&mut rx, WAIT, |e| matches!(e, EngineEvent::Error { .. })).await
        );
        assert_eq!(
            handle.snapshot().await.unwrap().status(),
            NegotiationStatus::NotStarted
        );
    }

    #[tokio::test]
    async fn test_busy_during_delay() {
        let delay = GatedDelay::new();
        let handle = TestRuntime::new().delay(delay.clone()).build();

        let starter = handle.clone();
        let start = tokio::spawn(async move { starter.start().await });
        assert!(wait_until_busy(&handle, WAIT).await);

        // Snapshot is still the committed one while the start is pending
        assert_eq!(
            handle.snapshot().await.unwrap().status(),
            NegotiationStatus::NotStarted
        );
        let mut rx = handle.subscribe();
        assert_eq!(handle.propose(50).await, Err(RuntimeError::Busy));
        assert!(
            wait_for_event(&mut rx, WAIT, |e| matches!(
                e,
                EngineEvent::Error { message } if message == "Another operation is still in progress"
            ))
            .await
        );

        delay.release(1);
        let started = start.await.unwrap().unwrap();
        assert_eq!(started.status(), NegotiationStatus::InProgress);
        assert!(!handle.is_busy());
        assert_eq!(delay.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_supersedes_pending_proposal() {
        let delay = GatedDelay::new();
        let handle = TestRuntime::new().delay(delay.clone()).build();

        delay.release(1);
        handle.start().await.unwrap();

        let proposer = handle.clone();
        let proposal = tokio::spawn(async move { proposer.propose(90).await });
        assert!(wait_until_busy(&handle, WAIT).await);

        let reset = handle.reset().await.unwrap();
        assert_eq!(
            reset,
            NegotiationSnapshot::initial(&NegotiationContext::default())
        );
        assert_eq!(proposal.await.unwrap(), Err(RuntimeError::Superseded));
        assert!(!handle.is_busy());

        // A late release must not resurrect the superseded result
        delay.release(1);
        tokio::task::yield_now().await;
        assert_eq!(handle.snapshot().await.unwrap(), reset);
    }

    #[tokio::test]
    async fn test_snapshot_changes_are_broadcast() {
        let handle = TestRuntime::new().build();
        let mut rx = handle.subscribe();

        handle.start().await.unwrap();
        assert!(
            wait_for_event(&mut rx, WAIT, |e| matches!(
                e,
                EngineEvent::SnapshotChanged { snapshot } if snapshot.current_round == 1
            ))
            .await
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_delay_does_not_change_outcome() {
        let handle = TestRuntime::new().delay(TokioDelay).build();

        handle.start().await.unwrap();
        let before = tokio::time::Instant::now();
        let snapshot = handle.propose(40).await.unwrap();

        assert!(before.elapsed() >= Duration::from_millis(1000));
        assert_eq!(snapshot.status(), NegotiationStatus::Accepted);
    }

    #[tokio::test]
    async fn test_single_round_game_exhausts() {
        let config = NegotiationConfig {
            max_rounds: 1,
            ..NegotiationConfig::default()
        };
        let handle = TestRuntime::new().config(config).build();

        handle.start().await.unwrap();
        let snapshot = handle.propose(100).await.unwrap();
        assert_eq!(snapshot.status(), NegotiationStatus::RoundsExhausted);
        assert_eq!(snapshot.current_round, 2);
        assert_eq!(
            handle.accept_current_offer().await,
            Err(RuntimeError::Transition(TransitionError::NoOfferToAccept))
        );
    }

    #[tokio::test]
    async fn test_runtime_stops_when_handles_dropped() {
        let (runtime, handle) =
            NegotiationRuntime::new(&NegotiationConfig::default(), FixedBonus(0.05), NoDelay)
                .unwrap();
        let task = tokio::spawn(runtime.run());

        drop(handle);
        assert!(tokio::time::timeout(WAIT, task).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_config_is_refused() {
        let inverted = NegotiationConfig {
            bonus_range: (0.10, 0.05),
            ..NegotiationConfig::default()
        };
        assert!(matches!(
            NegotiationRuntime::spawn(&inverted, FixedBonus(0.05), NoDelay),
            Err(ConfigError::InvertedBonusRange { .. })
        ));

        let no_rounds = NegotiationConfig {
            max_rounds: 0,
            ..NegotiationConfig::default()
        };
        assert!(matches!(
            NegotiationRuntime::new(&no_rounds, FixedBonus(0.05), NoDelay),
            Err(ConfigError::NoRounds)
        ));
    }
}
