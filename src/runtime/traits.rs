//! Trait abstractions for runtime timing
//!
//! The simulated counterpart "thinking" time goes through [`ThinkingDelay`]
//! so tests can run without sleeping or hold an operation open on demand.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Waits out the simulated delay before a result is published
#[async_trait]
pub trait ThinkingDelay: Send + Sync {
    async fn pause(&self, duration: Duration);
}

#[async_trait]
impl<T: ThinkingDelay + ?Sized> ThinkingDelay for Arc<T> {
    async fn pause(&self, duration: Duration) {
        (**self).pause(duration).await;
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl ThinkingDelay for TokioDelay {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Returns immediately, whatever the configured duration
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl ThinkingDelay for NoDelay {
    async fn pause(&self, _duration: Duration) {}
}
