//! Negotiation configuration
//!
//! Fixed at construction. Loaded from `BARGAIN_*` environment variables
//! with per-field fallbacks to the defaults.

use crate::policy::{
    CounterpartPolicy, DEFAULT_ACCEPTANCE_THRESHOLD, DEFAULT_BONUS_RANGE, DEFAULT_COUNTER_CAP,
};
use crate::state_machine::state::{
    NegotiationContext, DEFAULT_MAX_ROUNDS, DEFAULT_TOTAL_RESOURCES,
};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Simulated counterpart "thinking" time after a proposal
pub const DEFAULT_COUNTERPART_DELAY: Duration = Duration::from_millis(1000);

/// Simulated round-trip for start and accept
pub const DEFAULT_RESPONSE_DELAY: Duration = Duration::from_millis(500);

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max_rounds must be at least 1")]
    NoRounds,
    #[error("{name} must be within [0, 1], got {value}")]
    FractionOutOfRange { name: &'static str, value: f64 },
    #[error("bonus range is inverted: {low} > {high}")]
    InvertedBonusRange { low: f64, high: f64 },
    #[error("counter cap {cap} is below the acceptance threshold {threshold}")]
    CapBelowThreshold { cap: f64, threshold: f64 },
}

/// Full configuration of a negotiation
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationConfig {
    pub total_resources: u32,
    pub max_rounds: u32,
    pub acceptance_threshold: f64,
    pub bonus_range: (f64, f64),
    pub counter_cap: f64,
    pub counterpart_delay: Duration,
    pub response_delay: Duration,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            total_resources: DEFAULT_TOTAL_RESOURCES,
            max_rounds: DEFAULT_MAX_ROUNDS,
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            bonus_range: DEFAULT_BONUS_RANGE,
            counter_cap: DEFAULT_COUNTER_CAP,
            counterpart_delay: DEFAULT_COUNTERPART_DELAY,
            response_delay: DEFAULT_RESPONSE_DELAY,
        }
    }
}

impl NegotiationConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing keys take the default;
    /// unparseable values are logged and take the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let delay = |key: &str, default: Duration| {
            Duration::from_millis(parse_or(&lookup, key, millis(default)))
        };

        Self {
            total_resources: parse_or(&lookup, "BARGAIN_TOTAL_RESOURCES", defaults.total_resources),
            max_rounds: parse_or(&lookup, "BARGAIN_MAX_ROUNDS", defaults.max_rounds),
            acceptance_threshold: parse_or(
                &lookup,
                "BARGAIN_ACCEPTANCE_THRESHOLD",
                defaults.acceptance_threshold,
            ),
            bonus_range: (
                parse_or(&lookup, "BARGAIN_BONUS_MIN", defaults.bonus_range.0),
                parse_or(&lookup, "BARGAIN_BONUS_MAX", defaults.bonus_range.1),
            ),
            counter_cap: parse_or(&lookup, "BARGAIN_COUNTER_CAP", defaults.counter_cap),
            counterpart_delay: delay("BARGAIN_COUNTERPART_DELAY_MS", defaults.counterpart_delay),
            response_delay: delay("BARGAIN_RESPONSE_DELAY_MS", defaults.response_delay),
        }
    }

    /// Same rules, no simulated delays
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.counterpart_delay = Duration::ZERO;
        self.response_delay = Duration::ZERO;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::NoRounds);
        }

        let (low, high) = self.bonus_range;
        for (name, value) in [
            ("acceptance_threshold", self.acceptance_threshold),
            ("bonus_min", low),
            ("bonus_max", high),
            ("counter_cap", self.counter_cap),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }

        if low > high {
            return Err(ConfigError::InvertedBonusRange { low, high });
        }

        if self.counter_cap < self.acceptance_threshold {
            return Err(ConfigError::CapBelowThreshold {
                cap: self.counter_cap,
                threshold: self.acceptance_threshold,
            });
        }

        Ok(())
    }

    pub fn context(&self) -> NegotiationContext {
        NegotiationContext {
            total_resources: self.total_resources,
            max_rounds: self.max_rounds,
        }
    }

    pub fn policy(&self) -> CounterpartPolicy {
        CounterpartPolicy {
            acceptance_threshold: self.acceptance_threshold,
            bonus_range: self.bonus_range,
            counter_cap: self.counter_cap,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparseable config value");
            default
        }),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
