//! Automated counterpart policy
//!
//! A fixed-threshold rule: accept anything that leaves the counterpart at
//! least its minimum share, otherwise counter with a demand raised by a
//! random bonus and capped. The bonus draw is the only source of
//! non-determinism in the crate and sits behind [`BonusSource`].

use crate::state_machine::state::{NegotiationSnapshot, Split};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Default share of the pool the counterpart accepts without countering
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f64 = 0.4;

/// Default bounds of the counter-offer bonus, as fractions of the pool
pub const DEFAULT_BONUS_RANGE: (f64, f64) = (0.05, 0.10);

/// Default ceiling on what the counterpart ever demands
pub const DEFAULT_COUNTER_CAP: f64 = 0.6;

/// The counterpart's answer to a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "split", rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Counter(Split),
}

// ============================================================================
// Bonus Sources
// ============================================================================

/// Supplies the bonus fraction for a counter-offer
pub trait BonusSource {
    /// Draw a fraction from `[low, high)`. Implementations may return
    /// `low` when the range is empty.
    fn draw(&mut self, low: f64, high: f64) -> f64;
}

impl<B: BonusSource + ?Sized> BonusSource for &mut B {
    fn draw(&mut self, low: f64, high: f64) -> f64 {
        (**self).draw(low, high)
    }
}

impl<B: BonusSource + ?Sized> BonusSource for Box<B> {
    fn draw(&mut self, low: f64, high: f64) -> f64 {
        (**self).draw(low, high)
    }
}

/// Production source backed by the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngBonus;

impl BonusSource for ThreadRngBonus {
    fn draw(&mut self, low: f64, high: f64) -> f64 {
        if low < high {
            rand::thread_rng().gen_range(low..high)
        } else {
            low
        }
    }
}

/// Reproducible source for replays and tests
#[derive(Debug, Clone)]
pub struct SeededBonus {
    rng: StdRng,
}

impl SeededBonus {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl BonusSource for SeededBonus {
    fn draw(&mut self, low: f64, high: f64) -> f64 {
        if low < high {
            self.rng.gen_range(low..high)
        } else {
            low
        }
    }
}

/// Always returns the same fraction
#[derive(Debug, Clone, Copy)]
pub struct FixedBonus(pub f64);

impl BonusSource for FixedBonus {
    fn draw(&mut self, _low: f64, _high: f64) -> f64 {
        self.0
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Parameters of the counterpart's decision rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterpartPolicy {
    pub acceptance_threshold: f64,
    pub bonus_range: (f64, f64),
    pub counter_cap: f64,
}

impl Default for CounterpartPolicy {
    fn default() -> Self {
        Self {
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            bonus_range: DEFAULT_BONUS_RANGE,
            counter_cap: DEFAULT_COUNTER_CAP,
        }
    }
}

impl CounterpartPolicy {
    /// Smallest share the counterpart accepts outright
    pub fn min_acceptable_share(&self, total: u32) -> u32 {
        fraction_of(total, self.acceptance_threshold)
    }

    /// Largest share the counterpart ever asks for
    pub fn max_demand(&self, total: u32) -> u32 {
        fraction_of(total, self.counter_cap)
    }

    /// Answer `proposal`. Never fails for a proposal that divides the pool.
    pub fn decide<B: BonusSource + ?Sized>(
        &self,
        snapshot: &NegotiationSnapshot,
        proposal: Split,
        bonus: &mut B,
    ) -> Decision {
        let total = snapshot.total_resources;
        let offered = proposal.counterpart;

        if offered >= self.min_acceptable_share(total) {
            return Decision::Accept;
        }

        let (low, high) = self.bonus_range;
        // An inverted or NaN range degrades to its lower bound
        let fraction = if low <= high {
            bonus.draw(low, high).clamp(low, high)
        } else {
            low
        };
        let desired = offered
            .saturating_add(fraction_of(total, fraction))
            .min(self.max_demand(total))
            .max(offered)
            .min(total);

        Decision::Counter(Split {
            player: total - desired,
            counterpart: desired,
        })
    }
}

/// `floor(total * fraction)`, saturating at the bounds of `u32`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn fraction_of(total: u32, fraction: f64) -> u32 {
    let value = (f64::from(total) * fraction).floor();
    if value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value as u32
    }
}
