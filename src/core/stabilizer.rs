//! Stabilization Engine: settled-weight detection with a stability timer
//!
//! Per reading, in order:
//! 1. fire "weight observed"
//! 2. compare with the previous reading (|a - b| <= epsilon) and drive the timer
//! 3. remember the reading
//! 4. timer running for >= threshold → fire "weight finalized", once
//!
//! After finalization every reading is ignored until the session restarts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::{StabilizerConfig, TimerPolicy};
use crate::core::observer::WeightObserver;
use crate::types::{ReadingOutcome, ReasonCode, ScalePhase};

/// Tolerance equality. Absent values never match anything.
pub fn is_within_tolerance(a: Option<f64>, b: Option<f64>, epsilon: f64) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() <= epsilon,
        _ => false,
    }
}

/// Stabilization state machine for one listening session
pub struct StabilizationEngine {
    config: StabilizerConfig,
    observer: Arc<dyn WeightObserver>,
    /// Most recently accepted reading
    last_weight: Option<f64>,
    /// When consecutive readings started matching
    stability_timer_start: Option<Instant>,
    /// One-shot latch, never cleared within a session
    finalized: bool,
    /// Weight carried by the finalized callback
    final_weight: Option<f64>,
    /// Every accepted reading, diagnostics only
    history: Vec<f64>,
}

impl std::fmt::Debug for StabilizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilizationEngine")
            .field("config", &self.config)
            .field("last_weight", &self.last_weight)
            .field("stability_timer_start", &self.stability_timer_start)
            .field("finalized", &self.finalized)
            .field("final_weight", &self.final_weight)
            .field("readings", &self.history.len())
            .finish()
    }
}

impl StabilizationEngine {
    /// Create new engine with fresh session state
    pub fn new(config: StabilizerConfig, observer: Arc<dyn WeightObserver>) -> Self {
        Self {
            config,
            observer,
            last_weight: None,
            stability_timer_start: None,
            finalized: false,
            final_weight: None,
            history: Vec::new(),
        }
    }

    /// Apply a reading arriving now
    pub fn on_reading(&mut self, weight: f64) -> ReadingOutcome {
        self.on_reading_at(weight, Instant::now())
    }

    /// Apply a reading that arrived at `now` (monotonic clock)
    pub fn on_reading_at(&mut self, weight: f64, now: Instant) -> ReadingOutcome {
        if self.finalized {
            debug!(weight, "reading ignored, weight already final");
            return ReadingOutcome::new(
                weight,
                ScalePhase::Finalized,
                self.stable_ms_at(now),
                ReasonCode::W005_IGNORED_AFTER_FINAL,
            );
        }

        self.observer.on_weight_received(weight);

        let matches = is_within_tolerance(
            Some(weight),
            self.last_weight,
            self.config.tolerance_epsilon,
        );
        let mut reason = self.drive_timer(matches, now);

        self.last_weight = Some(weight);
        self.history.push(weight);

        let stable = self.stable_duration_at(now);
        if stable.is_some_and(|elapsed| elapsed >= self.config.stability_threshold()) {
            self.finalized = true;
            self.final_weight = Some(weight);
            reason = ReasonCode::W004_FINALIZED;
            info!(
                weight,
                stable_ms = self.stable_ms_at(now),
                readings = self.history.len(),
                "weight settled"
            );
            self.observer.on_final_weight_received(weight);
        }

        let outcome = ReadingOutcome::new(weight, self.phase(), self.stable_ms_at(now), reason);
        debug!(
            weight,
            phase = %outcome.phase,
            stable_ms = outcome.stable_ms,
            %reason,
            "reading applied"
        );
        outcome
    }

    /// Update the stability timer for a reading that did or did not match
    /// its predecessor
    fn drive_timer(&mut self, matches: bool, now: Instant) -> ReasonCode {
        match (matches, self.config.timer_policy) {
            (true, TimerPolicy::HoldFromFirstMatch) => {
                if self.stability_timer_start.is_some() {
                    ReasonCode::W003_TIMER_RUNNING
                } else {
                    self.stability_timer_start = Some(now);
                    ReasonCode::W003_TIMER_STARTED
                }
            }
            (true, TimerPolicy::RestartOnMatch) => {
                let restarted = self.stability_timer_start.replace(now).is_some();
                if restarted {
                    ReasonCode::W003_TIMER_RESTARTED
                } else {
                    ReasonCode::W003_TIMER_STARTED
                }
            }
            (false, policy) => {
                let reset = policy == TimerPolicy::HoldFromFirstMatch
                    && self.stability_timer_start.take().is_some();
                if reset {
                    ReasonCode::W003_STABILITY_RESET
                } else if self.last_weight.is_none() {
                    ReasonCode::W001_FIRST_READING
                } else {
                    ReasonCode::W002_OUT_OF_TOLERANCE
                }
            }
        }
    }

    /// Current phase of the session
    pub fn phase(&self) -> ScalePhase {
        if self.finalized {
            ScalePhase::Finalized
        } else if self.stability_timer_start.is_some() {
            ScalePhase::Settling
        } else if self.last_weight.is_some() {
            ScalePhase::Unsettled
        } else {
            ScalePhase::Waiting
        }
    }

    fn stable_duration_at(&self, now: Instant) -> Option<Duration> {
        self.stability_timer_start
            .map(|start| now.saturating_duration_since(start))
    }

    fn stable_ms_at(&self, now: Instant) -> u64 {
        self.stable_duration_at(now)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    /// How long the stability timer has been running (milliseconds)
    pub fn stable_ms(&self) -> u64 {
        self.stable_ms_at(Instant::now())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn last_weight(&self) -> Option<f64> {
        self.last_weight
    }

    pub fn final_weight(&self) -> Option<f64> {
        self.final_weight
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    /// Discard session state; keeps config and observer
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone(), self.observer.clone());
    }
}

// =============================================================================
// TESTS
// =============================================================================
