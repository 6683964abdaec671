//! Output structures for terminal display and the gateway

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ReasonCode, ScalePhase};

/// What the engine made of one reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingOutcome {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// The reading's weight
    pub weight: f64,
    /// Phase after the reading was applied
    pub phase: ScalePhase,
    /// How long the stability timer has been running (milliseconds)
    pub stable_ms: u64,
    /// Reason for the decision
    pub reason: ReasonCode,
    /// Did this reading settle the weight?
    pub finalized: bool,
}

impl ReadingOutcome {
    pub fn new(weight: f64, phase: ScalePhase, stable_ms: u64, reason: ReasonCode) -> Self {
        Self {
            timestamp: Utc::now(),
            weight,
            phase,
            stable_ms,
            reason,
            finalized: reason == ReasonCode::W004_FINALIZED,
        }
    }

    /// Was the reading processed at all?
    pub fn accepted(&self) -> bool {
        self.reason != ReasonCode::W005_IGNORED_AFTER_FINAL
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let color = self.phase.color_code();
        let reset = ScalePhase::color_reset();

        format!(
            "{}{} weight={:.3} | phase={} | stable={:.1}s | {}{}",
            color,
            self.phase.emoji(),
            self.weight,
            self.phase,
            self.stable_ms as f64 / 1000.0,
            self.reason.code(),
            reset
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "weight={:.3} | phase={} | stable={:.1}s | reason={}",
            self.weight,
            self.phase,
            self.stable_ms as f64 / 1000.0,
            self.reason.code()
        )
    }
}

/// Callback events as pushed to live subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WeightEvent {
    Observed { weight: f64, timestamp: DateTime<Utc> },
    Finalized { weight: f64, timestamp: DateTime<Utc> },
}

impl WeightEvent {
    pub fn observed(weight: f64) -> Self {
        Self::Observed { weight, timestamp: Utc::now() }
    }

    pub fn finalized(weight: f64) -> Self {
        Self::Finalized { weight, timestamp: Utc::now() }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Self::Observed { weight, .. } | Self::Finalized { weight, .. } => *weight,
        }
    }
}

/// Snapshot of a listening session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub phase: ScalePhase,
    pub channel: String,
    pub last_weight: Option<f64>,
    pub final_weight: Option<f64>,
    pub readings: usize,
    pub stable_ms: u64,
    pub history: Vec<f64>,
}

impl SessionStatus {
    pub fn stopped(channel: &str) -> Self {
        Self {
            phase: ScalePhase::Stopped,
            channel: channel.to_string(),
            last_weight: None,
            final_weight: None,
            readings: 0,
            stable_ms: 0,
            history: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(WeightEvent::finalized(5.0)).unwrap();
        assert_eq!(json["event"], "finalized");
        assert_eq!(json["weight"], 5.0);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_parseable_output_format() {
        let outcome = ReadingOutcome::new(5.0, ScalePhase::Settling, 1500, ReasonCode::W003_TIMER_RUNNING);
        assert_eq!(
            outcome.to_parseable_string(),
            "weight=5.000 | phase=SETTLING | stable=1.5s | reason=W003_TIMER_RUNNING"
        );
        assert!(!outcome.finalized);
        assert!(outcome.accepted());
    }

    #[test]
    fn test_finalized_flag_follows_reason() {
        let outcome = ReadingOutcome::new(5.0, ScalePhase::Finalized, 2000, ReasonCode::W004_FINALIZED);
        assert!(outcome.finalized);
    }
}
