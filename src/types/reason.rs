//! Reason codes for stabilizer decisions

use serde::{Deserialize, Serialize};

/// Why the engine did what it did with a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // W001: Session start
    // =========================================================================
    /// First reading of the session, nothing to compare against
    W001_FIRST_READING,

    // =========================================================================
    // W002: Tolerance
    // =========================================================================
    /// Reading differs from the previous one by more than epsilon
    W002_OUT_OF_TOLERANCE,

    // =========================================================================
    // W003: Stability timer
    // =========================================================================
    /// Reading matched the previous one, timer started
    W003_TIMER_STARTED,
    /// Reading matched, timer already running and keeps accumulating
    W003_TIMER_RUNNING,
    /// Reading matched, running timer restarted from now
    W003_TIMER_RESTARTED,
    /// Reading broke a running timer, timer cleared
    W003_STABILITY_RESET,

    // =========================================================================
    // W004: Finalization
    // =========================================================================
    /// Timer reached the threshold, final weight emitted
    W004_FINALIZED,

    // =========================================================================
    // W005: One-shot guard
    // =========================================================================
    /// Session already finalized, reading ignored
    W005_IGNORED_AFTER_FINAL,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::W001_FIRST_READING => "W001_FIRST_READING",
            Self::W002_OUT_OF_TOLERANCE => "W002_OUT_OF_TOLERANCE",
            Self::W003_TIMER_STARTED => "W003_TIMER_STARTED",
            Self::W003_TIMER_RUNNING => "W003_TIMER_RUNNING",
            Self::W003_TIMER_RESTARTED => "W003_TIMER_RESTARTED",
            Self::W003_STABILITY_RESET => "W003_STABILITY_RESET",
            Self::W004_FINALIZED => "W004_FINALIZED",
            Self::W005_IGNORED_AFTER_FINAL => "W005_IGNORED_AFTER_FINAL",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::W001_FIRST_READING => "First reading",
            Self::W002_OUT_OF_TOLERANCE => "Weight still moving",
            Self::W003_TIMER_STARTED => "Weight matched, stability timer started",
            Self::W003_TIMER_RUNNING => "Weight holding steady",
            Self::W003_TIMER_RESTARTED => "Weight matched, stability timer restarted",
            Self::W003_STABILITY_RESET => "Weight moved, stability timer cleared",
            Self::W004_FINALIZED => "Weight settled",
            Self::W005_IGNORED_AFTER_FINAL => "Already settled, reading ignored",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
