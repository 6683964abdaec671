//! Session phase definitions

use serde::{Deserialize, Serialize};

/// Where a listening session stands on its way to a settled weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScalePhase {
    /// Not listening
    Stopped,
    /// Listening, no reading yet
    Waiting,
    /// Readings arriving, no stability timer running
    Unsettled,
    /// Consecutive readings match, stability timer running
    Settling,
    /// Final weight emitted, further readings ignored
    Finalized,
}

impl ScalePhase {
    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            ScalePhase::Stopped => "\x1b[90m",   // Gray
            ScalePhase::Waiting => "\x1b[90m",   // Gray
            ScalePhase::Unsettled => "\x1b[33m", // Yellow
            ScalePhase::Settling => "\x1b[36m",  // Cyan
            ScalePhase::Finalized => "\x1b[32m", // Green
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    /// Get emoji for phase
    pub fn emoji(&self) -> &'static str {
        match self {
            ScalePhase::Stopped => "⏹",
            ScalePhase::Waiting => "⏳",
            ScalePhase::Unsettled => "〰",
            ScalePhase::Settling => "⚖",
            ScalePhase::Finalized => "✅",
        }
    }

    /// True while the session still accepts readings
    pub fn is_listening(&self) -> bool {
        matches!(
            self,
            ScalePhase::Waiting | ScalePhase::Unsettled | ScalePhase::Settling
        )
    }
}

impl std::fmt::Display for ScalePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScalePhase::Stopped => "STOPPED",
            ScalePhase::Waiting => "WAITING",
            ScalePhase::Unsettled => "UNSETTLED",
            ScalePhase::Settling => "SETTLING",
            ScalePhase::Finalized => "FINALIZED",
        };
        write!(f, "{}", name)
    }
}
