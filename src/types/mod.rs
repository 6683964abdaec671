//! Core types for scalewatch

mod output;
mod reading;
mod reason;
mod state;

pub use output::{ReadingOutcome, SessionStatus, WeightEvent};
pub use reading::{Reading, ScaleMessage, WeightValue};
pub use reason::ReasonCode;
pub use state::ScalePhase;
