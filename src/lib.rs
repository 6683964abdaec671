//! scalewatch: settled-weight detection for pub/sub connected scales
//!
//! Reading source → decoder → StabilizationEngine → observer callbacks

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod types;

pub use error::{ConfigError, ConnectionError, DecodeError, Error, Result};

// =============================================================================
// STABILIZATION DEFAULTS
// =============================================================================

/// Two readings closer than this (weight units) count as the same weight
pub const DEFAULT_TOLERANCE_EPSILON: f64 = 0.05;

/// Readings must keep matching this long before the weight is final (milliseconds)
pub const DEFAULT_STABILITY_THRESHOLD_MS: u64 = 2000;

// =============================================================================
// TRANSPORT DEFAULTS
// =============================================================================

/// Channel the scale publishes its readings on
pub const DEFAULT_CHANNEL: &str = "pf/scale";

/// Port of the reading gateway
pub const DEFAULT_PORT: u16 = 3000;

/// Client id announced on health checks and in logs
pub const DEFAULT_CLIENT_ID: &str = "scalewatch";

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
