//! Core modules for scalewatch

pub mod api;
pub mod broker;
pub mod decoder;
pub mod discovery;
pub mod observer;
pub mod session;
pub mod source;
pub mod stabilizer;

pub use api::{create_router, run_server, AppState};
pub use broker::Broker;
pub use decoder::decode_payload;
pub use discovery::{local_ipv4, resolve_broker_addr};
pub use observer::{BroadcastObserver, CallbackObserver, FanoutObserver, WeightObserver};
pub use session::ScaleSession;
pub use source::{Payload, ReadingSource, Subscription};
pub use stabilizer::{is_within_tolerance, StabilizationEngine};
