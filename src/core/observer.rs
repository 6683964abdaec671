//! Observer callbacks fired by the stabilization engine

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::DecodeError;
use crate::types::{ReadingOutcome, WeightEvent};

/// Receives the engine's two output channels.
///
/// Callbacks run synchronously on the thread that delivered the reading,
/// while the session lock is held. They must not call back into the
/// owning `ScaleSession`.
pub trait WeightObserver: Send + Sync {
    /// Fired for every accepted reading, in arrival order
    fn on_weight_received(&self, weight: f64);

    /// Fired once per session, right after the observed callback of the
    /// reading that settled the weight
    fn on_final_weight_received(&self, weight: f64);

    /// A payload on the session's channel could not be decoded
    fn on_decode_error(&self, _error: &DecodeError) {}

    /// The engine's decision for an accepted reading, after its callbacks
    fn on_outcome(&self, _outcome: &ReadingOutcome) {}
}

/// Observer built from two closures
pub struct CallbackObserver<F, G> {
    on_weight: F,
    on_final: G,
}

impl<F, G> CallbackObserver<F, G>
where
    F: Fn(f64) + Send + Sync,
    G: Fn(f64) + Send + Sync,
{
    pub fn new(on_weight: F, on_final: G) -> Self {
        Self { on_weight, on_final }
    }
}

impl<F, G> WeightObserver for CallbackObserver<F, G>
where
    F: Fn(f64) + Send + Sync,
    G: Fn(f64) + Send + Sync,
{
    fn on_weight_received(&self, weight: f64) {
        (self.on_weight)(weight)
    }

    fn on_final_weight_received(&self, weight: f64) {
        (self.on_final)(weight)
    }
}

/// Forwards callbacks as `WeightEvent`s to live subscribers
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<WeightEvent>,
}

impl BroadcastObserver {
    pub fn new(tx: broadcast::Sender<WeightEvent>) -> Self {
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WeightEvent> {
        self.tx.subscribe()
    }
}

impl WeightObserver for BroadcastObserver {
    fn on_weight_received(&self, weight: f64) {
        // No live subscribers is fine
        let _ = self.tx.send(WeightEvent::observed(weight));
    }

    fn on_final_weight_received(&self, weight: f64) {
        let _ = self.tx.send(WeightEvent::finalized(weight));
    }
}

/// Hands every callback to each inner observer in order
#[derive(Default, Clone)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn WeightObserver>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn WeightObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl WeightObserver for FanoutObserver {
    fn on_weight_received(&self, weight: f64) {
        for observer in &self.observers {
            observer.on_weight_received(weight);
        }
    }

    fn on_final_weight_received(&self, weight: f64) {
        for observer in &self.observers {
            observer.on_final_weight_received(weight);
        }
    }

    fn on_decode_error(&self, error: &DecodeError) {
        for observer in &self.observers {
            observer.on_decode_error(error);
        }
    }

    fn on_outcome(&self, outcome: &ReadingOutcome) {
        for observer in &self.observers {
            observer.on_outcome(outcome);
        }
    }
}
