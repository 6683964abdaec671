//! Session lifecycle: wires a reading source to a stabilization engine
//!
//! `start()` subscribes and spawns a dispatcher on the current Tokio
//! runtime; `stop()` detaches. Each reading is decoded outside the lock and
//! applied under it, so engine updates never interleave and nothing fires
//! once `stop()` has returned.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ScaleConfig, StabilizerConfig};
use crate::core::decoder::decode_payload;
use crate::core::observer::WeightObserver;
use crate::core::source::{ReadingSource, Subscription};
use crate::core::stabilizer::StabilizationEngine;
use crate::error::{ConnectionError, DecodeError};
use crate::types::{Reading, ScalePhase, SessionStatus};

/// Engine of the current session plus the generation that owns it
#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    engine: Option<StabilizationEngine>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One scale, one channel, one measurement at a time
pub struct ScaleSession<S: ReadingSource> {
    source: S,
    config: StabilizerConfig,
    channel: String,
    observer: Arc<dyn WeightObserver>,
    slot: Arc<Mutex<Slot>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl<S: ReadingSource> ScaleSession<S> {
    pub fn new(source: S, config: &ScaleConfig, observer: Arc<dyn WeightObserver>) -> Self {
        Self {
            source,
            config: config.stabilizer.clone(),
            channel: config.transport.channel.clone(),
            observer,
            slot: Arc::new(Mutex::new(Slot::default())),
            dispatcher: None,
        }
    }

    /// Begin a new measurement with fresh state. A running session is
    /// stopped first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> Result<(), ConnectionError> {
        let runtime = Handle::try_current().map_err(|_| ConnectionError::NoRuntime)?;
        self.stop();

        let subscription = self.source.subscribe(&self.channel)?;
        let generation = {
            let mut slot = lock(&self.slot);
            slot.generation += 1;
            slot.engine = Some(StabilizationEngine::new(
                self.config.clone(),
                self.observer.clone(),
            ));
            slot.generation
        };

        self.dispatcher = Some(runtime.spawn(dispatch(
            subscription,
            self.slot.clone(),
            generation,
            self.observer.clone(),
        )));
        info!(channel = %self.channel, generation, "listening for scale readings");
        Ok(())
    }

    /// Detach and discard session state. Idempotent.
    pub fn stop(&mut self) {
        let was_active = {
            let mut slot = lock(&self.slot);
            slot.generation += 1;
            slot.engine.take().is_some()
        };
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.abort();
        }
        if was_active {
            info!(channel = %self.channel, "stopped listening");
        }
    }

    /// True while readings are still being consumed
    pub fn is_listening(&self) -> bool {
        self.phase().is_listening()
            && self
                .dispatcher
                .as_ref()
                .is_some_and(|dispatcher| !dispatcher.is_finished())
    }

    pub fn phase(&self) -> ScalePhase {
        lock(&self.slot)
            .engine
            .as_ref()
            .map(StabilizationEngine::phase)
            .unwrap_or(ScalePhase::Stopped)
    }

    pub fn final_weight(&self) -> Option<f64> {
        lock(&self.slot)
            .engine
            .as_ref()
            .and_then(StabilizationEngine::final_weight)
    }

    pub fn status(&self) -> SessionStatus {
        let slot = lock(&self.slot);
        match slot.engine.as_ref() {
            Some(engine) => SessionStatus {
                phase: engine.phase(),
                channel: self.channel.clone(),
                last_weight: engine.last_weight(),
                final_weight: engine.final_weight(),
                readings: engine.history().len(),
                stable_ms: engine.stable_ms(),
                history: engine.history().to_vec(),
            },
            None => SessionStatus::stopped(&self.channel),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }
}

impl<S: ReadingSource> Drop for ScaleSession<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pump payloads from the subscription into the engine until the session
/// is finalized, stopped, or the source goes away
async fn dispatch(
    mut subscription: Subscription,
    slot: Arc<Mutex<Slot>>,
    generation: u64,
    observer: Arc<dyn WeightObserver>,
) {
    while let Some(payload) = subscription.recv().await {
        let decoded = decode_payload(&payload);
        if apply(&slot, generation, decoded, observer.as_ref(), subscription.channel()).is_break() {
            break;
        }
    }
    debug!(channel = subscription.channel(), generation, "dispatcher finished");
}

fn apply(
    slot: &Mutex<Slot>,
    generation: u64,
    decoded: Result<Option<Reading>, DecodeError>,
    observer: &dyn WeightObserver,
    channel: &str,
) -> ControlFlow<()> {
    let mut slot = lock(slot);
    if slot.generation != generation {
        return ControlFlow::Break(());
    }
    let Some(engine) = slot.engine.as_mut() else {
        return ControlFlow::Break(());
    };

    match decoded {
        Ok(Some(reading)) => {
            let outcome = engine.on_reading(reading.weight);
            observer.on_outcome(&outcome);
            if outcome.finalized {
                return ControlFlow::Break(());
            }
        }
        Ok(None) => debug!(channel, "empty payload skipped"),
        Err(error) => {
            warn!(channel, %error, "undecodable payload dropped");
            observer.on_decode_error(&error);
        }
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::broker::Broker;
    use crate::core::observer::CallbackObserver;
    use crate::types::{ReadingOutcome, ReasonCode};

    fn noop() -> Arc<dyn WeightObserver> {
        Arc::new(CallbackObserver::new(|_| {}, |_| {}))
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let mut session = ScaleSession::new(Broker::new(), &ScaleConfig::default(), noop());
        assert!(matches!(session.start(), Err(ConnectionError::NoRuntime)));
        assert_eq!(session.phase(), ScalePhase::Stopped);
    }

    #[tokio::test]
    async fn test_start_on_closed_broker_fails() {
        let broker = Broker::new();
        broker.close();
        let mut session = ScaleSession::new(broker, &ScaleConfig::default(), noop());
        assert!(matches!(session.start(), Err(ConnectionError::BrokerClosed)));
        assert!(!session.is_listening());
    }

    #[tokio::test]
    async fn test_start_then_stop() {
        let broker = Arc::new(Broker::new());
        let mut session = ScaleSession::new(broker.clone(), &ScaleConfig::default(), noop());

        session.start().unwrap();
        assert_eq!(session.phase(), ScalePhase::Waiting);
        assert!(session.is_listening());
        assert_eq!(broker.subscriber_count("pf/scale"), 1);

        session.stop();
        assert_eq!(session.phase(), ScalePhase::Stopped);
        assert!(!session.is_listening());
        session.stop();
        assert_eq!(session.status().readings, 0);
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let slot = Mutex::new(Slot {
            generation: 2,
            engine: Some(StabilizationEngine::new(StabilizerConfig::default(), noop())),
        });
        let flow = apply(&slot, 1, Ok(Some(Reading::new(1.0))), noop().as_ref(), "c");
        assert!(flow.is_break());
        assert!(lock(&slot).engine.as_ref().unwrap().history().is_empty());
    }

    #[derive(Default)]
    struct Reasons(Mutex<Vec<ReasonCode>>);

    impl WeightObserver for Reasons {
        fn on_weight_received(&self, _weight: f64) {}
        fn on_final_weight_received(&self, _weight: f64) {}
        fn on_outcome(&self, outcome: &ReadingOutcome) {
            self.0.lock().unwrap().push(outcome.reason);
        }
    }

    #[test]
    fn test_outcomes_reach_observer() {
        let mut config = StabilizerConfig::default();
        config.stability_threshold_ms = 0;
        let reasons = Arc::new(Reasons::default());
        let slot = Mutex::new(Slot {
            generation: 1,
            engine: Some(StabilizationEngine::new(config, reasons.clone())),
        });

        let flows: Vec<bool> = [1.0, 3.0, 3.0]
            .into_iter()
            .map(|w| apply(&slot, 1, Ok(Some(Reading::new(w))), reasons.as_ref(), "c").is_break())
            .collect();

        assert_eq!(flows, vec![false, false, true]);

        assert_eq!(
            *reasons.0.lock().unwrap(),
            vec![
                ReasonCode::W001_FIRST_READING,
                ReasonCode::W002_OUT_OF_TOLERANCE,
                ReasonCode::W004_FINALIZED,
            ]
        );
    }

    #[test]
    fn test_decode_error_leaves_engine_untouched() {
        let slot = Mutex::new(Slot {
            generation: 1,
            engine: Some(StabilizationEngine::new(StabilizerConfig::default(), noop())),
        });
        let decoded = decode_payload(b"not json");
        let flow = apply(&slot, 1, decoded, noop().as_ref(), "c");
        assert!(flow.is_continue());
        assert_eq!(lock(&slot).engine.as_ref().unwrap().last_weight(), None);
    }
}
