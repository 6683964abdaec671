//! In-process pub/sub broker
//!
//! Named channels, each with its own list of subscriber queues: every
//! subscriber sees every payload published after it subscribed, in publish
//! order. Queues are unbounded, so a burst is never dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::source::{Payload, ReadingSource, Subscription};
use crate::error::ConnectionError;

#[derive(Debug, Default)]
pub struct Broker {
    channels: RwLock<HashMap<String, Vec<mpsc::UnboundedSender<Payload>>>>,
    closed: AtomicBool,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a payload; returns how many subscribers it was delivered to
    pub fn publish(
        &self,
        channel: &str,
        payload: impl Into<Payload>,
    ) -> Result<usize, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::BrokerClosed);
        }
        let payload = payload.into();
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let delivered = match channels.get_mut(channel) {
            Some(subscribers) => {
                // send only fails once the subscription was dropped
                subscribers.retain(|tx| tx.send(payload.clone()).is_ok());
                subscribers.len()
            }
            None => 0,
        };
        debug!(channel, delivered, "payload published");
        Ok(delivered)
    }

    /// Number of live subscriptions on `channel`
    pub fn subscriber_count(&self, channel: &str) -> usize {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        channels
            .get(channel)
            .map(|subscribers| subscribers.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Stop accepting publishes and subscriptions. Existing subscriptions
    /// drain what is queued and then end.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        channels.clear();
        info!("broker closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ReadingSource for Broker {
    fn subscribe(&self, channel: &str) -> Result<Subscription, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::BrokerClosed);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let subscribers = channels.entry(channel.to_string()).or_default();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.push(tx);
        debug!(channel, "subscribed");
        Ok(Subscription::new(channel, rx))
    }
}
