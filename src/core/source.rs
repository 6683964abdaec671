//! Reading source abstraction: where raw scale payloads come from

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::ConnectionError;

/// Raw message body as published by the scale
pub type Payload = Vec<u8>;

/// A pub/sub client that can deliver one channel's payloads
pub trait ReadingSource: Send + Sync {
    /// Attach to `channel`. Dropping the returned subscription detaches.
    fn subscribe(&self, channel: &str) -> Result<Subscription, ConnectionError>;
}

impl<T: ReadingSource + ?Sized> ReadingSource for Arc<T> {
    fn subscribe(&self, channel: &str) -> Result<Subscription, ConnectionError> {
        (**self).subscribe(channel)
    }
}

/// Live attachment to one channel
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    rx: mpsc::UnboundedReceiver<Payload>,
}

impl Subscription {
    pub fn new(channel: impl Into<String>, rx: mpsc::UnboundedReceiver<Payload>) -> Self {
        Self {
            channel: channel.into(),
            rx,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Next payload, or `None` once the source has gone away.
    ///
    /// Payloads are queued without bound, so a slow subscriber still sees
    /// every one of them in publish order.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }
}
