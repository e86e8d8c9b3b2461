//! Event sink trait and in-memory implementation.
//!
//! The runner hands every outbound event to an [`EventSink`]. The engine
//! binary publishes to NATS; tests use [`MemorySink`], which records what it
//! was given and can be told to fail.

use std::future::Future;

use worldsim_types::OutboundEvent;

/// Errors that can occur while publishing an event.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The event could not be encoded.
    #[error("failed to encode event: {source}")]
    Encode {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The transport rejected the event.
    #[error("publish failed: {0}")]
    Publish(String),
}

/// A destination for outbound events.
pub trait EventSink: Send {
    /// Publish one event as one message.
    fn publish(
        &mut self,
        event: &OutboundEvent,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Encode an event as its JSON wire form.
pub fn encode(event: &OutboundEvent) -> Result<Vec<u8>, SinkError> {
    Ok(serde_json::to_vec(event)?)
}

/// Records published events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Events published so far, in order.
    pub published: Vec<OutboundEvent>,
    failures_remaining: usize,
}

impl MemorySink {
    /// An empty sink that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` publish attempts.
    pub const fn fail_next(&mut self, count: usize) {
        self.failures_remaining = count;
    }

    /// `event_type` of every published event, in order.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.published.iter().map(OutboundEvent::event_type).collect()
    }
}

impl EventSink for MemorySink {
    async fn publish(&mut self, event: &OutboundEvent) -> Result<(), SinkError> {
        if self.failures_remaining > 0 {
            self.failures_remaining = self.failures_remaining.saturating_sub(1);
            return Err(SinkError::Publish("memory sink told to fail".to_owned()));
        }
        encode(event)?;
        self.published.push(event.clone());
        Ok(())
    }
}
