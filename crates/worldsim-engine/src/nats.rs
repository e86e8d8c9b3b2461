//! NATS plumbing for the engine: inbound tick and command subscriptions,
//! and an [`EventSink`] that publishes outbound events.
//!
//! Ticks arrive on `world.tick.daily` and are offered to the runner queue
//! without waiting; a full queue drops the tick. Commands arrive on
//! `world.commands` and wait for queue space. Malformed messages are logged
//! and skipped.

use futures::StreamExt as _;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use worldsim_core::config::InfrastructureConfig;
use worldsim_core::sink::encode;
use worldsim_core::{EventSink, RunnerInput, SinkError, WorldCommand, offer_tick};
use worldsim_types::{OutboundEvent, TickTrigger};

use crate::error::EngineError;

/// Connect to the NATS server at `url`.
pub async fn connect(url: &str) -> Result<async_nats::Client, EngineError> {
    let client = async_nats::connect(url)
        .await
        .map_err(|e| EngineError::Nats {
            message: format!("failed to connect to {url}: {e}"),
        })?;
    info!(url, "Connected to NATS");
    Ok(client)
}

/// Subscribe to `subject`.
pub async fn subscribe(
    client: &async_nats::Client,
    subject: &str,
) -> Result<async_nats::Subscriber, EngineError> {
    let sub = client
        .subscribe(subject.to_owned())
        .await
        .map_err(|e| EngineError::Nats {
            message: format!("failed to subscribe to {subject}: {e}"),
        })?;
    info!(subject, "Subscribed");
    Ok(sub)
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Decode a tick trigger payload.
pub fn parse_trigger(subject: &str, payload: &[u8]) -> Result<TickTrigger, EngineError> {
    serde_json::from_slice(payload).map_err(|e| EngineError::Malformed {
        subject: subject.to_owned(),
        message: e.to_string(),
    })
}

/// Decode a world command payload.
pub fn parse_command(subject: &str, payload: &[u8]) -> Result<WorldCommand, EngineError> {
    serde_json::from_slice(payload).map_err(|e| EngineError::Malformed {
        subject: subject.to_owned(),
        message: e.to_string(),
    })
}

/// Forward tick triggers from `sub` into the runner queue.
///
/// The task ends when the subscription closes.
pub fn spawn_tick_listener(
    mut sub: async_nats::Subscriber,
    queue: mpsc::Sender<RunnerInput>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = sub.next().await {
            match parse_trigger(msg.subject.as_str(), &msg.payload) {
                Ok(trigger) => {
                    debug!(tick_id = %trigger.tick_id, "Tick received");
                    offer_tick(&queue, trigger);
                }
                Err(e) => warn!(error = %e, "Ignoring tick"),
            }
        }
        info!("Tick subscription closed");
    })
}

/// Forward world commands from `sub` into the runner queue.
///
/// Commands are never dropped for backpressure; the task waits for space.
pub fn spawn_command_listener(
    mut sub: async_nats::Subscriber,
    queue: mpsc::Sender<RunnerInput>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = sub.next().await {
            let command = match parse_command(msg.subject.as_str(), &msg.payload) {
                Ok(command) => command,
                Err(e) => {
                    warn!(error = %e, "Ignoring command");
                    continue;
                }
            };
            if queue.send(RunnerInput::Command(command)).await.is_err() {
                info!("Runner queue closed, command listener exiting");
                break;
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Publishes each outbound event as one JSON message on
/// `<event_subject_prefix>.<event_type>`.
pub struct NatsEventSink {
    client: async_nats::Client,
    infrastructure: InfrastructureConfig,
}

impl NatsEventSink {
    /// Wrap a connected client.
    pub const fn new(client: async_nats::Client, infrastructure: InfrastructureConfig) -> Self {
        Self {
            client,
            infrastructure,
        }
    }
}

impl EventSink for NatsEventSink {
    async fn publish(&mut self, event: &OutboundEvent) -> Result<(), SinkError> {
        let subject = self.infrastructure.event_subject(event.event_type());
        let payload = encode(event)?;
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| SinkError::Publish(format!("{subject}: {e}")))?;
        debug!(subject, event_id = %event.event_id, "Event published");
        Ok(())
    }
}

impl std::fmt::Debug for NatsEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsEventSink")
            .field("event_subject_prefix", &self.infrastructure.event_subject_prefix)
            .field("connected", &true)
            .finish()
    }
}
