//! Tick runner: the single task that owns the world.
//!
//! This module provides [`TickRunner`], which consumes [`RunnerInput`]s from
//! a bounded queue and drives the world with them:
//!
//! - **Ticks**: run one tick and publish its events, one message each
//! - **Commands**: apply external world changes between ticks
//! - **Retry**: events that failed to publish are kept and sent before the
//!   next tick's batch, up to a bound
//! - **Clean shutdown**: the shutdown signal is only observed between
//!   inputs, so an in-flight tick always completes
//!
//! The runner wraps [`WorldSimulation::run_tick`] and adds the publishing
//! plane around it.

use std::collections::VecDeque;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use worldsim_diplomacy::{DiplomacyError, EventImpact};
use worldsim_types::{DiplomaticEventKind, FactionId, OutboundEvent, TickTrigger};

use crate::sink::EventSink;
use crate::tick::WorldSimulation;

/// An external change to the world, applied between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WorldCommand {
    /// Trigger a scripted diplomatic event.
    DiplomaticEvent {
        /// What happened.
        kind: DiplomaticEventKind,
        /// Factions involved, in role order.
        factions: Vec<FactionId>,
        /// Event parameters.
        #[serde(default)]
        impact: EventImpact,
    },
    /// Set a faction's military power.
    FactionPower {
        /// The faction to update.
        faction_id: FactionId,
        /// New military power.
        military_power: f64,
    },
    /// Register a new faction.
    RegisterFaction {
        /// Stable faction key.
        faction_id: FactionId,
        /// Display name; defaults to the id.
        #[serde(default)]
        name: String,
        /// Initial military power.
        military_power: f64,
    },
}

/// One item on the runner's inbound queue.
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerInput {
    /// A daily tick.
    Tick(TickTrigger),
    /// A world command.
    Command(WorldCommand),
}

/// Offer a tick to the runner queue without waiting.
///
/// Returns `false` when the queue is full or closed; the tick is dropped.
pub fn offer_tick(queue: &mpsc::Sender<RunnerInput>, trigger: TickTrigger) -> bool {
    match queue.try_send(RunnerInput::Tick(trigger)) {
        Ok(()) => true,
        Err(TrySendError::Full(RunnerInput::Tick(dropped))) => {
            warn!(tick_id = %dropped.tick_id, "Tick queue full, dropping tick");
            false
        }
        Err(TrySendError::Full(_)) => {
            warn!("Tick queue full, dropping tick");
            false
        }
        Err(TrySendError::Closed(_)) => {
            warn!("Tick queue closed, dropping tick");
            false
        }
    }
}

/// Counters over the runner's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Commands applied successfully.
    pub commands_applied: u64,
    /// Commands rejected by the world.
    pub commands_rejected: u64,
    /// Events published.
    pub events_published: u64,
    /// Events dropped because the retry buffer was full.
    pub events_dropped: u64,
}

/// Owns the world and an event sink, and processes inputs one at a time.
#[derive(Debug)]
pub struct TickRunner<S> {
    world: WorldSimulation,
    sink: S,
    pending: VecDeque<OutboundEvent>,
    max_pending: usize,
    stats: RunnerStats,
}

impl<S: EventSink> TickRunner<S> {
    /// Create a runner retaining at most `max_pending` unpublished events.
    ///
    /// A bound of zero is raised to one so the current event can always be
    /// attempted.
    pub const fn new(world: WorldSimulation, sink: S, max_pending: usize) -> Self {
        Self {
            world,
            sink,
            pending: VecDeque::new(),
            max_pending: if max_pending == 0 { 1 } else { max_pending },
            stats: RunnerStats {
                ticks: 0,
                commands_applied: 0,
                commands_rejected: 0,
                events_published: 0,
                events_dropped: 0,
            },
        }
    }

    /// Process inputs until the queue closes or `shutdown` resolves, then
    /// make a last attempt at retained events and hand the runner back.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<RunnerInput>,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Self {
        tokio::pin!(shutdown);
        info!(max_pending = self.max_pending, "Tick runner starting");

        loop {
            let input = tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                input = inbound.recv() => input,
            };

            match input {
                Some(RunnerInput::Tick(trigger)) => self.handle_tick(&trigger).await,
                Some(RunnerInput::Command(command)) => self.handle_command(command),
                None => {
                    info!("Runner queue closed");
                    break;
                }
            }
        }

        self.flush_pending().await;
        info!(
            ticks = self.stats.ticks,
            published = self.stats.events_published,
            dropped = self.stats.events_dropped,
            pending = self.pending.len(),
            "Tick runner stopped"
        );
        self
    }

    /// Run one tick and publish its events, after any retained ones.
    pub async fn handle_tick(&mut self, trigger: &TickTrigger) {
        // Subsystem failures are logged by the world.
        let report = self.world.run_tick(trigger);
        self.stats.ticks = self.stats.ticks.saturating_add(1);

        for event in report.events {
            self.retain(event);
        }
        self.flush_pending().await;
    }

    /// Apply a world command, counting and logging the outcome.
    pub fn handle_command(&mut self, command: WorldCommand) {
        match self.apply_command(command) {
            Ok(()) => {
                self.stats.commands_applied = self.stats.commands_applied.saturating_add(1);
                debug!("World command applied");
            }
            Err(err) => {
                self.stats.commands_rejected = self.stats.commands_rejected.saturating_add(1);
                warn!(error = %err, "World command rejected");
            }
        }
    }

    /// Apply a world command to the world.
    pub fn apply_command(&mut self, command: WorldCommand) -> Result<(), DiplomacyError> {
        match command {
            WorldCommand::DiplomaticEvent {
                kind,
                factions,
                impact,
            } => self
                .world
                .diplomacy
                .trigger_diplomatic_event(kind, &factions, impact),
            WorldCommand::FactionPower {
                faction_id,
                military_power,
            } => self
                .world
                .diplomacy
                .faction_mut(&faction_id)
                .map(|faction| faction.update_power(military_power)),
            WorldCommand::RegisterFaction {
                faction_id,
                name,
                military_power,
            } => self
                .world
                .diplomacy
                .register_faction(faction_id, military_power, &name),
        }
    }

    /// Events waiting to be published.
    pub fn pending(&self) -> &VecDeque<OutboundEvent> {
        &self.pending
    }

    /// Lifetime counters.
    pub const fn stats(&self) -> RunnerStats {
        self.stats
    }

    /// The world this runner drives.
    pub const fn world(&self) -> &WorldSimulation {
        &self.world
    }

    /// The sink this runner publishes to.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// The sink, for tests that need to reconfigure it.
    pub const fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Queue an event for publishing, dropping the oldest beyond the bound.
    fn retain(&mut self, event: OutboundEvent) {
        self.pending.push_back(event);
        while self.pending.len() > self.max_pending {
            if let Some(dropped) = self.pending.pop_front() {
                self.stats.events_dropped = self.stats.events_dropped.saturating_add(1);
                warn!(
                    event_id = %dropped.event_id,
                    event_type = dropped.event_type(),
                    "Retry buffer full, dropping oldest event"
                );
            }
        }
    }

    /// Publish retained events in order, stopping at the first failure.
    async fn flush_pending(&mut self) {
        while let Some(event) = self.pending.front() {
            match self.sink.publish(event).await {
                Ok(()) => {
                    debug!(event_type = event.event_type(), "Event published");
                    self.pending.pop_front();
                    self.stats.events_published = self.stats.events_published.saturating_add(1);
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        pending = self.pending.len(),
                        "Publish failed, retaining events for retry"
                    );
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use worldsim_diplomacy::{DiplomacyEngine, NoNoise};
    use worldsim_types::TickId;

    use super::*;
    use crate::sink::MemorySink;

    fn runner(max_pending: usize) -> TickRunner<MemorySink> {
        let mut diplomacy = DiplomacyEngine::with_noise(Box::new(NoNoise));
        diplomacy.register_faction(FactionId::new("a"), 1.0, "A").unwrap();
        diplomacy.register_faction(FactionId::new("b"), 1.0, "B").unwrap();
        let world = WorldSimulation::new(diplomacy, None, false);
        TickRunner::new(world, MemorySink::new(), max_pending)
    }

    #[test]
    fn commands_parse_from_json() {
        let command: WorldCommand = serde_json::from_str(concat!(
            r#"{"command":"diplomatic_event","kind":"betrayal","#,
            r#""factions":["a","b"],"impact":{"duration_days":90}}"#,
        ))
        .unwrap();
        assert_eq!(
            command,
            WorldCommand::DiplomaticEvent {
                kind: DiplomaticEventKind::Betrayal,
                factions: vec![FactionId::new("a"), FactionId::new("b")],
                impact: EventImpact {
                    duration_days: Some(90)
                },
            }
        );

        let command: WorldCommand = serde_json::from_str(
            r#"{"command":"faction_power","faction_id":"a","military_power":12.0}"#,
        )
        .unwrap();
        assert!(matches!(command, WorldCommand::FactionPower { .. }));
    }

    #[tokio::test]
    async fn failed_publishes_are_retried_before_next_batch() {
        let mut runner = runner(100);
        runner.sink_mut().fail_next(1);

        runner.handle_tick(&TickTrigger::now(TickId::from(1))).await;
        assert_eq!(runner.pending().len(), 1);
        assert!(runner.sink().published.is_empty());

        runner.handle_tick(&TickTrigger::now(TickId::from(2))).await;
        assert!(runner.pending().is_empty());
        let ticks: Vec<_> = runner.sink().published.iter().map(|e| e.tick_id.clone()).collect();
        assert_eq!(ticks, vec![TickId::from(1), TickId::from(2)]);
    }

    #[tokio::test]
    async fn retry_buffer_drops_oldest() {
        let mut runner = runner(2);
        runner.sink_mut().fail_next(usize::MAX);
        for n in 0..4_u64 {
            runner.handle_tick(&TickTrigger::now(TickId::from(n))).await;
        }
        assert_eq!(runner.pending().len(), 2);
        assert_eq!(runner.stats().events_dropped, 2);
        assert_eq!(runner.pending()[0].tick_id, TickId::from(2));
    }

    #[test]
    fn commands_change_the_world() {
        let mut runner = runner(10);
        runner.handle_command(WorldCommand::FactionPower {
            faction_id: FactionId::new("a"),
            military_power: 12.0,
        });
        let power = runner
            .world()
            .diplomacy
            .faction(&FactionId::new("a"))
            .unwrap()
            .military_power;
        assert!((power - 12.0).abs() < f64::EPSILON);

        let lone_war = WorldCommand::DiplomaticEvent {
            kind: DiplomaticEventKind::WarDeclaration,
            factions: vec![FactionId::new("a")],
            impact: EventImpact::default(),
        };
        assert!(matches!(
            runner.apply_command(lone_war.clone()),
            Err(DiplomacyError::InsufficientFactions { .. })
        ));
        runner.handle_command(lone_war);
        assert_eq!(runner.stats().commands_applied, 1);
        assert_eq!(runner.stats().commands_rejected, 1);
    }

    #[tokio::test]
    async fn zero_retry_bound_still_publishes() {
        let mut runner = runner(0);
        runner.handle_tick(&TickTrigger::now(TickId::from(1))).await;
        assert!(!runner.sink().published.is_empty());
        assert_eq!(runner.stats().events_dropped, 0);
    }

    #[test]
    fn full_queue_drops_ticks() {
        let (tx, _rx) = mpsc::channel(1);
        assert!(offer_tick(&tx, TickTrigger::now(TickId::from(1))));
        assert!(!offer_tick(&tx, TickTrigger::now(TickId::from(2))));
    }
}
