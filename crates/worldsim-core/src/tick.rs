//! Tick cycle: one daily tick across both world subsystems.
//!
//! Each tick runs these phases:
//!
//! 1. **Diplomacy** -- evaluate every faction pair, summarize the landscape,
//!    then advance passive trust drift by one day.
//!
//! 2. **Crowd** -- step the crowd model once, if enabled.
//!
//! 3. **Emit** -- convert both outputs into outbound events, diplomacy
//!    first: one `diplomacy_evaluation`, one `diplomacy_state_change` per
//!    pair at `WAR` or `ALLIANCE`, then one event per crowd summary.
//!
//! The two subsystems share no state, so phases 1 and 2 may run on two
//! scoped worker threads. A subsystem that errors or panics is reported in
//! the [`TickReport`] and the other subsystem's events are still emitted.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tracing::{error, info};
use worldsim_crowd::{CrowdError, SummarySignal, WorldModel};
use worldsim_diplomacy::{DiplomacyEngine, DiplomacyError, UniformNoise};
use worldsim_types::{
    DiplomacySummary, DiplomaticState, EventPayload, FactionId, OutboundEvent, PairKey,
    SignalType, TickTrigger,
};

use crate::config::WorldSimConfig;

/// Errors that can occur while building or running a tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A diplomacy operation failed.
    #[error("diplomacy error: {source}")]
    Diplomacy {
        /// The underlying diplomacy error.
        #[from]
        source: DiplomacyError,
    },

    /// The crowd model could not be built.
    #[error("crowd error: {source}")]
    Crowd {
        /// The underlying crowd error.
        #[from]
        source: CrowdError,
    },

    /// A subsystem worker panicked.
    #[error("{subsystem} panicked: {message}")]
    Panicked {
        /// Which subsystem panicked.
        subsystem: Subsystem,
        /// The panic payload, if it was a string.
        message: String,
    },
}

/// The two independently failing halves of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    /// Faction diplomacy.
    Diplomacy,
    /// Crowd model.
    Crowd,
}

impl core::fmt::Display for Subsystem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Diplomacy => f.write_str("diplomacy"),
            Self::Crowd => f.write_str("crowd"),
        }
    }
}

/// A subsystem that produced no events this tick, and why.
#[derive(Debug)]
pub struct SubsystemFailure {
    /// Which subsystem failed.
    pub subsystem: Subsystem,
    /// What went wrong.
    pub error: TickError,
}

/// Result of one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Events to publish, diplomacy first.
    pub events: Vec<OutboundEvent>,
    /// Subsystems that failed this tick.
    pub failures: Vec<SubsystemFailure>,
}

/// The crowd half of a tick.
///
/// Implemented by [`WorldModel`]; tests substitute models that fail.
pub trait CrowdModel: Send + core::fmt::Debug {
    /// Advance one step and return its summaries.
    fn step(&mut self) -> Vec<SummarySignal>;

    /// Steps completed so far.
    fn step_count(&self) -> u64;

    /// Number of simulated agents.
    fn population(&self) -> usize;
}

impl CrowdModel for WorldModel {
    fn step(&mut self) -> Vec<SummarySignal> {
        Self::step(self)
    }

    fn step_count(&self) -> u64 {
        Self::step_count(self)
    }

    fn population(&self) -> usize {
        self.agents().len()
    }
}

/// Output of the diplomacy phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiplomacyTickOutput {
    /// Evaluated state per pair.
    pub results: BTreeMap<PairKey, DiplomaticState>,
    /// Landscape after evaluation.
    pub summary: DiplomacySummary,
}

// ---------------------------------------------------------------------------
// WorldSimulation
// ---------------------------------------------------------------------------

/// Both world subsystems and how a tick drives them.
#[derive(Debug)]
pub struct WorldSimulation {
    /// Faction diplomacy.
    pub diplomacy: DiplomacyEngine,
    /// Crowd model; `None` when the crowd is disabled.
    pub crowd: Option<Box<dyn CrowdModel>>,
    /// Run the subsystems on worker threads.
    pub parallel: bool,
    ticks: u64,
}

impl WorldSimulation {
    /// Assemble a simulation from already-built subsystems.
    pub const fn new(
        diplomacy: DiplomacyEngine,
        crowd: Option<Box<dyn CrowdModel>>,
        parallel: bool,
    ) -> Self {
        Self {
            diplomacy,
            crowd,
            parallel,
            ticks: 0,
        }
    }

    /// Build both subsystems from configuration and register the starting
    /// faction roster.
    pub fn from_config(config: &WorldSimConfig) -> Result<Self, TickError> {
        let seed = config.world.seed;
        let noise = UniformNoise::seeded(seed, config.diplomacy.noise_amplitude);
        let mut diplomacy = DiplomacyEngine::with_noise(Box::new(noise));

        for seed_faction in &config.diplomacy.factions {
            let id = FactionId::new(seed_faction.id.as_str());
            let power = seed_faction.military_power;
            diplomacy.register_faction(id.clone(), power, &seed_faction.name)?;
            let faction = diplomacy.faction_mut(&id)?;
            faction.economic_strength = seed_faction.economic_strength.max(0.0);
            faction.territory_size = seed_faction.territory_size.max(0.0);
            faction.technology_level = seed_faction.technology_level.max(0.0);
        }

        let crowd: Option<Box<dyn CrowdModel>> = if config.crowd.enabled {
            Some(Box::new(WorldModel::new(
                config.crowd.grid_width,
                config.crowd.grid_height,
                config.crowd.initial_agents,
                seed,
            )?))
        } else {
            None
        };

        info!(
            factions = diplomacy.faction_count(),
            crowd_enabled = crowd.is_some(),
            parallel = config.orchestrator.parallel_subsystems,
            "World simulation built"
        );

        Ok(Self::new(
            diplomacy,
            crowd,
            config.orchestrator.parallel_subsystems,
        ))
    }

    /// Ticks completed so far.
    pub const fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Run one tick for `trigger`.
    pub fn run_tick(&mut self, trigger: &TickTrigger) -> TickReport {
        let (diplomacy, crowd) = if self.parallel {
            self.run_parallel()
        } else {
            self.run_sequential()
        };

        let mut report = TickReport::default();

        match diplomacy {
            Ok(output) => report.events.extend(
                diplomacy_payloads(&output)
                    .into_iter()
                    .map(|payload| OutboundEvent::new(trigger, payload)),
            ),
            Err(err) => {
                error!(tick_id = %trigger.tick_id, error = %err, "Diplomacy phase failed");
                report.failures.push(SubsystemFailure {
                    subsystem: Subsystem::Diplomacy,
                    error: err,
                });
            }
        }

        match crowd {
            Some(Ok(summaries)) => report.events.extend(
                summaries
                    .into_iter()
                    .map(|summary| OutboundEvent::new(trigger, crowd_payload(summary))),
            ),
            Some(Err(err)) => {
                error!(tick_id = %trigger.tick_id, error = %err, "Crowd phase failed");
                report.failures.push(SubsystemFailure {
                    subsystem: Subsystem::Crowd,
                    error: err,
                });
            }
            None => {}
        }

        self.ticks = self.ticks.saturating_add(1);
        info!(
            tick_id = %trigger.tick_id,
            tick = self.ticks,
            events = report.events.len(),
            failures = report.failures.len(),
            "Tick complete"
        );
        report
    }

    fn run_parallel(
        &mut self,
    ) -> (
        Result<DiplomacyTickOutput, TickError>,
        Option<Result<Vec<SummarySignal>, TickError>>,
    ) {
        let diplomacy = &mut self.diplomacy;
        let crowd = self.crowd.as_mut();

        thread::scope(|scope| {
            let diplomacy_worker = scope.spawn(move || run_diplomacy(diplomacy));
            let crowd_worker = crowd.map(|model| scope.spawn(move || model.step()));

            // Joined explicitly so a panic stays inside its own result.
            let diplomacy = diplomacy_worker
                .join()
                .map_err(|payload| panicked(Subsystem::Diplomacy, payload.as_ref()))
                .and_then(|result| result.map_err(TickError::from));
            let crowd = crowd_worker.map(|worker| {
                worker
                    .join()
                    .map_err(|payload| panicked(Subsystem::Crowd, payload.as_ref()))
            });
            (diplomacy, crowd)
        })
    }

    fn run_sequential(
        &mut self,
    ) -> (
        Result<DiplomacyTickOutput, TickError>,
        Option<Result<Vec<SummarySignal>, TickError>>,
    ) {
        let diplomacy = &mut self.diplomacy;
        let diplomacy = panic::catch_unwind(AssertUnwindSafe(|| run_diplomacy(diplomacy)))
            .map_err(|payload| panicked(Subsystem::Diplomacy, payload.as_ref()))
            .and_then(|result| result.map_err(TickError::from));

        let crowd = self.crowd.as_mut().map(|model| {
            panic::catch_unwind(AssertUnwindSafe(|| model.step()))
                .map_err(|payload| panicked(Subsystem::Crowd, payload.as_ref()))
        });

        (diplomacy, crowd)
    }
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Evaluate, summarize, then drift one day.
pub fn run_diplomacy(engine: &mut DiplomacyEngine) -> Result<DiplomacyTickOutput, DiplomacyError> {
    let results = engine.evaluate_all_relations()?;
    let summary = engine.diplomacy_summary();
    engine.simulate_time_step(1);
    Ok(DiplomacyTickOutput { results, summary })
}

/// Payloads for one diplomacy phase: the evaluation, then one state-change
/// event per pair at an extreme state.
pub fn diplomacy_payloads(output: &DiplomacyTickOutput) -> Vec<EventPayload> {
    let results = output
        .results
        .iter()
        .map(|(key, state)| (key.to_string(), *state))
        .collect();

    let mut payloads = vec![EventPayload::DiplomacyEvaluation {
        results,
        summary: output.summary.clone(),
    }];

    payloads.extend(
        output
            .results
            .iter()
            .filter(|(_, state)| state.is_extreme())
            .map(|(key, state)| EventPayload::DiplomacyStateChange {
                relation_key: key.to_string(),
                faction_a: key.low().clone(),
                faction_b: key.high().clone(),
                new_state: *state,
            }),
    );
    payloads
}

/// Payload for one crowd summary.
pub fn crowd_payload(summary: SummarySignal) -> EventPayload {
    match summary {
        SummarySignal::FoodDemand {
            step,
            purchases,
            total_spent,
            description,
        } => EventPayload::EconomicSignal {
            signal_type: SignalType::FoodDemand,
            value: purchases,
            total_spent,
            description,
            step,
        },
        SummarySignal::RumorSpread {
            step,
            content,
            influence,
            total_posts,
            description,
        } => EventPayload::SocialSignal {
            signal_type: SignalType::RumorSpread,
            content,
            influence,
            total_posts,
            description,
            step,
        },
        SummarySignal::PopulationMovement {
            step,
            movement_count,
            description,
        } => EventPayload::CrowdSignal {
            signal_type: SignalType::PopulationMovement,
            movement_count,
            description,
            step,
        },
    }
}

fn panicked(subsystem: Subsystem, payload: &(dyn Any + Send)) -> TickError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned());
    TickError::Panicked { subsystem, message }
}
