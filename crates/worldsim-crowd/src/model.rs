//! The crowd world: grid, population, and per-step aggregation.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};
use worldsim_types::{AgentId, GridPos, LocationType};

use crate::agent::CrowdAgent;
use crate::error::CrowdError;
use crate::grid::CityGrid;
use crate::signal::{RawSignal, StepStats, SummarySignal, aggregate};

/// A grid populated by crowd agents, stepped once per tick.
///
/// All randomness (location placement, agent attributes, behavior) comes
/// from one RNG seeded at construction, so equal seeds give equal runs.
#[derive(Debug, Clone)]
pub struct WorldModel {
    grid: CityGrid,
    agents: Vec<CrowdAgent>,
    /// Raw signals of the step in progress; cleared when a step starts.
    signals: Vec<RawSignal>,
    step: u64,
    rng: StdRng,
    last_summaries: Vec<SummarySignal>,
    last_stats: StepStats,
}

impl WorldModel {
    /// Build a `width x height` world with `num_agents` agents.
    pub fn new(width: u32, height: u32, num_agents: u64, seed: u64) -> Result<Self, CrowdError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let grid = CityGrid::generate(width, height, &mut rng)?;

        let agents: Vec<CrowdAgent> = (0..num_agents)
            .map(|i| CrowdAgent::spawn(AgentId(i), &grid, &mut rng))
            .collect();

        info!(
            width,
            height,
            agents = agents.len(),
            food_vendors = grid.count_of(LocationType::FoodVendor),
            social_spots = grid.count_of(LocationType::SocialSpot),
            seed,
            "Crowd world initialized"
        );

        Ok(Self {
            grid,
            agents,
            signals: Vec::new(),
            step: 0,
            rng,
            last_summaries: Vec::new(),
            last_stats: StepStats::default(),
        })
    }

    /// Run every agent once and aggregate what they did.
    ///
    /// Returns the summaries of this step; they stay readable through
    /// [`last_summaries`](Self::last_summaries) until the next step.
    pub fn step(&mut self) -> Vec<SummarySignal> {
        self.signals.clear();

        let mut behaviors = BTreeMap::new();
        for agent in &mut self.agents {
            let behavior = agent.step(&self.grid, &mut self.rng, &mut self.signals);
            let count = behaviors.entry(behavior).or_insert(0_usize);
            *count = count.saturating_add(1);
        }

        self.step = self.step.saturating_add(1);
        let summaries = aggregate(self.step, &self.signals);

        self.last_stats = StepStats {
            step: self.step,
            total_agents: self.agents.len(),
            raw_signals: self.signals.len(),
            behaviors,
        };
        debug!(step = self.step, behaviors = ?self.last_stats.behaviors, "Crowd step stats");
        info!(
            step = self.step,
            summaries = summaries.len(),
            raw_signals = self.signals.len(),
            "Crowd step complete"
        );

        self.last_summaries.clone_from(&summaries);
        summaries
    }

    /// Steps completed so far.
    pub const fn step_count(&self) -> u64 {
        self.step
    }

    /// The population.
    pub fn agents(&self) -> &[CrowdAgent] {
        &self.agents
    }

    /// The grid.
    pub const fn grid(&self) -> &CityGrid {
        &self.grid
    }

    /// Location type of a cell.
    pub fn location_type(&self, pos: GridPos) -> LocationType {
        self.grid.location_type(pos)
    }

    /// Raw signals of the most recent step.
    pub fn raw_signals(&self) -> &[RawSignal] {
        &self.signals
    }

    /// Summaries of the most recent step.
    pub fn last_summaries(&self) -> &[SummarySignal] {
        &self.last_summaries
    }

    /// Statistics of the most recent step.
    pub const fn last_step_stats(&self) -> &StepStats {
        &self.last_stats
    }
}
