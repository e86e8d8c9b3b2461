//! Crowd agents: one simulated city inhabitant each.
//!
//! Every step an agent's needs drift, it picks a behavior by priority, and
//! executing that behavior may emit one raw signal:
//!
//! 1. Hunger rises by `U(1, 3)`; social drive wanders by `U(-5, 5)`.
//! 2. Behavior, first match wins: hunger above 80 buys food; social drive
//!    above 70 tweets 30% of the time; otherwise walk 60% of the time;
//!    otherwise idle.
//! 3. Walking moves to a random neighboring cell. Buying food pays at a
//!    vendor or heads for the nearest one. Tweeting posts a phrase and
//!    relieves social drive.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use tracing::debug;
use worldsim_types::{AgentId, Behavior, GridPos, LocationType};

use crate::grid::{CityGrid, step_toward};
use crate::signal::RawSignal;

/// Upper bound of hunger and social drive.
pub const NEED_MAX: f64 = 100.0;

/// Hunger above which an agent goes looking for food.
pub const HUNGER_THRESHOLD: f64 = 80.0;

/// Social drive above which an agent may tweet.
pub const SOCIAL_THRESHOLD: f64 = 70.0;

/// Chance a socially driven agent actually tweets.
pub const TWEET_PROBABILITY: f64 = 0.3;

/// Chance an otherwise idle agent walks.
pub const WALK_PROBABILITY: f64 = 0.6;

/// Phrases a tweeting agent picks from.
pub const TWEET_PHRASES: [&str; 6] = [
    "Something strange is going on down by the docks...",
    "Food prices went up again today!",
    "Met a few interesting people at the bar tonight",
    "This city never sleeps",
    "Another late shift, another long walk home",
    "Has anyone seen the patrols on the east side?",
];

/// One inhabitant of the city grid.
#[derive(Debug, Clone, Serialize)]
pub struct CrowdAgent {
    /// Sequential id, starting at 0.
    pub id: AgentId,
    /// Age in years, 18 to 65.
    pub age: u8,
    /// Money in currency units.
    pub wealth: u32,
    hunger: f64,
    social_drive: f64,
    /// Cells per step. Carried for movement tuning; steps move one cell.
    pub movement_speed: f64,
    /// Current cell.
    pub position: GridPos,
    /// Home cell in the residential quarter.
    pub home: GridPos,
    /// Behavior chosen on the last step.
    pub behavior: Behavior,
    /// How far this agent's posts carry, 0 to 10.
    pub influence: f64,
}

impl CrowdAgent {
    /// Create an agent at a random home in the residential quarter.
    pub fn spawn(id: AgentId, grid: &CityGrid, rng: &mut impl Rng) -> Self {
        let home = grid.random_residential_cell(rng);
        Self {
            id,
            age: rng.random_range(18..=65),
            wealth: rng.random_range(50..=500),
            hunger: rng.random_range(0.0..=NEED_MAX),
            social_drive: rng.random_range(0.0..=NEED_MAX),
            movement_speed: rng.random_range(0.5..=2.0),
            position: home,
            home,
            behavior: Behavior::Idle,
            influence: rng.random_range(0.0..=10.0),
        }
    }

    /// Hunger in `[0, 100]`.
    pub const fn hunger(&self) -> f64 {
        self.hunger
    }

    /// Social drive in `[0, 100]`.
    pub const fn social_drive(&self) -> f64 {
        self.social_drive
    }

    /// Run one step, pushing any raw signal onto `signals`.
    pub fn step(
        &mut self,
        grid: &CityGrid,
        rng: &mut impl Rng,
        signals: &mut Vec<RawSignal>,
    ) -> Behavior {
        self.update_needs(rng);
        let behavior = self.choose_behavior(rng);
        self.behavior = behavior;

        match behavior {
            Behavior::Walk => self.walk(grid, rng, signals),
            Behavior::BuyFood => self.buy_food(grid, rng, signals),
            Behavior::Tweet => self.tweet(rng, signals),
            Behavior::Idle => {}
        }
        behavior
    }

    fn update_needs(&mut self, rng: &mut impl Rng) {
        self.hunger = (self.hunger + rng.random_range(1.0..=3.0)).min(NEED_MAX);
        self.social_drive =
            (self.social_drive + rng.random_range(-5.0..=5.0)).clamp(0.0, NEED_MAX);
    }

    fn choose_behavior(&self, rng: &mut impl Rng) -> Behavior {
        if self.hunger > HUNGER_THRESHOLD {
            Behavior::BuyFood
        } else if self.social_drive > SOCIAL_THRESHOLD && rng.random_bool(TWEET_PROBABILITY) {
            Behavior::Tweet
        } else if rng.random_bool(WALK_PROBABILITY) {
            Behavior::Walk
        } else {
            Behavior::Idle
        }
    }

    fn walk(&mut self, grid: &CityGrid, rng: &mut impl Rng, signals: &mut Vec<RawSignal>) {
        let Some(&to) = grid.neighbors(self.position).choose(rng) else {
            return;
        };
        signals.push(RawSignal::Movement {
            agent: self.id,
            from: self.position,
            to,
        });
        self.position = to;
    }

    fn buy_food(&mut self, grid: &CityGrid, rng: &mut impl Rng, signals: &mut Vec<RawSignal>) {
        if grid.location_type(self.position) != LocationType::FoodVendor {
            if let Some(vendor) = grid.nearest_food_vendor(self.position) {
                self.position = step_toward(self.position, vendor);
            }
            return;
        }

        let cost: u32 = rng.random_range(10..=30);
        match self.wealth.checked_sub(cost) {
            Some(remaining) => {
                self.wealth = remaining;
                self.hunger = (self.hunger - rng.random_range(40.0..=60.0)).max(0.0);
                debug!(agent_id = %self.id, cost, location = %self.position, "Agent bought food");
                signals.push(RawSignal::Purchase {
                    agent: self.id,
                    cost,
                    location: self.position,
                });
            }
            None => self.walk(grid, rng, signals),
        }
    }

    fn tweet(&mut self, rng: &mut impl Rng, signals: &mut Vec<RawSignal>) {
        let content = TWEET_PHRASES.choose(rng).copied().unwrap_or_default();
        debug!(agent_id = %self.id, content, "Agent posted");
        signals.push(RawSignal::SocialPost {
            agent: self.id,
            content: content.to_owned(),
            influence: self.influence,
            location: self.position,
        });
        self.social_drive = (self.social_drive - rng.random_range(20.0..=40.0)).max(0.0);
    }
}
