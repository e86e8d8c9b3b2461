//! Raw per-agent signals and their per-step aggregation.
//!
//! Agents emit raw signals while stepping. At the end of a step the model
//! folds them into at most three summaries, one per [`SignalType`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use worldsim_types::{AgentId, Behavior, GridPos, SignalType};

/// Movement counts above this produce a population-movement summary.
pub const MOVEMENT_SIGNAL_THRESHOLD: u64 = 10;

/// Something one agent did during a step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawSignal {
    /// The agent moved to a neighboring cell.
    Movement {
        /// Who moved.
        agent: AgentId,
        /// Cell left.
        from: GridPos,
        /// Cell entered.
        to: GridPos,
    },
    /// The agent bought food.
    Purchase {
        /// Who paid.
        agent: AgentId,
        /// Price paid.
        cost: u32,
        /// Vendor cell.
        location: GridPos,
    },
    /// The agent posted a message.
    SocialPost {
        /// Who posted.
        agent: AgentId,
        /// Message text.
        content: String,
        /// Poster's influence score.
        influence: f64,
        /// Where the post was made.
        location: GridPos,
    },
}

/// Aggregated view of one step's raw signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal_type", rename_all = "snake_case")]
pub enum SummarySignal {
    /// Food purchases happened this step.
    FoodDemand {
        /// Step that produced the summary.
        step: u64,
        /// Number of purchases.
        purchases: u64,
        /// Sum of all purchase costs.
        total_spent: u64,
        /// Human-readable description.
        description: String,
    },
    /// Posts happened this step; carries the most influential one.
    RumorSpread {
        /// Step that produced the summary.
        step: u64,
        /// Content of the most influential post.
        content: String,
        /// Influence of that post.
        influence: f64,
        /// Number of posts.
        total_posts: u64,
        /// Human-readable description.
        description: String,
    },
    /// Many agents moved this step.
    PopulationMovement {
        /// Step that produced the summary.
        step: u64,
        /// Number of movements.
        movement_count: u64,
        /// Human-readable description.
        description: String,
    },
}

impl SummarySignal {
    /// The sub-type of this summary.
    pub const fn signal_type(&self) -> SignalType {
        match self {
            Self::FoodDemand { .. } => SignalType::FoodDemand,
            Self::RumorSpread { .. } => SignalType::RumorSpread,
            Self::PopulationMovement { .. } => SignalType::PopulationMovement,
        }
    }

    /// The step that produced this summary.
    pub const fn step(&self) -> u64 {
        match self {
            Self::FoodDemand { step, .. }
            | Self::RumorSpread { step, .. }
            | Self::PopulationMovement { step, .. } => *step,
        }
    }
}

/// Statistics of the most recent step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStats {
    /// Step number.
    pub step: u64,
    /// Population size.
    pub total_agents: usize,
    /// Raw signals emitted.
    pub raw_signals: usize,
    /// Agents per chosen behavior.
    pub behaviors: BTreeMap<Behavior, usize>,
}

/// Fold one step's raw signals into summaries.
///
/// Produces, in order: a food-demand summary if anything was bought, a
/// rumor summary if anything was posted, and a movement summary if more
/// than [`MOVEMENT_SIGNAL_THRESHOLD`] agents moved. Rumor ties go to the
/// first post seen.
pub fn aggregate(step: u64, signals: &[RawSignal]) -> Vec<SummarySignal> {
    let mut purchases: u64 = 0;
    let mut total_spent: u64 = 0;
    let mut movements: u64 = 0;
    let mut posts: u64 = 0;
    let mut top_post: Option<(&str, f64)> = None;

    for signal in signals {
        match signal {
            RawSignal::Movement { .. } => movements = movements.saturating_add(1),
            RawSignal::Purchase { cost, .. } => {
                purchases = purchases.saturating_add(1);
                total_spent = total_spent.saturating_add(u64::from(*cost));
            }
            RawSignal::SocialPost {
                content, influence, ..
            } => {
                posts = posts.saturating_add(1);
                let beats_top = top_post.is_none_or(|(_, best)| *influence > best);
                if beats_top {
                    top_post = Some((content.as_str(), *influence));
                }
            }
        }
    }

    let mut summaries = Vec::with_capacity(3);

    if purchases > 0 {
        summaries.push(SummarySignal::FoodDemand {
            step,
            purchases,
            total_spent,
            description: format!(
                "Food demand increased: {purchases} purchases, {total_spent} currency units spent"
            ),
        });
    }

    if let Some((content, influence)) = top_post {
        summaries.push(SummarySignal::RumorSpread {
            step,
            content: content.to_owned(),
            influence,
            total_posts: posts,
            description: format!("Social buzz: {posts} posts, trending: '{content}'"),
        });
    }

    if movements > MOVEMENT_SIGNAL_THRESHOLD {
        summaries.push(SummarySignal::PopulationMovement {
            step,
            movement_count: movements,
            description: format!("High population movement: {movements} agents moving"),
        });
    }

    summaries
}
