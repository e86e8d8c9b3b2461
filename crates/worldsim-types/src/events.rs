//! Wire envelopes for the tick orchestrator.
//!
//! The orchestrator consumes a [`TickTrigger`] from the daily-tick subject
//! and publishes one [`OutboundEvent`] per emitted event. Each outbound event
//! is a flat JSON object: the envelope fields (`event_id`, `timestamp`,
//! `tick_id`, `tick_timestamp`) plus the `event_type` tag and the fields of
//! the matching [`EventPayload`] variant.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{DiplomaticState, SignalType};
use crate::ids::FactionId;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Opaque tick identifier supplied by the scheduler. Either a string or a
/// number on the wire; echoed back unchanged.
///
/// Any JSON number is accepted, including negative and fractional ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TickId {
    /// Numeric tick identifier.
    Number(serde_json::Number),
    /// String tick identifier.
    Text(String),
}

impl From<u64> for TickId {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl core::fmt::Display for TickId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A daily-tick notification. Treated purely as a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickTrigger {
    /// Identifier echoed into every emitted event.
    pub tick_id: TickId,
    /// When the scheduler fired the tick. Defaults to receipt time.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TickTrigger {
    /// Build a trigger stamped with the current time.
    pub fn now(tick_id: TickId) -> Self {
        Self {
            tick_id,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Snapshot of the diplomatic landscape after an evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiplomacySummary {
    /// Number of registered factions.
    pub total_factions: usize,
    /// Number of faction pairs (each relation counted once).
    pub relations_count: usize,
    /// Number of relations currently in each state.
    pub state_distribution: BTreeMap<DiplomaticState, usize>,
    /// Number of scripted diplomatic events recorded so far.
    pub recent_events: usize,
    /// Number of active treaties across all relations.
    pub active_treaties: usize,
}

/// Event-specific body of an outbound event, tagged by `event_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Full result of one evaluation pass over every faction pair.
    DiplomacyEvaluation {
        /// Pair key (`"{a}_{b}"`) to evaluated state.
        results: BTreeMap<String, DiplomaticState>,
        /// Landscape summary.
        summary: DiplomacySummary,
    },
    /// A pair that evaluated to `WAR` or `ALLIANCE` this tick.
    DiplomacyStateChange {
        /// Pair key (`"{a}_{b}"`).
        relation_key: String,
        /// First faction of the canonical pair.
        faction_a: FactionId,
        /// Second faction of the canonical pair.
        faction_b: FactionId,
        /// The evaluated state.
        new_state: DiplomaticState,
    },
    /// Aggregated purchase activity.
    EconomicSignal {
        /// Always [`SignalType::FoodDemand`].
        signal_type: SignalType,
        /// Number of purchases.
        value: u64,
        /// Total currency spent.
        total_spent: u64,
        /// Human-readable summary.
        description: String,
        /// Crowd step that produced the signal.
        step: u64,
    },
    /// Aggregated social activity.
    SocialSignal {
        /// Always [`SignalType::RumorSpread`].
        signal_type: SignalType,
        /// Content of the most influential post.
        content: String,
        /// Influence score of that post.
        influence: f64,
        /// Number of posts.
        total_posts: u64,
        /// Human-readable summary.
        description: String,
        /// Crowd step that produced the signal.
        step: u64,
    },
    /// Aggregated movement activity.
    CrowdSignal {
        /// Always [`SignalType::PopulationMovement`].
        signal_type: SignalType,
        /// Number of movements.
        movement_count: u64,
        /// Human-readable summary.
        description: String,
        /// Crowd step that produced the signal.
        step: u64,
    },
}

impl EventPayload {
    /// The `event_type` tag of this payload.
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::DiplomacyEvaluation { .. } => "diplomacy_evaluation",
            Self::DiplomacyStateChange { .. } => "diplomacy_state_change",
            Self::EconomicSignal { .. } => "economic_signal",
            Self::SocialSignal { .. } => "social_signal",
            Self::CrowdSignal { .. } => "crowd_signal",
        }
    }
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    /// Unique, time-ordered event id.
    pub event_id: Uuid,
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
    /// Tick identifier from the trigger.
    pub tick_id: TickId,
    /// Timestamp from the trigger.
    pub tick_timestamp: DateTime<Utc>,
    /// Event-specific fields, including the `event_type` tag.
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl OutboundEvent {
    /// Wrap a payload in an envelope for the given trigger.
    pub fn new(trigger: &TickTrigger, payload: EventPayload) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            timestamp: Utc::now(),
            tick_id: trigger.tick_id.clone(),
            tick_timestamp: trigger.timestamp,
            payload,
        }
    }

    /// The `event_type` tag of this event.
    pub const fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn trigger_accepts_numeric_and_text_ids() {
        let numeric: TickTrigger =
            serde_json::from_str(r#"{"tick_id": 42, "timestamp": "2026-01-01T00:00:00Z"}"#)
                .unwrap();
        assert_eq!(numeric.tick_id, TickId::from(42));

        let text: TickTrigger = serde_json::from_str(r#"{"tick_id": "day-7"}"#).unwrap();
        assert_eq!(text.tick_id, TickId::Text("day-7".to_owned()));
    }

    #[test]
    fn trigger_accepts_signed_and_fractional_ids() {
        for raw in ["-1", "3.5", "1e3"] {
            let json = format!(r#"{{"tick_id": {raw}}}"#);
            let trigger: TickTrigger = serde_json::from_str(&json).unwrap();
            let TickId::Number(n) = &trigger.tick_id else {
                panic!("{raw} parsed as {:?}", trigger.tick_id);
            };
            let expected: serde_json::Number = serde_json::from_str(raw).unwrap();
            assert_eq!(n, &expected);
        }
    }

    #[test]
    fn numeric_id_is_echoed_as_a_number() {
        let trigger: TickTrigger = serde_json::from_str(r#"{"tick_id": -17}"#).unwrap();
        let event = OutboundEvent::new(
            &trigger,
            EventPayload::DiplomacyStateChange {
                relation_key: "a_b".to_owned(),
                faction_a: FactionId::new("a"),
                faction_b: FactionId::new("b"),
                new_state: DiplomaticState::Peace,
            },
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["tick_id"], -17);
        assert_eq!(trigger.tick_id.to_string(), "-17");
    }

    #[test]
    fn outbound_event_is_flat_json() {
        let trigger = TickTrigger::now(TickId::Text("t1".to_owned()));
        let event = OutboundEvent::new(
            &trigger,
            EventPayload::DiplomacyStateChange {
                relation_key: "a_b".to_owned(),
                faction_a: FactionId::new("a"),
                faction_b: FactionId::new("b"),
                new_state: DiplomaticState::War,
            },
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "diplomacy_state_change");
        assert_eq!(value["tick_id"], "t1");
        assert_eq!(value["new_state"], "WAR");
        assert!(value["timestamp"].is_string());
        assert_eq!(event.event_type(), "diplomacy_state_change");
    }

    #[test]
    fn summary_serializes_state_keys() {
        let mut summary = DiplomacySummary::default();
        summary.state_distribution.insert(DiplomaticState::ColdWar, 3);
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["state_distribution"]["COLD_WAR"], 3);
    }
}
