//! The diplomacy engine: faction registry, relation store, and evaluation.
//!
//! # Model
//!
//! Each faction pair owns one [`DiplomaticRelation`] stored under its
//! canonical [`PairKey`]. Evaluation combines the relation's love and trust,
//! bonuses from active treaties, and the fear produced by a power asymmetry
//! into a single diplomatic score:
//!
//! ```text
//! score = loveFactor + 0.8 * fearFactor - 0.5 * max(0, -loveFactor) + noise
//! ```
//!
//! The score is mapped onto a [`DiplomaticState`]:
//!
//! | Score                | State      |
//! |----------------------|------------|
//! | `< -0.7`             | `WAR`      |
//! | `[-0.7, -0.3)`       | `COLD_WAR` |
//! | `> 0.5`              | `ALLIANCE` |
//! | otherwise            | `PEACE`    |
//!
//! States only change as a side effect of evaluation. Scripted events
//! ([`DiplomaticEventKind`]) adjust scores immediately and let the next
//! evaluation derive the resulting state.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use worldsim_types::{
    DiplomacySummary, DiplomaticEventKind, DiplomaticState, FactionId, PairKey, TreatyKind,
};

use crate::error::DiplomacyError;
use crate::faction::FactionState;
use crate::noise::{DEFAULT_NOISE_AMPLITUDE, NoiseSource, UniformNoise};
use crate::relation::DiplomaticRelation;

// ---------------------------------------------------------------------------
// Tuning constants
// ---------------------------------------------------------------------------

/// Power ratio above which (or below whose inverse) the weaker side fears
/// the stronger one.
pub const FEAR_RATIO_THRESHOLD: f64 = 1.5;

/// Fear produced per unit of power asymmetry beyond parity.
pub const FEAR_ASYMMETRY_SCALE: f64 = 0.3;

/// Fraction of the fear factor accumulated into the relation per evaluation.
pub const FEAR_ACCUMULATION_RATE: f64 = 0.1;

/// Weight of trust in the love factor.
pub const TRUST_WEIGHT: f64 = 0.5;

/// Weight of negative love ("hate") subtracted from the score.
pub const HATE_WEIGHT: f64 = 0.5;

/// Weight of the fear factor added to the score.
pub const FEAR_WEIGHT: f64 = 0.8;

/// Scores strictly below this are `WAR`.
pub const WAR_THRESHOLD: f64 = -0.7;

/// Scores strictly below this (and not `WAR`) are `COLD_WAR`.
pub const COLD_WAR_THRESHOLD: f64 = -0.3;

/// Scores strictly above this are `ALLIANCE`.
pub const ALLIANCE_THRESHOLD: f64 = 0.5;

/// Treaty duration used when an event does not specify one.
pub const DEFAULT_TREATY_DAYS: i64 = 365;

/// Daily trust gain for relations at `PEACE` or in `ALLIANCE`.
pub const PEACE_TRUST_RECOVERY: f64 = 0.01;

/// Daily trust loss for relations in `COLD_WAR`.
pub const COLD_WAR_TRUST_EROSION: f64 = 0.005;

/// Maximum entries retained in each audit log.
pub const MAX_LOG_ENTRIES: usize = 1_000;

// ---------------------------------------------------------------------------
// Audit records
// ---------------------------------------------------------------------------

/// A recorded transition between diplomatic states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangeRecord {
    /// When the transition was recorded.
    pub timestamp: DateTime<Utc>,
    /// First faction as passed to the evaluation.
    pub faction_a: FactionId,
    /// Second faction as passed to the evaluation.
    pub faction_b: FactionId,
    /// State before the evaluation.
    pub old_state: DiplomaticState,
    /// State after the evaluation.
    pub new_state: DiplomaticState,
    /// Score that produced the new state.
    pub diplomatic_score: f64,
    /// Why the transition happened.
    pub reason: String,
}

/// Caller-supplied parameters for a scripted event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventImpact {
    /// Duration of any treaty the event creates.
    #[serde(default)]
    pub duration_days: Option<i64>,
}

impl EventImpact {
    /// Treaty duration, falling back to [`DEFAULT_TREATY_DAYS`].
    pub fn treaty_duration(&self) -> Duration {
        Duration::try_days(self.duration_days.unwrap_or(DEFAULT_TREATY_DAYS))
            .unwrap_or_else(|| Duration::days(DEFAULT_TREATY_DAYS))
    }
}

/// A scripted diplomatic event, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalEventRecord {
    /// What happened.
    pub kind: DiplomaticEventKind,
    /// Factions involved, in role order.
    pub factions: Vec<FactionId>,
    /// Parameters the event was triggered with.
    pub impact: EventImpact,
    /// When the event was triggered.
    pub timestamp: DateTime<Utc>,
    /// Whether the score impacts have been applied.
    pub processed: bool,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Fear produced by the power ratio of two factions.
///
/// Zero when either side has no power or the ratio is within
/// [`FEAR_RATIO_THRESHOLD`] of parity in either direction.
pub fn fear_factor(power_a: f64, power_b: f64) -> f64 {
    if power_a <= 0.0 || power_b <= 0.0 {
        return 0.0;
    }
    let ratio = power_a / power_b;
    let asymmetry = if ratio > FEAR_RATIO_THRESHOLD {
        ratio - 1.0
    } else if ratio < 1.0 / FEAR_RATIO_THRESHOLD {
        1.0 / ratio - 1.0
    } else {
        return 0.0;
    };
    (asymmetry.abs() * FEAR_ASYMMETRY_SCALE).min(1.0)
}

/// Noise-free diplomatic score for a love factor and a fear factor.
pub fn diplomatic_score(love_factor: f64, fear_factor: f64) -> f64 {
    let hate_impact = (-love_factor).max(0.0) * HATE_WEIGHT;
    let fear_impact = fear_factor * FEAR_WEIGHT;
    love_factor + fear_impact - hate_impact
}

/// Map a diplomatic score onto a state.
pub fn score_to_state(score: f64) -> DiplomaticState {
    if score < WAR_THRESHOLD {
        DiplomaticState::War
    } else if score < COLD_WAR_THRESHOLD {
        DiplomaticState::ColdWar
    } else if score > ALLIANCE_THRESHOLD {
        DiplomaticState::Alliance
    } else {
        DiplomaticState::Peace
    }
}

// ---------------------------------------------------------------------------
// DiplomacyEngine
// ---------------------------------------------------------------------------

/// Owns every faction and relation and computes diplomatic state.
pub struct DiplomacyEngine {
    /// Registered factions by id.
    factions: BTreeMap<FactionId, FactionState>,
    /// Faction ids in registration order.
    order: Vec<FactionId>,
    /// One relation per unordered pair.
    relations: BTreeMap<PairKey, DiplomaticRelation>,
    /// Perturbation added to every evaluation.
    noise: Box<dyn NoiseSource>,
    /// Recorded state transitions, oldest first.
    state_log: Vec<StateChangeRecord>,
    /// Recorded scripted events, oldest first.
    event_log: Vec<GlobalEventRecord>,
}

impl DiplomacyEngine {
    /// An empty engine using OS-seeded uniform noise.
    pub fn new() -> Self {
        Self::with_noise(Box::new(UniformNoise::from_entropy(DEFAULT_NOISE_AMPLITUDE)))
    }

    /// An empty engine using the given noise source.
    pub fn with_noise(noise: Box<dyn NoiseSource>) -> Self {
        Self {
            factions: BTreeMap::new(),
            order: Vec::new(),
            relations: BTreeMap::new(),
            noise,
            state_log: Vec::new(),
            event_log: Vec::new(),
        }
    }

    /// Replace the noise source.
    pub fn set_noise(&mut self, noise: Box<dyn NoiseSource>) {
        self.noise = noise;
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    /// Register a faction and create its relation with every existing one.
    pub fn register_faction(
        &mut self,
        id: FactionId,
        military_power: f64,
        name: &str,
    ) -> Result<(), DiplomacyError> {
        if self.factions.contains_key(&id) {
            return Err(DiplomacyError::DuplicateFaction(id));
        }

        for existing in &self.order {
            let key = PairKey::new(&id, existing);
            self.relations
                .entry(key.clone())
                .or_insert_with(|| DiplomaticRelation::new(key));
        }

        let faction = FactionState::new(id.clone(), military_power, name);
        info!(
            faction_id = %id,
            name = %faction.name,
            military_power = faction.military_power,
            relations = self.relations.len(),
            "Faction registered"
        );
        self.factions.insert(id.clone(), faction);
        self.order.push(id);
        Ok(())
    }

    /// Number of registered factions.
    pub fn faction_count(&self) -> usize {
        self.order.len()
    }

    /// Registered faction ids in registration order.
    pub fn faction_ids(&self) -> &[FactionId] {
        &self.order
    }

    /// Look up a faction.
    pub fn faction(&self, id: &FactionId) -> Result<&FactionState, DiplomacyError> {
        self.factions
            .get(id)
            .ok_or_else(|| DiplomacyError::UnknownFaction(id.clone()))
    }

    /// Look up a faction for mutation by external game events.
    pub fn faction_mut(&mut self, id: &FactionId) -> Result<&mut FactionState, DiplomacyError> {
        self.factions
            .get_mut(id)
            .ok_or_else(|| DiplomacyError::UnknownFaction(id.clone()))
    }

    /// Canonical key for a registered, distinct pair.
    fn key_for(&self, a: &FactionId, b: &FactionId) -> Result<PairKey, DiplomacyError> {
        for id in [a, b] {
            if !self.factions.contains_key(id) {
                return Err(DiplomacyError::UnknownFaction(id.clone()));
            }
        }
        if a == b {
            return Err(DiplomacyError::NoRelation(a.clone()));
        }
        Ok(PairKey::new(a, b))
    }

    /// The relation between two factions, in either order.
    pub fn relation(
        &self,
        a: &FactionId,
        b: &FactionId,
    ) -> Result<&DiplomaticRelation, DiplomacyError> {
        let key = self.key_for(a, b)?;
        self.relations
            .get(&key)
            .ok_or_else(|| DiplomacyError::UnknownFaction(b.clone()))
    }

    /// The relation between two factions, in either order, for mutation.
    pub fn relation_mut(
        &mut self,
        a: &FactionId,
        b: &FactionId,
    ) -> Result<&mut DiplomaticRelation, DiplomacyError> {
        let key = self.key_for(a, b)?;
        self.relations
            .get_mut(&key)
            .ok_or_else(|| DiplomacyError::UnknownFaction(b.clone()))
    }

    /// Every relation, keyed by canonical pair.
    pub fn relations(&self) -> impl Iterator<Item = (&PairKey, &DiplomaticRelation)> {
        self.relations.iter()
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Evaluate one relation and transition its state if the score moved it.
    pub fn evaluate_relation(
        &mut self,
        a: &FactionId,
        b: &FactionId,
    ) -> Result<DiplomaticState, DiplomacyError> {
        let key = self.key_for(a, b)?;
        let power_a = self.faction(a)?.total_power_score();
        let power_b = self.faction(b)?.total_power_score();
        let noise = self.noise.sample();

        let relation = self
            .relations
            .get_mut(&key)
            .ok_or_else(|| DiplomacyError::UnknownFaction(b.clone()))?;
        let now = Utc::now();

        let treaty_bonus: f64 = relation
            .active_treaties_at(now)
            .iter()
            .map(|t| t.kind.love_bonus())
            .sum();
        let love_factor =
            (relation.love() + relation.trust() * TRUST_WEIGHT + treaty_bonus).clamp(-1.0, 1.0);

        let fear = fear_factor(power_a, power_b);
        relation.update_scores(0.0, fear * FEAR_ACCUMULATION_RATE, 0.0);

        let score = diplomatic_score(love_factor, fear) + noise;
        let new_state = score_to_state(score);
        let old_state = relation.state();

        if new_state != old_state {
            relation.set_state(new_state, now);
            info!(
                faction_a = %a,
                faction_b = %b,
                old_state = %old_state,
                new_state = %new_state,
                score,
                "Diplomatic state change"
            );
            push_bounded(
                &mut self.state_log,
                StateChangeRecord {
                    timestamp: now,
                    faction_a: a.clone(),
                    faction_b: b.clone(),
                    old_state,
                    new_state,
                    diplomatic_score: score,
                    reason: "evaluation".to_owned(),
                },
            );
        }

        Ok(new_state)
    }

    /// Evaluate every unordered pair exactly once, in registration order.
    pub fn evaluate_all_relations(
        &mut self,
    ) -> Result<BTreeMap<PairKey, DiplomaticState>, DiplomacyError> {
        let order = self.order.clone();
        let mut results = BTreeMap::new();
        for (i, a) in order.iter().enumerate() {
            for b in order.iter().skip(i.saturating_add(1)) {
                let state = self.evaluate_relation(a, b)?;
                results.insert(PairKey::new(a, b), state);
            }
        }
        debug!(pairs = results.len(), "Evaluated all relations");
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Scripted events
    // -----------------------------------------------------------------------

    /// Apply a scripted event immediately and record it in the event log.
    pub fn trigger_diplomatic_event(
        &mut self,
        kind: DiplomaticEventKind,
        factions: &[FactionId],
        impact: EventImpact,
    ) -> Result<(), DiplomacyError> {
        let (first, second) = match factions {
            [first, second, ..] => (first, second),
            _ => {
                return Err(DiplomacyError::InsufficientFactions {
                    kind,
                    provided: factions.len(),
                });
            }
        };
        let key = self.key_for(first, second)?;
        let duration = impact.treaty_duration();

        let mut record = GlobalEventRecord {
            kind,
            factions: factions.to_vec(),
            impact,
            timestamp: Utc::now(),
            processed: false,
        };

        let relation = self
            .relations
            .get_mut(&key)
            .ok_or_else(|| DiplomacyError::UnknownFaction(second.clone()))?;

        match kind {
            DiplomaticEventKind::WarDeclaration => {
                relation.update_scores(-0.5, 0.0, -0.8);
                let terms = BTreeMap::from([
                    ("aggressor".to_owned(), first.to_string()),
                    ("defender".to_owned(), second.to_string()),
                ]);
                relation.add_treaty(TreatyKind::War, duration, terms);
            }
            DiplomaticEventKind::AllianceFormed => {
                relation.update_scores(0.4, 0.0, 0.6);
                let members = factions
                    .iter()
                    .map(FactionId::as_str)
                    .collect::<Vec<_>>()
                    .join(",");
                let terms = BTreeMap::from([("members".to_owned(), members)]);
                relation.add_treaty(TreatyKind::Alliance, duration, terms);
            }
            DiplomaticEventKind::Betrayal => {
                relation.update_scores(-0.8, 0.0, -1.0);
            }
        }

        record.processed = true;
        info!(
            kind = %kind,
            faction_a = %first,
            faction_b = %second,
            "Diplomatic event triggered"
        );
        push_bounded(&mut self.event_log, record);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Passive drift
    // -----------------------------------------------------------------------

    /// Advance passive trust drift by `days`.
    ///
    /// Peaceful and allied relations slowly rebuild trust, cold wars slowly
    /// erode it, and wars are left to scripted events.
    pub fn simulate_time_step(&mut self, days: u32) {
        let days = f64::from(days);
        for relation in self.relations.values_mut() {
            match relation.state() {
                DiplomaticState::Peace | DiplomaticState::Alliance => {
                    relation.update_scores(0.0, 0.0, PEACE_TRUST_RECOVERY * days);
                }
                DiplomaticState::ColdWar => {
                    relation.update_scores(0.0, 0.0, -COLD_WAR_TRUST_EROSION * days);
                }
                DiplomaticState::War => {}
            }
        }
        debug!(days, "Simulated diplomatic time passage");
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    /// Summarize the current diplomatic landscape.
    ///
    /// Reading treaty activity lapses expired treaties, hence `&mut self`.
    pub fn diplomacy_summary(&mut self) -> DiplomacySummary {
        let now = Utc::now();
        let mut summary = DiplomacySummary {
            total_factions: self.factions.len(),
            relations_count: self.relations.len(),
            state_distribution: BTreeMap::new(),
            recent_events: self.event_log.len(),
            active_treaties: 0,
        };
        for relation in self.relations.values_mut() {
            let count = summary
                .state_distribution
                .entry(relation.state())
                .or_insert(0);
            *count = count.saturating_add(1);
            summary.active_treaties = summary
                .active_treaties
                .saturating_add(relation.active_treaties_at(now).len());
        }
        summary
    }

    /// Recorded state transitions, oldest first.
    pub fn state_change_log(&self) -> &[StateChangeRecord] {
        &self.state_log
    }

    /// Recorded scripted events, oldest first.
    pub fn event_log(&self) -> &[GlobalEventRecord] {
        &self.event_log
    }
}

impl Default for DiplomacyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DiplomacyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiplomacyEngine")
            .field("factions", &self.order)
            .field("relations", &self.relations.len())
            .field("state_log", &self.state_log.len())
            .field("event_log", &self.event_log.len())
            .finish_non_exhaustive()
    }
}

/// Append to an audit log, dropping the oldest entries beyond the cap.
fn push_bounded<T>(log: &mut Vec<T>, entry: T) {
    log.push(entry);
    if log.len() > MAX_LOG_ENTRIES {
        let drain_count = log.len().saturating_sub(MAX_LOG_ENTRIES);
        log.drain(..drain_count);
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::noise::{FixedNoise, NoNoise};

    fn id(s: &str) -> FactionId {
        FactionId::new(s)
    }

    fn quiet_engine() -> DiplomacyEngine {
        DiplomacyEngine::with_noise(Box::new(NoNoise))
    }

    fn engine_with(factions: &[(&str, f64)]) -> DiplomacyEngine {
        let mut engine = quiet_engine();
        for (name, power) in factions {
            engine.register_faction(id(name), *power, name).unwrap();
        }
        engine
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    #[test]
    fn registering_n_factions_creates_pairwise_relations() {
        let engine = engine_with(&[("a", 1.0), ("b", 1.0), ("c", 1.0), ("d", 1.0)]);
        assert_eq!(engine.faction_count(), 4);
        assert_eq!(engine.relations().count(), 6);
    }

    #[test]
    fn duplicate_faction_is_rejected() {
        let mut engine = engine_with(&[("a", 1.0)]);
        let result = engine.register_faction(id("a"), 2.0, "again");
        assert_eq!(result, Err(DiplomacyError::DuplicateFaction(id("a"))));
        assert_eq!(engine.faction_count(), 1);
    }

    #[test]
    fn relation_lookup_is_symmetric() {
        let engine = engine_with(&[("a", 1.0), ("b", 1.0)]);
        let ab = engine.relation(&id("a"), &id("b")).unwrap();
        let ba = engine.relation(&id("b"), &id("a")).unwrap();
        assert!(std::ptr::eq(ab, ba));
    }

    #[test]
    fn mutation_through_either_order_is_shared() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0)]);
        engine
            .relation_mut(&id("b"), &id("a"))
            .unwrap()
            .update_scores(0.25, 0.0, 0.0);
        let love = engine.relation(&id("a"), &id("b")).unwrap().love();
        assert!((love - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_and_self_relations_fail() {
        let mut engine = engine_with(&[("a", 1.0)]);
        assert!(matches!(
            engine.evaluate_relation(&id("a"), &id("ghost")),
            Err(DiplomacyError::UnknownFaction(ref f)) if f == &id("ghost")
        ));
        assert!(matches!(
            engine.relation(&id("a"), &id("a")),
            Err(DiplomacyError::NoRelation(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    #[test]
    fn threshold_mapping() {
        assert_eq!(score_to_state(-0.71), DiplomaticState::War);
        assert_eq!(score_to_state(-0.5), DiplomaticState::ColdWar);
        assert_eq!(score_to_state(0.0), DiplomaticState::Peace);
        assert_eq!(score_to_state(0.6), DiplomaticState::Alliance);
    }

    #[test]
    fn threshold_boundaries_follow_strict_inequalities() {
        assert_eq!(score_to_state(-0.7), DiplomaticState::ColdWar);
        assert_eq!(score_to_state(-0.3), DiplomaticState::Peace);
        assert_eq!(score_to_state(0.5), DiplomaticState::Peace);
    }

    #[test]
    fn fear_factor_reacts_only_beyond_ratio_threshold() {
        assert!(fear_factor(1.4, 1.0).abs() < f64::EPSILON);
        assert!(fear_factor(1.0, 1.4).abs() < f64::EPSILON);
        assert!((fear_factor(3.0, 1.0) - 0.6).abs() < 1e-9);
        assert!((fear_factor(1.0, 3.0) - 0.6).abs() < 1e-9);
        assert!((fear_factor(100.0, 1.0) - 1.0).abs() < f64::EPSILON);
        assert!(fear_factor(0.0, 5.0).abs() < f64::EPSILON);
        assert!(fear_factor(5.0, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn hate_weighs_in_against_negative_love() {
        assert!((diplomatic_score(-0.4, 0.0) - (-0.6)).abs() < 1e-9);
        assert!((diplomatic_score(0.4, 0.5) - 0.8).abs() < 1e-9);
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    #[test]
    fn evaluation_is_deterministic_without_noise() {
        let mut engine = engine_with(&[("a", 5.0), ("b", 4.0)]);
        engine
            .relation_mut(&id("a"), &id("b"))
            .unwrap()
            .update_scores(0.3, 0.0, 0.2);

        let first = engine.evaluate_relation(&id("a"), &id("b")).unwrap();
        for _ in 0..10 {
            assert_eq!(engine.evaluate_relation(&id("a"), &id("b")).unwrap(), first);
        }
    }

    #[test]
    fn noise_can_push_a_relation_across_a_threshold() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0)]);
        // love 0.45 -> score 0.45, just under the alliance threshold.
        engine
            .relation_mut(&id("a"), &id("b"))
            .unwrap()
            .update_scores(0.45, 0.0, 0.0);
        assert_eq!(
            engine.evaluate_relation(&id("a"), &id("b")).unwrap(),
            DiplomaticState::Peace
        );

        engine.set_noise(Box::new(FixedNoise(0.1)));
        assert_eq!(
            engine.evaluate_relation(&id("a"), &id("b")).unwrap(),
            DiplomaticState::Alliance
        );
    }

    #[test]
    fn state_change_is_logged_once() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0)]);
        engine
            .relation_mut(&id("a"), &id("b"))
            .unwrap()
            .update_scores(-1.0, 0.0, -1.0);

        assert_eq!(
            engine.evaluate_relation(&id("a"), &id("b")).unwrap(),
            DiplomaticState::War
        );
        assert_eq!(
            engine.evaluate_relation(&id("a"), &id("b")).unwrap(),
            DiplomaticState::War
        );

        let log = engine.state_change_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].old_state, DiplomaticState::Peace);
        assert_eq!(log[0].new_state, DiplomaticState::War);
        assert_eq!(log[0].reason, "evaluation");
        assert_eq!(
            engine.relation(&id("a"), &id("b")).unwrap().state(),
            DiplomaticState::War
        );
    }

    #[test]
    fn active_treaties_add_love_bonus() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0)]);
        let relation = engine.relation_mut(&id("a"), &id("b")).unwrap();
        relation.update_scores(0.25, 0.0, 0.0);
        relation.add_treaty(TreatyKind::NonAggressionPact, Duration::days(-1), BTreeMap::new());

        // An expired pact contributes nothing.
        assert_eq!(
            engine.evaluate_relation(&id("a"), &id("b")).unwrap(),
            DiplomaticState::Peace
        );
        engine
            .relation_mut(&id("a"), &id("b"))
            .unwrap()
            .add_treaty(TreatyKind::Alliance, Duration::days(30), BTreeMap::new());
        assert_eq!(
            engine.evaluate_relation(&id("a"), &id("b")).unwrap(),
            DiplomaticState::Alliance
        );
    }

    #[test]
    fn power_asymmetry_accumulates_fear() {
        let mut engine = engine_with(&[("a", 9.0), ("b", 3.0)]);
        let power_a = engine.faction(&id("a")).unwrap().total_power_score();
        let power_b = engine.faction(&id("b")).unwrap().total_power_score();
        let expected_factor = fear_factor(power_a, power_b);
        assert!(expected_factor > 0.0);

        let mut previous = 0.0;
        for _ in 0..5 {
            engine.evaluate_relation(&id("a"), &id("b")).unwrap();
            let fear = engine.relation(&id("a"), &id("b")).unwrap().fear();
            assert!((fear - previous - expected_factor * FEAR_ACCUMULATION_RATE).abs() < 1e-9);
            previous = fear;
        }

        for _ in 0..100 {
            engine.evaluate_relation(&id("a"), &id("b")).unwrap();
        }
        let fear = engine.relation(&id("a"), &id("b")).unwrap().fear();
        assert!((fear - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn evaluate_all_covers_each_pair_once() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 2.0), ("c", 9.0)]);
        let results = engine.evaluate_all_relations().unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.contains_key(&PairKey::new(&id("a"), &id("b"))));
        assert!(results.contains_key(&PairKey::new(&id("c"), &id("a"))));
        assert!(results.contains_key(&PairKey::new(&id("b"), &id("c"))));
    }

    // -----------------------------------------------------------------------
    // Scripted events
    // -----------------------------------------------------------------------

    #[test]
    fn war_declaration_adds_war_treaty() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0)]);
        engine
            .trigger_diplomatic_event(
                DiplomaticEventKind::WarDeclaration,
                &[id("a"), id("b")],
                EventImpact::default(),
            )
            .unwrap();

        let relation = engine.relation(&id("a"), &id("b")).unwrap();
        assert!((relation.love() + 0.5).abs() < 1e-9);
        assert!((relation.trust() + 0.8).abs() < 1e-9);
        let treaty = &relation.treaties()[0];
        assert_eq!(treaty.kind, TreatyKind::War);
        assert_eq!(treaty.terms.get("aggressor").map(String::as_str), Some("a"));
        assert_eq!(treaty.terms.get("defender").map(String::as_str), Some("b"));
        let days = (treaty.expires_at - treaty.signed_at).num_days();
        assert_eq!(days, DEFAULT_TREATY_DAYS);

        let log = engine.event_log();
        assert_eq!(log.len(), 1);
        assert!(log[0].processed);
    }

    #[test]
    fn alliance_uses_supplied_duration() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0)]);
        engine
            .trigger_diplomatic_event(
                DiplomaticEventKind::AllianceFormed,
                &[id("b"), id("a")],
                EventImpact {
                    duration_days: Some(90),
                },
            )
            .unwrap();

        let relation = engine.relation(&id("a"), &id("b")).unwrap();
        assert!((relation.love() - 0.4).abs() < 1e-9);
        assert!((relation.trust() - 0.6).abs() < 1e-9);
        let treaty = &relation.treaties()[0];
        assert_eq!(treaty.kind, TreatyKind::Alliance);
        assert_eq!((treaty.expires_at - treaty.signed_at).num_days(), 90);
        assert_eq!(treaty.terms.get("members").map(String::as_str), Some("b,a"));
    }

    #[test]
    fn betrayal_breaks_an_alliance_leaning_relation() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0)]);
        engine
            .relation_mut(&id("a"), &id("b"))
            .unwrap()
            .update_scores(0.6, 0.0, 0.5);
        assert_eq!(
            engine.evaluate_relation(&id("a"), &id("b")).unwrap(),
            DiplomaticState::Alliance
        );

        engine
            .trigger_diplomatic_event(
                DiplomaticEventKind::Betrayal,
                &[id("a"), id("b")],
                EventImpact::default(),
            )
            .unwrap();
        let relation = engine.relation(&id("a"), &id("b")).unwrap();
        assert!((relation.love() + 0.2).abs() < 1e-9);
        assert!((relation.trust() + 0.5).abs() < 1e-9);

        let state = engine.evaluate_relation(&id("a"), &id("b")).unwrap();
        assert_ne!(state, DiplomaticState::Alliance);
        assert_eq!(state, DiplomaticState::ColdWar);
    }

    #[test]
    fn event_with_one_faction_is_rejected() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0)]);
        let result = engine.trigger_diplomatic_event(
            DiplomaticEventKind::Betrayal,
            &[id("a")],
            EventImpact::default(),
        );
        assert!(matches!(
            result,
            Err(DiplomacyError::InsufficientFactions { provided: 1, .. })
        ));
        assert!(engine.event_log().is_empty());
    }

    // -----------------------------------------------------------------------
    // Drift and reporting
    // -----------------------------------------------------------------------

    #[test]
    fn time_step_drifts_trust_by_state() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
        // a-b -> WAR, a-c -> COLD_WAR, b-c stays PEACE.
        engine
            .relation_mut(&id("a"), &id("b"))
            .unwrap()
            .update_scores(-1.0, 0.0, -0.5);
        engine
            .relation_mut(&id("a"), &id("c"))
            .unwrap()
            .update_scores(-0.4, 0.0, 0.0);
        engine.evaluate_all_relations().unwrap();
        assert_eq!(
            engine.relation(&id("a"), &id("c")).unwrap().state(),
            DiplomaticState::ColdWar
        );

        engine.simulate_time_step(10);

        let war = engine.relation(&id("a"), &id("b")).unwrap();
        assert!((war.trust() + 0.5).abs() < 1e-9);
        let cold = engine.relation(&id("a"), &id("c")).unwrap();
        assert!((cold.trust() + 0.05).abs() < 1e-9);
        let peace = engine.relation(&id("b"), &id("c")).unwrap();
        assert!((peace.trust() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn summary_counts_states_and_treaties_once() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
        engine
            .trigger_diplomatic_event(
                DiplomaticEventKind::AllianceFormed,
                &[id("a"), id("b")],
                EventImpact::default(),
            )
            .unwrap();
        engine.evaluate_all_relations().unwrap();

        let summary = engine.diplomacy_summary();
        assert_eq!(summary.total_factions, 3);
        assert_eq!(summary.relations_count, 3);
        assert_eq!(summary.active_treaties, 1);
        assert_eq!(summary.recent_events, 1);
        assert_eq!(summary.state_distribution.values().sum::<usize>(), 3);
        assert_eq!(
            summary.state_distribution.get(&DiplomaticState::Alliance),
            Some(&1)
        );
    }
}
