//! The per-pair relationship ledger: scores, treaties, and history.
//!
//! # Invariants
//!
//! - `love` stays in `[-1.0, 1.0]`, `fear` in `[0.0, 1.0]`, `trust` in
//!   `[-1.0, 1.0]` after every update. Deltas are clamped, never rejected.
//! - The interaction history holds at most [`HISTORY_LIMIT`] entries, oldest
//!   evicted first.
//! - A treaty is active iff its flag is set and the current time is before
//!   its expiry. Expired treaties are flipped to inactive when read.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use worldsim_types::{DiplomaticState, PairKey, TreatyKind};

/// Maximum number of interaction records kept per relation.
pub const HISTORY_LIMIT: usize = 20;

/// Immutable snapshot of one score update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// When the update happened.
    pub timestamp: DateTime<Utc>,
    /// Requested love change.
    pub love_delta: f64,
    /// Requested fear change.
    pub fear_delta: f64,
    /// Requested trust change.
    pub trust_delta: f64,
    /// Love after clamping.
    pub total_love: f64,
    /// Fear after clamping.
    pub total_fear: f64,
    /// Trust after clamping.
    pub total_trust: f64,
}

/// A time-bounded formal agreement between the two factions of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treaty {
    /// What kind of agreement this is.
    pub kind: TreatyKind,
    /// When it was signed.
    pub signed_at: DateTime<Utc>,
    /// When it lapses.
    pub expires_at: DateTime<Utc>,
    /// Free-form terms.
    pub terms: BTreeMap<String, String>,
    /// Cleared once the treaty is observed past its expiry.
    pub active: bool,
}

impl Treaty {
    /// Whether the treaty is in force at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.active && now < self.expires_at
    }
}

/// Diplomatic relation between one unordered pair of factions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiplomaticRelation {
    key: PairKey,
    love: f64,
    fear: f64,
    trust: f64,
    state: DiplomaticState,
    state_changed_at: DateTime<Utc>,
    last_interaction: Option<DateTime<Utc>>,
    history: VecDeque<InteractionRecord>,
    treaties: Vec<Treaty>,
}

impl DiplomaticRelation {
    /// A neutral relation in `PEACE` with zeroed scores.
    pub fn new(key: PairKey) -> Self {
        Self {
            key,
            love: 0.0,
            fear: 0.0,
            trust: 0.0,
            state: DiplomaticState::Peace,
            state_changed_at: Utc::now(),
            last_interaction: None,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            treaties: Vec::new(),
        }
    }

    /// The canonical pair this relation belongs to.
    pub const fn key(&self) -> &PairKey {
        &self.key
    }

    /// Affinity in `[-1.0, 1.0]`.
    pub const fn love(&self) -> f64 {
        self.love
    }

    /// Threat perception in `[0.0, 1.0]`.
    pub const fn fear(&self) -> f64 {
        self.fear
    }

    /// Reliability in `[-1.0, 1.0]`.
    pub const fn trust(&self) -> f64 {
        self.trust
    }

    /// Current diplomatic state.
    pub const fn state(&self) -> DiplomaticState {
        self.state
    }

    /// When the state last changed.
    pub const fn state_changed_at(&self) -> DateTime<Utc> {
        self.state_changed_at
    }

    /// When scores were last updated, if ever.
    pub const fn last_interaction(&self) -> Option<DateTime<Utc>> {
        self.last_interaction
    }

    /// Interaction history, oldest first.
    pub const fn history(&self) -> &VecDeque<InteractionRecord> {
        &self.history
    }

    /// Every treaty ever signed, active or not.
    pub fn treaties(&self) -> &[Treaty] {
        &self.treaties
    }

    /// Apply score deltas with clamping and record the interaction.
    pub fn update_scores(&mut self, love_delta: f64, fear_delta: f64, trust_delta: f64) {
        self.love = (self.love + love_delta).clamp(-1.0, 1.0);
        self.fear = (self.fear + fear_delta).clamp(0.0, 1.0);
        self.trust = (self.trust + trust_delta).clamp(-1.0, 1.0);
        self.assert_bounds();

        let now = Utc::now();
        if self.history.len() >= HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(InteractionRecord {
            timestamp: now,
            love_delta,
            fear_delta,
            trust_delta,
            total_love: self.love,
            total_fear: self.fear,
            total_trust: self.trust,
        });
        self.last_interaction = Some(now);
    }

    /// Sign a treaty lasting `duration` from now.
    pub fn add_treaty(
        &mut self,
        kind: TreatyKind,
        duration: Duration,
        terms: BTreeMap<String, String>,
    ) {
        let signed_at = Utc::now();
        let expires_at = signed_at
            .checked_add_signed(duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.treaties.push(Treaty {
            kind,
            signed_at,
            expires_at,
            terms,
            active: true,
        });
    }

    /// Treaties in force now. Marks lapsed treaties inactive.
    pub fn active_treaties(&mut self) -> Vec<Treaty> {
        self.active_treaties_at(Utc::now())
    }

    /// Treaties in force at `now`. Marks treaties lapsed at `now` inactive.
    pub fn active_treaties_at(&mut self, now: DateTime<Utc>) -> Vec<Treaty> {
        let mut active = Vec::new();
        for treaty in &mut self.treaties {
            if treaty.is_active_at(now) {
                active.push(treaty.clone());
            } else {
                treaty.active = false;
            }
        }
        active
    }

    pub(crate) fn set_state(&mut self, state: DiplomaticState, at: DateTime<Utc>) {
        self.state = state;
        self.state_changed_at = at;
    }

    /// Unreachable for finite deltas; a NaN delta slips through `clamp`.
    fn assert_bounds(&self) {
        assert!(
            (-1.0..=1.0).contains(&self.love)
                && (0.0..=1.0).contains(&self.fear)
                && (-1.0..=1.0).contains(&self.trust),
            "relation {} scores out of bounds: love={} fear={} trust={}",
            self.key,
            self.love,
            self.fear,
            self.trust,
        );
    }
}
