// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Aggregate cache — incrementally maintained per-user summary of the
// anonymized record corpus. True counts are persisted under one key per
// user; noise is applied fresh on every read and noised values are never
// written back, so repeated reads cannot be averaged into the true count.
//
// The cache is derived state. Deleting it loses nothing: `rebuild_from`
// replays the corpus and lands on identical true counts.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use harbor_core::error::Result;
use harbor_core::store::ByteStore;
use harbor_core::types::{IncidentCategory, UserId};

use crate::anonymize::AnonymizedRecord;
use crate::noise::{add_noise, NoisePolicy};

/// Store key prefix for per-user aggregate state.
pub const ANALYTICS_PREFIX: &str = "analytics/";

/// Location buckets are capped so a long tail of one-off states cannot be
/// enumerated through the analytics surface.
const MAX_LOCATION_BUCKETS: usize = 10;

/// One category's noisy count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: IncidentCategory,
    pub label: String,
    pub count: u64,
}

/// One month's noisy count (`month` is `YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    pub month: String,
    pub count: u64,
}

/// One state-level location bucket's noisy count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCount {
    pub location: String,
    pub count: u64,
}

/// Privacy-filtered summary handed to analytics readers. Derived, noised,
/// never a source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub total_reports: u64,
    pub by_category: Vec<CategoryCount>,
    pub over_time: Vec<MonthCount>,
    pub by_location: Vec<LocationCount>,
}

/// Persisted true counts. Internal only — everything leaving the cache
/// goes through the noise policy first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct CacheState {
    total: u64,
    by_category: BTreeMap<IncidentCategory, u64>,
    over_time: BTreeMap<String, u64>,
    by_location: BTreeMap<String, u64>,
}

/// Incrementally maintained aggregate over one user's visible corpus.
pub struct AggregateCache {
    store: Arc<dyn ByteStore>,
    policy: NoisePolicy,
}

impl AggregateCache {
    /// The noise policy is fixed at construction; it is not a tunable.
    pub fn new(store: Arc<dyn ByteStore>) -> Self {
        Self {
            store,
            policy: NoisePolicy::default(),
        }
    }

    fn state_key(user: &UserId) -> String {
        format!("{ANALYTICS_PREFIX}{user}")
    }

    fn load_state(&self, user: &UserId) -> Result<CacheState> {
        match self.store.get(&Self::state_key(user))? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(CacheState::default()),
        }
    }

    fn save_state(&self, user: &UserId, state: &CacheState) -> Result<()> {
        self.store
            .set(&Self::state_key(user), serde_json::to_value(state)?)
    }

    /// Fold one anonymized record into the running counts. Map lookups and
    /// increments only — O(1) amortized per call.
    #[instrument(skip_all, fields(user = %user))]
    pub fn incorporate(&self, user: &UserId, record: &AnonymizedRecord) -> Result<()> {
        let mut state = self.load_state(user)?;
        fold(&mut state, record);
        self.save_state(user, &state)?;
        debug!(total = state.total, "aggregate updated");
        Ok(())
    }

    /// Clear and replay. Used after deletions and updates, where removing
    /// one record's contribution from an already-noised surface is not
    /// exactly reversible, and whenever cache integrity is suspect.
    #[instrument(skip_all, fields(user = %user))]
    pub fn rebuild_from<'a, I>(&self, user: &UserId, records: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a AnonymizedRecord>,
    {
        let mut state = CacheState::default();
        for record in records {
            fold(&mut state, record);
        }
        self.save_state(user, &state)?;
        debug!(total = state.total, "aggregate rebuilt");
        Ok(())
    }

    /// Drop the cached state entirely.
    pub fn clear(&self, user: &UserId) -> Result<()> {
        self.store.remove(&Self::state_key(user))
    }

    /// A noisy copy of the current snapshot. Noise is drawn fresh on every
    /// call; nothing returned here is ever cached.
    pub fn read(&self, user: &UserId) -> Result<AggregateSnapshot> {
        let state = self.load_state(user)?;

        let categories: Vec<(IncidentCategory, u64)> =
            state.by_category.into_iter().collect();
        let category_counts = add_noise(
            &categories.iter().map(|(_, c)| *c).collect::<Vec<_>>(),
            self.policy.category_epsilon,
        );
        let mut by_category: Vec<CategoryCount> = categories
            .into_iter()
            .zip(category_counts)
            .map(|((category, _), count)| CategoryCount {
                category,
                label: category.label().to_owned(),
                count,
            })
            .collect();
        by_category.sort_by(|a, b| b.count.cmp(&a.count).then(a.label.cmp(&b.label)));

        let months: Vec<(String, u64)> = state.over_time.into_iter().collect();
        let month_counts = add_noise(
            &months.iter().map(|(_, c)| *c).collect::<Vec<_>>(),
            self.policy.time_epsilon,
        );
        // BTreeMap iteration keeps months ascending.
        let over_time = months
            .into_iter()
            .zip(month_counts)
            .map(|((month, _), count)| MonthCount { month, count })
            .collect();

        let locations: Vec<(String, u64)> = state.by_location.into_iter().collect();
        let location_counts = add_noise(
            &locations.iter().map(|(_, c)| *c).collect::<Vec<_>>(),
            self.policy.location_epsilon,
        );
        let mut by_location: Vec<LocationCount> = locations
            .into_iter()
            .zip(location_counts)
            .map(|((location, _), count)| LocationCount { location, count })
            .collect();
        by_location.sort_by(|a, b| b.count.cmp(&a.count).then(a.location.cmp(&b.location)));
        by_location.truncate(MAX_LOCATION_BUCKETS);

        let total_reports = add_noise(&[state.total], self.policy.total_epsilon)[0];

        Ok(AggregateSnapshot {
            total_reports,
            by_category,
            over_time,
            by_location,
        })
    }
}

fn fold(state: &mut CacheState, record: &AnonymizedRecord) {
    state.total += 1;
    for category in &record.categories {
        *state.by_category.entry(*category).or_insert(0) += 1;
    }
    *state
        .over_time
        .entry(record.created_month.clone())
        .or_insert(0) += 1;
    if let Some(bucket) = record.location.bucket() {
        *state.by_location.entry(bucket).or_insert(0) += 1;
    }
}
