// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Insight computations over an anonymized corpus: recent-versus-prior
// trends, temporal distributions, and demographic breakdowns. Pure
// functions — the caller supplies the records and the reference time.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use harbor_core::types::{IncidentCategory, TimeOfDay};

use crate::anonymize::AnonymizedRecord;

/// Direction of a recent-versus-prior comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// How much weight to give a trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    High,
    Medium,
    Low,
}

/// Result of comparing the last three months against the three before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    /// Absolute percentage change, rounded.
    pub percentage: u32,
    pub significance: Significance,
    pub period: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

/// One bucket of a categorical distribution, with its share of the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionBucket {
    pub bucket: String,
    pub count: u64,
    pub percentage: u32,
}

/// Age / gender / race breakdowns, computed only from records whose
/// demographics survived anonymization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicBreakdown {
    pub age: Vec<DistributionBucket>,
    pub gender: Vec<DistributionBucket>,
    pub race: Vec<DistributionBucket>,
}

/// Full insight report for one user's corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightsReport {
    pub overall: TrendAnalysis,
    pub by_category: BTreeMap<IncidentCategory, TrendAnalysis>,
    pub time_of_day: Vec<(TimeOfDay, u64)>,
    pub seasonal: Vec<(Season, u64)>,
    pub demographics: DemographicBreakdown,
}

const AGE_BUCKETS: &[&str] = &[
    "Under 18", "18-24", "25-34", "35-44", "45-54", "55-64", "65+",
];

const GENDER_BUCKETS: &[&str] = &[
    "Male",
    "Female",
    "Non-binary",
    "Transgender",
    "Prefer to self-describe",
];

const RACE_BUCKETS: &[&str] = &[
    "Black or African American",
    "Hispanic or Latino",
    "Asian",
    "Native American or Alaska Native",
    "Native Hawaiian or Pacific Islander",
    "White",
    "Middle Eastern or North African",
    "Multiracial",
];

/// Compute the full report. `now` anchors the trend windows.
pub fn generate(records: &[AnonymizedRecord], now: DateTime<Utc>) -> InsightsReport {
    InsightsReport {
        overall: overall_trend(records, now),
        by_category: category_trends(records, now),
        time_of_day: time_of_day_distribution(records),
        seasonal: seasonal_counts(records),
        demographics: demographic_distribution(records),
    }
}

/// Month index on a continuous axis, for window arithmetic.
fn month_index(year: i32, month: u32) -> i64 {
    i64::from(year) * 12 + i64::from(month) - 1
}

/// Parse a `YYYY-MM` bucket back to a month index. Buckets are produced by
/// the anonymizer, so a parse failure means corrupt input — count it in
/// neither window.
fn parse_month(bucket: &str) -> Option<i64> {
    let (year, month) = bucket.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(month_index(year, month))
}

fn window_counts<F>(records: &[AnonymizedRecord], now: DateTime<Utc>, matches: F) -> (u64, u64)
where
    F: Fn(&AnonymizedRecord) -> bool,
{
    let now_index = month_index(now.year(), now.month());
    let mut recent = 0u64;
    let mut older = 0u64;
    for record in records.iter().filter(|r| matches(r)) {
        let Some(index) = parse_month(&record.created_month) else {
            continue;
        };
        let age = now_index - index;
        if (0..3).contains(&age) {
            recent += 1;
        } else if (3..6).contains(&age) {
            older += 1;
        }
    }
    (recent, older)
}

fn trend_from_counts(recent: u64, older: u64, period: &str) -> TrendAnalysis {
    if older == 0 {
        return TrendAnalysis {
            direction: if recent > 0 {
                TrendDirection::Increasing
            } else {
                TrendDirection::Stable
            },
            percentage: if recent > 0 { 100 } else { 0 },
            significance: match recent {
                r if r > 5 => Significance::High,
                r if r > 2 => Significance::Medium,
                _ => Significance::Low,
            },
            period: period.to_owned(),
        };
    }

    let change = (recent as f64 - older as f64) / older as f64 * 100.0;
    let magnitude = change.abs();

    TrendAnalysis {
        direction: if change > 5.0 {
            TrendDirection::Increasing
        } else if change < -5.0 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        },
        percentage: magnitude.round() as u32,
        significance: if magnitude > 25.0 {
            Significance::High
        } else if magnitude > 10.0 {
            Significance::Medium
        } else {
            Significance::Low
        },
        period: period.to_owned(),
    }
}

/// Last three months against the three before, across the whole corpus.
pub fn overall_trend(records: &[AnonymizedRecord], now: DateTime<Utc>) -> TrendAnalysis {
    let (recent, older) = window_counts(records, now, |_| true);
    trend_from_counts(recent, older, "Last 3 months vs previous 3 months")
}

/// The same comparison per category.
pub fn category_trends(
    records: &[AnonymizedRecord],
    now: DateTime<Utc>,
) -> BTreeMap<IncidentCategory, TrendAnalysis> {
    let categories = [
        IncidentCategory::WorkplaceBias,
        IncidentCategory::PoliceEncounter,
        IncidentCategory::HousingDiscrimination,
        IncidentCategory::Education,
        IncidentCategory::PublicSpace,
        IncidentCategory::Online,
        IncidentCategory::Other,
    ];

    categories
        .into_iter()
        .map(|category| {
            let (recent, older) =
                window_counts(records, now, |r| r.categories.contains(&category));
            (category, trend_from_counts(recent, older, "Last 3 months"))
        })
        .collect()
}

/// Counts per coarse time-of-day bucket, fixed order morning to night.
pub fn time_of_day_distribution(records: &[AnonymizedRecord]) -> Vec<(TimeOfDay, u64)> {
    [
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ]
    .into_iter()
    .map(|slot| {
        let count = records
            .iter()
            .filter(|r| r.time_of_day == Some(slot))
            .count() as u64;
        (slot, count)
    })
    .collect()
}

fn season_of(month_bucket: &str) -> Option<Season> {
    let month: u32 = month_bucket.split_once('-')?.1.parse().ok()?;
    Some(match month {
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        9..=11 => Season::Fall,
        _ => Season::Winter,
    })
}

/// Counts per season of the incident month.
pub fn seasonal_counts(records: &[AnonymizedRecord]) -> Vec<(Season, u64)> {
    [Season::Spring, Season::Summer, Season::Fall, Season::Winter]
        .into_iter()
        .map(|season| {
            let count = records
                .iter()
                .filter(|r| season_of(&r.incident_month) == Some(season))
                .count() as u64;
            (season, count)
        })
        .collect()
}

fn distribution<F>(
    records: &[AnonymizedRecord],
    buckets: &[&str],
    accessor: F,
) -> Vec<DistributionBucket>
where
    F: Fn(&AnonymizedRecord) -> Option<String>,
{
    let with_demographics: Vec<&AnonymizedRecord> = records
        .iter()
        .filter(|r| r.demographics.is_some())
        .collect();
    let total = with_demographics.len() as u64;

    buckets
        .iter()
        .map(|&bucket| {
            let count = with_demographics
                .iter()
                .filter(|r| accessor(r).as_deref() == Some(bucket))
                .count() as u64;
            let percentage = if total > 0 {
                (count as f64 / total as f64 * 100.0).round() as u32
            } else {
                0
            };
            DistributionBucket {
                bucket: bucket.to_owned(),
                count,
                percentage,
            }
        })
        .collect()
}

/// Age / gender / race distributions. Records whose demographics were
/// suppressed by the anonymizer contribute to nothing here.
pub fn demographic_distribution(records: &[AnonymizedRecord]) -> DemographicBreakdown {
    DemographicBreakdown {
        age: distribution(records, AGE_BUCKETS, |r| {
            r.demographics.as_ref().and_then(|d| d.age_range.clone())
        }),
        gender: distribution(records, GENDER_BUCKETS, |r| {
            r.demographics
                .as_ref()
                .and_then(|d| d.gender_identity.clone())
        }),
        race: distribution(records, RACE_BUCKETS, |r| {
            r.demographics.as_ref().and_then(|d| d.race.first().cloned())
        }),
    }
}
