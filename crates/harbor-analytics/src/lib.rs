// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Harbor — Anonymization, differential-privacy noise, and the aggregate
// analytics pipeline.

pub mod aggregate;
pub mod anonymize;
pub mod insights;
pub mod noise;

pub use aggregate::{
    AggregateCache, AggregateSnapshot, CategoryCount, LocationCount, MonthCount,
};
pub use anonymize::{anonymize, AnonymizedRecord, GeneralizedLocation};
pub use insights::{generate as generate_insights, InsightsReport};
pub use noise::{add_noise, NoisePolicy};
