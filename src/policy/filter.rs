//! Post-filters over a finished attribution table.
//!
//! Filters are applied after resolution and never feed back into it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{AttributionRecord, MilestoneId, Origin, SourceUri};

/// A swappable acceptance rule over attribution records.
pub trait AttributionFilter: Send + Sync {
    /// Short name recorded in reports.
    fn name(&self) -> &str;

    /// Return the accepted records, preserving input order.
    fn apply(&self, records: &[AttributionRecord]) -> Vec<AttributionRecord>;
}

/// Require independent agreement before accepting an attribution.
///
/// Records are grouped by `(ms, uri)`. A group is kept whole if any of its
/// records has a `self` origin or if it carries at least `min_origins`
/// distinct origins (a missing origin counts as one value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementFilter {
    /// Distinct origins needed when no self origin is present.
    pub min_origins: usize,
}

impl AgreementFilter {
    /// Create a filter with the given threshold.
    pub fn new(min_origins: usize) -> Self {
        Self { min_origins }
    }
}

impl Default for AgreementFilter {
    fn default() -> Self {
        Self::new(2)
    }
}

impl AttributionFilter for AgreementFilter {
    fn name(&self) -> &str {
        "agreement"
    }

    fn apply(&self, records: &[AttributionRecord]) -> Vec<AttributionRecord> {
        let mut groups: BTreeMap<(MilestoneId, &SourceUri), BTreeSet<Option<&Origin>>> = BTreeMap::new();
        for record in records {
            groups
                .entry((record.ms, &record.uri))
                .or_default()
                .insert(record.origin.as_ref());
        }

        let accepted: BTreeSet<(MilestoneId, &SourceUri)> = groups
            .into_iter()
            .filter(|(_, origins)| {
                origins.iter().flatten().any(|o| o.is_self()) || origins.len() >= self.min_origins
            })
            .map(|(key, _)| key)
            .collect();

        let kept: Vec<AttributionRecord> = records
            .iter()
            .filter(|r| accepted.contains(&(r.ms, &r.uri)))
            .cloned()
            .collect();

        let milestones: BTreeSet<MilestoneId> = kept.iter().map(|r| r.ms).collect();
        tracing::info!(
            min_origins = self.min_origins,
            records = kept.len(),
            milestones = milestones.len(),
            "agreement filter applied"
        );

        kept
    }
}
