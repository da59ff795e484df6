//! Recovered conditions encountered during a run.
//!
//! ## Purpose
//!
//! Only configuration problems abort a run. Everything else that goes
//! wrong (a corpus text that cannot be found, an evaluated citation with
//! no URI, a main text without milestone markers) is recorded as an
//! [`Incident`], logged, and surfaced in the run report.
//!
//! ## Incident Kinds
//!
//! | Kind | Severity | Raised by | Response |
//! |------|----------|-----------|----------|
//! | MissingCorpusText | MEDIUM | scanner | text skipped, counted |
//! | UnreadableCorpusText | MEDIUM | scanner | text skipped, counted |
//! | EmptySegmentation | HIGH | pipeline | all milestones unmatched |
//! | DataIntegrity | LOW | evaluation merge | row skipped for review |
//! | InvalidPattern | LOW | scanner | citation string ignored |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::uri::SourceUri;

/// Severity levels for incidents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Worth a manual look, does not change results much.
    Low,
    /// Part of the input was skipped.
    Medium,
    /// A whole phase produced nothing useful.
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncidentKind {
    /// No file for a corpus text under any known suffix variant.
    MissingCorpusText {
        /// Corpus text URI.
        book: SourceUri,
        /// Path that was probed.
        path: String,
    },
    /// A corpus text file exists but could not be read.
    UnreadableCorpusText {
        /// Corpus text URI.
        book: SourceUri,
        /// Underlying error.
        reason: String,
    },
    /// A text contains no milestone markers.
    EmptySegmentation {
        /// Path of the text.
        path: String,
    },
    /// An evaluated citation names no book, other URI or new URI.
    DataIntegrity {
        /// The offending row, rendered for manual review.
        row: String,
    },
    /// A citation string produced no usable search pattern.
    InvalidPattern {
        /// Source the string belongs to.
        uri: SourceUri,
        /// The citation string.
        citation: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl IncidentKind {
    /// Severity of this kind.
    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingCorpusText { .. } => Severity::Medium,
            Self::UnreadableCorpusText { .. } => Severity::Medium,
            Self::EmptySegmentation { .. } => Severity::High,
            Self::DataIntegrity { .. } => Severity::Low,
            Self::InvalidPattern { .. } => Severity::Low,
        }
    }

    /// Stable label used for counting.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingCorpusText { .. } => "missing_corpus_text",
            Self::UnreadableCorpusText { .. } => "unreadable_corpus_text",
            Self::EmptySegmentation { .. } => "empty_segmentation",
            Self::DataIntegrity { .. } => "data_integrity",
            Self::InvalidPattern { .. } => "invalid_pattern",
        }
    }

    /// True for kinds that mean a corpus text contributed nothing.
    pub fn is_skipped_text(&self) -> bool {
        matches!(
            self,
            Self::MissingCorpusText { .. } | Self::UnreadableCorpusText { .. }
        )
    }
}

/// A recorded incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// When the incident occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: IncidentKind,
    /// Severity level.
    pub severity: Severity,
    /// Component that raised it.
    pub source: String,
}

impl Incident {
    /// Create a new incident.
    pub fn new(kind: IncidentKind, source: impl Into<String>) -> Self {
        let severity = kind.severity();
        Self {
            timestamp: Utc::now(),
            kind,
            severity,
            source: source.into(),
        }
    }

    /// Log this incident as a structured event.
    pub fn log(&self) {
        match self.severity {
            Severity::Low => tracing::info!(
                incident = self.kind.label(),
                severity = %self.severity,
                source = %self.source,
                detail = ?self.kind,
                "recovered incident"
            ),
            Severity::Medium | Severity::High => tracing::warn!(
                incident = self.kind.label(),
                severity = %self.severity,
                source = %self.source,
                detail = ?self.kind,
                "recovered incident"
            ),
        }
    }
}

/// Count incidents per kind label.
pub fn count_by_kind(incidents: &[Incident]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for incident in incidents {
        *counts.entry(incident.kind.label()).or_insert(0) += 1;
    }
    counts
}
