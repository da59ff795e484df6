//! Attribution records: the output unit of a resolution run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::milestone::MilestoneId;
use super::uri::SourceUri;

/// Literal used for self origins in tables.
pub const SELF_ORIGIN: &str = "self";

/// Error parsing an origin locator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OriginParseError {
    /// Locator is empty.
    #[error("Empty origin locator")]
    Empty,
    /// Locator has no `.ms` suffix or the suffix is not a milestone id.
    #[error("Origin locator '{0}' is not of the form <uri>.<ms>")]
    Malformed(String),
}

/// Where an attribution came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Origin {
    /// Verified citation in the main text, possibly extended by continuation.
    SelfCitation,
    /// A citation found in an aligned text at the given milestone.
    Aligned {
        /// The aligned corpus text.
        text: SourceUri,
        /// Milestone of the aligned text carrying the citation.
        ms: MilestoneId,
    },
}

impl Origin {
    /// Create an aligned origin.
    pub fn aligned(text: SourceUri, ms: MilestoneId) -> Self {
        Self::Aligned { text, ms }
    }

    /// True for self origins.
    pub fn is_self(&self) -> bool {
        matches!(self, Self::SelfCitation)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfCitation => f.write_str(SELF_ORIGIN),
            Self::Aligned { text, ms } => write!(f, "{}.{}", text, ms),
        }
    }
}

impl FromStr for Origin {
    type Err = OriginParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(OriginParseError::Empty);
        }
        if s == SELF_ORIGIN {
            return Ok(Self::SelfCitation);
        }
        let (text, ms) = s
            .rsplit_once('.')
            .ok_or_else(|| OriginParseError::Malformed(s.to_string()))?;
        let ms = ms
            .parse::<MilestoneId>()
            .map_err(|_| OriginParseError::Malformed(s.to_string()))?;
        if text.is_empty() {
            return Err(OriginParseError::Malformed(s.to_string()));
        }
        Ok(Self::Aligned { text: SourceUri::new(text), ms })
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.to_string()
    }
}

impl TryFrom<String> for Origin {
    type Error = OriginParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// "Milestone `ms` of the main text is attributed to source `uri`."
///
/// Field order matches the attribution table columns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttributionRecord {
    /// Attributed source.
    pub uri: SourceUri,
    /// Milestone of the main text.
    pub ms: MilestoneId,
    /// Text the milestone belongs to, when not the run's main text.
    #[serde(default)]
    pub text_uri: Option<SourceUri>,
    /// Provenance of the attribution.
    #[serde(default)]
    pub origin: Option<Origin>,
    /// True if the evidence came from the milestone after the aligned one.
    #[serde(default)]
    pub origin_prev_ms: Option<bool>,
}

impl AttributionRecord {
    /// A verified (or continuation-extended) citation of the main text.
    pub fn verified(uri: SourceUri, ms: MilestoneId) -> Self {
        Self {
            uri,
            ms,
            text_uri: None,
            origin: Some(Origin::SelfCitation),
            origin_prev_ms: Some(false),
        }
    }

    /// An attribution inferred from a citation in an aligned text.
    pub fn aligned(
        uri: SourceUri,
        ms: MilestoneId,
        aligned_text: SourceUri,
        aligned_ms: MilestoneId,
        origin_prev_ms: bool,
    ) -> Self {
        Self {
            uri,
            ms,
            text_uri: None,
            origin: Some(Origin::aligned(aligned_text, aligned_ms)),
            origin_prev_ms: Some(origin_prev_ms),
        }
    }

    /// Deduplication key: records sharing it are the same attribution.
    pub fn key(&self) -> (&SourceUri, MilestoneId, Option<&Origin>) {
        (&self.uri, self.ms, self.origin.as_ref())
    }

    /// True if the record came from the main text's own citations.
    pub fn is_self(&self) -> bool {
        self.origin.as_ref().map(Origin::is_self).unwrap_or(false)
    }

    /// Check the self-attribution invariant against the run's main text:
    /// a record may name the main text only if its origin is `self`.
    pub fn respects_main_uri(&self, main_uri: &SourceUri) -> bool {
        &self.uri != main_uri || self.is_self()
    }
}
