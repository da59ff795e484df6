//! Citations found in corpus texts.

use serde::{Deserialize, Serialize};

use super::milestone::MilestoneId;
use super::uri::SourceUri;

/// A raw regex match of a citation string inside a corpus text milestone.
///
/// Offsets are character offsets into the cleaned, normalized milestone
/// body. Field order matches the corpus-hit table columns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorpusHit {
    /// Source the matched citation string belongs to.
    pub uri: SourceUri,
    /// Start offset (chars) of the trigger verb.
    pub start: usize,
    /// End offset (chars, exclusive).
    pub end: usize,
    /// Milestone of the scanned text containing the match.
    pub ms: MilestoneId,
    /// The scanned text.
    pub text_uri: SourceUri,
}

impl CorpusHit {
    /// Drop the offsets, keeping only what inference needs.
    pub fn to_citation(&self) -> CorpusCitation {
        CorpusCitation {
            uri: self.uri.clone(),
            ms: self.ms,
            text_uri: self.text_uri.clone(),
        }
    }
}

/// A source attributed to a milestone of a corpus text, either directly
/// from a hit or by continuation over that text's clusters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorpusCitation {
    /// Cited source.
    pub uri: SourceUri,
    /// Milestone of `text_uri`.
    pub ms: MilestoneId,
    /// The corpus text containing the citation.
    pub text_uri: SourceUri,
}
