//! ResolverPolicy v1: eligibility and walk rules for continuation runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::canonical::canonical_hash_hex;
use crate::config::ConfigError;
use crate::DEFAULT_POLICY_VERSION;

/// How a continuation run advances from one milestone to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WalkMode {
    /// Advance to `ms + 1`, treating ids as contiguous.
    #[default]
    NextId,
    /// Advance to the next milestone produced by segmentation.
    NextSegment,
}

impl fmt::Display for WalkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NextId => write!(f, "next-id"),
            Self::NextSegment => write!(f, "next-segment"),
        }
    }
}

impl FromStr for WalkMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "next-id" | "next_id" => Ok(Self::NextId),
            "next-segment" | "next_segment" => Ok(Self::NextSegment),
            other => Err(ConfigError::UnknownWalkMode(other.to_string())),
        }
    }
}

/// What the resolver is fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// The verified citation map of the main text.
    CitationMap,
    /// Raw corpus hits, resolved per scanned text.
    CorpusHits,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CitationMap => write!(f, "cit-map"),
            Self::CorpusHits => write!(f, "corpus-hits"),
        }
    }
}

impl FromStr for InputMode {
    type Err = ConfigError;

    /// Unrecognized modes are a configuration error, never a fallback.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cit-map" | "cit_map" => Ok(Self::CitationMap),
            "corpus-hits" | "corpus_hits" | "corpus_df" => Ok(Self::CorpusHits),
            other => Err(ConfigError::UnknownInputMode(other.to_string())),
        }
    }
}

fn default_version() -> String {
    DEFAULT_POLICY_VERSION.to_string()
}

/// Resolver policy version 1.
///
/// ## Parameters
///
/// - `in_corpus_only`: only extend sources whose `in_corpus` flag is true
/// - `walk_mode`: how a run advances between milestones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverPolicy {
    /// Policy version identifier.
    #[serde(default = "default_version")]
    pub version: String,
    /// Restrict continuation to sources known to be in the corpus.
    #[serde(default)]
    pub in_corpus_only: bool,
    /// Milestone advance rule.
    #[serde(default)]
    pub walk_mode: WalkMode,
}

impl ResolverPolicy {
    /// Create a policy with custom parameters.
    pub fn new(in_corpus_only: bool, walk_mode: WalkMode) -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            in_corpus_only,
            walk_mode,
        }
    }

    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Compute a hash of the policy parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }

    /// Whether a source with the given `in_corpus` flag may be extended.
    pub fn is_eligible(&self, in_corpus: Option<bool>) -> bool {
        !self.in_corpus_only || in_corpus == Some(true)
    }
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self::new(false, WalkMode::NextId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_mode_parsing() {
        assert_eq!("cit-map".parse::<InputMode>().unwrap(), InputMode::CitationMap);
        assert_eq!("corpus_df".parse::<InputMode>().unwrap(), InputMode::CorpusHits);
        let err = "cit-mpa".parse::<InputMode>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownInputMode(ref m) if m == "cit-mpa"));
    }

    #[test]
    fn test_walk_mode_parsing() {
        assert_eq!("next-segment".parse::<WalkMode>().unwrap(), WalkMode::NextSegment);
        assert!("sideways".parse::<WalkMode>().is_err());
    }

    #[test]
    fn test_eligibility() {
        let all = ResolverPolicy::default();
        assert!(all.is_eligible(None));
        assert!(all.is_eligible(Some(false)));

        let strict = ResolverPolicy::new(true, WalkMode::NextId);
        assert!(strict.is_eligible(Some(true)));
        assert!(!strict.is_eligible(Some(false)));
        assert!(!strict.is_eligible(None));
    }

    #[test]
    fn test_params_hash_changes() {
        let a = ResolverPolicy::default();
        let b = ResolverPolicy::new(true, WalkMode::NextId);
        assert_eq!(a.params_hash(), ResolverPolicy::default().params_hash());
        assert_ne!(a.params_hash(), b.params_hash());
    }
}
