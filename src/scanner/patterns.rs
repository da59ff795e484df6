//! Search patterns for citation strings.
//!
//! A [`PatternGenerator`] turns a normalized citation string into a regex
//! that matches the string only where it is introduced by an attribution
//! verb. The scanner depends on the trait, not on the trigger list.

use regex::Regex;

use crate::citation_map::CitationMap;
use crate::types::{Incident, IncidentKind, SourceUri};

/// Error building a pattern from a citation string.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// The string has no words.
    #[error("Citation string is empty")]
    EmptyCitation,

    /// The assembled expression was rejected by the regex engine.
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Maps a citation string to a matchable pattern.
pub trait PatternGenerator: Send + Sync {
    /// Build the pattern for one citation string.
    fn pattern(&self, citation: &str) -> Result<Regex, PatternError>;
}

/// Requires one of a fixed set of "said"/"mentioned" verbs, optionally
/// prefixed by a conjunction, before the citation words.
///
/// Default triggers: قال and ذكر, with optional و or ف.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributionVerbPatterns {
    /// Trigger verbs.
    pub verbs: Vec<String>,
    /// Single-letter conjunctions that may be attached to a verb.
    pub conjunctions: Vec<char>,
}

impl Default for AttributionVerbPatterns {
    fn default() -> Self {
        Self {
            verbs: vec!["قال".to_string(), "ذكر".to_string()],
            conjunctions: vec!['و', 'ف'],
        }
    }
}

impl AttributionVerbPatterns {
    /// The pattern source for a citation string, before compilation.
    pub fn pattern_source(&self, citation: &str) -> Result<String, PatternError> {
        let words: Vec<String> = citation.split_whitespace().map(regex::escape).collect();
        if words.is_empty() {
            return Err(PatternError::EmptyCitation);
        }

        let verbs: Vec<String> = self.verbs.iter().map(|v| regex::escape(v)).collect();
        let conjunction = if self.conjunctions.is_empty() {
            String::new()
        } else {
            let class: String = self.conjunctions.iter().map(|c| regex::escape(&c.to_string())).collect();
            format!("[{class}]?")
        };

        // The match spans trigger to last word; a trailing word boundary keeps
        // a citation from matching the head of a longer word.
        let ends_in_word = citation.trim_end().chars().last().is_some_and(is_word_char);
        Ok(format!(
            r"\b{conjunction}(?:{verbs})\W+{words}{tail}",
            verbs = verbs.join("|"),
            words = words.join(r"\W+"),
            tail = if ends_in_word { r"\b" } else { "" },
        ))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl PatternGenerator for AttributionVerbPatterns {
    fn pattern(&self, citation: &str) -> Result<Regex, PatternError> {
        Ok(Regex::new(&self.pattern_source(citation)?)?)
    }
}

/// A compiled search pattern and the source it identifies.
#[derive(Debug, Clone)]
pub struct CitationPattern {
    /// Source URI.
    pub uri: SourceUri,
    /// Normalized citation string.
    pub citation: String,
    /// Compiled pattern.
    pub regex: Regex,
}

/// Build patterns for every citation string of a (normalized) map.
///
/// Strings that yield no pattern are reported as incidents and skipped.
pub fn build_patterns(map: &CitationMap, generator: &dyn PatternGenerator) -> (Vec<CitationPattern>, Vec<Incident>) {
    let mut patterns = Vec::new();
    let mut incidents = Vec::new();

    for (uri, entry) in map.iter() {
        for citation in &entry.citation_strings {
            match generator.pattern(citation) {
                Ok(regex) => patterns.push(CitationPattern {
                    uri: uri.clone(),
                    citation: citation.clone(),
                    regex,
                }),
                Err(e) => {
                    let incident = Incident::new(
                        IncidentKind::InvalidPattern {
                            uri: uri.clone(),
                            citation: citation.clone(),
                            reason: e.to_string(),
                        },
                        "scanner",
                    );
                    incident.log();
                    incidents.push(incident);
                }
            }
        }
    }

    tracing::info!(patterns = patterns.len(), rejected = incidents.len(), "citation patterns built");
    (patterns, incidents)
}
