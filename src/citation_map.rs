//! The verified citation map.
//!
//! A JSON object keyed by source URI. Each entry lists the citation
//! strings that identify the source by direct quotation, the milestones of
//! the main text verified to cite it, and whether the source survives as a
//! text in the corpus:
//!
//! ```json
//! {
//!   "0279Baladhuri.Futuh": {
//!     "citation_strings": ["البلاذري في كتاب الفتوح"],
//!     "cit_ms": [12, 40],
//!     "in_corpus": true,
//!     "ms_reuse": [12],
//!     "post_ms_reuse": []
//!   }
//! }
//! ```
//!
//! The resolution engine only reads the map. Evaluated citations from
//! manual review are merged with [`CitationMap::apply_evaluations`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::normalize::TextNormalizer;
use crate::types::{Incident, IncidentKind, MilestoneId, SourceUri};

/// Error loading or saving a citation map.
#[derive(Debug, thiserror::Error)]
pub enum CitationMapError {
    /// File could not be read or written.
    #[error("Citation map I/O error at {path}: {source}")]
    Io {
        /// Path of the map.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// File is not a valid citation map.
    #[error("Invalid citation map {path}: {source}")]
    Parse {
        /// Path of the map.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Everything known about one cited source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationMapEntry {
    /// Strings used to detect the source by direct quotation.
    #[serde(default)]
    pub citation_strings: Vec<String>,
    /// Main-text milestones verified to cite the source (sorted, unique).
    #[serde(default)]
    pub cit_ms: Vec<MilestoneId>,
    /// Whether the source exists as a text in the corpus; `None` if unknown.
    #[serde(default)]
    pub in_corpus: Option<bool>,
    /// Cited milestones where reuse of the source corroborates the citation.
    #[serde(default)]
    pub ms_reuse: Vec<MilestoneId>,
    /// Milestones after a citation where reuse corroborates it.
    #[serde(default)]
    pub post_ms_reuse: Vec<MilestoneId>,
}

impl CitationMapEntry {
    /// Create an entry from cited milestones alone.
    pub fn from_milestones(cit_ms: impl IntoIterator<Item = MilestoneId>, in_corpus: Option<bool>) -> Self {
        let mut entry = Self {
            cit_ms: cit_ms.into_iter().collect(),
            in_corpus,
            ..Self::default()
        };
        entry.canonicalize();
        entry
    }

    /// Sort and deduplicate the milestone lists.
    fn canonicalize(&mut self) {
        for list in [&mut self.cit_ms, &mut self.ms_reuse, &mut self.post_ms_reuse] {
            list.sort();
            list.dedup();
        }
    }

    /// True if `ms` is one of the verified citation milestones.
    pub fn cites(&self, ms: MilestoneId) -> bool {
        self.cit_ms.binary_search(&ms).is_ok()
    }
}

/// Mapping from source URI to [`CitationMapEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitationMap {
    entries: BTreeMap<SourceUri, CitationMapEntry>,
}

impl CitationMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a map from a UTF-8 JSON file (a byte-order mark is accepted).
    pub fn load(path: &Path) -> Result<Self, CitationMapError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CitationMapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw).map_err(|source| CitationMapError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a map from JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let mut map: Self = serde_json::from_str(raw)?;
        for entry in map.entries.values_mut() {
            entry.canonicalize();
        }
        Ok(map)
    }

    /// Write the map as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), CitationMapError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| CitationMapError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| CitationMapError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Normalize every citation string.
    ///
    /// Duplicates created by normalization are removed, keeping first
    /// occurrence order. Idempotent for an idempotent normalizer.
    pub fn normalize(mut self, normalizer: &dyn TextNormalizer) -> Self {
        for entry in self.entries.values_mut() {
            let mut seen = BTreeSet::new();
            entry.citation_strings = entry
                .citation_strings
                .iter()
                .map(|s| normalizer.normalize(s.trim()))
                .filter(|s| seen.insert(s.clone()))
                .collect();
        }
        self
    }

    /// Look up the entry for a URI.
    pub fn lookup_by_uri(&self, uri: &str) -> Option<&CitationMapEntry> {
        self.entries.get(uri)
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, uri: SourceUri, mut entry: CitationMapEntry) {
        entry.canonicalize();
        self.entries.insert(uri, entry);
    }

    /// Iterate entries in URI order.
    pub fn iter(&self) -> impl Iterator<Item = (&SourceUri, &CitationMapEntry)> {
        self.entries.iter()
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the map has no sources.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every main-text milestone with at least one verified citation.
    pub fn cited_milestones(&self) -> BTreeSet<MilestoneId> {
        self.entries
            .values()
            .flat_map(|e| e.cit_ms.iter().copied())
            .collect()
    }

    /// Merge evaluated citations into the map.
    ///
    /// Returns one `DataIntegrity` incident per record that names no URI;
    /// those records are skipped.
    pub fn apply_evaluations(&mut self, records: &[EvaluatedCitation]) -> Vec<Incident> {
        let mut incidents = Vec::new();

        for record in records {
            let Some((uri, in_corpus)) = record.resolved_uri() else {
                let row = serde_json::to_string(record).unwrap_or_else(|_| format!("{:?}", record));
                let incident = Incident::new(IncidentKind::DataIntegrity { row }, "citation_map");
                incident.log();
                incidents.push(incident);
                continue;
            };

            let citation = record.citation_string.trim().to_string();
            match self.entries.get_mut(&uri) {
                Some(entry) => {
                    if !citation.is_empty() && !entry.citation_strings.contains(&citation) {
                        entry.citation_strings.push(citation);
                    }
                    entry.cit_ms.extend(record.cit_ms.iter().copied());
                    entry.ms_reuse.extend(record.ms_reuse.iter().copied());
                    entry.post_ms_reuse.extend(record.post_ms_reuse.iter().copied());
                    entry.canonicalize();
                }
                None => {
                    let entry = CitationMapEntry {
                        citation_strings: if citation.is_empty() { Vec::new() } else { vec![citation] },
                        cit_ms: record.cit_ms.clone(),
                        in_corpus: Some(in_corpus),
                        ms_reuse: record.ms_reuse.clone(),
                        post_ms_reuse: record.post_ms_reuse.clone(),
                    };
                    self.insert(uri, entry);
                }
            }
        }

        incidents
    }
}

/// A citation confirmed by manual review, ready to merge into the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedCitation {
    /// The confirmed citation string.
    pub citation_string: String,
    /// Main-text milestones where the string occurs.
    #[serde(default)]
    pub cit_ms: Vec<MilestoneId>,
    /// A clustered corpus book the reviewer chose.
    #[serde(default)]
    pub book_uri: Option<SourceUri>,
    /// Another corpus URI (author or book) the reviewer supplied.
    #[serde(default)]
    pub uri_other: Option<SourceUri>,
    /// A URI coined for a source missing from the corpus.
    #[serde(default)]
    pub new_uri: Option<SourceUri>,
    /// Cited milestones corroborated by reuse.
    #[serde(default)]
    pub ms_reuse: Vec<MilestoneId>,
    /// Following milestones corroborated by reuse.
    #[serde(default)]
    pub post_ms_reuse: Vec<MilestoneId>,
}

impl EvaluatedCitation {
    /// The URI this record attributes to and whether it is in the corpus.
    ///
    /// Preference order: chosen book, other URI, coined URI.
    pub fn resolved_uri(&self) -> Option<(SourceUri, bool)> {
        let non_empty = |u: &Option<SourceUri>| u.clone().filter(|u| !u.as_str().is_empty());
        non_empty(&self.book_uri)
            .map(|u| (u, true))
            .or_else(|| non_empty(&self.uri_other).map(|u| (u, true)))
            .or_else(|| non_empty(&self.new_uri).map(|u| (u, false)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::HeavyArabicNormalizer;

    const SAMPLE: &str = r#"{
        "0279Baladhuri.Futuh": {
            "citation_strings": ["البَلاذُري", "البلاذري"],
            "cit_ms": [40, 12, 12],
            "in_corpus": true
        },
        "0207Waqidi": {
            "citation_strings": ["الواقدي"],
            "cit_ms": [3],
            "in_corpus": null,
            "ms_reuse": [3],
            "post_ms_reuse": [4]
        }
    }"#;

    fn ms(v: u32) -> MilestoneId {
        MilestoneId::new(v)
    }

    #[test]
    fn test_parse_canonicalizes_milestones() {
        let map = CitationMap::from_json_str(SAMPLE).unwrap();
        assert_eq!(map.len(), 2);
        let entry = map.lookup_by_uri("0279Baladhuri.Futuh").unwrap();
        assert_eq!(entry.cit_ms, vec![ms(12), ms(40)]);
        assert_eq!(entry.in_corpus, Some(true));
        assert!(entry.ms_reuse.is_empty());

        let waqidi = map.lookup_by_uri("0207Waqidi").unwrap();
        assert_eq!(waqidi.in_corpus, None);
        assert_eq!(waqidi.post_ms_reuse, vec![ms(4)]);
        assert!(map.lookup_by_uri("missing").is_none());
    }

    #[test]
    fn test_accepts_bom() {
        let with_bom = format!("\u{feff}{}", SAMPLE);
        assert!(CitationMap::from_json_str(&with_bom).is_ok());
    }

    #[test]
    fn test_normalize_dedups_and_is_idempotent() {
        let n = HeavyArabicNormalizer::new();
        let once = CitationMap::from_json_str(SAMPLE).unwrap().normalize(&n);
        let entry = once.lookup_by_uri("0279Baladhuri.Futuh").unwrap();
        assert_eq!(entry.citation_strings, vec!["البلاذري".to_string()]);

        let twice = once.clone().normalize(&n);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_cited_milestones() {
        let map = CitationMap::from_json_str(SAMPLE).unwrap();
        let cited: Vec<_> = map.cited_milestones().into_iter().collect();
        assert_eq!(cited, vec![ms(3), ms(12), ms(40)]);
    }

    #[test]
    fn test_apply_evaluations_merges_and_creates() {
        let mut map = CitationMap::from_json_str(SAMPLE).unwrap();
        let records = vec![
            EvaluatedCitation {
                citation_string: "ابن اسحاق".to_string(),
                cit_ms: vec![ms(7)],
                new_uri: Some(SourceUri::from("0150IbnIshaq")),
                ..Default::default()
            },
            EvaluatedCitation {
                citation_string: "الواقدي".to_string(),
                cit_ms: vec![ms(9), ms(3)],
                uri_other: Some(SourceUri::from("0207Waqidi")),
                ..Default::default()
            },
        ];

        let incidents = map.apply_evaluations(&records);
        assert!(incidents.is_empty());

        let ishaq = map.lookup_by_uri("0150IbnIshaq").unwrap();
        assert_eq!(ishaq.in_corpus, Some(false));
        assert_eq!(ishaq.cit_ms, vec![ms(7)]);

        let waqidi = map.lookup_by_uri("0207Waqidi").unwrap();
        assert_eq!(waqidi.citation_strings.len(), 1);
        assert_eq!(waqidi.cit_ms, vec![ms(3), ms(9)]);
    }

    #[test]
    fn test_apply_evaluations_reports_rows_without_uri() {
        let mut map = CitationMap::new();
        let records = vec![EvaluatedCitation {
            citation_string: "قال بعضهم".to_string(),
            cit_ms: vec![ms(1)],
            book_uri: Some(SourceUri::from("")),
            ..Default::default()
        }];

        let incidents = map.apply_evaluations(&records);
        assert_eq!(incidents.len(), 1);
        assert!(matches!(incidents[0].kind, IncidentKind::DataIntegrity { .. }));
        assert!(map.is_empty());
    }

    #[test]
    fn test_book_uri_takes_precedence() {
        let record = EvaluatedCitation {
            book_uri: Some(SourceUri::from("a.b")),
            uri_other: Some(SourceUri::from("c.d")),
            new_uri: Some(SourceUri::from("e")),
            ..Default::default()
        };
        assert_eq!(record.resolved_uri(), Some((SourceUri::from("a.b"), true)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");
        let map = CitationMap::from_json_str(SAMPLE).unwrap();
        map.save(&path).unwrap();
        assert_eq!(CitationMap::load(&path).unwrap(), map);
    }

    #[test]
    fn test_load_missing_file() {
        let err = CitationMap::load(Path::new("/nonexistent/map.json")).unwrap_err();
        assert!(matches!(err, CitationMapError::Io { .. }));
    }
}
