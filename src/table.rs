//! Typed output tables.
//!
//! Every table is a headered CSV whose columns are the fields of its row
//! type, in declaration order:
//!
//! | Table | Row type | Columns |
//! |-------|----------|---------|
//! | attributions | [`AttributionRecord`] | `uri, ms, text_uri, origin, origin_prev_ms` |
//! | corpus hits | [`CorpusHit`] | `uri, start, end, ms, text_uri` |
//! | corpus citations | [`CorpusCitation`] | `uri, ms, text_uri` |
//! | unresolved | [`UnresolvedRow`] | `ms` |

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use crate::types::{AttributionRecord, CorpusCitation, MilestoneId, Origin, SourceUri};

/// Error reading or writing a table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// CSV could not be opened, decoded or encoded.
    #[error("Table error at {path}: {source}")]
    Csv {
        /// Table path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },
    /// Output directory could not be created or the file flushed.
    #[error("Table I/O error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// One row of the unresolved-milestone list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnresolvedRow {
    /// Milestone of the main text with no attribution.
    pub ms: MilestoneId,
}

/// Read every row of a headered CSV table.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, TableError> {
    let csv_err = |source| TableError::Csv { path: path.to_path_buf(), source };
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path).map_err(csv_err)?;
    let rows = reader
        .deserialize::<T>()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(csv_err)?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "table read");
    Ok(rows)
}

/// Write rows as a headered CSV table, creating parent directories.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), TableError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| TableError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let csv_err = |source| TableError::Csv { path: path.to_path_buf(), source };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), rows = rows.len(), "table written");
    Ok(())
}

/// Attribution table deduplicated on `(uri, ms, origin)`.
///
/// Records accumulate monotonically; the first record with a given key
/// wins and later duplicates are dropped.
#[derive(Debug, Clone, Default)]
pub struct AttributionTable {
    records: Vec<AttributionRecord>,
    seen: HashSet<(SourceUri, MilestoneId, Option<Origin>)>,
}

impl AttributionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records, deduplicating.
    pub fn from_records(records: impl IntoIterator<Item = AttributionRecord>) -> Self {
        let mut table = Self::new();
        table.extend(records);
        table
    }

    /// Add a record. Returns false if an equal key was already present.
    pub fn push(&mut self, record: AttributionRecord) -> bool {
        let key = (record.uri.clone(), record.ms, record.origin.clone());
        if !self.seen.insert(key) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Add records, returning how many were new.
    pub fn extend(&mut self, records: impl IntoIterator<Item = AttributionRecord>) -> usize {
        records.into_iter().map(|r| self.push(r)).filter(|added| *added).count()
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[AttributionRecord] {
        &self.records
    }

    /// Take the records.
    pub fn into_records(self) -> Vec<AttributionRecord> {
        self.records
    }

    /// Distinct milestones with at least one attribution.
    pub fn milestones(&self) -> BTreeSet<MilestoneId> {
        self.records.iter().map(|r| r.ms).collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Drop exact duplicate corpus citations, keeping first occurrences.
pub fn dedup_citations(citations: Vec<CorpusCitation>) -> Vec<CorpusCitation> {
    let mut seen = HashSet::new();
    citations.into_iter().filter(|c| seen.insert(c.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CorpusHit;

    fn ms(v: u32) -> MilestoneId {
        MilestoneId::new(v)
    }

    fn uri(s: &str) -> SourceUri {
        SourceUri::from(s)
    }

    #[test]
    fn test_dedup_on_uri_ms_origin() {
        let verified = AttributionRecord::verified(uri("a.B"), ms(3));
        let aligned = AttributionRecord::aligned(uri("a.B"), ms(3), uri("t.One"), ms(9), false);
        // Same key as `aligned`; differing prev flag does not make it new.
        let aligned_again = AttributionRecord::aligned(uri("a.B"), ms(3), uri("t.One"), ms(9), true);

        let mut table = AttributionTable::new();
        assert_eq!(table.extend(vec![verified.clone(), aligned.clone()]), 2);
        assert!(!table.push(verified.clone()));
        assert!(!table.push(aligned_again));
        assert_eq!(table.records(), &[verified, aligned]);
        assert_eq!(table.milestones().len(), 1);
    }

    #[test]
    fn test_attribution_csv_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/citations.csv");
        let rows = vec![
            AttributionRecord::verified(uri("a.B"), ms(3)),
            AttributionRecord::aligned(uri("c.D"), ms(4), uri("t.One"), ms(10), true),
        ];
        write_rows(&path, &rows).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let mut lines = raw.lines();
        assert_eq!(lines.next(), Some("uri,ms,text_uri,origin,origin_prev_ms"));
        assert_eq!(lines.next(), Some("a.B,3,,self,false"));
        assert_eq!(lines.next(), Some("c.D,4,,t.One.10,true"));

        let back: Vec<AttributionRecord> = read_rows(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_read_verified_table_without_provenance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verified.csv");
        std::fs::write(&path, "uri,ms\na.B,3\n").unwrap();

        let rows: Vec<AttributionRecord> = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].origin, None);
        assert_eq!(rows[0].origin_prev_ms, None);
    }

    #[test]
    fn test_corpus_hit_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hits.csv");
        let hits = vec![CorpusHit {
            uri: uri("a.B"),
            start: 2,
            end: 18,
            ms: ms(5),
            text_uri: uri("t.One"),
        }];
        write_rows(&path, &hits).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("uri,start,end,ms,text_uri\n"));
        assert_eq!(read_rows::<CorpusHit>(&path).unwrap(), hits);
    }

    #[test]
    fn test_dedup_citations() {
        let c = CorpusCitation { uri: uri("a.B"), ms: ms(1), text_uri: uri("t.One") };
        let d = CorpusCitation { uri: uri("a.B"), ms: ms(2), text_uri: uri("t.One") };
        assert_eq!(dedup_citations(vec![c.clone(), d.clone(), c.clone()]), vec![c, d]);
    }
}
