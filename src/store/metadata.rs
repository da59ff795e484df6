//! Corpus metadata table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::types::SourceUri;
use super::table::ClusterTableError;

/// Status value of texts eligible for lookup and scanning.
pub const PRIMARY_STATUS: &str = "pri";

/// One row of the metadata table. Other columns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Book URI.
    pub book: SourceUri,
    /// Version status (`pri` for the primary version).
    #[serde(default)]
    pub status: String,
    /// Path of the text relative to the metadata's own location.
    #[serde(default)]
    pub local_path: String,
}

impl MetadataRecord {
    /// True for primary versions.
    pub fn is_primary(&self) -> bool {
        self.status.trim() == PRIMARY_STATUS
    }

    /// Location of the text under a corpus root.
    ///
    /// Metadata paths look like `../data/0845Maqrizi/...`; the part after
    /// the first `..` is joined onto the root.
    pub fn corpus_path(&self, corpus_root: &Path) -> PathBuf {
        let local = self.local_path.trim();
        let relative = local.split_once("..").map(|(_, rest)| rest).unwrap_or(local);
        corpus_root.join(relative.trim_start_matches(&['/', '\\'][..]))
    }
}

/// Primary-version metadata keyed by book URI.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    primary: BTreeMap<SourceUri, MetadataRecord>,
}

impl MetadataTable {
    /// Build from records, keeping primary versions only.
    pub fn from_records(records: impl IntoIterator<Item = MetadataRecord>) -> Self {
        let primary = records
            .into_iter()
            .filter(MetadataRecord::is_primary)
            .map(|r| (r.book.clone(), r))
            .collect();
        Self { primary }
    }

    /// Load a tab-separated metadata file.
    pub fn load_tsv(path: &Path) -> Result<Self, ClusterTableError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_path(path)
            .map_err(|source| ClusterTableError::Csv { path: path.to_path_buf(), source })?;

        let mut records = Vec::new();
        for row in reader.deserialize::<MetadataRecord>() {
            let row = row.map_err(|source| ClusterTableError::Csv { path: path.to_path_buf(), source })?;
            records.push(row);
        }

        Ok(Self::from_records(records))
    }

    /// Metadata for a primary book.
    pub fn get(&self, book: &str) -> Option<&MetadataRecord> {
        self.primary.get(book)
    }

    /// True if `book` has a primary version.
    pub fn is_primary(&self, book: &str) -> bool {
        self.primary.contains_key(book)
    }

    /// True if any primary book is by `author`.
    pub fn has_author(&self, author: &str) -> bool {
        self.primary.keys().any(|b| b.author() == author)
    }

    /// Iterate primary records in URI order.
    pub fn iter(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.primary.values()
    }

    /// Number of primary books.
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    /// True if there are no primary books.
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(book: &str, status: &str, local_path: &str) -> MetadataRecord {
        MetadataRecord {
            book: SourceUri::from(book),
            status: status.to_string(),
            local_path: local_path.to_string(),
        }
    }

    #[test]
    fn test_keeps_primary_only() {
        let table = MetadataTable::from_records(vec![
            record("0279Baladhuri.Futuh", "pri", "../data/0279Baladhuri/0279Baladhuri.Futuh/x"),
            record("0310Tabari.Tarikh", "sec", "../data/0310Tabari/0310Tabari.Tarikh/y"),
        ]);
        assert_eq!(table.len(), 1);
        assert!(table.is_primary("0279Baladhuri.Futuh"));
        assert!(!table.is_primary("0310Tabari.Tarikh"));
        assert!(table.has_author("0279Baladhuri"));
        assert!(!table.has_author("0310Tabari"));
    }

    #[test]
    fn test_corpus_path() {
        let r = record("a.B", "pri", "../data/0279Baladhuri/0279Baladhuri.Futuh/0279Baladhuri.Futuh.Shamela001-ara1");
        let path = r.corpus_path(Path::new("/corpus"));
        assert_eq!(
            path,
            PathBuf::from("/corpus/data/0279Baladhuri/0279Baladhuri.Futuh/0279Baladhuri.Futuh.Shamela001-ara1")
        );
    }

    #[test]
    fn test_load_tsv_ignores_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.csv");
        std::fs::write(
            &path,
            "version_uri\tbook\tstatus\tlocal_path\tdate\n\
             v1\t0279Baladhuri.Futuh\tpri\t../data/x\t279\n\
             v2\t0279Baladhuri.Futuh2\tsec\t../data/y\t279\n",
        )
        .unwrap();

        let table = MetadataTable::load_tsv(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("0279Baladhuri.Futuh").unwrap().local_path, "../data/x");
    }
}
