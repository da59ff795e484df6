//! Loading the minified cluster table.
//!
//! The cluster table is a CSV with at least the columns `cluster`, `book`
//! and `seq`, plus an optional `ms`. It is joined against the metadata
//! table at load time: rows of books without a primary version are
//! dropped. The resulting store is never modified afterwards.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::types::{ClusterMembership, MilestoneId, SourceUri};
use super::memory::InMemoryClusterStore;
use super::metadata::MetadataTable;

/// Error reading a cluster or metadata table.
#[derive(Debug, thiserror::Error)]
pub enum ClusterTableError {
    /// CSV could not be opened or a row could not be decoded.
    #[error("Cluster table error at {path}: {source}")]
    Csv {
        /// Path of the table.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ClusterRow {
    cluster: u64,
    book: SourceUri,
    seq: u32,
    #[serde(default)]
    ms: Option<u32>,
}

impl ClusterRow {
    fn into_membership(self) -> ClusterMembership {
        let seq = MilestoneId::new(self.seq);
        ClusterMembership {
            cluster: self.cluster,
            book: self.book,
            ms: self.ms.map(MilestoneId::new).unwrap_or(seq),
            seq,
        }
    }
}

/// Build a cluster store from a cluster CSV joined with metadata.
pub fn load_cluster_store(
    cluster_path: &Path,
    metadata: &MetadataTable,
) -> Result<InMemoryClusterStore, ClusterTableError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(cluster_path)
        .map_err(|source| ClusterTableError::Csv { path: cluster_path.to_path_buf(), source })?;

    let mut store = InMemoryClusterStore::new();
    let mut dropped = 0usize;

    for row in reader.deserialize::<ClusterRow>() {
        let row = row.map_err(|source| ClusterTableError::Csv { path: cluster_path.to_path_buf(), source })?;
        if !metadata.is_primary(row.book.as_str()) {
            dropped += 1;
            continue;
        }
        store.add_membership(row.into_membership());
    }

    tracing::info!(
        path = %cluster_path.display(),
        rows = store.num_rows(),
        clusters = store.num_clusters(),
        books = store.num_books(),
        dropped_non_primary = dropped,
        "cluster table loaded"
    );

    Ok(store)
}
