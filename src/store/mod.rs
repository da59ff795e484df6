//! Cluster lookup backends.

pub mod memory;
pub mod metadata;
pub mod table;

use crate::types::{ClusterMember, MilestoneId, SourceUri};

/// Read-only lookup of text-reuse clusters.
///
/// Implementations must guarantee deterministic ordering of results and
/// must be safe to share across scanner workers without locking.
pub trait ClusterStore: Send + Sync {
    /// Members of every cluster containing `reference` at milestone `ms`
    /// (sorted, deduplicated, including the reference row itself).
    ///
    /// With `ms = None`, members of every cluster containing any milestone
    /// of `reference`.
    fn clusters_for(&self, reference: &SourceUri, ms: Option<MilestoneId>) -> Vec<ClusterMember>;

    /// Milestones of `reference` that belong to at least one cluster, ascending.
    fn milestones_of(&self, reference: &SourceUri) -> Vec<MilestoneId>;

    /// Distinct books ever clustered with `reference`, in URI order.
    fn clustered_books(&self, reference: &SourceUri) -> Vec<SourceUri> {
        let mut books: Vec<SourceUri> = self
            .clusters_for(reference, None)
            .into_iter()
            .map(|m| m.book)
            .collect();
        books.dedup();
        books
    }
}

pub use memory::InMemoryClusterStore;
pub use metadata::{MetadataRecord, MetadataTable, PRIMARY_STATUS};
pub use table::{load_cluster_store, ClusterTableError};
