//! In-memory cluster store.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{ClusterMember, ClusterMembership, MilestoneId, SourceUri};
use super::ClusterStore;

/// In-memory cluster store.
///
/// Uses BTreeMap/BTreeSet for deterministic iteration order. Built once,
/// then only read.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClusterStore {
    /// Cluster id -> members.
    members: BTreeMap<u64, BTreeSet<ClusterMember>>,
    /// Book -> milestone -> clusters containing that milestone.
    by_book: BTreeMap<SourceUri, BTreeMap<MilestoneId, BTreeSet<u64>>>,
    /// Number of membership rows accepted.
    rows: usize,
}

impl InMemoryClusterStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one membership row.
    pub fn add_membership(&mut self, row: ClusterMembership) {
        self.members
            .entry(row.cluster)
            .or_default()
            .insert(ClusterMember::new(row.book.clone(), row.seq));

        self.by_book
            .entry(row.book)
            .or_default()
            .entry(row.ms)
            .or_default()
            .insert(row.cluster);

        self.rows += 1;
    }

    /// Add a cluster whose members' milestone and sequence position coincide.
    pub fn add_cluster<I, U>(&mut self, cluster: u64, members: I)
    where
        I: IntoIterator<Item = (U, u32)>,
        U: Into<SourceUri>,
    {
        for (book, ms) in members {
            self.add_membership(ClusterMembership {
                cluster,
                book: book.into(),
                ms: MilestoneId::new(ms),
                seq: MilestoneId::new(ms),
            });
        }
    }

    /// Number of clusters.
    pub fn num_clusters(&self) -> usize {
        self.members.len()
    }

    /// Number of distinct books.
    pub fn num_books(&self) -> usize {
        self.by_book.len()
    }

    /// Number of membership rows added.
    pub fn num_rows(&self) -> usize {
        self.rows
    }

    fn collect_members<'a>(&self, clusters: impl Iterator<Item = &'a u64>) -> Vec<ClusterMember> {
        let mut out: BTreeSet<&ClusterMember> = BTreeSet::new();
        for cluster in clusters {
            if let Some(members) = self.members.get(cluster) {
                out.extend(members.iter());
            }
        }
        out.into_iter().cloned().collect()
    }
}

impl ClusterStore for InMemoryClusterStore {
    fn clusters_for(&self, reference: &SourceUri, ms: Option<MilestoneId>) -> Vec<ClusterMember> {
        let Some(milestones) = self.by_book.get(reference) else {
            return Vec::new();
        };

        match ms {
            Some(ms) => match milestones.get(&ms) {
                Some(clusters) => self.collect_members(clusters.iter()),
                None => Vec::new(),
            },
            None => self.collect_members(milestones.values().flat_map(|c| c.iter())),
        }
    }

    fn milestones_of(&self, reference: &SourceUri) -> Vec<MilestoneId> {
        self.by_book
            .get(reference)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }
}
