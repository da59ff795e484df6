//! Text-reuse cluster membership.

use serde::{Deserialize, Serialize};

use super::milestone::MilestoneId;
use super::uri::SourceUri;

/// One row of the joined cluster table: `book`'s passage at local
/// sequence position `seq` (milestone `ms`) belongs to `cluster`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterMembership {
    /// Cluster identifier.
    pub cluster: u64,
    /// Member book.
    pub book: SourceUri,
    /// Milestone of `book` matched when `book` is the reference text.
    pub ms: MilestoneId,
    /// Local sequence position of the passage in `book`.
    pub seq: MilestoneId,
}

/// A member returned by a cluster lookup: which book, at which position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterMember {
    /// Clustered book.
    pub book: SourceUri,
    /// Local sequence position of the clustered passage in `book`.
    pub seq: MilestoneId,
}

impl ClusterMember {
    /// Create a member.
    pub fn new(book: SourceUri, seq: MilestoneId) -> Self {
        Self { book, seq }
    }
}
