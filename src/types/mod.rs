//! Core types for the citation kernel.

pub mod milestone;
pub mod uri;
pub mod cluster;
pub mod corpus;
pub mod attribution;
pub mod incident;

pub use milestone::{MilestoneId, Milestone};
pub use uri::SourceUri;
pub use cluster::{ClusterMembership, ClusterMember};
pub use corpus::{CorpusHit, CorpusCitation};
pub use attribution::{AttributionRecord, Origin, OriginParseError, SELF_ORIGIN};
pub use incident::{Severity, IncidentKind, Incident, count_by_kind};
