//! # citation-kernel
//!
//! Milestone-indexed citation resolution over a corpus of text-reuse
//! clusters.
//!
//! The kernel answers one question:
//!
//! > Which sources does each milestone of a main text draw on?
//!
//! ## Core Contract
//!
//! 1. Seed from a verified citation map (source URI → cited milestones)
//! 2. Extend each verified citation forward while cluster evidence keeps
//!    implicating the same source
//! 3. Scan aligned corpus texts for the same citation strings and carry
//!    their citations back onto the main text through the clusters
//! 4. Export a deduplicated attribution table plus a manifest of
//!    fingerprints
//!
//! ## Architecture
//!
//! ```text
//! Main text → Segmenter ─────────────────────────────┐
//! CitationMap → ContinuationResolver → verified ─────┤
//!                     ↑                               ├→ AttributionTable
//!               ClusterStore (memory)                 │
//!                     ↓                               │
//! Corpus texts → CorpusScanner → hits → continuation → Inference
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same citation map + same cluster table + same policy → identical
//!   attribution set
//! - Cluster lookups return members in canonical (book, seq) order
//! - The corpus scan merges per-text results independent of completion order

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod canonical;
pub mod citation_map;
pub mod config;
pub mod inference;
pub mod normalize;
pub mod pipeline;
pub mod policy;
pub mod resolver;
pub mod scanner;
pub mod segmenter;
pub mod store;
pub mod table;
pub mod types;

// Re-exports
pub use types::{
    AttributionRecord, ClusterMember, ClusterMembership, CorpusCitation, CorpusHit, Incident, IncidentKind,
    Milestone, MilestoneId, Origin, Severity, SourceUri,
};
pub use citation_map::{CitationMap, CitationMapEntry, CitationMapError, EvaluatedCitation};
pub use store::{load_cluster_store, ClusterStore, ClusterTableError, InMemoryClusterStore, MetadataTable};
pub use policy::{AgreementFilter, AttributionFilter, InputMode, ResolverPolicy, WalkMode};
pub use resolver::{ContinuationResolver, Evidence, RunState};
pub use scanner::{AttributionVerbPatterns, CorpusScanner, PatternGenerator, ScanReport};
pub use inference::infer_from_aligned;
pub use normalize::{clean_markup, HeavyArabicNormalizer, TextNormalizer, NORMALIZATION_VERSION};
pub use table::{AttributionTable, TableError};
pub use config::{ConfigError, RunConfig, RunPaths, ScanConfig};
pub use pipeline::{CitationRun, RunError, RunManifest, RunReport};
pub use canonical::{canonical_hash, canonical_hash_hex, table_fingerprint, to_canonical_bytes};

/// Schema version for manifests and output tables.
/// Increment on breaking changes to any schema type.
pub const CITATION_KERNEL_SCHEMA_VERSION: &str = "1.0.0";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "resolver_v1";
