//! Full resolution run.
//!
//! Phases, in order:
//!
//! ```text
//! load inputs → segment main text → continuation (cit-map) → unmatched count
//!   → corpus scan → continuation (corpus-hits) → cross-text inference
//!   → dedup → unmatched count → manifest
//! ```
//!
//! The continuation and scan phases can be replaced by previously computed
//! tables. Each table is written as soon as its phase finishes, so a run
//! that fails late still leaves the earlier tables behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analysis::unresolved_milestones;
use crate::canonical::{canonical_hash_hex, table_fingerprint};
use crate::citation_map::{CitationMap, CitationMapError};
use crate::config::{ConfigError, RunConfig, RunInputs};
use crate::inference::infer_from_aligned;
use crate::normalize::{HeavyArabicNormalizer, TextNormalizer};
use crate::resolver::ContinuationResolver;
use crate::scanner::{build_patterns, scan_targets, AttributionVerbPatterns, CorpusScanner, PatternGenerator};
use crate::segmenter::{milestone_ids, read_text};
use crate::store::{load_cluster_store, ClusterTableError, InMemoryClusterStore, MetadataTable};
use crate::table::{dedup_citations, read_rows, write_rows, AttributionTable, TableError, UnresolvedRow};
use crate::types::{
    count_by_kind, AttributionRecord, CorpusCitation, CorpusHit, Incident, IncidentKind, MilestoneId, Origin,
    SourceUri,
};
use crate::CITATION_KERNEL_SCHEMA_VERSION;

/// Error aborting a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Citation map unreadable.
    #[error(transparent)]
    CitationMap(#[from] CitationMapError),

    /// Cluster or metadata table unreadable.
    #[error(transparent)]
    ClusterTable(#[from] ClusterTableError),

    /// Output or resume table error.
    #[error(transparent)]
    Table(#[from] TableError),

    /// Main text unreadable.
    #[error("Failed to read main text {path}: {source}")]
    MainText {
        /// Main text path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Manifest could not be written.
    #[error("Failed to write manifest {path}: {source}")]
    Manifest {
        /// Manifest path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Which phases were read from resume tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumedPhases {
    /// Verified attributions.
    pub verified: bool,
    /// Corpus hits.
    pub corpus_citations: bool,
    /// Extended corpus citations.
    pub continuous_corpus_citations: bool,
}

/// Fingerprints of the run's inputs and outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprints {
    /// Normalized citation map.
    pub citation_map: String,
    /// Verified attributions.
    pub verified: String,
    /// Corpus hits.
    pub corpus_citations: String,
    /// Extended corpus citations.
    pub continuous_corpus_citations: String,
    /// Final attribution table.
    pub attributions: String,
}

/// Summary counts of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Milestones in the main text.
    pub milestones: usize,
    /// Verified attribution records.
    pub verified_records: usize,
    /// Milestones unmatched after continuation.
    pub unmatched_after_verified: usize,
    /// Corpus texts scanned.
    pub texts_scanned: usize,
    /// Corpus texts skipped (missing or unreadable).
    pub texts_skipped: usize,
    /// Raw corpus hits.
    pub corpus_hits: usize,
    /// Extended corpus citations.
    pub continuous_citations: usize,
    /// Records inferred from aligned texts.
    pub inferred_records: usize,
    /// Records in the final table.
    pub attributions: usize,
    /// Milestones unmatched in the final table.
    pub unmatched_final: usize,
}

/// Paths of every artifact written by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunArtifacts {
    /// Verified attributions.
    pub verified: PathBuf,
    /// Corpus hits.
    pub corpus_citations: PathBuf,
    /// Extended corpus citations.
    pub continuous_corpus_citations: PathBuf,
    /// Final attribution table.
    pub citations_with_aligned: PathBuf,
    /// Unresolved milestones.
    pub unresolved: PathBuf,
    /// This manifest.
    pub manifest: PathBuf,
}

/// Manifest written alongside the output tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Deterministic run identifier (hash of inputs, policy and outputs).
    pub run_id: String,
    /// Schema version.
    pub version: String,
    /// Main text URI.
    pub main_uri: SourceUri,
    /// Resolver policy id.
    pub policy_id: String,
    /// Resolver policy hash.
    pub policy_hash: String,
    /// Text normalization version.
    pub normalization_version: String,
    /// When the run finished.
    pub computed_at: DateTime<Utc>,
    /// Table fingerprints.
    pub fingerprints: RunFingerprints,
    /// Summary counts.
    pub stats: RunStats,
    /// Phases read from resume tables.
    pub resumed: ResumedPhases,
    /// Incident counts by kind.
    pub incidents: BTreeMap<String, usize>,
    /// Artifact locations.
    pub artifacts: RunArtifacts,
}

#[derive(Serialize)]
struct RunIdInput<'a> {
    main_uri: &'a SourceUri,
    policy_hash: &'a str,
    normalization_version: &'a str,
    fingerprints: &'a RunFingerprints,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Written manifest.
    pub manifest: RunManifest,
    /// Final attribution table.
    pub attributions: Vec<AttributionRecord>,
    /// Milestones with no attribution.
    pub unresolved: Vec<MilestoneId>,
    /// Recovered problems, in the order they were raised.
    pub incidents: Vec<Incident>,
}

impl RunReport {
    /// Number of corpus texts skipped.
    pub fn skipped_texts(&self) -> usize {
        self.incidents.iter().filter(|i| i.kind.is_skipped_text()).count()
    }
}

/// Loaded, read-only inputs of a run.
pub struct LoadedInputs {
    /// Primary-version metadata.
    pub metadata: MetadataTable,
    /// Cluster store joined with metadata.
    pub store: InMemoryClusterStore,
    /// Citation map with normalized strings.
    pub citation_map: CitationMap,
    /// Milestone ids of the main text, in text order.
    pub milestones: Vec<MilestoneId>,
}

/// A configured resolution run over one main text.
pub struct CitationRun {
    inputs: RunInputs,
    config: RunConfig,
    normalizer: Box<dyn TextNormalizer>,
    patterns: Box<dyn PatternGenerator>,
}

impl CitationRun {
    /// Create a run with the default normalizer and trigger patterns.
    pub fn new(inputs: RunInputs, config: RunConfig) -> Self {
        Self {
            inputs,
            config,
            normalizer: Box::new(HeavyArabicNormalizer::new()),
            patterns: Box::new(AttributionVerbPatterns::default()),
        }
    }

    /// Replace the text normalizer.
    pub fn with_normalizer(mut self, normalizer: Box<dyn TextNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Replace the pattern generator.
    pub fn with_pattern_generator(mut self, patterns: Box<dyn PatternGenerator>) -> Self {
        self.patterns = patterns;
        self
    }

    /// Load metadata, clusters, the citation map and the main text's milestones.
    pub fn load(&self, incidents: &mut Vec<Incident>) -> Result<LoadedInputs, RunError> {
        let metadata = MetadataTable::load_tsv(&self.inputs.metadata)?;
        let store = load_cluster_store(&self.inputs.cluster_table, &metadata)?;
        let citation_map = CitationMap::load(&self.inputs.citation_map)?.normalize(self.normalizer.as_ref());

        let text = read_text(&self.inputs.main_text).map_err(|source| RunError::MainText {
            path: self.inputs.main_text.clone(),
            source,
        })?;
        let milestones = milestone_ids(&text);
        if milestones.is_empty() {
            let incident = Incident::new(
                IncidentKind::EmptySegmentation {
                    path: self.inputs.main_text.display().to_string(),
                },
                "pipeline",
            );
            incident.log();
            incidents.push(incident);
        }

        tracing::info!(
            main_uri = %self.inputs.main_uri,
            primary_books = metadata.len(),
            sources = citation_map.len(),
            milestones = milestones.len(),
            "inputs loaded"
        );

        Ok(LoadedInputs {
            metadata,
            store,
            citation_map,
            milestones,
        })
    }

    /// Execute every phase and write all artifacts.
    pub fn execute(&self) -> Result<RunReport, RunError> {
        self.config.validate()?;
        let main_uri = &self.inputs.main_uri;
        let output = &self.config.output;
        let mut incidents = Vec::new();
        let mut resumed = ResumedPhases::default();
        let mut stats = RunStats::default();

        let loaded = self.load(&mut incidents)?;
        stats.milestones = loaded.milestones.len();

        let resolver = ContinuationResolver::new(&loaded.store, self.config.resolver.clone())
            .with_segments(loaded.milestones.clone());

        // Verified attributions.
        let verified = match &self.inputs.resume.verified {
            Some(path) => {
                resumed.verified = true;
                tracing::info!(path = %path.display(), "resuming verified attributions");
                read_rows::<AttributionRecord>(path)?
                    .into_iter()
                    .map(as_self_citation)
                    .collect()
            }
            None => resolver.resolve_citation_map(main_uri, &loaded.citation_map),
        };
        let verified_path = output.verified_path(main_uri);
        write_rows(&verified_path, &verified)?;
        stats.verified_records = verified.len();
        let verified_table = AttributionTable::from_records(verified.iter().cloned());
        stats.unmatched_after_verified = unresolved_milestones(&loaded.milestones, &verified_table.milestones()).len();

        // Corpus hits.
        let hits: Vec<CorpusHit> = match &self.inputs.resume.corpus_citations {
            Some(path) => {
                resumed.corpus_citations = true;
                tracing::info!(path = %path.display(), "resuming corpus citations");
                read_rows(path)?
            }
            None => {
                let (patterns, pattern_incidents) = build_patterns(&loaded.citation_map, self.patterns.as_ref());
                incidents.extend(pattern_incidents);
                let targets = scan_targets(&loaded.store, &loaded.metadata, main_uri, &self.inputs.corpus_root);
                let scanner = CorpusScanner::new(&patterns, self.normalizer.as_ref(), self.config.scan);
                let report = scanner.scan(&targets);
                stats.texts_scanned = report.texts_scanned;
                stats.texts_skipped = report.texts_skipped;
                incidents.extend(report.incidents);
                report.hits
            }
        };
        write_rows(&output.corpus_citations_path(), &hits)?;
        stats.corpus_hits = hits.len();

        // Corpus hits extended by continuation.
        let continuous: Vec<CorpusCitation> = match &self.inputs.resume.continuous_corpus_citations {
            Some(path) => {
                resumed.continuous_corpus_citations = true;
                tracing::info!(path = %path.display(), "resuming continuous corpus citations");
                read_rows(path)?
            }
            None => resolver.resolve_corpus_hits(&hits),
        };
        let continuous = dedup_citations(continuous);
        write_rows(&output.continuous_corpus_citations_path(), &continuous)?;
        stats.continuous_citations = continuous.len();

        // Cross-text inference and the final table.
        let inferred = infer_from_aligned(&loaded.store, main_uri, &continuous);
        stats.inferred_records = inferred.len();

        let mut table = AttributionTable::new();
        let mut rejected = 0usize;
        for record in verified.iter().cloned().chain(inferred) {
            if !record.respects_main_uri(main_uri) {
                rejected += 1;
                continue;
            }
            table.push(record);
        }
        if rejected > 0 {
            tracing::warn!(rejected, "dropped records attributing the main text to itself");
        }

        let unresolved = unresolved_milestones(&loaded.milestones, &table.milestones());
        let unresolved_rows: Vec<UnresolvedRow> = unresolved.iter().map(|&ms| UnresolvedRow { ms }).collect();
        write_rows(&output.citations_with_aligned_path(), table.records())?;
        write_rows(&output.unresolved_path(), &unresolved_rows)?;
        stats.attributions = table.len();
        stats.unmatched_final = unresolved.len();

        let fingerprints = RunFingerprints {
            citation_map: canonical_hash_hex(&loaded.citation_map),
            verified: table_fingerprint(&verified),
            corpus_citations: table_fingerprint(&hits),
            continuous_corpus_citations: table_fingerprint(&continuous),
            attributions: table_fingerprint(table.records()),
        };

        let manifest = self.build_manifest(fingerprints, stats, resumed, &incidents, verified_path);
        write_manifest(&manifest)?;

        tracing::info!(
            run_id = %manifest.run_id,
            attributions = manifest.stats.attributions,
            unmatched = manifest.stats.unmatched_final,
            skipped_texts = manifest.stats.texts_skipped,
            incidents = incidents.len(),
            "run complete"
        );

        Ok(RunReport {
            manifest,
            attributions: table.into_records(),
            unresolved,
            incidents,
        })
    }

    fn build_manifest(
        &self,
        fingerprints: RunFingerprints,
        stats: RunStats,
        resumed: ResumedPhases,
        incidents: &[Incident],
        verified_path: PathBuf,
    ) -> RunManifest {
        let output = &self.config.output;
        let policy_hash = self.config.resolver.params_hash();
        let run_id = canonical_hash_hex(&RunIdInput {
            main_uri: &self.inputs.main_uri,
            policy_hash: &policy_hash,
            normalization_version: self.normalizer.version(),
            fingerprints: &fingerprints,
        });

        RunManifest {
            run_id,
            version: CITATION_KERNEL_SCHEMA_VERSION.to_string(),
            main_uri: self.inputs.main_uri.clone(),
            policy_id: self.config.resolver.policy_id().to_string(),
            policy_hash,
            normalization_version: self.normalizer.version().to_string(),
            computed_at: Utc::now(),
            fingerprints,
            stats,
            resumed,
            incidents: count_by_kind(incidents)
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            artifacts: RunArtifacts {
                verified: verified_path,
                corpus_citations: output.corpus_citations_path(),
                continuous_corpus_citations: output.continuous_corpus_citations_path(),
                citations_with_aligned: output.citations_with_aligned_path(),
                unresolved: output.unresolved_path(),
                manifest: output.manifest_path(),
            },
        }
    }
}

/// Resumed verified tables may predate provenance columns.
fn as_self_citation(mut record: AttributionRecord) -> AttributionRecord {
    if record.origin.is_none() {
        record.origin = Some(Origin::SelfCitation);
        record.origin_prev_ms = Some(false);
    }
    record
}

fn write_manifest(manifest: &RunManifest) -> Result<(), RunError> {
    let path: &Path = &manifest.artifacts.manifest;
    let manifest_err = |source: std::io::Error| RunError::Manifest {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_string_pretty(manifest).map_err(|e| manifest_err(std::io::Error::from(e)))?;
    std::fs::write(path, json).map_err(manifest_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resumed_rows_become_self_citations() {
        let bare = AttributionRecord {
            uri: SourceUri::from("a.B"),
            ms: MilestoneId::new(3),
            text_uri: None,
            origin: None,
            origin_prev_ms: None,
        };
        let record = as_self_citation(bare);
        assert!(record.is_self());
        assert_eq!(record.origin_prev_ms, Some(false));

        let aligned = AttributionRecord::aligned(
            SourceUri::from("a.B"),
            MilestoneId::new(3),
            SourceUri::from("t.One"),
            MilestoneId::new(4),
            true,
        );
        assert_eq!(as_self_citation(aligned.clone()), aligned);
    }

    #[test]
    fn test_skipped_texts_counted_from_incidents() {
        let report = RunReport {
            manifest: RunManifest {
                run_id: String::new(),
                version: CITATION_KERNEL_SCHEMA_VERSION.to_string(),
                main_uri: SourceUri::from("main.Text"),
                policy_id: String::new(),
                policy_hash: String::new(),
                normalization_version: String::new(),
                computed_at: Utc::now(),
                fingerprints: RunFingerprints::default(),
                stats: RunStats::default(),
                resumed: ResumedPhases::default(),
                incidents: BTreeMap::new(),
                artifacts: RunArtifacts {
                    verified: PathBuf::new(),
                    corpus_citations: PathBuf::new(),
                    continuous_corpus_citations: PathBuf::new(),
                    citations_with_aligned: PathBuf::new(),
                    unresolved: PathBuf::new(),
                    manifest: PathBuf::new(),
                },
            },
            attributions: Vec::new(),
            unresolved: Vec::new(),
            incidents: vec![
                Incident::new(
                    IncidentKind::MissingCorpusText {
                        book: SourceUri::from("t.One"),
                        path: "/corpus/t.One".to_string(),
                    },
                    "scanner",
                ),
                Incident::new(IncidentKind::DataIntegrity { row: "{}".to_string() }, "citation_map"),
            ],
        };
        assert_eq!(report.skipped_texts(), 1);
    }
}
