//! Run configuration.
//!
//! A [`RunConfig`] is read from a JSON file (every section optional) and
//! then overridden by command-line flags. Input locations live separately
//! in [`RunPaths`], which must validate before a run starts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::policy::ResolverPolicy;
use crate::types::SourceUri;

/// Fatal configuration problem. Aborts the run before any phase starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Input mode flag not recognized.
    #[error("Unknown input mode '{0}': expected cit-map or corpus-hits")]
    UnknownInputMode(String),

    /// Walk mode not recognized.
    #[error("Unknown walk mode '{0}': expected next-id or next-segment")]
    UnknownWalkMode(String),

    /// A required path was not given.
    #[error("Missing required path: {field}")]
    MissingPath {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A required input does not exist.
    #[error("Input {field} not found at {path}")]
    NotFound {
        /// Name of the field.
        field: &'static str,
        /// Path given.
        path: PathBuf,
    },

    /// Parallel scanning needs at least one worker.
    #[error("scan.worker_count must be >= 1 (got {0})")]
    InvalidWorkerCount(usize),

    /// Config file unreadable.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Config file malformed.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

fn default_parallel() -> bool {
    true
}

fn default_worker_count() -> usize {
    16
}

/// Corpus scan scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Scan texts on a worker pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Pool size when `parallel` is set.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl ScanConfig {
    /// Sequential scanning.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            worker_count: 1,
        }
    }

    /// Reject a zero-sized pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel && self.worker_count == 0 {
            return Err(ConfigError::InvalidWorkerCount(self.worker_count));
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            worker_count: default_worker_count(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

/// Where run artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory, created if absent.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl OutputConfig {
    /// Verified (continuation) attributions of the main text.
    pub fn verified_path(&self, main_uri: &SourceUri) -> PathBuf {
        self.dir.join(format!("verified_{main_uri}.csv"))
    }

    /// Raw corpus hits.
    pub fn corpus_citations_path(&self) -> PathBuf {
        self.dir.join("corpus_citations.csv")
    }

    /// Corpus hits extended by continuation.
    pub fn continuous_corpus_citations_path(&self) -> PathBuf {
        self.dir.join("continuous_corpus_citations.csv")
    }

    /// Final attribution table.
    pub fn citations_with_aligned_path(&self) -> PathBuf {
        self.dir.join("citations_with_aligned.csv")
    }

    /// Milestones with no attribution.
    pub fn unresolved_path(&self) -> PathBuf {
        self.dir.join("unresolved_ms.csv")
    }

    /// Run manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join("run_manifest.json")
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Tunable run settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Resolver policy.
    #[serde(default)]
    pub resolver: ResolverPolicy,
    /// Scanner scheduling.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Output locations.
    #[serde(default)]
    pub output: OutputConfig,
}

impl RunConfig {
    /// Load from a JSON file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan.validate()
    }
}

/// Previously computed tables to reuse instead of recomputing a phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeTables {
    /// Verified attributions (continuation output).
    #[serde(default)]
    pub verified: Option<PathBuf>,
    /// Raw corpus hits.
    #[serde(default)]
    pub corpus_citations: Option<PathBuf>,
    /// Extended corpus citations.
    #[serde(default)]
    pub continuous_corpus_citations: Option<PathBuf>,
}

/// Input locations as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPaths {
    /// Citation map JSON.
    pub citation_map: Option<PathBuf>,
    /// Main text.
    pub main_text: Option<PathBuf>,
    /// Minified cluster table.
    pub cluster_table: Option<PathBuf>,
    /// Corpus metadata (tab-separated).
    pub metadata: Option<PathBuf>,
    /// Corpus root directory.
    pub corpus_root: Option<PathBuf>,
    /// URI of the main text.
    pub main_uri: Option<String>,
    /// Optional resume tables.
    pub resume: ResumeTables,
}

/// Validated input locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInputs {
    /// Citation map JSON.
    pub citation_map: PathBuf,
    /// Main text.
    pub main_text: PathBuf,
    /// Minified cluster table.
    pub cluster_table: PathBuf,
    /// Corpus metadata (tab-separated).
    pub metadata: PathBuf,
    /// Corpus root directory.
    pub corpus_root: PathBuf,
    /// URI of the main text.
    pub main_uri: SourceUri,
    /// Optional resume tables.
    pub resume: ResumeTables,
}

fn require(value: Option<PathBuf>, field: &'static str) -> Result<PathBuf, ConfigError> {
    let path = value.ok_or(ConfigError::MissingPath { field })?;
    if !path.exists() {
        return Err(ConfigError::NotFound { field, path });
    }
    Ok(path)
}

impl RunPaths {
    /// Check that every required input is present and exists.
    ///
    /// Resume tables are optional but must exist when given.
    pub fn validate(self) -> Result<RunInputs, ConfigError> {
        let main_uri = self
            .main_uri
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::MissingPath { field: "main_uri" })?;

        let resume = ResumeTables {
            verified: self.resume.verified.map(|p| require(Some(p), "resume.verified")).transpose()?,
            corpus_citations: self
                .resume
                .corpus_citations
                .map(|p| require(Some(p), "resume.corpus_citations"))
                .transpose()?,
            continuous_corpus_citations: self
                .resume
                .continuous_corpus_citations
                .map(|p| require(Some(p), "resume.continuous_corpus_citations"))
                .transpose()?,
        };

        Ok(RunInputs {
            citation_map: require(self.citation_map, "citation_map")?,
            main_text: require(self.main_text, "main_text")?,
            cluster_table: require(self.cluster_table, "cluster_table")?,
            metadata: require(self.metadata, "metadata")?,
            corpus_root: require(self.corpus_root, "corpus_root")?,
            main_uri: SourceUri::new(main_uri),
            resume,
        })
    }
}
