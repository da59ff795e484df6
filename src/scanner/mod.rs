//! Corpus citation scanner.
//!
//! Every corpus text clustered with the main text is searched, milestone
//! by milestone, for the citation strings of the citation map. Texts are
//! independent units of work: with [`ScanConfig::parallel`] set they run
//! on a fixed-size worker pool, and per-text results are concatenated.
//! A text that cannot be located or read contributes nothing and is
//! recorded as an incident.

pub mod paths;
pub mod patterns;

use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::config::ScanConfig;
use crate::normalize::{clean_markup, TextNormalizer};
use crate::segmenter::{read_text, segment};
use crate::store::{ClusterStore, MetadataTable};
use crate::types::{CorpusHit, Incident, IncidentKind, MilestoneId, SourceUri};

pub use paths::{candidate_paths, resolve_text_path, SUFFIX_VARIANTS};
pub use patterns::{build_patterns, AttributionVerbPatterns, CitationPattern, PatternError, PatternGenerator};

/// A corpus text to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTarget {
    /// Book URI.
    pub book: SourceUri,
    /// Expected file location (suffix variants are probed).
    pub path: PathBuf,
}

/// Outcome of scanning one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    /// Text was read and searched.
    Scanned {
        /// Matches found.
        hits: Vec<CorpusHit>,
        /// Number of milestones searched.
        milestones: usize,
    },
    /// No file under any suffix variant.
    Missing {
        /// Location probed.
        path: PathBuf,
    },
    /// File exists but could not be read.
    Unreadable {
        /// File location.
        path: PathBuf,
        /// Read error.
        reason: String,
    },
}

/// Merged result of a corpus scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// All hits, sorted.
    pub hits: Vec<CorpusHit>,
    /// Recovered problems.
    pub incidents: Vec<Incident>,
    /// Texts read and searched.
    pub texts_scanned: usize,
    /// Texts skipped as missing or unreadable.
    pub texts_skipped: usize,
}

/// Corpus texts worth scanning: primary books clustered with `main_uri`,
/// excluding the main text itself.
pub fn scan_targets(
    store: &dyn ClusterStore,
    metadata: &MetadataTable,
    main_uri: &SourceUri,
    corpus_root: &Path,
) -> Vec<TextTarget> {
    store
        .clustered_books(main_uri)
        .into_iter()
        .filter(|book| book != main_uri)
        .filter_map(|book| {
            let record = metadata.get(book.as_str())?;
            Some(TextTarget {
                path: record.corpus_path(corpus_root),
                book,
            })
        })
        .collect()
}

/// Searches corpus texts for citation patterns.
pub struct CorpusScanner<'a> {
    patterns: &'a [CitationPattern],
    normalizer: &'a dyn TextNormalizer,
    config: ScanConfig,
}

impl<'a> CorpusScanner<'a> {
    /// Create a scanner.
    pub fn new(patterns: &'a [CitationPattern], normalizer: &'a dyn TextNormalizer, config: ScanConfig) -> Self {
        Self {
            patterns,
            normalizer,
            config,
        }
    }

    /// Search one milestone body. Offsets are in characters and span the
    /// trigger verb (with any conjunction) through the last citation word.
    pub fn scan_milestone(&self, text_uri: &SourceUri, ms: MilestoneId, body: &str) -> Vec<CorpusHit> {
        let cleaned = self.normalizer.normalize(&clean_markup(body));
        let mut hits = Vec::new();
        for pattern in self.patterns {
            for m in pattern.regex.find_iter(&cleaned) {
                let start = cleaned[..m.start()].chars().count();
                let end = start + m.as_str().chars().count();
                hits.push(CorpusHit {
                    uri: pattern.uri.clone(),
                    start,
                    end,
                    ms,
                    text_uri: text_uri.clone(),
                });
            }
        }
        hits
    }

    /// Search every milestone of a text's content.
    pub fn scan_content(&self, text_uri: &SourceUri, content: &str) -> (Vec<CorpusHit>, usize) {
        let mut hits = Vec::new();
        let mut milestones = 0;
        for milestone in segment(content) {
            milestones += 1;
            hits.extend(self.scan_milestone(text_uri, milestone.id, milestone.body));
        }
        (hits, milestones)
    }

    /// Locate, read and search one text.
    pub fn scan_text(&self, target: &TextTarget) -> TextOutcome {
        let Some(path) = resolve_text_path(&target.path) else {
            return TextOutcome::Missing {
                path: target.path.clone(),
            };
        };

        match read_text(&path) {
            Ok(content) => {
                let (hits, milestones) = self.scan_content(&target.book, &content);
                tracing::debug!(book = %target.book, milestones, hits = hits.len(), "text scanned");
                TextOutcome::Scanned { hits, milestones }
            }
            Err(e) => TextOutcome::Unreadable {
                path,
                reason: e.to_string(),
            },
        }
    }

    /// Scan all targets and merge the outcomes.
    pub fn scan(&self, targets: &[TextTarget]) -> ScanReport {
        let outcomes = if self.config.parallel {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.worker_count)
                .build()
            {
                Ok(pool) => pool.install(|| {
                    targets
                        .par_iter()
                        .map(|t| (t, self.scan_text(t)))
                        .collect::<Vec<_>>()
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "worker pool unavailable; scanning sequentially");
                    self.scan_sequential(targets)
                }
            }
        } else {
            self.scan_sequential(targets)
        };

        let mut report = ScanReport::default();
        for (target, outcome) in outcomes {
            let kind = match outcome {
                TextOutcome::Scanned { hits, milestones } => {
                    report.texts_scanned += 1;
                    report.hits.extend(hits);
                    if milestones > 0 {
                        continue;
                    }
                    IncidentKind::EmptySegmentation {
                        path: target.path.display().to_string(),
                    }
                }
                TextOutcome::Missing { path } => {
                    report.texts_skipped += 1;
                    IncidentKind::MissingCorpusText {
                        book: target.book.clone(),
                        path: path.display().to_string(),
                    }
                }
                TextOutcome::Unreadable { reason, .. } => {
                    report.texts_skipped += 1;
                    IncidentKind::UnreadableCorpusText {
                        book: target.book.clone(),
                        reason,
                    }
                }
            };
            let incident = Incident::new(kind, "scanner");
            incident.log();
            report.incidents.push(incident);
        }

        report.hits.sort();

        tracing::info!(
            texts = targets.len(),
            scanned = report.texts_scanned,
            skipped = report.texts_skipped,
            hits = report.hits.len(),
            parallel = self.config.parallel,
            workers = self.config.worker_count,
            "corpus scan complete"
        );

        report
    }

    fn scan_sequential<'t>(&self, targets: &'t [TextTarget]) -> Vec<(&'t TextTarget, TextOutcome)> {
        targets.iter().map(|t| (t, self.scan_text(t))).collect()
    }
}
