//! Continuation resolver.
//!
//! Starting from each verified citation of a source, walks forward through
//! the milestones of the main text for as long as evidence keeps
//! implicating the same source. Each `(uri, seed)` run is a small state
//! machine:
//!
//! ```text
//! Seeking ──seed unresolved──▶ Extending(seed)
//!    │                            │  evidence at current: emit, advance
//!    └──seed already resolved──▶ Stopped ◀──no evidence / no next milestone
//! ```
//!
//! Evidence is checked in a fixed order at each milestone:
//!
//! 1. author-only URI: every clustered book by that author
//! 2. the URI itself among the clustered books
//! 3. another verified citation of the URI at this milestone
//!
//! Resolution is deterministic and keeps no state between main texts.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::citation_map::CitationMap;
use crate::policy::{ResolverPolicy, WalkMode};
use crate::store::ClusterStore;
use crate::types::{AttributionRecord, CorpusCitation, CorpusHit, MilestoneId, SourceUri};

/// State of one `(uri, seed)` continuation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Deciding whether the seed starts a run.
    Seeking,
    /// Looking for evidence at `current`.
    Extending {
        /// Milestone under examination.
        current: MilestoneId,
    },
    /// Run finished.
    Stopped,
}

/// Evidence found for a source at one milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    /// Author-only URI resolved to these clustered books.
    AuthorBooks(Vec<SourceUri>),
    /// The source itself is clustered with the milestone.
    ClusteredBook,
    /// The milestone is itself a verified citation of the source.
    VerifiedCitation,
    /// Nothing implicates the source here.
    None,
}

/// One source to resolve: its URI, sorted seed milestones and whether the
/// policy lets it be extended.
struct SourceSeeds<'a> {
    uri: &'a SourceUri,
    cited: &'a [MilestoneId],
    eligible: bool,
}

/// Milestone advance rule, bound to a milestone order when walking by segment.
enum Walk<'a> {
    NextId,
    NextSegment(&'a [MilestoneId]),
}

impl Walk<'_> {
    fn advance(&self, current: MilestoneId) -> Option<MilestoneId> {
        match self {
            Walk::NextId => current.next(),
            Walk::NextSegment(order) => {
                let idx = order.partition_point(|m| *m <= current);
                order.get(idx).copied()
            }
        }
    }
}

/// Continuation resolver over a cluster store.
pub struct ContinuationResolver<'a> {
    store: &'a dyn ClusterStore,
    policy: ResolverPolicy,
    segments: Option<Vec<MilestoneId>>,
}

impl<'a> ContinuationResolver<'a> {
    /// Create a resolver.
    pub fn new(store: &'a dyn ClusterStore, policy: ResolverPolicy) -> Self {
        Self {
            store,
            policy,
            segments: None,
        }
    }

    /// Milestone order of the main text, used by [`WalkMode::NextSegment`].
    ///
    /// Without it, segment walks fall back to advancing by id.
    pub fn with_segments(mut self, mut ids: Vec<MilestoneId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        self.segments = Some(ids);
        self
    }

    /// Get the policy.
    pub fn policy(&self) -> &ResolverPolicy {
        &self.policy
    }

    /// Resolve a citation map against `main_uri`.
    ///
    /// The main text's own entry passes through unchanged. Every record
    /// carries a `self` origin.
    pub fn resolve_citation_map(&self, main_uri: &SourceUri, map: &CitationMap) -> Vec<AttributionRecord> {
        let sources = map.iter().map(|(uri, entry)| SourceSeeds {
            uri,
            cited: &entry.cit_ms,
            eligible: self.policy.is_eligible(entry.in_corpus),
        });

        let walk = self.walk();
        let pairs = self.resolve_sources(main_uri, sources, &walk);
        let records: Vec<AttributionRecord> = pairs
            .into_iter()
            .map(|(uri, ms)| AttributionRecord::verified(uri, ms))
            .collect();

        tracing::info!(
            main_uri = %main_uri,
            sources = map.len(),
            records = records.len(),
            walk_mode = %self.policy.walk_mode,
            "continuation over citation map complete"
        );

        records
    }

    /// Extend raw corpus hits by continuation within each scanned text.
    ///
    /// Hits are grouped per `text_uri`; each text is resolved as its own
    /// main text. The `in_corpus_only` policy does not apply: it restricts
    /// citation-map sources, and a hit carries no corpus flag.
    pub fn resolve_corpus_hits(&self, hits: &[CorpusHit]) -> Vec<CorpusCitation> {
        let mut by_text: BTreeMap<&SourceUri, BTreeMap<&SourceUri, BTreeSet<MilestoneId>>> = BTreeMap::new();
        for hit in hits {
            by_text
                .entry(&hit.text_uri)
                .or_default()
                .entry(&hit.uri)
                .or_default()
                .insert(hit.ms);
        }

        let mut out = Vec::new();
        for (text_uri, sources) in &by_text {
            let seeds: Vec<(&SourceUri, Vec<MilestoneId>)> = sources
                .iter()
                .map(|(uri, ms)| (*uri, ms.iter().copied().collect()))
                .collect();
            let sources = seeds.iter().map(|(uri, cited)| SourceSeeds {
                uri,
                cited,
                eligible: true,
            });

            // Segment order belongs to the main text only.
            let before = out.len();
            for (uri, ms) in self.resolve_sources(text_uri, sources, &Walk::NextId) {
                out.push(CorpusCitation {
                    uri,
                    ms,
                    text_uri: (*text_uri).clone(),
                });
            }
            tracing::debug!(text_uri = %text_uri, citations = out.len() - before, "text extended");
        }

        tracing::info!(
            texts = by_text.len(),
            hits = hits.len(),
            citations = out.len(),
            "continuation over corpus hits complete"
        );

        out
    }

    /// Evidence for `uri` at milestone `current` of `main_uri`.
    pub fn evidence_at(
        &self,
        main_uri: &SourceUri,
        uri: &SourceUri,
        current: MilestoneId,
        cited: &[MilestoneId],
    ) -> Evidence {
        let members = self.store.clusters_for(main_uri, Some(current));

        if uri.is_author_only() {
            let mut books: Vec<SourceUri> = members
                .iter()
                .filter(|m| m.book.is_book_of(uri))
                .map(|m| m.book.clone())
                .collect();
            books.dedup();
            if !books.is_empty() {
                return Evidence::AuthorBooks(books);
            }
        }

        if members.iter().any(|m| &m.book == uri) {
            return Evidence::ClusteredBook;
        }

        if cited.binary_search(&current).is_ok() {
            return Evidence::VerifiedCitation;
        }

        Evidence::None
    }

    fn walk(&self) -> Walk<'_> {
        match (self.policy.walk_mode, &self.segments) {
            (WalkMode::NextSegment, Some(order)) => Walk::NextSegment(order),
            (WalkMode::NextSegment, None) => {
                tracing::warn!("segment walk requested without a milestone order; advancing by id");
                Walk::NextId
            }
            (WalkMode::NextId, _) => Walk::NextId,
        }
    }

    fn resolve_sources<'s>(
        &self,
        main_uri: &SourceUri,
        sources: impl Iterator<Item = SourceSeeds<'s>>,
        walk: &Walk<'_>,
    ) -> Vec<(SourceUri, MilestoneId)> {
        let mut out = Vec::new();
        let mut seen: HashSet<(SourceUri, MilestoneId)> = HashSet::new();
        let mut emit = |uri: &SourceUri, ms: MilestoneId, out: &mut Vec<(SourceUri, MilestoneId)>| {
            if seen.insert((uri.clone(), ms)) {
                out.push((uri.clone(), ms));
            }
        };

        for source in sources {
            if source.uri == main_uri {
                for &ms in source.cited {
                    emit(source.uri, ms, &mut out);
                }
                continue;
            }

            if !source.eligible {
                tracing::debug!(uri = %source.uri, "source not in corpus; skipped");
                continue;
            }

            let mut resolved: BTreeSet<MilestoneId> = BTreeSet::new();
            for &seed in source.cited {
                let mut state = RunState::Seeking;
                loop {
                    state = match state {
                        RunState::Seeking if resolved.contains(&seed) => RunState::Stopped,
                        RunState::Seeking => RunState::Extending { current: seed },
                        RunState::Extending { current } => {
                            match self.evidence_at(main_uri, source.uri, current, source.cited) {
                                Evidence::None => RunState::Stopped,
                                evidence => {
                                    match evidence {
                                        Evidence::AuthorBooks(books) => {
                                            for book in &books {
                                                emit(book, current, &mut out);
                                            }
                                        }
                                        _ => emit(source.uri, current, &mut out),
                                    }
                                    resolved.insert(current);
                                    match walk.advance(current) {
                                        Some(next) => RunState::Extending { current: next },
                                        None => RunState::Stopped,
                                    }
                                }
                            }
                        }
                        RunState::Stopped => break,
                    };
                }
            }
        }

        out
    }
}
