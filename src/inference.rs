//! Cross-text inference.
//!
//! A citation found in a corpus text at the position aligned with a main
//! text milestone (or just after it) is weak evidence that the main text's
//! milestone draws on the same source. Inferred records carry the aligned
//! location as their origin; `self` is never produced here.

use std::collections::{BTreeMap, BTreeSet};

use crate::store::ClusterStore;
use crate::types::{AttributionRecord, ClusterMember, CorpusCitation, MilestoneId, SourceUri};

/// Lookup of cited sources by `(text, milestone)`.
#[derive(Debug, Default)]
pub struct CitationIndex<'a> {
    by_text: BTreeMap<&'a SourceUri, BTreeMap<MilestoneId, BTreeSet<&'a SourceUri>>>,
}

impl<'a> CitationIndex<'a> {
    /// Index corpus citations by location.
    pub fn new(citations: &'a [CorpusCitation]) -> Self {
        let mut by_text: BTreeMap<&'a SourceUri, BTreeMap<MilestoneId, BTreeSet<&'a SourceUri>>> = BTreeMap::new();
        for c in citations {
            by_text
                .entry(&c.text_uri)
                .or_default()
                .entry(c.ms)
                .or_default()
                .insert(&c.uri);
        }
        Self { by_text }
    }

    /// Sources cited at milestone `ms` of `text`.
    pub fn sources_at(&self, text: &SourceUri, ms: MilestoneId) -> Vec<&'a SourceUri> {
        self.by_text
            .get(text)
            .and_then(|m| m.get(&ms))
            .map(|uris| uris.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of distinct cited locations.
    pub fn len(&self) -> usize {
        self.by_text.values().map(BTreeMap::len).sum()
    }

    /// True if no citations were indexed.
    pub fn is_empty(&self) -> bool {
        self.by_text.is_empty()
    }
}

/// Infer attributions for the main text from citations in aligned texts.
///
/// For every clustered milestone of `main_uri`, each aligned member
/// `(book, seq)` is checked at `seq` (`origin_prev_ms = false`) and at the
/// following position (`origin_prev_ms = true`). Records naming the main
/// text itself are dropped.
pub fn infer_from_aligned(
    store: &dyn ClusterStore,
    main_uri: &SourceUri,
    citations: &[CorpusCitation],
) -> Vec<AttributionRecord> {
    let index = CitationIndex::new(citations);
    let mut out = Vec::new();
    let mut dropped_self = 0usize;

    let milestones = store.milestones_of(main_uri);
    for &ms in &milestones {
        let aligned: Vec<ClusterMember> = store
            .clusters_for(main_uri, Some(ms))
            .into_iter()
            .filter(|m| &m.book != main_uri)
            .collect();

        let same = aligned.iter().map(|m| (m, m.seq, false));
        let following = aligned
            .iter()
            .filter_map(|m| m.seq.next().map(|next| (m, next, true)));

        for (member, position, prev) in same.chain(following) {
            for uri in index.sources_at(&member.book, position) {
                if uri == main_uri {
                    dropped_self += 1;
                    continue;
                }
                out.push(AttributionRecord::aligned(uri.clone(), ms, member.book.clone(), position, prev));
            }
        }
    }

    tracing::info!(
        main_uri = %main_uri,
        milestones = milestones.len(),
        indexed_locations = index.len(),
        inferred = out.len(),
        dropped_self,
        "cross-text inference complete"
    );

    out
}
