//! Accounting over a finished attribution table.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::store::{ClusterStore, MetadataTable};
use crate::types::{AttributionRecord, MilestoneId, SourceUri};

/// Bucket name for unmatched milestones that no other text reuses.
pub const NO_REUSE_BUCKET: &str = "None";

/// Milestones of the main text without any attribution, in text order.
///
/// Logs the "`X` of `Y` total milestones unmatched" summary line.
pub fn unresolved_milestones(milestones: &[MilestoneId], matched: &BTreeSet<MilestoneId>) -> Vec<MilestoneId> {
    let unmatched: Vec<MilestoneId> = milestones
        .iter()
        .copied()
        .filter(|ms| !matched.contains(ms))
        .collect();

    tracing::info!(
        unmatched = unmatched.len(),
        total = milestones.len(),
        "{} of {} total milestones unmatched",
        unmatched.len(),
        milestones.len()
    );

    unmatched
}

/// Distinct milestones attributed to one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    /// Source URI.
    pub source_uri: SourceUri,
    /// Number of distinct milestones.
    pub ms_count: usize,
}

/// Per-source count of distinct attributed milestones, in URI order.
pub fn source_counts(records: &[AttributionRecord]) -> Vec<SourceCount> {
    let mut by_source: BTreeMap<&SourceUri, BTreeSet<MilestoneId>> = BTreeMap::new();
    for r in records {
        by_source.entry(&r.uri).or_default().insert(r.ms);
    }
    by_source
        .into_iter()
        .map(|(uri, ms)| SourceCount {
            source_uri: uri.clone(),
            ms_count: ms.len(),
        })
        .collect()
}

/// How many unmatched milestones a book shares with the main text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReuserCount {
    /// Reusing book, or [`NO_REUSE_BUCKET`].
    pub reuser: String,
    /// Number of unmatched milestones.
    pub ms_count: usize,
}

/// For milestones with no attribution, count per clustered book how many
/// of them it reuses. Milestones no book reuses are counted under
/// [`NO_REUSE_BUCKET`]. Sorted by ascending count, then name.
pub fn uncited_reusers(
    milestones: &[MilestoneId],
    matched: &BTreeSet<MilestoneId>,
    store: &dyn ClusterStore,
    main_uri: &SourceUri,
) -> Vec<ReuserCount> {
    let mut by_reuser: BTreeMap<SourceUri, BTreeSet<MilestoneId>> = BTreeMap::new();
    let mut no_reuse = 0usize;

    for &ms in milestones.iter().filter(|ms| !matched.contains(ms)) {
        let books: Vec<SourceUri> = store
            .clusters_for(main_uri, Some(ms))
            .into_iter()
            .map(|m| m.book)
            .filter(|b| b != main_uri)
            .collect();
        if books.is_empty() {
            no_reuse += 1;
        }
        for book in books {
            by_reuser.entry(book).or_default().insert(ms);
        }
    }

    let mut out: Vec<ReuserCount> = by_reuser
        .into_iter()
        .map(|(book, ms)| ReuserCount {
            reuser: book.to_string(),
            ms_count: ms.len(),
        })
        .collect();
    out.push(ReuserCount {
        reuser: NO_REUSE_BUCKET.to_string(),
        ms_count: no_reuse,
    });
    out.sort_by(|a, b| a.ms_count.cmp(&b.ms_count).then_with(|| a.reuser.cmp(&b.reuser)));
    out
}

/// Attributed sources with no surviving text in the corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LostSources {
    /// Author URIs with no primary book by that author.
    pub authors: Vec<SourceUri>,
    /// Book URIs absent from the metadata.
    pub books: Vec<SourceUri>,
}

/// Classify attributed URIs that the corpus metadata does not know.
pub fn lost_sources(records: &[AttributionRecord], metadata: &MetadataTable) -> LostSources {
    let uris: BTreeSet<&SourceUri> = records.iter().map(|r| &r.uri).collect();
    let mut lost = LostSources::default();
    for uri in uris {
        if uri.is_author_only() {
            if !metadata.has_author(uri.as_str()) {
                lost.authors.push(uri.clone());
            }
        } else if !metadata.is_primary(uri.as_str()) {
            lost.books.push(uri.clone());
        }
    }

    tracing::info!(
        lost_authors = lost.authors.len(),
        lost_books = lost.books.len(),
        "lost sources counted"
    );
    lost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryClusterStore, MetadataRecord};

    const MAIN: &str = "main.Text";

    fn ms(v: u32) -> MilestoneId {
        MilestoneId::new(v)
    }

    fn uri(s: &str) -> SourceUri {
        SourceUri::from(s)
    }

    #[test]
    fn test_unresolved_keeps_text_order() {
        let all = vec![ms(1), ms(2), ms(3), ms(5)];
        let matched: BTreeSet<_> = [ms(2), ms(9)].into_iter().collect();
        assert_eq!(unresolved_milestones(&all, &matched), vec![ms(1), ms(3), ms(5)]);
    }

    #[test]
    fn test_source_counts_distinct_milestones() {
        let records = vec![
            AttributionRecord::verified(uri("a.B"), ms(1)),
            AttributionRecord::aligned(uri("a.B"), ms(1), uri("t.One"), ms(4), false),
            AttributionRecord::verified(uri("a.B"), ms(2)),
            AttributionRecord::verified(uri("c"), ms(2)),
        ];
        assert_eq!(
            source_counts(&records),
            vec![
                SourceCount { source_uri: uri("a.B"), ms_count: 2 },
                SourceCount { source_uri: uri("c"), ms_count: 1 },
            ]
        );
    }

    #[test]
    fn test_uncited_reusers() {
        let mut store = InMemoryClusterStore::new();
        store.add_cluster(1, [(MAIN, 1), ("t.One", 5)]);
        store.add_cluster(2, [(MAIN, 2), ("t.One", 6), ("t.Two", 3)]);
        store.add_cluster(3, [(MAIN, 4), ("t.Two", 9)]);

        let all = vec![ms(1), ms(2), ms(3), ms(4)];
        let matched: BTreeSet<_> = [ms(4)].into_iter().collect();
        let counts = uncited_reusers(&all, &matched, &store, &uri(MAIN));

        assert_eq!(
            counts,
            vec![
                ReuserCount { reuser: "None".to_string(), ms_count: 1 },
                ReuserCount { reuser: "t.Two".to_string(), ms_count: 1 },
                ReuserCount { reuser: "t.One".to_string(), ms_count: 2 },
            ]
        );
    }

    #[test]
    fn test_lost_sources() {
        let metadata = MetadataTable::from_records(vec![MetadataRecord {
            book: uri("0279Baladhuri.Futuh"),
            status: "pri".to_string(),
            local_path: String::new(),
        }]);
        let records = vec![
            AttributionRecord::verified(uri("0279Baladhuri"), ms(1)),
            AttributionRecord::verified(uri("0279Baladhuri.Futuh"), ms(1)),
            AttributionRecord::verified(uri("0207Waqidi"), ms(2)),
            AttributionRecord::verified(uri("0207Waqidi.Maghazi"), ms(2)),
        ];

        let lost = lost_sources(&records, &metadata);
        assert_eq!(lost.authors, vec![uri("0207Waqidi")]);
        assert_eq!(lost.books, vec![uri("0207Waqidi.Maghazi")]);
    }
}
