//! Property tests for segmentation, normalization, continuation and dedup.

use std::collections::BTreeSet;

use proptest::prelude::*;

use citation_kernel::segmenter::{milestone_ids, HEADER_END_MARKER};
use citation_kernel::table::AttributionTable;
use citation_kernel::{
    AttributionRecord, CitationMap, CitationMapEntry, ContinuationResolver, HeavyArabicNormalizer,
    InMemoryClusterStore, MilestoneId, ResolverPolicy, SourceUri, TextNormalizer,
};

const MAIN: &str = "main.Text";
const BOOKS: [&str; 4] = ["a.One", "a.Two", "b.One", "c.One"];
const MAX_MS: u32 = 40;

/// Strictly increasing milestone ids.
fn milestone_ids_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::btree_set(0u32..10_000, 0..30).prop_map(|set| set.into_iter().collect())
}

/// Arabic letters, diacritics, tatweel, hamza forms and spaces.
fn arabic_text_strategy() -> impl Strategy<Value = String> {
    let chars = prop::sample::select(vec![
        'ا', 'أ', 'إ', 'آ', 'ٱ', 'ب', 'ت', 'ة', 'ى', 'ي', 'ؤ', 'ئ', 'ء', 'ـ', '\u{064E}', '\u{0650}', '\u{0651}',
        '\u{0670}', 'ق', 'ل', ' ',
    ]);
    prop::collection::vec(chars, 0..60).prop_map(|cs| cs.into_iter().collect())
}

/// Cluster rows `(cluster, book index, milestone)` against the main text.
fn clusters_strategy() -> impl Strategy<Value = Vec<(u64, usize, u32)>> {
    prop::collection::vec((0u64..20, 0usize..BOOKS.len(), 0u32..MAX_MS), 0..40)
}

/// Citation map over `BOOKS` plus the author-only `a`.
fn seeds_strategy() -> impl Strategy<Value = Vec<(usize, Vec<u32>)>> {
    prop::collection::vec((0usize..=BOOKS.len(), prop::collection::vec(0u32..MAX_MS, 1..4)), 0..5)
}

fn build_store(rows: &[(u64, usize, u32)]) -> InMemoryClusterStore {
    let mut store = InMemoryClusterStore::new();
    for &(cluster, book, ms) in rows {
        // The main text sits in each cluster at the cluster's own position.
        store.add_cluster(cluster, [(MAIN, cluster as u32), (BOOKS[book], ms)]);
    }
    store
}

fn build_map(seeds: &[(usize, Vec<u32>)]) -> CitationMap {
    let mut map = CitationMap::new();
    for (source, cited) in seeds {
        let uri = BOOKS.get(*source).copied().unwrap_or("a");
        map.insert(
            SourceUri::from(uri),
            CitationMapEntry::from_milestones(cited.iter().copied().map(MilestoneId::new), Some(true)),
        );
    }
    map
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn segmentation_yields_inserted_ids(ids in milestone_ids_strategy(), filler in "[a-z ]{0,8}") {
        let mut text = format!("#META# header\n{HEADER_END_MARKER}\n");
        for id in &ids {
            text.push_str(&filler);
            text.push_str(&format!(" ms{id} "));
        }
        text.push_str("trailing text");

        let got: Vec<u32> = milestone_ids(&text).into_iter().map(|m| m.value()).collect();
        prop_assert_eq!(got, ids);
    }

    #[test]
    fn normalization_is_idempotent(text in arabic_text_strategy()) {
        let normalizer = HeavyArabicNormalizer::new();
        let once = normalizer.normalize(&text);
        let twice = normalizer.normalize(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn resolution_is_idempotent(rows in clusters_strategy(), seeds in seeds_strategy()) {
        let store = build_store(&rows);
        let map = build_map(&seeds);
        let resolver = ContinuationResolver::new(&store, ResolverPolicy::default());

        let first: BTreeSet<AttributionRecord> =
            resolver.resolve_citation_map(&SourceUri::from(MAIN), &map).into_iter().collect();
        let second: BTreeSet<AttributionRecord> =
            resolver.resolve_citation_map(&SourceUri::from(MAIN), &map).into_iter().collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn resolution_covers_seeds_without_duplicates(rows in clusters_strategy(), seeds in seeds_strategy()) {
        let store = build_store(&rows);
        let map = build_map(&seeds);
        let records = ContinuationResolver::new(&store, ResolverPolicy::default())
            .resolve_citation_map(&SourceUri::from(MAIN), &map);

        let pairs: Vec<(SourceUri, MilestoneId)> = records.iter().map(|r| (r.uri.clone(), r.ms)).collect();
        let unique: BTreeSet<_> = pairs.iter().cloned().collect();
        prop_assert_eq!(unique.len(), pairs.len());
        prop_assert!(records.iter().all(AttributionRecord::is_self));

        // Every cited book-level seed is attributed at its own milestone.
        for (uri, entry) in map.iter() {
            if uri.is_author_only() {
                continue;
            }
            for ms in &entry.cit_ms {
                prop_assert!(unique.contains(&(uri.clone(), *ms)));
            }
        }
    }

    #[test]
    fn dedup_collapses_exact_duplicates(picks in prop::collection::vec((0usize..BOOKS.len(), 0u32..5, any::<bool>()), 0..30)) {
        let records: Vec<AttributionRecord> = picks
            .iter()
            .map(|&(book, ms, aligned)| {
                let uri = SourceUri::from(BOOKS[book]);
                if aligned {
                    AttributionRecord::aligned(uri, MilestoneId::new(ms), SourceUri::from("t.One"), MilestoneId::new(ms), false)
                } else {
                    AttributionRecord::verified(uri, MilestoneId::new(ms))
                }
            })
            .collect();

        let table = AttributionTable::from_records(records.clone());
        let distinct: BTreeSet<&AttributionRecord> = records.iter().collect();
        prop_assert_eq!(table.len(), distinct.len());

        let again = AttributionTable::from_records(table.records().iter().cloned().chain(records));
        prop_assert_eq!(again.records(), table.records());
    }
}
