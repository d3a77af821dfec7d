//! Property tests for in-memory ranking and document batching.

use std::collections::BTreeMap;

use adk_docstore::{
    DistanceMetric, Document, DocumentBatcher, EmbeddedDocument, FilterCompiler,
    FilterExpression, InMemoryBackend, Metadata, Predicate, StoreBackend,
};
use proptest::prelude::*;
use serde_json::json;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate a row with a normalized embedding and a small `group` tag.
fn arb_row(dim: usize) -> impl Strategy<Value = EmbeddedDocument> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim), 0u8..3).prop_map(
        |(id, content, vector, group)| {
            let mut metadata = Metadata::new();
            metadata.insert("group".to_string(), json!(group));
            EmbeddedDocument { id, content, metadata, vector }
        },
    )
}

fn dedup(rows: Vec<EmbeddedDocument>) -> Vec<EmbeddedDocument> {
    let mut by_id: BTreeMap<String, EmbeddedDocument> = BTreeMap::new();
    for row in rows {
        by_id.entry(row.id.clone()).or_insert(row);
    }
    by_id.into_values().collect()
}

/// *For any* set of rows stored in an InMemoryBackend, a ranking query SHALL
/// return rows ordered by ascending distance (ties by ascending id), every
/// returned row SHALL satisfy the predicate, and the number of results SHALL
/// be `min(limit, matching rows)`.
mod prop_inmemory_ranking {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_filtered_and_bounded(
            rows in proptest::collection::vec(arb_row(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            limit in 1usize..25,
            group in proptest::option::of(0u8..3),
        ) {
            let rows = dedup(rows);
            let predicate = match group {
                Some(g) => FilterCompiler::new()
                    .compile(Some(&FilterExpression::new().equal("group", g)))
                    .unwrap(),
                None => Predicate::All,
            };
            let matching = rows.iter().filter(|r| predicate.matches(&r.metadata)).count();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let backend = InMemoryBackend::new(DistanceMetric::Cosine);
                backend.upsert(&rows).await.unwrap();
                backend.query(&query, &predicate, limit).await.unwrap()
            });

            prop_assert_eq!(results.len(), limit.min(matching));
            for scored in &results {
                prop_assert!(predicate.matches(&scored.row.metadata));
            }
            for window in results.windows(2) {
                let (a, b) = (&window[0], &window[1]);
                prop_assert!(
                    a.distance < b.distance || (a.distance == b.distance && a.row.id < b.row.id),
                    "results not in order: ({}, {}) before ({}, {})",
                    a.distance, a.row.id, b.distance, b.row.id,
                );
            }
        }

        #[test]
        fn delete_where_removes_exactly_the_matches(
            rows in proptest::collection::vec(arb_row(DIM), 1..20),
            group in 0u8..3,
        ) {
            let rows = dedup(rows);
            let predicate = FilterCompiler::new()
                .compile(Some(&FilterExpression::new().equal("group", group)))
                .unwrap();
            let matching = rows.iter().filter(|r| predicate.matches(&r.metadata)).count() as u64;

            let rt = tokio::runtime::Runtime::new().unwrap();
            let (removed, left, left_matching) = rt.block_on(async {
                let backend = InMemoryBackend::default();
                backend.upsert(&rows).await.unwrap();
                let removed = backend.delete_where(&predicate).await.unwrap();
                let left = backend.count(&Predicate::All).await.unwrap();
                let left_matching = backend.count(&predicate).await.unwrap();
                (removed, left, left_matching)
            });

            prop_assert_eq!(removed, matching);
            prop_assert_eq!(left, rows.len() as u64 - matching);
            prop_assert_eq!(left_matching, 0);
        }
    }
}

/// *For any* document list and chunk size, concatenating the batches SHALL
/// reproduce the input, each batch SHALL hold at most `chunk_size` documents,
/// and explicit ids SHALL stay aligned with their documents.
mod prop_batch_partition {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn batches_partition_input(
            contents in proptest::collection::vec("[a-z]{0,6}", 0..60),
            chunk_size in 1usize..16,
        ) {
            let documents: Vec<Document> = contents.iter().map(Document::new).collect();
            let ids: Vec<String> = (0..documents.len()).map(|i| format!("id-{i}")).collect();
            let batcher = DocumentBatcher::try_new(chunk_size).unwrap();

            let batches: Vec<_> = batcher.batches(&documents, Some(ids.as_slice())).unwrap().collect();
            prop_assert_eq!(batches.len(), documents.len().div_ceil(chunk_size));

            let mut rebuilt = Vec::new();
            let mut rebuilt_ids = Vec::new();
            for batch in &batches {
                prop_assert!(!batch.is_empty());
                prop_assert!(batch.len() <= chunk_size);
                prop_assert_eq!(batch.offset, rebuilt.len());
                rebuilt.extend_from_slice(batch.documents);
                rebuilt_ids.extend_from_slice(batch.ids.unwrap());
            }
            prop_assert_eq!(rebuilt, documents);
            prop_assert_eq!(rebuilt_ids, ids);
        }
    }
}
