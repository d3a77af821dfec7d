//! # Document Store Basic Example
//!
//! Demonstrates the document store: add documents, search with and without
//! metadata filters, then delete by filter.
//!
//! Uses `InMemoryBackend` and a deterministic `MockEmbeddingProvider` so it
//! runs with **zero API keys** and no database.
//!
//! Run: `RUST_LOG=adk_docstore=debug cargo run --example docstore_basic`

use std::sync::Arc;

use adk_docstore::{
    AddOptions, DeleteParams, Document, DocumentStore, EmbeddingProvider, FilterExpression,
    FilterOperator, InMemoryBackend, StoreConfig,
};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// MockEmbeddingProvider — deterministic hash-based embeddings for demos
// ---------------------------------------------------------------------------

struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> adk_docstore::Result<Vec<f32>> {
        // Bucket each lowercase word by a hash so texts sharing words point
        // in similar directions.
        let mut emb = vec![0.0f32; self.dimensions];
        for word in text.split_whitespace() {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            emb[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // -- 1. Configure the store -------------------------------------------
    // chunk_size=2 forces several embedding batches even for this tiny demo.
    let config = StoreConfig::builder()
        .chunk_size(2)
        .filter_operator(FilterOperator::Gte)
        .build()?;

    let store = DocumentStore::builder()
        .config(config)
        .embedding_provider(Arc::new(MockEmbeddingProvider::new(64)))
        .backend(Arc::new(InMemoryBackend::default()))
        .build()?;

    // -- 2. Add documents -------------------------------------------------
    let documents = vec![
        Document::new("Rust achieves memory safety without a garbage collector")
            .with_meta("topic", "rust")
            .with_meta("year", 2015),
        Document::new("Python is widely used for data science")
            .with_meta("topic", "python")
            .with_meta("year", 1991),
        Document::new("pgvector adds vector similarity search to Postgres")
            .with_meta("topic", "databases")
            .with_meta("year", 2021),
        Document::new("Tokio is an asynchronous runtime for Rust")
            .with_meta("topic", "rust")
            .with_meta("year", 2016),
        Document::new("Retrieval combines vector search with language models")
            .with_meta("topic", "rag")
            .with_meta("year", 2020),
    ];
    let ids = store.add_documents(&documents, AddOptions::default()).await?;
    info!(count = ids.len(), "documents stored");

    // -- 3. Search --------------------------------------------------------
    let searches = [
        ("memory safety in Rust", None),
        ("Rust runtime", Some(FilterExpression::from_value(json!({"topic": "rust"}))?)),
        (
            "vector search",
            Some(FilterExpression::from_value(json!({"topic": {"in": ["rag", "databases"]}}))?),
        ),
        ("language", Some(FilterExpression::new().op("year", FilterOperator::Gte, json!(2016)))),
    ];

    for (query, filter) in &searches {
        println!("\nQuery: \"{query}\" filter={}", serde_json::to_string(filter)?);
        let results = store.similarity_search_with_score(query, 3, filter.as_ref()).await?;
        if results.is_empty() {
            println!("  (no results)");
        }
        for (i, result) in results.iter().enumerate() {
            println!(
                "  {}. [distance={:.4}] {} | {}",
                i + 1,
                result.distance,
                serde_json::Value::Object(result.hit.metadata.clone()),
                result.hit.content,
            );
        }
    }

    // -- 4. Delete --------------------------------------------------------
    let removed = store
        .delete(DeleteParams::filter(FilterExpression::new().equal("topic", "rust")))
        .await?;
    println!("\nDeleted {removed} rust document(s); {} remain.", store.count(None).await?);

    Ok(())
}
