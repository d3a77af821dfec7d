//! Shared test doubles for document store integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use adk_docstore::{
    DocStoreError, Document, DocumentStore, EmbeddingProvider, IdGenerator, InMemoryBackend,
    Result, StoreConfig,
};
use async_trait::async_trait;

pub const DIM: usize = 32;

/// Deterministic embedder hashing character bigrams into buckets.
///
/// Identical texts get identical vectors; different texts almost always get
/// different directions.
#[derive(Default)]
pub struct HashEmbedder {
    pub batch_sizes: Mutex<Vec<usize>>,
    pub fail_on_batch: Option<usize>,
    pub wrong_dimensions: bool,
    pub delay: Option<Duration>,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on_batch(batch: usize) -> Self {
        Self { fail_on_batch: Some(batch), ..Self::default() }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; DIM];
        let chars: Vec<char> = format!(" {text} ").chars().collect();
        for pair in chars.windows(2) {
            let mut hash: u64 = 0xcbf29ce484222325;
            for c in pair {
                hash ^= *c as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % DIM as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.wrong_dimensions {
            return Ok(vec![1.0; DIM + 1]);
        }
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let call = {
            let mut sizes = self.batch_sizes.lock().unwrap();
            sizes.push(texts.len());
            sizes.len() - 1
        };
        if self.fail_on_batch == Some(call) {
            return Err(DocStoreError::EmbeddingError {
                provider: "hash".to_string(),
                message: "quota exceeded".to_string(),
            });
        }
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Generates `id-0`, `id-1`, ...
#[derive(Default)]
pub struct SequentialIds(AtomicUsize);

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        format!("id-{}", self.0.fetch_add(1, Ordering::SeqCst))
    }
}

pub fn store_with(embedder: Arc<HashEmbedder>, config: StoreConfig) -> DocumentStore {
    let backend = InMemoryBackend::from_config(&config);
    DocumentStore::builder()
        .config(config)
        .embedding_provider(embedder)
        .backend(Arc::new(backend))
        .build()
        .unwrap()
}

pub fn store() -> DocumentStore {
    store_with(Arc::new(HashEmbedder::new()), StoreConfig::default())
}

pub fn doc(content: &str, metadata: serde_json::Value) -> Document {
    Document::new(content).with_metadata(metadata.as_object().cloned().unwrap_or_default())
}
