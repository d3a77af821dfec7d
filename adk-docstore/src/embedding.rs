//! Embedding provider trait for turning document and query text into vectors.

use async_trait::async_trait;

use crate::error::{DocStoreError, Result};

/// A provider that generates vector embeddings from text input.
///
/// The store calls [`embed_batch`](EmbeddingProvider::embed_batch) once per
/// ingest batch and [`embed`](EmbeddingProvider::embed) once per query.
/// Implementations report failures as
/// [`DocStoreError::EmbeddingError`](crate::DocStoreError::EmbeddingError).
///
/// # Example
///
/// ```rust,ignore
/// use adk_docstore::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input. Override this method if the backend
    /// supports native batch embedding.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "embedding"
    }
}

/// Check that a provider returned `expected` vectors of `dimensions` each.
///
/// # Errors
///
/// Returns [`DocStoreError::EmbeddingError`] attributed to `provider`.
pub(crate) fn check_embeddings(
    provider: &str,
    vectors: &[Vec<f32>],
    expected: usize,
    dimensions: usize,
) -> Result<()> {
    if vectors.len() != expected {
        return Err(DocStoreError::embedding(
            provider,
            format!("expected {expected} embeddings, got {}", vectors.len()),
        ));
    }
    match vectors.iter().position(|v| v.len() != dimensions) {
        Some(index) => Err(DocStoreError::embedding(
            provider,
            format!(
                "embedding {index} has {} dimensions, expected {dimensions}",
                vectors[index].len()
            ),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_embeddings() {
        let vectors = vec![vec![0.0; 3], vec![1.0; 3]];
        assert!(check_embeddings("p", &vectors, 2, 3).is_ok());
        assert!(check_embeddings("p", &[], 0, 3).is_ok());

        let err = check_embeddings("p", &vectors, 3, 3).unwrap_err();
        assert!(matches!(err, DocStoreError::EmbeddingError { ref provider, .. } if provider == "p"));

        let err = check_embeddings("p", &[vec![0.0; 3], vec![0.0; 2]], 2, 3).unwrap_err();
        assert!(err.to_string().contains("embedding 1 has 2 dimensions, expected 3"));
    }
}
