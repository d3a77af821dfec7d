//! Backing store trait: the row-level operations the document store issues.

use async_trait::async_trait;

use crate::config::DistanceMetric;
use crate::document::{EmbeddedDocument, ScoredRow, StoreRow};
use crate::error::Result;
use crate::filter::Predicate;

/// A table of `(id, vector, content, metadata)` rows with vector ranking.
///
/// Backends report failures as
/// [`DocStoreError::StorageError`](crate::DocStoreError::StorageError).
/// They may be shared by unrelated callers and must not assume exclusive
/// access.
///
/// # Example
///
/// ```rust,ignore
/// use adk_docstore::{InMemoryBackend, Predicate, StoreBackend};
///
/// let backend = InMemoryBackend::new(DistanceMetric::Cosine);
/// backend.upsert(&rows).await?;
/// let nearest = backend.query(&query_vector, &Predicate::All, 5).await?;
/// ```
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Insert rows, overwriting rows that share an id. The slice is written as
    /// one unit where the backend supports it.
    async fn upsert(&self, rows: &[EmbeddedDocument]) -> Result<()>;

    /// Return up to `limit` rows satisfying `predicate`, ordered by ascending
    /// distance to `vector`, ties broken by ascending id.
    async fn query(
        &self,
        vector: &[f32],
        predicate: &Predicate,
        limit: usize,
    ) -> Result<Vec<ScoredRow>>;

    /// Delete rows whose id is in `ids`. Returns the number of rows removed.
    async fn delete_ids(&self, ids: &[String]) -> Result<u64>;

    /// Delete rows satisfying `predicate`. Returns the number of rows removed.
    async fn delete_where(&self, predicate: &Predicate) -> Result<u64>;

    /// Count rows satisfying `predicate`.
    async fn count(&self, predicate: &Predicate) -> Result<u64>;

    /// Fetch rows by id, in ascending id order. Missing ids are skipped.
    async fn get(&self, ids: &[String]) -> Result<Vec<StoreRow>>;

    /// The metric `query` ranks by. A store refuses a backend whose metric
    /// differs from its configured one.
    fn distance_metric(&self) -> DistanceMetric;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str;
}
