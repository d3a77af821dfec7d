//! Document store orchestrator.
//!
//! The [`DocumentStore`] coordinates ingestion (batch → assign ids → embed →
//! upsert), similarity search (embed → compile filter → rank), and deletion
//! (by id or by filter) by composing an [`EmbeddingProvider`] and a
//! [`StoreBackend`].
//!
//! Batches are processed strictly in order. If a batch fails, the batches
//! before it stay written; wrap the call in an external transaction if the
//! whole ingest must be atomic. Dropping a returned future cancels the
//! operation at its next await point with the same guarantee.
//!
//! # Example
//!
//! ```rust,ignore
//! use adk_docstore::{DocumentStore, InMemoryBackend, StoreConfig};
//!
//! let store = DocumentStore::builder()
//!     .config(StoreConfig::builder().chunk_size(100).build()?)
//!     .embedding_provider(Arc::new(my_embedder))
//!     .backend(Arc::new(InMemoryBackend::default()))
//!     .build()?;
//!
//! store.add_documents(&documents, AddOptions::default()).await?;
//! let hits = store.similarity_search("search query", 4, None).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::backend::StoreBackend;
use crate::batch::DocumentBatcher;
use crate::config::StoreConfig;
use crate::document::{Document, EmbeddedDocument, ScoredHit, SearchHit, StoreRow};
use crate::embedding::{EmbeddingProvider, check_embeddings};
use crate::error::{DocStoreError, Result};
use crate::filter::{FilterCompiler, FilterExpression, Predicate};
use crate::id::{IdGenerator, UuidIdGenerator, assign_ids};

/// Options for [`DocumentStore::add_documents`].
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Identifiers to use verbatim, one per document.
    pub ids: Option<Vec<String>>,
}

impl AddOptions {
    /// Use the given identifiers instead of generated ones.
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { ids: Some(ids.into_iter().map(Into::into).collect()) }
    }
}

/// Arguments for [`DocumentStore::delete`]. Exactly one field must be set.
#[derive(Debug, Clone, Default)]
pub struct DeleteParams {
    /// Delete rows with these identifiers.
    pub ids: Option<Vec<String>>,
    /// Delete rows whose metadata matches this filter.
    pub filter: Option<FilterExpression>,
}

impl DeleteParams {
    /// Delete by identifier.
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { ids: Some(ids.into_iter().map(Into::into).collect()), filter: None }
    }

    /// Delete by metadata filter.
    pub fn filter(filter: FilterExpression) -> Self {
        Self { ids: None, filter: Some(filter) }
    }
}

/// A vector store over a relational table of documents.
///
/// Construct one via [`DocumentStore::builder()`]. All operations take
/// `&self`; share the store with `Arc`.
pub struct DocumentStore {
    config: StoreConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn StoreBackend>,
    id_generator: Arc<dyn IdGenerator>,
    filter_compiler: FilterCompiler,
    batcher: DocumentBatcher,
}

impl DocumentStore {
    /// Create a new [`DocumentStoreBuilder`].
    pub fn builder() -> DocumentStoreBuilder {
        DocumentStoreBuilder::default()
    }

    /// Return a reference to the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Return a reference to the backend.
    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// Return a reference to the filter compiler.
    pub fn filter_compiler(&self) -> &FilterCompiler {
        &self.filter_compiler
    }

    /// Embed and store documents, one batch of `chunk_size` at a time.
    ///
    /// Returns the identifier of every document, in input order.
    ///
    /// # Errors
    ///
    /// - [`DocStoreError::ValidationError`] if `options.ids` has the wrong length.
    /// - [`DocStoreError::EmbeddingError`] if embedding fails or returns
    ///   vectors of the wrong count or dimensionality.
    /// - [`DocStoreError::StorageError`] if a batch cannot be written.
    pub async fn add_documents(
        &self,
        documents: &[Document],
        options: AddOptions,
    ) -> Result<Vec<String>> {
        let batches = self.batcher.batches(documents, options.ids.as_deref())?;
        let batch_count = batches.len();
        let mut assigned = Vec::with_capacity(documents.len());

        for batch in batches {
            let ids = assign_ids(&batch, self.id_generator.as_ref());
            let texts: Vec<&str> = batch.documents.iter().map(|d| d.content.as_str()).collect();
            let vectors = self.embed_batch(&texts, batch.offset).await?;

            let rows: Vec<EmbeddedDocument> = batch
                .documents
                .iter()
                .zip(ids.iter())
                .zip(vectors)
                .map(|((doc, id), vector)| EmbeddedDocument {
                    id: id.clone(),
                    content: doc.content.clone(),
                    metadata: doc.metadata.clone(),
                    vector,
                })
                .collect();

            self.write_batch(&rows, batch.offset).await?;
            assigned.extend(ids);
        }

        info!(document_count = documents.len(), batch_count, "added documents");
        Ok(assigned)
    }

    /// Store documents that already carry embeddings.
    ///
    /// # Errors
    ///
    /// - [`DocStoreError::ValidationError`] if a vector has the wrong
    ///   dimensionality; nothing is written in that case.
    /// - [`DocStoreError::StorageError`] if a batch cannot be written.
    pub async fn add_embedded(&self, documents: &[EmbeddedDocument]) -> Result<()> {
        if let Some(bad) = documents.iter().find(|d| d.vector.len() != self.config.dimensions) {
            return Err(DocStoreError::ValidationError(format!(
                "document '{}' has {} dimensions, expected {}",
                bad.id,
                bad.vector.len(),
                self.config.dimensions
            )));
        }

        let batches = self.batcher.batches(documents, None)?;
        let batch_count = batches.len();
        for batch in batches {
            self.write_batch(batch.documents, batch.offset).await?;
        }

        info!(document_count = documents.len(), batch_count, "added embedded documents");
        Ok(())
    }

    /// Return the `k` stored documents closest to `query`, optionally
    /// restricted by `filter`.
    ///
    /// Results are ordered by ascending distance; equal distances are ordered
    /// by ascending identifier.
    ///
    /// # Errors
    ///
    /// - [`DocStoreError::ValidationError`] if `k` is zero.
    /// - [`DocStoreError::FilterError`] if the filter cannot be compiled.
    /// - [`DocStoreError::EmbeddingError`] if the query cannot be embedded.
    /// - [`DocStoreError::StorageError`] if the ranking query fails.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&FilterExpression>,
    ) -> Result<Vec<SearchHit>> {
        let scored = self.similarity_search_with_score(query, k, filter).await?;
        Ok(scored.into_iter().map(|s| s.hit).collect())
    }

    /// Like [`similarity_search`](Self::similarity_search), also returning
    /// each hit's distance to the query.
    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        filter: Option<&FilterExpression>,
    ) -> Result<Vec<ScoredHit>> {
        let predicate = self.prepare_search(k, filter)?;
        let vector = self.embed_query(query).await?;
        self.rank(&vector, &predicate, k).await
    }

    /// Search with a caller-provided query vector.
    ///
    /// # Errors
    ///
    /// As [`similarity_search`](Self::similarity_search), plus
    /// [`DocStoreError::ValidationError`] if the vector has the wrong
    /// dimensionality.
    pub async fn similarity_search_by_vector(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&FilterExpression>,
    ) -> Result<Vec<ScoredHit>> {
        if vector.len() != self.config.dimensions {
            return Err(DocStoreError::ValidationError(format!(
                "query vector has {} dimensions, expected {}",
                vector.len(),
                self.config.dimensions
            )));
        }
        let predicate = self.prepare_search(k, filter)?;
        self.rank(vector, &predicate, k).await
    }

    /// Delete rows by identifier or by metadata filter.
    ///
    /// Exactly one of `params.ids` and `params.filter` must be set. Unknown
    /// identifiers are ignored. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// - [`DocStoreError::ValidationError`] if both or neither are set.
    /// - [`DocStoreError::FilterError`] if the filter cannot be compiled.
    /// - [`DocStoreError::StorageError`] if the backend fails.
    pub async fn delete(&self, params: DeleteParams) -> Result<u64> {
        let backend = self.backend.name().to_string();
        let removed = match (params.ids, params.filter) {
            (Some(_), Some(_)) => {
                return Err(DocStoreError::ValidationError(
                    "delete accepts either ids or a filter, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(DocStoreError::ValidationError(
                    "delete requires ids or a filter".to_string(),
                ));
            }
            (Some(ids), None) => {
                if ids.is_empty() {
                    return Ok(0);
                }
                self.bounded(self.backend.delete_ids(&ids), || {
                    DocStoreError::storage(&backend, "delete by id timed out")
                })
                .await
            }
            (None, Some(filter)) => {
                let predicate = self.filter_compiler.compile(Some(&filter))?;
                self.bounded(self.backend.delete_where(&predicate), || {
                    DocStoreError::storage(&backend, "delete by filter timed out")
                })
                .await
            }
        }
        .inspect_err(|e| error!(error = %e, "delete failed"))?;

        info!(removed, "deleted documents");
        Ok(removed)
    }

    /// Count stored rows matching `filter` (all rows if `None`).
    pub async fn count(&self, filter: Option<&FilterExpression>) -> Result<u64> {
        let predicate = self.filter_compiler.compile(filter)?;
        let backend = self.backend.name().to_string();
        self.bounded(self.backend.count(&predicate), || {
            DocStoreError::storage(&backend, "count timed out")
        })
        .await
    }

    /// Fetch stored rows by identifier, in ascending id order.
    pub async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<StoreRow>> {
        let backend = self.backend.name().to_string();
        self.bounded(self.backend.get(ids), || DocStoreError::storage(&backend, "get timed out"))
            .await
    }

    fn prepare_search(&self, k: usize, filter: Option<&FilterExpression>) -> Result<Predicate> {
        if k == 0 {
            return Err(DocStoreError::ValidationError("k must be greater than zero".to_string()));
        }
        self.filter_compiler.compile(filter)
    }

    async fn rank(&self, vector: &[f32], predicate: &Predicate, k: usize) -> Result<Vec<ScoredHit>> {
        let backend = self.backend.name().to_string();
        let rows = self
            .bounded(self.backend.query(vector, predicate, k), || {
                DocStoreError::storage(&backend, "ranking query timed out")
            })
            .await
            .inspect_err(|e| error!(error = %e, "similarity query failed"))?;

        info!(k, filtered = !predicate.is_all(), result_count = rows.len(), "search completed");
        Ok(rows.into_iter().map(ScoredHit::from).collect())
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let provider = self.embedding_provider.name().to_string();
        let vector = self
            .bounded(self.embedding_provider.embed(query), || {
                DocStoreError::embedding(&provider, "query embedding timed out")
            })
            .await
            .inspect_err(|e| error!(error = %e, "embedding failed during query"))?;

        check_embeddings(&provider, std::slice::from_ref(&vector), 1, self.config.dimensions)?;
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[&str], offset: usize) -> Result<Vec<Vec<f32>>> {
        let provider = self.embedding_provider.name().to_string();
        let vectors = self
            .bounded(self.embedding_provider.embed_batch(texts), || {
                DocStoreError::embedding(&provider, "batch embedding timed out")
            })
            .await
            .inspect_err(|e| {
                error!(batch.offset = offset, error = %e, "embedding failed during ingestion")
            })?;

        check_embeddings(&provider, &vectors, texts.len(), self.config.dimensions)?;
        Ok(vectors)
    }

    async fn write_batch(&self, rows: &[EmbeddedDocument], offset: usize) -> Result<()> {
        let backend = self.backend.name().to_string();
        self.bounded(self.backend.upsert(rows), || {
            DocStoreError::storage(&backend, "upsert timed out")
        })
        .await
        .inspect_err(|e| error!(batch.offset = offset, error = %e, "upsert failed during ingestion"))?;

        debug!(batch.offset = offset, batch.size = rows.len(), "wrote batch");
        Ok(())
    }

    /// Await `fut`, bounded by the configured operation timeout.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T>>,
        on_timeout: impl FnOnce() -> DocStoreError,
    ) -> Result<T> {
        match self.config.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| on_timeout())?,
            None => fut.await,
        }
    }
}

/// Builder for constructing a [`DocumentStore`].
///
/// `embedding_provider` and `backend` are required. The configuration
/// defaults to [`StoreConfig::default()`] and the id generator to
/// [`UuidIdGenerator`].
///
/// # Example
///
/// ```rust,ignore
/// let store = DocumentStore::builder()
///     .config(StoreConfig::builder().dimensions(384).build()?)
///     .embedding_provider(Arc::new(embedder))
///     .backend(Arc::new(backend))
///     .build()?;
/// ```
#[derive(Default)]
pub struct DocumentStoreBuilder {
    config: Option<StoreConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    backend: Option<Arc<dyn StoreBackend>>,
    id_generator: Option<Arc<dyn IdGenerator>>,
}

impl DocumentStoreBuilder {
    /// Set the store configuration.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the backing store.
    pub fn backend(mut self, backend: Arc<dyn StoreBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the generator used for documents without an id.
    pub fn id_generator(mut self, generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = Some(generator);
        self
    }

    /// Build the [`DocumentStore`].
    ///
    /// A configured `dimensions` of zero is replaced by the provider's.
    ///
    /// # Errors
    ///
    /// Returns [`DocStoreError::ConfigError`] if a required field is missing,
    /// the configuration is invalid, the configured dimensionality disagrees
    /// with the embedding provider, or the backend ranks by a different
    /// distance metric than configured.
    pub fn build(self) -> Result<DocumentStore> {
        let mut config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| DocStoreError::ConfigError("embedding_provider is required".to_string()))?;
        let backend = self
            .backend
            .ok_or_else(|| DocStoreError::ConfigError("backend is required".to_string()))?;

        let provider_dimensions = embedding_provider.dimensions();
        if config.dimensions == 0 {
            config.dimensions = provider_dimensions;
        } else if config.dimensions != provider_dimensions {
            return Err(DocStoreError::ConfigError(format!(
                "configured dimensions ({}) differ from the embedding provider's ({provider_dimensions})",
                config.dimensions
            )));
        }
        if config.dimensions == 0 {
            return Err(DocStoreError::ConfigError(
                "dimensions must be greater than zero".to_string(),
            ));
        }
        if backend.distance_metric() != config.distance_metric {
            return Err(DocStoreError::ConfigError(format!(
                "backend '{}' ranks by {:?} but the store is configured for {:?}",
                backend.name(),
                backend.distance_metric(),
                config.distance_metric
            )));
        }

        let filter_compiler = FilterCompiler::with_operators(&config.filter_operators);
        let batcher = DocumentBatcher::try_new(config.chunk_size)?;

        Ok(DocumentStore {
            config,
            embedding_provider,
            backend,
            id_generator: self.id_generator.unwrap_or_else(|| Arc::new(UuidIdGenerator)),
            filter_compiler,
            batcher,
        })
    }
}
