//! Configuration for the document store.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocStoreError, Result};
use crate::filter::FilterOperator;

/// Default number of documents embedded and written per batch.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// The distance function used to rank rows against a query vector.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity` (pgvector `<=>`).
    #[default]
    Cosine,
    /// L2 distance (pgvector `<->`).
    Euclidean,
    /// Negated inner product (pgvector `<#>`).
    InnerProduct,
}

impl DistanceMetric {
    /// The pgvector operator implementing this metric.
    pub fn pgvector_operator(&self) -> &'static str {
        match self {
            Self::Cosine => "<=>",
            Self::Euclidean => "<->",
            Self::InnerProduct => "<#>",
        }
    }

    /// Compute the distance between two vectors of equal length.
    ///
    /// Cosine distance against a zero-magnitude vector is `1.0`.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        match self {
            Self::Cosine => {
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 1.0;
                }
                1.0 - dot / (norm_a * norm_b)
            }
            Self::Euclidean => {
                a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
            }
            Self::InnerProduct => -dot,
        }
    }
}

/// Configuration parameters for a [`DocumentStore`](crate::DocumentStore).
///
/// Table and column names are only used by SQL backends. A `dimensions` of
/// zero means "use the embedding provider's dimensionality".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Name of the table holding the rows.
    pub table_name: String,
    /// Identifier column.
    pub id_column: String,
    /// Embedding vector column.
    pub vector_column: String,
    /// Text content column.
    pub content_column: String,
    /// JSON metadata column.
    pub metadata_column: String,
    /// Embedding dimensionality every row must have.
    pub dimensions: usize,
    /// Number of documents embedded and written per batch.
    pub chunk_size: usize,
    /// Distance function used for ranking.
    pub distance_metric: DistanceMetric,
    /// Filter operators enabled in addition to `in`.
    pub filter_operators: Vec<FilterOperator>,
    /// Upper bound on each embedding or backend call.
    pub operation_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_name: "documents".to_string(),
            id_column: "id".to_string(),
            vector_column: "embedding".to_string(),
            content_column: "content".to_string(),
            metadata_column: "metadata".to_string(),
            dimensions: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            distance_metric: DistanceMetric::default(),
            filter_operators: Vec::new(),
            operation_timeout: None,
        }
    }
}

impl StoreConfig {
    /// Create a new builder for constructing a [`StoreConfig`].
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`DocStoreError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - a table or column name is not a plain SQL identifier
    /// - `operation_timeout` is zero
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DocStoreError::ConfigError(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        for (field, name) in [
            ("table_name", &self.table_name),
            ("id_column", &self.id_column),
            ("vector_column", &self.vector_column),
            ("content_column", &self.content_column),
            ("metadata_column", &self.metadata_column),
        ] {
            if !is_identifier(name) {
                return Err(DocStoreError::ConfigError(format!(
                    "{field} '{name}' is not a valid identifier"
                )));
            }
        }
        if self.operation_timeout.is_some_and(|t| t.is_zero()) {
            return Err(DocStoreError::ConfigError(
                "operation_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Builder for constructing a validated [`StoreConfig`].
#[derive(Debug, Clone, Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the table name.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.config.table_name = name.into();
        self
    }

    /// Set the identifier column name.
    pub fn id_column(mut self, name: impl Into<String>) -> Self {
        self.config.id_column = name.into();
        self
    }

    /// Set the vector column name.
    pub fn vector_column(mut self, name: impl Into<String>) -> Self {
        self.config.vector_column = name.into();
        self
    }

    /// Set the content column name.
    pub fn content_column(mut self, name: impl Into<String>) -> Self {
        self.config.content_column = name.into();
        self
    }

    /// Set the metadata column name.
    pub fn metadata_column(mut self, name: impl Into<String>) -> Self {
        self.config.metadata_column = name.into();
        self
    }

    /// Set the embedding dimensionality.
    pub fn dimensions(mut self, dimensions: usize) -> Self {
        self.config.dimensions = dimensions;
        self
    }

    /// Set the number of documents per ingest batch.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the distance metric.
    pub fn distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.config.distance_metric = metric;
        self
    }

    /// Enable an extension filter operator.
    pub fn filter_operator(mut self, operator: FilterOperator) -> Self {
        if !self.config.filter_operators.contains(&operator) {
            self.config.filter_operators.push(operator);
        }
        self
    }

    /// Enable every extension filter operator.
    pub fn all_filter_operators(mut self) -> Self {
        self.config.filter_operators = FilterOperator::EXTENSIONS.to_vec();
        self
    }

    /// Bound each embedding and backend call by `timeout`.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = Some(timeout);
        self
    }

    /// Build the [`StoreConfig`], validating it.
    ///
    /// # Errors
    ///
    /// See [`StoreConfig::validate`].
    pub fn build(self) -> Result<StoreConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StoreConfig::builder().build().unwrap();
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.table_name, "documents");
        assert_eq!(config.distance_metric, DistanceMetric::Cosine);
        assert!(config.filter_operators.is_empty());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = StoreConfig::builder().chunk_size(0).build().unwrap_err();
        assert!(matches!(err, DocStoreError::ConfigError(_)));
    }

    #[test]
    fn test_bad_identifiers_rejected() {
        for name in ["", "1table", "docs; DROP TABLE x", "my-table"] {
            let result = StoreConfig::builder().table_name(name).build();
            assert!(result.is_err(), "accepted table name {name:?}");
        }
        assert!(StoreConfig::builder().metadata_column("_meta2").build().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = StoreConfig::builder().operation_timeout(Duration::ZERO).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_operators_deduplicated() {
        let config = StoreConfig::builder()
            .filter_operator(FilterOperator::NotIn)
            .filter_operator(FilterOperator::NotIn)
            .build()
            .unwrap();
        assert_eq!(config.filter_operators, vec![FilterOperator::NotIn]);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: StoreConfig = serde_json::from_str(
            r#"{"table_name": "notes", "chunk_size": 64, "distance_metric": "euclidean",
                "filter_operators": ["notIn", "gte"]}"#,
        )
        .unwrap();
        assert_eq!(config.table_name, "notes");
        assert_eq!(config.chunk_size, 64);
        assert_eq!(config.distance_metric, DistanceMetric::Euclidean);
        assert_eq!(config.filter_operators, vec![FilterOperator::NotIn, FilterOperator::Gte]);
        assert_eq!(config.id_column, "id");
    }

    #[test]
    fn test_distances() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        assert!(DistanceMetric::Cosine.distance(&a, &a).abs() < 1e-6);
        assert!((DistanceMetric::Cosine.distance(&a, &b) - 1.0).abs() < 1e-6);
        assert_eq!(DistanceMetric::Cosine.distance(&a, &[0.0, 0.0]), 1.0);
        assert!((DistanceMetric::Euclidean.distance(&a, &b) - 2f32.sqrt()).abs() < 1e-6);
        assert_eq!(DistanceMetric::InnerProduct.distance(&[2.0, 1.0], &[1.0, 3.0]), -5.0);
    }
}
