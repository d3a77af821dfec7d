//! Data types for documents, stored rows, and search hits.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured metadata attached to a document.
///
/// Keys are kept in sorted order; values are JSON scalars or nested
/// arrays/objects.
pub type Metadata = Map<String, Value>;

/// A document to be stored: text content plus metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier to store the document under. Generated at write time if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The text content of the document.
    pub content: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with the given content and no metadata.
    pub fn new(content: impl Into<String>) -> Self {
        Self { id: None, content: content.into(), metadata: Metadata::new() }
    }

    /// Set the document identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the document metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Insert a single metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A [`Document`] with an assigned identifier and its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedDocument {
    /// The assigned identifier.
    pub id: String,
    /// The text content.
    pub content: String,
    /// Key-value metadata.
    pub metadata: Metadata,
    /// The embedding vector. Its length must match the store's dimensionality.
    pub vector: Vec<f32>,
}

/// A persisted row as returned by a backend.
pub type StoreRow = EmbeddedDocument;

/// A row returned from a ranking query together with its distance.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    /// The stored row. Backends may leave `vector` empty.
    pub row: StoreRow,
    /// Distance to the query vector (lower is closer).
    pub distance: f32,
}

/// A search result as seen by callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// The stored text content.
    pub content: String,
    /// The stored metadata.
    pub metadata: Metadata,
}

/// A [`SearchHit`] paired with its distance to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredHit {
    /// The retrieved hit.
    pub hit: SearchHit,
    /// The distance to the query vector (lower is closer).
    pub distance: f32,
}

impl From<ScoredRow> for ScoredHit {
    fn from(scored: ScoredRow) -> Self {
        Self {
            hit: SearchHit { content: scored.row.content, metadata: scored.row.metadata },
            distance: scored.distance,
        }
    }
}
