//! # adk-docstore
//!
//! A document vector store for ADK-Rust agents, layered over a relational
//! table of `(id, vector, content, metadata)` rows.
//!
//! ## Overview
//!
//! - [`DocumentStore`] ingests documents in bounded batches, answers
//!   nearest-neighbor queries restricted by metadata filters, and deletes by
//!   id or filter.
//! - [`EmbeddingProvider`] turns text into vectors.
//! - [`StoreBackend`] executes row-level operations; [`InMemoryBackend`] is
//!   built in and `PgVectorBackend` is available with the `pgvector` feature.
//! - [`FilterCompiler`] turns [`FilterExpression`]s into [`Predicate`]s.
//!
//! ## Features
//!
//! - `pgvector` — PostgreSQL + pgvector backend via sqlx
//! - `full` — all backends

pub mod backend;
pub mod batch;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod id;
pub mod inmemory;
pub mod store;

#[cfg(feature = "pgvector")]
pub mod pgvector;

pub use backend::StoreBackend;
pub use batch::{Batch, Batches, DocumentBatcher};
pub use config::{DEFAULT_CHUNK_SIZE, DistanceMetric, StoreConfig, StoreConfigBuilder};
pub use document::{
    Document, EmbeddedDocument, Metadata, ScoredHit, ScoredRow, SearchHit, StoreRow,
};
pub use embedding::EmbeddingProvider;
pub use error::{DocStoreError, ErrorKind, FilterError, Result};
pub use filter::{
    Comparison, FilterCompiler, FilterExpression, FilterOperator, Predicate, Scalar, SqlBind,
    SqlFilter,
};
pub use id::{IdGenerator, UuidIdGenerator, assign_ids};
pub use inmemory::InMemoryBackend;
pub use store::{AddOptions, DeleteParams, DocumentStore, DocumentStoreBuilder};

#[cfg(feature = "pgvector")]
pub use pgvector::PgVectorBackend;
