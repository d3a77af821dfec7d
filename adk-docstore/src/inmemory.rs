//! In-memory backend.
//!
//! This module provides [`InMemoryBackend`], a dependency-free backend holding
//! rows in a `BTreeMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and small-scale use cases.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::StoreBackend;
use crate::config::{DistanceMetric, StoreConfig};
use crate::document::{EmbeddedDocument, ScoredRow, StoreRow};
use crate::error::Result;
use crate::filter::Predicate;

/// An in-memory [`StoreBackend`] ranking rows by exhaustive distance scan.
///
/// Rows are keyed by id, so iteration is in ascending id order and the stable
/// sort used for ranking breaks distance ties by id.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    metric: DistanceMetric,
    rows: RwLock<BTreeMap<String, StoreRow>>,
}

impl InMemoryBackend {
    /// Create an empty backend using the given distance metric.
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric, rows: RwLock::default() }
    }

    /// Create an empty backend ranking by `config.distance_metric`.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.distance_metric)
    }
}

#[async_trait]
impl StoreBackend for InMemoryBackend {
    async fn upsert(&self, rows: &[EmbeddedDocument]) -> Result<()> {
        let mut store = self.rows.write().await;
        for row in rows {
            store.insert(row.id.clone(), row.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        predicate: &Predicate,
        limit: usize,
    ) -> Result<Vec<ScoredRow>> {
        let store = self.rows.read().await;

        let mut scored: Vec<ScoredRow> = store
            .values()
            .filter(|row| predicate.matches(&row.metadata))
            .map(|row| ScoredRow { distance: self.metric.distance(&row.vector, vector), row: row.clone() })
            .collect();

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete_ids(&self, ids: &[String]) -> Result<u64> {
        let mut store = self.rows.write().await;
        let mut removed = 0;
        for id in ids {
            if store.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn delete_where(&self, predicate: &Predicate) -> Result<u64> {
        let mut store = self.rows.write().await;
        let before = store.len();
        store.retain(|_, row| !predicate.matches(&row.metadata));
        Ok((before - store.len()) as u64)
    }

    async fn count(&self, predicate: &Predicate) -> Result<u64> {
        let store = self.rows.read().await;
        Ok(store.values().filter(|row| predicate.matches(&row.metadata)).count() as u64)
    }

    async fn get(&self, ids: &[String]) -> Result<Vec<StoreRow>> {
        let store = self.rows.read().await;
        let mut rows: Vec<StoreRow> = ids.iter().filter_map(|id| store.get(id).cloned()).collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows.dedup_by(|a, b| a.id == b.id);
        Ok(rows)
    }

    fn distance_metric(&self) -> DistanceMetric {
        self.metric
    }

    fn name(&self) -> &str {
        "InMemory"
    }
}
