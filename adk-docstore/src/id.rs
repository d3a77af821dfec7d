//! Identifier assignment for documents entering the store.

use uuid::Uuid;

use crate::batch::Batch;

/// Produces identifiers for documents that arrive without one.
pub trait IdGenerator: Send + Sync {
    /// Return a fresh, unique identifier.
    fn generate(&self) -> String;
}

/// Generates random (v4) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Resolve the identifier of every document in a batch.
///
/// An explicit id supplied alongside the batch wins, then the document's own
/// `id`, and only then a generated one.
pub fn assign_ids(batch: &Batch<'_>, generator: &dyn IdGenerator) -> Vec<String> {
    batch
        .documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            batch
                .ids
                .map(|ids| ids[i].clone())
                .or_else(|| doc.id.clone())
                .unwrap_or_else(|| generator.generate())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::document::Document;

    struct Counter(AtomicUsize);

    impl IdGenerator for Counter {
        fn generate(&self) -> String {
            format!("gen-{}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[test]
    fn test_precedence() {
        let documents = vec![Document::new("a").with_id("own"), Document::new("b")];
        let generator = Counter(AtomicUsize::new(0));

        let batch = Batch { offset: 0, documents: documents.as_slice(), ids: None };
        assert_eq!(assign_ids(&batch, &generator), vec!["own", "gen-0"]);

        let explicit = vec!["x".to_string(), "y".to_string()];
        let batch = Batch { offset: 0, documents: documents.as_slice(), ids: Some(explicit.as_slice()) };
        assert_eq!(assign_ids(&batch, &generator), vec!["x", "y"]);
    }

    #[test]
    fn test_uuid_ids_are_unique() {
        let generator = UuidIdGenerator;
        let a = generator.generate();
        let b = generator.generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
