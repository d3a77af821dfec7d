//! Splitting document lists into bounded-size batches.
//!
//! Ingestion embeds and writes one batch at a time, which bounds the size of
//! each embedding request and each backend write.

use crate::document::Document;
use crate::error::{DocStoreError, Result};

/// Partitions documents into ordered batches of at most `chunk_size` items.
///
/// Any slice can be batched; the store batches both [`Document`]s and
/// pre-embedded documents.
///
/// # Example
///
/// ```rust,ignore
/// use adk_docstore::DocumentBatcher;
///
/// let batcher = DocumentBatcher::try_new(500)?;
/// for batch in batcher.batches(&documents, None)? {
///     println!("{} documents starting at {}", batch.len(), batch.offset);
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DocumentBatcher {
    chunk_size: usize,
}

impl DocumentBatcher {
    /// Create a batcher with the given chunk size.
    ///
    /// # Errors
    ///
    /// Returns [`DocStoreError::ValidationError`] if `chunk_size` is zero.
    pub fn try_new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DocStoreError::ValidationError(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { chunk_size })
    }

    /// The maximum number of documents per batch.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Lazily split `documents` (and `ids`, in lockstep) into batches.
    ///
    /// Concatenating the yielded batches reproduces the input exactly.
    ///
    /// # Errors
    ///
    /// Returns [`DocStoreError::ValidationError`] if `ids` is given and its
    /// length differs from the number of documents.
    pub fn batches<'a, T>(
        &self,
        documents: &'a [T],
        ids: Option<&'a [String]>,
    ) -> Result<Batches<'a, T>> {
        if let Some(ids) = ids {
            if ids.len() != documents.len() {
                return Err(DocStoreError::ValidationError(format!(
                    "got {} ids for {} documents",
                    ids.len(),
                    documents.len()
                )));
            }
        }
        Ok(Batches { documents, ids, chunk_size: self.chunk_size, offset: 0 })
    }
}

/// One batch of documents with the matching slice of explicit ids.
#[derive(Debug)]
pub struct Batch<'a, T = Document> {
    /// Index of the batch's first document in the original input.
    pub offset: usize,
    /// The documents in this batch.
    pub documents: &'a [T],
    /// Explicit ids for this batch, same length as `documents`.
    pub ids: Option<&'a [String]>,
}

impl<T> Batch<'_, T> {
    /// Number of documents in the batch.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the batch is empty. Batches yielded by [`Batches`] never are.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Iterator returned by [`DocumentBatcher::batches`].
#[derive(Debug)]
pub struct Batches<'a, T = Document> {
    documents: &'a [T],
    ids: Option<&'a [String]>,
    chunk_size: usize,
    offset: usize,
}

impl<'a, T> Iterator for Batches<'a, T> {
    type Item = Batch<'a, T>;

    fn next(&mut self) -> Option<Batch<'a, T>> {
        if self.offset >= self.documents.len() {
            return None;
        }
        let start = self.offset;
        let end = (start + self.chunk_size).min(self.documents.len());
        self.offset = end;
        Some(Batch {
            offset: start,
            documents: &self.documents[start..end],
            ids: self.ids.map(|ids| &ids[start..end]),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.documents.len().saturating_sub(self.offset).div_ceil(self.chunk_size);
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Batches<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(n: usize) -> Vec<Document> {
        (0..n).map(|i| Document::new(format!("doc {i}"))).collect()
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(DocumentBatcher::try_new(0).is_err());
    }

    #[test]
    fn test_last_batch_smaller() {
        let documents = docs(7);
        let batcher = DocumentBatcher::try_new(3).unwrap();
        let sizes: Vec<usize> = batcher.batches(&documents, None).unwrap().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let batcher = DocumentBatcher::try_new(3).unwrap();
        let mut batches = batcher.batches::<Document>(&[], None).unwrap();
        assert_eq!(batches.len(), 0);
        assert!(batches.next().is_none());
    }

    #[test]
    fn test_ids_partitioned_in_lockstep() {
        let documents = docs(5);
        let ids: Vec<String> = (0..5).map(|i| format!("id-{i}")).collect();
        let batcher = DocumentBatcher::try_new(2).unwrap();
        for batch in batcher.batches(&documents, Some(ids.as_slice())).unwrap() {
            let batch_ids = batch.ids.unwrap();
            assert_eq!(batch_ids.len(), batch.len());
            assert_eq!(batch_ids[0], format!("id-{}", batch.offset));
            assert_eq!(batch.documents[0].content, format!("doc {}", batch.offset));
        }
    }

    #[test]
    fn test_id_length_mismatch_rejected() {
        let documents = docs(3);
        let ids = vec!["a".to_string()];
        let batcher = DocumentBatcher::try_new(2).unwrap();
        let err = batcher.batches(&documents, Some(ids.as_slice())).unwrap_err();
        assert!(matches!(err, DocStoreError::ValidationError(_)));
    }
}
