// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Memory DB
//!
//! A single-process vector store for tests and local development. Scoring
//! is always cosine similarity; tag filtering is a direct evaluation of
//! [`TagFilter::matches`] against every record in the collection, which is
//! fine at in-memory scale and would be the first thing replaced by an
//! indexed lookup in a networked adapter.

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use kernel_memory_domain::entities::embedding_record::EmbeddingRecord;
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::repositories::memory_db::cosine_similarity;
use kernel_memory_domain::repositories::MemoryDb;
use kernel_memory_domain::value_objects::{IndexName, TagFilter};
use std::collections::HashMap;
use std::sync::Mutex;

struct Collection {
    vector_size: usize,
    records: HashMap<String, EmbeddingRecord>,
}

#[derive(Default)]
pub struct InMemoryMemoryDb {
    collections: Mutex<HashMap<String, Collection>>,
}

impl InMemoryMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn strip_embeddings(mut record: EmbeddingRecord, with_embeddings: bool) -> EmbeddingRecord {
        if !with_embeddings {
            record.vector.clear();
        }
        record
    }
}

#[async_trait]
impl MemoryDb for InMemoryMemoryDb {
    async fn create_index(&self, index: &IndexName, vector_size: usize) -> Result<(), KernelMemoryError> {
        let mut collections = self.collections.lock().expect("memory db poisoned");
        collections.entry(index.as_str().to_string()).or_insert_with(|| Collection { vector_size, records: HashMap::new() });
        Ok(())
    }

    async fn delete_index(&self, index: &IndexName) -> Result<(), KernelMemoryError> {
        let mut collections = self.collections.lock().expect("memory db poisoned");
        collections.remove(index.as_str());
        Ok(())
    }

    async fn list_indexes(&self) -> Result<Vec<IndexName>, KernelMemoryError> {
        let collections = self.collections.lock().expect("memory db poisoned");
        collections.keys().map(|name| IndexName::normalize(name)).collect()
    }

    async fn upsert(&self, index: &IndexName, record: EmbeddingRecord) -> Result<String, KernelMemoryError> {
        let mut collections = self.collections.lock().expect("memory db poisoned");
        let collection = collections
            .entry(index.as_str().to_string())
            .or_insert_with(|| Collection { vector_size: record.vector.len(), records: HashMap::new() });

        if !record.vector.is_empty() && record.vector.len() != collection.vector_size {
            return Err(KernelMemoryError::fatal_validation(format!(
                "record '{}' has vector size {}, expected {} for index '{}'",
                record.id,
                record.vector.len(),
                collection.vector_size,
                index
            )));
        }

        let id = record.id.clone();
        collection.records.insert(id.clone(), record);
        Ok(id)
    }

    fn get_list(
        &self,
        index: &IndexName,
        filter: TagFilter,
        limit: usize,
        with_embeddings: bool,
    ) -> BoxStream<'static, Result<EmbeddingRecord, KernelMemoryError>> {
        let collections = self.collections.lock().expect("memory db poisoned");
        let matched: Vec<EmbeddingRecord> = collections
            .get(index.as_str())
            .map(|collection| {
                collection
                    .records
                    .values()
                    .filter(|record| filter.matches(&record.tags))
                    .take(limit)
                    .cloned()
                    .map(|record| Self::strip_embeddings(record, with_embeddings))
                    .collect()
            })
            .unwrap_or_default();

        stream::iter(matched.into_iter().map(Ok)).boxed()
    }

    fn get_similar_list(
        &self,
        index: &IndexName,
        query_embedding: Option<Vec<f32>>,
        query_text: Option<String>,
        limit: usize,
        min_relevance: f32,
        filter: TagFilter,
        with_embeddings: bool,
    ) -> BoxStream<'static, Result<(EmbeddingRecord, f32), KernelMemoryError>> {
        let Some(query) = query_embedding else {
            let message = if query_text.is_some() {
                "text-only similarity queries require an embedding generator, which this in-memory adapter does not have"
            } else {
                "get_similar_list requires a query_embedding or query_text"
            };
            return stream::once(async move { Err(KernelMemoryError::fatal_configuration(message)) }).boxed();
        };

        let collections = self.collections.lock().expect("memory db poisoned");
        let mut scored: Vec<(EmbeddingRecord, f32)> = collections
            .get(index.as_str())
            .map(|collection| {
                collection
                    .records
                    .values()
                    .filter(|record| filter.matches(&record.tags))
                    .map(|record| (record.clone(), cosine_similarity(&query, &record.vector)))
                    .filter(|(_, score)| *score >= min_relevance)
                    .collect()
            })
            .unwrap_or_default();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        let scored: Vec<_> =
            scored.into_iter().map(|(record, score)| (Self::strip_embeddings(record, with_embeddings), score)).collect();

        stream::iter(scored.into_iter().map(Ok)).boxed()
    }

    async fn delete(&self, index: &IndexName, record_id: &str) -> Result<(), KernelMemoryError> {
        let mut collections = self.collections.lock().expect("memory db poisoned");
        if let Some(collection) = collections.get_mut(index.as_str()) {
            collection.records.remove(record_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use kernel_memory_domain::entities::chunk::Chunk;
    use kernel_memory_domain::value_objects::TagMap;

    fn record(ordinal: u32, vector: Vec<f32>) -> EmbeddingRecord {
        let chunk = Chunk::new("idx", "doc-1", "input.txt", 0, ordinal, "text", 1, true, TagMap::new());
        EmbeddingRecord::new(&chunk, vector)
    }

    #[tokio::test]
    async fn upsert_auto_creates_the_collection() {
        let db = InMemoryMemoryDb::new();
        let index = IndexName::normalize("idx").unwrap();
        db.upsert(&index, record(0, vec![1.0, 0.0])).await.unwrap();
        assert_eq!(db.list_indexes().await.unwrap(), vec![index]);
    }

    #[tokio::test]
    async fn create_index_after_upserts_is_a_no_op() {
        let db = InMemoryMemoryDb::new();
        let index = IndexName::normalize("idx").unwrap();
        db.upsert(&index, record(0, vec![1.0, 0.0])).await.unwrap();
        db.create_index(&index, 2).await.unwrap();
        db.create_index(&index, 2).await.unwrap();

        let mut stream = db.get_list(&index, TagFilter::default(), usize::MAX, true);
        let mut count = 0;
        while stream.next().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let db = InMemoryMemoryDb::new();
        let index = IndexName::normalize("idx").unwrap();
        let id = db.upsert(&index, record(0, vec![1.0, 0.0])).await.unwrap();
        db.delete(&index, &id).await.unwrap();

        let mut stream = db.get_list(&index, TagFilter::default(), usize::MAX, true);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn get_similar_list_ranks_by_cosine_similarity() {
        let db = InMemoryMemoryDb::new();
        let index = IndexName::normalize("idx").unwrap();
        db.upsert(&index, record(0, vec![1.0, 0.0])).await.unwrap();
        db.upsert(&index, record(1, vec![0.0, 1.0])).await.unwrap();

        let mut stream =
            db.get_similar_list(&index, Some(vec![1.0, 0.0]), None, 10, 0.0, TagFilter::default(), true);
        let (top, score) = stream.next().await.unwrap().unwrap();
        assert_eq!(top.id, record(0, vec![1.0, 0.0]).id);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn get_list_without_embeddings_clears_vectors() {
        let db = InMemoryMemoryDb::new();
        let index = IndexName::normalize("idx").unwrap();
        db.upsert(&index, record(0, vec![1.0, 0.0])).await.unwrap();

        let mut stream = db.get_list(&index, TagFilter::default(), usize::MAX, false);
        let found = stream.next().await.unwrap().unwrap();
        assert!(found.vector.is_empty());
    }
}
