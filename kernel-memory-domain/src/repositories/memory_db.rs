// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Memory DB (vector store) Interface
//!
//! Vector + tag store with per-index collections. Memory DB exclusively
//! owns embedding records. Index name normalization is performed by the
//! adapter before hitting the underlying store; callers always pass
//! already-normalized [`IndexName`]s.
//!
//! Relevance scoring is cosine similarity unless the adapter exposes a
//! hybrid lexical+vector mode, in which case the adapter merges scores
//! before returning them.

use crate::entities::embedding_record::EmbeddingRecord;
use crate::error::KernelMemoryError;
use crate::value_objects::{IndexName, TagFilter};
use async_trait::async_trait;
use futures::stream::BoxStream;

#[async_trait]
pub trait MemoryDb: Send + Sync {
    async fn create_index(&self, index: &IndexName, vector_size: usize) -> Result<(), KernelMemoryError>;

    async fn delete_index(&self, index: &IndexName) -> Result<(), KernelMemoryError>;

    async fn list_indexes(&self) -> Result<Vec<IndexName>, KernelMemoryError>;

    /// Inserts or overwrites `record`, keyed by its content-addressed id.
    /// Returns the id that was written.
    async fn upsert(&self, index: &IndexName, record: EmbeddingRecord) -> Result<String, KernelMemoryError>;

    /// Streams records matching `filter` (an empty filter matches all),
    /// up to `limit`. `with_embeddings` controls whether the dense vector
    /// is populated on returned records (omitting it saves bandwidth for
    /// callers that only need tags/payload).
    fn get_list(
        &self,
        index: &IndexName,
        filter: TagFilter,
        limit: usize,
        with_embeddings: bool,
    ) -> BoxStream<'static, Result<EmbeddingRecord, KernelMemoryError>>;

    /// Streams `(record, score)` pairs ordered by descending relevance. One
    /// of `query_embedding` / `query_text` must be set; if only text is
    /// given, the adapter is responsible for embedding it itself.
    fn get_similar_list(
        &self,
        index: &IndexName,
        query_embedding: Option<Vec<f32>>,
        query_text: Option<String>,
        limit: usize,
        min_relevance: f32,
        filter: TagFilter,
        with_embeddings: bool,
    ) -> BoxStream<'static, Result<(EmbeddingRecord, f32), KernelMemoryError>>;

    async fn delete(&self, index: &IndexName, record_id: &str) -> Result<(), KernelMemoryError>;
}

/// Cosine similarity between two equal-length dense vectors. Shared helper
/// for in-process adapters; `0.0` on a degenerate (zero-norm) input rather
/// than `NaN`, so callers can sort scores without filtering first.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
