// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Embedding generator contract. Concrete backends (OpenAI, local model
//! servers, ...) are out of scope for the pipeline core; only the contract
//! and a deterministic local implementation for tests live here.

use crate::error::KernelMemoryError;
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    /// Maximum tokens a single `generate_embedding` call accepts.
    fn max_tokens(&self) -> usize;

    /// Maximum number of texts a single `generate_embedding_batch` call
    /// accepts.
    fn max_batch_size(&self) -> usize;

    fn count_tokens(&self, text: &str) -> usize;

    fn get_tokens(&self, text: &str) -> Vec<String>;

    /// Generates a dense embedding for `text`.
    ///
    /// Returns [`KernelMemoryError::FatalValidation`] if `text` exceeds
    /// [`EmbeddingGenerator::max_tokens`]; callers must split or fail
    /// accordingly rather than silently truncating.
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, KernelMemoryError>;

    /// Batch form, bounded by [`EmbeddingGenerator::max_batch_size`].
    /// Default implementation calls [`EmbeddingGenerator::generate_embedding`]
    /// once per text; adapters with a native batch API should override.
    async fn generate_embedding_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KernelMemoryError> {
        if texts.len() > self.max_batch_size() {
            return Err(KernelMemoryError::fatal_validation(format!(
                "batch of {} exceeds max_batch_size {}",
                texts.len(),
                self.max_batch_size()
            )));
        }
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.generate_embedding(text).await?);
        }
        Ok(out)
    }
}
