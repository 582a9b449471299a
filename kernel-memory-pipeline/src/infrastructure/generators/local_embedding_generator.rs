// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Local Embedding Generator
//!
//! A deterministic, hash-based embedding generator with no external model
//! dependency — exercises the pipeline end-to-end without a network call.
//! Tokenization is whitespace splitting, which is also deterministic and
//! good enough for the partitioner's token-budget arithmetic; a hosted
//! model's tokenizer is a separate, external collaborator.

use async_trait::async_trait;
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::repositories::EmbeddingGenerator;
use sha2::{Digest, Sha256};

/// Fixed output dimensionality. A real backend reports its model's native
/// size; this adapter only needs internal consistency.
const EMBEDDING_DIM: usize = 32;

pub struct LocalEmbeddingGenerator {
    max_batch_size: usize,
    max_tokens: usize,
}

impl LocalEmbeddingGenerator {
    pub fn new(max_batch_size: usize, max_tokens: usize) -> Self {
        Self { max_batch_size, max_tokens }
    }

    fn embed(text: &str) -> Vec<f32> {
        let mut out = Vec::with_capacity(EMBEDDING_DIM);
        let mut counter: u32 = 0;
        while out.len() < EMBEDDING_DIM {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for byte in digest.iter() {
                if out.len() == EMBEDDING_DIM {
                    break;
                }
                out.push((*byte as f32 / 255.0) * 2.0 - 1.0);
            }
            counter += 1;
        }
        out
    }
}

#[async_trait]
impl EmbeddingGenerator for LocalEmbeddingGenerator {
    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.get_tokens(text).len()
    }

    fn get_tokens(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, KernelMemoryError> {
        let token_count = self.count_tokens(text);
        if token_count > self.max_tokens {
            return Err(KernelMemoryError::fatal_validation(format!(
                "text has {token_count} tokens, exceeding max_tokens {}",
                self.max_tokens
            )));
        }
        Ok(Self::embed(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_always_produces_the_same_vector() {
        let generator = LocalEmbeddingGenerator::new(16, 8192);
        let a = generator.generate_embedding("hello world").await.unwrap();
        let b = generator.generate_embedding("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), EMBEDDING_DIM);
    }

    #[tokio::test]
    async fn different_text_produces_different_vectors() {
        let generator = LocalEmbeddingGenerator::new(16, 8192);
        let a = generator.generate_embedding("hello").await.unwrap();
        let b = generator.generate_embedding("goodbye").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn oversized_text_is_fatal() {
        let generator = LocalEmbeddingGenerator::new(16, 1);
        let err = generator.generate_embedding("two tokens").await.unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn tokenization_splits_on_whitespace() {
        let generator = LocalEmbeddingGenerator::new(16, 8192);
        assert_eq!(generator.get_tokens("a  b\tc"), vec!["a", "b", "c"]);
    }
}
