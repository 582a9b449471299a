// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Text generator contract, used by the optional Summarize handler.

use crate::error::KernelMemoryError;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Sampling/decoding options; mirrors the knobs a hosted completion API
/// typically exposes.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub max_tokens: usize,
    pub stop_sequences: Vec<String>,
    pub token_biases: Vec<(String, f32)>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            max_tokens: 256,
            stop_sequences: Vec::new(),
            token_biases: Vec::new(),
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn max_token_total(&self) -> usize;

    fn count_tokens(&self, text: &str) -> usize;

    /// Produces a stream of incremental output chunks. Dropping the stream
    /// (or cancelling the caller's task) must cancel the underlying
    /// generation.
    fn generate_text(&self, prompt: String, options: GenerationOptions) -> BoxStream<'static, Result<String, KernelMemoryError>>;
}
