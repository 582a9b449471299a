// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Local Text Generator
//!
//! A deterministic stand-in for a hosted completion model, used by the
//! Summarize handler. "Generation" is a truncation to the requested token
//! budget of the prompt's trailing content (the text after the last blank
//! line, which is where [`summarize`](crate::application::handlers::summarize)
//! places the source text) — no model call, but it reliably converges the
//! reduce loop and keeps the pipeline runnable without external services.

use futures::stream::{self, BoxStream};
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::repositories::text_generator::GenerationOptions;
use kernel_memory_domain::repositories::TextGenerator;

pub struct LocalTextGenerator {
    max_token_total: usize,
}

impl LocalTextGenerator {
    pub fn new(max_token_total: usize) -> Self {
        Self { max_token_total }
    }

    fn reduce(prompt: &str, max_tokens: usize) -> String {
        let content = prompt.rsplit("\n\n").next().unwrap_or(prompt);
        let tokens: Vec<&str> = content.split_whitespace().collect();
        if tokens.len() <= max_tokens {
            content.trim().to_string()
        } else {
            tokens[..max_tokens].join(" ")
        }
    }
}

impl TextGenerator for LocalTextGenerator {
    fn max_token_total(&self) -> usize {
        self.max_token_total
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn generate_text(&self, prompt: String, options: GenerationOptions) -> BoxStream<'static, Result<String, KernelMemoryError>> {
        let max_token_total = self.max_token_total;
        let prompt_tokens = self.count_tokens(&prompt);
        if prompt_tokens > max_token_total {
            let message = format!("prompt has {prompt_tokens} tokens, exceeding max_token_total {max_token_total}");
            return stream::once(async move { Err(KernelMemoryError::fatal_validation(message)) }).boxed();
        }

        let reduced = Self::reduce(&prompt, options.max_tokens.max(1));
        stream::once(async move { Ok(reduced) }).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn collect(generator: &LocalTextGenerator, prompt: &str, max_tokens: usize) -> Result<String, KernelMemoryError> {
        let options = GenerationOptions { max_tokens, ..GenerationOptions::default() };
        let mut stream = generator.generate_text(prompt.to_string(), options);
        let mut out = String::new();
        while let Some(piece) = stream.next().await {
            out.push_str(&piece?);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn truncates_to_the_requested_token_budget() {
        let generator = LocalTextGenerator::new(2048);
        let prompt = format!("Summarize the following text concisely:\n\n{}", "word ".repeat(20).trim());
        let reduced = collect(&generator, &prompt, 5).await.unwrap();
        assert_eq!(reduced.split_whitespace().count(), 5);
    }

    #[tokio::test]
    async fn short_prompt_is_returned_unchanged() {
        let generator = LocalTextGenerator::new(2048);
        let prompt = "Summarize the following text concisely:\n\nshort text".to_string();
        let reduced = collect(&generator, &prompt, 256).await.unwrap();
        assert_eq!(reduced, "short text");
    }

    #[tokio::test]
    async fn oversized_prompt_is_fatal() {
        let generator = LocalTextGenerator::new(4);
        let prompt = "one two three four five".to_string();
        let err = collect(&generator, &prompt, 256).await.unwrap_err();
        assert_eq!(err.category(), "validation");
    }
}
