// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Handler Interface
//!
//! A handler is a named, idempotent unit of pipeline work. The orchestrator
//! owns persistence and queue routing around every call; the handler itself
//! only decides the outcome and returns the pipeline it would like
//! persisted.
//!
//! ## Avoiding a cyclic ownership graph
//!
//! Handlers need Document Storage, the Memory DB, the embedding/text
//! generators, and the content decoder registry to do their work, and the
//! orchestrator needs to invoke handlers — a naive design has handlers hold
//! a back-reference to the orchestrator, which owns the handler registry,
//! which owns the handlers. [`HandlerContext`] breaks the cycle: it is a
//! plain bag of `Arc` handles passed into [`Handler::invoke`] by value,
//! never an owning reference back to the orchestrator.

use crate::entities::pipeline::Pipeline;
use crate::error::KernelMemoryError;
use crate::repositories::content_decoder::ContentDecoderRegistry;
use crate::repositories::document_storage::DocumentStorage;
use crate::repositories::embedding_generator::EmbeddingGenerator;
use crate::repositories::memory_db::MemoryDb;
use crate::repositories::text_generator::TextGenerator;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a single handler invocation. The orchestrator maps this to a
/// persistence + queue action; handlers never throw to signal retry policy.
pub enum HandlerOutcome {
    /// The handler succeeded; the orchestrator persists `pipeline` and
    /// advances `remaining_steps`.
    Success(Pipeline),
    /// A transient failure (storage/queue/network); the orchestrator nacks
    /// with requeue, subject to the queue's own attempt cap.
    Transient(KernelMemoryError),
    /// A fatal failure (configuration or validation); the orchestrator
    /// marks the pipeline failed without retry.
    Fatal(KernelMemoryError),
}

impl HandlerOutcome {
    pub fn from_result(pipeline: Pipeline, result: Result<(), KernelMemoryError>) -> Self {
        match result {
            Ok(()) => HandlerOutcome::Success(pipeline),
            Err(err) if err.is_recoverable() => HandlerOutcome::Transient(err),
            Err(err) => HandlerOutcome::Fatal(err),
        }
    }
}

/// Minimal resource hint a handler may give the orchestrator's worker pool
/// when sizing concurrency. Handlers that have no opinion use the default.
#[derive(Debug, Clone)]
pub struct ResourceHint {
    pub memory_bytes: u64,
    pub estimated_duration: Duration,
}

impl Default for ResourceHint {
    fn default() -> Self {
        Self { memory_bytes: 16 * 1024 * 1024, estimated_duration: Duration::from_millis(500) }
    }
}

/// Dependencies a handler needs, threaded in by value rather than held as
/// an owning back-reference to the orchestrator.
#[derive(Clone)]
pub struct HandlerContext {
    pub document_storage: Arc<dyn DocumentStorage>,
    pub memory_db: Arc<dyn MemoryDb>,
    pub embedding_generator: Arc<dyn EmbeddingGenerator>,
    pub text_generator: Arc<dyn TextGenerator>,
    pub decoders: Arc<ContentDecoderRegistry>,
    pub max_tokens_per_paragraph: usize,
    pub max_tokens_per_line: usize,
    pub overlapping_tokens: usize,
}

/// A named, idempotent unit of pipeline work.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The step name this handler registers under (`extract`, `partition`,
    /// `gen_embeddings`, `save_records`, `summarize`, `delete_document`,
    /// `delete_index`, or a third-party name).
    fn name(&self) -> &str;

    /// Executes this step against `pipeline`, returning the outcome the
    /// orchestrator should act on. Must be idempotent: re-invoking against
    /// the same persisted state must not duplicate side effects.
    async fn invoke(&self, pipeline: Pipeline, ctx: &HandlerContext) -> HandlerOutcome;

    /// Optional resource hint; the default is a light-weight guess.
    async fn estimate_resources(&self, _pipeline: &Pipeline) -> ResourceHint {
        ResourceHint::default()
    }
}

/// Maps a step name to its handler implementation.
///
/// Implemented as an open, string-keyed registry rather than a closed
/// tagged enum, since [`crate::repositories`]'s orchestrator contract
/// exposes `addHandler` for third-party registration.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: std::collections::HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn Handler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler(&'static str);

    #[async_trait]
    impl Handler for NoopHandler {
        fn name(&self) -> &str {
            self.0
        }

        async fn invoke(&self, pipeline: Pipeline, _ctx: &HandlerContext) -> HandlerOutcome {
            HandlerOutcome::Success(pipeline)
        }
    }

    #[test]
    fn registry_looks_up_by_name() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(NoopHandler("extract")));
        assert!(registry.is_registered("extract"));
        assert!(!registry.is_registered("partition"));
        assert!(registry.get("extract").is_some());
    }
}
