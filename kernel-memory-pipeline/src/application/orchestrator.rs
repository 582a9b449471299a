// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Orchestrator
//!
//! Creates, persists, advances, recovers, and terminates pipelines;
//! dispatches queue messages to handlers; manages retries and poison
//! routing. This is the core of the ingestion pipeline — see the dispatch
//! algorithm in [`Orchestrator::dispatch`].

use std::sync::{Arc, RwLock};

use kernel_memory_bootstrap::CancellationToken;
use kernel_memory_domain::entities::pipeline::PipelineStatus;
use kernel_memory_domain::entities::{FileDescriptor, Pipeline};
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::handler::{Handler, HandlerContext, HandlerOutcome, HandlerRegistry};
use kernel_memory_domain::repositories::{
    ContentDecoderRegistry, Delivery, DocumentStorage, EmbeddingGenerator, MemoryDb, Queue,
    QueueMessage, TextGenerator,
};
use kernel_memory_domain::value_objects::{IndexName, MimeType, TagMap};

/// The collaborators the orchestrator threads into every handler
/// invocation via [`HandlerContext`], plus the queue it dispatches
/// against directly.
pub struct OrchestratorDeps {
    pub document_storage: Arc<dyn DocumentStorage>,
    pub memory_db: Arc<dyn MemoryDb>,
    pub queue: Arc<dyn Queue>,
    pub embedding_generator: Arc<dyn EmbeddingGenerator>,
    pub text_generator: Arc<dyn TextGenerator>,
    pub decoders: Arc<ContentDecoderRegistry>,
}

/// Partitioner defaults, threaded into [`HandlerContext`] rather than
/// hard-coded in the Partition handler so they are configurable per
/// deployment (`[partition]` in `KmConfig`).
#[derive(Debug, Clone, Copy)]
pub struct PartitionDefaults {
    pub max_tokens_per_paragraph: usize,
    pub max_tokens_per_line: usize,
    pub overlapping_tokens: usize,
}

impl Default for PartitionDefaults {
    fn default() -> Self {
        Self { max_tokens_per_paragraph: 1000, max_tokens_per_line: 300, overlapping_tokens: 100 }
    }
}

pub struct Orchestrator {
    deps: OrchestratorDeps,
    handlers: RwLock<HandlerRegistry>,
    partition_defaults: PartitionDefaults,
    default_steps: Vec<String>,
    max_attempts: u32,
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        deps: OrchestratorDeps,
        default_steps: Vec<String>,
        partition_defaults: PartitionDefaults,
        max_attempts: u32,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            deps,
            handlers: RwLock::new(HandlerRegistry::new()),
            partition_defaults,
            default_steps,
            max_attempts,
            shutdown,
        }
    }

    /// Registers (or replaces) a handler under its own name.
    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        self.handlers.write().expect("handler registry poisoned").register(handler);
    }

    /// Signals every worker loop spawned by [`Orchestrator::run_workers`]
    /// to stop accepting new work.
    pub fn stop_all_pipelines(&self) {
        self.shutdown.cancel();
    }

    /// Allocates a pipeline with a generated or client-supplied document
    /// id. Client-supplied ids are validated against the same
    /// normalization rules as index names. An empty `steps` falls back to
    /// the configured default ingestion list.
    pub fn prepare_upload(
        &self,
        index: &str,
        document_id: Option<String>,
        tags: TagMap,
        steps: Vec<String>,
    ) -> Result<Pipeline, KernelMemoryError> {
        let index_name = IndexName::normalize(index)?;
        let document_id = match document_id {
            Some(raw) => IndexName::normalize(&raw)?.as_str().to_string(),
            None => ulid::Ulid::new().to_string().to_lowercase(),
        };
        let steps = if steps.is_empty() { self.default_steps.clone() } else { steps };
        Ok(Pipeline::new(index_name.as_str(), document_id, Vec::new(), tags, steps))
    }

    /// Uploads input files to storage, persists the pipeline, and enqueues
    /// the first remaining step. Returns the document id.
    pub async fn import_document(
        &self,
        mut pipeline: Pipeline,
        inputs: Vec<(String, Vec<u8>, MimeType)>,
    ) -> Result<String, KernelMemoryError> {
        self.deps.document_storage.create_index(&pipeline.index).await?;
        self.deps.document_storage.create_document(&pipeline.index, &pipeline.document_id).await?;

        for (name, bytes, mime) in inputs {
            let size = bytes.len() as u64;
            self.deps
                .document_storage
                .write_file(&pipeline.index, &pipeline.document_id, &name, bytes)
                .await?;
            pipeline.add_file(FileDescriptor::uploaded(name, size, mime));
        }

        // I2: persist before the next step is ever enqueued.
        self.persist(&pipeline).await?;
        if pipeline.current_step().is_some() {
            self.deps.queue.enqueue(self.message_for(&pipeline)).await?;
        }
        Ok(pipeline.document_id.clone())
    }

    /// Synchronous mode: invokes each remaining step in order in the
    /// calling task, preserving the persist-before-advance discipline
    /// without an actual queue round trip.
    pub async fn run_pipeline(&self, mut pipeline: Pipeline) -> Result<Pipeline, KernelMemoryError> {
        self.persist(&pipeline).await?;
        while let Some(step) = pipeline.current_step().map(str::to_string) {
            pipeline = self.run_step_inline(pipeline, &step).await;
            self.persist(&pipeline).await?;
            if pipeline.status == PipelineStatus::Failed {
                break;
            }
        }
        Ok(pipeline)
    }

    pub async fn read_status(
        &self,
        index: &str,
        document_id: &str,
    ) -> Result<Option<Pipeline>, KernelMemoryError> {
        let index_name = IndexName::normalize(index)?;
        self.deps.document_storage.read_pipeline_status(index_name.as_str(), document_id).await
    }

    pub async fn is_ready(&self, index: &str, document_id: &str) -> Result<bool, KernelMemoryError> {
        Ok(self.read_status(index, document_id).await?.is_some_and(|p| p.is_ready()))
    }

    /// Removes a single document from both Document Storage and the
    /// Memory DB. Not queued — there is no partial-progress state worth
    /// persisting for a delete.
    pub async fn delete_document(&self, index: &str, document_id: &str) -> Result<(), KernelMemoryError> {
        super::handlers::delete::delete_document(
            self.deps.document_storage.as_ref(),
            self.deps.memory_db.as_ref(),
            index,
            document_id,
        )
        .await
    }

    /// Removes an entire index from both Document Storage and the Memory
    /// DB.
    pub async fn delete_index(&self, index: &str) -> Result<(), KernelMemoryError> {
        super::handlers::delete::delete_index(
            self.deps.document_storage.as_ref(),
            self.deps.memory_db.as_ref(),
            index,
        )
        .await
    }

    /// Spawns `concurrency` worker loops pulling from the queue. Each loop
    /// exits once `stop_all_pipelines` (or the shared token) is cancelled.
    pub async fn run_workers(self: Arc<Self>, concurrency: usize) {
        let mut tasks = Vec::with_capacity(concurrency);
        for _ in 0..concurrency {
            let orchestrator = Arc::clone(&self);
            tasks.push(tokio::spawn(async move { orchestrator.worker_loop().await }));
        }
        for task in tasks {
            let _ = task.await;
        }
    }

    async fn worker_loop(&self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(target: "orchestrator", "worker loop stopping on shutdown signal");
                    return;
                }
                delivery = self.deps.queue.dequeue() => {
                    match delivery {
                        Ok(Some(delivery)) => {
                            if let Err(err) = self.dispatch(delivery).await {
                                tracing::error!(target: "orchestrator", error = %err, "dispatch failed");
                            }
                        }
                        Ok(None) => {
                            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                        }
                        Err(err) => {
                            tracing::error!(target: "orchestrator", error = %err, "dequeue failed");
                            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                        }
                    }
                }
            }
        }
    }

    /// The dispatch algorithm (spec §4.1):
    ///
    /// 1. Load pipeline from storage. If absent or `execution_id` stale,
    ///    ack-and-drop.
    /// 2. If `remaining_steps` empty, mark completed, persist, ack.
    /// 3. Look up the handler for the current step; if unregistered,
    ///    poison.
    /// 4. Invoke the handler.
    /// 5. On success: advance, persist, enqueue the next step (or mark
    ///    completed), ack.
    /// 6. On transient failure: requeue unless the attempt cap is
    ///    exceeded, in which case poison.
    /// 7. On fatal failure: mark failed, persist, ack, route a copy to
    ///    poison.
    pub async fn dispatch(&self, delivery: Delivery) -> Result<(), KernelMemoryError> {
        let message = delivery.message.clone();

        let pipeline =
            self.deps.document_storage.read_pipeline_status(&message.index, &message.document_id).await?;
        let Some(mut pipeline) = pipeline else {
            tracing::warn!(target: "orchestrator", %message.index, %message.document_id, "no pipeline state; dropping stale message");
            return self.deps.queue.ack(&delivery).await;
        };
        if pipeline.execution_id != message.execution_id {
            tracing::debug!(target: "orchestrator", %message.document_id, "stale execution id; dropping");
            return self.deps.queue.ack(&delivery).await;
        }

        let Some(step) = pipeline.current_step().map(str::to_string) else {
            pipeline.mark_completed();
            self.persist(&pipeline).await?;
            return self.deps.queue.ack(&delivery).await;
        };

        let handler = self.handlers.read().expect("handler registry poisoned").get(&step);
        let Some(handler) = handler else {
            pipeline.mark_failed(&step, format!("no handler registered for step '{step}'"));
            self.persist(&pipeline).await?;
            return self.deps.queue.poison(&delivery, &format!("unregistered handler '{step}'")).await;
        };

        let snapshot = pipeline.clone();
        let outcome = handler.invoke(pipeline, &self.handler_context()).await;

        match outcome {
            HandlerOutcome::Success(mut pipeline) => {
                pipeline.advance(&step);
                pipeline.append_log(&step, "success", "completed");
                self.persist(&pipeline).await?;
                if pipeline.current_step().is_some() {
                    self.deps.queue.enqueue(self.message_for(&pipeline)).await?;
                }
                self.deps.queue.ack(&delivery).await
            }
            HandlerOutcome::Transient(err) => {
                if delivery.attempt >= self.max_attempts {
                    let mut pipeline = snapshot;
                    pipeline.mark_failed(&step, err.to_string());
                    self.persist(&pipeline).await?;
                    self.deps.queue.poison(&delivery, &err.to_string()).await
                } else {
                    self.deps.queue.requeue(&delivery).await
                }
            }
            HandlerOutcome::Fatal(err) => {
                let mut pipeline = snapshot;
                pipeline.mark_failed(&step, err.to_string());
                self.persist(&pipeline).await?;
                self.deps.queue.ack(&delivery).await?;
                self.deps.queue.poison(&delivery, &err.to_string()).await
            }
        }
    }

    /// Runs a single step inline (synchronous-mode helper): retries a
    /// transient outcome up to `max_attempts` times before giving up,
    /// without ever touching the queue.
    async fn run_step_inline(&self, pipeline: Pipeline, step: &str) -> Pipeline {
        let handler = self.handlers.read().expect("handler registry poisoned").get(step);
        let Some(handler) = handler else {
            let mut pipeline = pipeline;
            pipeline.mark_failed(step, format!("no handler registered for step '{step}'"));
            return pipeline;
        };

        let mut pipeline = pipeline;
        loop {
            let snapshot = pipeline.clone();
            match handler.invoke(pipeline, &self.handler_context()).await {
                HandlerOutcome::Success(mut pipeline) => {
                    pipeline.advance(step);
                    pipeline.append_log(step, "success", "completed");
                    return pipeline;
                }
                HandlerOutcome::Transient(err) => {
                    let mut pipeline = snapshot;
                    let attempts = pipeline.increment_retry(step);
                    if attempts >= self.max_attempts {
                        pipeline.mark_failed(step, err.to_string());
                        return pipeline;
                    }
                    tracing::debug!(target: "orchestrator", %step, attempts, "retrying transient failure inline");
                }
                HandlerOutcome::Fatal(err) => {
                    let mut pipeline = snapshot;
                    pipeline.mark_failed(step, err.to_string());
                    return pipeline;
                }
            }
        }
    }

    async fn persist(&self, pipeline: &Pipeline) -> Result<(), KernelMemoryError> {
        self.deps.document_storage.write_pipeline_status(&pipeline.index, &pipeline.document_id, pipeline).await
    }

    fn message_for(&self, pipeline: &Pipeline) -> QueueMessage {
        QueueMessage {
            index: pipeline.index.clone(),
            document_id: pipeline.document_id.clone(),
            execution_id: pipeline.execution_id.clone(),
        }
    }

    fn handler_context(&self) -> HandlerContext {
        HandlerContext {
            document_storage: Arc::clone(&self.deps.document_storage),
            memory_db: Arc::clone(&self.deps.memory_db),
            embedding_generator: Arc::clone(&self.deps.embedding_generator),
            text_generator: Arc::clone(&self.deps.text_generator),
            decoders: Arc::clone(&self.deps.decoders),
            max_tokens_per_paragraph: self.partition_defaults.max_tokens_per_paragraph,
            max_tokens_per_line: self.partition_defaults.max_tokens_per_line,
            overlapping_tokens: self.partition_defaults.overlapping_tokens,
        }
    }
}
