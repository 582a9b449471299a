// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Kernel Memory Demo
//!
//! Builds an [`Orchestrator`] wired entirely to the in-process reference
//! adapters (no network, no external service) and runs one document
//! through the default ingestion steps synchronously, then prints what
//! happened. This binary exists to prove the wiring end-to-end; a real
//! deployment drives the orchestrator from an HTTP front end and
//! [`Orchestrator::run_workers`] pulling off a networked queue, not from
//! `main()` directly.

use std::sync::Arc;

use kernel_memory_bootstrap::{init_tracing, result_to_exit_code, CancellationToken, KmConfig};
use kernel_memory_pipeline::application::handlers::{
    extract::ExtractHandler, gen_embeddings::GenerateEmbeddingsHandler, partition::PartitionHandler,
    save_records::SaveRecordsHandler, summarize::SummarizeHandler,
};
use kernel_memory_pipeline::infrastructure::decoders::{MarkdownDecoder, TextDecoder};
use kernel_memory_pipeline::infrastructure::generators::{LocalEmbeddingGenerator, LocalTextGenerator};
use kernel_memory_pipeline::infrastructure::memory_db::InMemoryMemoryDb;
use kernel_memory_pipeline::infrastructure::queue::InMemoryQueue;
use kernel_memory_pipeline::infrastructure::storage::FsDocumentStorage;
use kernel_memory_pipeline::{Orchestrator, OrchestratorDeps, PartitionDefaults};
use kernel_memory_domain::entities::pipeline::PipelineStatus;
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::repositories::ContentDecoderRegistry;
use kernel_memory_domain::value_objects::{MimeType, TagMap};

const SAMPLE_DOCUMENT: &str = "\
# Kernel Memory

Kernel Memory ingests a document by extracting its text, partitioning \
the text into token-bounded chunks, embedding each chunk, and saving \
the resulting vectors for later retrieval.

## Retrieval

A query embeds the same way and is matched against saved vectors by \
cosine similarity, filtered by tag.
";

#[tokio::main]
async fn main() {
    let config = KmConfig::defaults();
    init_tracing(&config.observability);

    let result = run_demo(&config).await;
    let exit_code = result_to_exit_code(result);
    std::process::exit(exit_code.as_i32());
}

async fn run_demo(config: &KmConfig) -> Result<(), KernelMemoryError> {
    let storage_root = std::env::temp_dir().join(format!("km-demo-{}", ulid::Ulid::new()));

    let mut decoders = ContentDecoderRegistry::new();
    decoders.register(Arc::new(TextDecoder::new()));
    decoders.register(Arc::new(MarkdownDecoder::new()));

    let deps = OrchestratorDeps {
        document_storage: Arc::new(FsDocumentStorage::new(storage_root.clone())),
        memory_db: Arc::new(InMemoryMemoryDb::new()),
        queue: Arc::new(InMemoryQueue::new(std::time::Duration::from_secs(
            config.queue.visibility_timeout_secs,
        ))),
        embedding_generator: Arc::new(LocalEmbeddingGenerator::new(
            config.embeddings.max_batch_size,
            config.embeddings.max_tokens,
        )),
        text_generator: Arc::new(LocalTextGenerator::new(config.embeddings.max_tokens)),
        decoders: Arc::new(decoders),
    };

    let orchestrator = Orchestrator::new(
        deps,
        config.pipeline.default_steps.clone(),
        PartitionDefaults {
            max_tokens_per_paragraph: config.partition.max_tokens_per_paragraph,
            max_tokens_per_line: config.partition.max_tokens_per_line,
            overlapping_tokens: config.partition.overlapping_tokens,
        },
        config.queue.max_attempts,
        CancellationToken::default(),
    );
    orchestrator.add_handler(Arc::new(ExtractHandler));
    orchestrator.add_handler(Arc::new(PartitionHandler));
    orchestrator.add_handler(Arc::new(GenerateEmbeddingsHandler));
    orchestrator.add_handler(Arc::new(SaveRecordsHandler));
    orchestrator.add_handler(Arc::new(SummarizeHandler));

    let mut tags = TagMap::new();
    tags.append("source".to_string(), "km-demo".to_string());

    let pipeline = orchestrator.prepare_upload("demo", None, tags, Vec::new())?;
    let index = pipeline.index.clone();
    let document_id = pipeline.document_id.clone();

    // Writes the sample file to storage, persists the pipeline, and
    // enqueues the first step - mirrors what a real upload endpoint does.
    orchestrator
        .import_document(
            pipeline,
            vec![(
                "overview.md".to_string(),
                SAMPLE_DOCUMENT.as_bytes().to_vec(),
                MimeType::new(MimeType::TEXT_MARKDOWN),
            )],
        )
        .await?;

    // `run_pipeline` is the synchronous alternative to draining the queue
    // via `run_workers`; it expects the uploaded content already in
    // storage, which `import_document` just guaranteed.
    let pipeline = orchestrator
        .read_status(&index, &document_id)
        .await?
        .ok_or_else(|| KernelMemoryError::internal("pipeline vanished after import"))?;
    let pipeline = orchestrator.run_pipeline(pipeline).await?;

    print_report(&pipeline);
    std::fs::remove_dir_all(&storage_root).ok();
    Ok(())
}

fn print_report(pipeline: &kernel_memory_domain::entities::Pipeline) {
    println!();
    println!("KERNEL MEMORY DEMO");
    println!("------------------");
    println!("index:          {}", pipeline.index);
    println!("document:       {}", pipeline.document_id);
    println!("status:         {:?}", pipeline.status);
    println!("completed:      {}", pipeline.completed_steps.join(" -> "));
    if pipeline.status == PipelineStatus::Failed {
        if let Some(entry) = pipeline.logs.last() {
            println!("last log:       {}", entry.message);
        }
    }
    println!("generated files:");
    for file in pipeline.files.iter().filter(|f| f.is_generated()) {
        println!("  - {} ({})", file.name, file.generated_by.as_deref().unwrap_or("?"));
    }
    println!();
}
