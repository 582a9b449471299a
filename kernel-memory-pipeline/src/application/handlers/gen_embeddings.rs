// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # GenerateEmbeddings Handler
//!
//! For each chunk file produced by [`super::partition`], invokes the
//! configured embedding generator and writes a serialized embedding
//! record file per chunk. Chunks are batched up to the generator's
//! `max_batch_size`; a chunk whose token count exceeds `max_tokens` fails
//! the step rather than being silently truncated.

use async_trait::async_trait;
use kernel_memory_domain::entities::{Chunk, EmbeddingRecord, FileDescriptor, Pipeline};
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::handler::{Handler, HandlerContext, HandlerOutcome};
use kernel_memory_domain::value_objects::MimeType;

pub const STEP_NAME: &str = "gen_embeddings";

pub struct GenerateEmbeddingsHandler;

impl GenerateEmbeddingsHandler {
    pub fn record_file_name(chunk_file_name: &str) -> String {
        format!("{chunk_file_name}.embedding.json")
    }

    async fn run(&self, mut pipeline: Pipeline, ctx: &HandlerContext) -> Result<Pipeline, KernelMemoryError> {
        let chunk_files: Vec<FileDescriptor> =
            pipeline.files.iter().filter(|f| f.generated_by.as_deref() == Some("partition")).cloned().collect();

        // A redelivered message re-embeds every chunk from scratch; drop
        // this step's prior descriptors first so they're replaced, not
        // duplicated alongside the fresh ones.
        pipeline.remove_generated_by(STEP_NAME);

        let max_tokens = ctx.embedding_generator.max_tokens();
        let max_batch = ctx.embedding_generator.max_batch_size().max(1);

        for batch in chunk_files.chunks(max_batch) {
            let mut chunks = Vec::with_capacity(batch.len());
            for file in batch {
                let bytes =
                    ctx.document_storage.read_file(&pipeline.index, &pipeline.document_id, &file.name).await?;
                let chunk: Chunk = serde_json::from_slice(&bytes)?;
                if chunk.token_count > max_tokens {
                    return Err(KernelMemoryError::fatal_validation(format!(
                        "chunk '{}' has {} tokens, exceeding the embedding generator's max_tokens of {}",
                        file.name, chunk.token_count, max_tokens
                    )));
                }
                chunks.push((file.clone(), chunk));
            }

            let texts: Vec<String> = chunks.iter().map(|(_, chunk)| chunk.text.clone()).collect();
            let vectors = ctx.embedding_generator.generate_embedding_batch(&texts).await?;

            for ((file, chunk), vector) in chunks.into_iter().zip(vectors.into_iter()) {
                let record = EmbeddingRecord::new(&chunk, vector);
                let encoded = serde_json::to_vec(&record)?;
                let record_name = Self::record_file_name(&file.name);
                let size = encoded.len() as u64;
                ctx.document_storage
                    .write_file(&pipeline.index, &pipeline.document_id, &record_name, encoded)
                    .await?;
                pipeline.add_file(FileDescriptor::generated(
                    record_name,
                    size,
                    MimeType::new("application/json"),
                    STEP_NAME,
                ));
            }
        }

        Ok(pipeline)
    }
}

#[async_trait]
impl Handler for GenerateEmbeddingsHandler {
    fn name(&self) -> &str {
        STEP_NAME
    }

    async fn invoke(&self, pipeline: Pipeline, ctx: &HandlerContext) -> HandlerOutcome {
        match self.run(pipeline, ctx).await {
            Ok(pipeline) => HandlerOutcome::Success(pipeline),
            Err(err) if err.is_recoverable() => HandlerOutcome::Transient(err),
            Err(err) => HandlerOutcome::Fatal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::decoders::text_decoder::TextDecoder;
    use crate::infrastructure::generators::local_embedding_generator::LocalEmbeddingGenerator;
    use crate::infrastructure::generators::local_text_generator::LocalTextGenerator;
    use crate::infrastructure::memory_db::in_memory_memory_db::InMemoryMemoryDb;
    use crate::infrastructure::storage::fs_document_storage::FsDocumentStorage;
    use kernel_memory_domain::repositories::ContentDecoderRegistry;
    use kernel_memory_domain::value_objects::TagMap;
    use std::sync::Arc;

    fn context(dir: &std::path::Path, max_tokens: usize, max_batch: usize) -> HandlerContext {
        let mut decoders = ContentDecoderRegistry::new();
        decoders.register(Arc::new(TextDecoder::new()));
        HandlerContext {
            document_storage: Arc::new(FsDocumentStorage::new(dir.to_path_buf())),
            memory_db: Arc::new(InMemoryMemoryDb::new()),
            embedding_generator: Arc::new(LocalEmbeddingGenerator::new(max_batch, max_tokens)),
            text_generator: Arc::new(LocalTextGenerator::new(2048)),
            decoders: Arc::new(decoders),
            max_tokens_per_paragraph: 1000,
            max_tokens_per_line: 300,
            overlapping_tokens: 100,
        }
    }

    #[tokio::test]
    async fn generates_one_record_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), 8192, 16);
        ctx.document_storage.create_index("idx").await.unwrap();
        ctx.document_storage.create_document("idx", "doc-1").await.unwrap();

        let chunk = Chunk::new("idx", "doc-1", "input.txt", 0, 0, "hello world", 2, false, TagMap::new());
        let encoded = serde_json::to_vec(&chunk).unwrap();
        let chunk_file = chunk.file_name();
        ctx.document_storage.write_file("idx", "doc-1", &chunk_file, encoded.clone()).await.unwrap();

        let mut pipeline = Pipeline::new("idx", "doc-1", vec![], TagMap::new(), vec![STEP_NAME.to_string()]);
        pipeline.add_file(FileDescriptor::generated(
            chunk_file,
            encoded.len() as u64,
            MimeType::new("application/json"),
            "partition",
        ));

        let handler = GenerateEmbeddingsHandler;
        match handler.invoke(pipeline, &ctx).await {
            HandlerOutcome::Success(pipeline) => {
                assert!(pipeline.files.iter().any(|f| f.generated_by.as_deref() == Some(STEP_NAME)));
            }
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn rerun_does_not_duplicate_generated_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), 8192, 16);
        ctx.document_storage.create_index("idx").await.unwrap();
        ctx.document_storage.create_document("idx", "doc-3").await.unwrap();

        let chunk = Chunk::new("idx", "doc-3", "input.txt", 0, 0, "hello world", 2, false, TagMap::new());
        let encoded = serde_json::to_vec(&chunk).unwrap();
        let chunk_file = chunk.file_name();
        ctx.document_storage.write_file("idx", "doc-3", &chunk_file, encoded.clone()).await.unwrap();

        let mut pipeline = Pipeline::new("idx", "doc-3", vec![], TagMap::new(), vec![STEP_NAME.to_string()]);
        pipeline.add_file(FileDescriptor::generated(
            chunk_file,
            encoded.len() as u64,
            MimeType::new("application/json"),
            "partition",
        ));

        let handler = GenerateEmbeddingsHandler;
        let pipeline = match handler.invoke(pipeline, &ctx).await {
            HandlerOutcome::Success(pipeline) => pipeline,
            _ => panic!("expected success"),
        };
        let first_run_count =
            pipeline.files.iter().filter(|f| f.generated_by.as_deref() == Some(STEP_NAME)).count();

        let pipeline = match handler.invoke(pipeline, &ctx).await {
            HandlerOutcome::Success(pipeline) => pipeline,
            _ => panic!("expected success"),
        };
        let second_run_count =
            pipeline.files.iter().filter(|f| f.generated_by.as_deref() == Some(STEP_NAME)).count();

        assert_eq!(first_run_count, second_run_count);
    }

    #[tokio::test]
    async fn oversized_chunk_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), 1, 16);
        ctx.document_storage.create_index("idx").await.unwrap();
        ctx.document_storage.create_document("idx", "doc-2").await.unwrap();

        let chunk = Chunk::new("idx", "doc-2", "input.txt", 0, 0, "hello world", 10, false, TagMap::new());
        let encoded = serde_json::to_vec(&chunk).unwrap();
        let chunk_file = chunk.file_name();
        ctx.document_storage.write_file("idx", "doc-2", &chunk_file, encoded.clone()).await.unwrap();

        let mut pipeline = Pipeline::new("idx", "doc-2", vec![], TagMap::new(), vec![STEP_NAME.to_string()]);
        pipeline.add_file(FileDescriptor::generated(
            chunk_file,
            encoded.len() as u64,
            MimeType::new("application/json"),
            "partition",
        ));

        let handler = GenerateEmbeddingsHandler;
        match handler.invoke(pipeline, &ctx).await {
            HandlerOutcome::Fatal(err) => assert_eq!(err.category(), "validation"),
            _ => panic!("expected fatal outcome"),
        }
    }
}
