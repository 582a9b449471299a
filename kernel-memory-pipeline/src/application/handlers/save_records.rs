// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SaveRecords Handler
//!
//! Upserts every embedding record file into the Memory DB. Before
//! upserting, deletes any prior records tagged with the same
//! `__document_id` and `__file_part` so a re-run overwrites rather than
//! duplicates (I5).

use async_trait::async_trait;
use futures::StreamExt;
use kernel_memory_domain::entities::{EmbeddingRecord, FileDescriptor, Pipeline};
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::handler::{Handler, HandlerContext, HandlerOutcome};
use kernel_memory_domain::value_objects::tag_map::{AndClause, TagFilter, TAG_DOCUMENT_ID, TAG_FILE_PART};
use kernel_memory_domain::value_objects::IndexName;

pub const STEP_NAME: &str = "save_records";

pub struct SaveRecordsHandler;

impl SaveRecordsHandler {
    async fn run(&self, mut pipeline: Pipeline, ctx: &HandlerContext) -> Result<Pipeline, KernelMemoryError> {
        let record_files: Vec<FileDescriptor> = pipeline
            .files
            .iter()
            .filter(|f| f.generated_by.as_deref() == Some("gen_embeddings"))
            .cloned()
            .collect();

        if record_files.is_empty() {
            return Ok(pipeline);
        }

        let index = IndexName::normalize(&pipeline.index)?;
        let mut vector_size = None;

        for file in &record_files {
            let bytes =
                ctx.document_storage.read_file(&pipeline.index, &pipeline.document_id, &file.name).await?;
            let record: EmbeddingRecord = serde_json::from_slice(&bytes)?;
            vector_size.get_or_insert(record.vector.len());

            let file_part = record
                .tags
                .get(TAG_FILE_PART)
                .and_then(|values| values.first())
                .cloned()
                .unwrap_or_default();

            let idempotency_filter = TagFilter(vec![AndClause(vec![
                (TAG_DOCUMENT_ID.to_string(), pipeline.document_id.clone()),
                (TAG_FILE_PART.to_string(), file_part),
            ])]);

            let mut existing = ctx.memory_db.get_list(&index, idempotency_filter, usize::MAX, false);
            let mut stale_ids = Vec::new();
            while let Some(found) = existing.next().await {
                let found = found?;
                if found.id != record.id {
                    stale_ids.push(found.id);
                }
            }
            for stale_id in stale_ids {
                ctx.memory_db.delete(&index, &stale_id).await?;
            }

            ctx.memory_db.upsert(&index, record).await?;
        }

        if let Some(vector_size) = vector_size {
            ctx.memory_db.create_index(&index, vector_size).await?;
        }

        pipeline.append_log(STEP_NAME, "success", format!("saved {} records", record_files.len()));
        Ok(pipeline)
    }
}

#[async_trait]
impl Handler for SaveRecordsHandler {
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
    use kernel_memory_domain::entities::Chunk;
    use kernel_memory_domain::repositories::ContentDecoderRegistry;
    use kernel_memory_domain::value_objects::{MimeType, TagMap};
    use std::sync::Arc;

    fn context(dir: &std::path::Path) -> HandlerContext {
        let mut decoders = ContentDecoderRegistry::new();
        decoders.register(Arc::new(TextDecoder::new()));
        HandlerContext {
            document_storage: Arc::new(FsDocumentStorage::new(dir.to_path_buf())),
            memory_db: Arc::new(InMemoryMemoryDb::new()),
            embedding_generator: Arc::new(LocalEmbeddingGenerator::new(16, 8192)),
            text_generator: Arc::new(LocalTextGenerator::new(2048)),
            decoders: Arc::new(decoders),
            max_tokens_per_paragraph: 1000,
            max_tokens_per_line: 300,
            overlapping_tokens: 100,
        }
    }

    async fn seed_record(ctx: &HandlerContext, pipeline: &mut Pipeline, vector: Vec<f32>) -> String {
        let chunk = Chunk::new(
            pipeline.index.clone(),
            pipeline.document_id.clone(),
            "input.txt",
            0,
            0,
            "hello world",
            2,
            false,
            TagMap::new(),
        );
        let record = EmbeddingRecord::new(&chunk, vector);
        let encoded = serde_json::to_vec(&record).unwrap();
        let name = format!("{}.embedding.json", chunk.file_name());
        ctx.document_storage
            .write_file(&pipeline.index, &pipeline.document_id, &name, encoded.clone())
            .await
            .unwrap();
        pipeline.add_file(FileDescriptor::generated(
            name.clone(),
            encoded.len() as u64,
            MimeType::new("application/json"),
            "gen_embeddings",
        ));
        name
    }

    #[tokio::test]
    async fn rerun_overwrites_rather_than_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.document_storage.create_index("idx").await.unwrap();
        ctx.document_storage.create_document("idx", "doc-1").await.unwrap();

        let mut pipeline = Pipeline::new("idx", "doc-1", vec![], TagMap::new(), vec![STEP_NAME.to_string()]);
        seed_record(&ctx, &mut pipeline, vec![0.1, 0.2]).await;

        let handler = SaveRecordsHandler;
        let pipeline = match handler.invoke(pipeline.clone(), &ctx).await {
            HandlerOutcome::Success(pipeline) => pipeline,
            _ => panic!("expected success"),
        };

        // Re-run against the same persisted chunk: still exactly one record.
        let _second_run = match handler.invoke(pipeline, &ctx).await {
            HandlerOutcome::Success(pipeline) => pipeline,
            _ => panic!("expected success"),
        };

        let index = IndexName::normalize("idx").unwrap();
        let mut stream = ctx.memory_db.get_list(&index, TagFilter::default(), usize::MAX, false);
        let mut count = 0;
        while stream.next().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 1);
    }
}
