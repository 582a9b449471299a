// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Summarize Handler (optional)
//!
//! Iteratively reduces the document's extracted text with the text
//! generator until the draft is under a token budget, emitting an
//! additional generated file tagged as a summary. Downstream handlers
//! treat it as an ordinary extracted section — it is not itself a
//! pipeline step dependency, so `gen_embeddings` picks it up on the next
//! `partition` pass only if `summarize` runs before `partition` in the
//! configured step list.

use async_trait::async_trait;
use futures::StreamExt;
use kernel_memory_domain::entities::{FileDescriptor, Pipeline};
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::handler::{Handler, HandlerContext, HandlerOutcome};
use kernel_memory_domain::repositories::content_decoder::Section;
use kernel_memory_domain::repositories::text_generator::GenerationOptions;
use kernel_memory_domain::value_objects::MimeType;

pub const STEP_NAME: &str = "summarize";

/// Token budget the reduced summary must fit under.
const SUMMARY_TARGET_TOKENS: usize = 256;
/// Safety cap on reduce iterations so a generator that never converges
/// cannot loop forever; treated as a fatal configuration error instead.
const MAX_REDUCE_ITERATIONS: usize = 8;

pub struct SummarizeHandler;

impl SummarizeHandler {
    fn summary_file_name(source_file: &str) -> String {
        format!("{source_file}.summary.json")
    }

    async fn reduce(&self, ctx: &HandlerContext, mut text: String) -> Result<String, KernelMemoryError> {
        for _ in 0..MAX_REDUCE_ITERATIONS {
            if ctx.text_generator.count_tokens(&text) <= SUMMARY_TARGET_TOKENS {
                return Ok(text);
            }
            let prompt = format!("Summarize the following text concisely:\n\n{text}");
            let options = GenerationOptions { max_tokens: SUMMARY_TARGET_TOKENS, ..GenerationOptions::default() };
            let mut stream = ctx.text_generator.generate_text(prompt, options);
            let mut reduced = String::new();
            while let Some(piece) = stream.next().await {
                reduced.push_str(&piece?);
            }
            text = reduced;
        }
        Err(KernelMemoryError::fatal_configuration(format!(
            "summary did not converge under {SUMMARY_TARGET_TOKENS} tokens within {MAX_REDUCE_ITERATIONS} iterations"
        )))
    }

    async fn run(&self, mut pipeline: Pipeline, ctx: &HandlerContext) -> Result<Pipeline, KernelMemoryError> {
        let extracted: Vec<FileDescriptor> =
            pipeline.files.iter().filter(|f| f.generated_by.as_deref() == Some("extract")).cloned().collect();

        for file in extracted {
            let bytes =
                ctx.document_storage.read_file(&pipeline.index, &pipeline.document_id, &file.name).await?;
            let section: Section = serde_json::from_slice(&bytes)?;
            if section.text.trim().is_empty() {
                continue;
            }

            let summary_text = self.reduce(ctx, section.text).await?;
            let summary_section = Section { section_number: 0, text: summary_text, sentences_are_complete: true };
            let encoded = serde_json::to_vec(&summary_section)?;
            let name = Self::summary_file_name(&file.name);
            let size = encoded.len() as u64;
            ctx.document_storage.write_file(&pipeline.index, &pipeline.document_id, &name, encoded).await?;
            pipeline.add_file(FileDescriptor::generated(name, size, MimeType::new("application/json"), STEP_NAME));
        }

        Ok(pipeline)
    }
}

#[async_trait]
impl Handler for SummarizeHandler {
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

    #[tokio::test]
    async fn summarizes_each_extracted_section() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.document_storage.create_index("idx").await.unwrap();
        ctx.document_storage.create_document("idx", "doc-1").await.unwrap();

        let section =
            Section { section_number: 0, text: "a short sentence about nothing in particular".to_string(), sentences_are_complete: false };
        let encoded = serde_json::to_vec(&section).unwrap();
        ctx.document_storage
            .write_file("idx", "doc-1", "input.txt.extract.00000.json", encoded.clone())
            .await
            .unwrap();

        let mut pipeline = Pipeline::new("idx", "doc-1", vec![], TagMap::new(), vec![STEP_NAME.to_string()]);
        pipeline.add_file(FileDescriptor::generated(
            "input.txt.extract.00000.json",
            encoded.len() as u64,
            MimeType::new("application/json"),
            "extract",
        ));

        let handler = SummarizeHandler;
        match handler.invoke(pipeline, &ctx).await {
            HandlerOutcome::Success(pipeline) => {
                assert!(pipeline.files.iter().any(|f| f.generated_by.as_deref() == Some(STEP_NAME)));
            }
            _ => panic!("expected success"),
        }
    }
}
