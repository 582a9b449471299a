// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Partition Handler
//!
//! Chunks every extracted text section into token-bounded windows:
//! `MaxTokensPerParagraph` wide, `OverlappingTokens` shared between
//! adjacent windows. Overlap only crosses a section boundary when the
//! trailing section's `sentences_are_complete` is false — true means the
//! source format (slides, spreadsheet cells) guarantees no sentence spill,
//! so carrying tokens across would graft unrelated fragments together.

use async_trait::async_trait;
use kernel_memory_domain::entities::{Chunk, FileDescriptor, Pipeline};
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::handler::{Handler, HandlerContext, HandlerOutcome};
use kernel_memory_domain::repositories::content_decoder::Section;
use kernel_memory_domain::value_objects::MimeType;

pub const STEP_NAME: &str = "partition";

pub struct PartitionHandler;

impl PartitionHandler {
    fn validate_bounds(ctx: &HandlerContext) -> Result<(), KernelMemoryError> {
        if ctx.max_tokens_per_line > ctx.max_tokens_per_paragraph {
            return Err(KernelMemoryError::fatal_configuration(
                "max_tokens_per_line must not exceed max_tokens_per_paragraph",
            ));
        }
        if ctx.overlapping_tokens >= ctx.max_tokens_per_paragraph {
            return Err(KernelMemoryError::fatal_configuration(
                "overlapping_tokens must be less than max_tokens_per_paragraph",
            ));
        }
        Ok(())
    }

    /// Slides a `max_tokens_per_paragraph`-wide, `overlapping_tokens`-overlapping
    /// window over `tokens`, returning one `Vec<String>` per window.
    fn windows(tokens: &[String], max_tokens_per_paragraph: usize, overlapping_tokens: usize) -> Vec<Vec<String>> {
        if tokens.is_empty() {
            return Vec::new();
        }
        let step = max_tokens_per_paragraph - overlapping_tokens;
        let mut out = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + max_tokens_per_paragraph).min(tokens.len());
            out.push(tokens[start..end].to_vec());
            if end == tokens.len() {
                break;
            }
            start += step;
        }
        out
    }

    async fn run(&self, mut pipeline: Pipeline, ctx: &HandlerContext) -> Result<Pipeline, KernelMemoryError> {
        Self::validate_bounds(ctx)?;

        let extracted: Vec<FileDescriptor> =
            pipeline.files.iter().filter(|f| f.generated_by.as_deref() == Some("extract")).cloned().collect();

        // A redelivered message re-chunks every extracted section from
        // scratch; drop this step's prior descriptors first so they're
        // replaced, not duplicated alongside the fresh ones.
        pipeline.remove_generated_by(STEP_NAME);

        // Group extracted sections by the original source file they came
        // from so overlap carries across sections of the *same* file only.
        let mut by_source: std::collections::BTreeMap<String, Vec<FileDescriptor>> = std::collections::BTreeMap::new();
        for file in extracted {
            let source = file.name.splitn(2, ".extract.").next().unwrap_or(&file.name).to_string();
            by_source.entry(source).or_default().push(file);
        }

        // chunk_ordinal is unique across the whole document, not just within
        // one source file - it backs __file_part, which save_records and
        // the content address both rely on to distinguish chunks, and two
        // files restarting it at zero would collide on both.
        let mut chunk_ordinal: u32 = 0;

        for (source_file, mut sections) in by_source {
            sections.sort_by_key(|f| f.name.clone());
            let mut carry: Vec<String> = Vec::new();

            for file in sections {
                let bytes =
                    ctx.document_storage.read_file(&pipeline.index, &pipeline.document_id, &file.name).await?;
                let section: Section = serde_json::from_slice(&bytes)?;

                let mut tokens = ctx.embedding_generator.get_tokens(&section.text);
                let mut combined = std::mem::take(&mut carry);
                combined.append(&mut tokens);

                let windows = Self::windows(&combined, ctx.max_tokens_per_paragraph, ctx.overlapping_tokens);

                for window in &windows {
                    let text = window.join(" ");
                    let chunk = Chunk::new(
                        pipeline.index.clone(),
                        pipeline.document_id.clone(),
                        source_file.clone(),
                        section.section_number,
                        chunk_ordinal,
                        text,
                        window.len(),
                        section.sentences_are_complete,
                        pipeline.tags.clone(),
                    );
                    chunk_ordinal += 1;

                    let file_name = chunk.file_name();
                    let encoded = serde_json::to_vec(&chunk)?;
                    let size = encoded.len() as u64;
                    ctx.document_storage
                        .write_file(&pipeline.index, &pipeline.document_id, &file_name, encoded)
                        .await?;
                    pipeline.add_file(FileDescriptor::generated(
                        file_name,
                        size,
                        MimeType::new("application/json"),
                        STEP_NAME,
                    ));
                }

                if !section.sentences_are_complete {
                    if let Some(last) = windows.last() {
                        let keep = ctx.overlapping_tokens.min(last.len());
                        carry = last[last.len() - keep..].to_vec();
                    }
                }
            }
        }

        Ok(pipeline)
    }
}

#[async_trait]
impl Handler for PartitionHandler {
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
