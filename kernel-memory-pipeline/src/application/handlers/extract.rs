// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Extract Handler
//!
//! For each uploaded input file, selects a decoder by mime type, produces
//! an ordered list of sections, and serializes each section to a
//! generated file so downstream steps never re-decode the original
//! bytes. Image inputs without a registered OCR decoder are a
//! [`HandlerOutcome::Fatal`], per the design note in [`ContentDecoder`].
//!
//! [`ContentDecoder`]: kernel_memory_domain::repositories::ContentDecoder

use async_trait::async_trait;
use kernel_memory_domain::entities::{FileDescriptor, Pipeline};
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::handler::{Handler, HandlerContext, HandlerOutcome};
use kernel_memory_domain::repositories::content_decoder::Section;
use kernel_memory_domain::value_objects::MimeType;

pub const STEP_NAME: &str = "extract";

pub struct ExtractHandler;

impl ExtractHandler {
    /// Generated file name for one decoded section, stable across re-runs
    /// so a repeated extract overwrites rather than duplicates.
    pub fn section_file_name(source_file: &str, section_number: u32) -> String {
        format!("{source_file}.extract.{section_number:05}.json")
    }

    async fn run(&self, mut pipeline: Pipeline, ctx: &HandlerContext) -> Result<Pipeline, KernelMemoryError> {
        let inputs: Vec<FileDescriptor> =
            pipeline.files.iter().filter(|f| !f.is_generated()).cloned().collect();

        // A redelivered message re-decodes every input from scratch; drop
        // this step's prior descriptors first so they're replaced, not
        // duplicated alongside the fresh ones.
        pipeline.remove_generated_by(STEP_NAME);

        for file in inputs {
            let decoder = ctx.decoders.get(&file.mime_type);
            let Some(decoder) = decoder else {
                if file.mime_type.is_image() {
                    return Err(KernelMemoryError::fatal_validation(format!(
                        "no OCR decoder configured for image input '{}'",
                        file.name
                    )));
                }
                return Err(KernelMemoryError::fatal_validation(format!(
                    "unsupported mime type '{}' for file '{}'",
                    file.mime_type, file.name
                )));
            };

            let bytes = ctx.document_storage.read_file(&pipeline.index, &pipeline.document_id, &file.name).await?;
            let content = decoder.decode(&bytes).await?;

            for section in &content.sections {
                let encoded = serde_json::to_vec(section)?;
                let generated_name = Self::section_file_name(&file.name, section.section_number);
                let size = encoded.len() as u64;
                ctx.document_storage
                    .write_file(&pipeline.index, &pipeline.document_id, &generated_name, encoded)
                    .await?;
                pipeline.add_file(FileDescriptor::generated(
                    generated_name,
                    size,
                    MimeType::new("application/json"),
                    STEP_NAME,
                ));
            }

            if content.sections.is_empty() {
                pipeline.append_log(STEP_NAME, "success", format!("'{}' produced zero sections", file.name));
            }
        }

        Ok(pipeline)
    }
}

#[async_trait]
impl Handler for ExtractHandler {
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
