// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Document Storage Interface
//!
//! Durable blob store keyed by `(index, documentId, filename)`. Document
//! Storage exclusively owns file bytes, including the reserved
//! `__pipeline_status.json` key the orchestrator persists pipeline state
//! under.
//!
//! Implementations must be strongly consistent per key (read-after-write on
//! the same key); cross-key consistency is not required. Missing keys raise
//! [`KernelMemoryError::NotFound`], which the orchestrator uses to
//! distinguish a first upload from a retry.

use crate::entities::file_descriptor::FileDescriptor;
use crate::entities::pipeline::Pipeline;
use crate::error::KernelMemoryError;
use async_trait::async_trait;

#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Creates the index namespace if it does not already exist.
    async fn create_index(&self, index: &str) -> Result<(), KernelMemoryError>;

    /// Creates the document namespace within `index` if it does not exist.
    async fn create_document(&self, index: &str, document_id: &str) -> Result<(), KernelMemoryError>;

    /// Writes `bytes` under `index/document_id/filename`, overwriting any
    /// prior content (handlers rely on this for delete-then-write
    /// idempotency).
    async fn write_file(&self, index: &str, document_id: &str, filename: &str, bytes: Vec<u8>) -> Result<(), KernelMemoryError>;

    /// Reads the bytes at `index/document_id/filename`.
    ///
    /// Returns [`KernelMemoryError::NotFound`] if the key does not exist.
    async fn read_file(&self, index: &str, document_id: &str, filename: &str) -> Result<Vec<u8>, KernelMemoryError>;

    /// Deletes every file under `index/document_id`, including generated
    /// files and the pipeline status. Idempotent.
    async fn delete_document(&self, index: &str, document_id: &str) -> Result<(), KernelMemoryError>;

    /// Deletes the entire index namespace. Idempotent.
    async fn delete_index(&self, index: &str) -> Result<(), KernelMemoryError>;

    /// Lists files generated by handlers (as opposed to originally
    /// uploaded), across the document.
    async fn list_generated_files(&self, index: &str, document_id: &str) -> Result<Vec<FileDescriptor>, KernelMemoryError>;

    /// Reads the reserved pipeline status document.
    ///
    /// Returns `Ok(None)` (not an error) when no pipeline has ever been
    /// persisted for `(index, document_id)` — legitimate on first upload.
    async fn read_pipeline_status(&self, index: &str, document_id: &str) -> Result<Option<Pipeline>, KernelMemoryError>;

    /// Persists the pipeline status document, overwriting any prior value.
    async fn write_pipeline_status(&self, index: &str, document_id: &str, pipeline: &Pipeline) -> Result<(), KernelMemoryError>;
}
