// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem Document Storage
//!
//! Lays documents out as `root/index/document_id/filename`, one file per
//! key. Good enough for a single-node deployment or local development; a
//! networked deployment swaps this for an object-store adapter without
//! touching the pipeline.

use async_trait::async_trait;
use kernel_memory_domain::entities::pipeline::{Pipeline, PIPELINE_STATUS_KEY};
use kernel_memory_domain::entities::file_descriptor::FileDescriptor;
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::repositories::DocumentStorage;
use kernel_memory_domain::value_objects::MimeType;
use std::path::PathBuf;

pub struct FsDocumentStorage {
    root: PathBuf,
}

impl FsDocumentStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn document_dir(&self, index: &str, document_id: &str) -> PathBuf {
        self.root.join(index).join(document_id)
    }

    fn file_path(&self, index: &str, document_id: &str, filename: &str) -> PathBuf {
        self.document_dir(index, document_id).join(filename)
    }

    /// Guesses a mime type from a generated file's suffix, since this
    /// adapter does not persist `FileDescriptor` metadata alongside bytes.
    fn guess_mime(name: &str) -> MimeType {
        if name.ends_with(".json") {
            MimeType::new("application/json")
        } else if name.ends_with(".md") {
            MimeType::new(MimeType::TEXT_MARKDOWN)
        } else {
            MimeType::new(MimeType::TEXT_PLAIN)
        }
    }

    fn guess_generated_by(name: &str) -> Option<String> {
        for (marker, step) in [
            (".extract.", "extract"),
            (".chunk.", "partition"),
            (".embedding.", "gen_embeddings"),
            (".summary.", "summarize"),
        ] {
            if name.contains(marker) {
                return Some(step.to_string());
            }
        }
        None
    }
}

#[async_trait]
impl DocumentStorage for FsDocumentStorage {
    async fn create_index(&self, index: &str) -> Result<(), KernelMemoryError> {
        tokio::fs::create_dir_all(self.root.join(index)).await?;
        Ok(())
    }

    async fn create_document(&self, index: &str, document_id: &str) -> Result<(), KernelMemoryError> {
        tokio::fs::create_dir_all(self.document_dir(index, document_id)).await?;
        Ok(())
    }

    async fn write_file(
        &self,
        index: &str,
        document_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(), KernelMemoryError> {
        let path = self.file_path(index, document_id, filename);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn read_file(&self, index: &str, document_id: &str, filename: &str) -> Result<Vec<u8>, KernelMemoryError> {
        let path = self.file_path(index, document_id, filename);
        tokio::fs::read(&path).await.map_err(KernelMemoryError::from)
    }

    async fn delete_document(&self, index: &str, document_id: &str) -> Result<(), KernelMemoryError> {
        match tokio::fs::remove_dir_all(self.document_dir(index, document_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_index(&self, index: &str) -> Result<(), KernelMemoryError> {
        match tokio::fs::remove_dir_all(self.root.join(index)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_generated_files(
        &self,
        index: &str,
        document_id: &str,
    ) -> Result<Vec<FileDescriptor>, KernelMemoryError> {
        let dir = self.document_dir(index, document_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name == PIPELINE_STATUS_KEY {
                continue;
            }
            let Some(generated_by) = Self::guess_generated_by(&name) else {
                continue;
            };
            let size = entry.metadata().await?.len();
            out.push(FileDescriptor::generated(name.clone(), size, Self::guess_mime(&name), generated_by));
        }
        Ok(out)
    }

    async fn read_pipeline_status(
        &self,
        index: &str,
        document_id: &str,
    ) -> Result<Option<Pipeline>, KernelMemoryError> {
        match self.read_file(index, document_id, PIPELINE_STATUS_KEY).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn write_pipeline_status(
        &self,
        index: &str,
        document_id: &str,
        pipeline: &Pipeline,
    ) -> Result<(), KernelMemoryError> {
        let encoded = serde_json::to_vec(pipeline)?;
        self.write_file(index, document_id, PIPELINE_STATUS_KEY, encoded).await
    }
}
