// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Delete Handlers
//!
//! `delete_document` and `delete_index` are not part of any normal import
//! pipeline step list — the orchestrator invokes them directly as
//! one-shot, synchronous operations (see `Orchestrator::delete_document`
//! and `Orchestrator::delete_index`) rather than enqueuing them, since
//! there is no partial-progress state worth persisting for a delete.
//! Both sides (Document Storage, Memory DB) are cleared; both must be
//! idempotent so a retried delete after a crash is harmless.

use futures::StreamExt;
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::repositories::{DocumentStorage, MemoryDb};
use kernel_memory_domain::value_objects::tag_map::{AndClause, TagFilter, TAG_DOCUMENT_ID};
use kernel_memory_domain::value_objects::IndexName;

/// Removes every Memory DB record and every Document Storage file for a
/// single document. The index itself, and any other document within it,
/// is untouched.
pub async fn delete_document(
    document_storage: &dyn DocumentStorage,
    memory_db: &dyn MemoryDb,
    index: &str,
    document_id: &str,
) -> Result<(), KernelMemoryError> {
    let normalized = IndexName::normalize(index)?;

    let filter = TagFilter(vec![AndClause(vec![(TAG_DOCUMENT_ID.to_string(), document_id.to_string())])]);
    let mut matches = memory_db.get_list(&normalized, filter, usize::MAX, false);
    let mut record_ids = Vec::new();
    while let Some(record) = matches.next().await {
        record_ids.push(record?.id);
    }
    for record_id in record_ids {
        memory_db.delete(&normalized, &record_id).await?;
    }

    document_storage.delete_document(index, document_id).await
}

/// Removes an entire index: every record in the Memory DB collection and
/// every file under every document in Document Storage.
pub async fn delete_index(
    document_storage: &dyn DocumentStorage,
    memory_db: &dyn MemoryDb,
    index: &str,
) -> Result<(), KernelMemoryError> {
    let normalized = IndexName::normalize(index)?;
    memory_db.delete_index(&normalized).await?;
    document_storage.delete_index(index).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_db::in_memory_memory_db::InMemoryMemoryDb;
    use crate::infrastructure::storage::fs_document_storage::FsDocumentStorage;
    use kernel_memory_domain::entities::Chunk;
    use kernel_memory_domain::entities::EmbeddingRecord;
    use kernel_memory_domain::value_objects::TagMap;

    #[tokio::test]
    async fn delete_document_removes_records_and_files_but_not_sibling_documents() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsDocumentStorage::new(dir.path().to_path_buf());
        let db = InMemoryMemoryDb::new();

        storage.create_index("idx").await.unwrap();
        storage.create_document("idx", "doc-1").await.unwrap();
        storage.create_document("idx", "doc-2").await.unwrap();
        storage.write_file("idx", "doc-1", "input.txt", b"hello".to_vec()).await.unwrap();
        storage.write_file("idx", "doc-2", "input.txt", b"world".to_vec()).await.unwrap();

        let index = IndexName::normalize("idx").unwrap();
        let chunk1 = Chunk::new("idx", "doc-1", "input.txt", 0, 0, "hello", 1, true, TagMap::new());
        let chunk2 = Chunk::new("idx", "doc-2", "input.txt", 0, 0, "world", 1, true, TagMap::new());
        db.create_index(&index, 2).await.unwrap();
        db.upsert(&index, EmbeddingRecord::new(&chunk1, vec![0.1, 0.2])).await.unwrap();
        db.upsert(&index, EmbeddingRecord::new(&chunk2, vec![0.3, 0.4])).await.unwrap();

        delete_document(&storage, &db, "idx", "doc-1").await.unwrap();

        assert!(storage.read_file("idx", "doc-1", "input.txt").await.is_err());
        assert!(storage.read_file("idx", "doc-2", "input.txt").await.is_ok());

        let mut remaining = db.get_list(&index, TagFilter::default(), usize::MAX, false);
        let mut count = 0;
        while remaining.next().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn delete_document_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsDocumentStorage::new(dir.path().to_path_buf());
        let db = InMemoryMemoryDb::new();
        storage.create_index("idx").await.unwrap();
        storage.create_document("idx", "doc-1").await.unwrap();

        delete_document(&storage, &db, "idx", "doc-1").await.unwrap();
        delete_document(&storage, &db, "idx", "doc-1").await.unwrap();
    }

    #[tokio::test]
    async fn delete_index_clears_both_sides() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsDocumentStorage::new(dir.path().to_path_buf());
        let db = InMemoryMemoryDb::new();
        storage.create_index("idx").await.unwrap();
        storage.create_document("idx", "doc-1").await.unwrap();
        storage.write_file("idx", "doc-1", "input.txt", b"hello".to_vec()).await.unwrap();

        let index = IndexName::normalize("idx").unwrap();
        db.create_index(&index, 2).await.unwrap();

        delete_index(&storage, &db, "idx").await.unwrap();

        assert!(storage.read_file("idx", "doc-1", "input.txt").await.is_err());
        assert!(db.list_indexes().await.unwrap().is_empty());
    }
}
