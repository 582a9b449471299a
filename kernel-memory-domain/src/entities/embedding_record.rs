// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Embedding records: chunk identity, dense vector, tags, and payload,
//! stored in the Memory DB.

use crate::entities::chunk::Chunk;
use crate::value_objects::{SchemaVersion, TagMap};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The record payload: text plus schema version plus optional descriptive
/// fields. `schema` is mandatory on write; missing on read is upgraded to
/// [`SchemaVersion::current`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecordPayload {
    pub text: String,
    pub schema: String,
    pub url: Option<String>,
    pub last_update: Option<String>,
    pub file_name: Option<String>,
}

/// Chunk identity + dense vector + tag set + payload.
///
/// `id` is content-addressed over `(document_id, source_file, chunk_ordinal)`
/// (I5): calling [`EmbeddingRecord::new`] twice for the same chunk position
/// always produces the same `id`, so re-running `SaveRecords` overwrites
/// rather than duplicating. `source_file` is part of the address because
/// `chunk_ordinal` resets to zero per source file within a multi-file
/// document — without it, two different files would collide on the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub tags: TagMap,
    pub payload: RecordPayload,
}

impl EmbeddingRecord {
    pub fn new(chunk: &Chunk, vector: Vec<f32>) -> Self {
        let payload = RecordPayload {
            text: chunk.text.clone(),
            schema: SchemaVersion::current().to_string(),
            url: None,
            last_update: None,
            file_name: Some(chunk.source_file.clone()),
        };
        let id = content_address(&chunk.document_id, &chunk.source_file, chunk.chunk_ordinal);
        Self { id, vector, tags: chunk.tags.clone(), payload }
    }

    /// Upgrades a record whose payload is missing (or carries a stale)
    /// schema version to the current default. Idempotent.
    pub fn upgrade_schema(&mut self) {
        if self.payload.schema.is_empty() {
            self.payload.schema = SchemaVersion::current().to_string();
        }
    }
}

/// Content address for a (document, source file, chunk-position) triple,
/// per invariant I5.
pub fn content_address(document_id: &str, source_file: &str, chunk_ordinal: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(b"/");
    hasher.update(source_file.as_bytes());
    hasher.update(b"/");
    hasher.update(chunk_ordinal.to_le_bytes());
    hex::encode(hasher.finalize())
}
