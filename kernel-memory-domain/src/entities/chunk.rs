// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Chunks: the atomic unit of embedding and retrieval, produced by the
//! Partition handler from a single extracted section.

use crate::value_objects::{TagMap, TAG_DOCUMENT_ID, TAG_FILE_ID, TAG_FILE_PART};
use serde::{Deserialize, Serialize};

/// A contiguous text fragment bounded by the partitioner's token budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: String,
    pub document_id: String,
    pub source_file: String,
    pub section_number: u32,
    pub chunk_ordinal: u32,
    pub text: String,
    pub token_count: usize,
    /// True when the source format guarantees no cross-section sentence
    /// spill (e.g. slides, spreadsheets); false for flowing text (PDF).
    pub sentences_are_complete: bool,
    pub tags: TagMap,
}

impl Chunk {
    /// Builds a chunk and stamps the reserved tags the Partition handler
    /// must attach, in addition to whatever tags the document already owns.
    pub fn new(
        index: impl Into<String>,
        document_id: impl Into<String>,
        source_file: impl Into<String>,
        section_number: u32,
        chunk_ordinal: u32,
        text: impl Into<String>,
        token_count: usize,
        sentences_are_complete: bool,
        mut inherited_tags: TagMap,
    ) -> Self {
        let document_id = document_id.into();
        let source_file = source_file.into();
        inherited_tags.append(TAG_DOCUMENT_ID, document_id.clone());
        inherited_tags.append(TAG_FILE_ID, source_file.clone());
        inherited_tags.append(TAG_FILE_PART, chunk_ordinal.to_string());

        Self {
            index: index.into(),
            document_id,
            source_file,
            section_number,
            chunk_ordinal,
            text: text.into(),
            token_count,
            sentences_are_complete,
            tags: inherited_tags,
        }
    }

    /// Generated chunk file name, stable across re-runs for idempotent
    /// overwrite (delete-then-write per (document, step)).
    pub fn file_name(&self) -> String {
        format!("{}.chunk.{:05}.txt", self.source_file, self.chunk_ordinal)
    }
}
