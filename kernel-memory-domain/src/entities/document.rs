// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Document: a set of uploaded files, a tag map, and a status, scoped to
//! an index.

use crate::entities::file_descriptor::FileDescriptor;
use crate::value_objects::TagMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Created,
    Processing,
    Complete,
    Failed,
}

/// A document identified by `document_id` within an index.
///
/// Idempotent re-upload with the same id overwrites atomically from the
/// pipeline's perspective: handlers simply re-run against the refreshed
/// input files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub index: String,
    pub document_id: String,
    pub files: Vec<FileDescriptor>,
    pub tags: TagMap,
    pub status: DocumentStatus,
}

impl Document {
    pub fn new(index: impl Into<String>, document_id: impl Into<String>, files: Vec<FileDescriptor>, tags: TagMap) -> Self {
        Self { index: index.into(), document_id: document_id.into(), files, tags, status: DocumentStatus::Created }
    }
}
