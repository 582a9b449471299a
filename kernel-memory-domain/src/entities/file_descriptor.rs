// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! File descriptors: the metadata Document Storage attaches to every file
//! persisted under `index/documentId/filename`.

use crate::value_objects::MimeType;
use serde::{Deserialize, Serialize};

/// Metadata for a file attached to a document.
///
/// Generated files (extracted text, chunk files, embedding records) are
/// persisted alongside the original and carry `generated_by` naming the
/// producing step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    pub mime_type: MimeType,
    pub generated_by: Option<String>,
}

impl FileDescriptor {
    pub fn uploaded(name: impl Into<String>, size: u64, mime_type: MimeType) -> Self {
        Self { name: name.into(), size, mime_type, generated_by: None }
    }

    pub fn generated(name: impl Into<String>, size: u64, mime_type: MimeType, step: impl Into<String>) -> Self {
        Self { name: name.into(), size, mime_type, generated_by: Some(step.into()) }
    }

    pub fn is_generated(&self) -> bool {
        self.generated_by.is_some()
    }
}
