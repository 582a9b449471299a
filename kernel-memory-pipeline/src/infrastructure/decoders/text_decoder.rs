// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Plain-text decoder: one section, the whole file treated as flowing text.

use async_trait::async_trait;
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::repositories::content_decoder::{ContentDecoder, FileContent, Section};
use kernel_memory_domain::value_objects::MimeType;

pub struct TextDecoder;

impl TextDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentDecoder for TextDecoder {
    fn mime_types(&self) -> &[&str] {
        &[MimeType::TEXT_PLAIN]
    }

    async fn decode(&self, bytes: &[u8]) -> Result<FileContent, KernelMemoryError> {
        let text = String::from_utf8_lossy(bytes).to_string();
        if text.trim().is_empty() {
            return Ok(FileContent::default());
        }
        Ok(FileContent { sections: vec![Section { section_number: 0, text, sentences_are_complete: false }] })
    }
}
