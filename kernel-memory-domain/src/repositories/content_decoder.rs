// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Content Decoder Interface
//!
//! Mime-typed text extraction from binary inputs. Concrete decoders for
//! every mime type named in the ingestion pipeline's scope (PDF, Word,
//! Excel, PowerPoint, image+OCR) are external collaborators; only the
//! interface, a registry, and the plain-text/Markdown decoders needed to
//! exercise the pipeline end-to-end live in this workspace.

use crate::error::KernelMemoryError;
use crate::value_objects::MimeType;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// One ordered section of decoded content.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub section_number: u32,
    pub text: String,
    /// True when the source format guarantees no cross-section sentence
    /// spill (slides, spreadsheet cells); false for flowing text.
    pub sentences_are_complete: bool,
}

/// Decoded content: ordered sections ready for partitioning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileContent {
    pub sections: Vec<Section>,
}

#[async_trait]
pub trait ContentDecoder: Send + Sync {
    /// Mime types this decoder handles.
    fn mime_types(&self) -> &[&str];

    async fn decode(&self, bytes: &[u8]) -> Result<FileContent, KernelMemoryError>;
}

/// Maps a mime type to its decoder.
#[derive(Default)]
pub struct ContentDecoderRegistry {
    decoders: HashMap<String, Arc<dyn ContentDecoder>>,
}

impl ContentDecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, decoder: Arc<dyn ContentDecoder>) {
        for mime in decoder.mime_types() {
            self.decoders.insert(mime.to_string(), decoder.clone());
        }
    }

    pub fn get(&self, mime_type: &MimeType) -> Option<Arc<dyn ContentDecoder>> {
        self.decoders.get(mime_type.as_str()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubDecoder;

    #[async_trait]
    impl ContentDecoder for StubDecoder {
        fn mime_types(&self) -> &[&str] {
            &["text/plain"]
        }

        async fn decode(&self, bytes: &[u8]) -> Result<FileContent, KernelMemoryError> {
            Ok(FileContent {
                sections: vec![Section {
                    section_number: 0,
                    text: String::from_utf8_lossy(bytes).to_string(),
                    sentences_are_complete: false,
                }],
            })
        }
    }

    #[test]
    fn registry_looks_up_by_mime_type() {
        let mut registry = ContentDecoderRegistry::new();
        registry.register(Arc::new(StubDecoder));
        assert!(registry.get(&MimeType::new("text/plain")).is_some());
        assert!(registry.get(&MimeType::new("application/pdf")).is_none());
    }
}
