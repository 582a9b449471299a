// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Markdown decoder: strips formatting with `pulldown-cmark` and splits
//! into one section per top-level heading, since a heading is the closest
//! thing Markdown has to a guaranteed paragraph boundary.

use async_trait::async_trait;
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::repositories::content_decoder::{ContentDecoder, FileContent, Section};
use kernel_memory_domain::value_objects::MimeType;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

pub struct MarkdownDecoder;

impl MarkdownDecoder {
    pub fn new() -> Self {
        Self
    }

    fn sections_from(markdown: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut buffer = String::new();

        for event in Parser::new(markdown) {
            match event {
                Event::Start(Tag::Heading { .. }) if !buffer.trim().is_empty() => {
                    sections.push(std::mem::take(&mut buffer));
                }
                Event::Text(text) | Event::Code(text) => {
                    buffer.push_str(&text);
                    buffer.push(' ');
                }
                Event::End(TagEnd::Paragraph) | Event::End(TagEnd::Heading(_)) | Event::SoftBreak | Event::HardBreak => {
                    buffer.push('\n');
                }
                _ => {}
            }
        }
        if !buffer.trim().is_empty() {
            sections.push(buffer);
        }
        sections
    }
}

impl Default for MarkdownDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentDecoder for MarkdownDecoder {
    fn mime_types(&self) -> &[&str] {
        &[MimeType::TEXT_MARKDOWN]
    }

    async fn decode(&self, bytes: &[u8]) -> Result<FileContent, KernelMemoryError> {
        let markdown = String::from_utf8_lossy(bytes).to_string();
        let sections = Self::sections_from(&markdown)
            .into_iter()
            .enumerate()
            .map(|(section_number, text)| Section {
                section_number: section_number as u32,
                text: text.trim().to_string(),
                sentences_are_complete: false,
            })
            .collect();
        Ok(FileContent { sections })
    }
}
