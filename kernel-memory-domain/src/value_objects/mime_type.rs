// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Mime type wrapper used to key the content decoder registry.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MimeType(String);

impl MimeType {
    pub const TEXT_PLAIN: &'static str = "text/plain";
    pub const TEXT_MARKDOWN: &'static str = "text/markdown";
    pub const TEXT_HTML: &'static str = "text/html";
    pub const APPLICATION_PDF: &'static str = "application/pdf";
    pub const APPLICATION_MSWORD: &'static str = "application/msword";
    pub const APPLICATION_VND_WORD: &'static str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
    pub const APPLICATION_VND_EXCEL: &'static str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
    pub const APPLICATION_VND_POWERPOINT: &'static str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
    pub const IMAGE_PNG: &'static str = "image/png";
    pub const IMAGE_JPEG: &'static str = "image/jpeg";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_image(&self) -> bool {
        self.0.starts_with("image/")
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MimeType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
