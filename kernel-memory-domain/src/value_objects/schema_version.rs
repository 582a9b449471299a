// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Schema versioning for embedding record envelopes.
//!
//! A record missing a `schema` field is upgraded in memory to
//! [`SchemaVersion::CURRENT`] on read; writers always stamp the current
//! version. The upgrade is idempotent: upgrading an already-current record
//! is a no-op.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion(String);

impl SchemaVersion {
    pub const CURRENT: &'static str = "1.0";

    pub fn current() -> Self {
        Self(Self::CURRENT.to_string())
    }

    pub fn from_raw(raw: Option<String>) -> Self {
        match raw {
            Some(v) if !v.is_empty() => Self(v),
            _ => Self::current(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_current(&self) -> bool {
        self.0 == Self::CURRENT
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
