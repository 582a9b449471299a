// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Index name normalization.
//!
//! An index is a namespace of documents, files, and vector records. Names
//! are normalized before touching Document Storage or the Memory DB so that
//! `My_Index` and `my-index` always refer to the same namespace.

use crate::error::KernelMemoryError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a normalized index name.
pub const MAX_INDEX_NAME_LEN: usize = 64;

/// Names that collide with reserved storage paths; normalized to `default`.
const RESERVED_NAMES: &[&str] = &["default", "admin", "system", "__pipeline_status"];

/// A normalized index name: lowercase, `_` folded to `-`, `[a-z0-9-]` only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexName(String);

impl IndexName {
    /// Normalizes a raw name and validates its length.
    ///
    /// Lowercases, folds `_` to `-`, strips any character outside
    /// `[a-z0-9-]`, and replaces names colliding with [`RESERVED_NAMES`]
    /// with `default`. Over-length inputs (after normalization) are
    /// rejected rather than silently truncated.
    pub fn normalize(raw: &str) -> Result<Self, KernelMemoryError> {
        let lowered = raw.trim().to_lowercase().replace('_', "-");
        let filtered: String = lowered
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
            .collect();

        if filtered.is_empty() {
            return Err(KernelMemoryError::fatal_validation(format!(
                "index name '{raw}' normalizes to an empty string"
            )));
        }
        if filtered.len() > MAX_INDEX_NAME_LEN {
            return Err(KernelMemoryError::fatal_validation(format!(
                "index name '{raw}' exceeds {MAX_INDEX_NAME_LEN} characters after normalization"
            )));
        }

        let normalized = if RESERVED_NAMES.contains(&filtered.as_str()) {
            "default".to_string()
        } else {
            filtered
        };

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for IndexName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_underscore_and_uppercase() {
        let name = IndexName::normalize("My_Index").unwrap();
        assert_eq!(name.as_str(), "my-index");
    }

    #[test]
    fn strips_disallowed_characters() {
        let name = IndexName::normalize("My Index!@#").unwrap();
        assert_eq!(name.as_str(), "myindex");
    }

    #[test]
    fn reserved_name_maps_to_default() {
        let name = IndexName::normalize("Admin").unwrap();
        assert_eq!(name.as_str(), "default");
    }

    #[test]
    fn over_length_input_fails_validation() {
        let raw = "a".repeat(MAX_INDEX_NAME_LEN + 1);
        let err = IndexName::normalize(&raw).unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn empty_after_normalization_fails() {
        let err = IndexName::normalize("___").unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    proptest::proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[a-zA-Z0-9_ ]{1,40}") {
            if let Ok(once) = IndexName::normalize(&raw) {
                let twice = IndexName::normalize(once.as_str()).unwrap();
                proptest::prop_assert_eq!(once, twice);
            }
        }
    }
}
