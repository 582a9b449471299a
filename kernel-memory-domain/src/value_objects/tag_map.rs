// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Tag maps and the disjunctive-normal-form filter the Memory DB evaluates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved tag keys the Partition handler attaches to every chunk.
pub const TAG_DOCUMENT_ID: &str = "__document_id";
pub const TAG_FILE_ID: &str = "__file_id";
pub const TAG_FILE_PART: &str = "__file_part";

/// A key mapped to an ordered list of string values. One key may repeat
/// across logical tags, so the value list preserves insertion order rather
/// than deduplicating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMap(HashMap<String, Vec<String>>);

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under `key`, preserving any values already present.
    /// Used for handler-added tags, which must be append-only (I4).
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Merges `other` into `self`, appending rather than overwriting.
    pub fn merge_append(&mut self, other: &TagMap) {
        for (key, values) in &other.0 {
            self.0.entry(key.clone()).or_default().extend(values.iter().cloned());
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(|v| v.as_slice())
    }

    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.0.get(key).is_some_and(|values| values.iter().any(|v| v == value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

/// One AND-clause of the Memory DB's filter language: every `(key, value)`
/// equality must hold simultaneously.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndClause(pub Vec<(String, String)>);

/// A disjunction of [`AndClause`]s: a record matches the filter if it
/// satisfies at least one clause. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter(pub Vec<AndClause>);

impl TagFilter {
    pub fn matches(&self, tags: &TagMap) -> bool {
        if self.0.is_empty() {
            return true;
        }
        self.0.iter().any(|clause| clause.0.iter().all(|(key, value)| tags.contains(key, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_existing_values() {
        let mut tags = TagMap::new();
        tags.append("type", "news");
        tags.append("type", "email");
        assert_eq!(tags.get("type"), Some(&["news".to_string(), "email".to_string()][..]));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = TagFilter::default();
        assert!(filter.matches(&TagMap::new()));
    }

    #[test]
    fn dnf_filter_matches_either_clause() {
        let mut news_2024 = TagMap::new();
        news_2024.append("type", "news");
        news_2024.append("year", "2024");

        let mut email = TagMap::new();
        email.append("type", "email");

        let mut news_2023 = TagMap::new();
        news_2023.append("type", "news");
        news_2023.append("year", "2023");

        let filter = TagFilter(vec![
            AndClause(vec![("type".into(), "news".into()), ("year".into(), "2024".into())]),
            AndClause(vec![("type".into(), "email".into())]),
        ]);

        assert!(filter.matches(&news_2024));
        assert!(filter.matches(&email));
        assert!(!filter.matches(&news_2023));
    }
}
