// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline
//!
//! The persisted state machine driving a document through ordered handler
//! steps. A `Pipeline` is the orchestrator's unit of ownership: it is
//! persisted to Document Storage under the reserved `__pipeline_status.json`
//! key and round-tripped through every dispatch cycle.
//!
//! ## Invariants
//!
//! - **I1**: `steps == completed_steps ++ remaining_steps` at rest, and the
//!   two lists are disjoint. Enforced by [`Pipeline::validate`] and
//!   maintained by every mutator in this module — there is no code path
//!   that can move a step anywhere but from the front of `remaining_steps`
//!   to the back of `completed_steps`.
//! - **I2**: the orchestrator must persist state before enqueuing the next
//!   step; this module only prepares the state transition, it does not
//!   enforce ordering against the queue (that discipline lives in the
//!   orchestrator's dispatch routine).
//! - **I4**: tags added at upload are immutable; tags added by handlers are
//!   append-only. [`Pipeline::append_handler_tags`] never removes a value.

use crate::entities::file_descriptor::FileDescriptor;
use crate::value_objects::TagMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// A single append-only diagnostic entry, surfaced on the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub step: String,
    pub outcome: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// The reserved storage key a `Pipeline` is persisted under.
pub const PIPELINE_STATUS_KEY: &str = "__pipeline_status.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub index: String,
    pub document_id: String,
    pub execution_id: String,
    pub files: Vec<FileDescriptor>,
    pub tags: TagMap,
    pub steps: Vec<String>,
    pub remaining_steps: VecDeque<String>,
    pub completed_steps: Vec<String>,
    pub logs: Vec<LogEntry>,
    pub status: PipelineStatus,
    pub retries: HashMap<String, u32>,
    /// Schema version of this persisted document, for forward-compatible
    /// read-modify-write; unknown fields are preserved by the storage
    /// adapter rather than by this struct (serde structs do not round-trip
    /// unknown fields without a catch-all map, which the adapter supplies).
    pub schema: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pipeline {
    pub const SCHEMA_VERSION: &'static str = "1.0";

    /// Creates a new pipeline with a freshly generated execution id.
    pub fn new(
        index: impl Into<String>,
        document_id: impl Into<String>,
        files: Vec<FileDescriptor>,
        tags: TagMap,
        steps: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            index: index.into(),
            document_id: document_id.into(),
            execution_id: ulid::Ulid::new().to_string(),
            files,
            tags,
            remaining_steps: steps.iter().cloned().collect(),
            completed_steps: Vec::new(),
            steps,
            logs: Vec::new(),
            status: PipelineStatus::Pending,
            retries: HashMap::new(),
            schema: Self::SCHEMA_VERSION.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Invalidates the pipeline's current execution: any in-flight queue
    /// message for the prior `execution_id` will be dropped as stale by the
    /// dispatch algorithm's step 1.
    pub fn start_new_execution(&mut self) {
        self.execution_id = ulid::Ulid::new().to_string();
        self.updated_at = Utc::now();
    }

    /// Checks I1: `steps == completed_steps ++ remaining_steps`, disjoint.
    pub fn validate(&self) -> bool {
        if self.completed_steps.len() + self.remaining_steps.len() != self.steps.len() {
            return false;
        }
        let reconstructed: Vec<String> =
            self.completed_steps.iter().cloned().chain(self.remaining_steps.iter().cloned()).collect();
        reconstructed == self.steps
    }

    pub fn current_step(&self) -> Option<&str> {
        self.remaining_steps.front().map(String::as_str)
    }

    /// Moves `step` from the front of `remaining_steps` to the back of
    /// `completed_steps`. Returns `false` (a no-op) if `step` is not the
    /// current step, which the orchestrator treats as a stale dispatch.
    pub fn advance(&mut self, step: &str) -> bool {
        match self.remaining_steps.front() {
            Some(front) if front == step => {
                self.completed_steps.push(self.remaining_steps.pop_front().unwrap());
                self.updated_at = Utc::now();
                if self.remaining_steps.is_empty() {
                    self.status = PipelineStatus::Completed;
                } else {
                    self.status = PipelineStatus::InProgress;
                }
                true
            }
            _ => false,
        }
    }

    pub fn mark_completed(&mut self) {
        self.status = PipelineStatus::Completed;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, step: &str, message: impl Into<String>) {
        self.status = PipelineStatus::Failed;
        self.append_log(step, "failed", message);
        self.updated_at = Utc::now();
    }

    pub fn append_log(&mut self, step: impl Into<String>, outcome: impl Into<String>, message: impl Into<String>) {
        self.logs.push(LogEntry { step: step.into(), outcome: outcome.into(), message: message.into(), timestamp: Utc::now() });
    }

    /// Bumps and returns the retry count for `step` (monotonically
    /// increasing, per §3's `retries` field).
    pub fn increment_retry(&mut self, step: &str) -> u32 {
        let counter = self.retries.entry(step.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn retry_count(&self, step: &str) -> u32 {
        self.retries.get(step).copied().unwrap_or(0)
    }

    /// Handler-generated files become visible here; I3 requires storage
    /// writes to precede this call, which is the orchestrator's
    /// responsibility, not this struct's.
    pub fn add_file(&mut self, descriptor: FileDescriptor) {
        self.files.push(descriptor);
        self.updated_at = Utc::now();
    }

    /// Drops every descriptor previously generated by `step`. A handler
    /// that is about to regenerate all of its own output calls this first,
    /// so a redelivered message overwrites rather than duplicates.
    pub fn remove_generated_by(&mut self, step: &str) {
        self.files.retain(|f| f.generated_by.as_deref() != Some(step));
        self.updated_at = Utc::now();
    }

    /// Append-only tag merge for handler-added tags (I4). Never call this
    /// for upload-time tags; those are set once via [`Pipeline::new`].
    pub fn append_handler_tags(&mut self, tags: &TagMap) {
        self.tags.merge_append(tags);
        self.updated_at = Utc::now();
    }

    pub fn is_ready(&self) -> bool {
        self.status == PipelineStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_steps() -> Vec<String> {
        vec!["extract".into(), "partition".into(), "gen_embeddings".into(), "save_records".into()]
    }

    #[test]
    fn new_pipeline_satisfies_i1() {
        let pipeline = Pipeline::new("idx", "doc-1", vec![], TagMap::new(), sample_steps());
        assert!(pipeline.validate());
        assert_eq!(pipeline.status, PipelineStatus::Pending);
    }

    #[test]
    fn advance_moves_step_and_preserves_i1() {
        let mut pipeline = Pipeline::new("idx", "doc-1", vec![], TagMap::new(), sample_steps());
        assert!(pipeline.advance("extract"));
        assert_eq!(pipeline.completed_steps, vec!["extract".to_string()]);
        assert_eq!(pipeline.current_step(), Some("partition"));
        assert!(pipeline.validate());
        assert_eq!(pipeline.status, PipelineStatus::InProgress);
    }

    #[test]
    fn advance_on_wrong_step_is_a_no_op() {
        let mut pipeline = Pipeline::new("idx", "doc-1", vec![], TagMap::new(), sample_steps());
        assert!(!pipeline.advance("partition"));
        assert_eq!(pipeline.current_step(), Some("extract"));
    }

    #[test]
    fn advancing_through_all_steps_completes_pipeline() {
        let mut pipeline = Pipeline::new("idx", "doc-1", vec![], TagMap::new(), sample_steps());
        for step in sample_steps() {
            assert!(pipeline.advance(&step));
        }
        assert!(pipeline.current_step().is_none());
        assert_eq!(pipeline.status, PipelineStatus::Completed);
        assert!(pipeline.is_ready());
    }

    #[test]
    fn retries_are_monotonically_increasing() {
        let mut pipeline = Pipeline::new("idx", "doc-1", vec![], TagMap::new(), sample_steps());
        assert_eq!(pipeline.increment_retry("extract"), 1);
        assert_eq!(pipeline.increment_retry("extract"), 2);
        assert_eq!(pipeline.retry_count("extract"), 2);
        assert_eq!(pipeline.retry_count("partition"), 0);
    }

    #[test]
    fn handler_tags_are_appended_not_overwritten() {
        let mut tags = TagMap::new();
        tags.append("source", "upload");
        let mut pipeline = Pipeline::new("idx", "doc-1", vec![], tags, sample_steps());

        let mut handler_tags = TagMap::new();
        handler_tags.append("source", "extract");
        pipeline.append_handler_tags(&handler_tags);

        assert_eq!(pipeline.tags.get("source"), Some(&["upload".to_string(), "extract".to_string()][..]));
    }

    #[test]
    fn new_execution_changes_execution_id() {
        let mut pipeline = Pipeline::new("idx", "doc-1", vec![], TagMap::new(), sample_steps());
        let original = pipeline.execution_id.clone();
        pipeline.start_new_execution();
        assert_ne!(pipeline.execution_id, original);
    }

    proptest::proptest! {
        #[test]
        fn i1_holds_after_any_prefix_of_advances(n in 0usize..=4) {
            let mut pipeline = Pipeline::new("idx", "doc-1", vec![], TagMap::new(), sample_steps());
            let steps = sample_steps();
            for step in steps.iter().take(n) {
                pipeline.advance(step);
            }
            proptest::prop_assert!(pipeline.validate());
        }
    }
}
