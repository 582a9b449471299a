// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration
//!
//! Layered config loading via the `config` crate: a TOML file (or YAML/
//! JSON, detected by extension) provides the base, and `KM_*`-prefixed
//! environment variables override individual keys — e.g. `KM_QUEUE__BACKEND`
//! overrides `[queue] backend`.
//!
//! Every section maps to a concrete collaborator the orchestrator wires up
//! at startup: `[storage]` to a `DocumentStorage`, `[memory_db]` to a
//! `MemoryDb`, `[queue]` to a `Queue`, `[embeddings]` to an
//! `EmbeddingGenerator`. `[partition]` and `[pipeline]` configure the
//! built-in handlers rather than an external collaborator.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "KM";
const ENV_SEPARATOR: &str = "__";

/// Severity threshold for `tracing` output, mirrored from `[observability]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory document content and artifacts are written under.
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { root: PathBuf::from("./km-data") }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryDbConfig {
    /// Adapter identifier the bootstrap wiring resolves to a concrete
    /// `MemoryDb` (e.g. `"in_memory"`).
    pub backend: String,
    /// Embedding vector dimensionality the backend is configured for.
    pub vector_size: usize,
}

impl Default for MemoryDbConfig {
    fn default() -> Self {
        Self { backend: "in_memory".to_string(), vector_size: 1536 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Adapter identifier the bootstrap wiring resolves to a concrete
    /// `Queue` (e.g. `"in_memory"`).
    pub backend: String,
    /// How long a dequeued message stays invisible to other consumers
    /// before it is eligible for redelivery.
    pub visibility_timeout_secs: u64,
    /// Suffix appended to a queue name to form its poison queue.
    pub poison_suffix: String,
    /// Delivery attempts (including the first) before a message is
    /// routed to the poison queue instead of being redelivered.
    pub max_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: "in_memory".to_string(),
            visibility_timeout_secs: 30,
            poison_suffix: "-poison".to_string(),
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    pub max_tokens_per_paragraph: usize,
    pub max_tokens_per_line: usize,
    pub overlapping_tokens: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self { max_tokens_per_paragraph: 1000, max_tokens_per_line: 300, overlapping_tokens: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    /// Adapter identifier the bootstrap wiring resolves to a concrete
    /// `EmbeddingGenerator` (e.g. `"local"`).
    pub backend: String,
    pub max_tokens: usize,
    pub max_batch_size: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self { backend: "local".to_string(), max_tokens: 8191, max_batch_size: 16 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Step names run when `importDocument` is not given an explicit
    /// step list.
    pub default_steps: Vec<String>,
    /// Worker loops pulling concurrently from the queue.
    pub worker_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_steps: vec![
                "extract".to_string(),
                "partition".to_string(),
                "gen_embeddings".to_string(),
                "save_records".to_string(),
            ],
            worker_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: LogLevel,
    /// Grace period, in seconds, given to in-flight handlers on shutdown.
    pub shutdown_grace_period_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: LogLevel::Info, shutdown_grace_period_secs: 5 }
    }
}

/// Root configuration, assembled from a config file plus `KM_*` env
/// overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KmConfig {
    pub storage: StorageConfig,
    pub memory_db: MemoryDbConfig,
    pub queue: QueueConfig,
    pub partition: PartitionConfig,
    pub embeddings: EmbeddingsConfig,
    pub pipeline: PipelineConfig,
    pub observability: ObservabilityConfig,
}

impl KmConfig {
    /// Loads configuration from `path` (TOML/YAML/JSON inferred from the
    /// extension), layering `KM_*` environment variables over it. Missing
    /// file is not an error: every section falls back to its defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR).try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Configuration with every section at its default, ignoring any file
    /// or environment overrides. Used by the demo binary and by tests.
    pub fn defaults() -> Self {
        Self::default()
    }
}
