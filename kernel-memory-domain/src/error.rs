// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! Errors raised anywhere in the ingestion pipeline are represented as a
//! single [`KernelMemoryError`], categorized along the taxonomy the
//! orchestrator's dispatch algorithm depends on: transient failures are
//! retried, fatal failures are not, `NotFound` is a legitimate first-run
//! signal rather than a failure, and `Poison` carries the diagnostic
//! information a dead-letter message needs.
//!
//! Handlers never propagate raw errors across the `invoke` boundary; they
//! map them to a [`HandlerOutcome`](crate::handler::HandlerOutcome) using
//! [`KernelMemoryError::to_outcome`], keeping the retry policy local to the
//! orchestrator instead of scattered through exception handling.

use thiserror::Error;

/// Domain-wide error type for the ingestion pipeline.
#[derive(Error, Debug, Clone)]
pub enum KernelMemoryError {
    /// Network, timeout, queue-unavailable, or store 429/5xx. Retryable.
    #[error("transient error: {message}")]
    Transient { message: String, cause: Option<String> },

    /// Missing credentials, misconfigured model, invalid handler registration.
    #[error("configuration error: {0}")]
    FatalConfiguration(String),

    /// Unsupported mime type, oversized input, invalid index/document id.
    #[error("validation error: {0}")]
    FatalValidation(String),

    /// Distinguishes absent prior state from a genuine storage failure.
    #[error("not found: {0}")]
    NotFound(String),

    /// Attempt cap exceeded; message is bound for the dead-letter queue.
    #[error("poison after {attempts} attempts: {last_error}")]
    Poison { attempts: u32, last_error: String },

    /// Unclassified internal failure (serialization bugs, invariant violations).
    #[error("internal error: {0}")]
    Internal(String),
}

impl KernelMemoryError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient { message: message.into(), cause: None }
    }

    pub fn transient_with_cause(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Transient { message: message.into(), cause: Some(cause.into()) }
    }

    pub fn fatal_configuration(message: impl Into<String>) -> Self {
        Self::FatalConfiguration(message.into())
    }

    pub fn fatal_validation(message: impl Into<String>) -> Self {
        Self::FatalValidation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether retrying the operation that produced this error is worthwhile.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, KernelMemoryError::Transient { .. })
    }

    /// Whether this error represents the legitimate absence of prior state.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KernelMemoryError::NotFound(_))
    }

    /// Error category used for structured logging and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            KernelMemoryError::Transient { .. } => "transient",
            KernelMemoryError::FatalConfiguration(_) => "configuration",
            KernelMemoryError::FatalValidation(_) => "validation",
            KernelMemoryError::NotFound(_) => "not_found",
            KernelMemoryError::Poison { .. } => "poison",
            KernelMemoryError::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for KernelMemoryError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            KernelMemoryError::NotFound(err.to_string())
        } else {
            KernelMemoryError::transient_with_cause("io failure", err.to_string())
        }
    }
}

impl From<serde_json::Error> for KernelMemoryError {
    fn from(err: serde_json::Error) -> Self {
        KernelMemoryError::Internal(err.to_string())
    }
}

// NOTE: TOML/YAML conversions deliberately live in the infrastructure layer,
// not here — serialization format choice is an infrastructure concern, the
// domain only needs JSON for the persisted pipeline document.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_recoverable() {
        let err = KernelMemoryError::transient("store unavailable");
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "transient");
    }

    #[test]
    fn fatal_validation_is_not_recoverable() {
        let err = KernelMemoryError::fatal_validation("unsupported mime type");
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn not_found_is_not_a_failure_by_itself() {
        let err = KernelMemoryError::not_found("pipeline status missing");
        assert!(err.is_not_found());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn io_not_found_maps_to_not_found_variant() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: KernelMemoryError = io_err.into();
        assert!(err.is_not_found());
    }

    #[test]
    fn io_other_maps_to_transient() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: KernelMemoryError = io_err.into();
        assert!(err.is_recoverable());
    }
}
