// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Kernel Memory Bootstrap
//!
//! Process-level concerns that exist before the orchestrator does:
//! configuration loading, structured logging initialization, graceful
//! shutdown coordination, and a `sysexits.h`-style exit code for `main()`
//! to return.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  main()                      │
//! │  1. KmConfig::load(path)                     │
//! │  2. init_tracing(&config.observability)       │
//! │  3. ShutdownCoordinator::new(grace_period)    │
//! │  4. build Orchestrator from config + adapters │
//! │  5. run; on SIGINT/SIGTERM, initiate_shutdown │
//! │  6. result_to_exit_code(result)                │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! This crate does not depend on `kernel-memory-domain` or
//! `kernel-memory-pipeline` — it is pure process scaffolding, reusable by
//! any binary that embeds the pipeline.

pub mod config;
pub mod exit_code;
pub mod logger;
pub mod shutdown;

pub use config::KmConfig;
pub use exit_code::ExitCode;
pub use shutdown::{CancellationToken, ShutdownCoordinator, DEFAULT_GRACE_PERIOD_SECS};

/// Initializes the global `tracing` subscriber at the configured level.
/// Idempotent-ish: a second call is harmless (returns an error this crate
/// discards) since tests may initialize it more than once within one
/// process.
pub fn init_tracing(observability: &config::ObservabilityConfig) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(observability.log_level.to_tracing_level())
        .with_target(true)
        .try_init();
}

/// Maps a top-level error to the process exit code `main()` should
/// return, logging it at `error` level first.
pub fn result_to_exit_code<T, E: std::error::Error>(result: Result<T, E>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::Success,
        Err(error) => {
            tracing::error!(target: "bootstrap", error = %error, "fatal error during run");
            ExitCode::from_error(&error)
        }
    }
}
