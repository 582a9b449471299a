// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Kernel Memory Pipeline
//!
//! The ingestion pipeline's orchestrator, built-in step handlers, and the
//! reference infrastructure adapters needed to run it end-to-end without
//! any external service.
//!
//! ```text
//! import_document / run_pipeline
//!          │
//!          ▼
//!   ┌─────────────┐      enqueue(next step)      ┌───────┐
//!   │ Orchestrator │ ───────────────────────────► │ Queue │
//!   └─────────────┘ ◄─────────────────────────────└───────┘
//!          │                    dequeue
//!          │ dispatch
//!          ▼
//!   ┌─────────────────────────────────────────────────┐
//!   │ extract → partition → gen_embeddings → save_records │
//!   │              (+ optional summarize)                 │
//!   └─────────────────────────────────────────────────┘
//!          │
//!          ▼
//!   Document Storage / Memory DB (via HandlerContext)
//! ```
//!
//! `application` holds the orchestrator and handlers; `infrastructure`
//! holds the in-process adapters (`FsDocumentStorage`, `InMemoryQueue`,
//! `InMemoryMemoryDb`, the text/Markdown decoders, and the local
//! embedding/text generators) that satisfy `kernel_memory_domain`'s
//! contracts for local development and tests.

pub mod application;
pub mod infrastructure;

pub use application::{Orchestrator, OrchestratorDeps, PartitionDefaults};
