// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Kernel Memory Domain
//!
//! Entities, value objects, error taxonomy, and the abstract contracts
//! (Document Storage, Memory DB, Queue, Embedding/Text Generators, Content
//! Decoders) the ingestion pipeline's orchestrator and handlers depend on.
//!
//! This crate has no opinion on *how* those contracts are fulfilled — no
//! filesystem access, no network client, no async runtime beyond the
//! `async-trait` annotations the contracts themselves require. Concrete
//! adapters live in `kernel-memory-pipeline`.

pub mod entities;
pub mod error;
pub mod handler;
pub mod repositories;
pub mod value_objects;

pub use error::KernelMemoryError;
pub use handler::{Handler, HandlerContext, HandlerOutcome, HandlerRegistry, ResourceHint};
