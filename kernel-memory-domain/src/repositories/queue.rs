// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Queue Interface
//!
//! An at-least-once FIFO-ish message bus with per-message ack/nack,
//! dead-letter, and visibility timeout. FIFO per producer is not required;
//! per-document ordering is provided by the orchestrator (only the next
//! step's message is ever on the queue for a given document), not by this
//! contract.
//!
//! ## Pull vs. push
//!
//! The distilled contract describes registering an async callback
//! (`onDequeue(handler)`); this trait instead exposes a pull-based
//! `dequeue`/`ack`/`requeue`/`poison` surface, which is the idiomatic shape
//! for a Rust worker loop (the orchestrator's dispatch loop calls
//! `dequeue` itself rather than handing control to the queue via a
//! callback) and composes directly with `tokio::select!` for cancellation.
//! The two are observationally equivalent: a thin loop around `dequeue`
//! reproduces the callback semantics exactly.

use crate::error::KernelMemoryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Minimum payload carried on the wire: no pipeline content travels with
/// the message, only enough to look up authoritative state in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub index: String,
    pub document_id: String,
    pub execution_id: String,
}

/// A dequeued message plus the lease needed to ack/requeue/poison it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message: QueueMessage,
    pub attempt: u32,
    pub handle: String,
}

#[async_trait]
pub trait Queue: Send + Sync {
    /// Binds to a named queue, declaring its dead-letter sibling
    /// `<name><poison_suffix>`.
    async fn connect(&self, name: &str) -> Result<(), KernelMemoryError>;

    /// Durable publish; resolves after broker acknowledgement.
    async fn enqueue(&self, message: QueueMessage) -> Result<(), KernelMemoryError>;

    /// Dequeues the next available message, if any, under a visibility
    /// lease. Prefetch is always 1: a single in-flight delivery per call
    /// site, preserving per-worker serial semantics.
    async fn dequeue(&self) -> Result<Option<Delivery>, KernelMemoryError>;

    /// Acknowledges successful processing; the message will not be
    /// redelivered.
    async fn ack(&self, delivery: &Delivery) -> Result<(), KernelMemoryError>;

    /// Releases the visibility lease early so the message becomes eligible
    /// for redelivery immediately (used for `TransientError` outcomes).
    async fn requeue(&self, delivery: &Delivery) -> Result<(), KernelMemoryError>;

    /// Moves the message to the dead-letter queue with diagnostic headers.
    /// Used both when the attempt cap is exceeded and when `FatalError`
    /// outcomes require routing a copy to poison.
    async fn poison(&self, delivery: &Delivery, last_error: &str) -> Result<(), KernelMemoryError>;
}
