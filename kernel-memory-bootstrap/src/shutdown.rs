// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Graceful Shutdown
//!
//! `stopAllPipelines()` needs a way to signal every in-flight worker loop
//! to stop pulling new queue messages and to give currently-running
//! handler invocations a grace period to finish before the process exits.
//!
//! [`CancellationToken`] is the signal; [`ShutdownCoordinator`] owns the
//! grace period and the "has everything actually stopped" rendezvous.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// Default grace period granted to in-flight handler invocations before
/// a shutdown is considered complete regardless.
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

/// A cooperative cancellation signal, cheap to clone and share across
/// every worker loop pulling from the queue.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)), notify: Arc::new(Notify::new()) }
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel()` has been called. Resolves immediately if
    /// it already has been, so callers can `tokio::select!` this against
    /// `queue.dequeue(...)` without a lost-wakeup race.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
            if self.is_cancelled() {
                return;
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Coordinates a grace-period shutdown across however many worker loops
/// the orchestrator has spawned.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    grace_period: Duration,
    shutdown_initiated: Arc<AtomicBool>,
    shutdown_complete: Arc<Notify>,
}

impl ShutdownCoordinator {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace_period,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            shutdown_complete: Arc::new(Notify::new()),
        }
    }

    /// A clone of the token to hand to every worker loop.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Signals every worker loop to stop accepting new work.
    pub fn initiate_shutdown(&self) {
        self.shutdown_initiated.store(true, Ordering::SeqCst);
        self.token.cancel();
    }

    /// Resolves once `initiate_shutdown()` has been called.
    pub async fn wait_for_shutdown(&self) {
        self.token.cancelled().await;
    }

    /// Called by whoever owns the last worker loop once it has actually
    /// exited, waking anyone parked in `wait_with_timeout`.
    pub fn complete_shutdown(&self) {
        self.shutdown_complete.notify_waiters();
    }

    /// Waits for `complete_shutdown()`, bounded by the configured grace
    /// period, so a wedged handler can't hang the process forever.
    pub async fn wait_with_timeout(&self) -> bool {
        self.wait_with_timeout_duration(self.grace_period).await
    }

    async fn wait_with_timeout_duration(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.shutdown_complete.notified()).await.is_ok()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancellation_token_create() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_token_cancel() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_token_clone_shares_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_token_cancelled_returns_immediately_if_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(50), token.cancelled())
            .await
            .expect("cancelled() should resolve immediately");
    }

    #[tokio::test]
    async fn cancellation_token_cancelled_waits_for_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("waiter should resolve after cancel")
            .expect("task should not panic");
    }

    #[tokio::test]
    async fn shutdown_coordinator_create() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        assert!(!coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn shutdown_coordinator_default() {
        let coordinator = ShutdownCoordinator::default();
        assert!(!coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn shutdown_coordinator_initiate() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        coordinator.initiate_shutdown();
        assert!(coordinator.is_shutting_down());
        assert!(coordinator.token().is_cancelled());
    }

    #[tokio::test]
    async fn shutdown_coordinator_token_reflects_state() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        let token = coordinator.token();
        assert!(!token.is_cancelled());
        coordinator.initiate_shutdown();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn shutdown_coordinator_complete_wakes_waiter() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        coordinator.complete_shutdown();
        let completed = coordinator.wait_with_timeout().await;
        assert!(completed);
    }

    #[tokio::test]
    async fn shutdown_coordinator_timeout_elapses_without_complete() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(20));
        let completed = coordinator.wait_with_timeout().await;
        assert!(!completed);
    }

    #[tokio::test]
    async fn shutdown_coordinator_wait_custom_timeout() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let completed = coordinator.wait_with_timeout_duration(Duration::from_millis(10)).await;
        assert!(!completed);
    }

    #[tokio::test]
    async fn shutdown_coordinator_wait_for_shutdown_resolves_after_initiate() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        coordinator.initiate_shutdown();
        tokio::time::timeout(Duration::from_millis(50), coordinator.wait_for_shutdown())
            .await
            .expect("wait_for_shutdown should resolve once initiated");
    }
}
