// /////////////////////////////////////////////////////////////////////////////
// Kernel Memory
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Queue
//!
//! A single-process FIFO with visibility-timeout redelivery, for tests and
//! single-node deployments. A networked deployment swaps this for an SQS-
//! or RabbitMQ-backed adapter without touching the orchestrator.

use async_trait::async_trait;
use kernel_memory_domain::error::KernelMemoryError;
use kernel_memory_domain::repositories::{Delivery, Queue, QueueMessage};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct InFlightEntry {
    message: QueueMessage,
    deadline: Instant,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueueMessage>,
    in_flight: HashMap<String, InFlightEntry>,
    attempts: HashMap<String, u32>,
    poisoned: Vec<(QueueMessage, String)>,
}

pub struct InMemoryQueue {
    visibility_timeout: Duration,
    state: Mutex<QueueState>,
}

fn message_key(message: &QueueMessage) -> String {
    format!("{}/{}/{}", message.index, message.document_id, message.execution_id)
}

impl InMemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self { visibility_timeout, state: Mutex::new(QueueState::default()) }
    }

    /// Sweeps any in-flight delivery whose visibility lease expired back
    /// onto the pending queue. Called at the top of every `dequeue`.
    fn reclaim_expired(state: &mut QueueState) {
        let now = Instant::now();
        let expired: Vec<String> =
            state.in_flight.iter().filter(|(_, entry)| entry.deadline <= now).map(|(key, _)| key.clone()).collect();
        for key in expired {
            if let Some(entry) = state.in_flight.remove(&key) {
                state.pending.push_back(entry.message);
            }
        }
    }

    /// Diagnostic accessor for tests: number of messages routed to poison.
    pub fn poisoned_count(&self) -> usize {
        self.state.lock().expect("queue state poisoned").poisoned.len()
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    async fn connect(&self, _name: &str) -> Result<(), KernelMemoryError> {
        Ok(())
    }

    async fn enqueue(&self, message: QueueMessage) -> Result<(), KernelMemoryError> {
        let mut state = self.state.lock().expect("queue state poisoned");
        state.pending.push_back(message);
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<Delivery>, KernelMemoryError> {
        let mut state = self.state.lock().expect("queue state poisoned");
        Self::reclaim_expired(&mut state);

        let Some(message) = state.pending.pop_front() else {
            return Ok(None);
        };
        let key = message_key(&message);
        let attempt = {
            let counter = state.attempts.entry(key.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        state.in_flight.insert(key.clone(), InFlightEntry { message: message.clone(), deadline: Instant::now() + self.visibility_timeout });

        Ok(Some(Delivery { message, attempt, handle: key }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), KernelMemoryError> {
        let mut state = self.state.lock().expect("queue state poisoned");
        state.in_flight.remove(&delivery.handle);
        state.attempts.remove(&delivery.handle);
        Ok(())
    }

    async fn requeue(&self, delivery: &Delivery) -> Result<(), KernelMemoryError> {
        let mut state = self.state.lock().expect("queue state poisoned");
        if let Some(entry) = state.in_flight.remove(&delivery.handle) {
            state.pending.push_front(entry.message);
        } else {
            state.pending.push_front(delivery.message.clone());
        }
        Ok(())
    }

    async fn poison(&self, delivery: &Delivery, last_error: &str) -> Result<(), KernelMemoryError> {
        let mut state = self.state.lock().expect("queue state poisoned");
        state.in_flight.remove(&delivery.handle);
        state.attempts.remove(&delivery.handle);
        state.poisoned.push((delivery.message.clone(), last_error.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> QueueMessage {
        QueueMessage { index: "idx".into(), document_id: "doc-1".into(), execution_id: "exec-1".into() }
    }

    #[tokio::test]
    async fn enqueue_then_dequeue_returns_the_message_with_attempt_one() {
        let queue = InMemoryQueue::new(Duration::from_secs(30));
        queue.enqueue(sample_message()).await.unwrap();
        let delivery = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(delivery.message, sample_message());
        assert_eq!(delivery.attempt, 1);
    }

    #[tokio::test]
    async fn dequeue_on_empty_queue_is_none() {
        let queue = InMemoryQueue::new(Duration::from_secs(30));
        assert!(queue.dequeue().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn acked_message_is_not_redelivered() {
        let queue = InMemoryQueue::new(Duration::from_secs(30));
        queue.enqueue(sample_message()).await.unwrap();
        let delivery = queue.dequeue().await.unwrap().unwrap();
        queue.ack(&delivery).await.unwrap();
        assert!(queue.dequeue().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn requeue_makes_the_message_immediately_available_with_incremented_attempt() {
        let queue = InMemoryQueue::new(Duration::from_secs(30));
        queue.enqueue(sample_message()).await.unwrap();
        let first = queue.dequeue().await.unwrap().unwrap();
        queue.requeue(&first).await.unwrap();

        let second = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(second.attempt, 2);
    }

    #[tokio::test]
    async fn expired_visibility_lease_redelivers() {
        let queue = InMemoryQueue::new(Duration::from_millis(10));
        queue.enqueue(sample_message()).await.unwrap();
        let _first = queue.dequeue().await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let second = queue.dequeue().await.unwrap();
        assert!(second.is_some());
    }

    #[tokio::test]
    async fn poison_removes_from_in_flight_and_records_diagnostic() {
        let queue = InMemoryQueue::new(Duration::from_secs(30));
        queue.enqueue(sample_message()).await.unwrap();
        let delivery = queue.dequeue().await.unwrap().unwrap();
        queue.poison(&delivery, "exceeded attempt cap").await.unwrap();
        assert_eq!(queue.poisoned_count(), 1);
        assert!(queue.dequeue().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn poison_after_ack_does_not_error() {
        let queue = InMemoryQueue::new(Duration::from_secs(30));
        queue.enqueue(sample_message()).await.unwrap();
        let delivery = queue.dequeue().await.unwrap().unwrap();
        queue.ack(&delivery).await.unwrap();
        queue.poison(&delivery, "fatal error").await.unwrap();
        assert_eq!(queue.poisoned_count(), 1);
    }
}
