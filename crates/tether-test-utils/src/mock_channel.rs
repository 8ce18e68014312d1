// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock conversation channel for deterministic testing.
//!
//! `MockChannel` implements `ConversationChannel` with injectable inbound
//! turns and captured outbound turns for assertion in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use tether_core::{
    AdapterType, ConversationChannel, HealthStatus, InboundTurn, OutboundTurn, PluginAdapter,
    TetherError,
};

/// A mock messaging channel for testing.
///
/// Provides two queues:
/// - **inbound**: turns injected via `inject()` are returned by `receive()`
/// - **sent**: turns passed to `send()` are captured and retrievable via
///   `sent_turns()`
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundTurn>>>,
    sent: Arc<Mutex<Vec<OutboundTurn>>>,
    notify: Arc<Notify>,
    closed: Arc<AtomicBool>,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Inject an inbound turn into the receive queue.
    pub async fn inject(&self, turn: InboundTurn) {
        self.inbound.lock().await.push_back(turn);
        self.notify.notify_one();
    }

    /// Close the inbound side: once the queue drains, `receive()` reports
    /// `TetherError::ChannelClosed`, like a real channel shutting down.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// All turns that were sent through `send()`.
    pub async fn sent_turns(&self) -> Vec<OutboundTurn> {
        self.sent.lock().await.clone()
    }

    /// Count of sent turns.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear all captured outbound turns.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, TetherError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TetherError> {
        Ok(())
    }
}

#[async_trait]
impl ConversationChannel for MockChannel {
    async fn connect(&mut self) -> Result<(), TetherError> {
        Ok(())
    }

    async fn send(&self, turn: OutboundTurn) -> Result<(), TetherError> {
        self.sent.lock().await.push(turn);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundTurn, TetherError> {
        loop {
            if let Some(turn) = self.inbound.lock().await.pop_front() {
                return Ok(turn);
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(TetherError::ChannelClosed);
            }
            self.notify.notified().await;
        }
    }
}
