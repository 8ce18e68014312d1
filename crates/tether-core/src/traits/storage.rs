// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::TetherError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Credentials, UserId};

/// Adapter for storage and persistence backends.
///
/// Holds the durable per-user records: provider API credentials and the
/// ghost-mode flag. Upserts are last-write-wins; storage I/O failures always
/// propagate, never silently drop.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), TetherError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), TetherError>;

    /// Returns the saved credentials for a user, if any.
    async fn credentials(&self, user: UserId) -> Result<Option<Credentials>, TetherError>;

    /// Saves credentials for a user, replacing any prior pair.
    async fn put_credentials(
        &self,
        user: UserId,
        credentials: &Credentials,
    ) -> Result<(), TetherError>;

    /// Returns the ghost-mode flag for a user (false when never set).
    async fn ghost_mode(&self, user: UserId) -> Result<bool, TetherError>;

    /// Persists the ghost-mode flag for a user.
    async fn set_ghost_mode(&self, user: UserId, enabled: bool) -> Result<(), TetherError>;
}
