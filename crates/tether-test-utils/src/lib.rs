// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tether: scripted mocks for the identity provider,
//! the conversation channel, and durable storage.

pub mod mock_channel;
pub mod mock_provider;
pub mod mock_storage;

pub use mock_channel::MockChannel;
pub use mock_provider::{mock_account, MockConnection, MockProvider, ProviderScript, Step};
pub use mock_storage::MemoryStorage;
