// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Tether.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Tether workspace: the identity provider
//! capability surface, the conversation channel abstraction, and the durable
//! storage contract. All adapter plugins implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ProviderError, TetherError};
pub use types::{
    menu, AccountInfo, AdapterType, CodeSent, Credentials, DeliveryChannel, HealthStatus,
    InboundTurn, Keyboard, OutboundTurn, SignIn, TurnContent, UserId,
};

// Re-export all adapter traits at crate root.
pub use traits::{ConversationChannel, IdentityProvider, PluginAdapter, ProviderConnection, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tether_error_has_all_variants() {
        let _config = TetherError::Config("test".into());
        let _storage = TetherError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _channel = TetherError::Channel {
            message: "test".into(),
            source: None,
        };
        let _provider = TetherError::Provider(ProviderError::InvalidCode);
        let _timeout = TetherError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = TetherError::Internal("test".into());
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // If any trait module is missing or fails to compile, this test
        // won't compile.
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_channel<T: ConversationChannel>() {}
        fn _assert_provider<T: IdentityProvider>() {}
        fn _assert_storage<T: StorageAdapter>() {}
    }
}
