// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Placeholder identity provider for builds without a provider backend.
//!
//! The provider wire protocol is not part of this crate; a real backend is
//! linked in the way channel adapters are, behind a feature flag. This
//! implementation still owns the on-disk session artifacts so `drop_session`
//! and logout cleanup behave identically with or without a backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use tether_core::{Credentials, IdentityProvider, ProviderConnection, ProviderError, UserId};

/// Identity provider stub that owns session artifacts but cannot connect.
pub struct UnconfiguredProvider {
    session_dir: PathBuf,
}

impl UnconfiguredProvider {
    pub fn new(session_dir: impl Into<PathBuf>) -> Self {
        Self {
            session_dir: session_dir.into(),
        }
    }

    fn artifact_path(&self, user: UserId) -> PathBuf {
        self.session_dir.join(format!("{user}.session"))
    }
}

async fn remove_if_present(path: &Path) -> Result<(), ProviderError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "removed session artifact");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProviderError::Other(format!(
            "failed to remove session artifact {}: {e}",
            path.display()
        ))),
    }
}

#[async_trait]
impl IdentityProvider for UnconfiguredProvider {
    async fn connect(
        &self,
        _user: UserId,
        _credentials: &Credentials,
        _phone: &str,
    ) -> Result<Box<dyn ProviderConnection>, ProviderError> {
        Err(ProviderError::Other(
            "no identity provider backend is compiled into this build".into(),
        ))
    }

    async fn drop_session(&self, user: UserId) -> Result<(), ProviderError> {
        let artifact = self.artifact_path(user);
        remove_if_present(&artifact).await?;
        // Providers keep a rollback journal next to the artifact.
        remove_if_present(&artifact.with_extension("session-journal")).await
    }
}
