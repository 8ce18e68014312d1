// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ghost-mode flag operations.
//!
//! The flag is persisted and rendered in the ghost menu; nothing else reads
//! it yet. Absent rows read as disabled.

use rusqlite::params;
use tether_core::{TetherError, UserId};

use crate::database::Database;

/// Whether ghost mode is enabled for a user. Defaults to false.
pub async fn ghost_mode(db: &Database, user: UserId) -> Result<bool, TetherError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare("SELECT enabled FROM ghost_mode WHERE user_id = ?1")?;
            let result = stmt.query_row(params![user.0], |row| row.get::<_, i64>(0));
            match result {
                Ok(enabled) => Ok(enabled != 0),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist the ghost-mode flag for a user.
pub async fn set_ghost_mode(db: &Database, user: UserId, enabled: bool) -> Result<(), TetherError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO ghost_mode (user_id, enabled) VALUES (?1, ?2)",
                params![user.0, enabled as i64],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn defaults_to_disabled() {
        let (db, _dir) = setup_db().await;
        assert!(!ghost_mode(&db, UserId(1)).await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn toggle_round_trips() {
        let (db, _dir) = setup_db().await;

        set_ghost_mode(&db, UserId(1), true).await.unwrap();
        assert!(ghost_mode(&db, UserId(1)).await.unwrap());

        set_ghost_mode(&db, UserId(1), false).await.unwrap();
        assert!(!ghost_mode(&db, UserId(1)).await.unwrap());

        db.close().await.unwrap();
    }
}
