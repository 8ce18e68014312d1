// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential store operations.

use rusqlite::params;
use tether_core::{Credentials, TetherError, UserId};

use crate::database::Database;

/// Get the saved credentials for a user, if any.
pub async fn credentials(db: &Database, user: UserId) -> Result<Option<Credentials>, TetherError> {
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT api_id, api_hash FROM credentials WHERE user_id = ?1")?;
            let result = stmt.query_row(params![user.0], |row| {
                Ok(Credentials {
                    api_id: row.get(0)?,
                    api_hash: row.get(1)?,
                })
            });
            match result {
                Ok(creds) => Ok(Some(creds)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Save credentials for a user. Upsert: a second put fully replaces the prior pair.
pub async fn put_credentials(
    db: &Database,
    user: UserId,
    creds: &Credentials,
) -> Result<(), TetherError> {
    let creds = creds.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO credentials (user_id, api_id, api_hash)
                 VALUES (?1, ?2, ?3)",
                params![user.0, creds.api_id, creds.api_hash],
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
    async fn put_and_get_round_trips() {
        let (db, _dir) = setup_db().await;
        let creds = Credentials {
            api_id: 12345,
            api_hash: "abcdef0123456789".into(),
        };

        put_credentials(&db, UserId(1), &creds).await.unwrap();
        let loaded = credentials(&db, UserId(1)).await.unwrap();
        assert_eq!(loaded, Some(creds));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_absent_user_returns_none() {
        let (db, _dir) = setup_db().await;
        assert_eq!(credentials(&db, UserId(404)).await.unwrap(), None);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_put_fully_replaces_prior_pair() {
        let (db, _dir) = setup_db().await;
        let first = Credentials {
            api_id: 1,
            api_hash: "old-secret".into(),
        };
        let second = Credentials {
            api_id: 2,
            api_hash: "new-secret".into(),
        };

        put_credentials(&db, UserId(7), &first).await.unwrap();
        put_credentials(&db, UserId(7), &second).await.unwrap();

        let loaded = credentials(&db, UserId(7)).await.unwrap().unwrap();
        assert_eq!(loaded, second);
        assert_ne!(loaded.api_hash, "old-secret");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn users_are_independent() {
        let (db, _dir) = setup_db().await;
        let a = Credentials {
            api_id: 10,
            api_hash: "aaaa".into(),
        };
        let b = Credentials {
            api_id: 20,
            api_hash: "bbbb".into(),
        };

        put_credentials(&db, UserId(1), &a).await.unwrap();
        put_credentials(&db, UserId(2), &b).await.unwrap();

        assert_eq!(credentials(&db, UserId(1)).await.unwrap(), Some(a));
        assert_eq!(credentials(&db, UserId(2)).await.unwrap(), Some(b));

        db.close().await.unwrap();
    }
}
