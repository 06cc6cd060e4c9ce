//! SQLite-backed installation storage.
//!
//! One row per `(plugin_name, channel_id)`. Tokens are encrypted with the
//! process-wide [`TokenCipher`] before they are written and decrypted when
//! rows are read back, so API callers only ever see plaintext while the
//! rows themselves only ever hold ciphertext.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cipher::{CipherError, TokenCipher};
use crate::model::{Installation, InstallationUpdate};

/// Errors raised by the installation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The `(plugin_name, channel_id)` key is already taken.
    #[error("installation for plugin '{plugin}' in channel '{channel}' already exists")]
    AlreadyExists {
        /// Plugin tag.
        plugin: String,
        /// Workspace handle.
        channel: String,
    },

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Token encryption or decryption failure.
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS plugin_installations (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    plugin_name   TEXT NOT NULL,
    channel_id    TEXT NOT NULL,
    access_token  TEXT NOT NULL,
    refresh_token TEXT,
    metadata      TEXT,
    installed_at  TEXT NOT NULL,
    last_active   TEXT NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1,
    UNIQUE(plugin_name, channel_id)
);

CREATE INDEX IF NOT EXISTS idx_installations_plugin_name
    ON plugin_installations(plugin_name);

CREATE INDEX IF NOT EXISTS idx_installations_channel_id
    ON plugin_installations(channel_id);

CREATE INDEX IF NOT EXISTS idx_installations_active
    ON plugin_installations(is_active) WHERE is_active = 1;
";

const SELECT_COLUMNS: &str = "id, plugin_name, channel_id, access_token, refresh_token, \
                              metadata, installed_at, last_active, is_active";

/// Persistent map `(plugin_name, channel_id) → Installation` with
/// encrypted tokens.
pub struct InstallationStore {
    conn: Mutex<Connection>,
    cipher: TokenCipher,
}

/// Row image with tokens still encrypted.
struct RawRow {
    id: i64,
    plugin_name: String,
    channel_id: String,
    access_token: String,
    refresh_token: Option<String>,
    metadata: Option<String>,
    installed_at: String,
    last_active: String,
    is_active: bool,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            plugin_name: row.get(1)?,
            channel_id: row.get(2)?,
            access_token: row.get(3)?,
            refresh_token: row.get(4)?,
            metadata: row.get(5)?,
            installed_at: row.get(6)?,
            last_active: row.get(7)?,
            is_active: row.get(8)?,
        })
    }
}

impl InstallationStore {
    /// Opens (or creates) a store at `path`.
    pub fn open(path: &Path, cipher: TokenCipher) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;

        info!(path = %path.display(), "Installation store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            cipher,
        })
    }

    /// Opens an in-memory store. Intended for tests and local wiring.
    pub fn open_in_memory(cipher: TokenCipher) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            cipher,
        })
    }

    /// Creates a new installation.
    ///
    /// Tokens are encrypted before the row is written; the returned record
    /// carries the assigned id and the caller's plaintext tokens.
    pub async fn create(&self, installation: Installation) -> Result<Installation, StoreError> {
        let encrypted_access = self.cipher.encrypt(&installation.access_token)?;
        let encrypted_refresh = installation
            .refresh_token
            .as_deref()
            .map(|t| self.cipher.encrypt(t))
            .transpose()?;

        let now = Utc::now();
        let metadata_json = encode_metadata(&installation.metadata);

        let id = {
            let conn = self.conn.lock().expect("store mutex poisoned");
            let inserted = conn.execute(
                "INSERT INTO plugin_installations (
                     plugin_name, channel_id, access_token, refresh_token,
                     metadata, installed_at, last_active, is_active
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    installation.plugin_name,
                    installation.channel_id,
                    encrypted_access,
                    encrypted_refresh,
                    metadata_json,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                    installation.is_active,
                ],
            );

            match inserted {
                Ok(_) => conn.last_insert_rowid(),
                Err(e) if is_unique_violation(&e) => {
                    warn!(
                        plugin = %installation.plugin_name,
                        channel_id = %installation.channel_id,
                        "Installation already exists"
                    );
                    return Err(StoreError::AlreadyExists {
                        plugin: installation.plugin_name,
                        channel: installation.channel_id,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(
            plugin = %installation.plugin_name,
            channel_id = %installation.channel_id,
            id = id,
            "Installation created"
        );

        Ok(Installation {
            id: Some(id),
            installed_at: now,
            last_active: now,
            ..installation
        })
    }

    /// Looks up an installation by its composite key.
    pub async fn get(
        &self,
        plugin_name: &str,
        channel_id: &str,
    ) -> Result<Option<Installation>, StoreError> {
        let raw = {
            let conn = self.conn.lock().expect("store mutex poisoned");
            conn.query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM plugin_installations
                     WHERE plugin_name = ?1 AND channel_id = ?2"
                ),
                params![plugin_name, channel_id],
                RawRow::from_row,
            )
            .optional()?
        };

        raw.map(|r| self.decrypt_row(r)).transpose()
    }

    /// Looks up an installation by surrogate id.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Installation>, StoreError> {
        let raw = {
            let conn = self.conn.lock().expect("store mutex poisoned");
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM plugin_installations WHERE id = ?1"),
                params![id],
                RawRow::from_row,
            )
            .optional()?
        };

        raw.map(|r| self.decrypt_row(r)).transpose()
    }

    /// Applies a partial update; missing fields are preserved and
    /// `last_active` is always stamped.
    ///
    /// Returns the updated record, or `None` when the key does not exist.
    pub async fn update(
        &self,
        plugin_name: &str,
        channel_id: &str,
        update: InstallationUpdate,
    ) -> Result<Option<Installation>, StoreError> {
        let new_access = update
            .access_token
            .as_deref()
            .map(|t| self.cipher.encrypt(t))
            .transpose()?;
        let new_refresh = update
            .refresh_token
            .as_deref()
            .map(|t| self.cipher.encrypt(t))
            .transpose()?;
        let new_metadata = update.metadata.as_ref().map(|m| encode_metadata(m));
        let now = Utc::now();

        let raw = {
            let conn = self.conn.lock().expect("store mutex poisoned");

            let existing = conn
                .query_row(
                    &format!(
                        "SELECT {SELECT_COLUMNS} FROM plugin_installations
                         WHERE plugin_name = ?1 AND channel_id = ?2"
                    ),
                    params![plugin_name, channel_id],
                    RawRow::from_row,
                )
                .optional()?;

            let Some(existing) = existing else {
                debug!(plugin = %plugin_name, channel_id = %channel_id, "Nothing to update");
                return Ok(None);
            };

            let merged = RawRow {
                id: existing.id,
                plugin_name: existing.plugin_name,
                channel_id: existing.channel_id,
                access_token: new_access.unwrap_or(existing.access_token),
                refresh_token: new_refresh.or(existing.refresh_token),
                metadata: new_metadata.unwrap_or(existing.metadata),
                installed_at: existing.installed_at,
                last_active: now.to_rfc3339(),
                is_active: update.is_active.unwrap_or(existing.is_active),
            };

            conn.execute(
                "UPDATE plugin_installations
                 SET access_token = ?1, refresh_token = ?2, metadata = ?3,
                     is_active = ?4, last_active = ?5
                 WHERE id = ?6",
                params![
                    merged.access_token,
                    merged.refresh_token,
                    merged.metadata,
                    merged.is_active,
                    merged.last_active,
                    merged.id,
                ],
            )?;

            merged
        };

        debug!(plugin = %plugin_name, channel_id = %channel_id, "Installation updated");
        self.decrypt_row(raw).map(Some)
    }

    /// Hard-deletes an installation. Returns whether a row was removed.
    ///
    /// Uninstall must leave no token behind, so this is a real delete, not
    /// an `is_active` flip.
    pub async fn delete(&self, plugin_name: &str, channel_id: &str) -> Result<bool, StoreError> {
        let removed = {
            let conn = self.conn.lock().expect("store mutex poisoned");
            conn.execute(
                "DELETE FROM plugin_installations WHERE plugin_name = ?1 AND channel_id = ?2",
                params![plugin_name, channel_id],
            )?
        };

        if removed > 0 {
            info!(plugin = %plugin_name, channel_id = %channel_id, "Installation deleted");
        }

        Ok(removed > 0)
    }

    /// Lists installations for one plugin.
    pub async fn list_for_plugin(
        &self,
        plugin_name: &str,
        active_only: bool,
    ) -> Result<Vec<Installation>, StoreError> {
        let raws = {
            let conn = self.conn.lock().expect("store mutex poisoned");
            let sql = if active_only {
                format!(
                    "SELECT {SELECT_COLUMNS} FROM plugin_installations
                     WHERE plugin_name = ?1 AND is_active = 1 ORDER BY id"
                )
            } else {
                format!(
                    "SELECT {SELECT_COLUMNS} FROM plugin_installations
                     WHERE plugin_name = ?1 ORDER BY id"
                )
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![plugin_name], RawRow::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        raws.into_iter().map(|r| self.decrypt_row(r)).collect()
    }

    /// Lists every installation across all plugins.
    pub async fn list_all(&self, active_only: bool) -> Result<Vec<Installation>, StoreError> {
        let raws = {
            let conn = self.conn.lock().expect("store mutex poisoned");
            let sql = if active_only {
                format!(
                    "SELECT {SELECT_COLUMNS} FROM plugin_installations
                     WHERE is_active = 1 ORDER BY id"
                )
            } else {
                format!("SELECT {SELECT_COLUMNS} FROM plugin_installations ORDER BY id")
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], RawRow::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        raws.into_iter().map(|r| self.decrypt_row(r)).collect()
    }

    fn decrypt_row(&self, raw: RawRow) -> Result<Installation, StoreError> {
        let access_token = self.cipher.decrypt(&raw.access_token)?;
        let refresh_token = raw
            .refresh_token
            .as_deref()
            .map(|t| self.cipher.decrypt(t))
            .transpose()?;

        Ok(Installation {
            id: Some(raw.id),
            plugin_name: raw.plugin_name,
            channel_id: raw.channel_id,
            access_token,
            refresh_token,
            metadata: decode_metadata(raw.metadata.as_deref()),
            installed_at: parse_timestamp(&raw.installed_at),
            last_active: parse_timestamp(&raw.last_active),
            is_active: raw.is_active,
        })
    }
}

fn encode_metadata(metadata: &Map<String, Value>) -> Option<String> {
    if metadata.is_empty() {
        None
    } else {
        Some(Value::Object(metadata.clone()).to_string())
    }
}

fn decode_metadata(raw: Option<&str>) -> Map<String, Value> {
    raw.and_then(|s| serde_json::from_str::<Value>(s).ok())
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default()
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PASSPHRASE: &str = "store-test-passphrase-with-enough-bytes";

    fn store() -> InstallationStore {
        let cipher = TokenCipher::from_passphrase(PASSPHRASE).unwrap();
        InstallationStore::open_in_memory(cipher).unwrap()
    }

    fn sample(channel: &str) -> Installation {
        let mut metadata = Map::new();
        metadata.insert("team_name".into(), json!("Acme"));
        Installation::new("slack", channel, "xoxb-token")
            .with_refresh_token("xoxr-refresh")
            .with_metadata(metadata)
    }

    #[tokio::test]
    async fn create_round_trips_plaintext() {
        let store = store();
        let created = store.create(sample("T1")).await.unwrap();

        assert!(created.id.is_some());
        assert_eq!(created.access_token, "xoxb-token");

        let fetched = store.get("slack", "T1").await.unwrap().unwrap();
        assert_eq!(fetched.access_token, "xoxb-token");
        assert_eq!(fetched.refresh_token.as_deref(), Some("xoxr-refresh"));
        assert_eq!(fetched.metadata_str("team_name"), Some("Acme"));
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn duplicate_key_is_rejected() {
        let store = store();
        store.create(sample("T1")).await.unwrap();

        let err = store.create(sample("T1")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::AlreadyExists { plugin, channel }
                if plugin == "slack" && channel == "T1"
        ));
    }

    #[tokio::test]
    async fn raw_rows_hold_ciphertext_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installations.db");

        let cipher = TokenCipher::from_passphrase(PASSPHRASE).unwrap();
        let store = InstallationStore::open(&path, cipher).unwrap();
        store.create(sample("T1")).await.unwrap();

        // Read the row with a second, cipher-less connection.
        let raw_conn = Connection::open(&path).unwrap();
        let (access, refresh): (String, String) = raw_conn
            .query_row(
                "SELECT access_token, refresh_token FROM plugin_installations
                 WHERE plugin_name = 'slack' AND channel_id = 'T1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();

        assert_ne!(access, "xoxb-token");
        assert!(!access.contains("xoxb"));
        assert_ne!(refresh, "xoxr-refresh");
        assert!(!refresh.contains("xoxr"));

        // The API still returns plaintext.
        let via_api = store.get("slack", "T1").await.unwrap().unwrap();
        assert_eq!(via_api.access_token, "xoxb-token");
    }

    #[tokio::test]
    async fn partial_update_preserves_missing_fields() {
        let store = store();
        store.create(sample("T1")).await.unwrap();

        let updated = store
            .update(
                "slack",
                "T1",
                InstallationUpdate::new().access_token("xoxb-rotated"),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.access_token, "xoxb-rotated");
        assert_eq!(updated.refresh_token.as_deref(), Some("xoxr-refresh"));
        assert_eq!(updated.metadata_str("team_name"), Some("Acme"));
    }

    #[tokio::test]
    async fn update_stamps_last_active() {
        let store = store();
        let created = store.create(sample("T1")).await.unwrap();

        let updated = store
            .update("slack", "T1", InstallationUpdate::new().is_active(false))
            .await
            .unwrap()
            .unwrap();

        assert!(!updated.is_active);
        assert!(updated.last_active >= created.last_active);
    }

    #[tokio::test]
    async fn update_missing_key_returns_none() {
        let store = store();
        let result = store
            .update("slack", "T_MISSING", InstallationUpdate::new().is_active(false))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn updates_are_isolated_per_channel() {
        let store = store();
        store.create(sample("T1")).await.unwrap();
        store.create(sample("T2")).await.unwrap();

        store
            .update(
                "slack",
                "T1",
                InstallationUpdate::new().access_token("xoxb-changed"),
            )
            .await
            .unwrap();

        let untouched = store.get("slack", "T2").await.unwrap().unwrap();
        assert_eq!(untouched.access_token, "xoxb-token");
    }

    #[tokio::test]
    async fn delete_is_hard() {
        let store = store();
        store.create(sample("T1")).await.unwrap();

        assert!(store.delete("slack", "T1").await.unwrap());
        assert!(store.get("slack", "T1").await.unwrap().is_none());
        // Second delete finds nothing.
        assert!(!store.delete("slack", "T1").await.unwrap());
    }

    #[tokio::test]
    async fn listing_filters_by_plugin_and_activity() {
        let store = store();
        store.create(sample("T1")).await.unwrap();
        store.create(sample("T2")).await.unwrap();
        store
            .create(Installation::new("whatsapp", "+15550100", "wa-token"))
            .await
            .unwrap();

        store
            .update("slack", "T2", InstallationUpdate::new().is_active(false))
            .await
            .unwrap();

        let active_slack = store.list_for_plugin("slack", true).await.unwrap();
        assert_eq!(active_slack.len(), 1);
        assert_eq!(active_slack[0].channel_id, "T1");

        let all_slack = store.list_for_plugin("slack", false).await.unwrap();
        assert_eq!(all_slack.len(), 2);

        let everything = store.list_all(false).await.unwrap();
        assert_eq!(everything.len(), 3);

        let active_everything = store.list_all(true).await.unwrap();
        assert_eq!(active_everything.len(), 2);
    }

    #[tokio::test]
    async fn get_by_id_round_trips() {
        let store = store();
        let created = store.create(sample("T1")).await.unwrap();
        let id = created.id.unwrap();

        let fetched = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.channel_id, "T1");
        assert!(store.get_by_id(id + 100).await.unwrap().is_none());
    }
}
