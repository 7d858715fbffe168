use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::error::Result;
use crate::note::Note;

const LOCAL_DB: &str = "notes.db";
const NOTES_SLOT: &str = "notes";

/// Durable client-side persistence for the note collection.
///
/// A single key-value slot holding the serialized collection as a
/// versionless JSON array, read at startup and overwritten wholesale on
/// every mutation. Pure serialize/deserialize, no business logic.
pub struct LocalStore {
    conn: Connection,
    path: PathBuf,
}

impl LocalStore {
    /// Open or create the store database under `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOCAL_DB);
        let conn = Connection::open(&path)?;

        let store = Self { conn, path };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Load the persisted collection.
    ///
    /// A missing or malformed payload is treated as an empty collection:
    /// corrupt local data must never crash the client.
    pub fn load(&self) -> Vec<Note> {
        match self.try_load() {
            Ok(notes) => notes,
            Err(e) => {
                warn!(error = %e, "discarding unreadable local note collection");
                Vec::new()
            }
        }
    }

    fn try_load(&self) -> Result<Vec<Note>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM slots WHERE key = ?1",
                params![NOTES_SLOT],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Overwrite the slot with the full collection.
    pub fn save(&self, notes: &[Note]) -> Result<()> {
        let json = serde_json::to_string(notes)?;
        self.conn.execute(
            "INSERT INTO slots (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![NOTES_SLOT, json],
        )?;
        Ok(())
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
