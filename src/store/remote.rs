use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{Result, ScribeError};
use crate::note::{Note, NoteUpdate};

/// Row-based CRUD over the authoritative remote "notes" collection.
///
/// The remote store is an external collaborator; calls are best-effort and
/// their failure never rolls back local state. Implementations are expected
/// to assign server-side timestamps and, possibly, their own row ids.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert a note and return the canonical row as stored by the server,
    /// including any server-assigned id.
    async fn insert(&self, note: &Note) -> Result<Note>;

    /// Apply a partial-field update to the row with the given id.
    async fn update(&self, id: &str, fields: &NoteUpdate) -> Result<()>;

    /// Delete the row with the given id.
    async fn delete(&self, id: &str) -> Result<()>;

    /// All rows owned by `owner_id`, ordered by `updated_at` descending.
    async fn select_all(&self, owner_id: &str) -> Result<Vec<Note>>;
}

/// In-memory [`RemoteStore`] with failure injection.
///
/// Stands in for the network store in tests, both this crate's and an
/// embedder's.
#[derive(Default)]
pub struct MemoryRemoteStore {
    rows: Mutex<Vec<Note>>,
    assign_ids: AtomicBool,
    next_id: AtomicU64,
    fail_inserts: AtomicBool,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
    fail_selects: AtomicBool,
    select_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emulate a server that assigns its own row ids on insert.
    pub fn with_server_ids() -> Self {
        let store = Self::default();
        store.assign_ids.store(true, Ordering::SeqCst);
        store
    }

    /// Pre-populate the remote collection.
    pub fn seed(&self, notes: Vec<Note>) {
        *self.rows.lock().unwrap() = notes;
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_selects(&self, fail: bool) {
        self.fail_selects.store(fail, Ordering::SeqCst);
    }

    /// Number of `select_all` calls served (including failed ones).
    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    /// Number of `update` calls served (including failed ones).
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of the stored rows, unordered.
    pub fn rows(&self) -> Vec<Note> {
        self.rows.lock().unwrap().clone()
    }

    fn unavailable() -> ScribeError {
        ScribeError::Remote("remote store unavailable".to_string())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn insert(&self, note: &Note) -> Result<Note> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let mut row = note.clone();
        if self.assign_ids.load(Ordering::SeqCst) {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            row.id = format!("srv-{}", n);
        }
        row.updated_at = Utc::now();

        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: &str, fields: &NoteUpdate) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            fields.apply(row);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        self.rows.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }

    async fn select_all(&self, owner_id: &str) -> Result<Vec<Note>> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_selects.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let mut rows: Vec<Note> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner_id.as_deref() == Some(owner_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }
}
