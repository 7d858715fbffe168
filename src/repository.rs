//! The authoritative in-memory note collection and its active-note pointer.
//!
//! All mutations are local-first: applied synchronously to in-memory state,
//! written to [`LocalStore`] immediately, and only then mirrored to the
//! remote store as detached best-effort tasks. Remote failures notify the
//! user but never roll back local state.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info, warn};

use crate::note::{Note, NoteUpdate, Session};
use crate::notify::{self, Notification, NotificationReceiver, NotificationSender};
use crate::store::{LocalStore, RemoteStore};
use crate::sync;

struct RepoState {
    notes: Vec<Note>,
    // Active note is tracked by id and resolved against the collection, so
    // the two views cannot diverge and the pointer cannot dangle.
    active_id: Option<String>,
    session: Option<Session>,
    loading: bool,
    syncing: bool,
}

impl RepoState {
    fn contains(&self, id: &str) -> bool {
        self.notes.iter().any(|n| n.id == id)
    }

    /// Re-point `active_id` at the first note when it no longer resolves.
    fn reselect_if_dangling(&mut self) {
        let dangling = match &self.active_id {
            Some(id) => !self.contains(id),
            None => true,
        };
        if dangling {
            self.active_id = self.notes.first().map(|n| n.id.clone());
        }
    }
}

/// Owner of the note collection; cheap to clone, clones share state.
#[derive(Clone)]
pub struct NoteRepository {
    state: Arc<Mutex<RepoState>>,
    local: Arc<Mutex<LocalStore>>,
    remote: Arc<dyn RemoteStore>,
    notify: NotificationSender,
}

impl NoteRepository {
    /// Build a repository over the given stores.
    ///
    /// The session is an external fact supplied by the auth collaborator;
    /// pass `None` for a signed-out start and feed changes through
    /// [`set_session`](Self::set_session). The returned receiver carries
    /// user-visible notifications; dropping it discards them.
    pub fn new(
        local: LocalStore,
        remote: Arc<dyn RemoteStore>,
        session: Option<Session>,
    ) -> (Self, NotificationReceiver) {
        let (tx, rx) = notify::channel();
        let repo = Self {
            state: Arc::new(Mutex::new(RepoState {
                notes: Vec::new(),
                active_id: None,
                session,
                loading: true,
                syncing: false,
            })),
            local: Arc::new(Mutex::new(local)),
            remote,
            notify: tx,
        };
        (repo, rx)
    }

    /// Current collection, most recently modified first.
    pub fn notes(&self) -> Vec<Note> {
        self.state.lock().unwrap().notes.clone()
    }

    /// The active note, if any. Always a member of [`notes`](Self::notes).
    pub fn active_note(&self) -> Option<Note> {
        let state = self.state.lock().unwrap();
        let id = state.active_id.as_deref()?;
        state.notes.iter().find(|n| n.id == id).cloned()
    }

    /// Look up a single note by id.
    pub fn note(&self, id: &str) -> Option<Note> {
        self.state
            .lock()
            .unwrap()
            .notes
            .iter()
            .find(|n| n.id == id)
            .cloned()
    }

    /// True until [`load`](Self::load) has completed.
    pub fn is_loading(&self) -> bool {
        self.state.lock().unwrap().loading
    }

    /// True while a sign-in merge is in flight.
    pub fn is_syncing(&self) -> bool {
        self.state.lock().unwrap().syncing
    }

    pub fn session(&self) -> Option<Session> {
        self.state.lock().unwrap().session.clone()
    }

    /// Populate the collection from local storage, then, if a session is
    /// already present, reload from the remote store as source of truth.
    ///
    /// Corrupt or missing local data yields an empty collection. A failed
    /// remote reload keeps the local view and notifies.
    pub async fn load(&self) {
        let cached = self.local.lock().unwrap().load();
        let session = {
            let mut state = self.state.lock().unwrap();
            state.notes = cached;
            state.notes
                .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            if !state.notes.is_empty() {
                state.reselect_if_dangling();
            }
            state.session.clone()
        };

        if let Some(session) = session {
            match self.remote.select_all(&session.user_id).await {
                Ok(rows) => {
                    let mut state = self.state.lock().unwrap();
                    state.notes = rows;
                    if state.notes.is_empty() {
                        state.active_id = None;
                    } else {
                        state.reselect_if_dangling();
                    }
                    debug!(count = state.notes.len(), "loaded notes from remote store");
                }
                Err(e) => {
                    error!(error = %e, "remote load failed, falling back to local storage");
                    self.send(Notification::LoadFailed);
                }
            }
        }

        self.state.lock().unwrap().loading = false;
    }

    /// Create a new note, prepend it to the collection, and make it active.
    ///
    /// The note is valid and addressable immediately; when a session is
    /// present a detached remote insert follows, and on success the
    /// server-assigned id and owner are rewritten in place wherever the
    /// client id still appears.
    pub fn create(&self) -> Note {
        let note = Note::new();
        let session = {
            let mut state = self.state.lock().unwrap();
            state.notes.insert(0, note.clone());
            state.active_id = Some(note.id.clone());
            self.persist(&state);
            state.session.clone()
        };
        self.send(Notification::NoteCreated);

        if let Some(session) = session {
            let repo = self.clone();
            let mut candidate = note.clone();
            candidate.owner_id = Some(session.user_id);
            tokio::spawn(async move {
                let client_id = candidate.id.clone();
                match repo.remote.insert(&candidate).await {
                    Ok(row) => repo.adopt_server_row(&client_id, row),
                    Err(e) => {
                        warn!(id = %client_id, error = %e, "remote insert failed, note stays local");
                        repo.send(Notification::CreateFailed);
                    }
                }
            });
        }

        note
    }

    /// Rewrite a freshly created note's id and owner with the server row.
    ///
    /// Matches on the stable client id, never on position: if the note was
    /// deleted while the insert was in flight, the late resolution is
    /// discarded instead of reviving it.
    fn adopt_server_row(&self, client_id: &str, row: Note) {
        let mut state = self.state.lock().unwrap();
        let Some(note) = state.notes.iter_mut().find(|n| n.id == client_id) else {
            debug!(id = %client_id, "note gone before remote insert resolved");
            return;
        };
        note.id = row.id.clone();
        note.owner_id = row.owner_id;
        if state.active_id.as_deref() == Some(client_id) {
            state.active_id = Some(row.id);
        }
        self.persist(&state);
    }

    /// Merge the provided fields over the matching note.
    ///
    /// Fields absent from `fields` are preserved unchanged; `updated_at` is
    /// refreshed and the collection re-sorted, so the edited note moves to
    /// the front. Unknown ids are ignored. The remote update is fire and
    /// forget and never blocks or reverts the local mutation.
    pub fn update(&self, id: &str, fields: NoteUpdate) {
        let session = {
            let mut state = self.state.lock().unwrap();
            let Some(note) = state.notes.iter_mut().find(|n| n.id == id) else {
                debug!(id, "update for unknown note ignored");
                return;
            };
            fields.apply(note);
            state.notes
                .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            self.persist(&state);
            state.session.clone()
        };

        if session.is_some() {
            let repo = self.clone();
            let id = id.to_string();
            tokio::spawn(async move {
                if let Err(e) = repo.remote.update(&id, &fields).await {
                    warn!(id = %id, error = %e, "remote update failed, keeping local state");
                    repo.send(Notification::UpdateFailed);
                }
            });
        }
    }

    /// Remove a note. If it was active, the first remaining note (if any)
    /// becomes active.
    pub fn delete(&self, id: &str) {
        let session = {
            let mut state = self.state.lock().unwrap();
            let before = state.notes.len();
            state.notes.retain(|n| n.id != id);
            if state.notes.len() == before {
                return;
            }
            if state.active_id.as_deref() == Some(id) {
                state.active_id = state.notes.first().map(|n| n.id.clone());
            }
            self.persist(&state);
            state.session.clone()
        };
        self.send(Notification::NoteDeleted);

        if session.is_some() {
            let repo = self.clone();
            let id = id.to_string();
            tokio::spawn(async move {
                if let Err(e) = repo.remote.delete(&id).await {
                    warn!(id = %id, error = %e, "remote delete failed");
                    repo.send(Notification::DeleteFailed);
                }
            });
        }
    }

    /// Make the note with the given id active. A miss is a strict no-op:
    /// the current active note is kept.
    pub fn select(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        if state.contains(id) {
            state.active_id = Some(id.to_string());
        }
    }

    /// Feed a session change from the auth collaborator.
    ///
    /// A signed-out to signed-in transition triggers the sign-in merge
    /// exactly once; repeating the same present session does not re-run it.
    pub async fn set_session(&self, session: Option<Session>) {
        let acquired = {
            let mut state = self.state.lock().unwrap();
            let had_session = state.session.is_some();
            state.session = session.clone();
            !had_session && session.is_some()
        };

        if acquired {
            if let Some(session) = session {
                self.sync_with_remote(&session).await;
            }
        }
    }

    async fn sync_with_remote(&self, session: &Session) {
        let local_notes = {
            let mut state = self.state.lock().unwrap();
            state.syncing = true;
            state.notes.clone()
        };

        match sync::merge_on_sign_in(self.remote.as_ref(), local_notes, &session.user_id).await {
            Ok(outcome) => {
                let total = outcome.notes.len();
                let mut state = self.state.lock().unwrap();
                state.notes = outcome.notes;
                if state.notes.is_empty() {
                    state.active_id = None;
                } else {
                    state.reselect_if_dangling();
                }
                self.persist(&state);
                info!(
                    total,
                    uploaded = outcome.uploaded,
                    dropped = outcome.dropped,
                    "sign-in sync complete"
                );
                self.send(Notification::SyncCompleted {
                    total,
                    uploaded: outcome.uploaded,
                });
            }
            Err(e) => {
                error!(error = %e, "sign-in sync failed, keeping local collection");
                self.send(Notification::SyncFailed);
            }
        }

        self.state.lock().unwrap().syncing = false;
    }

    fn persist(&self, state: &MutexGuard<'_, RepoState>) {
        if let Err(e) = self.local.lock().unwrap().save(&state.notes) {
            error!(error = %e, "failed to persist notes to local storage");
        }
    }

    fn send(&self, notification: Notification) {
        let _ = self.notify.send(notification);
    }
}
