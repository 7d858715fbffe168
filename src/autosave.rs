//! Trailing-edge debounce of rapid edit events into single repository
//! updates.
//!
//! Each note gets at most one armed task at a time; re-scheduling cancels
//! and replaces it, so only the last edit in a burst is committed and
//! intermediate keystrokes are coalesced.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::document;
use crate::note::{NoteUpdate, DEFAULT_TITLE};
use crate::repository::NoteRepository;

/// Quiet period before a scheduled edit is committed.
pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

type PendingMap = Arc<Mutex<HashMap<String, Pending>>>;

/// Debounces edit events into deferred [`NoteRepository::update`] calls,
/// one pending task per note id.
pub struct AutoSaveScheduler {
    repo: NoteRepository,
    delay: Duration,
    pending: PendingMap,
    generation: AtomicU64,
}

impl AutoSaveScheduler {
    pub fn new(repo: NoteRepository) -> Self {
        Self::with_delay(repo, AUTOSAVE_DEBOUNCE)
    }

    pub fn with_delay(repo: NoteRepository, delay: Duration) -> Self {
        Self {
            repo,
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Arm a deferred update for `note_id`, replacing any pending one.
    ///
    /// After the quiet period the fields are committed through
    /// [`NoteRepository::update`]; if the note is still titled
    /// `"Untitled Note"` and the batch carries content without an explicit
    /// title, a title is derived from that content at commit time.
    ///
    /// The returned guard cancels this specific schedule; invoke it on
    /// teardown so a stale write cannot fire against a note the caller has
    /// navigated away from. A guard outlived by a newer schedule for the
    /// same note becomes inert.
    #[must_use = "dropping the guard leaves the scheduled write armed; call cancel() on teardown"]
    pub fn schedule(&self, note_id: &str, fields: NoteUpdate) -> AutoSaveGuard {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let repo = self.repo.clone();
        let delay = self.delay;
        let id = note_id.to_string();
        let map = Arc::clone(&self.pending);

        let task_id = id.clone();
        let task_map = Arc::clone(&map);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut fields = fields;
            if fields.title.is_none() {
                if let Some(content) = &fields.content {
                    let untitled = repo
                        .note(&task_id)
                        .is_some_and(|n| n.title == DEFAULT_TITLE);
                    if untitled {
                        fields.title = document::derive_title(content);
                    }
                }
            }
            repo.update(&task_id, fields);

            let mut pending = task_map.lock().unwrap();
            if pending.get(&task_id).map(|p| p.generation) == Some(generation) {
                pending.remove(&task_id);
            }
        });

        let mut pending = self.pending.lock().unwrap();
        if let Some(prev) = pending.insert(id.clone(), Pending { generation, handle }) {
            debug!(id = %id, "replacing pending auto-save");
            prev.handle.abort();
        }

        AutoSaveGuard {
            note_id: id,
            generation,
            pending: Arc::clone(&self.pending),
        }
    }

    /// Number of armed, not-yet-committed updates.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl Drop for AutoSaveScheduler {
    fn drop(&mut self) {
        for (_, pending) in self.pending.lock().unwrap().drain() {
            pending.handle.abort();
        }
    }
}

/// Cancellation handle for one scheduled auto-save.
pub struct AutoSaveGuard {
    note_id: String,
    generation: u64,
    pending: PendingMap,
}

impl AutoSaveGuard {
    /// Cancel the scheduled write, if it is still the pending one for this
    /// note and has not fired yet.
    pub fn cancel(self) {
        let mut pending = self.pending.lock().unwrap();
        if pending.get(&self.note_id).map(|p| p.generation) == Some(self.generation) {
            if let Some(p) = pending.remove(&self.note_id) {
                p.handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentNode;
    use crate::note::Session;
    use crate::notify::NotificationReceiver;
    use crate::store::{LocalStore, MemoryRemoteStore};
    use tempfile::TempDir;

    fn repo_with_remote(
        remote: Arc<MemoryRemoteStore>,
        session: Option<Session>,
    ) -> (NoteRepository, NotificationReceiver, TempDir) {
        let tmp = TempDir::new().unwrap();
        let local = LocalStore::open(tmp.path()).unwrap();
        let (repo, rx) = NoteRepository::new(local, remote, session);
        (repo, rx, tmp)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_commits_only_last_fields() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let (repo, _rx, _tmp) = repo_with_remote(remote.clone(), Some(Session::new("u1")));
        let note = repo.create();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let scheduler = AutoSaveScheduler::new(repo.clone());
        let _g1 = scheduler.schedule(&note.id, NoteUpdate::title("one"));
        let _g2 = scheduler.schedule(&note.id, NoteUpdate::title("two"));
        let g3 = scheduler.schedule(&note.id, NoteUpdate::title("three"));

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(repo.note(&note.id).unwrap().title, "three");
        // Exactly one committed update reached the remote store.
        assert_eq!(remote.update_calls(), 1);
        assert_eq!(scheduler.pending_count(), 0);
        drop(g3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_restarts_the_quiet_period() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let (repo, _rx, _tmp) = repo_with_remote(remote, None);
        let note = repo.create();
        let scheduler = AutoSaveScheduler::new(repo.clone());

        let _g1 = scheduler.schedule(&note.id, NoteUpdate::title("early"));
        tokio::time::sleep(Duration::from_millis(800)).await;
        let _g2 = scheduler.schedule(&note.id, NoteUpdate::title("late"));
        tokio::time::sleep(Duration::from_millis(800)).await;

        // 1600ms after the first schedule, only the second is armed and its
        // own window has not elapsed yet.
        assert_eq!(repo.note(&note.id).unwrap().title, crate::DEFAULT_TITLE);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(repo.note(&note.id).unwrap().title, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_cancels_pending_write() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let (repo, _rx, _tmp) = repo_with_remote(remote, None);
        let note = repo.create();
        let scheduler = AutoSaveScheduler::new(repo.clone());

        let guard = scheduler.schedule(&note.id, NoteUpdate::title("never"));
        guard.cancel();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(repo.note(&note.id).unwrap().title, crate::DEFAULT_TITLE);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_guard_does_not_cancel_replacement() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let (repo, _rx, _tmp) = repo_with_remote(remote, None);
        let note = repo.create();
        let scheduler = AutoSaveScheduler::new(repo.clone());

        let stale = scheduler.schedule(&note.id, NoteUpdate::title("old"));
        let _current = scheduler.schedule(&note.id, NoteUpdate::title("new"));
        stale.cancel();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(repo.note(&note.id).unwrap().title, "new");
    }

    #[tokio::test(start_paused = true)]
    async fn test_notes_debounce_independently() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let (repo, _rx, _tmp) = repo_with_remote(remote, None);
        let a = repo.create();
        let b = repo.create();
        let scheduler = AutoSaveScheduler::new(repo.clone());

        let _ga = scheduler.schedule(&a.id, NoteUpdate::title("a"));
        let _gb = scheduler.schedule(&b.id, NoteUpdate::title("b"));
        assert_eq!(scheduler.pending_count(), 2);
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(repo.note(&a.id).unwrap().title, "a");
        assert_eq!(repo.note(&b.id).unwrap().title, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_title_derived_from_content_at_commit() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let (repo, _rx, _tmp) = repo_with_remote(remote, None);
        let note = repo.create();
        let scheduler = AutoSaveScheduler::new(repo.clone());

        let text = "Hello world, this is a very long line exceeding fifty characters";
        let content = DocumentNode::node(
            "doc",
            vec![DocumentNode::node(
                "paragraph",
                vec![DocumentNode::text(text)],
            )],
        );
        let _g = scheduler.schedule(&note.id, NoteUpdate::content(content));
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let expected: String = text.chars().take(50).collect();
        assert_eq!(
            repo.note(&note.id).unwrap().title,
            expected.trim().to_string()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_title_is_not_overridden_by_derivation() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let (repo, _rx, _tmp) = repo_with_remote(remote, None);
        let note = repo.create();
        repo.update(&note.id, NoteUpdate::title("My title"));
        let scheduler = AutoSaveScheduler::new(repo.clone());

        let content = DocumentNode::node(
            "doc",
            vec![DocumentNode::node(
                "paragraph",
                vec![DocumentNode::text("something else")],
            )],
        );
        let _g = scheduler.schedule(&note.id, NoteUpdate::content(content));
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(repo.note(&note.id).unwrap().title, "My title");
    }
}
