//! User-visible notifications for repository and sync outcomes.
//!
//! Remote failures never roll back local state, so the only way they reach
//! the user is through this channel. The UI layer drains the receiver and
//! renders toasts; dropping the receiver silently discards notifications.

use tokio::sync::mpsc;

/// A non-blocking notification about a repository or sync outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A note was created locally.
    NoteCreated,
    /// The remote insert for a newly created note failed; the local note
    /// remains valid.
    CreateFailed,
    /// A best-effort remote update failed; local state is unchanged.
    UpdateFailed,
    /// A note was deleted locally.
    NoteDeleted,
    /// A best-effort remote delete failed; the note stays deleted locally.
    DeleteFailed,
    /// Loading from the remote store failed; local storage is shown instead.
    LoadFailed,
    /// Sign-in sync finished; `total` notes in the merged set, `uploaded`
    /// local-only notes pushed to the remote store.
    SyncCompleted { total: usize, uploaded: usize },
    /// Sign-in sync could not fetch the remote set; the local collection is
    /// left as-is.
    SyncFailed,
}

pub type NotificationSender = mpsc::UnboundedSender<Notification>;
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

pub(crate) fn channel() -> (NotificationSender, NotificationReceiver) {
    mpsc::unbounded_channel()
}

/// Format a notification for display.
pub fn format_notification(notification: &Notification) -> String {
    match notification {
        Notification::NoteCreated => "New note created successfully.".to_string(),
        Notification::CreateFailed => "Failed to save note to the server.".to_string(),
        Notification::UpdateFailed => "Failed to update note on the server.".to_string(),
        Notification::NoteDeleted => "Note deleted successfully.".to_string(),
        Notification::DeleteFailed => "Failed to delete note on the server.".to_string(),
        Notification::LoadFailed => {
            "Failed to load notes. Using local storage as fallback.".to_string()
        }
        Notification::SyncCompleted { total, uploaded } => {
            format!("Synced {} notes ({} uploaded).", total, uploaded)
        }
        Notification::SyncFailed => "Failed to sync notes with the server.".to_string(),
    }
}
