//! Sign-in merge between the local cache and the remote store.
//!
//! Runs once per session-acquisition edge (see
//! [`NoteRepository::set_session`](crate::NoteRepository::set_session)):
//! remote rows win by presence, local-only notes are uploaded, and the
//! merged set replaces the collection wholesale.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::Result;
use crate::note::Note;
use crate::store::RemoteStore;

/// Result of a sign-in merge.
pub struct SyncOutcome {
    /// The merged authoritative collection, `updated_at` descending.
    pub notes: Vec<Note>,
    /// Local-only notes successfully uploaded to the remote store.
    pub uploaded: usize,
    /// Local-only notes dropped because their upload failed.
    pub dropped: usize,
}

/// Merge the local collection with the remote set for `owner_id`.
///
/// Every remote row joins the merged set verbatim: presence in the remote
/// set, not a timestamp comparison, decides which version survives. Local
/// notes whose id is unknown to the remote store are uploaded tagged with
/// the owner id and join with the server-canonical fields. A local note
/// whose upload fails is dropped from the merged set; that inherited
/// behavior loses data and is pinned by tests rather than papered over.
///
/// Fails only when the remote fetch itself fails, in which case the caller
/// keeps the prior local collection.
pub async fn merge_on_sign_in(
    remote: &dyn RemoteStore,
    local: Vec<Note>,
    owner_id: &str,
) -> Result<SyncOutcome> {
    let remote_notes = remote.select_all(owner_id).await?;
    let remote_ids: HashSet<String> = remote_notes.iter().map(|n| n.id.clone()).collect();
    debug!(
        remote = remote_notes.len(),
        local = local.len(),
        "merging note collections"
    );

    let mut merged = remote_notes;
    let mut uploaded = 0;
    let mut dropped = 0;

    for note in local {
        if remote_ids.contains(&note.id) {
            continue;
        }

        let mut candidate = note;
        candidate.owner_id = Some(owner_id.to_string());
        match remote.insert(&candidate).await {
            Ok(row) => {
                merged.push(row);
                uploaded += 1;
            }
            Err(e) => {
                warn!(id = %candidate.id, error = %e, "upload failed, note dropped from merged set");
                dropped += 1;
            }
        }
    }

    merged.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    Ok(SyncOutcome {
        notes: merged,
        uploaded,
        dropped,
    })
}
