pub mod autosave;
pub mod document;
pub mod error;
pub mod note;
pub mod notify;
pub mod repository;
pub mod store;
pub mod sync;

pub use autosave::{AutoSaveGuard, AutoSaveScheduler, AUTOSAVE_DEBOUNCE};
pub use document::{derive_title, DocumentNode};
pub use error::{Result, ScribeError};
pub use note::{Note, NoteUpdate, Session, DEFAULT_TITLE};
pub use notify::{format_notification, Notification, NotificationReceiver};
pub use repository::NoteRepository;
pub use store::{LocalStore, MemoryRemoteStore, RemoteStore};
