mod local;
mod remote;

pub use local::LocalStore;
pub use remote::{MemoryRemoteStore, RemoteStore};
