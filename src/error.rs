use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Remote store error: {0}")]
    Remote(String),
}

pub type Result<T> = std::result::Result<T, ScribeError>;
