//! Error types shared by segmentation, registration and the engine bridge.

use std::os::raw::c_int;

use rusqlite::ffi;

#[derive(Debug, thiserror::Error)]
pub enum FtsError {
    /// The lexicon slot was read before anything was preloaded into it.
    #[error("lexicon has not been preloaded")]
    ResourceNotReady,

    #[error("malformed input: invalid UTF-8 after byte {valid_up_to}")]
    MalformedInput { valid_up_to: usize },

    #[error("tokenizer name '{0}' is reserved by the engine")]
    NameCollision(String),

    #[error("unsupported tokenizer ABI: {0}")]
    UnsupportedVersion(String),

    #[error("unknown tokenizer '{0}'")]
    UnknownTokenizer(String),

    #[error("lexicon load failed: {0}")]
    Lexicon(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::str::Utf8Error> for FtsError {
    fn from(err: std::str::Utf8Error) -> Self {
        FtsError::MalformedInput {
            valid_up_to: err.valid_up_to(),
        }
    }
}

impl FtsError {
    /// Result code reported back to SQLite when an error crosses the FFI boundary.
    pub fn sqlite_code(&self) -> c_int {
        match self {
            FtsError::ResourceNotReady => ffi::SQLITE_MISUSE as c_int,
            FtsError::MalformedInput { .. } => ffi::SQLITE_MISMATCH as c_int,
            FtsError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => err.extended_code,
            _ => ffi::SQLITE_ERROR as c_int,
        }
    }
}

pub type Result<T, E = FtsError> = std::result::Result<T, E>;
