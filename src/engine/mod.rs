//! Bindings to SQLite's tokenizer ABIs.
//!
//! Every `unsafe` block of the crate lives under this module.

use std::{
    any::Any,
    ffi::{CStr, c_char, c_int, c_void},
    fmt,
    ptr::{self, NonNull},
    sync::Arc,
};

use rusqlite::{Connection, ffi};
use serde::{Deserialize, Serialize};

use crate::{
    error::{FtsError, Result},
    pipeline::Enumerator,
    registry::Registration,
    types::OptionMask,
};

mod fts3;
mod fts5;

pub use fts3::Fts3Abi;
pub use fts5::{Fts5Abi, mode_from_fts5_flags};

/// Oldest `fts5_api` revision whose tokenizer interface is adapted.
pub const MIN_FTS5_API_VERSION: c_int = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbiGeneration {
    Fts5,
    /// `sqlite3_tokenizer_module`, used by FTS3 and FTS4 tables.
    Fts3,
}

impl fmt::Display for AbiGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiGeneration::Fts5 => f.write_str("fts5"),
            AbiGeneration::Fts3 => f.write_str("fts3"),
        }
    }
}

impl AbiGeneration {
    pub fn abi(&self) -> Box<dyn TokenizerAbi> {
        match self {
            AbiGeneration::Fts5 => Box::new(Fts5Abi),
            AbiGeneration::Fts3 => Box::new(Fts3Abi),
        }
    }
}

/// What the connection's SQLite build offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineCapabilities {
    pub fts5_api_version: Option<c_int>,
    pub fts3_tokenizer: bool,
}

impl EngineCapabilities {
    pub fn probe(conn: &Connection) -> Result<Self> {
        let fts5_api_version = fts5_api(conn).map(|api| unsafe { api.as_ref().iVersion });
        let fts3_tokenizer = conn.query_row(
            "SELECT sqlite_compileoption_used('ENABLE_FTS3')",
            [],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(Self {
            fts5_api_version,
            fts3_tokenizer,
        })
    }
}

/// An adapter between registrations and one generation of SQLite's tokenizer ABI.
pub trait TokenizerAbi: Send + Sync {
    fn generation(&self) -> AbiGeneration;

    /// Fails with [`FtsError::UnsupportedVersion`] when the connection cannot host
    /// this ABI.
    fn check(&self, capabilities: &EngineCapabilities) -> Result<()>;

    /// Makes `registration` available under its name. Returns whatever must outlive
    /// the connection, if SQLite does not take ownership itself.
    fn install(
        &self,
        conn: &Connection,
        registration: &Arc<Registration>,
    ) -> Result<Option<InstalledModule>>;
}

/// Memory SQLite refers to without owning.
pub struct InstalledModule(#[allow(dead_code)] Box<dyn Any + Send>);

impl InstalledModule {
    fn new<T: Any + Send>(module: Box<T>) -> Self {
        Self(module)
    }
}

/// Per-table tokenizer state: the registration's pipeline with table arguments
/// applied.
pub(crate) struct TableTokenizer {
    enumerator: Enumerator,
}

impl TableTokenizer {
    pub(crate) fn new(registration: &Registration, options: Option<OptionMask>) -> Self {
        let enumerator = match options {
            Some(options) => registration.enumerator().with_options(options),
            None => registration.enumerator().clone(),
        };
        Self { enumerator }
    }

    pub(crate) fn enumerator(&self) -> &Enumerator {
        &self.enumerator
    }
}

/// Reads the option mask out of tokenizer arguments.
pub(crate) fn table_options(name: &str, args: &[String]) -> Option<OptionMask> {
    let (options, hints) = OptionMask::from_args(args.iter().map(String::as_str));
    if !hints.is_empty() {
        tracing::debug!(tokenizer = name, ?hints, "locale hints ignored");
    }
    options
}

/// Copies a C argument vector.
///
/// # Safety
/// `argv` must be null or point to `argc` pointers that are each null or
/// NUL-terminated.
pub(crate) unsafe fn collect_args(argv: *const *const c_char, argc: c_int) -> Vec<String> {
    if argv.is_null() || argc <= 0 {
        return Vec::new();
    }
    let argv = unsafe { std::slice::from_raw_parts(argv, argc as usize) };
    argv.iter()
        .filter(|arg| !arg.is_null())
        .map(|&arg| unsafe { CStr::from_ptr(arg) }.to_string_lossy().into_owned())
        .collect()
}

/// Borrows an engine text buffer. A negative length means NUL-terminated.
///
/// # Safety
/// `text` must be null or valid for `len` bytes (or up to its NUL when `len < 0`)
/// for the returned lifetime.
pub(crate) unsafe fn input_bytes<'a>(text: *const c_char, len: c_int) -> &'a [u8] {
    if text.is_null() {
        return &[];
    }
    if len < 0 {
        return unsafe { CStr::from_ptr(text) }.to_bytes();
    }
    unsafe { std::slice::from_raw_parts(text.cast::<u8>(), len as usize) }
}

pub(crate) fn sqlite_failure(code: c_int, message: impl Into<String>) -> FtsError {
    FtsError::Sqlite(rusqlite::Error::SqliteFailure(
        ffi::Error::new(code),
        Some(message.into()),
    ))
}

/// The connection's `fts5_api`, or `None` when FTS5 is not compiled in.
pub(crate) fn fts5_api(conn: &Connection) -> Option<NonNull<ffi::fts5_api>> {
    let mut api: *mut ffi::fts5_api = ptr::null_mut();
    unsafe {
        let db = conn.handle();
        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
        let rc = ffi::sqlite3_prepare_v2(
            db,
            c"SELECT fts5(?1)".as_ptr(),
            -1,
            &mut stmt,
            ptr::null_mut(),
        );
        if rc != ffi::SQLITE_OK {
            return None;
        }
        ffi::sqlite3_bind_pointer(
            stmt,
            1,
            (&mut api as *mut *mut ffi::fts5_api).cast::<c_void>(),
            c"fts5_api_ptr".as_ptr(),
            None,
        );
        ffi::sqlite3_step(stmt);
        ffi::sqlite3_finalize(stmt);
    }
    NonNull::new(api)
}
