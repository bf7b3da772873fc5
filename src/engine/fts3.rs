use std::{
    ffi::{c_char, c_int},
    panic::{self, AssertUnwindSafe},
    ptr,
    sync::Arc,
};

use rusqlite::{Connection, config::DbConfig, ffi, params};
use tracing::warn;

use super::{
    AbiGeneration, EngineCapabilities, InstalledModule, TableTokenizer, TokenizerAbi,
    collect_args, input_bytes, table_options,
};
use crate::{
    error::{FtsError, Result},
    registry::Registration,
    types::{OptionMask, Token, TokenizeMode},
};

/// `sqlite3_tokenizer_module` version 0 followed by the registration it serves.
/// SQLite never reads past `x_next` for version 0 modules.
#[repr(C)]
#[allow(dead_code)]
struct Fts3Module {
    version: c_int,
    x_create: Option<
        unsafe extern "C" fn(c_int, *const *const c_char, *mut *mut Fts3Tokenizer) -> c_int,
    >,
    x_destroy: Option<unsafe extern "C" fn(*mut Fts3Tokenizer) -> c_int>,
    x_open: Option<
        unsafe extern "C" fn(
            *mut Fts3Tokenizer,
            *const c_char,
            c_int,
            *mut *mut Fts3Cursor,
        ) -> c_int,
    >,
    x_close: Option<unsafe extern "C" fn(*mut Fts3Cursor) -> c_int>,
    x_next: Option<
        unsafe extern "C" fn(
            *mut Fts3Cursor,
            *mut *const c_char,
            *mut c_int,
            *mut c_int,
            *mut c_int,
            *mut c_int,
        ) -> c_int,
    >,
    registration: Arc<Registration>,
}

/// Starts with `sqlite3_tokenizer`; SQLite fills in `module` after `x_create`.
#[repr(C)]
struct Fts3Tokenizer {
    module: *const Fts3Module,
    options: Option<OptionMask>,
}

/// Starts with `sqlite3_tokenizer_cursor`; SQLite fills in `tokenizer` after
/// `x_open`.
#[repr(C)]
struct Fts3Cursor {
    #[allow(dead_code)]
    tokenizer: *mut Fts3Tokenizer,
    tokens: Vec<Token>,
    next: usize,
    position: c_int,
}

/// `fts3_tokenizer()` registration, shared by FTS3 and FTS4 tables.
pub struct Fts3Abi;

impl TokenizerAbi for Fts3Abi {
    fn generation(&self) -> AbiGeneration {
        AbiGeneration::Fts3
    }

    fn check(&self, capabilities: &EngineCapabilities) -> Result<()> {
        if capabilities.fts3_tokenizer {
            Ok(())
        } else {
            Err(FtsError::UnsupportedVersion(
                "fts3 tokenizer modules are not available".to_string(),
            ))
        }
    }

    fn install(
        &self,
        conn: &Connection,
        registration: &Arc<Registration>,
    ) -> Result<Option<InstalledModule>> {
        let module = Box::new(Fts3Module {
            version: 0,
            x_create: Some(x_create),
            x_destroy: Some(x_destroy),
            x_open: Some(x_open),
            x_close: Some(x_close),
            x_next: Some(x_next),
            registration: registration.clone(),
        });
        let address = &*module as *const Fts3Module as usize;

        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FTS3_TOKENIZER, true)?;
        conn.query_row(
            "SELECT fts3_tokenizer(?1, ?2)",
            params![registration.name(), &address.to_ne_bytes()[..]],
            |_| Ok(()),
        )?;
        Ok(Some(InstalledModule::new(module)))
    }
}

unsafe extern "C" fn x_create(
    argc: c_int,
    argv: *const *const c_char,
    out: *mut *mut Fts3Tokenizer,
) -> c_int {
    if out.is_null() {
        return ffi::SQLITE_MISUSE;
    }
    let args = unsafe { collect_args(argv, argc) };
    let tokenizer = Box::new(Fts3Tokenizer {
        module: ptr::null(),
        options: table_options("fts3", &args),
    });
    unsafe { *out = Box::into_raw(tokenizer) };
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_destroy(tokenizer: *mut Fts3Tokenizer) -> c_int {
    if !tokenizer.is_null() {
        drop(unsafe { Box::from_raw(tokenizer) });
    }
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_open(
    tokenizer: *mut Fts3Tokenizer,
    text: *const c_char,
    text_len: c_int,
    out: *mut *mut Fts3Cursor,
) -> c_int {
    if tokenizer.is_null() || out.is_null() {
        return ffi::SQLITE_MISUSE;
    }
    let tokenizer_ref = unsafe { &*tokenizer };
    if tokenizer_ref.module.is_null() {
        return ffi::SQLITE_MISUSE;
    }
    let registration = unsafe { &(*tokenizer_ref.module).registration };
    let input = unsafe { input_bytes(text, text_len) };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        TableTokenizer::new(registration, tokenizer_ref.options)
            .enumerator()
            .tokens(input, TokenizeMode::Document)
    }));
    let tokens = match outcome {
        Ok(Ok(tokens)) => tokens,
        Ok(Err(err)) => {
            warn!(tokenizer = registration.name(), error = %err, "fts3 tokenization failed");
            return err.sqlite_code();
        }
        Err(_) => return ffi::SQLITE_ERROR,
    };

    let cursor = Box::new(Fts3Cursor {
        tokenizer,
        tokens,
        next: 0,
        position: -1,
    });
    unsafe { *out = Box::into_raw(cursor) };
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_close(cursor: *mut Fts3Cursor) -> c_int {
    if !cursor.is_null() {
        drop(unsafe { Box::from_raw(cursor) });
    }
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_next(
    cursor: *mut Fts3Cursor,
    token_out: *mut *const c_char,
    len_out: *mut c_int,
    start_out: *mut c_int,
    end_out: *mut c_int,
    position_out: *mut c_int,
) -> c_int {
    if cursor.is_null() {
        return ffi::SQLITE_MISUSE;
    }
    let cursor = unsafe { &mut *cursor };
    let Some(token) = cursor.tokens.get(cursor.next) else {
        return ffi::SQLITE_DONE;
    };
    cursor.next += 1;
    // Colocated variants share the position of the token before them.
    if token.colocation.is_original() || cursor.position < 0 {
        cursor.position += 1;
    }

    unsafe {
        if !token_out.is_null() {
            *token_out = token.text.as_ptr().cast::<c_char>();
        }
        if !len_out.is_null() {
            *len_out = token.text.len() as c_int;
        }
        if !start_out.is_null() {
            *start_out = token.start as c_int;
        }
        if !end_out.is_null() {
            *end_out = token.end as c_int;
        }
        if !position_out.is_null() {
            *position_out = cursor.position;
        }
    }
    ffi::SQLITE_OK
}
