use std::{
    ffi::{CString, c_char, c_int, c_void},
    ops::ControlFlow,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use rusqlite::{Connection, ffi};
use tracing::warn;

use super::{
    AbiGeneration, EngineCapabilities, InstalledModule, MIN_FTS5_API_VERSION, TableTokenizer,
    TokenizerAbi, collect_args, fts5_api, input_bytes, sqlite_failure, table_options,
};
use crate::{
    error::{FtsError, Result},
    registry::Registration,
    types::TokenizeMode,
};

type TokenCallback = unsafe extern "C" fn(
    ctx: *mut c_void,
    flags: c_int,
    token: *const c_char,
    token_len: c_int,
    start: c_int,
    end: c_int,
) -> c_int;

/// `fts5_api::xCreateTokenizer`.
pub struct Fts5Abi;

impl TokenizerAbi for Fts5Abi {
    fn generation(&self) -> AbiGeneration {
        AbiGeneration::Fts5
    }

    fn check(&self, capabilities: &EngineCapabilities) -> Result<()> {
        match capabilities.fts5_api_version {
            Some(version) if version >= MIN_FTS5_API_VERSION => Ok(()),
            Some(version) => Err(FtsError::UnsupportedVersion(format!(
                "fts5_api version {version}, need {MIN_FTS5_API_VERSION}"
            ))),
            None => Err(FtsError::UnsupportedVersion(
                "fts5 is not available".to_string(),
            )),
        }
    }

    fn install(
        &self,
        conn: &Connection,
        registration: &Arc<Registration>,
    ) -> Result<Option<InstalledModule>> {
        let api = fts5_api(conn)
            .ok_or_else(|| FtsError::UnsupportedVersion("fts5 is not available".to_string()))?;
        let name = CString::new(registration.name()).map_err(rusqlite::Error::from)?;

        let Some(create_tokenizer) = (unsafe { api.as_ref().xCreateTokenizer }) else {
            return Err(FtsError::UnsupportedVersion(
                "fts5_api has no xCreateTokenizer".to_string(),
            ));
        };

        // Copied by SQLite.
        let mut tokenizer = ffi::fts5_tokenizer {
            xCreate: Some(x_create),
            xDelete: Some(x_delete),
            xTokenize: Some(x_tokenize),
        };
        let user_data = Box::into_raw(Box::new(registration.clone())).cast::<c_void>();
        let rc = unsafe {
            create_tokenizer(
                api.as_ptr(),
                name.as_ptr(),
                user_data,
                &mut tokenizer,
                Some(destroy_registration),
            )
        };
        if rc != ffi::SQLITE_OK {
            // SQLite only calls the destructor for tokenizers it accepted.
            unsafe { destroy_registration(user_data) };
            return Err(sqlite_failure(rc, "fts5 xCreateTokenizer failed"));
        }
        Ok(None)
    }
}

/// Decodes the `flags` argument of `xTokenize`.
pub fn mode_from_fts5_flags(flags: c_int) -> TokenizeMode {
    let query = ffi::FTS5_TOKENIZE_QUERY as c_int;
    let prefix = ffi::FTS5_TOKENIZE_PREFIX as c_int;
    let aux = ffi::FTS5_TOKENIZE_AUX as c_int;

    if flags & query != 0 {
        if flags & prefix != 0 {
            TokenizeMode::Prefix
        } else {
            TokenizeMode::Query
        }
    } else if flags & aux != 0 {
        TokenizeMode::Aux
    } else {
        TokenizeMode::Document
    }
}

unsafe extern "C" fn destroy_registration(user_data: *mut c_void) {
    if !user_data.is_null() {
        drop(unsafe { Box::from_raw(user_data.cast::<Arc<Registration>>()) });
    }
}

unsafe extern "C" fn x_create(
    user_data: *mut c_void,
    argv: *mut *const c_char,
    argc: c_int,
    out: *mut *mut ffi::Fts5Tokenizer,
) -> c_int {
    if user_data.is_null() || out.is_null() {
        return ffi::SQLITE_MISUSE;
    }
    let registration = unsafe { &*user_data.cast::<Arc<Registration>>() };
    let args = unsafe { collect_args(argv.cast_const(), argc) };
    let options = table_options(registration.name(), &args);

    let table = Box::new(TableTokenizer::new(registration, options));
    unsafe { *out = Box::into_raw(table).cast::<ffi::Fts5Tokenizer>() };
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_delete(tokenizer: *mut ffi::Fts5Tokenizer) {
    if !tokenizer.is_null() {
        drop(unsafe { Box::from_raw(tokenizer.cast::<TableTokenizer>()) });
    }
}

unsafe extern "C" fn x_tokenize(
    tokenizer: *mut ffi::Fts5Tokenizer,
    ctx: *mut c_void,
    flags: c_int,
    text: *const c_char,
    text_len: c_int,
    callback: Option<TokenCallback>,
) -> c_int {
    let Some(callback) = callback else {
        return ffi::SQLITE_MISUSE;
    };
    if tokenizer.is_null() {
        return ffi::SQLITE_MISUSE;
    }
    let table = unsafe { &*tokenizer.cast::<TableTokenizer>() };
    let input = unsafe { input_bytes(text, text_len) };
    let mode = mode_from_fts5_flags(flags);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut rc = ffi::SQLITE_OK;
        let result = table.enumerator().enumerate(input, mode, |token| {
            let token_flags = if token.colocation.is_original() {
                0
            } else {
                ffi::FTS5_TOKEN_COLOCATED as c_int
            };
            rc = unsafe {
                callback(
                    ctx,
                    token_flags,
                    token.text.as_ptr().cast::<c_char>(),
                    token.text.len() as c_int,
                    token.start as c_int,
                    token.end as c_int,
                )
            };
            if rc == ffi::SQLITE_OK {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            }
        });
        match result {
            Ok(_) if rc == ffi::SQLITE_DONE => ffi::SQLITE_OK,
            Ok(_) => rc,
            Err(err) => {
                warn!(error = %err, "fts5 tokenization failed");
                err.sqlite_code()
            }
        }
    }));
    outcome.unwrap_or(ffi::SQLITE_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tokenize_flags() {
        let query = ffi::FTS5_TOKENIZE_QUERY as c_int;
        let prefix = ffi::FTS5_TOKENIZE_PREFIX as c_int;
        assert_eq!(mode_from_fts5_flags(query), TokenizeMode::Query);
        assert_eq!(mode_from_fts5_flags(query | prefix), TokenizeMode::Prefix);
        assert_eq!(
            mode_from_fts5_flags(ffi::FTS5_TOKENIZE_DOCUMENT as c_int),
            TokenizeMode::Document
        );
        assert_eq!(
            mode_from_fts5_flags(ffi::FTS5_TOKENIZE_AUX as c_int),
            TokenizeMode::Aux
        );
    }
}
