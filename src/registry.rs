use std::{collections::HashMap, fmt, sync::Arc};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::{
    engine::{EngineCapabilities, InstalledModule, TokenizerAbi},
    error::{FtsError, Result},
    pipeline::{Enumerator, Expander, Segmenter},
    types::OptionMask,
};

/// Tokenizer names SQLite ships with.
pub const RESERVED_TOKENIZER_NAMES: &[&str] =
    &["simple", "porter", "unicode61", "icu", "ascii", "trigram"];

pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_TOKENIZER_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// A named segmenter/expander pair and the options it runs with.
pub struct Registration {
    name: String,
    enumerator: Enumerator,
}

impl Registration {
    pub fn new(
        name: impl Into<String>,
        segmenter: Arc<dyn Segmenter>,
        expander: Arc<dyn Expander>,
        options: OptionMask,
    ) -> Self {
        Self {
            name: name.into(),
            enumerator: Enumerator::new(segmenter, expander, options),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> OptionMask {
        self.enumerator.options()
    }

    pub fn enumerator(&self) -> &Enumerator {
        &self.enumerator
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("options", &self.options())
            .finish_non_exhaustive()
    }
}

/// Tokenizers registered on one connection.
///
/// Modules handed to SQLite are kept here, including those of overwritten
/// registrations, because tables created earlier may still point at them. They are
/// released when the registry is dropped, which must happen after the connection
/// is closed.
pub struct Registry {
    abis: Vec<Box<dyn TokenizerAbi>>,
    entries: HashMap<String, Arc<Registration>>,
    installed: Vec<InstalledModule>,
}

impl Registry {
    pub(crate) fn new(abis: Vec<Box<dyn TokenizerAbi>>) -> Self {
        Self {
            abis,
            entries: HashMap::new(),
            installed: Vec::new(),
        }
    }

    /// Installs `name` with every configured ABI. A name that is already registered
    /// is overwritten.
    pub(crate) fn register(
        &mut self,
        conn: &Connection,
        name: &str,
        segmenter: Arc<dyn Segmenter>,
        expander: Arc<dyn Expander>,
        options: OptionMask,
    ) -> Result<Arc<Registration>> {
        if is_reserved_name(name) {
            return Err(FtsError::NameCollision(name.to_string()));
        }

        let capabilities = EngineCapabilities::probe(conn)?;
        for abi in &self.abis {
            abi.check(&capabilities)?;
        }

        let registration = Arc::new(Registration::new(name, segmenter, expander, options));
        for abi in &self.abis {
            if let Some(module) = abi.install(conn, &registration)? {
                self.installed.push(module);
            }
            debug!(tokenizer = name, abi = %abi.generation(), "tokenizer installed");
        }

        if self
            .entries
            .insert(name.to_string(), registration.clone())
            .is_some()
        {
            info!(tokenizer = name, options = options.bits(), "tokenizer re-registered");
        } else {
            info!(tokenizer = name, options = options.bits(), "tokenizer registered");
        }
        Ok(registration)
    }

    pub fn find(&self, name: &str) -> Option<Arc<Registration>> {
        self.entries.get(name).cloned()
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<Registration>> {
        self.find(name)
            .ok_or_else(|| FtsError::UnknownTokenizer(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
