use std::{path::Path, sync::Arc};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    engine::{AbiGeneration, EngineCapabilities},
    error::Result,
    highlight::{HighlightOptions, HighlightStyle, Highlighter, Row, StyledText},
    pipeline::{Expander, LexiconSegmenter, PinyinExpander, Segmenter},
    registry::{Registration, Registry},
    tokenizer::{LexiconSlot, process_lexicon},
    types::OptionMask,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// ABIs every registration is installed with.
    pub generations: Vec<AbiGeneration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            generations: vec![AbiGeneration::Fts5, AbiGeneration::Fts3],
        }
    }
}

/// A connection and the tokenizers registered on it.
pub struct FtsSession {
    // Closed before `registry` releases the modules SQLite points at.
    conn: Connection,
    registry: Registry,
    lexicon: Arc<LexiconSlot>,
}

impl FtsSession {
    pub fn new(conn: Connection) -> Self {
        Self::with_config(conn, &SessionConfig::default())
    }

    pub fn with_config(conn: Connection, config: &SessionConfig) -> Self {
        let abis = config.generations.iter().map(AbiGeneration::abi).collect();
        Self {
            conn,
            registry: Registry::new(abis),
            lexicon: process_lexicon(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Connection::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Tokenizers registered afterwards read `lexicon` instead of the process-wide
    /// slot.
    pub fn with_lexicon(mut self, lexicon: Arc<LexiconSlot>) -> Self {
        self.lexicon = lexicon;
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn capabilities(&self) -> Result<EngineCapabilities> {
        EngineCapabilities::probe(&self.conn)
    }

    /// Registers the lexicon segmenter with pinyin expansion under `name`.
    pub fn register(&mut self, name: &str, options: OptionMask) -> Result<Arc<Registration>> {
        let segmenter = Arc::new(LexiconSegmenter::new(self.lexicon.clone()));
        self.register_with(name, segmenter, Arc::new(PinyinExpander::new()), options)
    }

    pub fn register_with(
        &mut self,
        name: &str,
        segmenter: Arc<dyn Segmenter>,
        expander: Arc<dyn Expander>,
        options: OptionMask,
    ) -> Result<Arc<Registration>> {
        self.registry
            .register(&self.conn, name, segmenter, expander, options)
    }

    pub fn find(&self, name: &str) -> Option<Arc<Registration>> {
        self.registry.find(name)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<Registration>> {
        self.registry.lookup(name)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn highlight<R: Row>(
        &self,
        rows: &[R],
        field: &str,
        keyword: &str,
        pinyin_max_len: usize,
        tokenizer: &str,
        style: &HighlightStyle,
    ) -> Result<Vec<StyledText>> {
        self.highlight_with(
            rows,
            field,
            keyword,
            pinyin_max_len,
            tokenizer,
            style,
            HighlightOptions::default(),
        )
    }

    /// An unknown tokenizer leaves every row unstyled.
    #[allow(clippy::too_many_arguments)]
    pub fn highlight_with<R: Row>(
        &self,
        rows: &[R],
        field: &str,
        keyword: &str,
        pinyin_max_len: usize,
        tokenizer: &str,
        style: &HighlightStyle,
        options: HighlightOptions,
    ) -> Result<Vec<StyledText>> {
        let Some(registration) = self.find(tokenizer) else {
            warn!(tokenizer, "highlighting with an unknown tokenizer");
            return Ok(rows
                .iter()
                .map(|row| {
                    let text = row.field(field).unwrap_or_default();
                    StyledText::plain(text.into_owned(), &style.normal)
                })
                .collect());
        };

        Highlighter::new(
            registration.enumerator(),
            keyword,
            pinyin_max_len,
            style.clone(),
        )?
        .with_options(options)
        .highlight_rows(rows, field)
    }
}
