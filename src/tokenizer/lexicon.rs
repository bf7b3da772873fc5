use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use jieba_rs::{Jieba, TokenizeMode as JiebaMode};
use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FtsError, Result};

/// Frequency given to words added without one.
pub const DEFAULT_WORD_FREQ: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconWord {
    pub word: String,
    #[serde(default)]
    pub freq: Option<usize>,
}

/// Serializable description of how to build a [`Lexicon`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconConfig {
    pub version: Option<String>,
    /// Start from the dictionary shipped with jieba.
    #[serde(default = "default_bundled")]
    pub bundled: bool,
    /// Extra dictionary in jieba's `word [freq [tag]]` line format.
    #[serde(default)]
    pub dictionary_path: Option<PathBuf>,
    #[serde(default)]
    pub words: Vec<LexiconWord>,
}

fn default_bundled() -> bool {
    true
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            version: None,
            bundled: true,
            dictionary_path: None,
            words: Vec::new(),
        }
    }
}

impl LexiconConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Word lexicon used to segment Han runs.
pub struct Lexicon {
    jieba: Jieba,
    version: Option<String>,
}

impl fmt::Debug for Lexicon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lexicon")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Lexicon {
    /// The dictionary shipped with jieba.
    pub fn bundled() -> Self {
        Self {
            jieba: Jieba::new(),
            version: Some("bundled".to_string()),
        }
    }

    /// A lexicon holding only `words`.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut jieba = Jieba::empty();
        for word in words {
            jieba.add_word(word.as_ref(), Some(DEFAULT_WORD_FREQ), None);
        }
        Self {
            jieba,
            version: None,
        }
    }

    /// Reads a dictionary in jieba's line format.
    pub fn from_reader<R: BufRead>(reader: &mut R) -> Result<Self> {
        let jieba = Jieba::with_dict(reader).map_err(|err| FtsError::Lexicon(err.to_string()))?;
        Ok(Self {
            jieba,
            version: None,
        })
    }

    pub fn from_config(config: &LexiconConfig) -> Result<Self> {
        let mut jieba = if config.bundled {
            Jieba::new()
        } else {
            Jieba::empty()
        };
        if let Some(path) = &config.dictionary_path {
            let mut reader = BufReader::new(File::open(path)?);
            jieba
                .load_dict(&mut reader)
                .map_err(|err| FtsError::Lexicon(format!("{}: {err}", path.display())))?;
        }
        for entry in &config.words {
            jieba.add_word(
                &entry.word,
                Some(entry.freq.unwrap_or(DEFAULT_WORD_FREQ)),
                None,
            );
        }
        Ok(Self {
            jieba,
            version: config.version.clone(),
        })
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Splits a Han run into words, returning byte ranges relative to `text`.
    ///
    /// Ranges are contiguous and cover the whole input.
    pub fn segment(&self, text: &str) -> Vec<(usize, usize)> {
        let mut char_byte_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        char_byte_offsets.push(text.len());

        self.jieba
            .tokenize(text, JiebaMode::Default, false)
            .into_iter()
            .map(|token| (char_byte_offsets[token.start], char_byte_offsets[token.end]))
            .collect()
    }
}

/// A write-once holder for the lexicon. Segmenters read it on every call and fail
/// with [`FtsError::ResourceNotReady`] until something has been preloaded.
pub struct LexiconSlot {
    cell: OnceCell<Arc<Lexicon>>,
}

impl Default for LexiconSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconSlot {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Result<Arc<Lexicon>> {
        self.cell.get().cloned().ok_or(FtsError::ResourceNotReady)
    }

    /// Loads the bundled lexicon. Later calls return the lexicon already held.
    pub fn preload(&self) -> Arc<Lexicon> {
        self.cell
            .get_or_init(|| {
                let started = Instant::now();
                let lexicon = Lexicon::bundled();
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "lexicon loaded");
                Arc::new(lexicon)
            })
            .clone()
    }

    /// Loads a lexicon built by `build` unless one is already held, in which case
    /// `build` is not called.
    pub fn preload_with<F>(&self, build: F) -> Result<Arc<Lexicon>>
    where
        F: FnOnce() -> Result<Lexicon>,
    {
        self.cell
            .get_or_try_init(|| {
                let lexicon = build()?;
                debug!(version = ?lexicon.version(), "lexicon installed");
                Ok(Arc::new(lexicon))
            })
            .cloned()
    }
}

static PROCESS_LEXICON: Lazy<Arc<LexiconSlot>> = Lazy::new(|| Arc::new(LexiconSlot::new()));

/// The slot shared by every tokenizer registered without its own.
pub fn process_lexicon() -> Arc<LexiconSlot> {
    PROCESS_LEXICON.clone()
}
