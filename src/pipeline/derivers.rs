use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    tokenizer::{Reading, build_reading, fold, is_cjk_char, join_syllables, syllable_table},
    types::{Colocation, Token},
};

/// Derives colocated variants for `Original` tokens.
pub trait Expander: Send + Sync {
    /// Variants anchored to `token`'s span. Empty when the token is not Han or is
    /// longer than `max_len` characters.
    fn expand(&self, token: &Token, max_len: usize) -> Vec<Token>;

    /// Variants for a query-side token.
    fn expand_query(&self, _token: &Token) -> Vec<Token> {
        Vec::new()
    }
}

/// Never adds anything.
pub struct NoopExpander;

impl Expander for NoopExpander {
    fn expand(&self, _token: &Token, _max_len: usize) -> Vec<Token> {
        Vec::new()
    }
}

const PINYIN_CACHE_CAPACITY: usize = 512;

/// Adds pinyin variants to Han tokens. Readings are memoised per token text.
pub struct PinyinExpander {
    cache: Mutex<LruCache<String, Option<Reading>>>,
}

impl PinyinExpander {
    pub fn new() -> Self {
        Self::with_capacity(PINYIN_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn reading(&self, term: &str) -> Option<Reading> {
        let mut cache = self.cache.lock();
        if let Some(cached) = cache.get(term) {
            return cached.clone();
        }
        let computed = build_reading(term);
        cache.put(term.to_string(), computed.clone());
        computed
    }
}

impl Default for PinyinExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl Expander for PinyinExpander {
    fn expand(&self, token: &Token, max_len: usize) -> Vec<Token> {
        if !token.colocation.is_original()
            || token.text.is_empty()
            || !token.text.chars().all(is_cjk_char)
        {
            return Vec::new();
        }

        let char_len = token.text.chars().count();
        if char_len > max_len {
            debug!(
                start = token.start,
                end = token.end,
                char_len,
                max_len,
                "pinyin expansion skipped for long span"
            );
            return Vec::new();
        }

        let Some(reading) = self.reading(&token.text) else {
            return Vec::new();
        };

        let mut tokens = Vec::with_capacity(3);
        tokens.push(token.colocated(reading.full.clone(), Colocation::FullPinyin));
        if reading.abbreviation != reading.full {
            tokens.push(token.colocated(reading.abbreviation.clone(), Colocation::Abbreviation));
        }
        if reading.syllables.len() > 1 {
            tokens.push(token.colocated(reading.joined_syllables(), Colocation::Syllable));
        }
        tokens
    }

    fn expand_query(&self, token: &Token) -> Vec<Token> {
        if !token.colocation.is_original() || !token.text.is_ascii() {
            return Vec::new();
        }
        let folded = fold(&token.text);
        match syllable_table().split(&folded) {
            Some(syllables) if syllables.len() > 1 => {
                vec![token.colocated(join_syllables(&syllables), Colocation::Syllable)]
            }
            _ => Vec::new(),
        }
    }
}
