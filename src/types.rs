use std::{cmp::Ordering, fmt, ops::BitOr};

use serde::{Deserialize, Serialize};

use super::tokenizer::SegmentScript;

/// Pinyin cap used when a caller enables pinyin without choosing one.
pub const DEFAULT_PINYIN_MAX_LEN: usize = 15;

/// How a token relates to the source span it is anchored to.
///
/// Variants are listed in emission priority: for tokens sharing a start offset,
/// `Original` sorts first and `Syllable` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Colocation {
    /// Verbatim source text.
    Original,
    /// Width and case normalized form of the source text.
    FullWidth,
    /// Toneless pinyin reading, syllables concatenated.
    FullPinyin,
    /// First letter of every pinyin syllable.
    Abbreviation,
    /// Pinyin syllables joined with `'`.
    Syllable,
}

impl Colocation {
    pub fn is_original(&self) -> bool {
        matches!(self, Colocation::Original)
    }

    /// Returns true for the phonetic variants produced by the pinyin expander.
    pub fn is_pinyin(&self) -> bool {
        matches!(
            self,
            Colocation::FullPinyin | Colocation::Abbreviation | Colocation::Syllable
        )
    }
}

/// One segmented unit anchored to a half-open byte range of the source buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    /// Byte length of `text`; differs from `end - start` once normalization changed the text.
    pub length: usize,
    pub start: usize,
    pub end: usize,
    pub colocation: Colocation,
}

impl Token {
    pub fn new(text: impl Into<String>, start: usize, end: usize, colocation: Colocation) -> Self {
        let text = text.into();
        Self {
            length: text.len(),
            text,
            start,
            end,
            colocation,
        }
    }

    pub fn original(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self::new(text, start, end, Colocation::Original)
    }

    /// Builds a variant sharing this token's span.
    pub fn colocated(&self, text: impl Into<String>, colocation: Colocation) -> Self {
        Self::new(text, self.start, self.end, colocation)
    }

    pub fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.colocation.cmp(&other.colocation))
            .then_with(|| self.end.cmp(&other.end))
            .then_with(|| self.text.cmp(&other.text))
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>2}-{:>2}|{:>2}|{:?}]: {}",
            self.start, self.end, self.length, self.colocation, self.text
        )
    }
}

/// Sorts tokens into the order shared by the engine bridge and the highlighter.
pub fn sort_tokens(tokens: &mut [Token]) {
    tokens.sort();
}

/// Tokenizer options. The low 16 bits hold the pinyin maximum length (0 disables
/// pinyin); the higher bits are independent flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionMask(u32);

impl OptionMask {
    /// Merge digit runs into single tokens.
    pub const NUMBER: OptionMask = OptionMask(1 << 16);
    /// Width and case normalization before segmentation.
    pub const TRANSFORM: OptionMask = OptionMask(1 << 17);

    const PINYIN_BITS: u32 = 0xFFFF;
    const KNOWN_BITS: u32 = Self::PINYIN_BITS | Self::NUMBER.0 | Self::TRANSFORM.0;

    pub const fn empty() -> Self {
        OptionMask(0)
    }

    /// Unknown high bits are dropped.
    pub const fn from_bits(bits: u32) -> Self {
        OptionMask(bits & Self::KNOWN_BITS)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Pinyin enabled for inputs up to `max_len` characters.
    pub fn pinyin(max_len: usize) -> Self {
        OptionMask(max_len.min(Self::PINYIN_BITS as usize) as u32)
    }

    pub fn contains(&self, other: OptionMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn pinyin_max_len(&self) -> Option<usize> {
        match self.0 & Self::PINYIN_BITS {
            0 => None,
            len => Some(len as usize),
        }
    }

    pub fn with_pinyin_max_len(self, max_len: usize) -> Self {
        OptionMask(self.0 & !Self::PINYIN_BITS) | OptionMask::pinyin(max_len)
    }

    pub fn without_pinyin(self) -> Self {
        OptionMask(self.0 & !Self::PINYIN_BITS)
    }

    /// Reads a mask from tokenizer arguments. The last positive integer wins; other
    /// arguments are returned as locale hints.
    pub fn from_args<'a>(args: impl IntoIterator<Item = &'a str>) -> (Option<Self>, Vec<String>) {
        let mut mask = None;
        let mut hints = Vec::new();
        for arg in args {
            let arg = arg.trim();
            if arg.is_empty() {
                continue;
            }
            match arg.parse::<u32>() {
                Ok(bits) if bits > 0 => mask = Some(OptionMask::from_bits(bits)),
                _ => hints.push(arg.to_string()),
            }
        }
        (mask, hints)
    }
}

impl BitOr for OptionMask {
    type Output = OptionMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        OptionMask(self.0 | rhs.0)
    }
}

/// Why the engine is asking for tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenizeMode {
    /// Text being inserted into or removed from the index.
    Document,
    /// A query term.
    Query,
    /// A query term followed by `*`.
    Prefix,
    /// Auxiliary tokenization, e.g. for the engine's own highlight functions.
    Aux,
}

impl TokenizeMode {
    pub fn is_query(&self) -> bool {
        matches!(self, TokenizeMode::Query | TokenizeMode::Prefix)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    pub script: SegmentScript,
    pub text: &'a str,
    pub offset: usize,
}

/// Pre-mapping token: offsets still refer to the (possibly normalized) text the
/// strategies ran on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDraft {
    pub text: String,
    pub span: (usize, usize),
}
