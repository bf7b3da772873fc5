use std::sync::Arc;

use once_cell::sync::Lazy;
use unicode_normalization::UnicodeNormalization;

/// Text the script strategies run on, plus the way back to source offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    /// Source character span for every byte of `text`; empty when `text` is the source.
    origins: Vec<(usize, usize)>,
}

impl NormalizedText {
    pub fn identity(source: &str) -> Self {
        Self {
            text: source.to_string(),
            origins: Vec::new(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.origins.is_empty()
    }

    /// Maps a byte range of the normalized text back onto the source buffer.
    pub fn source_span(&self, start: usize, end: usize) -> (usize, usize) {
        if self.is_identity() || start >= end {
            return (start, end);
        }
        (self.origins[start].0, self.origins[end - 1].1)
    }
}

pub trait TextNormalizer: Send + Sync {
    fn normalize(&self, source: &str) -> NormalizedText;
}

#[derive(Default)]
pub struct IdentityNormalizer;

impl TextNormalizer for IdentityNormalizer {
    fn normalize(&self, source: &str) -> NormalizedText {
        NormalizedText::identity(source)
    }
}

/// Full-width to half-width and case folding, one source character at a time so
/// every output byte can be traced back to the character that produced it.
#[derive(Default)]
pub struct WidthCaseNormalizer;

impl TextNormalizer for WidthCaseNormalizer {
    fn normalize(&self, source: &str) -> NormalizedText {
        if source.is_ascii() && !source.bytes().any(|b| b.is_ascii_uppercase()) {
            return NormalizedText::identity(source);
        }

        let mut text = String::with_capacity(source.len());
        let mut origins = Vec::with_capacity(source.len());
        let mut buf = [0u8; 4];

        for (orig_byte, ch) in source.char_indices() {
            let span = (orig_byte, orig_byte + ch.len_utf8());
            for folded in fold_char(ch) {
                text.push_str(folded.encode_utf8(&mut buf));
                origins.extend(std::iter::repeat_n(span, folded.len_utf8()));
            }
        }

        NormalizedText { text, origins }
    }
}

fn fold_char(ch: char) -> impl Iterator<Item = char> {
    ch.to_string()
        .nfkc()
        .flat_map(|c| c.to_lowercase())
        .collect::<Vec<_>>()
        .into_iter()
}

/// The comparison form shared by `FullWidth` tokens and the highlighter.
pub fn fold(text: &str) -> String {
    text.chars().flat_map(fold_char).collect()
}

pub type TextNormalizerRef = Arc<dyn TextNormalizer>;

static IDENTITY_NORMALIZER: Lazy<TextNormalizerRef> = Lazy::new(|| Arc::new(IdentityNormalizer));
static WIDTH_CASE_NORMALIZER: Lazy<TextNormalizerRef> =
    Lazy::new(|| Arc::new(WidthCaseNormalizer));

pub fn identity_normalizer() -> TextNormalizerRef {
    IDENTITY_NORMALIZER.clone()
}

pub fn width_case_normalizer() -> TextNormalizerRef {
    WIDTH_CASE_NORMALIZER.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_full_width_and_case() {
        assert_eq!(fold("ＡＢＣ１２３"), "abc123");
        assert_eq!(fold("Hello"), "hello");
        assert_eq!(fold("你好"), "你好");
    }

    #[test]
    fn maps_normalized_bytes_back_to_source_chars() {
        let source = "ＡＢ c";
        let normalized = WidthCaseNormalizer.normalize(source);
        assert_eq!(normalized.text, "ab c");
        // "ab" came from two 3-byte full-width letters.
        assert_eq!(normalized.source_span(0, 2), (0, 6));
        assert_eq!(normalized.source_span(3, 4), (7, 8));
    }

    #[test]
    fn plain_lowercase_ascii_stays_identity() {
        let normalized = WidthCaseNormalizer.normalize("already lower");
        assert!(normalized.is_identity());
        assert_eq!(normalized.source_span(2, 5), (2, 5));
    }
}
