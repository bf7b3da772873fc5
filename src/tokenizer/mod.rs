use crate::types::TokenDraft;

pub mod lexicon;
mod normalize;
mod pinyin;
mod script;

pub use lexicon::{Lexicon, LexiconConfig, LexiconSlot, LexiconWord, process_lexicon};
pub use normalize::{
    IdentityNormalizer, NormalizedText, TextNormalizer, TextNormalizerRef, WidthCaseNormalizer,
    fold, identity_normalizer, width_case_normalizer,
};
pub use pinyin::{
    Reading, SYLLABLE_SEPARATOR, SyllableTable, build_reading, join_syllables, syllable_table,
};
pub use script::{SegmentScript, classify_script, is_cjk_char, script_runs};

pub(crate) fn tokenize_chinese(
    segment: &str,
    base_start: usize,
    lexicon: &Lexicon,
    out: &mut Vec<TokenDraft>,
) {
    for (start, end) in lexicon.segment(segment) {
        out.push(TokenDraft {
            text: segment[start..end].to_string(),
            span: (base_start + start, base_start + end),
        });
    }
}

/// One token per character.
pub(crate) fn tokenize_chars(segment: &str, base_start: usize, out: &mut Vec<TokenDraft>) {
    for (offset, ch) in segment.char_indices() {
        let start = base_start + offset;
        out.push(TokenDraft {
            text: ch.to_string(),
            span: (start, start + ch.len_utf8()),
        });
    }
}

/// The whole run as a single token.
pub(crate) fn tokenize_run(segment: &str, base_start: usize, out: &mut Vec<TokenDraft>) {
    if segment.is_empty() {
        return;
    }
    out.push(TokenDraft {
        text: segment.to_string(),
        span: (base_start, base_start + segment.len()),
    });
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum WordClass {
    Letter,
    Digit,
}

fn word_class(ch: char) -> WordClass {
    if ch.is_numeric() {
        WordClass::Digit
    } else {
        WordClass::Letter
    }
}

/// Splits alphanumeric runs at letter/digit changes. Digits become one token each
/// unless `merge_digits` is set.
pub(crate) fn tokenize_words(
    segment: &str,
    base_start: usize,
    merge_digits: bool,
    out: &mut Vec<TokenDraft>,
) {
    let mut push = |start: usize, end: usize| {
        out.push(TokenDraft {
            text: segment[start..end].to_string(),
            span: (base_start + start, base_start + end),
        });
    };

    let mut run: Option<(WordClass, usize)> = None;
    for (offset, ch) in segment.char_indices() {
        let class = word_class(ch);
        match run {
            Some((current, start)) if current == class => {
                if class == WordClass::Digit && !merge_digits {
                    push(start, offset);
                    run = Some((class, offset));
                }
            }
            Some((_, start)) => {
                push(start, offset);
                run = Some((class, offset));
            }
            None => run = Some((class, offset)),
        }
    }
    if let Some((_, start)) = run {
        push(start, segment.len());
    }
}
