use std::sync::Arc;

mod derivers;
mod enumerator;
mod tokenizers;

pub use derivers::{Expander, NoopExpander, PinyinExpander};
pub use enumerator::Enumerator;
pub use tokenizers::{
    DefaultScriptSegmenter, DefaultTokenizer, HanTokenizer, HangulTokenizer, KanaTokenizer,
    ScriptTokenizerStrategy, SegmentContext, SkipTokenizer, SymbolTokenizer, WordTokenizer,
};

use super::{
    error::Result,
    tokenizer::{
        LexiconSlot, NormalizedText, identity_normalizer, process_lexicon, width_case_normalizer,
    },
    types::{Colocation, OptionMask, Token, TokenDraft, sort_tokens},
};

/// Splits text into `Original` tokens (plus `FullWidth` variants when the text was
/// normalized first).
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str, options: OptionMask) -> Result<Vec<Token>>;

    /// Same as [`Segmenter::segment`] for raw engine buffers.
    fn segment_bytes(&self, input: &[u8], options: OptionMask) -> Result<Vec<Token>> {
        let text = std::str::from_utf8(input)?;
        self.segment(text, options)
    }
}

/// The lexicon-backed segmenter: script runs, one strategy per script, and offset
/// reconciliation back to the source buffer.
pub struct LexiconSegmenter {
    lexicon: Arc<LexiconSlot>,
    segmenter: DefaultScriptSegmenter,
    tokenizer: DefaultTokenizer,
}

impl LexiconSegmenter {
    pub fn new(lexicon: Arc<LexiconSlot>) -> Self {
        Self::with_tokenizer(lexicon, DefaultTokenizer::with_default_scripts())
    }

    /// Reads through the process-wide lexicon slot.
    pub fn process() -> Self {
        Self::new(process_lexicon())
    }

    pub fn with_tokenizer(lexicon: Arc<LexiconSlot>, tokenizer: DefaultTokenizer) -> Self {
        Self {
            lexicon,
            segmenter: DefaultScriptSegmenter,
            tokenizer,
        }
    }
}

impl Segmenter for LexiconSegmenter {
    fn segment(&self, text: &str, options: OptionMask) -> Result<Vec<Token>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let lexicon = self.lexicon.get()?;

        let normalizer = if options.contains(OptionMask::TRANSFORM) {
            width_case_normalizer()
        } else {
            identity_normalizer()
        };
        let normalized = normalizer.normalize(text);

        let context = SegmentContext {
            lexicon: &lexicon,
            options,
        };
        let mut drafts = Vec::new();
        for segment in self.segmenter.segment(&normalized.text) {
            self.tokenizer
                .tokenize_segment(&segment, &context, &mut drafts);
        }

        let mut tokens = reconcile(text, &normalized, &drafts);
        sort_tokens(&mut tokens);
        Ok(tokens)
    }
}

struct Piece {
    source: (usize, usize),
    normalized: (usize, usize),
    text: String,
}

/// Maps drafts back onto `source`, coalescing those that land in the same source
/// characters, then covers any non-whitespace source character the strategies
/// left out. Draft text that differs from the source becomes the `FullWidth`
/// variant.
fn reconcile(source: &str, normalized: &NormalizedText, drafts: &[TokenDraft]) -> Vec<Token> {
    let mut pieces: Vec<Piece> = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let (start, end) = normalized.source_span(draft.span.0, draft.span.1);
        match pieces.last_mut() {
            Some(last) if start < last.source.1 => {
                if draft.span.0 >= last.normalized.1 {
                    last.text.push_str(&draft.text);
                } else if draft.span.1 > last.normalized.1 {
                    // Overlapping drafts only contribute what lies past the piece.
                    last.text.push_str(&normalized.text[last.normalized.1..draft.span.1]);
                }
                last.source.1 = last.source.1.max(end);
                last.normalized.1 = last.normalized.1.max(draft.span.1);
            }
            _ => pieces.push(Piece {
                source: (start, end),
                normalized: draft.span,
                text: draft.text.clone(),
            }),
        }
    }

    let mut tokens = Vec::with_capacity(pieces.len());
    let mut covered = vec![false; source.len()];
    for piece in &pieces {
        let (start, end) = piece.source;
        let original = Token::original(&source[start..end], start, end);
        if piece.text != original.text {
            tokens.push(original.colocated(piece.text.as_str(), Colocation::FullWidth));
        }
        tokens.push(original);
        covered[start..end].iter_mut().for_each(|c| *c = true);
    }

    for (offset, ch) in source.char_indices() {
        if ch.is_whitespace() || covered[offset] {
            continue;
        }
        tokens.push(Token::original(ch.to_string(), offset, offset + ch.len_utf8()));
    }

    tokens
}

/// Convenience for callers that only need `Original` spans.
pub fn original_tokens(tokens: &[Token]) -> impl Iterator<Item = &Token> {
    tokens.iter().filter(|t| t.colocation.is_original())
}
