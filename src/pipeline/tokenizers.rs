use std::collections::HashMap;

use super::{
    super::tokenizer::{
        Lexicon, SegmentScript, script_runs, tokenize_chars, tokenize_chinese, tokenize_run,
        tokenize_words,
    },
    super::types::Segment,
    OptionMask, TokenDraft,
};

/// What a strategy may consult besides the run itself.
pub struct SegmentContext<'a> {
    pub lexicon: &'a Lexicon,
    pub options: OptionMask,
}

pub trait ScriptTokenizerStrategy: Send + Sync {
    fn tokenize(
        &self,
        segment: &Segment<'_>,
        context: &SegmentContext<'_>,
        out: &mut Vec<TokenDraft>,
    );
}

pub struct DefaultScriptSegmenter;

impl DefaultScriptSegmenter {
    pub fn segment<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        script_runs(text)
            .into_iter()
            .map(|(script, start, end)| Segment {
                script,
                text: &text[start..end],
                offset: start,
            })
            .collect()
    }
}

pub struct HanTokenizer;

impl ScriptTokenizerStrategy for HanTokenizer {
    fn tokenize(
        &self,
        segment: &Segment<'_>,
        context: &SegmentContext<'_>,
        out: &mut Vec<TokenDraft>,
    ) {
        tokenize_chinese(segment.text, segment.offset, context.lexicon, out);
    }
}

pub struct KanaTokenizer;

impl ScriptTokenizerStrategy for KanaTokenizer {
    fn tokenize(
        &self,
        segment: &Segment<'_>,
        _context: &SegmentContext<'_>,
        out: &mut Vec<TokenDraft>,
    ) {
        tokenize_chars(segment.text, segment.offset, out);
    }
}

pub struct HangulTokenizer;

impl ScriptTokenizerStrategy for HangulTokenizer {
    fn tokenize(
        &self,
        segment: &Segment<'_>,
        _context: &SegmentContext<'_>,
        out: &mut Vec<TokenDraft>,
    ) {
        tokenize_run(segment.text, segment.offset, out);
    }
}

pub struct WordTokenizer;

impl ScriptTokenizerStrategy for WordTokenizer {
    fn tokenize(
        &self,
        segment: &Segment<'_>,
        context: &SegmentContext<'_>,
        out: &mut Vec<TokenDraft>,
    ) {
        let merge_digits = context.options.contains(OptionMask::NUMBER);
        tokenize_words(segment.text, segment.offset, merge_digits, out);
    }
}

/// Punctuation and anything else without a dedicated strategy.
pub struct SymbolTokenizer;

impl ScriptTokenizerStrategy for SymbolTokenizer {
    fn tokenize(
        &self,
        segment: &Segment<'_>,
        _context: &SegmentContext<'_>,
        out: &mut Vec<TokenDraft>,
    ) {
        tokenize_chars(segment.text, segment.offset, out);
    }
}

pub struct SkipTokenizer;

impl ScriptTokenizerStrategy for SkipTokenizer {
    fn tokenize(
        &self,
        _segment: &Segment<'_>,
        _context: &SegmentContext<'_>,
        _out: &mut Vec<TokenDraft>,
    ) {
    }
}

pub struct DefaultTokenizer {
    pub(crate) tokenizers: HashMap<SegmentScript, Box<dyn ScriptTokenizerStrategy>>,
    pub(crate) fallback: Box<dyn ScriptTokenizerStrategy>,
}

impl Default for DefaultTokenizer {
    fn default() -> Self {
        Self::with_default_scripts()
    }
}

impl DefaultTokenizer {
    pub fn with_default_scripts() -> Self {
        Self::new(Box::new(SymbolTokenizer))
            .register_script_tokenizer(SegmentScript::Han, HanTokenizer)
            .register_script_tokenizer(SegmentScript::Hiragana, KanaTokenizer)
            .register_script_tokenizer(SegmentScript::Katakana, KanaTokenizer)
            .register_script_tokenizer(SegmentScript::Hangul, HangulTokenizer)
            .register_script_tokenizer(SegmentScript::Word, WordTokenizer)
            .register_script_tokenizer(SegmentScript::Space, SkipTokenizer)
    }

    pub fn new(fallback: Box<dyn ScriptTokenizerStrategy>) -> Self {
        Self {
            tokenizers: HashMap::new(),
            fallback,
        }
    }

    pub fn register_script_tokenizer<T>(mut self, script: SegmentScript, tokenizer: T) -> Self
    where
        T: ScriptTokenizerStrategy + 'static,
    {
        self.tokenizers.insert(script, Box::new(tokenizer));
        self
    }

    pub fn tokenize_segment(
        &self,
        segment: &Segment<'_>,
        context: &SegmentContext<'_>,
        out: &mut Vec<TokenDraft>,
    ) {
        match self.tokenizers.get(&segment.script) {
            Some(tokenizer) => tokenizer.tokenize(segment, context, out),
            None => self.fallback.tokenize(segment, context, out),
        }
    }
}
