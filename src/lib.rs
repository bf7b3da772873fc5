mod engine;
mod error;
mod highlight;
mod pipeline;
mod registry;
mod session;
mod tokenizer;
mod types;

use std::sync::Arc;

pub use engine::{
    AbiGeneration, EngineCapabilities, Fts3Abi, Fts5Abi, MIN_FTS5_API_VERSION, TokenizerAbi,
    mode_from_fts5_flags,
};
pub use error::{FtsError, Result};
pub use highlight::{
    HighlightOptions, HighlightStyle, Highlighter, Row, StyleAttributes, StyledSpan, StyledText,
    highlight,
};
pub use pipeline::{
    DefaultScriptSegmenter, DefaultTokenizer, Enumerator, Expander, HanTokenizer,
    HangulTokenizer, KanaTokenizer, LexiconSegmenter, NoopExpander, PinyinExpander,
    ScriptTokenizerStrategy, SegmentContext, Segmenter, SkipTokenizer, SymbolTokenizer,
    WordTokenizer, original_tokens,
};
pub use registry::{RESERVED_TOKENIZER_NAMES, Registration, Registry, is_reserved_name};
pub use session::{FtsSession, SessionConfig};
pub use tokenizer::{
    IdentityNormalizer, Lexicon, LexiconConfig, LexiconSlot, LexiconWord, NormalizedText, Reading,
    SYLLABLE_SEPARATOR, SegmentScript, SyllableTable, TextNormalizer, TextNormalizerRef,
    WidthCaseNormalizer, build_reading, classify_script, fold, join_syllables, process_lexicon, syllable_table,
};
pub use types::{
    Colocation, DEFAULT_PINYIN_MAX_LEN, OptionMask, Segment, Token, TokenDraft, TokenizeMode,
    sort_tokens,
};

/// Loads the bundled lexicon into the process-wide slot. Calling it again is cheap.
pub fn preload() -> Arc<Lexicon> {
    process_lexicon().preload()
}

/// Loads a configured lexicon into the process-wide slot unless one is already
/// loaded.
pub fn preload_with_config(config: &LexiconConfig) -> Result<Arc<Lexicon>> {
    process_lexicon().preload_with(|| Lexicon::from_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Enumerator {
        let slot = Arc::new(LexiconSlot::new());
        slot.preload_with(|| Ok(Lexicon::from_words(["中文", "搜索", "拼音"])))
            .expect("fixture lexicon");
        Enumerator::new(
            Arc::new(LexiconSegmenter::new(slot)),
            Arc::new(PinyinExpander::new()),
            OptionMask::pinyin(DEFAULT_PINYIN_MAX_LEN),
        )
    }

    fn texts(tokens: &[Token], colocation: Colocation) -> Vec<&str> {
        tokens
            .iter()
            .filter(|t| t.colocation == colocation)
            .map(|t| t.text.as_str())
            .collect()
    }

    #[test]
    fn mixed_document_gets_pinyin_and_words() {
        let tokens = fixture()
            .tokens("中文搜索 FTS5".as_bytes(), TokenizeMode::Document)
            .expect("tokens");
        assert_eq!(texts(&tokens, Colocation::Original), vec!["中文", "搜索", "FTS", "5"]);
        assert_eq!(texts(&tokens, Colocation::FullPinyin), vec!["zhongwen", "sousuo"]);
        assert_eq!(texts(&tokens, Colocation::Abbreviation), vec!["zw", "ss"]);
        assert_eq!(texts(&tokens, Colocation::Syllable), vec!["zhong'wen", "sou'suo"]);
    }

    #[test]
    fn table_arguments_override_options() {
        let enumerator = fixture().with_options(OptionMask::NUMBER);
        let tokens = enumerator
            .tokens("拼音 2024".as_bytes(), TokenizeMode::Document)
            .expect("tokens");
        assert_eq!(texts(&tokens, Colocation::Original), vec!["拼音", "2024"]);
        assert!(tokens.iter().all(|t| !t.colocation.is_pinyin()));
    }

    #[test]
    fn query_and_document_sides_meet() {
        let enumerator = fixture();
        let document = enumerator
            .tokens("拼音".as_bytes(), TokenizeMode::Document)
            .expect("document");
        let query = enumerator
            .tokens(b"pinyin", TokenizeMode::Query)
            .expect("query");
        assert!(query.iter().any(|q| document.iter().any(|d| d.text == q.text)));
        assert_eq!(texts(&query, Colocation::Syllable), vec!["pin'yin"]);
    }

    #[test]
    fn script_strategies_can_be_swapped() {
        let slot = Arc::new(LexiconSlot::new());
        slot.preload_with(|| Ok(Lexicon::from_words(["中文"])))
            .expect("fixture lexicon");
        let tokenizer = DefaultTokenizer::new(Box::new(SymbolTokenizer))
            .register_script_tokenizer(SegmentScript::Han, HanTokenizer)
            .register_script_tokenizer(SegmentScript::Hangul, KanaTokenizer)
            .register_script_tokenizer(SegmentScript::Word, WordTokenizer)
            .register_script_tokenizer(SegmentScript::Space, SkipTokenizer);
        let enumerator = Enumerator::new(
            Arc::new(LexiconSegmenter::with_tokenizer(slot, tokenizer)),
            Arc::new(NoopExpander),
            OptionMask::empty(),
        );

        let tokens = enumerator
            .tokens("中文 한국어 ok".as_bytes(), TokenizeMode::Document)
            .expect("tokens");
        assert_eq!(
            texts(&tokens, Colocation::Original),
            vec!["中文", "한", "국", "어", "ok"]
        );

        let whole = fixture()
            .tokens("한국어".as_bytes(), TokenizeMode::Document)
            .expect("tokens");
        assert_eq!(texts(&whole, Colocation::Original), vec!["한국어"]);
    }

    #[test]
    fn shared_normalizers_fold_width_and_case() {
        let normalizer: TextNormalizerRef = Arc::new(WidthCaseNormalizer);
        let normalized = normalizer.normalize("ＦＴＳ５");
        assert_eq!(normalized.text, "fts5");
        assert_eq!(normalized.source_span(0, 3), (0, 9));
    }

    #[test]
    fn malformed_bytes_are_rejected() {
        let err = fixture()
            .tokens(&[0x61, 0xff, 0x62], TokenizeMode::Document)
            .unwrap_err();
        assert!(matches!(err, FtsError::MalformedInput { valid_up_to: 1 }));
    }
}
