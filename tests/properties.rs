use std::{collections::HashSet, sync::Arc};

use fts_cjk::{
    Colocation, DEFAULT_PINYIN_MAX_LEN, Enumerator, Expander, HighlightStyle, Highlighter,
    Lexicon, LexiconSegmenter, LexiconSlot, OptionMask, PinyinExpander, Token, TokenizeMode,
    sort_tokens,
};
use once_cell::sync::Lazy;
use proptest::prelude::*;

static SLOT: Lazy<Arc<LexiconSlot>> = Lazy::new(|| {
    let slot = Arc::new(LexiconSlot::new());
    slot.preload_with(|| {
        Ok(Lexicon::from_words([
            "你好", "世界", "中文", "搜索", "拼音", "全文", "分词",
        ]))
    })
    .expect("fixture lexicon");
    slot
});

fn enumerator(options: OptionMask) -> Enumerator {
    Enumerator::new(
        Arc::new(LexiconSegmenter::new(SLOT.clone())),
        Arc::new(PinyinExpander::new()),
        options,
    )
}

fn fragments() -> impl Strategy<Value = String> {
    let pieces = vec![
        "你好", "世界", "中文", "搜索", "拼音", "行长", "重", "こんにちは", "カタカナ", "한국어",
        "hello", "World", "FTS5", "2024", "ＡＢＣ", "１２", "½", "ﬁ", "，", "。", "!", "-", " ",
        "  ", "\n", "\t", "　",
    ];
    prop::collection::vec(prop::sample::select(pieces), 0..16).prop_map(|parts| parts.concat())
}

fn any_text() -> impl Strategy<Value = String> {
    prop_oneof![fragments(), "\\PC{0,24}"]
}

fn any_options() -> impl Strategy<Value = OptionMask> {
    (any::<bool>(), any::<bool>(), 0usize..20).prop_map(|(number, transform, pinyin)| {
        let mut options = OptionMask::pinyin(pinyin);
        if number {
            options = options | OptionMask::NUMBER;
        }
        if transform {
            options = options | OptionMask::TRANSFORM;
        }
        options
    })
}

fn originals(tokens: &[Token]) -> Vec<&Token> {
    tokens
        .iter()
        .filter(|t| t.colocation == Colocation::Original)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn originals_cover_non_whitespace_exactly_once(text in any_text(), options in any_options()) {
        let tokens = enumerator(options)
            .tokens(text.as_bytes(), TokenizeMode::Document)
            .expect("tokenize");

        let mut cover = vec![0u8; text.len()];
        for token in originals(&tokens) {
            prop_assert!(token.start < token.end && token.end <= text.len());
            prop_assert!(text.is_char_boundary(token.start) && text.is_char_boundary(token.end));
            prop_assert_eq!(&text[token.start..token.end], token.text.as_str());
            for byte in &mut cover[token.start..token.end] {
                *byte += 1;
            }
        }
        for (offset, ch) in text.char_indices() {
            let count = cover[offset];
            if ch.is_whitespace() {
                prop_assert!(count <= 1, "whitespace at {} covered {} times", offset, count);
            } else {
                prop_assert_eq!(count, 1, "char {:?} at {}", ch, offset);
            }
        }
    }

    #[test]
    fn span_and_colocation_never_repeat(text in any_text(), options in any_options()) {
        let tokens = enumerator(options)
            .tokens(text.as_bytes(), TokenizeMode::Document)
            .expect("tokenize");
        let mut seen = HashSet::new();
        for token in &tokens {
            prop_assert!(
                seen.insert((token.start, token.end, token.colocation)),
                "duplicate {:?}",
                token
            );
        }
    }

    #[test]
    fn colocated_tokens_follow_an_original(text in any_text(), options in any_options()) {
        let tokens = enumerator(options)
            .tokens(text.as_bytes(), TokenizeMode::Document)
            .expect("tokenize");
        for token in tokens.iter().filter(|t| !t.colocation.is_original()) {
            prop_assert!(
                tokens
                    .iter()
                    .any(|o| o.colocation.is_original() && o.span() == token.span()),
                "orphan {:?}",
                token
            );
        }
    }

    #[test]
    fn sorting_is_idempotent(text in any_text(), options in any_options()) {
        let tokens = enumerator(options)
            .tokens(text.as_bytes(), TokenizeMode::Document)
            .expect("tokenize");
        let mut sorted = tokens.clone();
        sort_tokens(&mut sorted);
        prop_assert_eq!(&sorted, &tokens);
        sort_tokens(&mut sorted);
        prop_assert_eq!(&sorted, &tokens);
    }

    #[test]
    fn expansion_is_deterministic(text in any_text()) {
        let tokens = enumerator(OptionMask::empty())
            .tokens(text.as_bytes(), TokenizeMode::Document)
            .expect("tokenize");
        let cached = PinyinExpander::with_capacity(4);
        let fresh = PinyinExpander::new();
        for token in originals(&tokens) {
            let first = cached.expand(token, DEFAULT_PINYIN_MAX_LEN);
            prop_assert_eq!(&cached.expand(token, DEFAULT_PINYIN_MAX_LEN), &first);
            prop_assert_eq!(&fresh.expand(token, DEFAULT_PINYIN_MAX_LEN), &first);
        }
    }

    #[test]
    fn originals_rebuild_the_input(text in any_text(), options in any_options()) {
        let enumerator = enumerator(options);
        let tokens = enumerator
            .tokens(text.as_bytes(), TokenizeMode::Document)
            .expect("tokenize");

        let mut rebuilt = String::with_capacity(text.len());
        for token in originals(&tokens) {
            let gap = &text[rebuilt.len()..token.start];
            prop_assert!(gap.chars().all(char::is_whitespace), "gap {:?}", gap);
            rebuilt.push_str(gap);
            rebuilt.push_str(&token.text);
        }
        let tail = &text[rebuilt.len()..];
        prop_assert!(tail.chars().all(char::is_whitespace));
        rebuilt.push_str(tail);
        prop_assert_eq!(&rebuilt, &text);

        let again = enumerator
            .tokens(rebuilt.as_bytes(), TokenizeMode::Document)
            .expect("tokenize again");
        prop_assert_eq!(again, tokens);
    }

    #[test]
    fn highlighted_runs_are_separate(text in fragments(), keyword in fragments()) {
        let highlighter = Highlighter::new(
            &enumerator(OptionMask::pinyin(DEFAULT_PINYIN_MAX_LEN)),
            &keyword,
            DEFAULT_PINYIN_MAX_LEN,
            HighlightStyle::default(),
        )
        .expect("keyword");
        let styled = highlighter.highlight_text(&text).expect("highlight");

        prop_assert_eq!(&styled.source, &text);
        let mut cursor = 0;
        for span in &styled.spans {
            prop_assert_eq!(span.range.start, cursor);
            prop_assert!(span.range.start < span.range.end);
            cursor = span.range.end;
        }
        prop_assert_eq!(cursor, text.len());

        let runs = styled.highlighted_ranges();
        for pair in runs.windows(2) {
            let between = &text[pair[0].end..pair[1].start];
            prop_assert!(!between.chars().all(char::is_whitespace), "unmerged {:?}", runs);
        }
    }
}

#[test]
fn empty_input_has_no_tokens() {
    for options in [
        OptionMask::empty(),
        OptionMask::pinyin(DEFAULT_PINYIN_MAX_LEN) | OptionMask::TRANSFORM,
    ] {
        let tokens = enumerator(options)
            .tokens(b"", TokenizeMode::Document)
            .expect("empty input");
        assert!(tokens.is_empty());
    }
}

#[test]
fn over_length_han_runs_get_no_pinyin() {
    let tokens = enumerator(OptionMask::pinyin(3))
        .tokens("你好世界中文".as_bytes(), TokenizeMode::Document)
        .expect("tokenize");
    assert!(!tokens.is_empty());
    assert!(tokens.iter().all(|t| !t.colocation.is_pinyin()));
}
