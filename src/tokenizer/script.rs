use unicode_script::{Script as UniScript, UnicodeScript};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentScript {
    Han,
    Hiragana,
    Katakana,
    Hangul,
    /// Alphanumeric text of any other script (Latin, Cyrillic, digits, ...).
    Word,
    /// Punctuation, symbols and control characters.
    Symbol,
    Space,
}

pub fn classify_script(c: char) -> SegmentScript {
    if is_cjk_char(c) {
        return SegmentScript::Han;
    }
    if c.is_whitespace() {
        return SegmentScript::Space;
    }
    match c.script() {
        UniScript::Hiragana => SegmentScript::Hiragana,
        UniScript::Katakana => SegmentScript::Katakana,
        UniScript::Hangul => SegmentScript::Hangul,
        _ if c.is_alphanumeric() => SegmentScript::Word,
        _ => SegmentScript::Symbol,
    }
}

/// Maximal single-script runs of `text` as byte ranges.
pub fn script_runs(text: &str) -> Vec<(SegmentScript, usize, usize)> {
    let mut runs: Vec<(SegmentScript, usize, usize)> = Vec::new();
    for (offset, ch) in text.char_indices() {
        let script = classify_script(ch);
        let end = offset + ch.len_utf8();
        match runs.last_mut() {
            Some((current, _, run_end)) if *current == script => *run_end = end,
            _ => runs.push((script, offset, end)),
        }
    }
    runs
}

pub fn is_cjk_char(c: char) -> bool {
    matches!(
      c,
      '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}'
        | '\u{2A700}'..='\u{2B73F}'
        | '\u{2B740}'..='\u{2B81F}'
        | '\u{2B820}'..='\u{2CEAF}'
    )
}
