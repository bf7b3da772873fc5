use std::collections::HashMap;

use once_cell::sync::Lazy;
use pinyin::{ToPinyin, ToPinyinMulti};

use super::script::is_cjk_char;

pub const SYLLABLE_SEPARATOR: char = '\'';
const MAX_SYLLABLE_LEN: usize = 6;

/// Phonetic forms of a run of Han characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub full: String,
    pub abbreviation: String,
    pub syllables: Vec<&'static str>,
}

impl Reading {
    pub fn joined_syllables(&self) -> String {
        join_syllables(&self.syllables)
    }
}

pub fn join_syllables<S: AsRef<str>>(syllables: &[S]) -> String {
    let mut out = String::new();
    for (i, syllable) in syllables.iter().enumerate() {
        if i > 0 {
            out.push(SYLLABLE_SEPARATOR);
        }
        out.push_str(syllable.as_ref());
    }
    out
}

/// Reading of `term` using each character's primary pronunciation.
///
/// Heteronyms always resolve to the first reading listed by the `pinyin` tables,
/// which are ordered by frequency of use. Returns `None` when any character is not
/// Han or has no known reading.
pub fn build_reading(term: &str) -> Option<Reading> {
    if term.is_empty() {
        return None;
    }

    let mut full = String::new();
    let mut abbreviation = String::new();
    let mut syllables = Vec::new();

    for ch in term.chars() {
        if !is_cjk_char(ch) {
            return None;
        }
        let py = ch.to_pinyin()?;
        full.push_str(py.plain());
        abbreviation.push_str(py.first_letter());
        syllables.push(py.plain());
    }

    Some(Reading {
        full,
        abbreviation,
        syllables,
    })
}

/// Every toneless pinyin syllable with the number of characters that read it.
pub struct SyllableTable {
    counts: HashMap<String, u32>,
}

static SYLLABLES: Lazy<SyllableTable> = Lazy::new(SyllableTable::build);

pub fn syllable_table() -> &'static SyllableTable {
    &SYLLABLES
}

impl SyllableTable {
    fn build() -> Self {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for code in 0x4E00u32..=0x9FFF {
            let Some(ch) = char::from_u32(code) else {
                continue;
            };
            let Some(multi) = ch.to_pinyin_multi() else {
                continue;
            };
            for py in multi {
                let plain = py.plain();
                *counts.entry(plain.to_string()).or_default() += 1;
                // Keyboards type `ü` as `v`.
                if plain.contains('ü') {
                    *counts.entry(plain.replace('ü', "v")).or_default() += 1;
                }
            }
        }
        Self { counts }
    }

    pub fn contains(&self, syllable: &str) -> bool {
        self.counts.contains_key(syllable)
    }

    pub fn frequency(&self, syllable: &str) -> u32 {
        self.counts.get(syllable).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Splits lowercase ASCII letters into pinyin syllables, trying the longest
    /// syllable first and backtracking when the remainder cannot be split.
    pub fn split<'a>(&self, text: &'a str) -> Option<Vec<&'a str>> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_lowercase()) {
            return None;
        }
        let mut out = Vec::new();
        self.split_from(text, &mut out).then_some(out)
    }

    fn split_from<'a>(&self, rest: &'a str, out: &mut Vec<&'a str>) -> bool {
        if rest.is_empty() {
            return true;
        }
        for len in (1..=MAX_SYLLABLE_LEN.min(rest.len())).rev() {
            let head = &rest[..len];
            if !self.contains(head) {
                continue;
            }
            out.push(head);
            if self.split_from(&rest[len..], out) {
                return true;
            }
            out.pop();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_full_abbreviation_and_syllables() {
        let reading = build_reading("你好").expect("reading for 你好");
        assert_eq!(reading.full, "nihao");
        assert_eq!(reading.abbreviation, "nh");
        assert_eq!(reading.joined_syllables(), "ni'hao");
    }

    #[test]
    fn heteronyms_use_primary_reading() {
        for ch in ['行', '长', '重', '了'] {
            let primary = ch.to_pinyin().expect("known character").plain();
            let reading = build_reading(&ch.to_string()).expect("reading");
            assert_eq!(reading.full, primary, "heteronym {ch} must use its first reading");
            assert_eq!(build_reading(&ch.to_string()), Some(reading));
        }
    }

    #[test]
    fn rejects_non_han_terms() {
        assert!(build_reading("hello").is_none());
        assert!(build_reading("你a").is_none());
        assert!(build_reading("").is_none());
    }

    #[test]
    fn splits_pinyin_strings_into_syllables() {
        let table = syllable_table();
        assert!(!table.is_empty());
        assert!(table.frequency("shi") > table.frequency("zhuai"));
        assert_eq!(table.split("nihao"), Some(vec!["ni", "hao"]));
        assert_eq!(table.split("zhongwen"), Some(vec!["zhong", "wen"]));
        assert_eq!(table.split("xyz"), None);
        assert_eq!(table.split("NiHao"), None);
    }
}
