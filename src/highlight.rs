//! Maps keyword matches back onto stored text.
//!
//! A literal, case and width folded, occurrence of the whole keyword is tried
//! first. Failing that, every token group of the row (an `Original` token plus the
//! variants colocated with it) that equals any token group of the keyword is a hit,
//! in whatever order or position the keyword tokens appear. A keyword with more
//! token groups than the row matches nothing. Matched spans that touch, overlap or
//! are separated by whitespace only become one highlighted run.

use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    hash::BuildHasher,
    ops::Range,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    pipeline::Enumerator,
    tokenizer::{TextNormalizer, WidthCaseNormalizer, fold},
    types::{Colocation, OptionMask, Token, TokenizeMode},
};

const ELLIPSIS: &str = "...";

/// Read access to one result row.
pub trait Row {
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;
}

impl<S: BuildHasher> Row for HashMap<String, String, S> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|value| Cow::Borrowed(value.as_str()))
    }
}

impl Row for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|value| Cow::Borrowed(value.as_str()))
    }
}

impl Row for serde_json::Map<String, serde_json::Value> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match self.get(name)? {
            serde_json::Value::String(value) => Some(Cow::Borrowed(value.as_str())),
            serde_json::Value::Number(value) => Some(Cow::Owned(value.to_string())),
            serde_json::Value::Bool(value) => Some(Cow::Owned(value.to_string())),
            _ => None,
        }
    }
}

/// Opaque presentation attributes, e.g. `color = red`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleAttributes(BTreeMap<String, String>);

impl StyleAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StyleAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightStyle {
    pub highlight: StyleAttributes,
    pub normal: StyleAttributes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightOptions {
    /// Let the last keyword token match the start of a row token.
    pub prefix_match: bool,
    /// Stop after this many matches per row; 0 means no limit.
    pub max_hits: usize,
    /// Replace ASCII line breaks and tabs with spaces in the output text.
    pub single_line: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyledSpan {
    /// Byte range of [`StyledText::source`].
    pub range: Range<usize>,
    pub attributes: StyleAttributes,
    pub highlighted: bool,
    /// Least direct token variant involved in the match.
    pub matched: Option<Colocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyledText {
    pub source: String,
    pub spans: Vec<StyledSpan>,
    /// Keyword matches before merging.
    pub hits: usize,
}

impl StyledText {
    /// The whole text with normal attributes.
    pub fn plain(source: impl Into<String>, normal: &StyleAttributes) -> Self {
        let source = source.into();
        let spans = if source.is_empty() {
            Vec::new()
        } else {
            vec![StyledSpan {
                range: 0..source.len(),
                attributes: normal.clone(),
                highlighted: false,
                matched: None,
            }]
        };
        Self {
            source,
            spans,
            hits: 0,
        }
    }

    pub fn is_highlighted(&self) -> bool {
        self.spans.iter().any(|span| span.highlighted)
    }

    pub fn highlighted_ranges(&self) -> Vec<Range<usize>> {
        self.spans
            .iter()
            .filter(|span| span.highlighted)
            .map(|span| span.range.clone())
            .collect()
    }

    pub fn highlighted_text(&self) -> Vec<&str> {
        self.spans
            .iter()
            .filter(|span| span.highlighted)
            .map(|span| &self.source[span.range.clone()])
            .collect()
    }

    /// Drops leading text so the first highlight ends within `max_chars`
    /// characters, marking the cut with `...`. Two characters before the highlight
    /// are kept when the highlight itself is too long to fit.
    pub fn trim(&self, max_chars: usize) -> StyledText {
        let total = self.source.chars().count();
        let Some(first) = self.spans.iter().find(|span| span.highlighted) else {
            return self.clone();
        };
        if total <= max_chars {
            return self.clone();
        }

        let lower = self.source[..first.range.start].chars().count();
        let len = self.source[first.range.clone()].chars().count();
        let upper = lower + len;
        if upper <= max_chars || lower <= 2 {
            return self.clone();
        }

        let drop_chars = if 2 + len > max_chars {
            lower - 2
        } else {
            upper - max_chars
        };
        let cut = self
            .source
            .char_indices()
            .nth(drop_chars)
            .map_or(self.source.len(), |(offset, _)| offset);
        let shift = |offset: usize| offset - cut + ELLIPSIS.len();

        let mut spans: Vec<StyledSpan> = self
            .spans
            .iter()
            .filter(|span| span.range.end > cut)
            .map(|span| StyledSpan {
                range: shift(span.range.start.max(cut))..shift(span.range.end),
                ..span.clone()
            })
            .collect();
        match spans.first_mut() {
            Some(span) if !span.highlighted => span.range.start = 0,
            _ => {
                let attributes = self
                    .spans
                    .iter()
                    .find(|span| !span.highlighted)
                    .map(|span| span.attributes.clone())
                    .unwrap_or_default();
                spans.insert(
                    0,
                    StyledSpan {
                        range: 0..ELLIPSIS.len(),
                        attributes,
                        highlighted: false,
                        matched: None,
                    },
                );
            }
        }

        StyledText {
            source: format!("{ELLIPSIS}{}", &self.source[cut..]),
            spans,
            hits: self.hits,
        }
    }
}

/// Token variants anchored at one position.
#[derive(Debug)]
struct TokenGroup {
    start: usize,
    end: usize,
    words: Vec<(String, Colocation)>,
}

fn token_groups(tokens: &[Token]) -> Vec<TokenGroup> {
    let mut groups: Vec<TokenGroup> = Vec::new();
    for token in tokens {
        if token.colocation.is_original() {
            groups.push(TokenGroup {
                start: token.start,
                end: token.end,
                words: vec![(fold(&token.text), token.colocation)],
            });
        } else if let Some(group) = groups.last_mut().filter(|g| g.start == token.start) {
            group.words.push((fold(&token.text), token.colocation));
        }
    }
    // Punctuation never takes part in a match.
    groups.retain(|group| group.words[0].0.chars().any(char::is_alphanumeric));
    groups
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    start: usize,
    end: usize,
    matched: Colocation,
}

pub struct Highlighter {
    rows: Enumerator,
    keyword: String,
    keyword_groups: Vec<TokenGroup>,
    style: HighlightStyle,
    options: HighlightOptions,
}

impl Highlighter {
    /// Tokenizes `keyword` once. `pinyin_max_len` of 0 disables phonetic matching.
    pub fn new(
        enumerator: &Enumerator,
        keyword: &str,
        pinyin_max_len: usize,
        style: HighlightStyle,
    ) -> Result<Self> {
        let options = if pinyin_max_len == 0 {
            enumerator.options().without_pinyin()
        } else {
            enumerator.options().with_pinyin_max_len(pinyin_max_len)
        };
        let rows = enumerator.with_options(options);

        let keyword = keyword.trim();
        let keyword_tokens = rows.tokens(keyword.as_bytes(), TokenizeMode::Query)?;
        Ok(Self {
            keyword: fold(keyword),
            keyword_groups: token_groups(&keyword_tokens),
            rows,
            style,
            options: HighlightOptions::default(),
        })
    }

    pub fn with_options(mut self, options: HighlightOptions) -> Self {
        self.options = options;
        self
    }

    pub fn row_options(&self) -> OptionMask {
        self.rows.options()
    }

    pub fn highlight_rows<R: Row>(&self, rows: &[R], field: &str) -> Result<Vec<StyledText>> {
        rows.iter()
            .map(|row| match row.field(field) {
                Some(text) => self.highlight_text(&text),
                None => {
                    tracing::trace!(field, "row has no such field");
                    Ok(StyledText::plain(String::new(), &self.style.normal))
                }
            })
            .collect()
    }

    pub fn highlight_text(&self, source: &str) -> Result<StyledText> {
        if source.is_empty() || self.keyword.is_empty() {
            return Ok(self.render(source, Vec::new()));
        }

        let mut hits = self.literal_hits(source);
        if hits.is_empty() {
            let tokens = self.rows.tokens(source.as_bytes(), TokenizeMode::Document)?;
            hits = self.token_hits(&token_groups(&tokens));
        }
        Ok(self.render(source, hits))
    }

    fn limit_reached(&self, hits: &[Hit]) -> bool {
        self.options.max_hits > 0 && hits.len() >= self.options.max_hits
    }

    fn literal_hits(&self, source: &str) -> Vec<Hit> {
        let normalized = WidthCaseNormalizer.normalize(source);
        let mut hits = Vec::new();
        for (offset, found) in normalized.text.match_indices(self.keyword.as_str()) {
            let (start, end) = normalized.source_span(offset, offset + found.len());
            hits.push(Hit {
                start,
                end,
                matched: Colocation::Original,
            });
            if self.limit_reached(&hits) {
                break;
            }
        }
        hits
    }

    fn token_hits(&self, row: &[TokenGroup]) -> Vec<Hit> {
        let mut hits = Vec::new();
        if self.keyword_groups.is_empty() || self.keyword_groups.len() > row.len() {
            return hits;
        }

        for group in row {
            if let Some(matched) = self.best_match(group) {
                hits.push(Hit {
                    start: group.start,
                    end: group.end,
                    matched,
                });
                if self.limit_reached(&hits) {
                    break;
                }
            }
        }
        hits
    }

    /// The lowest colocation under which `group` equals some keyword group.
    fn best_match(&self, group: &TokenGroup) -> Option<Colocation> {
        let last = self.keyword_groups.len().saturating_sub(1);
        self.keyword_groups
            .iter()
            .enumerate()
            .flat_map(move |(j, keyword_group)| {
                let prefix = self.options.prefix_match && j == last;
                group.words.iter().filter_map(move |(word, colocation)| {
                    keyword_group
                        .words
                        .iter()
                        .any(|(wanted, _)| {
                            word == wanted || (prefix && word.starts_with(wanted.as_str()))
                        })
                        .then_some(*colocation)
                })
            })
            .min()
    }

    fn render(&self, source: &str, hits: Vec<Hit>) -> StyledText {
        let text = if self.options.single_line {
            source
                .chars()
                .map(|c| if c.is_ascii_whitespace() { ' ' } else { c })
                .collect()
        } else {
            source.to_string()
        };

        let count = hits.len();
        let runs = merge_hits(source, hits);
        let mut spans = Vec::with_capacity(runs.len() * 2 + 1);
        let mut cursor = 0;
        for run in runs {
            if run.start > cursor {
                spans.push(self.normal_span(cursor..run.start));
            }
            spans.push(StyledSpan {
                range: run.start..run.end,
                attributes: self.style.highlight.clone(),
                highlighted: true,
                matched: Some(run.matched),
            });
            cursor = run.end;
        }
        if cursor < text.len() {
            spans.push(self.normal_span(cursor..text.len()));
        }

        StyledText {
            source: text,
            spans,
            hits: count,
        }
    }

    fn normal_span(&self, range: Range<usize>) -> StyledSpan {
        StyledSpan {
            range,
            attributes: self.style.normal.clone(),
            highlighted: false,
            matched: None,
        }
    }
}

fn merge_hits(source: &str, mut hits: Vec<Hit>) -> Vec<Hit> {
    hits.sort_by_key(|hit| (hit.start, hit.end));
    let mut runs: Vec<Hit> = Vec::with_capacity(hits.len());
    for hit in hits {
        match runs.last_mut() {
            Some(run)
                if hit.start <= run.end
                    || source[run.end..hit.start].chars().all(char::is_whitespace) =>
            {
                run.end = run.end.max(hit.end);
                run.matched = run.matched.max(hit.matched);
            }
            _ => runs.push(hit),
        }
    }
    runs
}

/// Highlights `field` of every row. Rows without the field come back unstyled.
pub fn highlight<R: Row>(
    rows: &[R],
    field: &str,
    keyword: &str,
    pinyin_max_len: usize,
    enumerator: &Enumerator,
    style: &HighlightStyle,
) -> Result<Vec<StyledText>> {
    Highlighter::new(enumerator, keyword, pinyin_max_len, style.clone())?
        .highlight_rows(rows, field)
}
