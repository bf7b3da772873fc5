use std::{ops::ControlFlow, sync::Arc};

use tracing::{debug, trace};

use super::{Expander, Segmenter};
use crate::{
    error::Result,
    types::{OptionMask, Token, TokenizeMode, sort_tokens},
};

/// Runs segmentation and expansion for one engine request and streams the sorted
/// result. Nothing is kept between calls.
#[derive(Clone)]
pub struct Enumerator {
    segmenter: Arc<dyn Segmenter>,
    expander: Arc<dyn Expander>,
    options: OptionMask,
}

impl Enumerator {
    pub fn new(
        segmenter: Arc<dyn Segmenter>,
        expander: Arc<dyn Expander>,
        options: OptionMask,
    ) -> Self {
        Self {
            segmenter,
            expander,
            options,
        }
    }

    pub fn options(&self) -> OptionMask {
        self.options
    }

    /// Same pipeline with different options, e.g. from table arguments.
    pub fn with_options(&self, options: OptionMask) -> Self {
        Self {
            segmenter: self.segmenter.clone(),
            expander: self.expander.clone(),
            options,
        }
    }

    pub fn tokens(&self, input: &[u8], mode: TokenizeMode) -> Result<Vec<Token>> {
        let text = std::str::from_utf8(input)?;
        let mut tokens = self.segmenter.segment(text, self.options)?;

        if let Some(max_len) = self.options.pinyin_max_len() {
            let mut variants = Vec::new();
            if mode.is_query() {
                for token in tokens.iter().filter(|t| t.colocation.is_original()) {
                    variants.extend(self.expander.expand_query(token));
                }
            } else {
                let char_len = text.chars().count();
                if char_len <= max_len {
                    for token in tokens.iter().filter(|t| t.colocation.is_original()) {
                        variants.extend(self.expander.expand(token, max_len));
                    }
                } else {
                    debug!(char_len, max_len, "input too long for pinyin expansion");
                }
            }
            tokens.extend(variants);
        }

        sort_tokens(&mut tokens);
        tokens.dedup_by(|a, b| a.span() == b.span() && a.colocation == b.colocation);
        Ok(tokens)
    }

    /// Feeds tokens to `callback` in order until it breaks. Returns how many tokens
    /// were delivered.
    pub fn enumerate<F>(
        &self,
        input: &[u8],
        mode: TokenizeMode,
        mut callback: F,
    ) -> Result<usize>
    where
        F: FnMut(&Token) -> ControlFlow<()>,
    {
        let tokens = self.tokens(input, mode)?;
        for (delivered, token) in tokens.iter().enumerate() {
            if callback(token).is_break() {
                trace!(delivered = delivered + 1, total = tokens.len(), "enumeration stopped");
                return Ok(delivered + 1);
            }
        }
        Ok(tokens.len())
    }
}
