use std::collections::{HashMap, HashSet};

use regex::Regex;
use stop_words::{get, LANGUAGE};
use unicode_normalization::UnicodeNormalization;

use crate::error::{Result, WrappedError};
use crate::models::{EmojiCount, WordCount};

/// One emoji per match: flag pairs, keycaps, and pictographs with optional
/// presentation selector, skin tone, tag sequence and ZWJ continuations.
const EMOJI_PATTERN: &str = concat!(
    r"[\x{1F1E6}-\x{1F1FF}]{2}",
    r"|[0-9#*]\x{FE0F}?\x{20E3}",
    r"|(?:\p{Extended_Pictographic}|\p{Emoji_Presentation})",
    r"(?:\x{FE0F}|\p{Emoji_Modifier})?",
    r"(?:[\x{E0020}-\x{E007E}]+\x{E007F})?",
    r"(?:\x{200D}(?:\p{Extended_Pictographic}|\p{Emoji_Presentation})(?:\x{FE0F}|\p{Emoji_Modifier})?)*",
);

/// Word and emoji extraction for message text
#[derive(Debug, Clone)]
pub struct NlpProcessor {
    emoji_regex: Regex,
    stopwords: HashSet<String>,
}

impl NlpProcessor {
    /// Create a processor with the English stop-word list
    pub fn new() -> Result<Self> {
        Self::with_extra_stop_words(std::iter::empty::<&str>())
    }

    /// Create a processor with the English stop-word list plus `extra`
    pub fn with_extra_stop_words<I, S>(extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emoji_regex = Regex::new(EMOJI_PATTERN)
            .map_err(|e| WrappedError::Other(format!("Failed to compile emoji regex: {e}")))?;

        let stopwords: HashSet<String> = get(LANGUAGE::English)
            .iter()
            .map(ToString::to_string)
            .chain(extra.into_iter().map(|word| word.as_ref().to_string()))
            .map(|word| normalize_token(&word))
            .filter(|word| !word.is_empty())
            .collect();

        Ok(Self {
            emoji_regex,
            stopwords,
        })
    }

    /// Whether `word` is a stop word, ignoring case
    #[must_use]
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stopwords.contains(&normalize_token(word))
    }

    /// Split text into lower-case words, dropping stop words and empty tokens
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.nfc().collect::<String>().to_lowercase();
        normalized
            .split_whitespace()
            .map(|token| token.trim().replace('\u{2019}', "'"))
            .filter(|token| !token.is_empty() && !self.is_stop_word(token))
            .collect()
    }

    /// Emoji sequences in left-to-right order, non-overlapping
    #[must_use]
    pub fn extract_emoji<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.emoji_regex
            .find_iter(text)
            .map(|m| m.as_str())
            .collect()
    }
}

fn normalize_token(word: &str) -> String {
    word.nfc()
        .collect::<String>()
        .to_lowercase()
        .trim()
        .replace('\u{2019}', "'")
}

/// Frequency table that remembers first-seen order for tie breaking
#[derive(Debug, Clone, Default)]
pub struct Tally {
    positions: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl Tally {
    /// Empty tally
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence
    pub fn add(&mut self, item: &str) {
        if let Some(&idx) = self.positions.get(item) {
            self.entries[idx].1 += 1;
        } else {
            self.positions.insert(item.to_string(), self.entries.len());
            self.entries.push((item.to_string(), 1));
        }
    }

    /// Count every item
    pub fn extend<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in items {
            self.add(item.as_ref());
        }
    }

    /// Number of distinct items
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was counted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Occurrences of `item`
    #[must_use]
    pub fn count(&self, item: &str) -> u64 {
        self.positions.get(item).map_or(0, |&idx| self.entries[idx].1)
    }

    /// The `k` most frequent items, count descending, first-seen on ties
    #[must_use]
    pub fn top(&self, k: usize) -> Vec<(String, u64)> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(k);
        ranked
    }

    /// `top` as word counts
    #[must_use]
    pub fn top_words(&self, k: usize) -> Vec<WordCount> {
        self.top(k)
            .into_iter()
            .map(|(word, count)| WordCount { word, count })
            .collect()
    }

    /// `top` as emoji counts
    #[must_use]
    pub fn top_emojis(&self, k: usize) -> Vec<EmojiCount> {
        self.top(k)
            .into_iter()
            .map(|(emoji, count)| EmojiCount { emoji, count })
            .collect()
    }
}
