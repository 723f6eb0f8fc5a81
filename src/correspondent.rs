//! Per-correspondent word and emoji ranking.
//!
//! Each correspondent is processed on its own with a fresh tally; there is no
//! shared word index across correspondents.

use std::collections::HashMap;

use rusqlite::params;
use tracing::{debug, warn};

use crate::error::Result;
use crate::logging::OperationTimer;
use crate::metrics;
use crate::models::{EmojiCount, WordCount};
use crate::nlp::{NlpProcessor, Tally};
use crate::store::MessageStore;

/// Default number of words / emoji kept per correspondent.
pub const DEFAULT_TOP_K: usize = 5;

/// All message texts exchanged with one handle id, both directions.
const MESSAGES_FOR_HANDLE: &str = "SELECT m.text
    FROM message m
    JOIN handle h ON m.handle_id = h.ROWID
    WHERE h.id = ?1
      AND m.text IS NOT NULL";

/// Ranked words and emoji for one correspondent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrespondentProfile {
    /// Correspondent handle id
    pub id: String,
    /// Top words, count descending, first-seen on ties
    pub top_words: Vec<WordCount>,
    /// Top emoji, count descending, first-seen on ties
    pub top_emojis: Vec<EmojiCount>,
    /// Texts that were tokenized
    pub messages_scanned: u64,
    /// Rows skipped because the text could not be decoded
    pub messages_skipped: u64,
}

/// Tally already-fetched texts. `None` entries are skipped.
#[must_use]
pub fn profile_texts<'a, I>(id: &str, texts: I, processor: &NlpProcessor, top_k: usize) -> CorrespondentProfile
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut words = Tally::new();
    let mut emojis = Tally::new();
    let mut scanned = 0;
    let mut skipped = 0;

    for text in texts {
        match text {
            Some(text) if !text.is_empty() => {
                words.extend(processor.tokenize(text));
                emojis.extend(processor.extract_emoji(text));
                scanned += 1;
            }
            Some(_) => {}
            None => skipped += 1,
        }
    }

    CorrespondentProfile {
        id: id.to_string(),
        top_words: words.top_words(top_k),
        top_emojis: emojis.top_emojis(top_k),
        messages_scanned: scanned,
        messages_skipped: skipped,
    }
}

/// Fetch every text exchanged with `id` and rank its words and emoji.
///
/// A row whose text cannot be read as a string is skipped; only statement
/// failures abort.
pub fn profile_correspondent(
    store: &MessageStore,
    processor: &NlpProcessor,
    id: &str,
    top_k: usize,
) -> Result<CorrespondentProfile> {
    let mut texts: Vec<Option<String>> = Vec::new();
    store.for_each_row("messages_for_handle", MESSAGES_FOR_HANDLE, params![id], |row| {
        match row.get::<_, Option<String>>(0) {
            Ok(text) => texts.push(text),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable message text");
                texts.push(None);
            }
        }
    })?;

    let profile = profile_texts(id, texts.iter().map(Option::as_deref), processor, top_k);
    debug!(
        id,
        scanned = profile.messages_scanned,
        skipped = profile.messages_skipped,
        "Profiled correspondent"
    );
    Ok(profile)
}

/// Words and emoji keyed by correspondent id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrespondentRankings {
    /// Top words per id
    pub words: HashMap<String, Vec<WordCount>>,
    /// Top emoji per id
    pub emojis: HashMap<String, Vec<EmojiCount>>,
}

/// Profile each id independently.
pub fn profile_all(
    store: &MessageStore,
    processor: &NlpProcessor,
    ids: &[String],
    top_k: usize,
) -> Result<CorrespondentRankings> {
    let timer = OperationTimer::new("correspondent_profiles");
    let mut rankings = CorrespondentRankings::default();
    let mut scanned = 0;
    let mut skipped = 0;

    for id in ids {
        let profile = match profile_correspondent(store, processor, id, top_k) {
            Ok(profile) => profile,
            Err(e) => {
                timer.finish(false);
                return Err(e);
            }
        };
        scanned += profile.messages_scanned;
        skipped += profile.messages_skipped;
        rankings.words.insert(profile.id.clone(), profile.top_words);
        rankings.emojis.insert(profile.id, profile.top_emojis);
    }

    metrics::record_messages_scanned(scanned, skipped);
    timer.finish(true);
    Ok(rankings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emoji_ranking() {
        let processor = NlpProcessor::new().expect("processor");
        let profile = profile_texts(
            "+15550001111",
            [Some("😀 hi"), Some("😀😎")],
            &processor,
            DEFAULT_TOP_K,
        );
        assert_eq!(profile.top_emojis.len(), 2);
        assert_eq!(profile.top_emojis[0].emoji, "😀");
        assert_eq!(profile.top_emojis[0].count, 2);
        assert_eq!(profile.top_emojis[1].emoji, "😎");
    }

    #[test]
    fn test_null_and_empty_texts_are_skipped() {
        let processor = NlpProcessor::new().expect("processor");
        let profile = profile_texts("a@b.com", [None, Some(""), Some("pizza pizza tacos")], &processor, 1);
        assert_eq!(profile.messages_scanned, 1);
        assert_eq!(profile.messages_skipped, 1);
        assert_eq!(
            profile.top_words,
            vec![WordCount {
                word: "pizza".to_string(),
                count: 2
            }]
        );
    }
}
