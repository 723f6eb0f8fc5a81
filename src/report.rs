//! The assembled yearly report.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::contacts::NameResolver;
use crate::models::{
    EmojiCount, PeriodHistogram, PeriodKind, TextsSentSummary, TopFriend, TopFriends, TopSender,
    UnbalancedFriend, WordCount,
};
use crate::queries::FriendCount;

/// Everything the slideshow needs, serialized as a single JSON object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Target year of the year-scoped statistics
    pub year: i32,
    /// Self-sent totals
    pub text_sent_summary: TextsSentSummary,
    /// Up to ten correspondents by self-sent count
    pub top_senders: Vec<TopSender>,
    /// Which calendar bucket `period_counts` uses
    pub period: PeriodKind,
    /// Self-sent count for every period label
    pub period_counts: PeriodHistogram,
    /// Up to three correspondents with their top words and emoji
    pub top_friends: TopFriends,
    /// Ranked sent/received balance, absent below the sample floor
    pub unbalanced_friend: Option<UnbalancedFriend>,
    /// Display names for ids, filled by [`ResultRecord::resolve_names`]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub names: BTreeMap<String, String>,
}

/// Merge query results and per-correspondent rankings into a report.
///
/// A top friend without an entry in `words` or `emojis` gets an empty list.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn assemble(
    year: i32,
    summary: TextsSentSummary,
    top_senders: Vec<TopSender>,
    histogram: PeriodHistogram,
    top_friends: Vec<FriendCount>,
    words: &HashMap<String, Vec<WordCount>>,
    emojis: &HashMap<String, Vec<EmojiCount>>,
    unbalanced: Option<UnbalancedFriend>,
) -> ResultRecord {
    let mut friends: Vec<TopFriend> = Vec::with_capacity(top_friends.len());
    for FriendCount { id, message_count } in top_friends {
        if friends.iter().any(|friend| friend.id == id) {
            continue;
        }
        friends.push(TopFriend {
            top_word_count: words.get(&id).cloned().unwrap_or_default(),
            top_emojis: emojis.get(&id).cloned().unwrap_or_default(),
            id,
            message_count,
        });
    }

    ResultRecord {
        year,
        text_sent_summary: summary,
        top_senders,
        period: histogram.kind(),
        period_counts: histogram,
        top_friends: TopFriends(friends),
        unbalanced_friend: unbalanced,
        names: BTreeMap::new(),
    }
}

impl ResultRecord {
    /// Every correspondent id mentioned in the report, first mention order.
    #[must_use]
    pub fn correspondent_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        let mentioned = self
            .top_senders
            .iter()
            .map(|sender| sender.id.as_str())
            .chain(self.top_friends.iter().map(|friend| friend.id.as_str()))
            .chain(self.unbalanced_friend.iter().map(|friend| friend.id.as_str()));
        for id in mentioned {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Fill `names` for every id the resolver knows. Unknown ids stay raw.
    pub fn resolve_names(&mut self, resolver: &dyn NameResolver) {
        let resolved: Vec<(String, String)> = self
            .correspondent_ids()
            .into_iter()
            .filter_map(|id| resolver.display_name(id).map(|name| (id.to_string(), name)))
            .collect();
        self.names.extend(resolved);
    }

    /// Display name for an id, falling back to the id itself.
    #[must_use]
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.names.get(id).map_or(id, String::as_str)
    }
}
