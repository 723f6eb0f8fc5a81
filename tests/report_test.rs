//! Report assembly and its JSON encoding

use std::collections::HashMap;

use proptest::prelude::*;
use serde_json::Value;
use txt_wrapped::contacts::ContactBook;
use txt_wrapped::models::{
    PeriodHistogram, PeriodKind, TextsSentSummary, TopSender, WordCount, MONTHS, WEEKDAYS,
};
use txt_wrapped::queries::FriendCount;
use txt_wrapped::report::assemble;

fn friend(id: &str, message_count: u64) -> FriendCount {
    FriendCount {
        id: id.to_string(),
        message_count,
    }
}

fn empty_summary() -> TextsSentSummary {
    TextsSentSummary {
        total_texts_sent: 0,
        first_text_date: None,
        last_text_date: None,
    }
}

#[test]
fn test_histogram_json_keeps_order() {
    let histogram = PeriodHistogram::from_counts(PeriodKind::Month, [("June", 4), ("February", 4), ("May", 9)]);
    let json = serde_json::to_string(&histogram).expect("serializes");
    assert!(json.starts_with(r#"{"May":9,"February":4,"June":4,"January":0"#), "{json}");
}

#[test]
fn test_top_friends_keyed_by_id() {
    let mut words = HashMap::new();
    words.insert(
        "+15550001111".to_string(),
        vec![WordCount {
            word: "pizza".to_string(),
            count: 3,
        }],
    );
    let record = assemble(
        2023,
        empty_summary(),
        vec![TopSender {
            id: "+15550001111".to_string(),
            messages_sent: 7,
        }],
        PeriodHistogram::from_counts(PeriodKind::Weekday, [("Monday", 7)]),
        vec![friend("+15550001111", 7), friend("+15550001111", 7)],
        &words,
        &HashMap::new(),
        None,
    );

    assert_eq!(record.top_friends.len(), 1);
    let json = serde_json::to_value(&record).expect("serializes");
    let entry = &json["topFriends"]["+15550001111"];
    assert_eq!(entry["message_count"], 7);
    assert_eq!(entry["top_word_count"][0]["word"], "pizza");
    assert_eq!(entry["top_emojis"], Value::Array(Vec::new()));
    assert_eq!(json["period"], "weekday");
    assert_eq!(json["periodCounts"]["Monday"], 7);
    assert_eq!(json["textSentSummary"]["first_text_date"], Value::Null);
}

#[test]
fn test_names_resolve_through_normalized_ids() {
    let mut record = assemble(
        2023,
        empty_summary(),
        vec![
            TopSender {
                id: "+1 (555) 000-1111".to_string(),
                messages_sent: 2,
            },
            TopSender {
                id: "stranger@example.com".to_string(),
                messages_sent: 1,
            },
        ],
        PeriodHistogram::from_counts(PeriodKind::Month, Vec::<(&str, u64)>::new()),
        Vec::new(),
        &HashMap::new(),
        &HashMap::new(),
        None,
    );

    let mut book = ContactBook::default();
    book.insert("15550001111", "Alice Example");
    record.resolve_names(&book);

    assert_eq!(record.display_name("+1 (555) 000-1111"), "Alice Example");
    assert_eq!(record.display_name("stranger@example.com"), "stranger@example.com");
    let json = serde_json::to_value(&record).expect("serializes");
    assert_eq!(json["names"]["+1 (555) 000-1111"], "Alice Example");
}

proptest! {
    #[test]
    fn proptest_histogram_is_total(counts in proptest::collection::vec(0u64..1000, 12)) {
        let sparse: Vec<(&str, u64)> = MONTHS
            .iter()
            .zip(&counts)
            .filter(|&(_, &n)| n > 0)
            .map(|(&label, &n)| (label, n))
            .collect();
        let histogram = PeriodHistogram::from_counts(PeriodKind::Month, sparse);

        prop_assert_eq!(histogram.buckets().len(), 12);
        prop_assert_eq!(histogram.total(), counts.iter().sum::<u64>());
        prop_assert!(histogram.buckets().windows(2).all(|pair| pair[0].count >= pair[1].count));
        for (label, n) in MONTHS.iter().zip(&counts) {
            prop_assert_eq!(histogram.get(label), Some(*n));
        }
    }

    #[test]
    fn proptest_weekday_histogram_is_total(day in 0usize..7, n in 1u64..500) {
        let histogram = PeriodHistogram::from_counts(PeriodKind::Weekday, [(WEEKDAYS[day], n)]);
        prop_assert_eq!(histogram.buckets().len(), 7);
        prop_assert_eq!(histogram.buckets()[0].label, WEEKDAYS[day]);
        prop_assert_eq!(histogram.total(), n);
    }
}
