use proptest::prelude::*;
use txt_wrapped::nlp::{NlpProcessor, Tally};

#[test]
fn test_tokenization() {
    let processor = NlpProcessor::new().expect("Failed to create NLP processor");

    let tokens = processor.tokenize("Pizza PIZZA pizza and the tacos");
    assert_eq!(tokens, vec!["pizza", "pizza", "pizza", "tacos"]);
}

#[test]
fn test_curly_apostrophe_matches_straight() {
    let processor = NlpProcessor::new().expect("Failed to create NLP processor");
    assert_eq!(
        processor.tokenize("Pizza’s great"),
        processor.tokenize("pizza's great")
    );
}

#[test]
fn test_composed_and_decomposed_tally_together() {
    let processor = NlpProcessor::new().expect("Failed to create NLP processor");
    let mut tally = Tally::new();
    tally.extend(processor.tokenize("caf\u{e9} cafe\u{301}"));
    assert_eq!(tally.len(), 1);
    assert_eq!(tally.count("caf\u{e9}"), 2);
}

#[test]
fn test_emoji_extraction_counts() {
    let processor = NlpProcessor::new().expect("Failed to create NLP processor");
    let mut tally = Tally::new();
    for text in ["😀 hi", "😀😎", "no emoji here"] {
        tally.extend(processor.extract_emoji(text));
    }
    let top = tally.top_emojis(5);
    assert_eq!(top.len(), 2);
    assert_eq!((top[0].emoji.as_str(), top[0].count), ("😀", 2));
    assert_eq!((top[1].emoji.as_str(), top[1].count), ("😎", 1));
}

#[test]
fn test_top_k_truncates() {
    let processor = NlpProcessor::new().expect("Failed to create NLP processor");
    let mut tally = Tally::new();
    tally.extend(processor.tokenize("one two three four five six seven eight nine ten eleven"));
    assert!(tally.top_words(5).len() <= 5);
    assert!(tally.top_words(0).is_empty());
}

proptest! {
    #[test]
    fn proptest_tokenize_is_idempotent(text in "[A-Za-z' ]{0,80}") {
        let processor = NlpProcessor::new().expect("processor");
        let once = processor.tokenize(&text);
        let twice = processor.tokenize(&once.join(" "));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn proptest_tokens_are_lowercase_content_words(text in "[A-Za-z0-9' \t\n]{0,80}") {
        let processor = NlpProcessor::new().expect("processor");
        for token in processor.tokenize(&text) {
            prop_assert!(!token.is_empty());
            prop_assert!(!token.chars().any(char::is_whitespace));
            prop_assert_eq!(token.to_lowercase(), token.clone());
            prop_assert!(!processor.is_stop_word(&token));
        }
    }

    #[test]
    fn proptest_tally_top_is_sorted(items in proptest::collection::vec("[a-e]", 0..40), k in 0usize..8) {
        let mut tally = Tally::new();
        tally.extend(&items);
        let top = tally.top(k);
        prop_assert!(top.len() <= k);
        prop_assert!(top.windows(2).all(|pair| pair[0].1 >= pair[1].1));
        let counted: u64 = tally.top(usize::MAX).iter().map(|(_, n)| n).sum();
        prop_assert_eq!(counted, items.len() as u64);
    }
}
