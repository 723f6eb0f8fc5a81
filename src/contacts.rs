//! Display names for correspondent ids.
//!
//! Ids in `chat.db` are phone numbers or account handles in whatever format the
//! carrier delivered them, so both sides are normalized before matching.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

/// Maps a correspondent id to a display name
pub trait NameResolver {
    /// Name for `id`, `None` when unknown
    fn display_name(&self, id: &str) -> Option<String>;
}

/// Canonical form of an id: e-mail handles lower-cased, everything else digits only.
#[must_use]
pub fn normalize_id(id: &str) -> String {
    if id.contains('@') {
        id.trim().to_lowercase()
    } else {
        id.chars().filter(char::is_ascii_digit).collect()
    }
}

/// Names parsed from a vCard export, keyed by normalized id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactBook {
    names: HashMap<String, String>,
}

impl ContactBook {
    /// Parse every `BEGIN:VCARD` … `END:VCARD` block in `text`.
    ///
    /// `FN` wins over `N`; cards with neither are skipped.
    #[must_use]
    pub fn parse_vcard(text: &str) -> Self {
        let mut book = Self::default();
        let mut card: Option<Card> = None;

        for line in unfold_lines(text) {
            let Some((name, value)) = split_property(&line) else {
                continue;
            };
            match name.as_str() {
                "BEGIN" if value.eq_ignore_ascii_case("VCARD") => card = Some(Card::default()),
                "END" if value.eq_ignore_ascii_case("VCARD") => {
                    if let Some(finished) = card.take() {
                        book.add_card(finished);
                    }
                }
                _ => {
                    if let Some(current) = card.as_mut() {
                        current.apply(&name, &value);
                    }
                }
            }
        }

        debug!(entries = book.names.len(), "Parsed contact book");
        book
    }

    fn add_card(&mut self, card: Card) {
        let Some(name) = card.full_name.or(card.structured_name).filter(|n| !n.trim().is_empty()) else {
            warn!("Skipping contact card without a name");
            return;
        };
        for id in card.ids {
            let key = normalize_id(&id);
            if !key.is_empty() {
                self.names.insert(key, name.clone());
            }
        }
    }

    /// Register one id by hand
    pub fn insert(&mut self, id: &str, name: &str) {
        self.names.insert(normalize_id(id), name.to_string());
    }

    /// Number of ids with a name
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no ids are known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl NameResolver for ContactBook {
    fn display_name(&self, id: &str) -> Option<String> {
        self.names.get(&normalize_id(id)).cloned()
    }
}

#[derive(Debug, Default)]
struct Card {
    full_name: Option<String>,
    structured_name: Option<String>,
    ids: Vec<String>,
}

impl Card {
    fn apply(&mut self, name: &str, value: &str) {
        match name {
            "FN" => self.full_name = Some(unescape(value)),
            "N" if self.structured_name.is_none() => self.structured_name = structured_to_display(value),
            "TEL" | "EMAIL" => {
                let value = unescape(value);
                let value = value.strip_prefix("tel:").unwrap_or(&value);
                self.ids.push(value.to_string());
            }
            _ => {}
        }
    }
}

/// Joins folded continuation lines (leading space or tab).
fn unfold_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let raw = raw.trim_end_matches('\r');
        if let Some(rest) = raw.strip_prefix([' ', '\t']) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        lines.push(raw.to_string());
    }
    lines
}

/// `item1.TEL;TYPE=CELL:+1 555` → (`TEL`, `+1 555`). Parameters are dropped.
fn split_property(line: &str) -> Option<(String, String)> {
    let (head, value) = line.split_once(':')?;
    let name = head.split(';').next().unwrap_or(head);
    let name = name.rsplit('.').next().unwrap_or(name);
    Some((name.trim().to_ascii_uppercase(), value.trim().to_string()))
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n' | 'N') => out.push('\n'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// `Family;Given;Middle;Prefix;Suffix` → `Given Family`
fn structured_to_display(value: &str) -> Option<String> {
    let mut parts = value.split(';').map(str::trim);
    let family = parts.next().unwrap_or_default();
    let given = parts.next().unwrap_or_default();
    let display = [given, family]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    (!display.is_empty()).then(|| unescape(&display))
}

const PSEUDONYMS: [&str; 104] = [
    "Alice", "Bob", "Charlie", "David", "Eva", "Fiona", "George", "Hannah", "Ian", "Julia",
    "Kyle", "Laura", "Mike", "Nina", "Oscar", "Paula", "Quincy", "Rachel", "Steve", "Tina",
    "Uma", "Victor", "Wendy", "Xander", "Yvonne", "Zach", "Amelia", "Brad", "Catherine",
    "Derek", "Elaine", "Frank", "Grace", "Henry", "Isabella", "Jack", "Katie", "Liam", "Megan",
    "Nathan", "Olivia", "Peter", "Quinn", "Ruby", "Samuel", "Tracy", "Ulysses", "Vanessa",
    "William", "Xenia", "Yara", "Zane", "Ava", "Benjamin", "Chloe", "Dylan", "Emma", "Freddie",
    "Gina", "Harvey", "Ivy", "Jason", "Kelsey", "Leon", "Mia", "Noah", "Ophelia", "Patrick",
    "Queen", "Ronald", "Sylvia", "Timothy", "Ursula", "Violet", "Winston", "Xavier", "Yasmine",
    "Zeke", "Anastasia", "Boris", "Carmen", "Dominic", "Eleanor", "Felix", "Gemma", "Howard",
    "Iris", "Jerome", "Kristina", "Lucas", "Monica", "Nigel", "Octavia", "Penelope", "Quentin",
    "Rosalind", "Sebastian", "Tabitha", "Uriel", "Veronica", "Wayne", "Ximena", "Yolanda",
    "Zephyr",
];

/// Distinct random first names for a fixed set of ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pseudonymizer {
    assigned: HashMap<String, String>,
}

impl Pseudonymizer {
    /// Give each distinct id its own name; once the list runs out names get a
    /// numeric suffix.
    pub fn new<'a, I, R>(ids: I, rng: &mut R) -> Self
    where
        I: IntoIterator<Item = &'a str>,
        R: Rng + ?Sized,
    {
        let mut pool = PSEUDONYMS.to_vec();
        pool.shuffle(rng);

        let mut assigned = HashMap::new();
        for id in ids {
            if assigned.contains_key(id) {
                continue;
            }
            let n = assigned.len();
            let base = pool[n % pool.len()];
            let name = match n / pool.len() {
                0 => base.to_string(),
                round => format!("{base} {}", round + 1),
            };
            assigned.insert(id.to_string(), name);
        }
        Self { assigned }
    }
}

impl NameResolver for Pseudonymizer {
    fn display_name(&self, id: &str) -> Option<String> {
        self.assigned.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("+1 (555) 123-4567"), "15551234567");
        assert_eq!(normalize_id("Friend@Example.COM"), "friend@example.com");
    }

    #[test]
    fn test_unfold_lines() {
        let lines = unfold_lines("FN:Long\r\n  Name\r\nTEL:1");
        assert_eq!(lines, vec!["FN:Long Name".to_string(), "TEL:1".to_string()]);
    }

    #[test]
    fn test_pseudonyms_are_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        let ids: Vec<String> = (0..60).map(|i| format!("+1555000{i:04}")).collect();
        let pseudonymizer = Pseudonymizer::new(ids.iter().map(String::as_str), &mut rng);
        let mut names: Vec<String> = ids
            .iter()
            .filter_map(|id| pseudonymizer.display_name(id))
            .collect();
        assert_eq!(names.len(), 60);
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 60);
    }

    #[test]
    fn test_suffix_only_after_pool_is_used() {
        let mut rng = StdRng::seed_from_u64(11);
        let ids: Vec<String> = (0..=PSEUDONYMS.len()).map(|i| format!("user{i}@example.com")).collect();
        let pseudonymizer = Pseudonymizer::new(ids.iter().map(String::as_str), &mut rng);

        let plain = ids[..PSEUDONYMS.len()]
            .iter()
            .filter_map(|id| pseudonymizer.display_name(id))
            .filter(|name| !name.contains(' '))
            .count();
        assert_eq!(plain, 104);
        let last = pseudonymizer.display_name(&ids[PSEUDONYMS.len()]).expect("named");
        assert!(last.ends_with(" 2"), "{last}");
    }
}
