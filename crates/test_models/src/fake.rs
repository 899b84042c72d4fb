//! Fake data generation helpers.
//!
//! Provides deterministic names, aliases and titles for blog fixtures.

use rand::Rng;

/// First names for fake data
const FIRST_NAMES: &[&str] = &[
    "Alice", "Bob", "Carol", "David", "Emma", "Frank", "Grace", "Henry", "Iris", "Jack", "Kate",
    "Leo", "Maya", "Noah", "Olivia", "Peter", "Quinn", "Rose", "Sam", "Tara",
];

/// Last names for fake data
const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Martinez",
    "Anderson", "Taylor", "Thomas", "Moore", "Jackson", "Martin", "Lee",
];

/// Words for titles
const TITLE_WORDS: &[&str] = &[
    "notes", "on", "the", "quiet", "art", "of", "writing", "fixtures", "against", "real",
    "schemas", "ordering", "keys", "and", "other", "small", "problems", "graph", "tests",
];

pub struct FakeData<R: Rng> {
    rng: R,
}

impl<R: Rng> FakeData<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn first_name(&mut self) -> &'static str {
        FIRST_NAMES[self.rng.random_range(0..FIRST_NAMES.len())]
    }

    pub fn last_name(&mut self) -> &'static str {
        LAST_NAMES[self.rng.random_range(0..LAST_NAMES.len())]
    }

    pub fn full_name(&mut self) -> String {
        format!("{} {}", self.first_name(), self.last_name())
    }

    /// Lowercase handle, sometimes with an apostrophe to exercise SQL escaping
    pub fn alias(&mut self) -> String {
        let first = self.first_name().to_lowercase();
        if self.rng.random_bool(0.2) {
            format!("{}'s", first)
        } else {
            format!("{}{}", first, self.rng.random_range(1..100))
        }
    }

    /// Capitalized title of `word_count` words
    pub fn title(&mut self, word_count: usize) -> String {
        let words: Vec<&str> = (0..word_count)
            .map(|_| TITLE_WORDS[self.rng.random_range(0..TITLE_WORDS.len())])
            .collect();
        let title = words.join(" ");
        let mut chars = title.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => title,
        }
    }

    pub fn int_range(&mut self, min: usize, max: usize) -> usize {
        self.rng.random_range(min..=max)
    }

    pub fn bool_with_probability(&mut self, probability: f64) -> bool {
        self.rng.random_bool(probability)
    }
}
