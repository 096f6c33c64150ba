//! Domain grammar: recognised utterance text to semantic slot values
//!
//! Lookup is an exact match after case-folding. Unknown utterances are a
//! normal `None` result; only loading a grammar from disk can fail.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A yes/no answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

impl Answer {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Answer::Yes => "yes",
            Answer::No => "no",
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic field of a grammar entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotField {
    Person,
    Day,
    Time,
    Answer,
    Greeting,
}

/// Semantic values attached to one utterance. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrammarEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
}

impl GrammarEntry {
    fn person(name: &str) -> Self {
        Self {
            person: Some(name.to_string()),
            ..Self::default()
        }
    }

    fn day(day: &str) -> Self {
        Self {
            day: Some(day.to_string()),
            ..Self::default()
        }
    }

    fn time(time: &str) -> Self {
        Self {
            time: Some(time.to_string()),
            ..Self::default()
        }
    }

    fn answer(answer: Answer) -> Self {
        Self {
            answer: Some(answer),
            ..Self::default()
        }
    }

    fn greeting(greeting: &str) -> Self {
        Self {
            greeting: Some(greeting.to_string()),
            ..Self::default()
        }
    }

    /// The value of `field`, if this entry carries one
    #[must_use]
    pub fn field(&self, field: SlotField) -> Option<&str> {
        match field {
            SlotField::Person => self.person.as_deref(),
            SlotField::Day => self.day.as_deref(),
            SlotField::Time => self.time.as_deref(),
            SlotField::Answer => self.answer.map(Answer::as_str),
            SlotField::Greeting => self.greeting.as_deref(),
        }
    }

    fn is_empty(&self) -> bool {
        self.person.is_none()
            && self.day.is_none()
            && self.time.is_none()
            && self.answer.is_none()
            && self.greeting.is_none()
    }
}

/// Errors loading a grammar table
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("failed to read grammar file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid grammar JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("grammar contains an empty key")]
    EmptyKey,
    #[error("grammar keys {first:?} and {second:?} are the same after case folding")]
    DuplicateKey { first: String, second: String },
    #[error("grammar entry {0:?} has no semantic fields")]
    EmptyEntry(String),
}

/// Static lookup table from normalized utterance to semantic values
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    entries: HashMap<String, GrammarEntry>,
}

impl Grammar {
    /// The table the booking dialogue ships with
    #[must_use]
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();

        for (key, name) in [
            ("vlad", "Vladislav Maraev"),
            ("bora", "Bora Kara"),
            ("tal", "Talha Bedir"),
            ("tom", "Tom Södahl Bladsjö"),
        ] {
            entries.insert(key.to_string(), GrammarEntry::person(name));
        }

        for day in ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"] {
            entries.insert(day.to_lowercase(), GrammarEntry::day(day));
        }

        for hour in 8..=16 {
            entries.insert(hour.to_string(), GrammarEntry::time(&format!("{hour:02}:00")));
        }

        for key in ["yes", "of course", "oh yeah", "yep", "sure"] {
            entries.insert(key.to_string(), GrammarEntry::answer(Answer::Yes));
        }
        for key in ["no", "no way", "not at all", "nah", "nope"] {
            entries.insert(key.to_string(), GrammarEntry::answer(Answer::No));
        }

        for key in ["hi", "hello"] {
            entries.insert(key.to_string(), GrammarEntry::greeting("hi"));
        }

        Self { entries }
    }

    /// Build a grammar from `(key, entry)` pairs, folding keys to lowercase
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::EmptyKey`] for a blank key,
    /// [`GrammarError::EmptyEntry`] for an entry with no fields, and
    /// [`GrammarError::DuplicateKey`] when two keys fold to the same string.
    pub fn from_entries<I, K>(entries: I) -> Result<Self, GrammarError>
    where
        I: IntoIterator<Item = (K, GrammarEntry)>,
        K: Into<String>,
    {
        let mut table: HashMap<String, GrammarEntry> = HashMap::new();
        // Original spelling of each folded key, for duplicate reporting
        let mut spellings: HashMap<String, String> = HashMap::new();

        for (key, entry) in entries {
            let key = key.into();
            if key.is_empty() {
                return Err(GrammarError::EmptyKey);
            }
            if entry.is_empty() {
                return Err(GrammarError::EmptyEntry(key));
            }
            let folded = normalize(&key);
            if let Some(first) = spellings.get(&folded) {
                return Err(GrammarError::DuplicateKey {
                    first: first.clone(),
                    second: key,
                });
            }
            spellings.insert(folded.clone(), key);
            table.insert(folded, entry);
        }

        Ok(Self { entries: table })
    }

    /// Parse a JSON object of `{ "utterance": { "person": ..., ... } }`
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::Parse`] for malformed JSON or unknown fields,
    /// and the validation errors of [`Grammar::from_entries`].
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut entries = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let entry: GrammarEntry = serde_json::from_value(value)?;
            entries.push((key, entry));
        }
        Self::from_entries(entries)
    }

    /// Load a JSON grammar file
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::Io`] if the file cannot be read, otherwise the
    /// errors of [`Grammar::from_json`].
    pub fn load(path: &Path) -> Result<Self, GrammarError> {
        let json = std::fs::read_to_string(path).map_err(|source| GrammarError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an utterance, matching case-insensitively
    #[must_use]
    pub fn lookup(&self, utterance: &str) -> Option<&GrammarEntry> {
        self.entries.get(&normalize(utterance))
    }

    #[must_use]
    pub fn is_known(&self, utterance: &str) -> bool {
        self.lookup(utterance).is_some()
    }

    /// The `field` value of the utterance's entry, if both exist
    #[must_use]
    pub fn classify(&self, utterance: &str, field: SlotField) -> Option<&str> {
        self.lookup(utterance).and_then(|entry| entry.field(field))
    }

    #[must_use]
    pub fn person(&self, utterance: &str) -> Option<&str> {
        self.classify(utterance, SlotField::Person)
    }

    #[must_use]
    pub fn day(&self, utterance: &str) -> Option<&str> {
        self.classify(utterance, SlotField::Day)
    }

    #[must_use]
    pub fn time(&self, utterance: &str) -> Option<&str> {
        self.classify(utterance, SlotField::Time)
    }

    #[must_use]
    pub fn answer(&self, utterance: &str) -> Option<Answer> {
        self.lookup(utterance).and_then(|entry| entry.answer)
    }

    #[must_use]
    pub fn greeting(&self, utterance: &str) -> Option<&str> {
        self.classify(utterance, SlotField::Greeting)
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Case folding is the only normalization: no trimming, no stemming
fn normalize(utterance: &str) -> String {
    utterance.to_lowercase()
}
