use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use polyspell_core::{is_contraction_stem, LocaleCode, MemoCache};
use serde::{Deserialize, Serialize};

use crate::config::OracleConfig;
use crate::store::DictionaryBlob;

/// Byte range of a misspelled word inside a checked span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisspelledRange {
    pub start: usize,
    pub end: usize,
}

/// The platform spelling engine, loaded with one dictionary at a time.
pub trait NativeSpellchecker: Send + Sync {
    fn set_dictionary(&mut self, locale: &LocaleCode, dictionary: &DictionaryBlob) -> anyhow::Result<()>;

    fn is_misspelled(&self, word: &str) -> bool;

    fn check_spelling(&self, text: &str) -> Vec<MisspelledRange>;

    fn corrections_for_misspelling(&self, word: &str) -> Vec<String>;

    /// Learns `word`. Returns false where the platform does not support it.
    fn add(&self, word: &str) -> bool;

    fn available_dictionaries(&self) -> Vec<String>;
}

pub trait SpellcheckerFactory: Send + Sync {
    fn create(&self) -> Box<dyn NativeSpellchecker>;
}

impl<F> SpellcheckerFactory for F
where
    F: Fn() -> Box<dyn NativeSpellchecker> + Send + Sync,
{
    fn create(&self) -> Box<dyn NativeSpellchecker> {
        self()
    }
}

/// Stand-in for hosts without a native engine: nothing is ever misspelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptySpellchecker;

impl NativeSpellchecker for EmptySpellchecker {
    fn set_dictionary(&mut self, _locale: &LocaleCode, _dictionary: &DictionaryBlob) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_misspelled(&self, _word: &str) -> bool {
        false
    }

    fn check_spelling(&self, _text: &str) -> Vec<MisspelledRange> {
        Vec::new()
    }

    fn corrections_for_misspelling(&self, _word: &str) -> Vec<String> {
        Vec::new()
    }

    fn add(&self, _word: &str) -> bool {
        false
    }

    fn available_dictionaries(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Answers misspelling queries for the active locale.
pub struct MisspellingOracle {
    locale: LocaleCode,
    engine: Box<dyn NativeSpellchecker>,
    cache: Mutex<MemoCache<String, bool>>,
}

impl MisspellingOracle {
    pub fn new(locale: LocaleCode, engine: Box<dyn NativeSpellchecker>, config: &OracleConfig) -> Self {
        Self {
            locale,
            engine,
            cache: Mutex::new(MemoCache::new(config.cache_capacity, config.cache_ttl())),
        }
    }

    pub fn locale(&self) -> &LocaleCode {
        &self.locale
    }

    pub fn is_misspelled(&self, word: &str) -> bool {
        self.is_misspelled_at(word, Instant::now())
    }

    pub fn is_misspelled_at(&self, word: &str, now: Instant) -> bool {
        if is_contraction_stem(word) {
            return false;
        }

        let key = word.to_string();
        if let Some(cached) = self.cache().get(&key, now) {
            return cached;
        }

        let verdict = self.check_word(word);
        self.cache().insert(key, verdict, now);
        verdict
    }

    /// Misspelled ranges in `text`. Flagged capitalized words that open a
    /// sentence are re-checked in lowercase before being reported.
    pub fn check_spelling(&self, text: &str) -> Vec<MisspelledRange> {
        self.engine
            .check_spelling(text)
            .into_iter()
            .filter(|range| {
                let Some(word) = text.get(range.start..range.end) else {
                    return false;
                };
                if is_contraction_stem(word) {
                    return false;
                }
                if starts_sentence(text, range.start) && is_capitalized(word) {
                    return self.engine.is_misspelled(&word.to_lowercase());
                }
                true
            })
            .collect()
    }

    pub fn corrections_for(&self, word: &str) -> Vec<String> {
        self.engine.corrections_for_misspelling(word)
    }

    pub fn add(&self, word: &str) -> bool {
        let added = self.engine.add(word);
        if added {
            self.cache().remove(&word.to_string());
        }
        added
    }

    pub fn available_dictionaries(&self) -> Vec<String> {
        self.engine.available_dictionaries()
    }

    // A standalone word query is its own span, so a capitalized word is
    // always in sentence-initial position here.
    fn check_word(&self, word: &str) -> bool {
        if !self.engine.is_misspelled(word) {
            return false;
        }
        if is_capitalized(word) {
            return self.engine.is_misspelled(&word.to_lowercase());
        }
        true
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, MemoCache<String, bool>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn starts_sentence(text: &str, start: usize) -> bool {
    match text[..start].trim_end().chars().last() {
        None => true,
        Some(previous) => matches!(previous, '.' | '!' | '?' | '\u{3002}' | '\u{00a1}' | '\u{00bf}'),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{blob_with, CallCounter, WordListSpellchecker};
    use polyspell_core::normalize;

    fn oracle(locale: &str, words: &[&str]) -> (MisspellingOracle, CallCounter) {
        let locale = normalize(locale).unwrap();
        let mut engine = WordListSpellchecker::default();
        let counter = engine.counter();
        engine.set_dictionary(&locale, &blob_with(words)).unwrap();
        (
            MisspellingOracle::new(locale, Box::new(engine), &OracleConfig::default()),
            counter,
        )
    }

    #[test]
    fn answers_from_the_dictionary() {
        let (oracle, _) = oracle("de-DE", &["Eimer", "Wasser"]);
        assert!(!oracle.is_misspelled("Eimer"));
        assert!(oracle.is_misspelled("bucket"));
    }

    #[test]
    fn repeated_queries_hit_the_memo() {
        let (oracle, counter) = oracle("en-US", &["bucket"]);
        let now = Instant::now();
        for _ in 0..5 {
            assert!(oracle.is_misspelled_at("buckit", now + Duration::from_secs(1)));
        }
        assert_eq!(counter.get(), 1);

        assert!(oracle.is_misspelled_at("buckit", now + Duration::from_secs(6)));
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn contractions_never_reach_the_engine() {
        let (oracle, counter) = oracle("en-US", &["bucket"]);
        assert!(!oracle.is_misspelled("don't"));
        assert!(!oracle.is_misspelled("Couldn"));
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn capitalized_word_is_rechecked_in_lowercase() {
        let (oracle, counter) = oracle("en-US", &["bucket"]);
        assert!(!oracle.is_misspelled("Bucket"));
        assert_eq!(counter.get(), 2);
        assert!(oracle.is_misspelled("Eimer"));
    }

    #[test]
    fn sentence_initial_spans_are_rechecked() {
        let (oracle, _) = oracle("en-US", &["the", "bucket", "is", "full", "water"]);
        let text = "The bucket is full. Water is fine. Eimer";
        let ranges = oracle.check_spelling(text);
        let flagged: Vec<&str> = ranges.iter().map(|r| &text[r.start..r.end]).collect();
        assert_eq!(flagged, vec!["fine", "Eimer"]);
    }

    #[test]
    fn mid_sentence_capitals_are_not_excused() {
        let (oracle, _) = oracle("en-US", &["a", "bucket"]);
        let text = "a Bucket";
        let ranges = oracle.check_spelling(text);
        assert_eq!(ranges, vec![MisspelledRange { start: 2, end: 8 }]);
    }

    #[test]
    fn learned_word_invalidates_memo() {
        let (oracle, _) = oracle("en-US", &["bucket"]);
        assert!(oracle.is_misspelled("polyspell"));
        assert!(oracle.add("polyspell"));
        assert!(!oracle.is_misspelled("polyspell"));
    }

    #[test]
    fn empty_spellchecker_accepts_everything() {
        let engine = EmptySpellchecker;
        assert!(!engine.is_misspelled("qwzx"));
        assert!(engine.check_spelling("qwzx vbnm").is_empty());
        assert!(!engine.add("qwzx"));
    }
}
