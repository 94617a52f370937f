//! Fakes shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use polyspell_core::{normalize, DetectionResult, LanguageGuess, LocaleCode};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use crate::alternates::{KeyValueStore, MemoryStore};
use crate::config::{DictionaryConfig, SpellConfig};
use crate::guesser::LanguageGuesser;
use crate::oracle::{MisspelledRange, NativeSpellchecker, SpellcheckerFactory};
use crate::resolver::{EnvProvider, LocaleResolver, StaticLocaleSource};
use crate::session::SpellCheckSession;
use crate::store::{DictionaryBlob, DictionarySource, DictionaryStore};

const PADDING_LINE: usize = 64;
const MIN_DICTIONARY_BYTES: usize = 8 * 1024;

/// Routes `tracing` output through the test harness. `RUST_LOG` overrides
/// the `info` default.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A word-list dictionary padded past the validity threshold. Lines starting
/// with `#` are padding.
pub fn dictionary_bytes(words: &[&str]) -> Vec<u8> {
    let mut raw = words.join("\n");
    raw.push('\n');
    while raw.len() < MIN_DICTIONARY_BYTES {
        raw.push_str(&"#".repeat(PADDING_LINE));
        raw.push('\n');
    }
    raw.into_bytes()
}

pub fn blob_with(words: &[&str]) -> DictionaryBlob {
    DictionaryBlob::new(dictionary_bytes(words))
}

#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Case-sensitive engine over the words of a `dictionary_bytes` blob.
#[derive(Debug, Default)]
pub struct WordListSpellchecker {
    words: HashSet<String>,
    learned: Mutex<HashSet<String>>,
    lookups: CallCounter,
}

impl WordListSpellchecker {
    /// Counts `is_misspelled` calls only.
    pub fn counter(&self) -> CallCounter {
        self.lookups.clone()
    }

    fn knows(&self, word: &str) -> bool {
        self.words.contains(word) || self.learned.lock().unwrap().contains(word)
    }
}

impl NativeSpellchecker for WordListSpellchecker {
    fn set_dictionary(&mut self, locale: &LocaleCode, dictionary: &DictionaryBlob) -> anyhow::Result<()> {
        let raw = std::str::from_utf8(dictionary.as_bytes())
            .map_err(|error| anyhow!("dictionary for {locale} is not a word list: {error}"))?;
        self.words = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Ok(())
    }

    fn is_misspelled(&self, word: &str) -> bool {
        self.lookups.bump();
        !self.knows(word)
    }

    fn check_spelling(&self, text: &str) -> Vec<MisspelledRange> {
        let mut ranges = Vec::new();
        let mut start = None;
        for (index, ch) in text.char_indices().chain([(text.len(), ' ')]) {
            let in_word = ch.is_alphanumeric() || ch == '\'';
            match (start, in_word) {
                (None, true) => start = Some(index),
                (Some(from), false) => {
                    if !self.knows(&text[from..index]) {
                        ranges.push(MisspelledRange { start: from, end: index });
                    }
                    start = None;
                }
                _ => {}
            }
        }
        ranges
    }

    fn corrections_for_misspelling(&self, word: &str) -> Vec<String> {
        let lower = word.to_lowercase();
        let mut corrections: Vec<String> = self
            .words
            .iter()
            .filter(|known| known.to_lowercase() != lower && known.len().abs_diff(word.len()) <= 1)
            .filter(|known| known.chars().next() == word.chars().next())
            .cloned()
            .collect();
        corrections.sort();
        corrections
    }

    fn add(&self, word: &str) -> bool {
        self.learned.lock().unwrap().insert(word.to_string());
        true
    }

    fn available_dictionaries(&self) -> Vec<String> {
        Vec::new()
    }
}

pub fn word_list_factory() -> Arc<dyn SpellcheckerFactory> {
    let create = || Box::new(WordListSpellchecker::default()) as Box<dyn NativeSpellchecker>;
    Arc::new(create)
}

/// In-memory dictionary server. Unknown locales fail like a 404.
#[derive(Debug, Default)]
pub struct FakeDictionarySource {
    dictionaries: HashMap<LocaleCode, Vec<u8>>,
    fetches: Mutex<HashMap<LocaleCode, usize>>,
    delay: Option<Duration>,
}

impl FakeDictionarySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_words(self, locale: &str, words: &[&str]) -> Self {
        self.with_raw(locale, dictionary_bytes(words))
    }

    pub fn with_raw(mut self, locale: &str, bytes: Vec<u8>) -> Self {
        self.dictionaries.insert(normalize(locale).unwrap(), bytes);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self, locale: &LocaleCode) -> usize {
        self.fetches.lock().unwrap().get(locale).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl DictionarySource for FakeDictionarySource {
    fn url_for(&self, locale: &LocaleCode) -> String {
        format!("memory://{}", locale.as_str().to_lowercase())
    }

    async fn fetch(&self, locale: &LocaleCode) -> anyhow::Result<Vec<u8>> {
        *self.fetches.lock().unwrap().entry(locale.clone()).or_default() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.dictionaries.get(locale) {
            Some(bytes) => Ok(bytes.clone()),
            None => bail!("404 for {}", self.url_for(locale)),
        }
    }
}

pub struct FixedEnv {
    key: String,
    value: Option<String>,
}

impl FixedEnv {
    pub fn new(key: &str, value: Option<&str>) -> Self {
        Self {
            key: key.to_string(),
            value: value.map(str::to_string),
        }
    }
}

impl EnvProvider for FixedEnv {
    fn var(&self, key: &str) -> Option<String> {
        if key == self.key {
            self.value.clone()
        } else {
            None
        }
    }
}

/// Always returns the same guess and records every sample it was given.
pub struct FixedGuesser {
    result: Option<DetectionResult>,
    samples: Mutex<Vec<String>>,
}

impl FixedGuesser {
    pub fn reliable(code: &str, percent: u8) -> Self {
        Self {
            result: Some(DetectionResult {
                reliable: true,
                languages: vec![LanguageGuess {
                    code: code.to_string(),
                    percent,
                }],
            }),
            samples: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            samples: Mutex::new(Vec::new()),
        }
    }

    pub fn samples(&self) -> Vec<String> {
        self.samples.lock().unwrap().clone()
    }
}

impl LanguageGuesser for FixedGuesser {
    fn detect(&self, text: &str) -> anyhow::Result<DetectionResult> {
        self.samples.lock().unwrap().push(text.to_string());
        self.result.clone().ok_or_else(|| anyhow!("detector unavailable"))
    }
}

pub struct Fixture {
    pub session: Arc<SpellCheckSession>,
    pub source: Arc<FakeDictionarySource>,
    pub memo_store: Arc<dyn KeyValueStore>,
    pub dir: TempDir,
}

impl Fixture {
    /// A second session over the same cache directory and memo store.
    pub fn reopen(&self, guesser: Arc<dyn LanguageGuesser>) -> Arc<SpellCheckSession> {
        build_session(self.dir.path(), self.source.clone(), guesser, self.memo_store.clone())
    }
}

/// Session over a temp cache dir, an empty installed-locale list, a word
/// list engine and an in-memory memo.
pub fn fixture_session(source: FakeDictionarySource, guesser: Arc<dyn LanguageGuesser>) -> Fixture {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(source);
    let memo_store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::default());
    let session = build_session(dir.path(), source.clone(), guesser, memo_store.clone());
    Fixture {
        session,
        source,
        memo_store,
        dir,
    }
}

fn build_session(
    dir: &std::path::Path,
    source: Arc<FakeDictionarySource>,
    guesser: Arc<dyn LanguageGuesser>,
    memo_store: Arc<dyn KeyValueStore>,
) -> Arc<SpellCheckSession> {
    let config = SpellConfig {
        dictionary: DictionaryConfig {
            cache_dir: dir.join("dictionaries"),
            ..DictionaryConfig::default()
        },
        ..SpellConfig::default()
    };
    let store = Arc::new(DictionaryStore::new(&config.dictionary, source));
    let resolver = Arc::new(LocaleResolver::new(
        Arc::new(StaticLocaleSource::new(Vec::new())),
        Arc::new(FixedEnv::new("LANG", None)),
        &config.locale,
    ));

    SpellCheckSession::builder(config)
        .store(store)
        .resolver(resolver)
        .spellchecker_factory(word_list_factory())
        .guesser(guesser)
        .key_value_store(memo_store)
        .build()
        .unwrap()
}
