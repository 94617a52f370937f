use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::Result;
use polyspell_core::{fallback_locale, is_contraction_stem, normalize, LanguageCode, LocaleCode};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::alternates::{AlternatesMemo, JsonFileStore, KeyValueStore};
use crate::config::SpellConfig;
use crate::guesser::{guess_language, LanguageGuesser, WhatlangGuesser};
use crate::oracle::{EmptySpellchecker, MisspelledRange, MisspellingOracle, NativeSpellchecker, SpellcheckerFactory};
use crate::pipeline::{InputEvent, LanguageDetectionPipeline};
use crate::resolver::LocaleResolver;
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::store::{DictionaryBlob, DictionaryStore};

const SIGNAL_CAPACITY: usize = 256;

/// What the session is currently checking against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Selection {
    Dictionary(LocaleCode),
    /// Every candidate failed; the hint is kept but nothing is flagged.
    NoDictionary(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    SpellCheckInvoked,
    SpellingErrorOccurred(String),
    SpellcheckerChanged(Selection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Installed(LocaleCode),
    /// The effective locale was already active; nothing was reloaded.
    Unchanged(LocaleCode),
    NoDictionary(String),
    Disposed,
}

impl SwitchOutcome {
    pub fn has_dictionary(&self) -> bool {
        matches!(self, SwitchOutcome::Installed(_) | SwitchOutcome::Unchanged(_))
    }
}

#[derive(Default)]
struct SessionState {
    selection: Option<Selection>,
    oracle: Option<Arc<MisspellingOracle>>,
}

/// Spell-checking state for one editing surface.
///
/// Owns the active locale and oracle. Switches are serialized, and a switch
/// to the locale that is already active never reloads the dictionary.
pub struct SpellCheckSession {
    config: SpellConfig,
    store: Arc<DictionaryStore>,
    resolver: Arc<LocaleResolver>,
    factory: Arc<dyn SpellcheckerFactory>,
    guesser: Arc<dyn LanguageGuesser>,
    scheduler: Arc<dyn Scheduler>,
    alternates: AlternatesMemo,
    state: RwLock<SessionState>,
    switch_lock: tokio::sync::Mutex<()>,
    signals: broadcast::Sender<SessionSignal>,
    disposed: AtomicBool,
    pipelines: Mutex<Vec<JoinHandle<()>>>,
}

pub struct SessionBuilder {
    config: SpellConfig,
    store: Option<Arc<DictionaryStore>>,
    resolver: Option<Arc<LocaleResolver>>,
    factory: Option<Arc<dyn SpellcheckerFactory>>,
    guesser: Option<Arc<dyn LanguageGuesser>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    key_value_store: Option<Arc<dyn KeyValueStore>>,
}

impl SessionBuilder {
    pub fn store(mut self, store: Arc<DictionaryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn resolver(mut self, resolver: Arc<LocaleResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn spellchecker_factory(mut self, factory: Arc<dyn SpellcheckerFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn guesser(mut self, guesser: Arc<dyn LanguageGuesser>) -> Self {
        self.guesser = Some(guesser);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn key_value_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_value_store = Some(store);
        self
    }

    pub fn build(self) -> Result<Arc<SpellCheckSession>> {
        let config = self.config;
        let store = match self.store {
            Some(store) => store,
            None => Arc::new(DictionaryStore::with_http(&config.dictionary)?),
        };
        let factory = self.factory.unwrap_or_else(|| {
            let empty = || Box::new(EmptySpellchecker) as Box<dyn NativeSpellchecker>;
            Arc::new(empty)
        });
        let resolver = self.resolver.unwrap_or_else(|| {
            let dictionaries = factory.create().available_dictionaries();
            Arc::new(LocaleResolver::system(&config.locale, dictionaries))
        });
        let key_value_store = self
            .key_value_store
            .unwrap_or_else(|| Arc::new(JsonFileStore::new(&config.storage.alternates_path)));
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);

        Ok(Arc::new(SpellCheckSession {
            store,
            resolver,
            factory,
            guesser: self.guesser.unwrap_or_else(|| Arc::new(WhatlangGuesser::new())),
            scheduler: self.scheduler.unwrap_or_else(|| Arc::new(TokioScheduler)),
            alternates: AlternatesMemo::load(key_value_store),
            state: RwLock::new(SessionState::default()),
            switch_lock: tokio::sync::Mutex::new(()),
            signals,
            disposed: AtomicBool::new(false),
            pipelines: Mutex::new(Vec::new()),
            config,
        }))
    }
}

impl SpellCheckSession {
    pub fn builder(config: SpellConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            store: None,
            resolver: None,
            factory: None,
            guesser: None,
            scheduler: None,
            key_value_store: None,
        }
    }

    pub fn config(&self) -> &SpellConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.signals.subscribe()
    }

    pub fn current_language(&self) -> Option<Selection> {
        self.read_state().selection.clone()
    }

    pub fn current_locale(&self) -> Option<LocaleCode> {
        self.current_oracle().map(|oracle| oracle.locale().clone())
    }

    pub fn has_dictionary(&self) -> bool {
        self.read_state().oracle.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Switches to the best available dictionary for `hint`, which may be a
    /// language (`de`) or a locale (`de_CH`). Never fails: when no
    /// dictionary can be loaded the session stops flagging words.
    pub async fn switch_language(&self, hint: &str) -> SwitchOutcome {
        let _serial = self.switch_lock.lock().await;
        if self.is_disposed() {
            return SwitchOutcome::Disposed;
        }

        let hint = hint.trim();
        let remembered = self.alternates.get(hint);
        let plan = self.acquisition_plan(hint).await;
        debug!(%hint, ?remembered, ?plan, "requesting dictionary");

        if let Some(active) = self.current_locale() {
            let expected = remembered.as_ref().or(plan.first());
            if expected == Some(&active) {
                debug!(%hint, locale = %active, "locale already active");
                return SwitchOutcome::Unchanged(active);
            }
        }

        let mut loaded = None;
        if let Some(locale) = &remembered {
            loaded = self.load_oracle(locale).await;
            if loaded.is_none() {
                debug!(%hint, %locale, "remembered locale failed, retrying alternatives");
                self.alternates.forget(hint);
            }
        }
        if loaded.is_none() {
            for locale in plan.iter().filter(|l| Some(*l) != remembered.as_ref()) {
                loaded = self.load_oracle(locale).await;
                if loaded.is_some() {
                    break;
                }
            }
        }

        if self.is_disposed() {
            debug!(%hint, "session disposed during switch, discarding result");
            return SwitchOutcome::Disposed;
        }

        match loaded {
            Some(oracle) => {
                self.alternates.remember(hint, oracle.locale());
                self.install(oracle)
            }
            None => self.detach(hint),
        }
    }

    /// Detects the language of `sample` once and switches to it. Returns
    /// `None` when the guess was not reliable.
    pub async fn provide_hint_text(&self, sample: &str) -> Option<SwitchOutcome> {
        let detection = &self.config.detection;
        let language = guess_language(
            self.guesser.clone(),
            sample,
            detection.sample_len,
            detection.min_reliability,
        )
        .await?;
        Some(self.switch_language(language.as_str()).await)
    }

    /// Starts watching `input` for text worth running detection on. The
    /// pipeline stops when the sender is dropped or the session disposed.
    pub fn attach_to_input(self: &Arc<Self>, input: mpsc::Receiver<InputEvent>) {
        if self.is_disposed() {
            return;
        }
        let pipeline = LanguageDetectionPipeline::new(self, input);
        let handle = tokio::spawn(pipeline.run());
        let mut pipelines = self.pipelines.lock().unwrap_or_else(PoisonError::into_inner);
        pipelines.retain(|task| !task.is_finished());
        pipelines.push(handle);
    }

    pub fn is_misspelled(&self, word: &str) -> bool {
        self.emit(SessionSignal::SpellCheckInvoked);
        if is_contraction_stem(word) {
            return false;
        }
        let Some(oracle) = self.current_oracle() else {
            return false;
        };

        let misspelled = oracle.is_misspelled(word);
        if misspelled {
            self.emit(SessionSignal::SpellingErrorOccurred(word.to_string()));
        }
        misspelled
    }

    pub fn check_spelling(&self, text: &str) -> Vec<MisspelledRange> {
        self.emit(SessionSignal::SpellCheckInvoked);
        let Some(oracle) = self.current_oracle() else {
            return Vec::new();
        };

        let ranges = oracle.check_spelling(text);
        for range in &ranges {
            if let Some(word) = text.get(range.start..range.end) {
                self.emit(SessionSignal::SpellingErrorOccurred(word.to_string()));
            }
        }
        ranges
    }

    pub fn corrections_for_misspelling(&self, word: &str) -> Vec<String> {
        self.current_oracle()
            .map(|oracle| oracle.corrections_for(word))
            .unwrap_or_default()
    }

    /// Returns false when no dictionary is loaded or the platform cannot
    /// learn words.
    pub fn add_to_dictionary(&self, word: &str) -> bool {
        self.current_oracle()
            .map(|oracle| oracle.add(word))
            .unwrap_or(false)
    }

    /// Downloads the dictionary `hint` would switch to without loading it.
    /// Candidates follow the same order as a switch, remembered locale first.
    pub async fn prewarm(&self, hint: &str) -> Option<PathBuf> {
        let hint = hint.trim();
        let mut candidates: Vec<LocaleCode> = self.alternates.get(hint).into_iter().collect();
        for locale in self.acquisition_plan(hint).await {
            if !candidates.contains(&locale) {
                candidates.push(locale);
            }
        }

        for locale in candidates {
            match self.store.acquire(&locale, true).await {
                Ok(_) => return Some(self.store.cache_path(&locale)),
                Err(error) => debug!(%locale, "prewarm candidate failed: {error}"),
            }
        }
        None
    }

    /// Stops every attached pipeline. An in-flight switch finishes its
    /// download but its result is dropped.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        let mut pipelines = self.pipelines.lock().unwrap_or_else(PoisonError::into_inner);
        for task in pipelines.drain(..) {
            task.abort();
        }
        debug!("spell check session disposed");
    }

    pub(crate) fn guesser(&self) -> Arc<dyn LanguageGuesser> {
        self.guesser.clone()
    }

    pub(crate) fn scheduler(&self) -> Arc<dyn Scheduler> {
        self.scheduler.clone()
    }

    async fn acquisition_plan(&self, hint: &str) -> Vec<LocaleCode> {
        let mut plan = Vec::new();
        if let Ok(exact) = normalize(hint) {
            plan.push(exact);
        }
        if let Ok(language) = LanguageCode::prefix_of(hint) {
            match self.resolver.likely_locale_for(&language).await {
                Ok(likely) => plan.push(likely),
                Err(error) => debug!(%language, "{error}"),
            }
            if let Some(fallback) = fallback_locale(&language) {
                plan.push(fallback);
            }
        }

        let mut seen = Vec::with_capacity(plan.len());
        plan.retain(|locale| {
            if seen.contains(locale) {
                return false;
            }
            seen.push(locale.clone());
            true
        });
        plan
    }

    async fn load_oracle(&self, locale: &LocaleCode) -> Option<MisspellingOracle> {
        let blob = match self.store.acquire(locale, false).await {
            Ok(acquired) => acquired.into_blob()?,
            Err(error) => {
                debug!(%locale, "failed to load dictionary: {error}");
                return None;
            }
        };
        self.build_oracle(locale, &blob)
    }

    fn build_oracle(&self, locale: &LocaleCode, blob: &DictionaryBlob) -> Option<MisspellingOracle> {
        let mut engine = self.factory.create();
        if let Err(error) = engine.set_dictionary(locale, blob) {
            warn!(%locale, "native spellchecker rejected dictionary: {error:#}");
            return None;
        }
        Some(MisspellingOracle::new(locale.clone(), engine, &self.config.oracle))
    }

    fn install(&self, oracle: MisspellingOracle) -> SwitchOutcome {
        let locale = oracle.locale().clone();
        {
            let mut state = self.write_state();
            if state.oracle.as_ref().map(|active| active.locale()) == Some(&locale) {
                return SwitchOutcome::Unchanged(locale);
            }
            state.selection = Some(Selection::Dictionary(locale.clone()));
            state.oracle = Some(Arc::new(oracle));
        }

        info!(%locale, "switched spellchecker");
        self.emit(SessionSignal::SpellcheckerChanged(Selection::Dictionary(locale.clone())));
        SwitchOutcome::Installed(locale)
    }

    fn detach(&self, hint: &str) -> SwitchOutcome {
        let selection = Selection::NoDictionary(hint.to_string());
        {
            let mut state = self.write_state();
            if state.oracle.is_none() && state.selection.as_ref() == Some(&selection) {
                return SwitchOutcome::NoDictionary(hint.to_string());
            }
            state.selection = Some(selection.clone());
            state.oracle = None;
        }

        warn!(%hint, "no dictionary could be loaded, spell checking inactive");
        self.emit(SessionSignal::SpellcheckerChanged(selection));
        SwitchOutcome::NoDictionary(hint.to_string())
    }

    fn current_oracle(&self) -> Option<Arc<MisspellingOracle>> {
        self.read_state().oracle.clone()
    }

    fn emit(&self, signal: SessionSignal) {
        // No subscribers is fine.
        let _ = self.signals.send(signal);
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SpellCheckSession {
    fn drop(&mut self) {
        let pipelines = self.pipelines.get_mut().unwrap_or_else(PoisonError::into_inner);
        for task in pipelines.drain(..) {
            task.abort();
        }
    }
}
