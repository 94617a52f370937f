//! Adaptive spell-checking session: detects the language being typed,
//! fetches and caches the matching dictionary and answers misspelling
//! queries against it.

pub mod alternates;
pub mod config;
pub mod error;
pub mod guesser;
pub mod oracle;
pub mod pipeline;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use alternates::{AlternatesMemo, JsonFileStore, KeyValueStore, MemoryStore};
pub use config::SpellConfig;
pub use error::{Result, SpellError};
pub use guesser::{guess_language, LanguageGuesser, WhatlangGuesser};
pub use oracle::{
    EmptySpellchecker, MisspelledRange, MisspellingOracle, NativeSpellchecker, SpellcheckerFactory,
};
pub use pipeline::{InputEvent, LanguageDetectionPipeline};
pub use resolver::{EnvProvider, LocaleResolver, LocaleSource, LocaleTable, SystemEnv};
pub use scheduler::{Scheduler, TokioScheduler};
pub use session::{SessionBuilder, SessionSignal, Selection, SpellCheckSession, SwitchOutcome};
pub use store::{Acquired, DictionaryBlob, DictionarySource, DictionaryStore, HttpDictionarySource};

pub use polyspell_core::{normalize, LanguageCode, LocaleCode};
