//! Synchronous building blocks for adaptive spell-checking: locale codes,
//! lookup tables, the word memo and the detection trigger state machine.

pub mod cache;
pub mod contraction;
pub mod detection;
pub mod fallback;
pub mod locale;
pub mod trigger;

pub use cache::MemoCache;
pub use contraction::is_contraction_stem;
pub use detection::{detection_sample, DetectionResult, LanguageGuess, DEFAULT_MIN_RELIABILITY};
pub use fallback::fallback_locale;
pub use locale::{extract_locale, normalize, LanguageCode, LocaleCode, LocaleError};
pub use trigger::{DetectionTrigger, PipelinePhase, TriggerConfig};
