use serde::{Deserialize, Serialize};

use crate::locale::LanguageCode;

pub const DEFAULT_MIN_RELIABILITY: u8 = 85;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageGuess {
    pub code: String,
    pub percent: u8,
}

/// Output of a language-guess capability: candidates best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DetectionResult {
    pub reliable: bool,
    pub languages: Vec<LanguageGuess>,
}

impl DetectionResult {
    pub fn unreliable() -> Self {
        Self::default()
    }

    /// The top-ranked language, if the guesser flagged the result reliable
    /// and the top candidate reaches `min_reliability` percent.
    pub fn accepted_language(&self, min_reliability: u8) -> Option<LanguageCode> {
        if !self.reliable {
            return None;
        }
        let top = self.languages.first()?;
        if top.percent < min_reliability {
            return None;
        }
        LanguageCode::prefix_of(&top.code).ok()
    }

    pub fn alternates(&self) -> &[LanguageGuess] {
        self.languages.get(1..).unwrap_or_default()
    }
}

/// The most recent `max_chars` characters of `text`.
pub fn detection_sample(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    match text.char_indices().nth(skip) {
        Some((offset, _)) => &text[offset..],
        None => "",
    }
}
