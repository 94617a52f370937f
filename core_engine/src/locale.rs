use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocaleError {
    #[error("{0} is not a valid language code")]
    InvalidLocaleFormat(String),
    #[error("{0} is not a two-letter language code")]
    InvalidLanguage(String),
}

/// Two-letter lowercase ISO 639-1 language identifier, e.g. `en`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn parse(raw: &str) -> Result<Self, LocaleError> {
        let lowered = raw.trim().to_ascii_lowercase();
        if !is_two_latin_letters(&lowered) {
            return Err(LocaleError::InvalidLanguage(raw.to_string()));
        }
        Ok(Self(lowered))
    }

    /// Language prefix of a hint such as `en`, `en-US` or `pt_BR`.
    pub fn prefix_of(hint: &str) -> Result<Self, LocaleError> {
        let head = hint.trim().split(['-', '_']).next().unwrap_or_default();
        Self::parse(head)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(value: LanguageCode) -> Self {
        value.0
    }
}

/// Canonical `xx-YY` locale. Only [`normalize`] constructs one, so every
/// value is well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleCode(String);

impl LocaleCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn language(&self) -> LanguageCode {
        LanguageCode(self.0[..2].to_string())
    }

    pub fn region(&self) -> &str {
        &self.0[3..]
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LocaleCode {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

impl TryFrom<String> for LocaleCode {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize(&value)
    }
}

impl From<LocaleCode> for String {
    fn from(value: LocaleCode) -> Self {
        value.0
    }
}

/// Flattens the platform spellings of a locale (`en_US`, `en-us`, `EN-US`)
/// into the `en-US` form used for dictionary names.
pub fn normalize(code: &str) -> Result<LocaleCode, LocaleError> {
    let mut parts = code.split(['-', '_']);
    let (Some(lang), Some(region), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(LocaleError::InvalidLocaleFormat(code.to_string()));
    };

    let lang = lang.to_ascii_lowercase();
    let region = region.to_ascii_uppercase();
    if !is_two_latin_letters(&lang) || !is_two_latin_letters(&region) {
        return Err(LocaleError::InvalidLocaleFormat(code.to_string()));
    }

    Ok(LocaleCode(format!("{lang}-{region}")))
}

/// Finds the first `xx_YY` run inside a platform string such as
/// `en_US.utf8` or `sr_RS@latin`.
pub fn extract_locale(raw: &str) -> Option<LocaleCode> {
    let bytes = raw.as_bytes();
    bytes.windows(5).enumerate().find_map(|(start, w)| {
        let shaped = w[0].is_ascii_lowercase()
            && w[1].is_ascii_lowercase()
            && w[2] == b'_'
            && w[3].is_ascii_uppercase()
            && w[4].is_ascii_uppercase();
        if !shaped {
            return None;
        }
        normalize(&raw[start..start + 5]).ok()
    })
}

fn is_two_latin_letters(value: &str) -> bool {
    value.len() == 2 && value.bytes().all(|b| b.is_ascii_alphabetic())
}
