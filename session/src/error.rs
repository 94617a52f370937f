use std::path::PathBuf;

use polyspell_core::{LocaleCode, LocaleError};

pub type Result<T, E = SpellError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum SpellError {
    #[error(transparent)]
    InvalidLocaleFormat(#[from] LocaleError),

    #[error("failed to download dictionary for {locale}: {reason}")]
    DownloadFailed { locale: LocaleCode, reason: String },

    #[error("dictionary for {locale} is most likely bogus ({size} bytes)")]
    CorruptDownload { locale: LocaleCode, size: u64 },

    #[error("no locale known for language {0}")]
    UnknownLanguage(String),

    #[error("language detection was not reliable enough")]
    DetectionUnreliable,

    #[error("dictionary cache I/O failed at {}: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SpellError {
    pub(crate) fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheIo {
            path: path.into(),
            source,
        }
    }
}
