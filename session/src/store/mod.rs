mod http;

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
pub use http::HttpDictionarySource;
use polyspell_core::LocaleCode;
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::DictionaryConfig;
use crate::error::{Result, SpellError};

/// Raw dictionary bytes as handed to the native engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryBlob(Arc<[u8]>);

impl DictionaryBlob {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Anything smaller than `min_valid_bytes` is a truncated or error-page
    /// download, never a legitimately empty dictionary.
    pub fn is_valid(&self, min_valid_bytes: u64) -> bool {
        meets_minimum(self.0.len() as u64, min_valid_bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    Bytes(DictionaryBlob),
    /// Returned for cache-only acquisition; the bytes stay on disk.
    Path(PathBuf),
}

impl Acquired {
    pub fn into_blob(self) -> Option<DictionaryBlob> {
        match self {
            Acquired::Bytes(blob) => Some(blob),
            Acquired::Path(_) => None,
        }
    }
}

fn meets_minimum(size: u64, min_valid_bytes: u64) -> bool {
    size >= min_valid_bytes
}

#[async_trait]
pub trait DictionarySource: Send + Sync {
    fn url_for(&self, locale: &LocaleCode) -> String;

    async fn fetch(&self, locale: &LocaleCode) -> anyhow::Result<Vec<u8>>;
}

/// Local cache of per-locale dictionaries backed by a remote source.
pub struct DictionaryStore {
    cache_dir: PathBuf,
    min_valid_bytes: u64,
    source: Arc<dyn DictionarySource>,
}

impl DictionaryStore {
    pub fn new(config: &DictionaryConfig, source: Arc<dyn DictionarySource>) -> Self {
        Self {
            cache_dir: config.cache_dir.clone(),
            min_valid_bytes: config.min_valid_bytes,
            source,
        }
    }

    pub fn with_http(config: &DictionaryConfig) -> anyhow::Result<Self> {
        let source = HttpDictionarySource::new(&config.base_url)?;
        Ok(Self::new(config, Arc::new(source)))
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache_path(&self, locale: &LocaleCode) -> PathBuf {
        self.cache_dir.join(format!("{locale}.bdic"))
    }

    /// Loads the dictionary for `locale`, preferring the local copy and
    /// downloading on a miss or when the cached file is undersized.
    pub async fn acquire(&self, locale: &LocaleCode, cache_only: bool) -> Result<Acquired> {
        debug!(%locale, cache_only, "loading dictionary");
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|source| SpellError::cache_io(&self.cache_dir, source))?;

        let target = self.cache_path(locale);
        if let Some(found) = self.read_cached(&target, cache_only).await? {
            return Ok(found);
        }

        let url = self.source.url_for(locale);
        info!(%locale, %url, "downloading dictionary");
        let body = self
            .source
            .fetch(locale)
            .await
            .map_err(|error| SpellError::DownloadFailed {
                locale: locale.clone(),
                reason: format!("{error:#}"),
            })?;

        let blob = DictionaryBlob::new(body);
        if !blob.is_valid(self.min_valid_bytes) {
            let size = blob.len() as u64;
            warn!(%locale, size, "downloaded dictionary is undersized");
            return Err(SpellError::CorruptDownload {
                locale: locale.clone(),
                size,
            });
        }

        self.persist(&target, blob.clone()).await?;

        if cache_only {
            return Ok(Acquired::Path(target));
        }
        Ok(Acquired::Bytes(blob))
    }

    async fn read_cached(&self, target: &Path, cache_only: bool) -> Result<Option<Acquired>> {
        let metadata = match fs::metadata(target).await {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(SpellError::cache_io(target, error)),
        };

        if meets_minimum(metadata.len(), self.min_valid_bytes) {
            if cache_only {
                debug!(path = %target.display(), "dictionary already cached");
                return Ok(Some(Acquired::Path(target.to_path_buf())));
            }
            match fs::read(target).await.map(DictionaryBlob::new) {
                Ok(blob) if blob.is_valid(self.min_valid_bytes) => {
                    debug!(path = %target.display(), "returning local copy");
                    return Ok(Some(Acquired::Bytes(blob)));
                }
                Ok(_) => {}
                Err(error) => debug!(path = %target.display(), "failed to read cached dictionary: {error}"),
            }
        }

        warn!(
            path = %target.display(),
            size = metadata.len(),
            "cached dictionary exists but is most likely bogus, deleting"
        );
        fs::remove_file(target)
            .await
            .map_err(|source| SpellError::cache_io(target, source))?;
        Ok(None)
    }

    async fn persist(&self, target: &Path, blob: DictionaryBlob) -> Result<()> {
        let dir = self.cache_dir.clone();
        let destination = target.to_path_buf();
        let written = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut temp_file = NamedTempFile::new_in(&dir)?;
            temp_file.write_all(blob.as_bytes())?;
            temp_file.as_file().sync_all()?;
            temp_file.persist(&destination).map_err(|error| error.error)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)
        .and_then(|inner| inner);

        written.map_err(|source| SpellError::cache_io(target, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dictionary_bytes, FakeDictionarySource};
    use polyspell_core::normalize;

    fn store_in(dir: &Path, source: Arc<FakeDictionarySource>) -> DictionaryStore {
        let config = DictionaryConfig {
            cache_dir: dir.join("dictionaries"),
            ..DictionaryConfig::default()
        };
        DictionaryStore::new(&config, source)
    }

    #[tokio::test]
    async fn downloads_once_then_serves_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeDictionarySource::new().with_words("de-DE", &["Eimer", "Wasser"]));
        let store = store_in(dir.path(), source.clone());
        let de = normalize("de-DE").unwrap();

        let first = store.acquire(&de, false).await.unwrap().into_blob().unwrap();
        assert!(store.cache_path(&de).exists());
        let second = store.acquire(&de, false).await.unwrap().into_blob().unwrap();

        assert_eq!(first, second);
        assert_eq!(source.fetch_count(&de), 1);
    }

    #[tokio::test]
    async fn corrupted_cache_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeDictionarySource::new().with_words("en-US", &["bucket"]));
        let store = store_in(dir.path(), source.clone());
        let en = normalize("en_us").unwrap();

        std::fs::create_dir_all(store.cache_dir()).unwrap();
        std::fs::write(store.cache_path(&en), b"<html>502</html>").unwrap();

        let blob = store.acquire(&en, false).await.unwrap().into_blob().unwrap();
        assert!(blob.is_valid(8192));
        assert_eq!(source.fetch_count(&en), 1);
        assert_eq!(
            std::fs::metadata(store.cache_path(&en)).unwrap().len(),
            blob.len() as u64
        );
    }

    #[tokio::test]
    async fn undersized_download_is_rejected_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeDictionarySource::new().with_raw("es-MX", vec![0u8; 100]));
        let store = store_in(dir.path(), source);
        let mx = normalize("es-MX").unwrap();

        let error = store.acquire(&mx, false).await.unwrap_err();
        assert!(matches!(error, SpellError::CorruptDownload { size: 100, .. }));
        assert!(!store.cache_path(&mx).exists());
    }

    #[tokio::test]
    async fn network_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeDictionarySource::new());
        let store = store_in(dir.path(), source.clone());
        let zz = normalize("zz-ZZ").unwrap();

        let error = store.acquire(&zz, false).await.unwrap_err();
        assert!(matches!(error, SpellError::DownloadFailed { .. }));
        assert!(!store.cache_path(&zz).exists());
        assert_eq!(source.fetch_count(&zz), 1);
    }

    #[tokio::test]
    async fn cache_only_returns_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeDictionarySource::new().with_words("fr-FR", &["seau"]));
        let store = store_in(dir.path(), source.clone());
        let fr = normalize("fr-FR").unwrap();

        let downloaded = store.acquire(&fr, true).await.unwrap();
        assert_eq!(downloaded, Acquired::Path(store.cache_path(&fr)));
        let cached = store.acquire(&fr, true).await.unwrap();
        assert_eq!(cached, Acquired::Path(store.cache_path(&fr)));
        assert_eq!(source.fetch_count(&fr), 1);
    }

    #[test]
    fn blob_validity_threshold() {
        assert!(!DictionaryBlob::new(vec![0u8; 8191]).is_valid(8192));
        assert!(DictionaryBlob::new(dictionary_bytes(&["a"])).is_valid(8192));
    }
}
