use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use polyspell_core::LocaleCode;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::store::DictionarySource;

/// Fetches Chromium-style `.bdic` dictionaries over HTTP.
pub struct HttpDictionarySource {
    base_url: String,
    client: Client,
}

impl HttpDictionarySource {
    pub fn new(base_url: &str) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(anyhow!("dictionary.base_url is empty"));
        }

        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            client: Client::builder()
                .build()
                .context("failed to build HTTP client")?,
        })
    }
}

#[async_trait]
impl DictionarySource for HttpDictionarySource {
    fn url_for(&self, locale: &LocaleCode) -> String {
        format!(
            "{}/{}-3-0.bdic",
            self.base_url,
            locale.as_str().to_ascii_lowercase()
        )
    }

    async fn fetch(&self, locale: &LocaleCode) -> Result<Vec<u8>> {
        let url = self.url_for(locale);
        let response = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .send()
            .await
            .with_context(|| format!("failed to request {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("unable to download, server returned {status}"));
        }

        let body = response
            .bytes()
            .await
            .context("failed to read dictionary response body")?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyspell_core::normalize;

    #[test]
    fn url_is_derived_from_locale() {
        let source = HttpDictionarySource::new("https://dict.example.com/chrome/").unwrap();
        let locale = normalize("pt_BR").unwrap();
        assert_eq!(
            source.url_for(&locale),
            "https://dict.example.com/chrome/pt-br-3-0.bdic"
        );
    }

    #[test]
    fn empty_base_url_is_rejected() {
        assert!(HttpDictionarySource::new("  ").is_err());
    }
}
