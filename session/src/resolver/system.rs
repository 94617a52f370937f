use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use polyspell_core::{fallback_locale, normalize, LanguageCode};
use tokio::process::Command;
use tracing::debug;

use crate::resolver::LocaleSource;

/// Lists installed locales by running `locale -a`.
pub struct CommandLocaleSource {
    program: String,
}

impl Default for CommandLocaleSource {
    fn default() -> Self {
        Self {
            program: "locale".to_string(),
        }
    }
}

impl CommandLocaleSource {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl LocaleSource for CommandLocaleSource {
    async fn installed_locales(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.program)
            .arg("-a")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to execute {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(anyhow!("{} exited with {}: {}", self.program, output.status, stderr));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        let locales = parse_listing(&listing);
        debug!(count = locales.len(), "raw locale list");
        Ok(locales)
    }
}

fn parse_listing(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Derives installed locales from the native engine's dictionary list.
///
/// Some platforms mix bare languages and full locales (`["en", "pt_BR",
/// "ko"]`); bare languages take their fallback locale.
pub struct DictionaryListLocaleSource {
    dictionaries: Vec<String>,
}

impl DictionaryListLocaleSource {
    pub fn new(dictionaries: Vec<String>) -> Self {
        Self { dictionaries }
    }
}

#[async_trait]
impl LocaleSource for DictionaryListLocaleSource {
    async fn installed_locales(&self) -> Result<Vec<String>> {
        let locales = self
            .dictionaries
            .iter()
            .filter_map(|entry| {
                if entry.len() == 2 {
                    let language = LanguageCode::parse(entry).ok()?;
                    return fallback_locale(&language).map(String::from);
                }
                normalize(entry).ok().map(String::from)
            })
            .collect();
        Ok(locales)
    }
}

/// A fixed list, for hosts that enumerate locales themselves (for example
/// installed keyboard languages).
#[derive(Debug, Default)]
pub struct StaticLocaleSource {
    locales: Vec<String>,
    calls: AtomicUsize,
}

impl StaticLocaleSource {
    pub fn new(locales: Vec<String>) -> Self {
        Self {
            locales,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocaleSource for StaticLocaleSource {
    async fn installed_locales(&self) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.locales.clone())
    }
}
