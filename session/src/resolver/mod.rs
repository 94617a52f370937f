mod system;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use polyspell_core::{extract_locale, fallback_locale, normalize, LanguageCode, LocaleCode};
pub use system::{CommandLocaleSource, DictionaryListLocaleSource, StaticLocaleSource};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::LocaleConfig;
use crate::error::{Result, SpellError};

/// Locale-like identifiers the host considers installed, e.g. the lines of
/// `locale -a` or the installed keyboard languages.
#[async_trait]
pub trait LocaleSource: Send + Sync {
    async fn installed_locales(&self) -> anyhow::Result<Vec<String>>;
}

/// Read-only environment access used for the regional override.
pub trait EnvProvider: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnv;

impl EnvProvider for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Language to locale mapping derived from what the host has installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleTable(HashMap<LanguageCode, LocaleCode>);

impl LocaleTable {
    /// A language gets an entry only when exactly one distinct installed
    /// locale exists for it; ambiguous languages defer to the fallback
    /// table. A well-formed `env_override` always wins for its language.
    pub fn build<S: AsRef<str>>(installed: &[S], env_override: Option<&str>) -> Self {
        let mut by_language: BTreeMap<LanguageCode, BTreeSet<LocaleCode>> = BTreeMap::new();
        for raw in installed {
            if let Some(locale) = parse_installed(raw.as_ref()) {
                by_language
                    .entry(locale.language())
                    .or_default()
                    .insert(locale);
            }
        }
        debug!(?by_language, "installed locales by language");

        let mut table: HashMap<LanguageCode, LocaleCode> = by_language
            .into_iter()
            .filter_map(|(language, locales)| {
                if locales.len() != 1 {
                    return None;
                }
                locales.into_iter().next().map(|locale| (language, locale))
            })
            .collect();

        if let Some(preferred) = env_override.and_then(parse_installed) {
            table.insert(preferred.language(), preferred);
        }

        Self(table)
    }

    pub fn get(&self, language: &LanguageCode) -> Option<&LocaleCode> {
        self.0.get(language)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn parse_installed(raw: &str) -> Option<LocaleCode> {
    normalize(raw.trim()).ok().or_else(|| extract_locale(raw))
}

static SYSTEM_TABLE: LazyLock<OnceCell<LocaleTable>> = LazyLock::new(OnceCell::new);

enum TableSlot {
    Shared(&'static OnceCell<LocaleTable>),
    Owned(OnceCell<LocaleTable>),
}

impl TableSlot {
    fn cell(&self) -> &OnceCell<LocaleTable> {
        match self {
            TableSlot::Shared(cell) => cell,
            TableSlot::Owned(cell) => cell,
        }
    }
}

/// Maps a language to the locale whose dictionary the session should load.
pub struct LocaleResolver {
    source: Arc<dyn LocaleSource>,
    env: Arc<dyn EnvProvider>,
    env_override_var: String,
    table: TableSlot,
}

impl LocaleResolver {
    /// Resolver with its own table, built from `source` on first lookup.
    pub fn new(
        source: Arc<dyn LocaleSource>,
        env: Arc<dyn EnvProvider>,
        config: &LocaleConfig,
    ) -> Self {
        Self {
            source,
            env,
            env_override_var: config.env_override_var.clone(),
            table: TableSlot::Owned(OnceCell::new()),
        }
    }

    /// Resolver over the process-wide table. The first resolver to look
    /// anything up builds it; every later one reads the same table.
    ///
    /// `available_dictionaries` is the native engine's list, used where the
    /// platform has no locale listing of its own.
    pub fn system(config: &LocaleConfig, available_dictionaries: Vec<String>) -> Self {
        let source: Arc<dyn LocaleSource> = if cfg!(target_os = "linux") {
            Arc::new(CommandLocaleSource::default())
        } else {
            Arc::new(DictionaryListLocaleSource::new(available_dictionaries))
        };
        Self {
            source,
            env: Arc::new(SystemEnv),
            env_override_var: config.env_override_var.clone(),
            table: TableSlot::Shared(&SYSTEM_TABLE),
        }
    }

    pub async fn locale_table(&self) -> &LocaleTable {
        self.table
            .cell()
            .get_or_init(|| self.build_locale_table())
            .await
    }

    pub async fn build_locale_table(&self) -> LocaleTable {
        let installed = match self.source.installed_locales().await {
            Ok(installed) => installed,
            Err(error) => {
                warn!("failed to enumerate installed locales: {error:#}");
                Vec::new()
            }
        };
        let env_override = self.env.var(&self.env_override_var);
        let table = LocaleTable::build(&installed, env_override.as_deref());
        debug!(entries = table.len(), "built likely locale table");
        table
    }

    /// Installed-locale table first, then the built-in fallback table.
    pub async fn likely_locale_for(&self, language: &LanguageCode) -> Result<LocaleCode> {
        if let Some(locale) = self.locale_table().await.get(language) {
            return Ok(locale.clone());
        }
        fallback_locale(language).ok_or_else(|| SpellError::UnknownLanguage(language.to_string()))
    }
}
