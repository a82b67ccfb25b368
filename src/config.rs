//! Configuration loading.
//!
//! Settings come from a TOML file, with a handful of environment variable
//! overrides on top. Every section and field has a default so a missing or
//! partial file still produces a usable configuration.

use crate::dictionary::RewriteRule;
use crate::error::{Result, TieralignError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub aligner: AlignerConfig,
    pub dictionary: DictionaryConfig,
    /// Locale id (e.g. "sv-SE") to model and dictionary bundle.
    pub locales: BTreeMap<String, LocaleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlignerConfig {
    /// Path to the external aligner executable.
    pub tool: Option<PathBuf>,
    /// Worker threads aligning chunks concurrently.
    pub workers: usize,
    /// Per-chunk timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            tool: None,
            workers: 4,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Pronunciation dictionary used when no locale supplies one.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocaleConfig {
    pub model_path: Option<PathBuf>,
    pub dictionary_path: Option<PathBuf>,
    /// Orthography rewrites applied to transcript tokens before lookup.
    pub rewrites: Vec<RewriteRule>,
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from `path` if given, else from the default location if it
    /// exists, else the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::load(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Default config file location, `~/.config/tieralign/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tieralign").join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.aligner.workers == 0 {
            return Err(TieralignError::ConfigInvalidValue {
                key: "aligner.workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.aligner.timeout_secs == 0 {
            return Err(TieralignError::ConfigInvalidValue {
                key: "aligner.timeout_secs".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Applies environment variable overrides on top of the file values.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(path) = std::env::var("TIERALIGN_DICT") {
            self.dictionary.path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("TIERALIGN_ALIGNER") {
            self.aligner.tool = Some(PathBuf::from(path));
        }
        if let Ok(workers) = std::env::var("TIERALIGN_WORKERS") {
            self.aligner.workers =
                workers
                    .parse()
                    .map_err(|_| TieralignError::ConfigInvalidValue {
                        key: "TIERALIGN_WORKERS".to_string(),
                        message: format!("not a number: {workers:?}"),
                    })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Resolves a locale id to its configuration, falling back from the most
    /// specific form: `sv-SE-stockholm`, then `sv-SE`, then `sv`.
    pub fn locale(&self, id: &str) -> Result<&LocaleConfig> {
        let mut candidate = id;
        loop {
            if let Some(locale) = self.locales.get(candidate) {
                return Ok(locale);
            }
            match candidate.rfind('-') {
                Some(pos) => candidate = &candidate[..pos],
                None => {
                    return Err(TieralignError::UnknownLocale {
                        locale: id.to_string(),
                    });
                }
            }
        }
    }
}
