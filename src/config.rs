use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregator::{DEFAULT_CONCURRENCY, DEFAULT_LIMIT, FetchSettings};
use crate::domain::Locale;
use crate::error::PokedexError;
use crate::pokeapi::DEFAULT_BASE_URL;
use crate::store::DEFAULT_ITEMS_PER_PAGE;

pub const CONFIG_FILE: &str = "pokedex.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub items_per_page: Option<usize>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub base_url: String,
    pub limit: usize,
    pub locale: Locale,
    pub items_per_page: usize,
    pub concurrency: usize,
    pub timeout: Duration,
}

impl ResolvedConfig {
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            base_url: self.base_url.clone(),
            limit: self.limit,
            locale: self.locale.clone(),
            concurrency: self.concurrency,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, PokedexError> {
        Self::resolve_config(Self::read(path)?)
    }

    /// Reads the config file. Without an explicit path a missing `pokedex.json` means defaults.
    pub fn read(path: Option<&str>) -> Result<Config, PokedexError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| PokedexError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| PokedexError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, PokedexError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(PokedexError::InvalidConfig(
                "base_url must not be empty".to_string(),
            ));
        }

        let locale = match config.locale {
            Some(value) => value.parse()?,
            None => Locale::default(),
        };

        Ok(ResolvedConfig {
            schema_version,
            base_url,
            limit: positive("limit", config.limit.unwrap_or(DEFAULT_LIMIT))?,
            locale,
            items_per_page: positive(
                "items_per_page",
                config.items_per_page.unwrap_or(DEFAULT_ITEMS_PER_PAGE),
            )?,
            concurrency: positive(
                "concurrency",
                config.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            )?,
            timeout: Duration::from_secs(positive(
                "timeout_secs",
                config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            )?),
        })
    }
}

fn positive<T: Copy + PartialEq + From<u8>>(field: &str, value: T) -> Result<T, PokedexError> {
    if value == T::from(0) {
        return Err(PokedexError::InvalidConfig(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(value)
}
