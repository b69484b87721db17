use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PokedexError;

pub const NO_DESCRIPTION: &str = "no description available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonRecord {
    pub name: String,
    pub sprite: Option<String>,
    pub description: String,
    pub types: Vec<String>,
    pub abilities: Vec<Ability>,
    pub stats: Vec<Stat>,
}

impl PokemonRecord {
    /// Case-insensitive substring match on the name. `needle` must already be lowercase.
    pub fn name_matches(&self, needle: &str) -> bool {
        needle.is_empty() || self.name.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    pub base_stat: u32,
}

/// Language tag used to pick a species description, e.g. `en`, `es` or `zh-Hans`.
/// The tag keeps the case it was written with; matching ignores ASCII case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale(String);

impl Locale {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, tag: &str) -> bool {
        self.0.eq_ignore_ascii_case(tag)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self("en".to_string())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Locale {
    type Err = PokedexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let tag = value.trim();
        let is_valid = !tag.is_empty()
            && tag
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
        if !is_valid {
            return Err(PokedexError::InvalidConfig(format!(
                "invalid locale: {value}"
            )));
        }
        Ok(Self(tag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> PokemonRecord {
        PokemonRecord {
            name: name.to_string(),
            sprite: None,
            description: NO_DESCRIPTION.to_string(),
            types: Vec::new(),
            abilities: Vec::new(),
            stats: Vec::new(),
        }
    }

    #[test]
    fn name_matching() {
        let pikachu = record("Pikachu");
        assert!(pikachu.name_matches("chu"));
        assert!(pikachu.name_matches(""));
        assert!(!pikachu.name_matches("bulba"));
    }

    #[test]
    fn parse_locale() {
        let locale: Locale = " zh-Hans ".parse().unwrap();
        assert_eq!(locale.as_str(), "zh-Hans");
        assert!(locale.matches("zh-Hans"));
        assert!(locale.matches("ZH-HANS"));
        assert!(!locale.matches("zh-Hant"));
        assert!("".parse::<Locale>().is_err());
        assert!("e s".parse::<Locale>().is_err());
        assert_eq!(Locale::default().as_str(), "en");
    }
}
