//! Response schemas for the three PokeAPI documents the catalog is built from,
//! and the shaping of a detail + species pair into a [`PokemonRecord`].

use serde::Deserialize;

use crate::domain::{Ability, Locale, NO_DESCRIPTION, PokemonRecord, Stat};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub count: Option<u64>,
    pub results: Vec<NamedResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailResponse {
    pub name: String,
    pub sprites: Sprites,
    pub types: Vec<TypeSlot>,
    pub abilities: Vec<AbilitySlot>,
    pub stats: Vec<StatSlot>,
    pub species: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sprites {
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatSlot {
    pub base_stat: u32,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesResponse {
    pub flavor_text_entries: Vec<FlavorTextEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlavorTextEntry {
    pub flavor_text: String,
    pub language: LanguageRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageRef {
    pub name: String,
}

pub fn shape_record(
    detail: DetailResponse,
    species: &SpeciesResponse,
    locale: &Locale,
) -> PokemonRecord {
    PokemonRecord {
        description: select_description(species, locale),
        name: detail.name,
        sprite: detail.sprites.front_default,
        types: detail.types.into_iter().map(|slot| slot.kind.name).collect(),
        abilities: detail
            .abilities
            .into_iter()
            .map(|slot| Ability {
                name: slot.ability.name,
                url: slot.ability.url,
            })
            .collect(),
        stats: detail
            .stats
            .into_iter()
            .map(|slot| Stat {
                name: slot.stat.name,
                base_stat: slot.base_stat,
            })
            .collect(),
    }
}

/// First flavor text in `locale`, or the placeholder when the species has none.
pub fn select_description(species: &SpeciesResponse, locale: &Locale) -> String {
    species
        .flavor_text_entries
        .iter()
        .find(|entry| locale.matches(&entry.language.name))
        .map(|entry| normalize_flavor_text(&entry.flavor_text))
        .unwrap_or_else(|| NO_DESCRIPTION.to_string())
}

// Flavor texts carry the game's line breaks and form feeds.
fn normalize_flavor_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species(entries: &[(&str, &str)]) -> SpeciesResponse {
        SpeciesResponse {
            flavor_text_entries: entries
                .iter()
                .map(|(text, lang)| FlavorTextEntry {
                    flavor_text: text.to_string(),
                    language: LanguageRef {
                        name: lang.to_string(),
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn picks_first_entry_in_locale() {
        let species = species(&[
            ("Cuando se enfada", "es"),
            ("When several of\nthese POKéMON\u{c}gather", "en"),
            ("A later entry", "en"),
        ]);
        let english = select_description(&species, &Locale::default());
        assert_eq!(english, "When several of these POKéMON gather");

        let spanish = select_description(&species, &"es".parse().unwrap());
        assert_eq!(spanish, "Cuando se enfada");
    }

    #[test]
    fn falls_back_to_placeholder() {
        let species = species(&[("Quand il est en colère", "fr")]);
        assert_eq!(
            select_description(&species, &Locale::default()),
            NO_DESCRIPTION
        );
    }
}
