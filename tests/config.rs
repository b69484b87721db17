use std::time::Duration;

use assert_matches::assert_matches;

use pokedex_browser::config::{Config, ConfigLoader};
use pokedex_browser::error::PokedexError;

#[test]
fn resolve_overrides() {
    let config = Config {
        base_url: Some("http://localhost:8000/api/v2/".to_string()),
        limit: Some(20),
        locale: Some(" zh-Hant ".to_string()),
        items_per_page: Some(10),
        concurrency: Some(2),
        timeout_secs: Some(5),
        ..Config::default()
    };

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.base_url, "http://localhost:8000/api/v2");
    assert_eq!(resolved.limit, 20);
    assert_eq!(resolved.locale.as_str(), "zh-Hant");
    assert_eq!(resolved.items_per_page, 10);
    assert_eq!(resolved.timeout, Duration::from_secs(5));

    let settings = resolved.fetch_settings();
    assert_eq!(settings.concurrency, 2);
    assert_eq!(settings.limit, 20);
}

#[test]
fn reject_zero_values() {
    for config in [
        Config {
            limit: Some(0),
            ..Config::default()
        },
        Config {
            items_per_page: Some(0),
            ..Config::default()
        },
        Config {
            concurrency: Some(0),
            ..Config::default()
        },
        Config {
            timeout_secs: Some(0),
            ..Config::default()
        },
        Config {
            base_url: Some(" / ".to_string()),
            ..Config::default()
        },
    ] {
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, PokedexError::InvalidConfig(_));
    }
}

#[test]
fn read_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("pokedex.json");
    std::fs::write(&path, r#"{ "limit": 3, "locale": "fr" }"#).unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.limit, 3);
    assert_eq!(resolved.locale.as_str(), "fr");
    assert_eq!(resolved.items_per_page, 15);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, PokedexError::ConfigRead(_));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("pokedex.json");
    std::fs::write(&path, r#"{ "limit": "many" }"#).unwrap();

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, PokedexError::ConfigParse(_));
}
