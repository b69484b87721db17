use std::collections::HashSet;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;

use pokedex_browser::aggregator::{CatalogFetcher, FetchSettings};
use pokedex_browser::api::{
    AbilitySlot, DetailResponse, FlavorTextEntry, LanguageRef, ListResponse, NamedResource,
    SpeciesResponse, Sprites, StatSlot, TypeSlot,
};
use pokedex_browser::app::{CancelToken, ProgressEvent, ProgressSink};
use pokedex_browser::domain::NO_DESCRIPTION;
use pokedex_browser::error::PokedexError;
use pokedex_browser::pokeapi::PokeApiClient;

#[derive(Default)]
struct MockPokeApi {
    names: Vec<String>,
    failing_details: HashSet<String>,
    failing_species: HashSet<String>,
    untranslated: HashSet<String>,
    slow_first: bool,
    cancel_on_detail: Option<CancelToken>,
    calls: Mutex<Vec<String>>,
}

impl MockPokeApi {
    fn with_names(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|name| name.to_string()).collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, url: &str) {
        self.calls.lock().unwrap().push(url.to_string());
    }
}

fn resource(name: &str, url: String) -> NamedResource {
    NamedResource {
        name: name.to_string(),
        url,
    }
}

impl PokeApiClient for MockPokeApi {
    fn fetch_list(&self, base_url: &str, limit: usize) -> Result<ListResponse, PokedexError> {
        self.record_call(&format!("{base_url}/pokemon?limit={limit}"));
        Ok(ListResponse {
            count: Some(self.names.len() as u64),
            results: self
                .names
                .iter()
                .take(limit)
                .map(|name| resource(name, format!("mock://pokemon/{name}")))
                .collect(),
        })
    }

    fn fetch_detail(&self, url: &str) -> Result<DetailResponse, PokedexError> {
        self.record_call(url);
        if let Some(cancel) = &self.cancel_on_detail {
            cancel.cancel();
        }
        let name = url.trim_start_matches("mock://pokemon/");
        if self.slow_first && self.names.first().map(String::as_str) == Some(name) {
            thread::sleep(Duration::from_millis(50));
        }
        if self.failing_details.contains(name) {
            return Err(PokedexError::Network {
                url: url.to_string(),
                message: "connection reset by peer".to_string(),
            });
        }
        Ok(DetailResponse {
            name: name.to_string(),
            sprites: Sprites {
                front_default: Some(format!("mock://sprites/{name}.png")),
            },
            types: vec![TypeSlot {
                kind: resource("normal", "mock://type/1".to_string()),
            }],
            abilities: vec![
                AbilitySlot {
                    ability: resource("run-away", "mock://ability/50".to_string()),
                },
                AbilitySlot {
                    ability: resource("guts", "mock://ability/62".to_string()),
                },
            ],
            stats: vec![
                StatSlot {
                    base_stat: 30,
                    stat: resource("hp", "mock://stat/1".to_string()),
                },
                StatSlot {
                    base_stat: 56,
                    stat: resource("attack", "mock://stat/2".to_string()),
                },
            ],
            species: resource(name, format!("mock://species/{name}")),
        })
    }

    fn fetch_species(&self, url: &str) -> Result<SpeciesResponse, PokedexError> {
        self.record_call(url);
        let name = url.trim_start_matches("mock://species/");
        if self.failing_species.contains(name) {
            return Err(PokedexError::Status {
                url: url.to_string(),
                status: 404,
                message: "Not Found".to_string(),
            });
        }
        let language = if self.untranslated.contains(name) {
            "ja"
        } else {
            "en"
        };
        Ok(SpeciesResponse {
            flavor_text_entries: vec![FlavorTextEntry {
                flavor_text: format!("All about\n{name}."),
                language: LanguageRef {
                    name: language.to_string(),
                },
            }],
        })
    }
}

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

fn settings(limit: usize, concurrency: usize) -> FetchSettings {
    FetchSettings {
        base_url: "mock://api".to_string(),
        limit,
        concurrency,
        ..FetchSettings::default()
    }
}

#[test]
fn fetch_preserves_list_order() {
    let mut client = MockPokeApi::with_names(&["rattata", "raticate", "spearow", "fearow", "ekans"]);
    client.slow_first = true;
    let fetcher = CatalogFetcher::new(client, settings(151, 4));

    let records = fetcher
        .fetch_catalog(&CancelToken::new(), &RecordingSink::default())
        .unwrap();

    let names = records
        .iter()
        .map(|record| record.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["rattata", "raticate", "spearow", "fearow", "ekans"]);
    assert_eq!(records[0].description, "All about rattata.");
    assert_eq!(records[0].types, vec!["normal"]);
    assert_eq!(records[0].abilities[1].name, "guts");
    assert_eq!(records[0].stats[1].base_stat, 56);
    assert_eq!(
        records[0].sprite.as_deref(),
        Some("mock://sprites/rattata.png")
    );
}

#[test]
fn list_request_carries_limit() {
    let client = MockPokeApi::with_names(&["bulbasaur", "ivysaur", "venusaur"]);
    let fetcher = CatalogFetcher::new(client, settings(2, 1));

    let records = fetcher
        .fetch_catalog(&CancelToken::new(), &RecordingSink::default())
        .unwrap();

    assert_eq!(records.len(), 2);
}

#[test]
fn species_follows_detail() {
    let client = MockPokeApi::with_names(&["oddish"]);
    let fetcher = CatalogFetcher::new(client, settings(151, 1));
    fetcher
        .fetch_catalog(&CancelToken::new(), &RecordingSink::default())
        .unwrap();

    let calls = fetcher.client().calls();
    assert_eq!(
        calls,
        vec![
            "mock://api/pokemon?limit=151".to_string(),
            "mock://pokemon/oddish".to_string(),
            "mock://species/oddish".to_string(),
        ]
    );
}

#[test]
fn failing_detail_aborts_load() {
    let mut client = MockPokeApi::with_names(&["pikachu", "raichu"]);
    client.failing_details.insert("raichu".to_string());
    let fetcher = CatalogFetcher::new(client, settings(151, 2));

    let err = fetcher
        .fetch_catalog(&CancelToken::new(), &RecordingSink::default())
        .unwrap_err();

    assert_matches!(err, PokedexError::Network { ref url, .. } if url == "mock://pokemon/raichu");
    assert!(err.is_network());
}

#[test]
fn failing_species_aborts_load() {
    let mut client = MockPokeApi::with_names(&["zubat", "golbat", "oddish"]);
    client.failing_species.insert("golbat".to_string());
    let fetcher = CatalogFetcher::new(client, settings(151, 1));

    let err = fetcher
        .fetch_catalog(&CancelToken::new(), &RecordingSink::default())
        .unwrap_err();

    assert_matches!(err, PokedexError::Status { status: 404, .. });
    let calls = fetcher.client().calls();
    assert!(!calls.contains(&"mock://pokemon/oddish".to_string()));
}

#[test]
fn lowest_failing_entry_wins() {
    let mut client = MockPokeApi::with_names(&["abra", "kadabra", "alakazam"]);
    client.failing_details.insert("kadabra".to_string());
    client.failing_details.insert("alakazam".to_string());
    let fetcher = CatalogFetcher::new(client, settings(151, 3));

    let err = fetcher
        .fetch_catalog(&CancelToken::new(), &RecordingSink::default())
        .unwrap_err();

    assert_matches!(err, PokedexError::Network { ref url, .. } if url == "mock://pokemon/kadabra");
}

#[test]
fn untranslated_species_uses_placeholder() {
    let mut client = MockPokeApi::with_names(&["mew", "mewtwo"]);
    client.untranslated.insert("mew".to_string());
    let fetcher = CatalogFetcher::new(client, settings(151, 2));

    let records = fetcher
        .fetch_catalog(&CancelToken::new(), &RecordingSink::default())
        .unwrap();

    assert_eq!(records[0].description, NO_DESCRIPTION);
    assert_eq!(records[1].description, "All about mewtwo.");
}

#[test]
fn cancelled_token_stops_before_requests() {
    let client = MockPokeApi::with_names(&["ditto"]);
    let fetcher = CatalogFetcher::new(client, settings(151, 1));
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = fetcher
        .fetch_catalog(&cancel, &RecordingSink::default())
        .unwrap_err();

    assert_matches!(err, PokedexError::Cancelled);
    assert!(fetcher.client().calls().is_empty());
}

#[test]
fn cancel_during_fetch_stops_remaining_entries() {
    let cancel = CancelToken::new();
    let mut client = MockPokeApi::with_names(&["geodude", "graveler", "golem", "onix", "rhyhorn"]);
    client.cancel_on_detail = Some(cancel.clone());
    let fetcher = CatalogFetcher::new(client, settings(151, 1));

    let err = fetcher
        .fetch_catalog(&cancel, &RecordingSink::default())
        .unwrap_err();

    assert_matches!(err, PokedexError::Cancelled);
    let calls = fetcher.client().calls();
    let details = calls
        .iter()
        .filter(|url| url.starts_with("mock://pokemon/"))
        .count();
    assert!(details < 5, "fetched {details} details after cancelling");
    assert!(!calls.iter().any(|url| url.starts_with("mock://species/")));
}

#[test]
fn empty_list_yields_empty_catalog() {
    let client = MockPokeApi::with_names(&[]);
    let fetcher = CatalogFetcher::new(client, settings(151, 8));

    let records = fetcher
        .fetch_catalog(&CancelToken::new(), &RecordingSink::default())
        .unwrap();

    assert!(records.is_empty());
}

#[test]
fn progress_reports_each_entry() {
    let client = MockPokeApi::with_names(&["horsea", "seadra"]);
    let fetcher = CatalogFetcher::new(client, settings(151, 1));
    let sink = RecordingSink::default();

    fetcher.fetch_catalog(&CancelToken::new(), &sink).unwrap();

    let messages = sink.messages.lock().unwrap().clone();
    assert_eq!(
        messages,
        vec![
            "phase=List; requesting 151 entries".to_string(),
            "phase=Fetch; 1/2 horsea".to_string(),
            "phase=Fetch; 2/2 seadra".to_string(),
            "phase=Done; 2 pokemon".to_string(),
        ]
    );
}
