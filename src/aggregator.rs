use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::api::{NamedResource, shape_record};
use crate::app::{CancelToken, ProgressEvent, ProgressSink};
use crate::domain::{Locale, PokemonRecord};
use crate::error::PokedexError;
use crate::pokeapi::{DEFAULT_BASE_URL, PokeApiClient};

pub const DEFAULT_LIMIT: usize = 151;
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub base_url: String,
    pub limit: usize,
    pub locale: Locale,
    pub concurrency: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            limit: DEFAULT_LIMIT,
            locale: Locale::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Builds the catalog: one list request, then detail and species per entry.
#[derive(Clone)]
pub struct CatalogFetcher<C: PokeApiClient> {
    client: C,
    settings: FetchSettings,
}

impl<C: PokeApiClient> CatalogFetcher<C> {
    pub fn new(client: C, settings: FetchSettings) -> Self {
        Self { client, settings }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn fetch_catalog(
        &self,
        cancel: &CancelToken,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<PokemonRecord>, PokedexError> {
        let started = Instant::now();
        cancel.check()?;
        sink.event(ProgressEvent {
            message: format!("phase=List; requesting {} entries", self.settings.limit),
            elapsed: None,
        });
        let list = self
            .client
            .fetch_list(&self.settings.base_url, self.settings.limit)?;
        debug!(entries = list.results.len(), count = ?list.count, "catalog.listed");

        let records = self.fetch_entries(&list.results, cancel, sink, started)?;

        info!(
            count = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "catalog.fetched"
        );
        sink.event(ProgressEvent {
            message: format!("phase=Done; {} pokemon", records.len()),
            elapsed: Some(started.elapsed()),
        });
        Ok(records)
    }

    // An entry is skipped only when an entry earlier in the list has already
    // failed, so the lowest failing index is always fetched and reported.
    fn fetch_entries(
        &self,
        entries: &[NamedResource],
        cancel: &CancelToken,
        sink: &dyn ProgressSink,
        started: Instant,
    ) -> Result<Vec<PokemonRecord>, PokedexError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let total = entries.len();
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.settings.concurrency.clamp(1, total))
            .thread_name(|i| format!("pokeapi-{i}"))
            .build()
            .map_err(|err| PokedexError::Client(err.to_string()))?;
        let completed = AtomicUsize::new(0);
        let first_failure = AtomicUsize::new(usize::MAX);

        let outcomes: Vec<Option<Result<PokemonRecord, PokedexError>>> = pool.install(|| {
            entries
                .par_iter()
                .enumerate()
                .map(|(index, entry)| {
                    if first_failure.load(Ordering::SeqCst) < index {
                        return None;
                    }
                    let result = self.fetch_entry(entry, cancel);
                    match &result {
                        Ok(record) => {
                            let finished = completed.fetch_add(1, Ordering::SeqCst) + 1;
                            sink.event(ProgressEvent {
                                message: format!(
                                    "phase=Fetch; {finished}/{total} {}",
                                    record.name
                                ),
                                elapsed: Some(started.elapsed()),
                            });
                        }
                        Err(_) => {
                            first_failure.fetch_min(index, Ordering::SeqCst);
                        }
                    }
                    Some(result)
                })
                .collect()
        });

        let mut records = Vec::with_capacity(total);
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(Ok(record)) => records.push(record),
                Some(Err(err)) => {
                    warn!(entry = %entries[index].name, error = %err, "catalog.aborted");
                    return Err(err);
                }
                None => {}
            }
        }
        Ok(records)
    }

    fn fetch_entry(
        &self,
        entry: &NamedResource,
        cancel: &CancelToken,
    ) -> Result<PokemonRecord, PokedexError> {
        cancel.check()?;
        let detail = self.client.fetch_detail(&entry.url)?;
        cancel.check()?;
        let species = self.client.fetch_species(&detail.species.url)?;
        Ok(shape_record(detail, &species, &self.settings.locale))
    }
}
