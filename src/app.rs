use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregator::CatalogFetcher;
use crate::domain::PokemonRecord;
use crate::error::PokedexError;
use crate::pokeapi::PokeApiClient;
use crate::store::{CatalogStore, PageView};

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub fetched_at: Option<String>,
    #[serde(flatten)]
    pub page: PageView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowResult {
    pub fetched_at: Option<String>,
    pub pokemon: PokemonRecord,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink: Sync {
    fn event(&self, event: ProgressEvent);
}

/// Shared flag checked by the fetcher before every request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), PokedexError> {
        if self.is_cancelled() {
            return Err(PokedexError::Cancelled);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    cancel: CancelToken,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied(usize),
    Discarded,
}

/// Owns the catalog store and the fetcher that fills it.
///
/// Loads are identified by [`LoadTicket`]s; only the result of the most
/// recent, uncancelled ticket is applied to the store.
pub struct Session<C: PokeApiClient> {
    fetcher: CatalogFetcher<C>,
    store: CatalogStore,
    generation: u64,
    active: Option<LoadTicket>,
    loaded_at: Option<DateTime<Utc>>,
}

impl<C: PokeApiClient> Session<C> {
    pub fn new(fetcher: CatalogFetcher<C>, store: CatalogStore) -> Self {
        Self {
            fetcher,
            store,
            generation: 0,
            active: None,
            loaded_at: None,
        }
    }

    pub fn fetcher(&self) -> &CatalogFetcher<C> {
        &self.fetcher
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CatalogStore {
        &mut self.store
    }

    pub fn is_loading(&self) -> bool {
        self.active.is_some()
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        if let Some(previous) = self.active.take() {
            debug!(generation = previous.generation, "load.superseded");
            previous.cancel.cancel();
        }
        self.generation += 1;
        let ticket = LoadTicket {
            generation: self.generation,
            cancel: CancelToken::new(),
        };
        self.active = Some(ticket.clone());
        ticket
    }

    /// Cancels the in-flight load, if any. Its eventual result will be discarded.
    pub fn cancel_load(&mut self) -> bool {
        match self.active.take() {
            Some(ticket) => {
                debug!(generation = ticket.generation, "load.cancelled");
                ticket.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<Vec<PokemonRecord>, PokedexError>,
    ) -> Result<LoadOutcome, PokedexError> {
        let is_current = self
            .active
            .as_ref()
            .is_some_and(|active| active.generation == ticket.generation);
        if !is_current || ticket.cancel.is_cancelled() {
            debug!(generation = ticket.generation, "load.discarded");
            return Ok(LoadOutcome::Discarded);
        }
        self.active = None;

        match result {
            Ok(records) => {
                let count = records.len();
                self.store.load(records);
                self.loaded_at = Some(Utc::now());
                info!(count, generation = ticket.generation, "catalog.applied");
                Ok(LoadOutcome::Applied(count))
            }
            Err(err) => {
                warn!(error = %err, generation = ticket.generation, "catalog.load_failed");
                Err(err)
            }
        }
    }

    /// Fetches the catalog on the calling thread and applies it.
    pub fn load(&mut self, sink: &dyn ProgressSink) -> Result<LoadOutcome, PokedexError> {
        let ticket = self.begin_load();
        let result = self.fetcher.fetch_catalog(ticket.cancel_token(), sink);
        self.finish_load(&ticket, result)
    }

    pub fn list(&self) -> ListResult {
        ListResult {
            fetched_at: self.fetched_at(),
            page: self.store.page_summary(),
        }
    }

    pub fn show(&self, name: &str) -> Result<ShowResult, PokedexError> {
        let pokemon = self.store.get(name)?.clone();
        Ok(ShowResult {
            fetched_at: self.fetched_at(),
            pokemon,
        })
    }

    fn fetched_at(&self) -> Option<String> {
        self.loaded_at.map(|at| at.to_rfc3339())
    }
}
