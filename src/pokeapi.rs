use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{DetailResponse, ListResponse, SpeciesResponse};
use crate::error::PokedexError;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

pub trait PokeApiClient: Send + Sync {
    fn fetch_list(&self, base_url: &str, limit: usize) -> Result<ListResponse, PokedexError>;
    fn fetch_detail(&self, url: &str) -> Result<DetailResponse, PokedexError>;
    fn fetch_species(&self, url: &str) -> Result<SpeciesResponse, PokedexError>;
}

#[derive(Clone)]
pub struct PokeApiHttpClient {
    client: Client,
}

impl PokeApiHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, PokedexError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("pokedex/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PokedexError::Client(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| PokedexError::Client(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn list_url(base_url: &str, limit: usize) -> String {
        format!("{}/pokemon?limit={limit}", base_url.trim_end_matches('/'))
    }

    fn handle_status(
        url: &str,
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, PokedexError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .ok()
            .filter(|body| !body.trim().is_empty())
            .unwrap_or_else(|| "PokeAPI request failed".to_string());
        Err(PokedexError::Status {
            url: url.to_string(),
            status,
            message,
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, PokedexError> {
        debug!(url, "pokeapi.request");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| network_error(url, err))?;
        let response = Self::handle_status(url, response)?;
        let body = response.text().map_err(|err| network_error(url, err))?;
        parse_body(url, &body)
    }
}

impl PokeApiClient for PokeApiHttpClient {
    fn fetch_list(&self, base_url: &str, limit: usize) -> Result<ListResponse, PokedexError> {
        self.get_json(&Self::list_url(base_url, limit))
    }

    fn fetch_detail(&self, url: &str) -> Result<DetailResponse, PokedexError> {
        self.get_json(url)
    }

    fn fetch_species(&self, url: &str) -> Result<SpeciesResponse, PokedexError> {
        self.get_json(url)
    }
}

/// Decodes a response body, reporting shape mismatches as [`PokedexError::Parse`].
pub fn parse_body<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, PokedexError> {
    serde_json::from_str(body).map_err(|err| PokedexError::Parse {
        url: url.to_string(),
        message: err.to_string(),
    })
}

fn network_error(url: &str, err: reqwest::Error) -> PokedexError {
    PokedexError::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}
