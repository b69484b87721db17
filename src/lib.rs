pub mod aggregator;
pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod output;
pub mod pokeapi;
pub mod store;
pub mod tui;
