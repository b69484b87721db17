//! Pagination and filter state over the fetched catalog.
//!
//! The filtered view is kept as indices into `records` and is recomputed on
//! every change to the records, the search text or the page size. Each of
//! those changes also resets the current page to 1.

use serde::Serialize;

use crate::domain::PokemonRecord;
use crate::error::PokedexError;

pub const DEFAULT_ITEMS_PER_PAGE: usize = 15;

#[derive(Debug, Clone)]
pub struct CatalogStore {
    records: Vec<PokemonRecord>,
    filtered: Vec<usize>,
    search_text: String,
    current_page: usize,
    items_per_page: usize,
    selected: Option<usize>,
    show_detail: bool,
}

/// Serializable snapshot of the visible page.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub page: usize,
    pub total_pages: usize,
    pub items_per_page: usize,
    pub total_matches: usize,
    pub search_text: String,
    pub items: Vec<PokemonRecord>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            filtered: Vec::new(),
            search_text: String::new(),
            current_page: 1,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            selected: None,
            show_detail: false,
        }
    }
}

impl CatalogStore {
    pub fn new(items_per_page: usize) -> Result<Self, PokedexError> {
        let mut store = Self::default();
        store.set_items_per_page(items_per_page)?;
        Ok(store)
    }

    pub fn load(&mut self, records: Vec<PokemonRecord>) {
        self.records = records;
        self.selected = None;
        self.show_detail = false;
        self.refresh();
    }

    pub fn set_search_text(&mut self, text: &str) {
        self.search_text = text.to_string();
        self.refresh();
    }

    pub fn set_items_per_page(&mut self, items_per_page: usize) -> Result<(), PokedexError> {
        if items_per_page == 0 {
            return Err(PokedexError::InvalidPageSize(items_per_page));
        }
        self.items_per_page = items_per_page;
        self.refresh();
        Ok(())
    }

    /// Moves to `page` if it is within `1..=total_pages()`. Returns whether the page changed.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page == 0 || page > self.total_pages() {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    /// Marks the record named `name` as selected and shows its detail. A miss is a no-op.
    pub fn select(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.selected = Some(index);
                self.show_detail = true;
                true
            }
            None => false,
        }
    }

    pub fn close_detail(&mut self) {
        self.show_detail = false;
    }

    pub fn get(&self, name: &str) -> Result<&PokemonRecord, PokedexError> {
        self.position(name)
            .map(|index| &self.records[index])
            .ok_or_else(|| PokedexError::PokemonNotFound(name.to_string()))
    }

    pub fn records(&self) -> &[PokemonRecord] {
        &self.records
    }

    pub fn filtered(&self) -> impl Iterator<Item = &PokemonRecord> {
        self.filtered.iter().map(|&index| &self.records[index])
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn total_pages(&self) -> usize {
        self.filtered.len().div_ceil(self.items_per_page)
    }

    pub fn current_page_items(&self) -> Vec<&PokemonRecord> {
        let start = (self.current_page - 1) * self.items_per_page;
        let end = (start + self.items_per_page).min(self.filtered.len());
        if start >= end {
            return Vec::new();
        }
        self.filtered[start..end]
            .iter()
            .map(|&index| &self.records[index])
            .collect()
    }

    pub fn page_summary(&self) -> PageView {
        PageView {
            page: self.current_page,
            total_pages: self.total_pages(),
            items_per_page: self.items_per_page,
            total_matches: self.filtered.len(),
            search_text: self.search_text.clone(),
            items: self.current_page_items().into_iter().cloned().collect(),
        }
    }

    pub fn selected(&self) -> Option<&PokemonRecord> {
        self.selected.map(|index| &self.records[index])
    }

    pub fn is_detail_visible(&self) -> bool {
        self.show_detail && self.selected.is_some()
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|record| record.name == name)
    }

    fn refresh(&mut self) {
        let needle = self.search_text.to_lowercase();
        self.filtered = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.name_matches(&needle))
            .map(|(index, _)| index)
            .collect();
        self.current_page = 1;
    }
}
