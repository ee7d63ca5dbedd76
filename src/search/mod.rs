//! Free-text / tag search with pagination.
//!
//! Query syntax: whitespace separated terms. `#term` requires some tag to
//! contain `term`; every other term is joined back with single spaces and
//! must appear as one contiguous, case-insensitive title substring.

pub mod local;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{Pagination, RecipeView};
use crate::recipes::RecipeRepository;
use crate::store::{RecipeFilter, Store};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub tag_terms: Vec<String>,
    pub title_phrase: Option<String>,
}

impl SearchQuery {
    pub fn parse(raw: &str) -> Self {
        let mut tag_terms = Vec::new();
        let mut title_terms = Vec::new();

        for term in raw.split_whitespace() {
            match term.strip_prefix('#') {
                Some(tag) if !tag.is_empty() => tag_terms.push(tag.to_string()),
                Some(_) => {}
                None => title_terms.push(term),
            }
        }

        Self {
            tag_terms,
            title_phrase: if title_terms.is_empty() {
                None
            } else {
                Some(title_terms.join(" "))
            },
        }
    }

    /// Add tags given separately from the query string (comma-separated).
    pub fn with_tags(mut self, tags: &str) -> Self {
        for tag in tags.split(',') {
            let tag = tag.trim().trim_start_matches('#');
            if !tag.is_empty() {
                self.tag_terms.push(tag.to_string());
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tag_terms.is_empty() && self.title_phrase.is_none()
    }

    pub fn to_filter(&self) -> RecipeFilter {
        RecipeFilter {
            tag_terms: self.tag_terms.clone(),
            title_phrase: self.title_phrase.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Lenient parse of raw query-string values; garbage falls back to defaults.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |v: Option<&str>| v.and_then(|s| s.trim().parse::<i64>().ok());
        Self::new(parse(page), parse(limit))
    }

    /// Rows before this page. Saturates, so an absurd page number reads as
    /// past the end instead of wrapping.
    pub fn skip(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination {
            total,
            page: self.page,
            pages: total_pages(total, self.limit),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Query-string parameters of `GET /recipes/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub tags: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl SearchParams {
    pub fn split(&self) -> (SearchQuery, PageRequest) {
        let mut query = SearchQuery::parse(self.query.as_deref().unwrap_or(""));
        if let Some(tags) = &self.tags {
            query = query.with_tags(tags);
        }
        let page = PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref());
        (query, page)
    }
}

pub struct SearchEngine {
    store: Arc<Store>,
    recipes: RecipeRepository,
}

impl SearchEngine {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            recipes: RecipeRepository::new(store.clone()),
            store,
        }
    }

    pub fn search(
        &self,
        query: &SearchQuery,
        page: PageRequest,
        viewer: Option<&str>,
    ) -> AppResult<SearchPage<RecipeView>> {
        log::debug!(
            "Search tags={:?} title={:?} page={} limit={}",
            query.tag_terms,
            query.title_phrase,
            page.page,
            page.limit
        );

        let filter = query.to_filter();
        let total = self.store.count_recipes(&filter)?;
        let recipes = self.store.list_recipes(&filter, page.skip(), Some(page.limit))?;

        Ok(SearchPage {
            data: self.recipes.present(recipes, viewer)?,
            pagination: page.pagination(total),
        })
    }
}
