//! Client-side filtering and ordering of an already fetched page.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::SearchPage;
use crate::error::{AppError, AppResult};
use crate::models::{Pagination, Recipe};

pub const FILTER_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortAxis {
    Likes,
    Views,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// At most one active axis. Each axis remembers its own direction while
/// inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    active: Option<SortAxis>,
    likes: SortDirection,
    views: SortDirection,
}

impl SortState {
    pub fn active(&self) -> Option<SortAxis> {
        self.active
    }

    pub fn direction(&self, axis: SortAxis) -> SortDirection {
        match axis {
            SortAxis::Likes => self.likes,
            SortAxis::Views => self.views,
        }
    }

    /// Make `axis` active with its stored direction.
    pub fn select(&mut self, axis: SortAxis) {
        self.active = Some(axis);
    }

    pub fn set_direction(&mut self, axis: SortAxis, direction: SortDirection) {
        match axis {
            SortAxis::Likes => self.likes = direction,
            SortAxis::Views => self.views = direction,
        }
        self.active = Some(axis);
    }

    pub fn toggle(&mut self, axis: SortAxis) {
        let flipped = self.direction(axis).flipped();
        self.set_direction(axis, flipped);
    }

    pub fn clear(&mut self) {
        self.active = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalCriteria {
    pub search_text: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub sort: SortState,
}

impl LocalCriteria {
    /// Whole-day bounds: `from` starts at midnight, `to` ends at the last
    /// instant of its day.
    pub fn set_dates(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) {
        self.from = from.map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)));
        self.to = to.and_then(|d| {
            d.succ_opt()
                .map(|next| Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN)) - chrono::Duration::nanoseconds(1))
        });
    }
}

/// Filter by title text and the inclusive `[from, to]` window, then stable-sort
/// by the active axis. Missing bounds default to the epoch and `now`.
pub fn apply(recipes: &[Recipe], criteria: &LocalCriteria, now: DateTime<Utc>) -> Vec<Recipe> {
    let needle = criteria.search_text.trim().to_lowercase();
    let from = criteria.from.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let to = criteria.to.unwrap_or(now);

    let mut visible: Vec<Recipe> = recipes
        .iter()
        .filter(|r| needle.is_empty() || r.title.to_lowercase().contains(&needle))
        .filter(|r| r.created_at >= from && r.created_at <= to)
        .cloned()
        .collect();

    if let Some(axis) = criteria.sort.active() {
        let direction = criteria.sort.direction(axis);
        let key = |r: &Recipe| -> i64 {
            match axis {
                SortAxis::Likes => r.likes.len() as i64,
                SortAxis::Views => r.views,
            }
        };
        visible.sort_by(|a, b| {
            let ord: Ordering = key(a).cmp(&key(b));
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
    }

    visible
}

/// Decode a search response body. Missing `data` or `pagination` is an error,
/// never an empty page.
pub fn decode_page(body: &Value) -> AppResult<SearchPage<Recipe>> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::InvalidResponseFormat("expected `data` array".to_string()))?;
    let pagination = body
        .get("pagination")
        .filter(|p| p.is_object())
        .ok_or_else(|| AppError::InvalidResponseFormat("expected `pagination` object".to_string()))?;

    let data = data
        .iter()
        .map(|item| serde_json::from_value::<Recipe>(item.clone()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::InvalidResponseFormat(e.to_string()))?;
    let pagination: Pagination = serde_json::from_value(pagination.clone())
        .map_err(|e| AppError::InvalidResponseFormat(e.to_string()))?;

    Ok(SearchPage { data, pagination })
}

/// Runs only the most recent call once `delay` has passed without another.
///
/// Timers run on the runtime given to [`Debouncer::with_handle`]. A debouncer
/// built with [`Debouncer::new`] uses the ambient runtime, so `call` panics
/// when made outside of one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
    handle: Option<Handle>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    pub fn with_handle(delay: Duration, handle: Handle) -> Self {
        Self {
            handle: Some(handle),
            ..Self::new(delay)
        }
    }

    pub fn call<F>(&self, f: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let ticket = self.generation.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        let generation = self.generation.clone();
        let delay = self.delay;

        let task = async move {
            tokio::time::sleep(delay).await;
            if generation.load(AtomicOrdering::SeqCst) == ticket {
                f();
            }
        };
        match &self.handle {
            Some(handle) => handle.spawn(task),
            None => tokio::spawn(task),
        }
    }
}

/// Filter controls. Every change is published to subscribers after the
/// debounce window settles.
pub struct FilterPanel {
    criteria: LocalCriteria,
    tx: Arc<watch::Sender<LocalCriteria>>,
    debouncer: Debouncer,
}

impl FilterPanel {
    pub fn new() -> Self {
        Self::with_delay(FILTER_DEBOUNCE)
    }

    /// Setters must be called from inside a Tokio runtime. Use
    /// [`FilterPanel::with_handle`] to drive the panel from plain threads.
    pub fn with_delay(delay: Duration) -> Self {
        Self::with_debouncer(Debouncer::new(delay))
    }

    pub fn with_handle(delay: Duration, handle: Handle) -> Self {
        Self::with_debouncer(Debouncer::with_handle(delay, handle))
    }

    fn with_debouncer(debouncer: Debouncer) -> Self {
        let (tx, _) = watch::channel(LocalCriteria::default());
        Self {
            criteria: LocalCriteria::default(),
            tx: Arc::new(tx),
            debouncer,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LocalCriteria> {
        self.tx.subscribe()
    }

    pub fn criteria(&self) -> &LocalCriteria {
        &self.criteria
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) -> JoinHandle<()> {
        self.criteria.search_text = text.into();
        self.publish()
    }

    pub fn set_date_range(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> JoinHandle<()> {
        self.criteria.set_dates(from, to);
        self.publish()
    }

    pub fn select_sort(&mut self, axis: SortAxis) -> JoinHandle<()> {
        self.criteria.sort.select(axis);
        self.publish()
    }

    pub fn set_sort_direction(&mut self, axis: SortAxis, direction: SortDirection) -> JoinHandle<()> {
        self.criteria.sort.set_direction(axis, direction);
        self.publish()
    }

    fn publish(&self) -> JoinHandle<()> {
        let snapshot = self.criteria.clone();
        let tx = self.tx.clone();
        self.debouncer.call(move || {
            tx.send_replace(snapshot);
        })
    }
}

impl Default for FilterPanel {
    fn default() -> Self {
        Self::new()
    }
}
