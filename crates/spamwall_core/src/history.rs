//! crates/spamwall_core/src/history.rs
//!
//! The derived-view cache behind the history browser, and page-window slicing.
//!
//! A view is a pure function of the raw list and a `ViewKey`, so each key is
//! computed at most once per generation of the raw list. Replacing the list
//! clears every cached view before the new list is installed.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{FilterCounts, FilterType, HistoryItem, ViewKey};

/// A filtered view, shared so repeated reads hand out the same allocation.
pub type FilteredView = Arc<[HistoryItem]>;

#[derive(Debug, Default)]
pub struct HistoryViewCache {
    items: Vec<HistoryItem>,
    views: HashMap<ViewKey, FilteredView>,
    generation: u64,
}

impl HistoryViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<HistoryItem>) -> Self {
        let mut cache = Self::new();
        cache.replace(items);
        cache
    }

    /// Wholesale replacement of the raw list. Invalidates every cached view.
    pub fn replace(&mut self, items: Vec<HistoryItem>) {
        self.views.clear();
        self.items = items;
        self.generation += 1;
        debug!(
            generation = self.generation,
            items = self.items.len(),
            "History list replaced"
        );
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    /// How many times the raw list has been replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of views computed for the current generation.
    pub fn cached_views(&self) -> usize {
        self.views.len()
    }

    pub fn get_view(&mut self, key: &ViewKey) -> FilteredView {
        if let Some(view) = self.views.get(key) {
            return Arc::clone(view);
        }
        let view: FilteredView = filter_items(&self.items, key.filter, &key.query).into();
        self.views.insert(key.clone(), Arc::clone(&view));
        view
    }

    pub fn counts(&self) -> FilterCounts {
        let spam = self.items.iter().filter(|item| item.is_spam).count();
        FilterCounts {
            all: self.items.len(),
            spam,
            ham: self.items.len() - spam,
        }
    }
}

/// Keeps the items matching `filter` whose text contains `query`, ignoring case.
/// A blank query keeps everything. Relative order is preserved.
pub fn filter_items(items: &[HistoryItem], filter: FilterType, query: &str) -> Vec<HistoryItem> {
    let needle = if query.trim().is_empty() {
        None
    } else {
        Some(query.to_lowercase())
    };
    items
        .iter()
        .filter(|item| filter.matches(item))
        .filter(|item| match &needle {
            Some(needle) => item.text.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .cloned()
        .collect()
}

//=========================================================================================
// Pagination
//=========================================================================================

/// The slice bounds of one page over a view of `total_items`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    /// Zero-based, clamped to the last page.
    pub index: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub range: Range<usize>,
}

impl PageWindow {
    /// One-based page number for display.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.total_pages
    }

    pub fn slice<'a, T>(&self, view: &'a [T]) -> &'a [T] {
        &view[self.range.start.min(view.len())..self.range.end.min(view.len())]
    }
}

/// Computes `[index * page_size, index * page_size + page_size)` clamped to the view.
/// An out-of-range index lands on the last page. A zero page size is treated as one.
pub fn paginate(total_items: usize, page_index: usize, page_size: usize) -> PageWindow {
    let page_size = page_size.max(1);
    let total_pages = total_items.div_ceil(page_size);
    let index = page_index.min(total_pages.saturating_sub(1));
    let start = (index * page_size).min(total_items);
    let end = (start + page_size).min(total_items);
    PageWindow {
        index,
        total_pages,
        total_items,
        range: start..end,
    }
}

/// One page of a filtered view.
#[derive(Debug, Clone)]
pub struct Page {
    view: FilteredView,
    pub window: PageWindow,
}

impl Page {
    pub fn new(view: FilteredView, page_index: usize, page_size: usize) -> Self {
        let window = paginate(view.len(), page_index, page_size);
        Self { view, window }
    }

    pub fn items(&self) -> &[HistoryItem] {
        self.window.slice(&self.view[..])
    }

    pub fn view(&self) -> &FilteredView {
        &self.view
    }
}
