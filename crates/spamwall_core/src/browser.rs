//! crates/spamwall_core/src/browser.rs
//!
//! The history browser: search, filter and paging state over a `HistoryViewCache`,
//! fed by a `HistorySource` on every refresh signal.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{FilterCounts, FilterType, ViewKey};
use crate::error::Result;
use crate::history::{HistoryViewCache, Page};
use crate::ports::{HistorySource, PortError};
use crate::session::SessionStore;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Why a view has nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    NoHistory,
    NoMatches,
}

impl EmptyState {
    pub fn message(self) -> &'static str {
        match self {
            EmptyState::NoHistory => "No history yet",
            EmptyState::NoMatches => "No emails match your criteria",
        }
    }
}

pub struct HistoryBrowser {
    source: Arc<dyn HistorySource>,
    session: Arc<SessionStore>,
    cache: HistoryViewCache,
    key: ViewKey,
    page_index: usize,
    page_size: usize,
    last_signal: Option<u64>,
}

impl HistoryBrowser {
    pub fn new(source: Arc<dyn HistorySource>, session: Arc<SessionStore>) -> Self {
        Self {
            source,
            session,
            cache: HistoryViewCache::new(),
            key: ViewKey::default(),
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
            last_signal: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    //-------------------------------------------------------------------------------------
    // Loading
    //-------------------------------------------------------------------------------------

    /// Re-fetches the list and replaces it wholesale. Returns the number of items.
    ///
    /// On failure the current list, views and paging are left as they were. A 401
    /// from the source signs the session out; a missing credential only fails.
    pub async fn refresh(&mut self) -> Result<usize> {
        let Some(credential) = self.session.credential() else {
            debug!("No credential; history cannot be fetched");
            return Err(PortError::Unauthorized.into());
        };

        match self.source.fetch_all(&credential).await {
            Ok(items) => {
                let count = items.len();
                self.cache.replace(items);
                self.page_index = 0;
                Ok(count)
            }
            Err(e) => {
                if !self.session.escalate(&e) {
                    warn!("Failed to load history: {}", e);
                }
                Err(e.into())
            }
        }
    }

    /// Refreshes when `signal` differs from the last one observed.
    ///
    /// Returns `Ok(false)` when the signal was already handled.
    pub async fn on_refresh_signal(&mut self, signal: u64) -> Result<bool> {
        if self.last_signal == Some(signal) {
            return Ok(false);
        }
        self.last_signal = Some(signal);
        self.refresh().await.map(|_| true)
    }

    //-------------------------------------------------------------------------------------
    // View state
    //-------------------------------------------------------------------------------------

    pub fn filter(&self) -> FilterType {
        self.key.filter
    }

    pub fn query(&self) -> &str {
        &self.key.query
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_filter(&mut self, filter: FilterType) {
        if self.key.filter != filter {
            self.key.filter = filter;
            self.page_index = 0;
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if self.key.query != query {
            self.key.query = query;
            self.page_index = 0;
        }
    }

    /// Moves to a zero-based page; clamped when the page is read.
    pub fn set_page(&mut self, page_index: usize) {
        self.page_index = page_index;
    }

    pub fn next_page(&mut self) {
        let page = self.current_page();
        if page.window.has_next() {
            self.page_index = page.window.index + 1;
        }
    }

    pub fn previous_page(&mut self) {
        let page = self.current_page();
        self.page_index = page.window.index.saturating_sub(1);
    }

    pub fn current_page(&mut self) -> Page {
        let view = self.cache.get_view(&self.key);
        Page::new(view, self.page_index, self.page_size)
    }

    pub fn counts(&self) -> FilterCounts {
        self.cache.counts()
    }

    /// Any active search or filter makes an empty view a `NoMatches`, even when
    /// there is no history at all.
    pub fn empty_state(&mut self) -> Option<EmptyState> {
        if !self.cache.get_view(&self.key).is_empty() {
            return None;
        }
        let narrowed = !self.key.query.is_empty() || self.key.filter != FilterType::All;
        Some(if narrowed {
            EmptyState::NoMatches
        } else {
            EmptyState::NoHistory
        })
    }

    pub fn cache(&self) -> &HistoryViewCache {
        &self.cache
    }
}
