//! SearchSession — the lifetime of one open search panel.
//!
//! ```text
//!  Idle ──submit──▶ Querying ──results──▶ Results ──select──▶ Requesting ──ok──▶ Closed
//!   ▲                  │    └──no items──▶ Empty                  │
//!   └──── edit / error ┘                     ▲         error ─────┘ (back to Results)
//! ```
//!
//! Each submit bumps a generation counter and hands out a `SearchTicket`;
//! results carrying an older ticket are discarded, so a slow answer to an
//! earlier query can never replace the answer to the current one.  Editing
//! the query invalidates the ticket in flight as well, except while a track
//! request is out: edits are ignored until it settles.
//!
//! While open the session holds a global Esc listener.  Closing or dropping
//! the session releases it.

use juke_proto::protocol::{SearchResults, Song};
use tracing::debug;

use crate::action::Action;
use crate::dispatcher::DispatchResult;
use crate::keys::{KeyListeners, ListenerGuard};
use ratatui::crossterm::event::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Querying,
    Results,
    Empty,
    Requesting,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    generation: u64,
    query: String,
}

impl SearchTicket {
    pub fn query(&self) -> &str {
        &self.query
    }
}

pub struct SearchSession {
    query: String,
    phase: SearchPhase,
    results: Vec<Song>,
    selected: usize,
    error: Option<String>,
    requesting: Option<String>,
    // Trimmed query of the search in flight.
    pending: Option<String>,
    generation: u64,
    min_query_len: usize,
    esc: Option<ListenerGuard>,
}

impl SearchSession {
    pub fn open(min_query_len: usize, keys: &KeyListeners) -> Self {
        let esc = keys.register(|k| (k.code == KeyCode::Esc).then_some(Action::CloseSearch));
        debug!("search session opened");
        Self {
            query: String::new(),
            phase: SearchPhase::Idle,
            results: Vec::new(),
            selected: 0,
            error: None,
            requesting: None,
            pending: None,
            generation: 0,
            min_query_len: min_query_len.max(1),
            esc: Some(esc),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    #[cfg(test)]
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn results(&self) -> &[Song] {
        &self.results
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_song(&self) -> Option<&Song> {
        self.results.get(self.selected)
    }

    /// A request is out and the panel should say so.
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, SearchPhase::Querying | SearchPhase::Requesting)
    }

    pub fn is_closed(&self) -> bool {
        self.phase == SearchPhase::Closed
    }

    pub fn can_submit(&self) -> bool {
        !self.is_closed() && self.query.trim().chars().count() >= self.min_query_len
    }

    // ── Query ────────────────────────────────────────────────────────────────

    /// Edit the query.  Ignored while a track request is out, so its outcome
    /// still lands on this session.
    pub fn set_query(&mut self, text: &str) {
        if self.is_closed() || self.phase == SearchPhase::Requesting || self.query == text {
            return;
        }
        self.query = text.to_string();
        self.results.clear();
        self.selected = 0;
        self.error = None;
        self.requesting = None;
        self.pending = None;
        // Whatever is in flight now answers a different question.
        self.generation += 1;
        self.phase = SearchPhase::Idle;
    }

    /// Start a search for the current query.  `None` when the query is too
    /// short or the session is closed.
    pub fn submit(&mut self) -> Option<SearchTicket> {
        if !self.can_submit() {
            return None;
        }
        self.results.clear();
        self.selected = 0;
        self.error = None;
        self.generation += 1;
        self.phase = SearchPhase::Querying;
        let query = self.query.trim().to_string();
        self.pending = Some(query.clone());
        Some(SearchTicket {
            generation: self.generation,
            query,
        })
    }

    /// Apply the answer to `ticket`.  Returns `false` when it was stale.
    ///
    /// An older ticket for the very query now being searched still counts:
    /// it answers the same question, e.g. when the newer request was refused
    /// as a duplicate of it.
    pub fn on_results(&mut self, ticket: &SearchTicket, result: DispatchResult<SearchResults>) -> bool {
        let same_question = self.phase == SearchPhase::Querying
            && self.pending.as_deref() == Some(ticket.query.as_str());
        if self.is_closed() || (ticket.generation != self.generation && !same_question) {
            debug!("search: dropping stale results for {:?}", ticket.query);
            return false;
        }
        self.pending = None;
        match result {
            Ok(found) => {
                self.phase = if found.items.is_empty() {
                    SearchPhase::Empty
                } else {
                    SearchPhase::Results
                };
                self.results = found.items;
                self.selected = 0;
            }
            Err(e) => {
                self.phase = SearchPhase::Idle;
                self.error = Some(e.to_string());
            }
        }
        true
    }

    // ── Selection ────────────────────────────────────────────────────────────

    pub fn move_selection(&mut self, delta: isize) {
        if self.results.is_empty() {
            return;
        }
        let last = self.results.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    /// Request `spotify_uri`, which must be one of the current results.
    pub fn select(&mut self, spotify_uri: &str) -> bool {
        if self.phase != SearchPhase::Results
            || !self.results.iter().any(|s| s.spotify_uri == spotify_uri)
        {
            return false;
        }
        self.phase = SearchPhase::Requesting;
        self.requesting = Some(spotify_uri.to_string());
        self.error = None;
        true
    }

    /// Outcome of the request started by [`select`](Self::select).  Success
    /// closes the session; a failure goes back to the results.
    pub fn on_requested(&mut self, spotify_uri: &str, result: DispatchResult<()>) -> bool {
        if self.phase != SearchPhase::Requesting || self.requesting.as_deref() != Some(spotify_uri) {
            return false;
        }
        self.requesting = None;
        match result {
            Ok(()) => self.close(),
            Err(e) => {
                self.phase = SearchPhase::Results;
                self.error = Some(e.to_string());
            }
        }
        true
    }

    // ── Closing ──────────────────────────────────────────────────────────────

    pub fn cancel(&mut self) {
        debug!("search cancelled");
        self.close();
    }

    pub fn close(&mut self) {
        self.phase = SearchPhase::Closed;
        self.results.clear();
        self.requesting = None;
        self.esc.take();
    }
}
