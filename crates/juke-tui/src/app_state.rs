//! AppState — read-only data handed to every component during draw and input.
//!
//! The store's view model is borrowed, never copied into components.  The
//! App event loop is the only writer of what this points at.

use std::time::Instant;

use juke_proto::protocol::{PlaybackStatus, PlayerState, Queue};

use crate::channel::ConnectionState;
use crate::intent::{PlayIntent, RenderHint};
use crate::store::ViewModel;

pub struct AppState<'a> {
    pub view: &'a ViewModel,
    pub intent: PlayIntent,
    pub now: Instant,
}

impl<'a> AppState<'a> {
    pub fn new(view: &'a ViewModel, intent: PlayIntent, now: Instant) -> Self {
        Self { view, intent, now }
    }

    pub fn connection(&self) -> ConnectionState {
        self.view.connection
    }

    pub fn status(&self) -> Option<&'a PlaybackStatus> {
        self.view.status.as_ref()
    }

    pub fn queue(&self) -> Option<&'a Queue> {
        self.view.queue.as_ref()
    }

    /// Player state as the panels should show it, pending intent included.
    pub fn shown_state(&self) -> Option<PlayerState> {
        self.status().map(|s| self.intent.shown(s.state))
    }

    pub fn render_hint(&self) -> RenderHint {
        self.intent.render_hint(self.now)
    }
}
