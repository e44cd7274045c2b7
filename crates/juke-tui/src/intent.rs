//! Pending play/pause intent.
//!
//! Pressing pause fires `/api/pause`, but the playback panel only learns the
//! outcome from a later status frame.  Until then the panel shows the state
//! the user asked for, dimmed and pulsing; if no status confirms it within
//! `INTENT_TIMEOUT` the hint turns into a warning.
//!
//! ```text
//!  Settled ──request──▶ Pending ──status matches──▶ Settled
//!                          │
//!                          └──timeout──▶ Stale ──any status──▶ Settled
//! ```

use std::time::{Duration, Instant};

use juke_proto::protocol::PlayerState;

/// How long a status has to confirm an intent.  A couple of poll periods.
pub const INTENT_TIMEOUT: Duration = Duration::from_millis(3000);

const PULSE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayIntent {
    #[default]
    Settled,
    Pending { wanted: PlayerState, since: Instant },
    Stale { wanted: PlayerState },
}

/// How to render the player state while an intent may be outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderHint {
    Normal,
    /// Pending, pulse-on frame.
    PendingVisible,
    /// Pending, pulse-off frame.
    PendingHidden,
    /// Nothing confirmed the request; render with a warning and "?".
    TimedOut,
}

impl PlayIntent {
    /// State to display: the wanted one while waiting, else the reported one.
    pub fn shown(&self, reported: PlayerState) -> PlayerState {
        match self {
            PlayIntent::Settled => reported,
            PlayIntent::Pending { wanted, .. } | PlayIntent::Stale { wanted } => *wanted,
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        matches!(self, PlayIntent::Pending { .. })
    }

    /// Record that `wanted` was requested.  Nothing to wait for when the
    /// server already reports it.
    pub fn request(&mut self, wanted: PlayerState, reported: PlayerState, now: Instant) {
        *self = if wanted == reported {
            PlayIntent::Settled
        } else {
            PlayIntent::Pending { wanted, since: now }
        };
    }

    /// The request failed outright; show the server's state again.
    pub fn abandon(&mut self) {
        *self = PlayIntent::Settled;
    }

    /// Feed every applied status.  Returns `true` if the intent resolved.
    pub fn on_status(&mut self, reported: PlayerState) -> bool {
        match *self {
            PlayIntent::Settled => false,
            PlayIntent::Pending { wanted, .. } => {
                if wanted == reported {
                    *self = PlayIntent::Settled;
                    true
                } else {
                    false
                }
            }
            // Whatever the server says now wins.
            PlayIntent::Stale { .. } => {
                *self = PlayIntent::Settled;
                true
            }
        }
    }

    /// Call on every UI tick.  Returns `true` when the intent just went stale.
    pub fn tick(&mut self, now: Instant) -> bool {
        if let PlayIntent::Pending { wanted, since } = *self {
            if now.saturating_duration_since(since) >= INTENT_TIMEOUT {
                *self = PlayIntent::Stale { wanted };
                return true;
            }
        }
        false
    }

    pub fn render_hint(&self, now: Instant) -> RenderHint {
        match self {
            PlayIntent::Settled => RenderHint::Normal,
            PlayIntent::Pending { since, .. } => {
                let phase = now.saturating_duration_since(*since).as_millis() / PULSE.as_millis();
                if phase % 2 == 0 {
                    RenderHint::PendingVisible
                } else {
                    RenderHint::PendingHidden
                }
            }
            PlayIntent::Stale { .. } => RenderHint::TimedOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmed_by_status() {
        let t0 = Instant::now();
        let mut intent = PlayIntent::default();
        intent.request(PlayerState::Paused, PlayerState::Playing, t0);
        assert!(intent.is_pending());
        assert_eq!(intent.shown(PlayerState::Playing), PlayerState::Paused);

        // A status from before the pause landed does not resolve it.
        assert!(!intent.on_status(PlayerState::Playing));
        assert!(intent.on_status(PlayerState::Paused));
        assert_eq!(intent.render_hint(t0), RenderHint::Normal);
    }

    #[test]
    fn test_already_there_is_settled() {
        let mut intent = PlayIntent::default();
        intent.request(PlayerState::Playing, PlayerState::Playing, Instant::now());
        assert_eq!(intent, PlayIntent::Settled);
    }

    #[test]
    fn test_times_out_then_accepts_server() {
        let t0 = Instant::now();
        let mut intent = PlayIntent::default();
        intent.request(PlayerState::Playing, PlayerState::Paused, t0);
        assert_eq!(intent.render_hint(t0), RenderHint::PendingVisible);
        assert_eq!(
            intent.render_hint(t0 + Duration::from_millis(500)),
            RenderHint::PendingHidden
        );

        assert!(!intent.tick(t0 + Duration::from_millis(2999)));
        assert!(intent.tick(t0 + INTENT_TIMEOUT));
        assert_eq!(intent.render_hint(t0 + INTENT_TIMEOUT), RenderHint::TimedOut);

        assert!(intent.on_status(PlayerState::Paused));
        assert_eq!(intent.shown(PlayerState::Paused), PlayerState::Paused);
    }
}
