//! Action enum — all user-initiated intents.

use crate::search::SearchTicket;

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Playback,
    Upcoming,
    Search,
    Devices,
}

/// Destructive requests that need a yes/no first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKind {
    ClearDevice,
    LogOut,
}

impl ConfirmKind {
    pub fn question(self) -> &'static str {
        match self {
            ConfirmKind::ClearDevice => "Select new device?",
            ConfirmKind::LogOut => "Disconnect from the music service?",
        }
    }
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // ── Playback ─────────────────────────────────────────────────────────────
    Resume,
    Pause,
    TogglePause,
    Skip,

    // ── Search ───────────────────────────────────────────────────────────────
    OpenSearch,
    CloseSearch,
    RunSearch(SearchTicket),
    RequestTrack(String), // spotify uri

    // ── Devices ──────────────────────────────────────────────────────────────
    SelectDevice(String), // device id
    Confirm(ConfirmKind),

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,

    // ── System ───────────────────────────────────────────────────────────────
    ClearFault,
    Reconnect,
    Quit,
}
