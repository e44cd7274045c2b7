//! PlaybackPanel — what the jukebox is playing right now.

use juke_proto::duration::format_millis;
use juke_proto::protocol::{PlaybackStatus, PlayerState};
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::channel::ConnectionState;
use crate::component::Component;
use crate::fault::RenderError;
use crate::intent::RenderHint;
use crate::theme::{
    style_default, style_muted, style_secondary, C_BADGE_ERR, C_BADGE_LIVE, C_BADGE_PENDING,
    C_PAUSED, C_PLAYING, C_PRIMARY,
};
use crate::widgets::pane_chrome::{pane_chrome, Badge};
use crate::widgets::progress_bar::draw_progress;

pub struct PlaybackPanel;

impl PlaybackPanel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlaybackPanel {
    fn default() -> Self {
        Self::new()
    }
}

fn placeholder(frame: &mut Frame, area: Rect, text: &str) {
    frame.render_widget(Paragraph::new(Span::styled(text.to_string(), style_muted())), area);
}

fn draw_song(
    frame: &mut Frame,
    area: Rect,
    status: &PlaybackStatus,
    shown: PlayerState,
    hint: RenderHint,
) -> Result<(), RenderError> {
    let (Some(song), Some(progress)) = (status.song.as_ref(), status.progress_ms) else {
        placeholder(frame, area, "[Waiting for data]");
        return Ok(());
    };
    if song.duration_ms == 0 {
        return Err(RenderError::ZeroDuration {
            title: song.title.clone(),
        });
    }

    let color = if shown == PlayerState::Paused { C_PAUSED } else { C_PLAYING };
    let marker = match hint {
        RenderHint::Normal | RenderHint::PendingHidden => "",
        RenderHint::PendingVisible => " …",
        RenderHint::TimedOut => " ?",
    };
    let current = format_millis(progress as u64);
    let total = format_millis(song.duration_ms as u64);

    let [title_row, artist_row, state_row, bar_row] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new(Span::styled(
            song.title.as_str(),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        )),
        title_row,
    );
    frame.render_widget(
        Paragraph::new(Span::styled(song.artist.as_str(), style_default())),
        artist_row,
    );
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("({}{})", shown.label(), marker), Style::default().fg(color)),
            Span::styled(format!(" {} / {}", current, total), style_secondary()),
        ])),
        state_row,
    );
    draw_progress(frame, bar_row, progress, song.duration_ms, color);
    Ok(())
}

impl Component for PlaybackPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Playback
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Char('>') => vec![Action::Resume],
            KeyCode::Char('|') => vec![Action::Pause],
            KeyCode::Enter => vec![Action::TogglePause],
            _ => vec![],
        }
    }

    fn draw(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        focused: bool,
        state: &AppState,
    ) -> Result<(), RenderError> {
        let badge = match state.render_hint() {
            RenderHint::PendingVisible | RenderHint::PendingHidden => Some(Badge {
                text: "…",
                color: C_BADGE_PENDING,
            }),
            RenderHint::TimedOut => Some(Badge {
                text: "?",
                color: C_BADGE_ERR,
            }),
            RenderHint::Normal if state.connection() == ConnectionState::Connected => Some(Badge {
                text: "LIVE",
                color: C_BADGE_LIVE,
            }),
            RenderHint::Normal => None,
        };
        let block = pane_chrome("Now playing", focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let (Some(status), Some(shown)) = (state.status(), state.shown_state()) else {
            placeholder(frame, inner, "[Waiting for data]");
            return Ok(());
        };

        match shown {
            PlayerState::Playing | PlayerState::Paused => {
                draw_song(frame, inner, status, shown, state.render_hint())
            }
            PlayerState::NeedsSong | PlayerState::EnqueuedAndWaiting => {
                placeholder(frame, inner, "Nothing playing. Press a to add a song");
                Ok(())
            }
            PlayerState::NoAuth => {
                placeholder(frame, inner, "Need authentication! Host must log in");
                Ok(())
            }
            PlayerState::NoDevice => {
                placeholder(frame, inner, "No playback device selected");
                Ok(())
            }
            PlayerState::Unknown => {
                placeholder(frame, inner, "[Waiting for data]");
                Ok(())
            }
        }
    }
}
