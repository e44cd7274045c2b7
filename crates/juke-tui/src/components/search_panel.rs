//! SearchPanel — query field and results of the open search session.

use juke_proto::duration::format_millis;
use juke_proto::protocol::Song;
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::fault::RenderError;
use crate::search::{SearchPhase, SearchSession};
use crate::theme::{style_default, style_error, style_muted, style_secondary, style_selected_focused};
use crate::widgets::pane_chrome::pane_chrome;
use crate::widgets::query_input::{InputOutcome, QueryInput};

pub struct SearchPanel {
    input: QueryInput,
    session: Option<SearchSession>,
    list_state: ListState,
}

impl SearchPanel {
    pub fn new() -> Self {
        Self {
            input: QueryInput::new("song, artist or album"),
            session: None,
            list_state: ListState::default(),
        }
    }

    pub fn open(&mut self, session: SearchSession) {
        self.input.clear();
        self.list_state = ListState::default();
        self.session = Some(session);
    }

    pub fn is_open(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_closed())
    }

    pub fn session_mut(&mut self) -> Option<&mut SearchSession> {
        self.session.as_mut()
    }

    /// Close and drop the session, releasing its key listener.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.cancel();
        }
    }

    /// Drop a session that closed itself (a track got requested).
    pub fn reap(&mut self) -> bool {
        if self.session.as_ref().is_some_and(|s| s.is_closed()) {
            self.session = None;
            return true;
        }
        false
    }
}

impl Default for SearchPanel {
    fn default() -> Self {
        Self::new()
    }
}

fn result_row(song: &Song) -> Result<ListItem<'_>, RenderError> {
    if song.duration_ms == 0 {
        return Err(RenderError::ZeroDuration {
            title: song.title.clone(),
        });
    }
    Ok(ListItem::new(Line::from(vec![
        Span::styled(song.title.as_str(), style_default().add_modifier(Modifier::BOLD)),
        Span::styled(" by ", style_secondary()),
        Span::styled(song.artist.as_str(), style_default()),
        Span::styled(
            format!(" ({})", format_millis(song.duration_ms as u64)),
            style_muted(),
        ),
    ])))
}

impl Component for SearchPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Search
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        let Some(session) = self.session.as_mut() else {
            return vec![];
        };
        match key.code {
            KeyCode::Up => {
                session.move_selection(-1);
                return vec![];
            }
            KeyCode::Down => {
                session.move_selection(1);
                return vec![];
            }
            _ => {}
        }
        if session.phase() == SearchPhase::Requesting {
            return vec![];
        }
        match self.input.handle_key(key) {
            InputOutcome::Changed(text) => {
                session.set_query(&text);
                vec![]
            }
            InputOutcome::Submitted => {
                if session.phase() == SearchPhase::Results {
                    let Some(uri) = session.selected_song().map(|s| s.spotify_uri.clone()) else {
                        return vec![];
                    };
                    if session.select(&uri) {
                        return vec![Action::RequestTrack(uri)];
                    }
                    return vec![];
                }
                if session.is_busy() {
                    return vec![];
                }
                session.submit().map(Action::RunSearch).into_iter().collect()
            }
            InputOutcome::Ignored => vec![],
        }
    }

    fn draw(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        focused: bool,
        _state: &AppState,
    ) -> Result<(), RenderError> {
        let block = pane_chrome("Add song", focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };

        let [query_row, message_row, body] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(inner);

        self.input.draw(frame, query_row, focused);

        let message = if session.is_busy() {
            Some(Span::styled("Please wait...", style_secondary()))
        } else if let Some(e) = session.error() {
            Some(Span::styled(e.to_string(), style_error()))
        } else if session.phase() == SearchPhase::Empty {
            Some(Span::styled("No results", style_muted()))
        } else {
            None
        };
        if let Some(span) = message {
            frame.render_widget(Paragraph::new(span), message_row);
        }

        let items = session
            .results()
            .iter()
            .map(result_row)
            .collect::<Result<Vec<_>, _>>()?;
        if !items.is_empty() {
            self.list_state.select(Some(session.selected()));
            let list = List::new(items).highlight_style(if focused {
                style_selected_focused()
            } else {
                Style::default()
            });
            frame.render_stateful_widget(list, body, &mut self.list_state);
        }
        Ok(())
    }
}
