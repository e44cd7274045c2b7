//! UpcomingList — requested songs waiting to be played.

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
use crate::theme::{style_default, style_muted, style_secondary, style_selected_focused, C_PRIMARY};
use crate::widgets::pane_chrome::pane_chrome;

#[derive(Default)]
pub struct UpcomingList {
    list_state: ListState,
}

impl UpcomingList {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Component for UpcomingList {
    fn id(&self) -> ComponentId {
        ComponentId::Upcoming
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        let len = state.queue().map(|q| q.len()).unwrap_or(0);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.list_state.select_previous();
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if len > 0 && self.list_state.selected().map_or(true, |i| i + 1 < len) {
                    self.list_state.select_next();
                }
                vec![]
            }
            KeyCode::Enter => vec![Action::OpenSearch],
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
        let block = pane_chrome("Upcoming", focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(queue) = state.queue() else {
            frame.render_widget(Paragraph::new(Span::styled("Nothing yet..", style_muted())), inner);
            return Ok(());
        };

        let [header, body, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(inner);

        let title = if queue.is_empty() {
            "No songs?!"
        } else {
            "Upcoming songs, in no particular order:"
        };
        frame.render_widget(
            Paragraph::new(Span::styled(
                title,
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            header,
        );

        if !queue.is_empty() {
            if let Some(i) = self.list_state.selected() {
                if i >= queue.len() {
                    self.list_state.select(Some(queue.len() - 1));
                }
            }
            let items: Vec<ListItem> = queue
                .iter()
                .map(|(_, song)| {
                    ListItem::new(Line::from(vec![
                        Span::styled(song.title.as_str(), style_default().add_modifier(Modifier::BOLD)),
                        Span::styled(" by ", style_secondary()),
                        Span::styled(song.artist.as_str(), style_default()),
                    ]))
                })
                .collect();
            let list = List::new(items).highlight_style(if focused {
                style_selected_focused()
            } else {
                Style::default()
            });
            frame.render_stateful_widget(list, body, &mut self.list_state);
        }

        frame.render_widget(
            Paragraph::new(Span::styled("[a] Add song", style_secondary())),
            footer,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::PlayIntent;
    use crate::store::ViewModel;
    use juke_proto::protocol::{Queue, Song};
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Instant;

    fn render(view: &ViewModel) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 10)).unwrap();
        let mut list = UpcomingList::new();
        let state = AppState::new(view, PlayIntent::default(), Instant::now());
        terminal
            .draw(|f| {
                let area = f.area();
                list.draw(f, area, false, &state).unwrap();
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_three_states() {
        assert!(render(&ViewModel::default()).contains("Nothing yet.."));

        let mut view = ViewModel {
            queue: Some(Queue::default()),
            ..ViewModel::default()
        };
        assert!(render(&view).contains("No songs?!"));

        view.queue = Some(Queue {
            songs: vec![(
                "t1".into(),
                Song {
                    spotify_uri: "spotify:track:t1".into(),
                    title: "Walking".into(),
                    artist: "The Dodos".into(),
                    album_image_url: None,
                    duration_ms: 1,
                },
            )],
        });
        let text = render(&view);
        assert!(text.contains("Upcoming songs, in no particular order"));
        assert!(text.contains("Walking by The Dodos"));
    }
}
