//! QueryInput — tui-input text field for the search panel.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_MUTED, C_QUERY_BG, C_QUERY_FG};

#[derive(Debug, PartialEq, Eq)]
pub enum InputOutcome {
    Changed(String),
    Submitted,
    /// Key not for the text field (arrows, Esc, ...).
    Ignored,
}

pub struct QueryInput {
    input: Input,
    placeholder: &'static str,
}

impl QueryInput {
    pub fn new(placeholder: &'static str) -> Self {
        Self {
            input: Input::default(),
            placeholder,
        }
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> InputOutcome {
        match key.code {
            KeyCode::Enter => InputOutcome::Submitted,
            KeyCode::Esc | KeyCode::Up | KeyCode::Down | KeyCode::Tab | KeyCode::BackTab => {
                InputOutcome::Ignored
            }
            _ => {
                let before = self.input.value().to_string();
                self.input.handle_event(&Event::Key(key));
                if self.input.value() == before {
                    InputOutcome::Ignored
                } else {
                    InputOutcome::Changed(self.input.value().to_string())
                }
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, active: bool) {
        if area.width < 3 || area.height == 0 {
            return;
        }
        let scroll = self.input.visual_scroll(area.width.saturating_sub(3) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(format!("> {}", self.placeholder), Style::default().fg(C_MUTED))
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(format!("> {}", visible), Style::default().fg(C_QUERY_FG))
        };
        frame.render_widget(
            Paragraph::new(Line::from(display)).style(Style::default().bg(C_QUERY_BG)),
            area,
        );

        if active {
            let cursor_x = area.x + 2 + (self.input.visual_cursor().saturating_sub(scroll)) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_and_submit() {
        let mut input = QueryInput::new("search");
        assert_eq!(
            input.handle_key(key(KeyCode::Char('a'))),
            InputOutcome::Changed("a".into())
        );
        input.handle_key(key(KeyCode::Char('b')));
        assert_eq!(
            input.handle_key(key(KeyCode::Backspace)),
            InputOutcome::Changed("a".into())
        );
        assert_eq!(input.handle_key(key(KeyCode::Esc)), InputOutcome::Ignored);
        assert_eq!(input.handle_key(key(KeyCode::Enter)), InputOutcome::Submitted);
        assert_eq!(input.text(), "a");
    }
}
