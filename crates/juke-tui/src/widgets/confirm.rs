//! Yes/no prompt in front of destructive requests.
//!
//! Answering yes is the only way to obtain a `Confirmation`, which the
//! dispatcher demands for clearing the device and logging out.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::action::ConfirmKind;
use crate::dispatcher::Confirmation;
use crate::theme::{style_muted, C_ACCENT, C_PRIMARY};

#[derive(Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Granted(ConfirmKind, Confirmation),
    Declined,
    Open,
}

pub struct ConfirmPrompt {
    kind: ConfirmKind,
}

impl ConfirmPrompt {
    pub fn new(kind: ConfirmKind) -> Self {
        Self { kind }
    }

    pub fn handle_key(&self, key: KeyEvent) -> ConfirmOutcome {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                ConfirmOutcome::Granted(self.kind, Confirmation::granted())
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => ConfirmOutcome::Declined,
            _ => ConfirmOutcome::Open,
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let [row] = Layout::vertical([Constraint::Length(5)])
            .flex(Flex::Center)
            .areas(area);
        let [popup] = Layout::horizontal([Constraint::Length(44)])
            .flex(Flex::Center)
            .areas(row);

        frame.render_widget(Clear, popup);
        let lines = vec![
            Line::from(Span::styled(
                self.kind.question(),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled("y = yes   n = no", style_muted())),
        ];
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(C_ACCENT));
        frame.render_widget(Paragraph::new(lines).block(block).centered(), popup);
    }
}
