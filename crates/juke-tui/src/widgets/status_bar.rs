//! Status bar — bottom line with connection state, mode and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::channel::ConnectionState;
use crate::theme::{C_ACCENT, C_MUTED, C_PAUSED, C_PLAYING, C_QUERY_FG, C_SECONDARY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Confirm,
    Fault,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "JUKE",
            Self::Search => "SEARCH",
            Self::Confirm => "CONFIRM",
            Self::Fault => "FAULT",
        }
    }

    fn keys(self) -> &'static str {
        match self {
            Self::Normal => {
                " Space pause/resume  n skip  a add song  Tab panes  D device  X log out  r reconnect  q quit"
            }
            Self::Search => " type to search  Enter search/request  ↑↓ select  Esc close",
            Self::Confirm => " y yes  n/Esc no",
            Self::Fault => " c clear  q quit",
        }
    }
}

pub fn draw_status_bar(frame: &mut Frame, area: Rect, mode: InputMode, connection: ConnectionState) {
    let dot_color = match connection {
        ConnectionState::Connected => C_PLAYING,
        ConnectionState::Unknown => C_PAUSED,
        ConnectionState::Disconnected => C_ACCENT,
    };
    let mode_color = match mode {
        InputMode::Normal => C_SECONDARY,
        InputMode::Search => C_QUERY_FG,
        InputMode::Confirm | InputMode::Fault => C_ACCENT,
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().fg(mode_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("●", Style::default().fg(dot_color)),
        Span::styled(format!(" {} ", connection.label()), Style::default().fg(C_SECONDARY)),
        Span::styled(mode.keys(), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
