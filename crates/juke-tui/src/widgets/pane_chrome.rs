//! PaneChrome — standardized bordered pane with focus styling and badges.

use crate::theme::{style_focused_border, style_unfocused_border, C_MUTED, C_PRIMARY};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
};

/// A badge shown in the top-right of the pane header (e.g., "LIVE", "…").
pub struct Badge<'a> {
    pub text: &'a str,
    pub color: Color,
}

/// Bordered pane with focus-dependent border and title colours.
pub fn pane_chrome<'a>(title: &'a str, focused: bool, badge: Option<Badge<'a>>) -> Block<'a> {
    let (border_style, title_style) = if focused {
        (
            style_focused_border(),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        )
    } else {
        (style_unfocused_border(), Style::default().fg(C_MUTED))
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Line::from(Span::styled(format!(" {} ", title), title_style)));

    match badge {
        Some(b) => block.title_top(
            Line::from(Span::styled(
                format!(" {} ", b.text),
                Style::default().fg(b.color).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        ),
        None => block,
    }
}
