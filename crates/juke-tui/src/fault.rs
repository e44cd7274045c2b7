//! FaultBoundary — keeps one bad frame from taking the whole UI down.
//!
//! The presentation tree draws inside `FaultBoundary::render`.  A child that
//! returns `Err(RenderError)` or panics flips the boundary to `Faulted`; from
//! then on the recovery panel is drawn in place of the children until the
//! user clears it.  Losing the server is not a fault: that is a connection
//! state and the normal view handles it.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use thiserror::Error;
use tracing::error;

use crate::theme::{style_muted, style_secondary, C_ERROR};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("song {title:?} has no duration")]
    ZeroDuration { title: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FaultState {
    #[default]
    Normal,
    Faulted { error: String, diagnostic: String },
}

#[derive(Debug, Default)]
pub struct FaultBoundary {
    state: FaultState,
}

impl FaultBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn state(&self) -> &FaultState {
        &self.state
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self.state, FaultState::Faulted { .. })
    }

    /// Back to drawing the children.  The only way out of `Faulted`.
    pub fn clear(&mut self) {
        self.state = FaultState::Normal;
    }

    /// Draw `child` into `area`, or the recovery panel if it fails (now or
    /// on an earlier frame).  `name` ends up in the diagnostic.
    pub fn render<F>(&mut self, frame: &mut Frame, area: Rect, name: &str, child: F)
    where
        F: FnOnce(&mut Frame, Rect) -> Result<(), RenderError>,
    {
        if !self.is_faulted() {
            let outcome = catch_unwind(AssertUnwindSafe(|| child(frame, area)));
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some((e.to_string(), format!("{} returned an error", name))),
                Err(payload) => Some((panic_message(payload.as_ref()), format!("{} panicked", name))),
            };
            if let Some((error, diagnostic)) = failure {
                error!("render fault in {}: {}", name, error);
                self.state = FaultState::Faulted { error, diagnostic };
            }
        }

        if let FaultState::Faulted { error, diagnostic } = &self.state {
            draw_recovery(frame, area, error, diagnostic);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn draw_recovery(frame: &mut Frame, area: Rect, error: &str, diagnostic: &str) {
    // Wipe whatever the child got to draw before failing.
    frame.render_widget(Clear, area);
    let lines = vec![
        Line::from(Span::styled(
            "Something went wrong",
            Style::default().fg(C_ERROR).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::raw(error.to_string())),
        Line::from(Span::styled(diagnostic.to_string(), style_secondary())),
        Line::from(""),
        Line::from(Span::styled("press c to clear", style_muted())),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ERROR));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn ok_child(frame: &mut Frame, area: Rect) -> Result<(), RenderError> {
        frame.render_widget(Paragraph::new("all good"), area);
        Ok(())
    }

    #[test]
    fn test_error_faults_until_cleared() {
        let mut terminal = Terminal::new(TestBackend::new(50, 10)).unwrap();
        let mut boundary = FaultBoundary::new();

        terminal
            .draw(|f| {
                let area = f.area();
                boundary.render(f, area, "playback", |_, _| {
                    Err(RenderError::ZeroDuration {
                        title: "Walking".into(),
                    })
                })
            })
            .unwrap();
        assert!(boundary.is_faulted());
        let text = screen(&terminal);
        assert!(text.contains("Something went wrong"));
        assert!(text.contains("has no duration"));
        assert!(text.contains("playback returned an error"));

        // Healthy children are not drawn while faulted.
        terminal
            .draw(|f| {
                let area = f.area();
                boundary.render(f, area, "playback", ok_child)
            })
            .unwrap();
        assert!(!screen(&terminal).contains("all good"));
        assert!(boundary.is_faulted());

        boundary.clear();
        terminal
            .draw(|f| {
                let area = f.area();
                boundary.render(f, area, "playback", ok_child)
            })
            .unwrap();
        assert!(screen(&terminal).contains("all good"));
        assert_eq!(boundary.state(), &FaultState::Normal);
    }

    #[test]
    fn test_panic_is_caught() {
        let mut terminal = Terminal::new(TestBackend::new(50, 10)).unwrap();
        let mut boundary = FaultBoundary::new();
        terminal
            .draw(|f| {
                let area = f.area();
                boundary.render(f, area, "upcoming", |_, _| panic!("index out of range"))
            })
            .unwrap();
        match boundary.state() {
            FaultState::Faulted { error, diagnostic } => {
                assert_eq!(error, "index out of range");
                assert_eq!(diagnostic, "upcoming panicked");
            }
            other => panic!("expected fault, got {:?}", other),
        }
        assert!(screen(&terminal).contains("press c to clear"));
    }
}
