//! Toast notifications — transient messages in the top-right corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::theme::{C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS, C_TOAST_WARNING};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    fn lifetime(self) -> Duration {
        match self {
            Severity::Info | Severity::Success => Duration::from_secs(3),
            Severity::Warning => Duration::from_secs(4),
            Severity::Error => Duration::from_secs(5),
        }
    }
}

struct Toast {
    message: String,
    severity: Severity,
    expires: Instant,
}

pub struct ToastManager {
    toasts: VecDeque<Toast>,
    max_visible: usize,
}

impl ToastManager {
    pub fn new() -> Self {
        Self {
            toasts: VecDeque::new(),
            max_visible: 4,
        }
    }

    pub fn push_at(&mut self, message: impl Into<String>, severity: Severity, now: Instant) {
        // Same message again just refreshes it.
        let msg = message.into();
        self.toasts.retain(|t| t.message != msg);
        self.toasts.push_back(Toast {
            message: msg,
            severity,
            expires: now + severity.lifetime(),
        });
        while self.toasts.len() > self.max_visible * 2 {
            self.toasts.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push_at(message, Severity::Info, Instant::now());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push_at(message, Severity::Success, Instant::now());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push_at(message, Severity::Warning, Instant::now());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push_at(message, Severity::Error, Instant::now());
    }

    /// Drop expired toasts.  Call each tick.
    pub fn tick(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires > now);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    /// Render toasts, newest first, in the top-right corner of `area`.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let max_width = (area.width / 2).clamp(30, 60).min(area.width);
        let mut y = area.y + 1;

        for toast in self.toasts.iter().rev().take(self.max_visible) {
            if y >= area.y + area.height {
                break;
            }
            let (color, icon) = match toast.severity {
                Severity::Info => (C_TOAST_INFO, "·"),
                Severity::Success => (C_TOAST_SUCCESS, "✓"),
                Severity::Warning => (C_TOAST_WARNING, "!"),
                Severity::Error => (C_TOAST_ERROR, "✗"),
            };
            let w = (toast.message.chars().count() as u16 + 4).min(max_width);
            let toast_area = Rect {
                x: area.x + area.width.saturating_sub(w + 1),
                y,
                width: w,
                height: 1,
            };
            frame.render_widget(Clear, toast_area);
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    format!(" {} {} ", icon, toast.message),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))),
                toast_area,
            );
            y += 1;
        }
    }
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_and_dedup() {
        let t0 = Instant::now();
        let mut toasts = ToastManager::new();
        toasts.push_at("skip failed", Severity::Error, t0);
        toasts.push_at("queued", Severity::Success, t0);
        toasts.push_at("skip failed", Severity::Error, t0);
        assert_eq!(toasts.len(), 2);

        toasts.tick(t0 + Duration::from_secs(4));
        assert_eq!(toasts.len(), 1);
        toasts.tick(t0 + Duration::from_secs(6));
        assert!(toasts.is_empty());
    }
}
