//! Smooth Unicode progress bar with `current / duration` labels.

use juke_proto::duration::format_millis;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MUTED, C_SECONDARY};

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Render the track progress in `area`.  `duration_ms` must be non-zero;
/// callers reject zero durations before drawing.
pub fn draw_progress(
    frame: &mut Frame,
    area: Rect,
    progress_ms: u32,
    duration_ms: u32,
    color: Color,
) {
    if area.width < 4 || area.height == 0 || duration_ms == 0 {
        return;
    }

    let left_label = format_millis(progress_ms as u64);
    let right_label = format_millis(duration_ms as u64);
    let label_w = (left_label.len() + right_label.len() + 2) as u16;
    let bar_w = area.width.saturating_sub(label_w).max(4) as usize;

    let fraction = (progress_ms as f64 / duration_ms as f64).clamp(0.0, 1.0);
    let bar = render_bar(fraction, bar_w);

    let line = Line::from(vec![
        Span::styled(format!("{} ", left_label), Style::default().fg(C_SECONDARY)),
        Span::styled(bar, Style::default().fg(color)),
        Span::styled(format!(" {}", right_label), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// `width` cells, filled in eighths.
fn render_bar(fraction: f64, width: usize) -> String {
    let eighths = (fraction * width as f64 * 8.0) as usize;
    let full = eighths / 8;
    let partial = eighths % 8;

    let mut bar = String::with_capacity(width * 3);
    for _ in 0..full.min(width) {
        bar.push('█');
    }
    if full < width {
        bar.push(BLOCKS[partial]);
        for _ in (full + 1)..width {
            bar.push(' ');
        }
    }
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_width_is_stable() {
        for f in [0.0, 0.01, 0.5, 0.999, 1.0] {
            assert_eq!(render_bar(f, 20).chars().count(), 20, "fraction {}", f);
        }
        assert_eq!(render_bar(1.0, 4), "████");
        assert_eq!(render_bar(0.5, 4), "██  ");
    }
}
