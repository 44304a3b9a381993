//! PaneChrome: the bordered frame around the station table.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
};

use crate::theme::{C_PANEL_BORDER, C_PRIMARY, C_SECONDARY};

/// A badge shown in the top-right of the pane border (e.g. "▶ PREVIEW").
pub struct Badge {
    pub text: String,
    pub color: Color,
}

/// Bordered block titled `"title  detail"` with an optional badge.
pub fn pane_chrome<'a>(title: &'a str, detail: String, badge: Option<Badge>) -> Block<'a> {
    let title_line = Line::from(vec![
        Span::styled(
            format!(" {} ", title),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("{} ", detail), Style::default().fg(C_SECONDARY)),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_PANEL_BORDER))
        .title(title_line);

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
