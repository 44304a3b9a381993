//! Status bar: selection count, sort, preview, and the key hints line.

use curate_core::session::CurationSession;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{
    C_ACCENT, C_CHECKED, C_MODE_FILTER, C_MODE_NORMAL, C_MUTED, C_PLAYING, C_PRIMARY, C_SECONDARY,
    C_SEPARATOR,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Filter,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "CURATE",
            Self::Filter => "FILTER",
        }
    }

    pub fn color(self) -> ratatui::style::Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::Filter => C_MODE_FILTER,
        }
    }
}

pub fn sort_arrow(descending: bool) -> &'static str {
    if descending {
        "▼"
    } else {
        "▲"
    }
}

/// `selected N (K not in catalog) · sort listeners ▼ · ▶ Station`
pub fn draw_status_line(frame: &mut Frame, area: Rect, session: &CurationSession) {
    let sep = Span::styled("  ·  ", Style::default().fg(C_SEPARATOR));
    let mut spans = vec![
        Span::styled(" selected ", Style::default().fg(C_SECONDARY)),
        Span::styled(
            session.selected_count().to_string(),
            Style::default().fg(C_CHECKED).add_modifier(Modifier::BOLD),
        ),
    ];

    let seed_only = session.seed_only_count();
    if seed_only > 0 {
        spans.push(Span::styled(
            format!(" ({} not in catalog)", seed_only),
            Style::default().fg(C_ACCENT),
        ));
    }

    let view = session.view_state();
    spans.push(sep.clone());
    spans.push(Span::styled("sort ", Style::default().fg(C_SECONDARY)));
    spans.push(Span::styled(
        format!("{} {}", view.sort_key.label(), sort_arrow(view.sort_descending)),
        Style::default().fg(C_PRIMARY),
    ));

    if let Some(id) = session.preview().current() {
        let name = session
            .catalog()
            .get(id)
            .map(|r| r.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(id);
        spans.push(sep);
        spans.push(Span::styled(
            format!("▶ {}", name),
            Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Mode label plus the key hints for that mode.
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode) {
    let keys = match mode {
        InputMode::Normal => {
            " ↑↓/jk move  space/x toggle  enter/p preview  / filter  1-4 sort  a all  D none  e export  ? help  q quit"
        }
        InputMode::Filter => " type to filter  ↑↓ move  enter keep  esc clear+close",
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().fg(mode.color()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(keys, Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
