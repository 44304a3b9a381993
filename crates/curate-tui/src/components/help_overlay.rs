//! HelpOverlay component: centered popup with the key reference.

use curate_core::session::CurationSession;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::{
    action::Action,
    component::Component,
    theme::{C_BG, C_MUTED, C_PANEL_BORDER, C_PRIMARY, C_SECONDARY},
};

pub struct HelpOverlay {
    pub visible: bool,
}

impl HelpOverlay {
    pub fn new() -> Self {
        Self { visible: false }
    }
}

impl Component for HelpOverlay {
    /// While open the overlay swallows every key; `?`, `q` and Esc close it.
    fn handle_key(&mut self, key: KeyEvent, _session: &CurationSession) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Esc => vec![Action::ToggleHelp],
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, _session: &CurationSession) -> Vec<Action> {
        match event.kind {
            MouseEventKind::Down(_) => vec![Action::ToggleHelp],
            _ => vec![],
        }
    }

    fn on_action(&mut self, action: &Action, _session: &CurationSession) {
        if *action == Action::ToggleHelp {
            self.visible = !self.visible;
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, session: &CurationSession) {
        if !self.visible {
            return;
        }

        let lines: Vec<Line> = vec![
            Line::from(Span::styled(
                " curating stations",
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            section(" rows"),
            help_row("↑ / ↓  or  j / k", "move cursor"),
            help_row("pg up / pg dn", "move one page"),
            help_row("g / G", "first / last row"),
            help_row("space  or  x", "toggle selection of the row"),
            help_row("enter  or  p", "preview the row (again to stop)"),
            Line::from(""),
            section(" view"),
            help_row("/", "filter by name or tag (esc clears, then closes)"),
            help_row("1 2 3 4", "sort by selected / name / tags / listeners"),
            help_row("", "same key again flips the direction"),
            Line::from(""),
            section(" selection"),
            help_row("a", "select every visible row"),
            help_row("D", "deselect everything"),
            help_row("e", "export the selection"),
            Line::from(""),
            section(" mouse"),
            help_row("header", "sort by that column"),
            help_row("[ ] / ▷", "toggle / preview"),
            help_row("double click", "preview"),
            Line::from(""),
            help_row("?", "toggle this help"),
            help_row("q / ctrl-c", "quit"),
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    " {} station(s) loaded, {} selected",
                    session.catalog().len(),
                    session.selected_count()
                ),
                Style::default().fg(C_MUTED),
            )),
        ];

        let popup = centered_rect(60, lines.len() as u16 + 2, area);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(C_PANEL_BORDER))
                    .style(Style::default().bg(C_BG)),
            ),
            popup,
        );
    }
}

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        title,
        Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD),
    ))
}

fn help_row<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw(" "),
        Span::styled(
            format!("{:<18}", key),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(desc, Style::default().fg(C_SECONDARY)),
    ])
}

fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let [vert] = Layout::vertical([Constraint::Length(height.min(r.height))])
        .flex(Flex::Center)
        .areas(r);
    let [rect] = Layout::horizontal([Constraint::Length(width.min(r.width))])
        .flex(Flex::Center)
        .areas(vert);
    rect
}
