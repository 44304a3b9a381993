//! FilterInput: the one-line filter bar above the station table.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED, C_SECONDARY};

pub enum FilterAction {
    Changed(String),
    Confirmed,
    Cancelled,
}

pub struct FilterInput {
    input: Input,
    active: bool,
    placeholder: String,
}

impl FilterInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            placeholder: placeholder.into(),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    /// Esc clears the text first and closes the bar only once it is empty.
    /// Enter closes the bar and keeps the text applied.
    pub fn handle_key(&mut self, key: KeyEvent) -> FilterAction {
        match key.code {
            KeyCode::Esc if !self.input.value().is_empty() => {
                self.input = Input::default();
                FilterAction::Changed(String::new())
            }
            KeyCode::Esc => {
                self.active = false;
                FilterAction::Cancelled
            }
            KeyCode::Enter => {
                self.active = false;
                FilterAction::Confirmed
            }
            _ => {
                self.input.handle_event(&Event::Key(key));
                FilterAction::Changed(self.input.value().to_string())
            }
        }
    }

    /// Render the bar.  `shown`/`total` is the match counter on the right.
    pub fn draw(&self, frame: &mut Frame, area: Rect, shown: usize, total: usize) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let counter = format!(" {}/{} ", shown, total);
        let counter_w = counter.chars().count() as u16;
        let text_w = area.width.saturating_sub(counter_w + 2);

        let scroll = self.input.visual_scroll(text_w as usize);
        let value = self.input.value();
        let prompt_style = if self.active {
            Style::default().fg(C_FILTER_FG).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(C_MUTED)
        };
        let body = if value.is_empty() && !self.active {
            Span::styled(self.placeholder.clone(), Style::default().fg(C_MUTED))
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            let fg = if self.active { C_FILTER_FG } else { C_SECONDARY };
            Span::styled(visible, Style::default().fg(fg))
        };

        let left = Rect {
            width: area.width.saturating_sub(counter_w),
            ..area
        };
        let right = Rect {
            x: area.x + left.width,
            width: area.width - left.width,
            ..area
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![Span::styled("/ ", prompt_style), body]))
                .style(Style::default().bg(C_FILTER_BG)),
            left,
        );
        frame.render_widget(
            Paragraph::new(Span::styled(counter, Style::default().fg(C_SECONDARY)))
                .style(Style::default().bg(C_FILTER_BG)),
            right,
        );

        if self.active {
            let cursor_x = area.x + 2 + (self.input.visual_cursor().saturating_sub(scroll)) as u16;
            frame.set_cursor_position((cursor_x.min(left.x + left.width.saturating_sub(1)), area.y));
        }
    }
}
