//! StationTable component: filter bar, sortable header, and the station rows.
//!
//! Rows come from `session.visible()` on every draw and every input; the
//! component only keeps the cursor, the scroll offset, and the geometry of
//! the last frame for mouse hit-testing.

use std::time::Instant;

use curate_core::session::CurationSession;
use curate_core::station::StationRecord;
use curate_core::view::SortKey;
use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table},
    Frame,
};

use crate::{
    action::Action,
    component::Component,
    theme::{
        style_cursor_row, style_header, style_header_active, style_muted, C_CHECKED, C_LOCATION,
        C_MUTED, C_PLAYING, C_PRIMARY, C_SECONDARY, C_TAG,
    },
    widgets::{
        filter_input::{FilterAction, FilterInput},
        pane_chrome::{pane_chrome, Badge},
        status_bar::sort_arrow,
    },
};

const DOUBLE_CLICK_MS: u128 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Check,
    Play,
    Name,
    Tags,
    Listeners,
    Codec,
    Country,
}

impl Column {
    const ALL: [Column; 7] = [
        Column::Check,
        Column::Play,
        Column::Name,
        Column::Tags,
        Column::Listeners,
        Column::Codec,
        Column::Country,
    ];

    fn title(self) -> &'static str {
        match self {
            Column::Check => "sel",
            Column::Play => "",
            Column::Name => "name",
            Column::Tags => "tags",
            Column::Listeners => "listeners",
            Column::Codec => "codec",
            Column::Country => "cc",
        }
    }

    fn sort_key(self) -> Option<SortKey> {
        match self {
            Column::Check => Some(SortKey::Selected),
            Column::Name => Some(SortKey::Name),
            Column::Tags => Some(SortKey::Tags),
            Column::Listeners => Some(SortKey::Clickcount),
            Column::Play | Column::Codec | Column::Country => None,
        }
    }

    fn constraint(self) -> Constraint {
        match self {
            Column::Check => Constraint::Length(5),
            Column::Play => Constraint::Length(1),
            Column::Name => Constraint::Fill(3),
            Column::Tags => Constraint::Fill(2),
            Column::Listeners => Constraint::Length(11),
            Column::Codec => Constraint::Length(9),
            Column::Country => Constraint::Length(3),
        }
    }
}

pub struct StationTable {
    filter_input: FilterInput,
    cursor: usize,
    scroll_offset: usize,
    /// Id under the cursor at the last draw; the cursor follows it across
    /// re-sorts and filter edits.
    anchor: Option<String>,
    header_area: Rect,
    body_area: Rect,
    /// (column, x, width) from the last draw.
    columns: Vec<(Column, u16, u16)>,
    last_click: Option<(usize, Instant)>,
}

impl StationTable {
    pub fn new() -> Self {
        Self {
            filter_input: FilterInput::new("filter by name or tag"),
            cursor: 0,
            scroll_offset: 0,
            anchor: None,
            header_area: Rect::default(),
            body_area: Rect::default(),
            columns: Vec::new(),
            last_click: None,
        }
    }

    pub fn is_filter_active(&self) -> bool {
        self.filter_input.is_active()
    }

    fn page(&self) -> usize {
        (self.body_area.height as usize).max(1)
    }

    fn move_up(&mut self, n: usize) {
        self.cursor = self.cursor.saturating_sub(n);
    }

    fn move_down(&mut self, n: usize, len: usize) {
        self.cursor = (self.cursor + n).min(len.saturating_sub(1));
    }

    fn clamp(&mut self, len: usize) {
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }

    fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if self.cursor >= self.scroll_offset + height {
            self.scroll_offset = self.cursor + 1 - height;
        }
    }

    fn id_at_cursor(&self, rows: &[&StationRecord]) -> Option<String> {
        rows.get(self.cursor).map(|r| r.stationuuid.clone())
    }

    fn column_at(&self, x: u16) -> Option<Column> {
        self.columns
            .iter()
            .find(|(_, cx, w)| x >= *cx && x < cx + w)
            .map(|(c, _, _)| *c)
    }

    fn row_actions(&self, rows: &[&StationRecord], key: KeyCode) -> Vec<Action> {
        let Some(id) = self.id_at_cursor(rows) else {
            return vec![];
        };
        match key {
            KeyCode::Char(' ') | KeyCode::Char('x') => vec![Action::Toggle(id)],
            _ => vec![Action::Preview(id)],
        }
    }

    fn render_row<'a>(
        record: &'a StationRecord,
        at_cursor: bool,
        session: &CurationSession,
    ) -> Row<'a> {
        let selected = session.is_selected(&record.stationuuid);
        let playing = session.preview().is_playing(&record.stationuuid);

        let check = if selected {
            Span::styled("[x]", Style::default().fg(C_CHECKED))
        } else {
            Span::styled("[ ]", Style::default().fg(C_MUTED))
        };
        let play = if playing {
            Span::styled("▶", Style::default().fg(C_PLAYING))
        } else {
            Span::styled("▷", Style::default().fg(C_MUTED))
        };
        let name = if record.name.is_empty() {
            Span::styled("(unnamed)", style_muted())
        } else if playing {
            Span::styled(record.name.as_str(), Style::default().fg(C_PLAYING))
        } else {
            Span::styled(record.name.as_str(), Style::default().fg(C_PRIMARY))
        };
        let codec = match (record.codec.is_empty(), record.bitrate) {
            (true, 0) => String::new(),
            (false, 0) => record.codec.clone(),
            (_, kbps) => format!("{} {}k", record.codec, kbps).trim().to_string(),
        };

        let row = Row::new(vec![
            Cell::from(Line::from(check)),
            Cell::from(Line::from(play)),
            Cell::from(Line::from(name)),
            Cell::from(Span::styled(record.tags.as_str(), Style::default().fg(C_TAG))),
            Cell::from(
                Line::from(Span::styled(
                    record.clickcount.to_string(),
                    Style::default().fg(C_SECONDARY),
                ))
                .right_aligned(),
            ),
            Cell::from(Span::styled(codec, Style::default().fg(C_SECONDARY))),
            Cell::from(Span::styled(
                record.countrycode.as_str(),
                Style::default().fg(C_LOCATION),
            )),
        ]);
        if at_cursor {
            row.style(style_cursor_row())
        } else {
            row
        }
    }
}

impl Default for StationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StationTable {
    fn route_key(&mut self, key: KeyEvent, session: &CurationSession) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let rows = session.visible();

        if self.filter_input.is_active() {
            match key.code {
                KeyCode::Up => {
                    self.move_up(1);
                    return vec![];
                }
                KeyCode::Down => {
                    self.move_down(1, rows.len());
                    return vec![];
                }
                _ => {}
            }
            return match self.filter_input.handle_key(key) {
                FilterAction::Changed(q) => vec![Action::FilterChanged(q)],
                FilterAction::Confirmed | FilterAction::Cancelled => vec![Action::CloseFilter],
            };
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.move_down(1, rows.len()),
            KeyCode::PageUp => self.move_up(self.page()),
            KeyCode::PageDown => self.move_down(self.page(), rows.len()),
            KeyCode::Home | KeyCode::Char('g') => self.cursor = 0,
            KeyCode::End | KeyCode::Char('G') => self.cursor = rows.len().saturating_sub(1),

            code @ (KeyCode::Char(' ')
            | KeyCode::Char('x')
            | KeyCode::Enter
            | KeyCode::Char('p')) => return self.row_actions(&rows, code),

            KeyCode::Char('/') => {
                self.filter_input.activate();
                return vec![Action::OpenFilter];
            }
            KeyCode::Char(c @ '1'..='4') => {
                let idx = c as usize - '1' as usize;
                return vec![Action::SortBy(SortKey::ALL[idx])];
            }
            KeyCode::Char('a') => return vec![Action::SelectAllVisible],
            KeyCode::Char('D') => return vec![Action::DeselectAll],
            _ => {}
        }
        vec![]
    }

    fn route_mouse(&mut self, event: MouseEvent, session: &CurationSession) -> Vec<Action> {
        let rows = session.visible();
        match event.kind {
            MouseEventKind::ScrollUp => self.move_up(1),
            MouseEventKind::ScrollDown => self.move_down(1, rows.len()),
            MouseEventKind::Down(MouseButton::Left) => {
                let column = self.column_at(event.column);

                if event.row == self.header_area.y && self.header_area.height > 0 {
                    return column
                        .and_then(Column::sort_key)
                        .map(|k| vec![Action::SortBy(k)])
                        .unwrap_or_default();
                }

                let body = self.body_area;
                if event.row < body.y || event.row >= body.y + body.height {
                    return vec![];
                }
                let idx = self.scroll_offset + (event.row - body.y) as usize;
                let Some(record) = rows.get(idx) else {
                    return vec![];
                };
                self.cursor = idx;
                let id = record.stationuuid.clone();

                let now = Instant::now();
                let is_double = self
                    .last_click
                    .map(|(row, t)| row == idx && t.elapsed().as_millis() < DOUBLE_CLICK_MS)
                    .unwrap_or(false);
                self.last_click = Some((idx, now));

                match column {
                    Some(Column::Check) => return vec![Action::Toggle(id)],
                    Some(Column::Play) => return vec![Action::Preview(id)],
                    _ if is_double => {
                        self.last_click = None;
                        return vec![Action::Preview(id)];
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        vec![]
    }

    /// Put the cursor back on `id` after the view was recomputed; the first
    /// row when `id` is no longer visible.
    fn follow(&mut self, id: Option<&str>, session: &CurationSession) {
        let rows = session.visible();
        self.cursor = id
            .and_then(|id| rows.iter().position(|r| r.stationuuid == id))
            .unwrap_or(0);
        self.anchor = self.id_at_cursor(&rows);
    }
}

impl Component for StationTable {
    /// Every key leaves `anchor` on the row under the cursor, so the actions
    /// it produces can re-find that row in the recomputed view.
    fn handle_key(&mut self, key: KeyEvent, session: &CurationSession) -> Vec<Action> {
        let actions = self.route_key(key, session);
        self.anchor = self.id_at_cursor(&session.visible());
        actions
    }

    fn handle_mouse(&mut self, event: MouseEvent, session: &CurationSession) -> Vec<Action> {
        let actions = self.route_mouse(event, session);
        self.anchor = self.id_at_cursor(&session.visible());
        actions
    }

    /// Selection edits reorder the view under the `selected` sort, and sort
    /// or filter changes reorder it always: the cursor follows its station.
    fn on_action(&mut self, action: &Action, session: &CurationSession) {
        match action {
            Action::Toggle(id) => self.follow(Some(id), session),
            Action::SortBy(_)
            | Action::FilterChanged(_)
            | Action::SelectAllVisible
            | Action::DeselectAll => {
                let anchor = self.anchor.take();
                self.follow(anchor.as_deref(), session);
            }
            _ => {}
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, session: &CurationSession) {
        let rows = session.visible();
        let badge = session.preview().current().map(|_| Badge {
            text: "▶ PREVIEW".to_string(),
            color: C_PLAYING,
        });
        let block = pane_chrome("stations", format!("{} shown", rows.len()), badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [filter_area, header_area, body_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(inner);
        self.header_area = header_area;
        self.body_area = body_area;

        self.filter_input
            .draw(frame, filter_area, rows.len(), session.catalog().len());

        let col_rects = Layout::horizontal(Column::ALL.map(Column::constraint))
            .spacing(1)
            .split(header_area);
        self.columns = Column::ALL
            .iter()
            .zip(col_rects.iter())
            .map(|(c, r)| (*c, r.x, r.width))
            .collect();

        let view = session.view_state();
        let header = Row::new(Column::ALL.iter().map(|c| {
            if c.sort_key() == Some(view.sort_key) {
                Cell::from(format!("{} {}", c.title(), sort_arrow(view.sort_descending)))
                    .style(style_header_active())
            } else {
                Cell::from(c.title()).style(style_header())
            }
        }));

        self.clamp(rows.len());
        self.ensure_visible(body_area.height as usize);
        self.anchor = self.id_at_cursor(&rows);

        let widths: Vec<Constraint> = self
            .columns
            .iter()
            .map(|(_, _, w)| Constraint::Length(*w))
            .collect();
        let body: Vec<Row> = rows
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(body_area.height as usize)
            .map(|(i, rec)| Self::render_row(rec, i == self.cursor, session))
            .collect();

        frame.render_widget(
            Table::new(body, widths).header(header).column_spacing(1),
            header_area.union(body_area),
        );

        if rows.is_empty() {
            let msg = if session.catalog().is_empty() {
                "  The directory returned no stations for this tag"
            } else {
                "  No stations match your filter"
            };
            frame.render_widget(Paragraph::new(Span::styled(msg, style_muted())), body_area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curate_core::catalog::StationCatalog;
    use curate_core::seed::PersistedSelectionSeed;
    use ratatui::crossterm::event::{KeyModifiers, MouseEventKind};
    use ratatui::{backend::TestBackend, Terminal};

    fn session() -> CurationSession {
        let rec = |id: &str, name: &str, tags: &str, clicks: u64| StationRecord {
            stationuuid: id.into(),
            name: name.into(),
            tags: tags.into(),
            url_resolved: format!("http://{}.example/stream", id),
            clickcount: clicks,
            ..Default::default()
        };
        let catalog = StationCatalog::new(vec![
            rec("a", "Drift FM", "ambient,chill", 120),
            rec("b", "Space Noise", "ambient,drone", 50),
            rec("c", "Zero Hour", "ambient", 10),
        ]);
        CurationSession::new(catalog, PersistedSelectionSeed::default())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn draw(table: &mut StationTable, session: &CurationSession) {
        let mut terminal = Terminal::new(TestBackend::new(100, 12)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                table.draw(f, area, session);
            })
            .unwrap();
    }

    fn column_x(table: &StationTable, column: Column) -> u16 {
        table
            .columns
            .iter()
            .find(|(c, _, _)| *c == column)
            .map(|(_, x, _)| *x)
            .unwrap()
    }

    #[test]
    fn test_keys_act_on_cursor_row() {
        let s = session();
        let mut t = StationTable::new();
        assert_eq!(t.handle_key(key(KeyCode::Char('x')), &s), vec![Action::Toggle("a".into())]);
        t.handle_key(key(KeyCode::Char('j')), &s);
        assert_eq!(t.handle_key(key(KeyCode::Enter), &s), vec![Action::Preview("b".into())]);
        t.handle_key(key(KeyCode::Char('G')), &s);
        assert_eq!(t.handle_key(key(KeyCode::Char(' ')), &s), vec![Action::Toggle("c".into())]);
        t.handle_key(key(KeyCode::Char('j')), &s);
        assert_eq!(t.cursor, 2);
    }

    #[test]
    fn test_number_keys_sort() {
        let s = session();
        let mut t = StationTable::new();
        assert_eq!(
            t.handle_key(key(KeyCode::Char('2')), &s),
            vec![Action::SortBy(SortKey::Name)]
        );
        assert_eq!(
            t.handle_key(key(KeyCode::Char('4')), &s),
            vec![Action::SortBy(SortKey::Clickcount)]
        );
    }

    #[test]
    fn test_filter_mode_edits_then_closes() {
        let s = session();
        let mut t = StationTable::new();
        assert_eq!(t.handle_key(key(KeyCode::Char('/')), &s), vec![Action::OpenFilter]);
        assert!(t.is_filter_active());
        assert_eq!(
            t.handle_key(key(KeyCode::Char('d')), &s),
            vec![Action::FilterChanged("d".into())]
        );
        // first Esc clears, second closes
        assert_eq!(
            t.handle_key(key(KeyCode::Esc), &s),
            vec![Action::FilterChanged(String::new())]
        );
        assert_eq!(t.handle_key(key(KeyCode::Esc), &s), vec![Action::CloseFilter]);
        assert!(!t.is_filter_active());
    }

    #[test]
    fn test_cursor_follows_toggled_station_under_selected_sort() {
        let mut s = session();
        let mut t = StationTable::new();
        s.sort_by(SortKey::Selected);
        t.on_action(&Action::SortBy(SortKey::Selected), &s);
        t.handle_key(key(KeyCode::Char('j')), &s);

        let actions = t.handle_key(key(KeyCode::Char(' ')), &s);
        assert_eq!(actions, vec![Action::Toggle("b".into())]);
        s.toggle("b").unwrap();
        t.on_action(&actions[0], &s);
        // b now sorts first
        assert_eq!(t.cursor, 0);

        let actions = t.handle_key(key(KeyCode::Char(' ')), &s);
        assert_eq!(actions, vec![Action::Toggle("b".into())]);
        s.toggle("b").unwrap();
        t.on_action(&actions[0], &s);
        assert_eq!(s.selected_count(), 0);
        assert_eq!(t.cursor, 1);
    }

    #[test]
    fn test_cursor_follows_station_after_deselect_all() {
        let mut s = session();
        let mut t = StationTable::new();
        s.sort_by(SortKey::Selected);
        s.toggle("c").unwrap();
        t.on_action(&Action::SortBy(SortKey::Selected), &s);
        // view is c, a, b
        t.handle_key(key(KeyCode::Char('G')), &s);
        assert_eq!(t.anchor.as_deref(), Some("b"));

        s.select_all_visible();
        t.on_action(&Action::SelectAllVisible, &s);
        s.deselect_all();
        t.on_action(&Action::DeselectAll, &s);
        // back to catalog order a, b, c with the cursor still on b
        assert_eq!(t.cursor, 1);
    }

    #[test]
    fn test_mouse_header_sorts_and_cells_act() {
        let s = session();
        let mut t = StationTable::new();
        draw(&mut t, &s);

        let header_y = t.header_area.y;
        let name_x = column_x(&t, Column::Name);
        assert_eq!(
            t.handle_mouse(click(name_x, header_y), &s),
            vec![Action::SortBy(SortKey::Name)]
        );

        let first_row = t.body_area.y;
        let check_x = column_x(&t, Column::Check);
        assert_eq!(
            t.handle_mouse(click(check_x, first_row + 1), &s),
            vec![Action::Toggle("b".into())]
        );
        assert_eq!(t.cursor, 1);

        let play_x = column_x(&t, Column::Play);
        assert_eq!(
            t.handle_mouse(click(play_x, first_row), &s),
            vec![Action::Preview("a".into())]
        );

        // below the last row
        assert!(t.handle_mouse(click(name_x, first_row + 5), &s).is_empty());
    }

    #[test]
    fn test_cursor_follows_record_after_sort() {
        let mut s = session();
        let mut t = StationTable::new();
        t.handle_key(key(KeyCode::Char('j')), &s);
        draw(&mut t, &s);
        assert_eq!(t.anchor.as_deref(), Some("b"));

        s.sort_by(SortKey::Clickcount);
        t.on_action(&Action::SortBy(SortKey::Clickcount), &s);
        // ascending now: c, b, a
        assert_eq!(t.cursor, 1);

        s.set_filter("zero");
        t.on_action(&Action::FilterChanged("zero".into()), &s);
        assert_eq!(t.cursor, 0);
    }
}
