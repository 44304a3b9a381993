//! App: the curation event loop.
//!
//! - `App` owns the `CurationSession` and every component.
//! - Terminal input arrives as `AppMessage`s over a `tokio::mpsc` channel;
//!   preview failures arrive from the mpv worker on a second channel.
//! - Components return `Vec<Action>`; `dispatch` applies each one to the
//!   session, then lets the components react.
//! - Preview commands flow out to the mpv worker through `preview_tx`.

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

use curate_core::preview::{PreviewCommand, StreamToken};
use curate_core::session::CurationSession;
use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent,
    },
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    action::Action,
    component::Component,
    components::{help_overlay::HelpOverlay, station_table::StationTable},
    mpv,
    theme::{C_BG, C_PRIMARY, C_SECONDARY, C_SEPARATOR, C_TAG},
    widgets::{
        status_bar::{self, InputMode},
        toast::ToastManager,
    },
};

/// Leave raw mode and the alternate screen.  Safe to call more than once.
fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture, cursor::Show)
}

/// With `panic = 'abort'` no destructor runs, so the hook has to kill the
/// mpv child and put the terminal back before the panic message prints.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        mpv::kill_orphan();
        let _ = restore_terminal();
        original_hook(info);
    }));
}

/// Resolves on SIGTERM or SIGHUP.  Ctrl-C is a key event in raw mode and is
/// handled by the key map.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut term, mut hup) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(term), Ok(hup)) => (term, hup),
        (Err(e), _) | (_, Err(e)) => {
            warn!("cannot install signal handlers: {}", e);
            return std::future::pending().await;
        }
    };
    tokio::select! {
        _ = term.recv() => debug!("SIGTERM"),
        _ = hup.recv() => debug!("SIGHUP"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    std::future::pending::<()>().await
}

enum AppMessage {
    Event(Event),
    PreviewFailed(StreamToken, String),
}

pub struct App {
    session: CurationSession,
    table: StationTable,
    help: HelpOverlay,
    toast: ToastManager,
    input_mode: InputMode,
    tag: String,
    export_path: PathBuf,
    volume: f32,
    startup_notice: Option<String>,
    preview_tx: Option<mpsc::Sender<PreviewCommand>>,
    table_area: Rect,
    should_quit: bool,
}

impl App {
    pub fn new(
        session: CurationSession,
        tag: String,
        export_path: PathBuf,
        volume: f32,
        startup_notice: Option<String>,
    ) -> Self {
        Self {
            session,
            table: StationTable::new(),
            help: HelpOverlay::new(),
            toast: ToastManager::new(),
            input_mode: InputMode::Normal,
            tag,
            export_path,
            volume,
            startup_notice,
            preview_tx: None,
            table_area: Rect::default(),
            should_quit: false,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        install_panic_hook();
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        let (preview_tx, preview_rx) = mpsc::channel::<PreviewCommand>(32);
        let (failure_tx, failure_rx) = mpsc::channel::<(StreamToken, String)>(32);
        let worker = tokio::spawn(mpv::run_preview(preview_rx, failure_tx, self.volume));
        self.preview_tx = Some(preview_tx);

        let result = self.event_loop(&mut terminal, failure_rx).await;

        // ── Teardown ──────────────────────────────────────────────────────────
        let stop = self.session.shutdown_preview();
        self.send_preview(stop).await;
        self.preview_tx = None;
        if tokio::time::timeout(Duration::from_secs(3), worker).await.is_err() {
            warn!("preview worker did not stop in time");
        }

        drop(terminal);
        restore_terminal()?;
        info!("session closed");

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        mut failure_rx: mpsc::Receiver<(StreamToken, String)>,
    ) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        // Polls so the thread notices the receiver is gone after quit.
        tokio::task::spawn_blocking(move || loop {
            if tx.is_closed() {
                break;
            }
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if tx.blocking_send(AppMessage::Event(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                Ok(false) => {}
                Err(_) => break,
            }
        });

        if let Some(notice) = self.startup_notice.take() {
            self.toast.warning(notice);
        }

        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
                needs_redraw = false;
            }

            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(msg) => {
                        self.handle_message(msg).await;
                        needs_redraw = true;
                    }
                    None => {
                        warn!("terminal input closed");
                        self.should_quit = true;
                    }
                },
                Some((token, reason)) = failure_rx.recv() => {
                    self.handle_message(AppMessage::PreviewFailed(token, reason)).await;
                    needs_redraw = true;
                }
                _ = &mut shutdown => {
                    info!("termination signal received, shutting down");
                    self.should_quit = true;
                }
                _ = toast_tick.tick() => {
                    if !self.toast.is_empty() && self.toast.tick() {
                        needs_redraw = true;
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(Event::Key(key)) => self.handle_key(key).await,
            AppMessage::Event(Event::Mouse(mouse)) => self.handle_mouse(mouse).await,
            AppMessage::Event(_) => {}
            AppMessage::PreviewFailed(token, reason) => {
                if let Some(err) = self.session.on_preview_failure(token, &reason) {
                    warn!("preview failed: {}", err);
                    self.toast.error(err.to_string());
                }
            }
        }
    }

    // ── Input routing ─────────────────────────────────────────────────────────

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.dispatch(Action::Quit).await;
            return;
        }

        let actions = if self.help.visible {
            self.help.handle_key(key, &self.session)
        } else if self.table.is_filter_active() {
            self.table.handle_key(key, &self.session)
        } else {
            match key.code {
                KeyCode::Char('q') => vec![Action::Quit],
                KeyCode::Char('?') => vec![Action::ToggleHelp],
                KeyCode::Char('e') => vec![Action::Export],
                _ => self.table.handle_key(key, &self.session),
            }
        };
        for action in actions {
            self.dispatch(action).await;
        }
    }

    async fn handle_mouse(&mut self, mouse: MouseEvent) {
        let actions = if self.help.visible {
            self.help.handle_mouse(mouse, &self.session)
        } else if self
            .table_area
            .contains(Position::new(mouse.column, mouse.row))
        {
            self.table.handle_mouse(mouse, &self.session)
        } else {
            vec![]
        };
        for action in actions {
            self.dispatch(action).await;
        }
    }

    // ── Action dispatch ───────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        debug!("dispatch: {:?}", action);
        match &action {
            Action::Toggle(id) => {
                if let Err(e) = self.session.toggle(id) {
                    warn!("toggle: {}", e);
                    self.toast.error(e.to_string());
                }
            }
            Action::SelectAllVisible => {
                let added = self.session.select_all_visible();
                self.toast.info(format!("selected {} more station(s)", added));
            }
            Action::DeselectAll => {
                self.session.deselect_all();
                self.toast.info("selection cleared");
            }
            Action::Preview(id) => match self.session.play(id) {
                Ok(cmds) => self.send_preview(cmds).await,
                Err(e) => {
                    warn!("preview: {}", e);
                    self.toast.error(e.to_string());
                }
            },
            Action::SortBy(key) => self.session.sort_by(*key),
            Action::OpenFilter => self.input_mode = InputMode::Filter,
            Action::CloseFilter => self.input_mode = InputMode::Normal,
            Action::FilterChanged(text) => self.session.set_filter(text.clone()),
            Action::Export => self.export(),
            Action::ToggleHelp => {}
            Action::Quit => self.should_quit = true,
        }

        self.table.on_action(&action, &self.session);
        self.help.on_action(&action, &self.session);
    }

    fn export(&mut self) {
        match self.session.export_to(&self.export_path) {
            Ok(0) => self.toast.warning(format!(
                "nothing selected: wrote an empty list to {}",
                self.export_path.display()
            )),
            Ok(n) => self.toast.success(format!(
                "exported {} station(s) to {}",
                n,
                self.export_path.display()
            )),
            Err(e) => {
                warn!("{}", e);
                self.toast.error(e.to_string());
            }
        }
    }

    async fn send_preview(&mut self, cmds: Vec<PreviewCommand>) {
        let Some(tx) = &self.preview_tx else {
            return;
        };
        for cmd in cmds {
            if tx.send(cmd).await.is_err() {
                warn!("preview worker is gone");
                break;
            }
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let [header, body, status, keys] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        self.draw_header(frame, header);
        self.table_area = body;
        self.table.draw(frame, body, &self.session);
        status_bar::draw_status_line(frame, status, &self.session);
        status_bar::draw_keys_bar(frame, keys, self.input_mode);
        self.toast.draw(frame, area);
        self.help.draw(frame, area, &self.session);
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let sep = Span::styled("  ·  ", Style::default().fg(C_SEPARATOR));
        let line = Line::from(vec![
            Span::styled(
                " station curate",
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            ),
            sep.clone(),
            Span::styled("tag ", Style::default().fg(C_SECONDARY)),
            Span::styled(self.tag.as_str(), Style::default().fg(C_TAG)),
            sep,
            Span::styled(
                format!("{} stations", self.session.catalog().len()),
                Style::default().fg(C_SECONDARY),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}
