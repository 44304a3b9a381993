//! Component trait: the interface every panel implements.
//!
//! Components own their UI-only state (cursor, scroll, input buffer) and read
//! the session by shared reference.  They never mutate the session; they
//! return `Vec<Action>` and the App applies those in order.

use curate_core::session::CurationSession;
use ratatui::crossterm::event::{KeyEvent, MouseEvent};
use ratatui::{layout::Rect, Frame};

use crate::action::Action;

pub trait Component {
    /// Handle a key event routed to this component.
    fn handle_key(&mut self, key: KeyEvent, session: &CurationSession) -> Vec<Action>;

    /// Handle a mouse event that landed inside the component's last drawn area.
    fn handle_mouse(&mut self, event: MouseEvent, session: &CurationSession) -> Vec<Action>;

    /// React to an action after the App has applied it.
    fn on_action(&mut self, _action: &Action, _session: &CurationSession) {}

    fn draw(&mut self, frame: &mut Frame, area: Rect, session: &CurationSession);
}
