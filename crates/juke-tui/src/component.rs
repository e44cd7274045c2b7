//! Component trait — the interface every UI panel implements.
//!
//! - Components own only UI-local state (selection, input text).
//! - Server data comes from `AppState`, borrowed for the duration of a call.
//! - Components produce `Vec<Action>`; the App event loop carries them out.
//! - `draw` may fail; the fault boundary around the tree catches it.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::fault::RenderError;

pub trait Component {
    fn id(&self) -> ComponentId;

    /// Handle a key while this component has focus.
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action>;

    fn draw(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        focused: bool,
        state: &AppState,
    ) -> Result<(), RenderError>;
}
