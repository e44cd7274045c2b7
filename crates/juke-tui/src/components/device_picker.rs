//! DevicePicker — shown while the server has no playback device.
//!
//! The App refreshes the device list on every poll tick while the picker is
//! visible; the picker only keeps the latest list and the cursor.

use juke_proto::protocol::DeviceList;
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::Span,
    widgets::{List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::fault::RenderError;
use crate::theme::{style_default, style_muted, style_secondary, style_selected_focused};
use crate::widgets::pane_chrome::pane_chrome;

const NO_DEVICES: &str =
    "No active devices - ensure a desktop Spotify client is running and online";

#[derive(Default)]
pub struct DevicePicker {
    devices: Option<DeviceList>,
    list_state: ListState,
}

impl DevicePicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_devices(&mut self, devices: DeviceList) {
        let len = devices.items.len();
        self.devices = Some(devices);
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            None => self.list_state.select(Some(0)),
            Some(_) => {}
        }
    }

    /// Forget the list; the next time the picker shows it starts fresh.
    pub fn reset(&mut self) {
        self.devices = None;
        self.list_state = ListState::default();
    }
}

impl Component for DevicePicker {
    fn id(&self) -> ComponentId {
        ComponentId::Devices
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        let len = self.devices.as_ref().map_or(0, |d| d.items.len());
        if len == 0 {
            return vec![];
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.list_state.select_previous();
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.list_state.selected().map_or(true, |i| i + 1 < len) {
                    self.list_state.select_next();
                }
                vec![]
            }
            KeyCode::Enter => self
                .list_state
                .selected()
                .and_then(|i| self.devices.as_ref()?.items.get(i))
                .map(|d| vec![Action::SelectDevice(d.id.clone())])
                .unwrap_or_default(),
            _ => vec![],
        }
    }

    fn draw(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        focused: bool,
        _state: &AppState,
    ) -> Result<(), RenderError> {
        let block = pane_chrome("Select a playback device", focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(devices) = self.devices.as_ref() else {
            frame.render_widget(
                Paragraph::new(Span::styled("Looking for devices...", style_muted())),
                inner,
            );
            return Ok(());
        };
        if devices.items.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(NO_DEVICES, style_secondary())).wrap(Wrap { trim: true }),
                inner,
            );
            return Ok(());
        }

        let [body, footer] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);
        let items: Vec<ListItem> = devices
            .items
            .iter()
            .map(|d| ListItem::new(Span::styled(d.name.as_str(), style_default())))
            .collect();
        let list = List::new(items).highlight_style(if focused {
            style_selected_focused()
        } else {
            Style::default()
        });
        frame.render_stateful_widget(list, body, &mut self.list_state);
        frame.render_widget(
            Paragraph::new(Span::styled("Enter select", style_muted())),
            footer,
        );
        Ok(())
    }
}
