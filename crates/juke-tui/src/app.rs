//! App — terminal setup, the event loop and action handling.
//!
//! Everything that changes state arrives as an `AppMessage` on one queue:
//! terminal input, channel events, and the results of spawned HTTP
//! requests.  The loop applies them one at a time, so the store and the
//! panels are only ever touched from here.

use std::future::Future;
use std::io;
use std::time::{Duration, Instant};

use juke_proto::config::Config;
use juke_proto::protocol::{DeviceList, PlayerState, SearchResults};
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    text::Span,
    widgets::Paragraph,
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::action::{Action, ComponentId, ConfirmKind};
use crate::app_state::AppState;
use crate::channel::{ChannelEvent, ConnectionState};
use crate::component::Component;
use crate::components::{
    device_picker::DevicePicker, playback::PlaybackPanel, search_panel::SearchPanel,
    upcoming::UpcomingList,
};
use crate::dispatcher::{DispatchError, DispatchResult, Dispatcher};
use crate::fault::{FaultBoundary, RenderError};
use crate::focus::FocusRing;
use crate::intent::PlayIntent;
use crate::keys::KeyListeners;
use crate::search::{SearchSession, SearchTicket};
use crate::session::SyncSession;
use crate::store::ViewModel;
use crate::theme::{style_error, style_muted};
use crate::widgets::{
    confirm::{ConfirmOutcome, ConfirmPrompt},
    status_bar::{self, InputMode},
    toast::ToastManager,
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    Channel(ChannelEvent),
    /// A request whose body does not matter finished.
    Dispatched(&'static str, DispatchResult<()>),
    SearchDone(SearchTicket, DispatchResult<SearchResults>),
    Requested(String, DispatchResult<()>),
    Devices(DispatchResult<DeviceList>),
}

const UI_TICK: Duration = Duration::from_millis(200);

struct Panels {
    playback: PlaybackPanel,
    upcoming: UpcomingList,
    search: SearchPanel,
    devices: DevicePicker,
}

pub struct App {
    config: Config,
    dispatcher: Dispatcher,
    session: Option<SyncSession>,
    keys: KeyListeners,
    fault: FaultBoundary,
    focus: FocusRing,
    panels: Panels,
    confirm: Option<ConfirmPrompt>,
    toasts: ToastManager,
    intent: PlayIntent,
    tx: mpsc::Sender<AppMessage>,
    rx: Option<mpsc::Receiver<AppMessage>>,
    channel_tx: mpsc::UnboundedSender<ChannelEvent>,
    channel_rx: Option<mpsc::UnboundedReceiver<ChannelEvent>>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let dispatcher = Dispatcher::new(config.server.http_base(), config.http.request_timeout())?;
        let (tx, rx) = mpsc::channel(1024);
        let (channel_tx, channel_rx) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            dispatcher,
            session: None,
            keys: KeyListeners::new(),
            fault: FaultBoundary::new(),
            focus: FocusRing::new(vec![ComponentId::Playback, ComponentId::Upcoming]),
            panels: Panels {
                playback: PlaybackPanel::new(),
                upcoming: UpcomingList::new(),
                search: SearchPanel::new(),
                devices: DevicePicker::new(),
            },
            confirm: None,
            toasts: ToastManager::new(),
            intent: PlayIntent::default(),
            tx,
            rx: Some(rx),
            channel_tx,
            channel_rx: Some(channel_rx),
            should_quit: false,
        })
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let (Some(mut rx), Some(mut channel_rx)) = (self.rx.take(), self.channel_rx.take()) else {
            anyhow::bail!("app is already running");
        };

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("terminal ready, size={:?}", terminal.size());

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = self.tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: channel events → AppMessage ──────────────────────
        let ch_tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(ev) = channel_rx.recv().await {
                if ch_tx.send(AppMessage::Channel(ev)).await.is_err() {
                    break;
                }
            }
        });

        self.session = Some(SyncSession::mount(&self.config, self.channel_tx.clone()));
        info!("connecting to {}", self.config.server.ws_url());

        // ── Periodic timers ───────────────────────────────────────────────────
        let mut ui_tick = tokio::time::interval(UI_TICK);
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut device_poll = tokio::time::interval(self.config.sync.poll_interval());
        device_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    self.handle_message(msg);
                    // Drain whatever else is queued before drawing again.
                    while let Ok(next) = rx.try_recv() {
                        self.handle_message(next);
                    }
                    needs_redraw = true;
                }

                _ = ui_tick.tick() => {
                    let now = Instant::now();
                    self.toasts.tick(now);
                    self.intent.tick(now);
                    needs_redraw = true;
                }

                _ = device_poll.tick() => {
                    if self.needs_device() {
                        let d = self.dispatcher.clone();
                        let tx = self.tx.clone();
                        tokio::spawn(async move {
                            let result = d.list_devices().await;
                            let _ = tx.send(AppMessage::Devices(result)).await;
                        });
                    }
                    needs_redraw = false;
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        if let Some(session) = self.session.as_mut() {
            session.shutdown();
        }
        self.panels.search.close();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        info!("bye");
        Ok(())
    }

    fn view(&self) -> Option<&ViewModel> {
        self.session.as_ref().map(|s| s.view())
    }

    fn reported_state(&self) -> Option<PlayerState> {
        self.view()?.status.as_ref().map(|s| s.state)
    }

    fn needs_device(&self) -> bool {
        self.reported_state() == Some(PlayerState::NoDevice)
    }

    fn is_disconnected(&self) -> bool {
        self.view().is_some_and(|v| v.is_disconnected())
    }

    /// Recompute which panels can take focus.
    fn sync_focus(&mut self) {
        let mut items = vec![ComponentId::Playback, ComponentId::Upcoming];
        if self.panels.search.is_open() {
            items.insert(0, ComponentId::Search);
        } else if self.needs_device() {
            items.insert(0, ComponentId::Devices);
        }
        self.focus.set_items(items);
    }

    // ── Message handler ───────────────────────────────────────────────────────

    fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return;
                }
                for action in self.handle_key(key) {
                    self.apply(action);
                }
            }
            AppMessage::Event(_) => {}

            AppMessage::Channel(ev) => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                if session.handle_event(ev) {
                    if let Some(status) = session.view().status.as_ref() {
                        self.intent.on_status(status.state);
                    }
                    if !self.needs_device() {
                        self.panels.devices.reset();
                    }
                }
            }

            AppMessage::Dispatched(what, result) => match result {
                Ok(()) => {
                    debug!("{} ok", what);
                    if let Some(session) = self.session.as_ref() {
                        session.refresh();
                    }
                }
                Err(DispatchError::InFlight(path)) => {
                    debug!("{} still in flight", path);
                    self.toasts.warning(format!("Still waiting on {}", what));
                }
                Err(e) => {
                    warn!("{} failed: {}", what, e);
                    if matches!(what, "pause" | "resume") {
                        self.intent.abandon();
                    }
                    self.toasts.error(format!("{} failed: {}", what, e));
                }
            },

            AppMessage::SearchDone(ticket, result) => {
                apply_search_result(&mut self.panels.search, &ticket, result);
            }

            AppMessage::Requested(uri, result) => {
                let ok = result.is_ok();
                match &result {
                    Ok(()) => info!("requested {}", uri),
                    Err(e) => warn!("request {} failed: {}", uri, e),
                }
                if let Some(search) = self.panels.search.session_mut() {
                    search.on_requested(&uri, result);
                }
                if ok {
                    self.toasts.success("Song requested");
                    if let Some(session) = self.session.as_ref() {
                        session.refresh();
                    }
                }
                self.panels.search.reap();
            }

            AppMessage::Devices(result) => match result {
                Ok(devices) => self.panels.devices.set_devices(devices),
                Err(DispatchError::InFlight(_)) => {}
                Err(e) => warn!("device list failed: {}", e),
            },
        }
        self.sync_focus();
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![Action::Quit];
        }

        if let Some(prompt) = self.confirm.as_ref() {
            match prompt.handle_key(key) {
                ConfirmOutcome::Open => {}
                ConfirmOutcome::Declined => self.confirm = None,
                ConfirmOutcome::Granted(kind, confirmation) => {
                    self.confirm = None;
                    let d = self.dispatcher.clone();
                    match kind {
                        ConfirmKind::ClearDevice => {
                            self.spawn_dispatch("clear device", async move {
                                d.clear_device(confirmation).await
                            })
                        }
                        ConfirmKind::LogOut => {
                            self.spawn_dispatch("log out", async move { d.log_out(confirmation).await })
                        }
                    }
                }
            }
            return vec![];
        }

        if self.fault.is_faulted() {
            return match key.code {
                KeyCode::Char('c') => vec![Action::ClearFault],
                KeyCode::Char('q') => vec![Action::Quit],
                _ => vec![],
            };
        }

        if let Some(action) = self.keys.dispatch(&key) {
            return vec![action];
        }

        let empty = ViewModel::default();
        let view = self.session.as_ref().map_or(&empty, |s| s.view());
        let state = AppState::new(view, self.intent, Instant::now());

        let focused = self.focus.current();
        if focused == Some(ComponentId::Search)
            && !matches!(key.code, KeyCode::Tab | KeyCode::BackTab)
        {
            return self.panels.search.handle_key(key, &state);
        }

        match key.code {
            KeyCode::Char('q') => return vec![Action::Quit],
            KeyCode::Tab => return vec![Action::FocusNext],
            KeyCode::BackTab => return vec![Action::FocusPrev],
            KeyCode::Char('r') if view.is_disconnected() => return vec![Action::Reconnect],
            KeyCode::Char('a') => return vec![Action::OpenSearch],
            KeyCode::Char(' ') => return vec![Action::TogglePause],
            KeyCode::Char('n') => return vec![Action::Skip],
            KeyCode::Char('D') => return vec![Action::Confirm(ConfirmKind::ClearDevice)],
            KeyCode::Char('X') => return vec![Action::Confirm(ConfirmKind::LogOut)],
            _ => {}
        }

        match focused {
            Some(ComponentId::Playback) => self.panels.playback.handle_key(key, &state),
            Some(ComponentId::Upcoming) => self.panels.upcoming.handle_key(key, &state),
            Some(ComponentId::Devices) => self.panels.devices.handle_key(key, &state),
            Some(ComponentId::Search) | None => vec![],
        }
    }

    // ── Action dispatch ───────────────────────────────────────────────────────

    /// Run `request` in the background and report it back as `Dispatched`.
    fn spawn_dispatch<F>(&self, what: &'static str, request: F)
    where
        F: Future<Output = DispatchResult<()>> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = request.await;
            let _ = tx.send(AppMessage::Dispatched(what, result)).await;
        });
    }

    fn request_play_state(&mut self, wanted: PlayerState) {
        let Some(reported) = self.reported_state() else {
            return;
        };
        if !reported.has_song() {
            self.toasts.info("Nothing is playing");
            return;
        }
        self.intent.request(wanted, reported, Instant::now());
        let d = self.dispatcher.clone();
        match wanted {
            PlayerState::Paused => self.spawn_dispatch("pause", async move { d.pause().await }),
            _ => self.spawn_dispatch("resume", async move { d.resume().await }),
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Resume => self.request_play_state(PlayerState::Playing),
            Action::Pause => self.request_play_state(PlayerState::Paused),
            Action::TogglePause => {
                let shown = self.reported_state().map(|s| self.intent.shown(s));
                if shown == Some(PlayerState::Playing) {
                    self.request_play_state(PlayerState::Paused);
                } else {
                    self.request_play_state(PlayerState::Playing);
                }
            }
            Action::Skip => {
                let d = self.dispatcher.clone();
                self.spawn_dispatch("skip", async move { d.skip().await });
            }

            Action::OpenSearch => {
                if !self.panels.search.is_open() {
                    let session = SearchSession::open(self.config.search.min_query_len, &self.keys);
                    self.panels.search.open(session);
                }
                self.sync_focus();
                self.focus.set(ComponentId::Search);
            }
            Action::CloseSearch => {
                self.panels.search.close();
                self.sync_focus();
            }
            Action::RunSearch(ticket) => {
                let d = self.dispatcher.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = d.search_track(ticket.query()).await;
                    let _ = tx.send(AppMessage::SearchDone(ticket, result)).await;
                });
            }
            Action::RequestTrack(uri) => {
                let d = self.dispatcher.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = d.request_track(&uri).await;
                    let _ = tx.send(AppMessage::Requested(uri, result)).await;
                });
            }

            Action::SelectDevice(id) => {
                let d = self.dispatcher.clone();
                self.spawn_dispatch("select device", async move { d.select_device(&id).await });
            }
            Action::Confirm(kind) => self.confirm = Some(ConfirmPrompt::new(kind)),

            Action::FocusNext => {
                self.focus.next();
            }
            Action::FocusPrev => {
                self.focus.prev();
            }

            Action::ClearFault => self.fault.clear(),
            Action::Reconnect => self.reconnect(),
            Action::Quit => self.should_quit = true,
        }
    }

    /// Replace a dead session with a fresh one on a new channel.  The store
    /// (and with it the last known queue) carries over.
    fn reconnect(&mut self) {
        if !self.is_disconnected() {
            return;
        }
        let Some(old) = self.session.take() else {
            return;
        };
        info!("reconnecting to {}", self.config.server.ws_url());
        self.intent.abandon();
        self.session = Some(SyncSession::mount_with(
            old.into_store(),
            self.config.server.ws_url(),
            self.config.sync.poll_interval(),
            self.channel_tx.clone(),
        ));
    }

    // ── Draw ──────────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let [main, bar] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());

        let empty = ViewModel::default();
        let view = self.session.as_ref().map_or(&empty, |s| s.view());
        let state = AppState::new(view, self.intent, Instant::now());

        let mode = if self.confirm.is_some() {
            InputMode::Confirm
        } else if self.fault.is_faulted() {
            InputMode::Fault
        } else if self.focus.is_focused(ComponentId::Search) {
            InputMode::Search
        } else {
            InputMode::Normal
        };

        let panels = &mut self.panels;
        let focus = &self.focus;
        self.fault
            .render(frame, main, "main view", |f, area| draw_tree(f, area, panels, focus, &state));

        if let Some(prompt) = self.confirm.as_ref() {
            prompt.draw(frame, main);
        }
        self.toasts.draw(frame, main);
        status_bar::draw_status_bar(frame, bar, mode, view.connection);
    }
}

fn notice(frame: &mut Frame, area: Rect, text: &str, error: bool) {
    let style = if error { style_error() } else { style_muted() };
    frame.render_widget(Paragraph::new(Span::styled(text.to_string(), style)), area);
}

fn draw_tree(
    frame: &mut Frame,
    area: Rect,
    panels: &mut Panels,
    focus: &FocusRing,
    state: &AppState,
) -> Result<(), RenderError> {
    if state.connection() == ConnectionState::Disconnected {
        notice(frame, area, "[Lost connection to server. Press r to reconnect]", true);
        return Ok(());
    }
    if state.status().is_none() && state.queue().is_none() {
        notice(frame, area, "[Waiting for data]", false);
        return Ok(());
    }
    if state.shown_state() == Some(PlayerState::NoAuth) {
        notice(frame, area, "[Need authentication! Host must log in]", true);
        return Ok(());
    }

    let needs_device = state.status().map(|s| s.state) == Some(PlayerState::NoDevice);
    let side = panels.search.is_open() || needs_device;
    let [left, right] = if side {
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area)
    } else {
        [area, Rect::default()]
    };
    let [top, bottom] = Layout::vertical([Constraint::Length(6), Constraint::Min(0)]).areas(left);

    draw_panel(frame, top, &mut panels.playback, focus, state)?;
    draw_panel(frame, bottom, &mut panels.upcoming, focus, state)?;
    if panels.search.is_open() {
        draw_panel(frame, right, &mut panels.search, focus, state)?;
    } else if needs_device {
        draw_panel(frame, right, &mut panels.devices, focus, state)?;
    }
    Ok(())
}

fn draw_panel(
    frame: &mut Frame,
    area: Rect,
    panel: &mut dyn Component,
    focus: &FocusRing,
    state: &AppState,
) -> Result<(), RenderError> {
    let focused = focus.is_focused(panel.id());
    panel.draw(frame, area, focused, state)
}

/// Hand a search answer to the open session.  A refusal because the same
/// search is already out is not an answer; the earlier request's is.
fn apply_search_result(
    panel: &mut SearchPanel,
    ticket: &SearchTicket,
    result: DispatchResult<SearchResults>,
) -> bool {
    match &result {
        Err(DispatchError::InFlight(_)) => {
            debug!("search {:?} already in flight", ticket.query());
            return false;
        }
        Err(e) => warn!("search {:?} failed: {}", ticket.query(), e),
        Ok(_) => {}
    }
    panel
        .session_mut()
        .is_some_and(|search| search.on_results(ticket, result))
}
