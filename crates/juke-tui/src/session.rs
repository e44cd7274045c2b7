//! SyncSession — everything that lives while the main view is mounted.
//!
//! Mounting opens the command channel, starts the poll scheduler and
//! attaches a store.  `shutdown` tears all of it down in one place.  Events
//! from a channel other than the current one (an earlier connection that is
//! still draining) are ignored.

use std::time::Duration;

use juke_proto::config::Config;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::channel::{ChannelEvent, ChannelEventKind, CommandChannel, ConnectionState};
use crate::scheduler::PollScheduler;
use crate::store::{Store, Subscription, ViewModel};

pub struct SyncSession {
    store: Store,
    channel: CommandChannel,
    scheduler: PollScheduler,
    transitions: Option<Subscription>,
}

impl SyncSession {
    pub fn mount(config: &Config, events: mpsc::UnboundedSender<ChannelEvent>) -> Self {
        Self::mount_with(
            Store::new(),
            config.server.ws_url(),
            config.sync.poll_interval(),
            events,
        )
    }

    /// Mount on top of an existing store, e.g. to keep the queue on screen
    /// across a reconnect.
    pub fn mount_with(
        mut store: Store,
        url: impl Into<String>,
        poll_interval: Duration,
        events: mpsc::UnboundedSender<ChannelEvent>,
    ) -> Self {
        let channel = CommandChannel::open(url, events);
        let handle = channel.handle();
        let scheduler = PollScheduler::start(poll_interval, move || handle.refresh());

        store.reset_sequences();
        store.apply_connection_state(ConnectionState::Unknown);
        let channel_id = channel.id();
        let mut last = ConnectionState::Unknown;
        let transitions = store.subscribe(move |view| {
            if view.connection != last {
                info!("channel {} is {}", channel_id, view.connection.label());
                last = view.connection;
            }
        });

        Self {
            store,
            channel,
            scheduler,
            transitions: Some(transitions),
        }
    }

    #[cfg(test)]
    pub fn channel_id(&self) -> u64 {
        self.channel.id()
    }

    pub fn view(&self) -> &ViewModel {
        self.store.view()
    }

    #[cfg(test)]
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    #[cfg(test)]
    pub fn connection(&self) -> ConnectionState {
        self.store.view().connection
    }

    /// Ask for status and queue now instead of waiting for the next tick.
    pub fn refresh(&self) {
        self.channel.handle().refresh();
    }

    /// Apply one channel event.  Returns `true` if the view changed.
    pub fn handle_event(&mut self, event: ChannelEvent) -> bool {
        if event.channel != self.channel.id() {
            debug!(
                "ignoring event from channel {} (current {})",
                event.channel,
                self.channel.id()
            );
            return false;
        }
        match event.kind {
            ChannelEventKind::State(state) => {
                self.store.apply_connection_state(state);
                true
            }
            ChannelEventKind::Payload { seq, payload } => self.store.apply_payload(seq, payload),
        }
    }

    pub fn shutdown(&mut self) {
        self.scheduler.stop();
        self.channel.close();
        if let Some(sub) = self.transitions.take() {
            self.store.unsubscribe(sub);
        }
    }

    /// Shut down and hand back the store.
    pub fn into_store(mut self) -> Store {
        self.shutdown();
        self.store
    }
}
