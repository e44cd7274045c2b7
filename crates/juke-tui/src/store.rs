//! Store — the single owner of the client's view of server state.
//!
//! Components never hold on to server data; they read a `ViewModel` borrowed
//! from here on every draw.  All mutation happens on the app event loop, in
//! the order events arrive from the channel.

use juke_proto::protocol::{Payload, PlaybackStatus, Queue};
use tracing::{debug, trace};

use crate::channel::ConnectionState;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewModel {
    pub connection: ConnectionState,
    /// `None` until the first status arrives, and again after a disconnect.
    pub status: Option<PlaybackStatus>,
    /// `None` until the first queue arrives.
    pub queue: Option<Queue>,
}

impl ViewModel {
    pub fn is_disconnected(&self) -> bool {
        self.connection == ConnectionState::Disconnected
    }
}

/// Returned by [`Store::subscribe`]; hand it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(&ViewModel)>;

#[derive(Default)]
pub struct Store {
    view: ViewModel,
    listeners: Vec<(Subscription, Listener)>,
    next_subscription: u64,
    // Highest sequence applied per field; older payloads are stale.
    status_seq: u64,
    queue_seq: u64,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &ViewModel {
        &self.view
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> ViewModel {
        self.view.clone()
    }

    /// Replace the status wholesale and notify.
    pub fn apply_status(&mut self, status: PlaybackStatus) {
        trace!("store: status {:?}", status.state);
        self.view.status = Some(status);
        self.notify();
    }

    /// Replace the queue wholesale and notify.
    pub fn apply_queue(&mut self, queue: Queue) {
        trace!("store: queue with {} songs", queue.len());
        self.view.queue = Some(queue);
        self.notify();
    }

    /// Record a connection transition.  Losing the connection drops the
    /// status (progress would go stale); the queue is kept.
    pub fn apply_connection_state(&mut self, state: ConnectionState) {
        if self.view.connection != state {
            debug!(
                "store: connection {} -> {}",
                self.view.connection.label(),
                state.label()
            );
        }
        self.view.connection = state;
        if state == ConnectionState::Disconnected {
            self.view.status = None;
        }
        self.notify();
    }

    /// Apply a sequenced channel payload.  Returns `false` and changes
    /// nothing when a newer payload of the same kind was already applied.
    pub fn apply_payload(&mut self, seq: u64, payload: Payload) -> bool {
        match payload {
            Payload::Status(status) => {
                if seq <= self.status_seq {
                    debug!("store: stale status #{} (have #{})", seq, self.status_seq);
                    return false;
                }
                self.status_seq = seq;
                self.apply_status(status);
            }
            Payload::Queue(queue) => {
                if seq <= self.queue_seq {
                    debug!("store: stale queue #{} (have #{})", seq, self.queue_seq);
                    return false;
                }
                self.queue_seq = seq;
                self.apply_queue(queue);
            }
        }
        true
    }

    /// Forget applied sequence numbers.  A new channel counts from one again.
    pub fn reset_sequences(&mut self) {
        self.status_seq = 0;
        self.queue_seq = 0;
    }

    /// Register a listener.  It is called synchronously after every applied
    /// update with the new view.
    pub fn subscribe(&mut self, listener: impl FnMut(&ViewModel) + 'static) -> Subscription {
        self.next_subscription += 1;
        let sub = Subscription(self.next_subscription);
        self.listeners.push((sub, Box::new(listener)));
        sub
    }

    pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(s, _)| *s != sub);
        self.listeners.len() != before
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&mut self) {
        let view = &self.view;
        for (_, listener) in self.listeners.iter_mut() {
            listener(view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use juke_proto::protocol::{PlayerState, Song};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn song(title: &str) -> Song {
        Song {
            spotify_uri: format!("spotify:track:{}", title),
            title: title.to_string(),
            artist: "Someone".to_string(),
            album_image_url: None,
            duration_ms: 200_000,
        }
    }

    fn status(state: PlayerState, progress: u32) -> PlaybackStatus {
        PlaybackStatus {
            state,
            song: Some(song("now")),
            progress_ms: Some(progress),
        }
    }

    fn queue(titles: &[&str]) -> Queue {
        Queue {
            songs: titles
                .iter()
                .map(|t| (format!("spotify:track:{}", t), song(t)))
                .collect(),
        }
    }

    fn recording(store: &mut Store) -> Rc<RefCell<Vec<ViewModel>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(move |view| sink.borrow_mut().push(view.clone()));
        seen
    }

    #[test]
    fn test_same_status_twice_is_idempotent() {
        let mut store = Store::new();
        let seen = recording(&mut store);

        store.apply_status(status(PlayerState::Playing, 1000));
        let first = store.snapshot();
        store.apply_status(status(PlayerState::Playing, 1000));
        let second = store.snapshot();

        assert_eq!(first, second);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
    }

    #[test]
    fn test_queue_does_not_touch_status() {
        let mut store = Store::new();
        store.apply_queue(queue(&["a"]));
        store.apply_status(status(PlayerState::Paused, 42));
        store.apply_queue(queue(&["b", "c"]));

        let view = store.snapshot();
        assert_eq!(view.status, Some(status(PlayerState::Paused, 42)));
        assert_eq!(view.queue.map(|q| q.len()), Some(2));
    }

    #[test]
    fn test_disconnect_clears_status_keeps_queue() {
        let mut store = Store::new();
        store.apply_connection_state(ConnectionState::Connected);
        store.apply_status(status(PlayerState::Playing, 5));
        store.apply_queue(queue(&["a", "b"]));

        store.apply_connection_state(ConnectionState::Disconnected);
        let view = store.snapshot();
        assert!(view.is_disconnected());
        assert!(view.status.is_none());
        assert_eq!(view.queue, Some(queue(&["a", "b"])));

        // Also when there never was a status.
        let mut fresh = Store::new();
        fresh.apply_connection_state(ConnectionState::Disconnected);
        assert!(fresh.snapshot().status.is_none());
    }

    #[test]
    fn test_stale_sequence_is_ignored() {
        let mut store = Store::new();
        assert!(store.apply_payload(3, Payload::Status(status(PlayerState::Playing, 3000))));
        // A slower, older status must not win.
        assert!(!store.apply_payload(2, Payload::Status(status(PlayerState::Paused, 2000))));
        // Queue sequence is tracked on its own.
        assert!(store.apply_payload(1, Payload::Queue(queue(&["x"]))));
        assert_eq!(
            store.view().status.as_ref().map(|s| s.state),
            Some(PlayerState::Playing)
        );
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let mut store = Store::new();
        let calls = Rc::new(RefCell::new(0));
        let c = calls.clone();
        let sub = store.subscribe(move |_| *c.borrow_mut() += 1);

        store.apply_queue(queue(&[]));
        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));
        store.apply_queue(queue(&["late"]));

        assert_eq!(*calls.borrow(), 1);
        assert_eq!(store.listener_count(), 0);
    }
}
