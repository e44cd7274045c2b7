//! CommandChannel — the one live WebSocket to the jukebox server.
//!
//! A background task owns the socket.  It reports connection transitions and
//! decoded payloads as `ChannelEvent`s on an unbounded mpsc queue that the app
//! event loop drains; outbound commands travel the other way through a
//! `ChannelHandle`.
//!
//! ```text
//!  Unknown ──open ok──▶ Connected ──close / error / eof──▶ Disconnected
//!     └──────────open failed / closed before open──────────────▲
//! ```
//!
//! `Disconnected` is terminal.  There is no retry: reconnecting means opening
//! a new channel, which gets a fresh `channel` id so late events from the old
//! one can be told apart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use juke_proto::protocol::{Command, DecodeError, Payload, SUBPROTOCOL};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Unknown => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEvent {
    /// Id of the channel instance that produced the event.
    pub channel: u64,
    pub kind: ChannelEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEventKind {
    State(ConnectionState),
    /// `seq` increases by one per decoded frame on this channel.
    Payload { seq: u64, payload: Payload },
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is not open ({})", .0.label())]
    NotOpen(ConnectionState),
    #[error("channel task has stopped")]
    Closed,
}

/// Cheap, cloneable sender side of a channel.  Safe to move into timers.
#[derive(Clone)]
pub struct ChannelHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ChannelHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn send(&self, cmd: Command) -> Result<(), ChannelError> {
        let state = self.state();
        if state != ConnectionState::Connected {
            return Err(ChannelError::NotOpen(state));
        }
        self.cmd_tx.send(cmd).map_err(|_| ChannelError::Closed)
    }

    /// Ask for fresh status and queue.  A no-op while the channel is not open.
    pub fn refresh(&self) {
        for cmd in [Command::Status, Command::Queue] {
            if let Err(e) = self.send(cmd) {
                trace!("refresh skipped: {}", e);
                return;
            }
        }
    }
}

pub struct CommandChannel {
    id: u64,
    handle: ChannelHandle,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CommandChannel {
    /// Start connecting to `url`.  Returns immediately; progress is reported
    /// through `events`.  Must be called inside a tokio runtime.
    pub fn open(url: impl Into<String>, events: mpsc::UnboundedSender<ChannelEvent>) -> Self {
        let url = url.into();
        let id = NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Unknown);
        let state_tx = Arc::new(state_tx);
        let cancel = CancellationToken::new();

        let link = Link {
            id,
            state_tx: state_tx.clone(),
            events,
        };
        debug!("channel {} opening {}", id, url);
        let task = tokio::spawn(run_channel(link, url, cmd_rx, cancel.clone()));

        Self {
            id,
            handle: ChannelHandle { cmd_tx, state_rx },
            state_tx,
            cancel,
            task: Some(task),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn handle(&self) -> ChannelHandle {
        self.handle.clone()
    }

    /// Close the socket.  The task sends a close frame on its way out; the
    /// state flips to `Disconnected` right away so no handle can send again.
    pub fn close(&mut self) {
        if self.task.is_none() {
            return;
        }
        info!("channel {} closing", self.id);
        self.cancel.cancel();
        self.state_tx.send_replace(ConnectionState::Disconnected);
        // Detach: the task exits on its own after the close frame.
        self.task.take();
    }
}

impl Drop for CommandChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// What the socket task needs to report back.
struct Link {
    id: u64,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    events: mpsc::UnboundedSender<ChannelEvent>,
}

impl Link {
    /// Never leaves `Disconnected`, even if `close()` won a race with the
    /// handshake.  The task reports `Disconnected` exactly once, on exit.
    fn emit_state(&self, state: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state || *current == ConnectionState::Disconnected {
                return false;
            }
            *current = state;
            true
        });
        if changed || state == ConnectionState::Disconnected {
            self.emit(ChannelEventKind::State(state));
        }
    }

    fn emit(&self, kind: ChannelEventKind) {
        // Receiver gone means the view unmounted; nothing left to tell.
        let _ = self.events.send(ChannelEvent {
            channel: self.id,
            kind,
        });
    }
}

async fn run_channel(
    link: Link,
    url: String,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
) {
    let mut request = match url.as_str().into_client_request() {
        Ok(r) => r,
        Err(e) => {
            warn!("channel {}: bad url {}: {}", link.id, url, e);
            link.emit_state(ConnectionState::Disconnected);
            return;
        }
    };
    request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOL));

    let connected = tokio::select! {
        _ = cancel.cancelled() => {
            link.emit_state(ConnectionState::Disconnected);
            return;
        }
        r = tokio_tungstenite::connect_async(request) => r,
    };
    let ws = match connected {
        Ok((ws, _response)) => ws,
        Err(e) => {
            warn!("channel {}: connect to {} failed: {}", link.id, url, e);
            link.emit_state(ConnectionState::Disconnected);
            return;
        }
    };

    info!("channel {} connected to {}", link.id, url);
    link.emit_state(ConnectionState::Connected);

    let (mut sink, mut stream) = ws.split();
    let mut seq = 0u64;

    // Initial update, same as every poll tick.
    for cmd in [Command::Status, Command::Queue] {
        if let Err(e) = sink.send(Message::Text(cmd.as_str().to_string())).await {
            warn!("channel {}: initial {} failed: {}", link.id, cmd, e);
            link.emit_state(ConnectionState::Disconnected);
            return;
        }
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            Some(cmd) = cmd_rx.recv() => {
                trace!("channel {} -> {}", link.id, cmd);
                if let Err(e) = sink.send(Message::Text(cmd.as_str().to_string())).await {
                    warn!("channel {}: send {} failed: {}", link.id, cmd, e);
                    break;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match Payload::decode(&text) {
                    Ok(payload) => {
                        seq += 1;
                        trace!("channel {} <- {} #{}", link.id, payload.tag(), seq);
                        link.emit(ChannelEventKind::Payload { seq, payload });
                    }
                    Err(DecodeError::UnknownTag(tag)) => {
                        warn!("channel {}: unhandled {:?} frame, dropped", link.id, tag);
                    }
                    Err(e) => {
                        warn!("channel {}: malformed frame dropped: {}", link.id, e);
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    info!("channel {}: server closed: {:?}", link.id, frame);
                    break;
                }
                // Ping/pong are answered by tungstenite; binary is not part of the protocol.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("channel {}: transport error: {}", link.id, e);
                    break;
                }
                None => {
                    info!("channel {}: stream ended", link.id);
                    break;
                }
            }
        }
    }

    link.emit_state(ConnectionState::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_before_open_is_rejected() {
        // Bind then drop so the port refuses connections.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let channel = CommandChannel::open(format!("ws://{}/ws", addr), tx);
        assert!(matches!(
            channel.handle().send(Command::Status),
            Err(ChannelError::NotOpen(ConnectionState::Unknown))
                | Err(ChannelError::NotOpen(ConnectionState::Disconnected))
        ));

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.channel, channel.id());
        assert_eq!(
            event.kind,
            ChannelEventKind::State(ConnectionState::Disconnected)
        );
        assert_eq!(channel.handle().state(), ConnectionState::Disconnected);
        assert!(matches!(
            channel.handle().send(Command::Queue),
            Err(ChannelError::NotOpen(ConnectionState::Disconnected))
        ));
        // Refresh on a dead channel is silent.
        channel.handle().refresh();
    }

    #[tokio::test]
    async fn test_close_marks_disconnected_immediately() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut channel = CommandChannel::open(format!("ws://{}/ws", addr), tx);
        let handle = channel.handle();
        channel.close();
        assert_eq!(handle.state(), ConnectionState::Disconnected);
        assert!(handle.send(Command::Status).is_err());
    }
}
