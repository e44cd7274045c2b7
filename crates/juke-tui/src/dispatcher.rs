//! Dispatcher — one HTTP request per user action.
//!
//! Every call resolves to a `DispatchResult`; nothing is fire-and-forget at
//! this layer.  Callers that do not care about the body still get to see
//! transport failures, timeouts and non-2xx statuses.
//!
//! An action whose path is already in flight is refused with
//! `DispatchError::InFlight` instead of being sent twice.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use juke_proto::protocol::{ApiResponse, DecodeError, DeviceList, SearchResults};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0} is already in progress")]
    InFlight(String),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(#[from] DecodeError),
    #[error("expected a {expected} response, got {got}")]
    UnexpectedResponse {
        expected: &'static str,
        got: &'static str,
    },
}

impl DispatchError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DispatchError::Timeout
        } else {
            DispatchError::Transport(e)
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Proof that the user confirmed a destructive action.  Only the
/// confirmation prompt hands these out.
#[derive(Debug, PartialEq, Eq)]
pub struct Confirmation(());

impl Confirmation {
    pub(crate) fn granted() -> Self {
        Confirmation(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum UserAction {
    Resume,
    Pause,
    Skip,
    RequestTrack(String),
    ListDevices,
    SelectDevice(String),
    ClearDevice(Confirmation),
    LogOut(Confirmation),
    SearchTrack(String),
}

impl UserAction {
    /// Request path, with any argument percent-encoded as one segment.
    pub fn path(&self) -> String {
        match self {
            UserAction::Resume => "/api/resume".to_string(),
            UserAction::Pause => "/api/pause".to_string(),
            UserAction::Skip => "/api/skip".to_string(),
            UserAction::RequestTrack(uri) => format!("/api/request/{}", urlencoding::encode(uri)),
            UserAction::ListDevices => "/api/device/list".to_string(),
            UserAction::SelectDevice(id) => format!("/api/device/set/{}", urlencoding::encode(id)),
            UserAction::ClearDevice(_) => "/api/device/clear".to_string(),
            UserAction::LogOut(_) => "/auth/destroy".to_string(),
            UserAction::SearchTrack(q) => format!("/search/track/{}", urlencoding::encode(q)),
        }
    }

    /// Tag of the body this action answers with, if it answers with data.
    fn expects(&self) -> Option<&'static str> {
        match self {
            UserAction::SearchTrack(_) => Some("Search"),
            UserAction::ListDevices => Some("DeviceList"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ack,
    Search(SearchResults),
    Devices(DeviceList),
}

impl Reply {
    fn label(&self) -> &'static str {
        match self {
            Reply::Ack => "Ack",
            Reply::Search(_) => "Search",
            Reply::Devices(_) => "DeviceList",
        }
    }
}

/// Removes its path from the in-flight set when dropped, whatever way the
/// request ends.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightGuard {
    fn claim(set: &Arc<Mutex<HashSet<String>>>, key: &str) -> DispatchResult<Self> {
        let mut active = set.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(key.to_string()) {
            return Err(DispatchError::InFlight(key.to_string()));
        }
        Ok(Self {
            set: set.clone(),
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    base: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Dispatcher {
    /// `base` is scheme and host, e.g. `http://127.0.0.1:8081`.
    pub fn new(base: impl Into<String>, timeout: Duration) -> DispatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DispatchError::Transport)?;
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    #[cfg(test)]
    pub fn is_in_flight(&self, action: &UserAction) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&action.path())
    }

    pub async fn dispatch(&self, action: UserAction) -> DispatchResult<Reply> {
        let path = action.path();
        let _guard = InFlightGuard::claim(&self.in_flight, &path)?;
        let url = format!("{}{}", self.base, path);
        debug!("dispatch GET {}", path);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(DispatchError::from_reqwest)?;
        let status = resp.status();
        let body = resp.text().await.map_err(DispatchError::from_reqwest)?;

        if !status.is_success() {
            warn!("dispatch {} -> {}", path, status);
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let Some(expected) = action.expects() else {
            debug!("dispatch {} -> {} ({} bytes ignored)", path, status, body.len());
            return Ok(Reply::Ack);
        };
        let reply = match ApiResponse::decode(&body)? {
            ApiResponse::Search(results) => Reply::Search(results),
            ApiResponse::DeviceList(devices) => Reply::Devices(devices),
        };
        if reply.label() != expected {
            return Err(DispatchError::UnexpectedResponse {
                expected,
                got: reply.label(),
            });
        }
        Ok(reply)
    }

    // ── Typed entry points ────────────────────────────────────────────────────

    pub async fn resume(&self) -> DispatchResult<()> {
        self.dispatch(UserAction::Resume).await.map(drop)
    }

    pub async fn pause(&self) -> DispatchResult<()> {
        self.dispatch(UserAction::Pause).await.map(drop)
    }

    pub async fn skip(&self) -> DispatchResult<()> {
        self.dispatch(UserAction::Skip).await.map(drop)
    }

    pub async fn request_track(&self, spotify_uri: &str) -> DispatchResult<()> {
        self.dispatch(UserAction::RequestTrack(spotify_uri.to_string()))
            .await
            .map(drop)
    }

    pub async fn select_device(&self, id: &str) -> DispatchResult<()> {
        self.dispatch(UserAction::SelectDevice(id.to_string()))
            .await
            .map(drop)
    }

    pub async fn clear_device(&self, confirmed: Confirmation) -> DispatchResult<()> {
        self.dispatch(UserAction::ClearDevice(confirmed))
            .await
            .map(drop)
    }

    pub async fn log_out(&self, confirmed: Confirmation) -> DispatchResult<()> {
        self.dispatch(UserAction::LogOut(confirmed)).await.map(drop)
    }

    pub async fn list_devices(&self) -> DispatchResult<DeviceList> {
        match self.dispatch(UserAction::ListDevices).await? {
            Reply::Devices(devices) => Ok(devices),
            other => Err(DispatchError::UnexpectedResponse {
                expected: "DeviceList",
                got: other.label(),
            }),
        }
    }

    pub async fn search_track(&self, query: &str) -> DispatchResult<SearchResults> {
        match self.dispatch(UserAction::SearchTrack(query.to_string())).await? {
            Reply::Search(results) => Ok(results),
            other => Err(DispatchError::UnexpectedResponse {
                expected: "Search",
                got: other.label(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct Hits {
        skip: Arc<AtomicUsize>,
        requested: Arc<Mutex<Vec<String>>>,
    }

    async fn slow_skip(State(hits): State<Hits>) -> &'static str {
        hits.skip.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        "ok"
    }

    async fn request(State(hits): State<Hits>, Path(uri): Path<String>) -> &'static str {
        hits.requested.lock().unwrap().push(uri);
        "queued"
    }

    async fn search(Path(q): Path<String>) -> String {
        serde_json::json!({
            "Search": { "items": [{
                "spotify_uri": "spotify:track:1",
                "title": q,
                "artist": "Band",
                "album_image_url": null,
                "duration_ms": 61000
            }]}
        })
        .to_string()
    }

    async fn devices() -> &'static str {
        r#"{"DeviceList":{"items":[{"id":"abc","name":"Kitchen"}]}}"#
    }

    async fn broken() -> (StatusCode, &'static str) {
        (StatusCode::INTERNAL_SERVER_ERROR, "player exploded")
    }

    async fn hang() -> &'static str {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "late"
    }

    async fn serve(hits: Hits) -> String {
        let app = Router::new()
            .route("/api/skip", get(slow_skip))
            .route("/api/request/:uri", get(request))
            .route("/search/track/:q", get(search))
            .route("/api/device/list", get(devices))
            .route("/api/pause", get(broken))
            .route("/api/resume", get(hang))
            .with_state(hits);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_paths_are_encoded() {
        assert_eq!(
            UserAction::RequestTrack("spotify:track:4uLU6hMCjMI75M1A2tKUQC".into()).path(),
            "/api/request/spotify%3Atrack%3A4uLU6hMCjMI75M1A2tKUQC"
        );
        assert_eq!(
            UserAction::SearchTrack("the dodos/walking".into()).path(),
            "/search/track/the%20dodos%2Fwalking"
        );
        assert_eq!(
            UserAction::LogOut(Confirmation::granted()).path(),
            "/auth/destroy"
        );
    }

    #[tokio::test]
    async fn test_duplicate_in_flight_is_suppressed() {
        let hits = Hits::default();
        let base = serve(hits.clone()).await;
        let d = Dispatcher::new(base, Duration::from_secs(5)).unwrap();

        let (first, second) = tokio::join!(d.skip(), d.skip());
        let (ok, refused) = if first.is_ok() { (first, second) } else { (second, first) };
        assert!(ok.is_ok());
        assert!(matches!(refused, Err(DispatchError::InFlight(p)) if p == "/api/skip"));
        assert_eq!(hits.skip.load(Ordering::SeqCst), 1);

        // Released once the first one finished.
        assert!(!d.is_in_flight(&UserAction::Skip));
        d.skip().await.unwrap();
        assert_eq!(hits.skip.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_request_track_round_trips_uri() {
        let hits = Hits::default();
        let base = serve(hits.clone()).await;
        let d = Dispatcher::new(base, Duration::from_secs(5)).unwrap();
        d.request_track("spotify:track:xyz").await.unwrap();
        assert_eq!(*hits.requested.lock().unwrap(), vec!["spotify:track:xyz"]);
    }

    #[tokio::test]
    async fn test_non_2xx_is_an_error() {
        let base = serve(Hits::default()).await;
        let d = Dispatcher::new(base, Duration::from_secs(5)).unwrap();
        match d.pause().await {
            Err(DispatchError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "player exploded");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let base = serve(Hits::default()).await;
        let d = Dispatcher::new(base, Duration::from_millis(150)).unwrap();
        assert!(matches!(d.resume().await, Err(DispatchError::Timeout)));
        assert!(!d.is_in_flight(&UserAction::Resume));
    }

    #[tokio::test]
    async fn test_search_and_devices_decode() {
        let base = serve(Hits::default()).await;
        let d = Dispatcher::new(format!("{}/", base), Duration::from_secs(5)).unwrap();

        let results = d.search_track("walking").await.unwrap();
        assert_eq!(results.items.len(), 1);
        assert_eq!(results.items[0].title, "walking");
        assert_eq!(results.items[0].duration_ms, 61000);

        let devices = d.list_devices().await.unwrap();
        assert_eq!(devices.items[0].name, "Kitchen");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let d = Dispatcher::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        assert!(matches!(d.skip().await, Err(DispatchError::Transport(_))));
    }
}
