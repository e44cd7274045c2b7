use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// WebSocket sub-protocol the server expects on `/ws`.
pub const SUBPROTOCOL: &str = "juke";

/// Plain-text commands sent from client to server over the live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Status,
    Queue,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Status => "status",
            Command::Queue => "queue",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the server-side player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlayerState {
    /// Server has not figured itself out yet
    #[default]
    Unknown,
    /// Host has to log in with the music service
    NoAuth,
    /// No playback device selected
    NoDevice,
    /// Waiting for a song to be requested
    NeedsSong,
    Playing,
    Paused,
    /// Was `NeedsSong`, a song has been queued up but not started
    EnqueuedAndWaiting,
}

impl PlayerState {
    /// True when `song` and `progress_ms` carry meaning.
    pub fn has_song(self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Paused)
    }

    pub fn label(self) -> &'static str {
        match self {
            PlayerState::Unknown => "Unknown",
            PlayerState::NoAuth => "NoAuth",
            PlayerState::NoDevice => "NoDevice",
            PlayerState::NeedsSong => "NeedsSong",
            PlayerState::Playing => "Playing",
            PlayerState::Paused => "Paused",
            PlayerState::EnqueuedAndWaiting => "EnqueuedAndWaiting",
        }
    }
}

/// A track as the server describes it, in status, queue and search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Track URI, unique key for search results.  Not always sent for
    /// status/queue entries.
    #[serde(default)]
    pub spotify_uri: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album_image_url: Option<String>,
    pub duration_ms: u32,
}

/// What the jukebox is currently playing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlaybackStatus {
    pub state: PlayerState,
    #[serde(default)]
    pub song: Option<Song>,
    #[serde(default)]
    pub progress_ms: Option<u32>,
}

/// Requested songs waiting to be played, in no particular order.
///
/// The wire form is a JSON object keyed by track id.  Document order is kept
/// so the list does not reshuffle between refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Queue {
    pub songs: Vec<(String, Song)>,
}

impl Queue {
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn get(&self, track_id: &str) -> Option<&Song> {
        self.songs
            .iter()
            .find(|(id, _)| id == track_id)
            .map(|(_, song)| song)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Song)> {
        self.songs.iter().map(|(id, song)| (id.as_str(), song))
    }
}

#[derive(Serialize, Deserialize)]
struct QueueWire {
    #[serde(
        serialize_with = "serialize_song_map",
        deserialize_with = "deserialize_song_map"
    )]
    songs: Vec<(String, Song)>,
}

impl Serialize for Queue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        QueueWire {
            songs: self.songs.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Queue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = QueueWire::deserialize(deserializer)?;
        Ok(Queue { songs: wire.songs })
    }
}

fn serialize_song_map<S: Serializer>(
    songs: &[(String, Song)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(songs.len()))?;
    for (id, song) in songs {
        map.serialize_entry(id, song)?;
    }
    map.end()
}

fn deserialize_song_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<(String, Song)>, D::Error> {
    struct SongMapVisitor;

    impl<'de> Visitor<'de> for SongMapVisitor {
        type Value = Vec<(String, Song)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of track id to song")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut songs = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((id, song)) = access.next_entry::<String, Song>()? {
                // Keys are unique on the server; keep the last one if not.
                songs.retain(|(existing, _): &(String, Song)| *existing != id);
                songs.push((id, song));
            }
            Ok(songs)
        }
    }

    deserializer.deserialize_map(SongMapVisitor)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SearchResults {
    pub items: Vec<Song>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeviceList {
    pub items: Vec<Device>,
}

/// Frames pushed by the server over the live channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Status(PlaybackStatus),
    Queue(Queue),
}

impl Payload {
    const TAGS: &'static [&'static str] = &["Status", "Queue"];

    /// Decode one inbound text frame.
    ///
    /// Unknown tags are reported separately from malformed bodies so the
    /// caller can log them differently; both are dropped.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let payload: Self = decode_tagged(text, Self::TAGS)?;
        let songs: Vec<&Song> = match &payload {
            Payload::Status(status) => status.song.iter().collect(),
            Payload::Queue(queue) => queue.iter().map(|(_, song)| song).collect(),
        };
        check_durations(payload.tag(), songs)?;
        Ok(payload)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Payload::Status(_) => "Status",
            Payload::Queue(_) => "Queue",
        }
    }
}

/// Bodies returned by the request endpoints that answer with data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiResponse {
    Search(SearchResults),
    DeviceList(DeviceList),
}

impl ApiResponse {
    const TAGS: &'static [&'static str] = &["Search", "DeviceList"];

    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let response: Self = decode_tagged(text, Self::TAGS)?;
        if let ApiResponse::Search(results) = &response {
            check_durations(response.tag(), &results.items)?;
        }
        Ok(response)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ApiResponse::Search(_) => "Search",
            ApiResponse::DeviceList(_) => "DeviceList",
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not a tagged object")]
    NotTagged,
    #[error("unknown tag {0:?}")]
    UnknownTag(String),
    #[error("malformed {tag} body: {source}")]
    Malformed {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

fn decode_tagged<T: serde::de::DeserializeOwned>(
    text: &str,
    known: &[&str],
) -> Result<T, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let tag = match value.as_object() {
        Some(obj) if obj.len() == 1 => obj.keys().next().cloned().unwrap_or_default(),
        _ => return Err(DecodeError::NotTagged),
    };
    if !known.contains(&tag.as_str()) {
        return Err(DecodeError::UnknownTag(tag));
    }
    serde_json::from_value(value).map_err(|source| DecodeError::Malformed { tag, source })
}

/// Every song must have a positive duration.
fn check_durations<'a>(
    tag: &str,
    songs: impl IntoIterator<Item = &'a Song>,
) -> Result<(), DecodeError> {
    match songs.into_iter().find(|song| song.duration_ms == 0) {
        Some(song) => Err(DecodeError::Malformed {
            tag: tag.to_string(),
            source: serde::de::Error::custom(format!(
                "song {:?} has duration_ms 0",
                song.title
            )),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_payload_decode() {
        let text = r#"{"Status":{"state":"Paused","song":{"title":"Walking","artist":"The Dodos","album_image_url":"https://i.example/a.jpg","duration_ms":129213},"progress_ms":5000}}"#;
        let payload = Payload::decode(text).unwrap();
        match payload {
            Payload::Status(status) => {
                assert_eq!(status.state, PlayerState::Paused);
                assert_eq!(status.progress_ms, Some(5000));
                let song = status.song.unwrap();
                assert_eq!(song.title, "Walking");
                assert_eq!(song.duration_ms, 129213);
                assert_eq!(song.spotify_uri, "");
            }
            other => panic!("wrong payload {:?}", other),
        }
    }

    #[test]
    fn test_queue_keeps_document_order() {
        let text = r#"{"Queue":{"songs":{
            "zzz":{"title":"Last","artist":"A","duration_ms":1000},
            "aaa":{"title":"First","artist":"B","duration_ms":2000}
        }}}"#;
        let Payload::Queue(queue) = Payload::decode(text).unwrap() else {
            panic!("expected queue");
        };
        let ids: Vec<&str> = queue.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["zzz", "aaa"]);
        assert_eq!(queue.get("aaa").map(|s| s.title.as_str()), Some("First"));
    }

    #[test]
    fn test_unknown_tag_is_reported() {
        let err = Payload::decode(r#"{"Volume":{"level":3}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownTag(ref t) if t == "Volume"));
    }

    #[test]
    fn test_two_keys_is_not_tagged() {
        let err = Payload::decode(r#"{"Status":{},"Queue":{}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::NotTagged));
    }

    #[test]
    fn test_malformed_body() {
        let err = Payload::decode(r#"{"Status":{"state":"Dancing"}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { ref tag, .. } if tag == "Status"));
    }

    #[test]
    fn test_zero_duration_is_malformed() {
        let status = r#"{"Status":{"state":"Playing","song":{"title":"Blank","artist":"Nobody","duration_ms":0},"progress_ms":0}}"#;
        let err = Payload::decode(status).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { ref tag, .. } if tag == "Status"));

        let queue = r#"{"Queue":{"songs":{
            "ok":{"title":"Fine","artist":"A","duration_ms":1000},
            "bad":{"title":"Blank","artist":"B","duration_ms":0}
        }}}"#;
        let err = Payload::decode(queue).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { ref tag, .. } if tag == "Queue"));

        let search = r#"{"Search":{"items":[{"spotify_uri":"u:1","title":"Blank","artist":"C","duration_ms":0}]}}"#;
        assert!(ApiResponse::decode(search).is_err());

        // A status without a song has nothing to check.
        assert!(Payload::decode(r#"{"Status":{"state":"NeedsSong"}}"#).is_ok());
    }

    #[test]
    fn test_command_strings() {
        assert_eq!(Command::Status.as_str(), "status");
        assert_eq!(Command::Queue.to_string(), "queue");
    }
}
