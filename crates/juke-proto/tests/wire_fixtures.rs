//! Decoding of captured server frames and endpoint bodies.

use juke_proto::protocol::{ApiResponse, DecodeError, Payload, PlayerState};

const STATUS_PLAYING: &str = r#"{"Status":{"state":"Playing","song":{"spotify_uri":"spotify:track:0b05H1iP6hdx8ue7XQlC5J","title":"Walking","artist":"The Dodos","duration_ms":129213,"album_image_url":"https://i.scdn.co/image/8b578f53808b53d4364fc00d967b299537439a49"},"progress_ms":4048}}"#;

const STATUS_NEEDS_SONG: &str = r#"{"Status":{"state":"NeedsSong","song":null,"progress_ms":null}}"#;

const QUEUE_TWO: &str = r#"{"Queue":{"songs":{"spotify:track:0b05H1iP6hdx8ue7XQlC5J":{"spotify_uri":"spotify:track:0b05H1iP6hdx8ue7XQlC5J","title":"Walking","artist":"The Dodos","duration_ms":129213,"album_image_url":null},"spotify:track:67k9jnPe4dSqvAfrM902Z0":{"spotify_uri":"spotify:track:67k9jnPe4dSqvAfrM902Z0","title":"Bag of Hammers","artist":"Thao & The Get Down Stay Down","duration_ms":183000,"album_image_url":"https://i.scdn.co/image/abc"}}}}"#;

const SEARCH: &str = r#"{"Search":{"items":[{"spotify_uri":"spotify:track:1","title":"One","artist":"Band","album_image_url":"https://i.example/1.jpg","duration_ms":443000},{"spotify_uri":"spotify:track:2","title":"Two","artist":"Band, Guest","album_image_url":null,"duration_ms":61000}]}}"#;

const DEVICES: &str = r#"{"DeviceList":{"items":[{"id":"abc123","name":"Kitchen"},{"id":"def456","name":"Laptop"}]}}"#;

#[test]
fn status_playing_fixture() {
    let Payload::Status(status) = Payload::decode(STATUS_PLAYING).expect("decode") else {
        panic!("expected Status");
    };
    assert_eq!(status.state, PlayerState::Playing);
    assert!(status.state.has_song());
    assert_eq!(status.progress_ms, Some(4048));
    let song = status.song.expect("song");
    assert_eq!(song.artist, "The Dodos");
    assert!(song.album_image_url.is_some());
}

#[test]
fn status_without_song_fixture() {
    let Payload::Status(status) = Payload::decode(STATUS_NEEDS_SONG).expect("decode") else {
        panic!("expected Status");
    };
    assert_eq!(status.state, PlayerState::NeedsSong);
    assert!(status.song.is_none());
    assert!(status.progress_ms.is_none());
}

#[test]
fn queue_fixture() {
    let Payload::Queue(queue) = Payload::decode(QUEUE_TWO).expect("decode") else {
        panic!("expected Queue");
    };
    assert_eq!(queue.len(), 2);
    let titles: Vec<&str> = queue.iter().map(|(_, s)| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Walking", "Bag of Hammers"]);
}

#[test]
fn search_fixture() {
    match ApiResponse::decode(SEARCH).expect("decode") {
        ApiResponse::Search(results) => {
            assert_eq!(results.items.len(), 2);
            assert_eq!(results.items[1].artist, "Band, Guest");
        }
        other => panic!("expected Search, got {}", other.tag()),
    }
}

#[test]
fn device_list_fixture() {
    match ApiResponse::decode(DEVICES).expect("decode") {
        ApiResponse::DeviceList(list) => {
            let names: Vec<&str> = list.items.iter().map(|d| d.name.as_str()).collect();
            assert_eq!(names, vec!["Kitchen", "Laptop"]);
        }
        other => panic!("expected DeviceList, got {}", other.tag()),
    }
}

#[test]
fn channel_and_endpoint_tags_do_not_mix() {
    assert!(matches!(
        Payload::decode(SEARCH),
        Err(DecodeError::UnknownTag(ref t)) if t == "Search"
    ));
    assert!(matches!(
        ApiResponse::decode(STATUS_PLAYING),
        Err(DecodeError::UnknownTag(ref t)) if t == "Status"
    ));
}

#[test]
fn garbage_is_json_error() {
    assert!(matches!(Payload::decode("status"), Err(DecodeError::Json(_))));
    assert!(matches!(Payload::decode("[1,2]"), Err(DecodeError::NotTagged)));
}
