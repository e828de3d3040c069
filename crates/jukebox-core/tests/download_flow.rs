use jukebox_core::index::IndexSource;
use jukebox_core::nongs::{LocalSong, Nongs, SongMetadata};
use jukebox_core::registry::LocalRegistry;
use jukebox_core::{
    ChannelSink, DownloadOutcome, IndexManager, JukeboxConfig, JukeboxError, JukeboxEvent,
    MemoryRegistry, Song,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GD_SONG: i32 = 42;

struct Setup {
    _tmp: TempDir,
    manager: IndexManager,
    registry: Arc<MemoryRegistry>,
    events: UnboundedReceiver<JukeboxEvent>,
}

async fn setup(server: &MockServer) -> Setup {
    let _ = env_logger::builder().is_test(true).try_init();

    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "idx1",
            "name": "Test index",
            "nongs": {
                "youtube": {
                    "songA": {"name": "A", "artist": "B", "ytID": "dQw4w9WgXcQ", "songIDs": [GD_SONG]},
                    "broken": {"name": "C", "artist": "D", "ytID": "nope", "songIDs": [GD_SONG]}
                },
                "hosted": {
                    "songH": {
                        "name": "H",
                        "artist": "E",
                        "url": format!("{}/hosted.mp3", server.uri()),
                        "songs": [GD_SONG],
                        "startOffset": 1500
                    }
                }
            }
        })))
        .mount(server)
        .await;

    let tmp = tempdir().unwrap();
    let registry = Arc::new(MemoryRegistry::new(tmp.path().join("songs")));
    registry.insert(Nongs::new(
        GD_SONG,
        LocalSong {
            metadata: SongMetadata::new(GD_SONG, "default", "Original", "RobTop"),
            path: tmp.path().join("default.mp3"),
        },
    ));

    let mut config = JukeboxConfig::for_save_dir(tmp.path())
        .with_indexes(vec![IndexSource::new(format!("{}/index.json", server.uri()), true)]);
    config.resolver_url = format!("{}/api/json", server.uri());

    let (sink, events) = ChannelSink::new();
    let manager = IndexManager::new(config, registry.clone(), Arc::new(sink)).unwrap();
    manager.init().await.unwrap();

    Setup {
        _tmp: tmp,
        manager,
        registry,
        events,
    }
}

fn drain(events: &mut UnboundedReceiver<JukeboxEvent>) -> Vec<JukeboxEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn youtube_download_resolves_fetches_and_activates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(body_partial_json(json!({
            "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "audioOnly": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "stream",
            "url": format!("{}/stream/songA", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stream/songA"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2048]))
        .expect(1)
        .mount(&server)
        .await;

    let mut s = setup(&server).await;
    drain(&mut s.events);

    let handle = s.manager.download(GD_SONG, "songA").unwrap();
    let DownloadOutcome::Completed(file) = handle.wait().await else {
        panic!("download did not complete");
    };
    assert_eq!(std::fs::read(&file).unwrap().len(), 2048);
    assert!(file.starts_with(s.registry.songs_dir()));
    assert_eq!(s.registry.active_song(GD_SONG).as_deref(), Some("songA"));

    // The adopted copy replaces the index entry in the listing
    let songs = s.manager.list_alternatives(GD_SONG).unwrap();
    let song_a: Vec<&Song> = songs.iter().filter(|x| x.unique_id() == "songA").collect();
    assert_eq!(song_a.len(), 1);
    assert!(song_a[0].is_downloaded());
    assert_eq!(song_a[0].index_id(), Some("idx1"));
    assert_eq!(songs[1].unique_id(), "songA");

    let events = drain(&mut s.events);
    let progress: Vec<f32> = events
        .iter()
        .filter_map(|e| match e {
            JukeboxEvent::DownloadProgress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress.first().copied(), Some(0.0));
    assert!(progress.last().copied().unwrap_or(0.0) > 0.999);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        events.last(),
        Some(&JukeboxEvent::StateChanged { gd_song_id: GD_SONG })
    );
    assert!(!events.iter().any(|e| matches!(e, JukeboxEvent::Error { .. })));
}

#[tokio::test]
async fn hosted_download_keeps_start_offset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hosted.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3hosted".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let s = setup(&server).await;
    let outcome = s.manager.download(GD_SONG, "songH").unwrap().wait().await;
    assert!(outcome.is_completed());

    let nongs = s.registry.get_nongs(GD_SONG).unwrap();
    let adopted = nongs.hosted().iter().find(|h| h.metadata.unique_id == "songH");
    let adopted = adopted.expect("hosted song adopted");
    assert_eq!(adopted.metadata.start_offset_ms, 1500);
    assert_eq!(adopted.index_id.as_deref(), Some("idx1"));
}

#[tokio::test]
async fn unresolvable_video_fails_with_fatal_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "error", "text": "nope"})),
        )
        .mount(&server)
        .await;

    let mut s = setup(&server).await;
    drain(&mut s.events);

    let outcome = s.manager.download(GD_SONG, "songA").unwrap().wait().await;
    assert!(matches!(outcome, DownloadOutcome::Failed(_)));
    assert_eq!(s.registry.active_song(GD_SONG).as_deref(), Some("default"));
    assert_eq!(s.manager.download_progress("songA"), None);

    let events = drain(&mut s.events);
    assert!(events.iter().any(|e| matches!(
        e,
        JukeboxEvent::Error { fatal: true, message } if message.starts_with("Failed to fetch song")
    )));
    assert_eq!(
        events.last(),
        Some(&JukeboxEvent::StateChanged { gd_song_id: GD_SONG })
    );
}

#[tokio::test]
async fn invalid_youtube_id_never_hits_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let s = setup(&server).await;
    let err = s.manager.download(GD_SONG, "broken").err().unwrap();
    assert!(matches!(err, JukeboxError::Validation(_)));
    assert!(s.manager.active_downloads().is_empty());
}

#[tokio::test]
async fn unknown_alternative_is_not_found() {
    let server = MockServer::start().await;
    let mut s = setup(&server).await;
    drain(&mut s.events);

    let err = s.manager.download(GD_SONG, "ghost").err().unwrap();
    assert_eq!(err.to_string(), "Song ghost not found in manifest");

    let err = s.manager.download(7, "songA").err().unwrap();
    assert!(matches!(err, JukeboxError::NotFound(_)));

    let local = s.manager.download(GD_SONG, "default").err().unwrap();
    assert!(matches!(local, JukeboxError::Validation(_)));
    assert!(drain(&mut s.events).is_empty());
}

#[tokio::test]
async fn repeated_request_only_completes_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hosted.mp3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"ID3hosted".to_vec())
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let mut s = setup(&server).await;
    drain(&mut s.events);

    let first = s.manager.download(GD_SONG, "songH").unwrap();
    let second = s.manager.download(GD_SONG, "songH").unwrap();
    assert_eq!(first.unique_id(), second.unique_id());

    assert_eq!(first.wait().await, DownloadOutcome::Superseded);
    assert!(second.wait().await.is_completed());

    let terminal = drain(&mut s.events)
        .into_iter()
        .filter(|e| !matches!(e, JukeboxEvent::DownloadProgress { .. }))
        .collect::<Vec<_>>();
    assert_eq!(
        terminal,
        vec![JukeboxEvent::StateChanged { gd_song_id: GD_SONG }]
    );
}

#[tokio::test]
async fn empty_body_only_signals_state_change() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hosted.mp3"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut s = setup(&server).await;
    drain(&mut s.events);

    let outcome = s.manager.download(GD_SONG, "songH").unwrap().wait().await;
    assert_eq!(outcome, DownloadOutcome::NoContent);
    assert_eq!(s.registry.active_song(GD_SONG).as_deref(), Some("default"));
    assert!(!s.registry.songs_dir().exists());

    let terminal = drain(&mut s.events)
        .into_iter()
        .filter(|e| !matches!(e, JukeboxEvent::DownloadProgress { .. }))
        .collect::<Vec<_>>();
    assert_eq!(
        terminal,
        vec![JukeboxEvent::StateChanged { gd_song_id: GD_SONG }]
    );
}
