mod common;

use common::{AudioCall, FakeAudio, FakeCatalog};
use music_deck::player::browser::{CatalogBrowser, TrackPane};
use music_deck::player::session::{Input, NewLocalArtist, Outcome, Session};
use music_deck::player::{ArtistId, Origin, Playback, PlayerError};
use std::sync::Arc;

fn catalog() -> Arc<FakeCatalog> {
    FakeCatalog::new()
        .with_artist("Alpha", &["a.mp3", "b.mp3"])
        .with_artist("Quiet", &[])
        .with_failing_artist(
            "Offline",
            PlayerError::CollaboratorUnavailable("connection refused".to_string()),
        )
        .shared()
}

async fn started(catalog: Arc<FakeCatalog>) -> (FakeAudio, Session<FakeAudio>) {
    let audio = FakeAudio::default();
    let mut session = Session::new(catalog, audio.clone());
    session.start().await.unwrap();
    (audio, session)
}

fn artist_id(session: &Session<FakeAudio>, name: &str) -> ArtistId {
    session
        .browser()
        .artists()
        .find(|a| a.name == name)
        .map(|a| a.id)
        .unwrap()
}

#[tokio::test]
async fn test_remote_artists_listed_at_start() {
    let (_audio, session) = started(catalog()).await;
    let names: Vec<&str> = session.browser().artists().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Quiet", "Offline"]);
    assert!(session.browser().artists().all(|a| a.origin == Origin::Remote));
    assert_eq!(session.pane(), &TrackPane::Idle);
}

#[tokio::test]
async fn test_select_artist_loads_tracks() {
    let (_audio, mut session) = started(catalog()).await;
    let alpha = artist_id(&session, "Alpha");

    assert_eq!(session.handle(Input::SelectArtist(alpha)).await, Outcome::TracksShown);
    assert_eq!(session.pane().tracks(), ["a.mp3", "b.mp3"]);
    assert_eq!(session.pane().placeholder(), None);
    assert_eq!(session.controller().tracks(), ["a.mp3", "b.mp3"]);
    assert_eq!(session.controller().state().artist, Some(alpha));
}

#[tokio::test]
async fn test_unknown_artist_shows_error_placeholder() {
    let (_audio, mut session) = started(
        FakeCatalog::new()
            .with_failing_artist("Unknown", PlayerError::ArtistNotFound("Unknown".to_string()))
            .shared(),
    )
    .await;

    let unknown = artist_id(&session, "Unknown");
    session.handle(Input::SelectArtist(unknown)).await;

    assert!(matches!(
        session.pane(),
        TrackPane::Error {
            error: PlayerError::ArtistNotFound(_),
            ..
        }
    ));
    assert_eq!(
        session.pane().placeholder().as_deref(),
        Some("Error loading songs for Unknown")
    );
    assert!(session.controller().artist().is_none());
    assert!(session.controller().tracks().is_empty());
}

#[tokio::test]
async fn test_unavailable_catalog_clears_active_list() {
    let (_audio, mut session) = started(catalog()).await;
    let alpha = artist_id(&session, "Alpha");
    let offline = artist_id(&session, "Offline");

    session.handle(Input::SelectArtist(alpha)).await;
    session.handle(Input::SelectTrack(1)).await;
    session.handle(Input::SelectArtist(offline)).await;

    assert_eq!(
        session.pane().placeholder().as_deref(),
        Some("Error loading songs for Offline")
    );
    assert!(session.controller().tracks().is_empty());
    assert!(!session.controller().state().playing);
    assert_eq!(
        session.handle(Input::TogglePlayPause).await,
        Outcome::Warning(PlayerError::NoTrackLoaded)
    );
}

#[tokio::test]
async fn test_empty_artist_shows_empty_placeholder() {
    let (_audio, mut session) = started(catalog()).await;
    let quiet = artist_id(&session, "Quiet");

    session.handle(Input::SelectArtist(quiet)).await;
    assert!(matches!(session.pane(), TrackPane::Empty { .. }));
    assert_eq!(
        session.pane().placeholder().as_deref(),
        Some("No songs found for Quiet")
    );
    assert_eq!(session.controller().state().artist, Some(quiet));
}

#[tokio::test]
async fn test_local_artist_plays_without_fetch() {
    let catalog = catalog();
    let (audio, mut session) = started(catalog.clone()).await;

    let Outcome::ArtistAdded(bob) = session
        .handle(Input::AddLocalArtist(NewLocalArtist {
            name: "Bob".to_string(),
            tracks: vec!["x.mp3".to_string()],
        }))
        .await
    else {
        panic!("artist not added");
    };

    session.handle(Input::SelectArtist(bob)).await;
    let outcome = session.handle(Input::SelectTrack(0)).await;

    assert_eq!(
        outcome,
        Outcome::Playing(Playback::Local {
            track: "x.mp3".to_string()
        })
    );
    assert!(catalog.requests().is_empty());
    assert!(audio.calls().is_empty());
    assert_eq!(session.controller().state().index, Some(0));
}

#[tokio::test]
async fn test_add_local_artist_rejects_blank_name() {
    let (_audio, mut session) = started(catalog()).await;
    let before = session.browser().artists().count();

    let outcome = session
        .handle(Input::AddLocalArtist(NewLocalArtist::parse("   | a.mp3")))
        .await;
    assert_eq!(outcome, Outcome::Idle);
    assert_eq!(session.browser().artists().count(), before);
}

#[tokio::test]
async fn test_duplicate_local_names_are_distinct() {
    let mut browser = CatalogBrowser::new(catalog());
    let first = browser.add_local_artist("Bob", vec!["x.mp3".to_string()]).unwrap();
    let second = browser.add_local_artist("Bob", vec!["y.mp3".to_string()]).unwrap();
    assert_ne!(first, second);

    browser.load_tracks_for(second).await.unwrap();
    assert_eq!(browser.pane().tracks(), ["y.mp3"]);
}

#[tokio::test]
async fn test_local_tracks_are_trimmed() {
    let mut browser = CatalogBrowser::new(catalog());
    let id = browser
        .add_local_artist(
            " Bob ",
            vec![" x.mp3 ".to_string(), "".to_string(), "y.mp3".to_string()],
        )
        .unwrap();

    assert_eq!(browser.artist(id).unwrap().name, "Bob");
    browser.load_tracks_for(id).await.unwrap();
    assert_eq!(browser.pane().tracks(), ["x.mp3", "y.mp3"]);
}

#[tokio::test]
async fn test_remove_artist_requires_confirmation() {
    let (_audio, mut session) = started(catalog()).await;
    let Outcome::ArtistAdded(bob) = session
        .handle(Input::AddLocalArtist(NewLocalArtist::parse("Bob | x.mp3")))
        .await
    else {
        panic!("artist not added");
    };
    session.handle(Input::SelectArtist(bob)).await;
    session.handle(Input::SelectTrack(0)).await;

    let declined = session
        .handle(Input::RemoveArtist {
            id: bob,
            confirmed: false,
        })
        .await;
    assert_eq!(declined, Outcome::Idle);
    assert!(session.browser().artist(bob).is_some());
    assert!(session.controller().state().playing);

    let removed = session
        .handle(Input::RemoveArtist {
            id: bob,
            confirmed: true,
        })
        .await;
    assert_eq!(removed, Outcome::ArtistRemoved);
    assert!(session.browser().artist(bob).is_none());
    assert_eq!(session.pane(), &TrackPane::Idle);
    assert!(session.controller().artist().is_none());
    assert!(!session.controller().state().playing);
}

#[tokio::test]
async fn test_remove_remote_artist_until_refresh() {
    let catalog = catalog();
    let mut browser = CatalogBrowser::new(catalog.clone());
    browser.refresh_artists().await.unwrap();
    let alpha = browser.artists().find(|a| a.name == "Alpha").unwrap().id;
    let bob = browser.add_local_artist("Bob", vec![]).unwrap();

    let mut asked = None;
    assert!(browser.remove_artist(alpha, |artist| {
        asked = Some(artist.name.clone());
        true
    }));
    assert_eq!(asked.as_deref(), Some("Alpha"));
    assert!(browser.artist(alpha).is_none());
    assert_eq!(browser.pane(), &TrackPane::Idle);
    assert!(catalog.requests().is_empty());

    assert!(browser.remove_artist(bob, |artist| artist.name == "Bob"));
    assert_eq!(browser.artists().count(), 2);

    // The catalog lists it again on the next refresh, the local one stays gone
    browser.refresh_artists().await.unwrap();
    let names: Vec<&str> = browser.artists().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Quiet", "Offline"]);
}

#[tokio::test]
async fn test_remove_unknown_artist_skips_confirmation() {
    let mut browser = CatalogBrowser::new(catalog());
    let bob = browser.add_local_artist("Bob", vec![]).unwrap();
    assert!(browser.remove_artist(bob, |_| true));

    let mut asked = false;
    assert!(!browser.remove_artist(bob, |_| {
        asked = true;
        true
    }));
    assert!(!asked);
}

#[tokio::test]
async fn test_removing_loading_artist_discards_its_fetch() {
    let catalog = catalog();
    let (_audio, mut session) = started(catalog.clone()).await;
    let alpha = artist_id(&session, "Alpha");

    let request = session.browser_mut().begin_load(alpha).unwrap();
    assert_eq!(request.artist().name, "Alpha");
    let removed = session
        .handle(Input::RemoveArtist {
            id: alpha,
            confirmed: true,
        })
        .await;
    assert_eq!(removed, Outcome::ArtistRemoved);

    let loaded = request.run(catalog.clone()).await;
    assert!(!session.apply_load(loaded));
    assert_eq!(session.pane(), &TrackPane::Idle);
    assert!(session.controller().artist().is_none());
}

#[tokio::test]
async fn test_filter_tracks() {
    let (_audio, mut session) = started(catalog()).await;
    let alpha = artist_id(&session, "Alpha");
    session.handle(Input::SelectArtist(alpha)).await;

    session.handle(Input::Search("zz".to_string())).await;
    assert!(session.track_rows().iter().all(|row| !row.visible));

    session.handle(Input::Search("B.MP3".to_string())).await;
    let visible: Vec<String> = session
        .track_rows()
        .into_iter()
        .filter(|row| row.visible)
        .map(|row| row.name)
        .collect();
    assert_eq!(visible, vec!["b.mp3"]);

    session.handle(Input::Search(String::new())).await;
    assert!(session.track_rows().iter().all(|row| row.visible));
    // Lists are untouched
    assert_eq!(session.pane().tracks().len(), 2);
    assert_eq!(session.controller().tracks().len(), 2);
}

#[tokio::test]
async fn test_filter_artists_case_insensitive() {
    let mut browser = CatalogBrowser::new(catalog());
    browser.refresh_artists().await.unwrap();
    browser.add_local_artist("Bob", vec![]);

    browser.filter("  qUi ");
    assert_eq!(browser.query(), "qui");
    let visible: Vec<&str> = browser.visible_artists().map(|a| a.name.as_str()).collect();
    assert_eq!(visible, vec!["Quiet"]);
    assert_eq!(browser.artists().count(), 4);

    browser.filter("");
    assert_eq!(browser.visible_artists().count(), 4);
}

#[tokio::test]
async fn test_now_playing_marker_rows() {
    let (_audio, mut session) = started(catalog()).await;
    let alpha = artist_id(&session, "Alpha");
    session.handle(Input::SelectArtist(alpha)).await;
    session.handle(Input::SelectTrack(1)).await;

    let marked: Vec<usize> = session
        .track_rows()
        .iter()
        .filter(|row| row.now_playing)
        .map(|row| row.index)
        .collect();
    assert_eq!(marked, vec![1]);

    session.handle(Input::Previous).await;
    let marked: Vec<usize> = session
        .track_rows()
        .iter()
        .filter(|row| row.now_playing)
        .map(|row| row.index)
        .collect();
    assert_eq!(marked, vec![0]);
}

#[tokio::test]
async fn test_select_track_out_of_range_is_ignored() {
    let (audio, mut session) = started(catalog()).await;
    let alpha = artist_id(&session, "Alpha");
    session.handle(Input::SelectArtist(alpha)).await;

    assert_eq!(session.handle(Input::SelectTrack(7)).await, Outcome::Idle);
    assert!(audio.calls().is_empty());

    let outcome = session.handle(Input::SelectTrack(0)).await;
    assert!(matches!(outcome, Outcome::Playing(Playback::Streaming { .. })));
    assert_eq!(
        audio.calls(),
        vec![
            AudioCall::Load("http://catalog/songs/Alpha/a.mp3".to_string()),
            AudioCall::Play
        ]
    );
}

#[tokio::test]
async fn test_last_selection_wins() {
    let catalog = catalog();
    let (_audio, mut session) = started(catalog.clone()).await;
    let alpha = artist_id(&session, "Alpha");
    let quiet = artist_id(&session, "Quiet");

    let first = session.browser_mut().begin_load(alpha).unwrap();
    let second = session.browser_mut().begin_load(quiet).unwrap();
    assert!(matches!(session.pane(), TrackPane::Loading { artist } if artist.id == quiet));
    assert_eq!(session.pane().placeholder().as_deref(), Some("Loading songs..."));

    let second = second.run(catalog.clone()).await;
    let first = first.run(catalog.clone()).await;

    // Newest finishes first, then the stale one arrives
    assert!(session.apply_load(second));
    assert!(!session.apply_load(first));

    assert!(matches!(session.pane(), TrackPane::Empty { artist } if artist.id == quiet));
    assert_eq!(session.controller().state().artist, Some(quiet));
    assert_eq!(catalog.requests(), vec!["Quiet", "Alpha"]);
}

#[tokio::test]
async fn test_refresh_keeps_local_artists_and_ids() {
    let mut browser = CatalogBrowser::new(catalog());
    browser.refresh_artists().await.unwrap();
    let alpha = browser.artists().find(|a| a.name == "Alpha").unwrap().id;
    let bob = browser.add_local_artist("Bob", vec![]).unwrap();

    browser.refresh_artists().await.unwrap();
    let names: Vec<&str> = browser.artists().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Quiet", "Offline", "Bob"]);
    assert_eq!(browser.artists().find(|a| a.name == "Alpha").unwrap().id, alpha);
    assert!(browser.artist(bob).is_some());
}
