use std::sync::Arc;

use super::audio::AudioOutput;
use super::browser::{CatalogBrowser, LoadResult, TrackPane, TrackRow};
use super::catalog::Catalog;
use super::controller::PlaybackController;
use super::error::{PlayerError, Result};
use super::{ArtistId, Playback};

/// Structured replacement for the "name, then comma separated songs" prompts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLocalArtist {
    pub name: String,
    pub tracks: Vec<String>,
}

impl NewLocalArtist {
    /// Parse `name | track, track, ...`. The track part is optional.
    pub fn parse(input: &str) -> Self {
        let (name, tracks) = input.split_once('|').unwrap_or((input, ""));
        Self {
            name: name.trim().to_string(),
            tracks: tracks
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Everything the user can do to the player
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    SelectArtist(ArtistId),
    /// Select a row of the track pane
    SelectTrack(usize),
    TogglePlayPause,
    Next,
    Previous,
    /// Playback position changed
    Tick,
    /// Move to a percentage of the current track
    Seek(f64),
    Search(String),
    AddLocalArtist(NewLocalArtist),
    /// Drop an artist from the visible set once the user confirmed
    RemoveArtist { id: ArtistId, confirmed: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing the user needs to be told about
    Idle,
    Playing(Playback),
    Toggled { playing: bool },
    /// The track pane changed, see [`Session::pane`]
    TracksShown,
    ArtistAdded(ArtistId),
    ArtistRemoved,
    /// Must be acknowledged by the user before going on
    Warning(PlayerError),
}

/// One player: the catalog browser and the playback controller it feeds
pub struct Session<A> {
    browser: CatalogBrowser,
    controller: PlaybackController<A>,
}

impl<A: AudioOutput> Session<A> {
    pub fn new(catalog: Arc<dyn Catalog>, audio: A) -> Self {
        Self {
            browser: CatalogBrowser::new(Arc::clone(&catalog)),
            controller: PlaybackController::new(audio, catalog),
        }
    }

    /// Fetch the remote artist list
    pub async fn start(&mut self) -> Result<usize> {
        self.browser.refresh_artists().await
    }

    pub async fn handle(&mut self, input: Input) -> Outcome {
        match input {
            Input::SelectArtist(id) => {
                let Some(request) = self.browser.begin_load(id) else {
                    tracing::debug!("Unknown artist {}", id);
                    return Outcome::Idle;
                };
                let loaded = request.run(self.browser.catalog()).await;
                if self.apply_load(loaded) {
                    Outcome::TracksShown
                } else {
                    Outcome::Idle
                }
            }
            Input::SelectTrack(index) => {
                let Some(artist) = self.browser.pane().artist().map(|a| a.id) else {
                    return Outcome::Idle;
                };
                self.controller
                    .select_track(artist, index)
                    .map_or(Outcome::Idle, Outcome::Playing)
            }
            Input::TogglePlayPause => match self.controller.toggle_play_pause() {
                Ok(playing) => Outcome::Toggled { playing },
                Err(e) => Outcome::Warning(e),
            },
            Input::Next => self
                .controller
                .next()
                .map_or(Outcome::Idle, Outcome::Playing),
            Input::Previous => self
                .controller
                .previous()
                .map_or(Outcome::Idle, Outcome::Playing),
            Input::Tick => {
                self.controller.tick();
                Outcome::Idle
            }
            Input::Seek(percent) => {
                self.controller.seek(percent);
                Outcome::Idle
            }
            Input::Search(query) => {
                self.browser.filter(&query);
                Outcome::Idle
            }
            Input::AddLocalArtist(new) => self
                .browser
                .add_local_artist(&new.name, new.tracks)
                .map_or(Outcome::Idle, Outcome::ArtistAdded),
            Input::RemoveArtist { id, confirmed } => {
                if self.browser.remove_artist(id, |_| confirmed) {
                    self.controller.forget_artist(id);
                    Outcome::ArtistRemoved
                } else {
                    Outcome::Idle
                }
            }
        }
    }

    /// Apply a fetch started with [`CatalogBrowser::begin_load`] and hand the
    /// resulting list to the controller. Returns false for superseded fetches.
    pub fn apply_load(&mut self, loaded: LoadResult) -> bool {
        if !self.browser.finish_load(loaded) {
            return false;
        }

        match self.browser.pane() {
            TrackPane::Loaded { artist, tracks } => {
                self.controller
                    .load_track_list(artist.clone(), tracks.clone());
            }
            TrackPane::Empty { artist } => {
                self.controller.load_track_list(artist.clone(), Vec::new());
            }
            TrackPane::Error { .. } => self.controller.clear(),
            TrackPane::Idle | TrackPane::Loading { .. } => {}
        }
        true
    }

    pub fn browser(&self) -> &CatalogBrowser {
        &self.browser
    }

    pub fn browser_mut(&mut self) -> &mut CatalogBrowser {
        &mut self.browser
    }

    pub fn controller(&self) -> &PlaybackController<A> {
        &self.controller
    }

    pub fn pane(&self) -> &TrackPane {
        self.browser.pane()
    }

    /// Track pane rows; the marker only shows when the pane holds the active list
    pub fn track_rows(&self) -> Vec<TrackRow> {
        let active = self.controller.artist().map(|a| a.id);
        let shown = self.browser.pane().artist().map(|a| a.id);
        let now_playing = if active.is_some() && active == shown {
            self.controller.now_playing()
        } else {
            None
        };
        self.browser.track_rows(now_playing)
    }
}
