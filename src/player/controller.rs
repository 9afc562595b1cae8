use std::sync::Arc;

use super::audio::AudioOutput;
use super::catalog::Catalog;
use super::error::{PlayerError, Result};
use super::{Affordance, Artist, ArtistId, Playback, PlaybackState};

/// Progress indicator: a 0-100 bar value and the `mm:ss / mm:ss` label
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub percent: f64,
    pub timer: String,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            percent: 0.0,
            timer: format!("{} / {}", format_time(0.0), format_time(0.0)),
        }
    }
}

#[derive(Debug)]
struct ActiveList {
    artist: Artist,
    tracks: Vec<String>,
}

/// Single owner of what is playing and how far along it is.
///
/// Holds the active track list of one artist, the playback state and the
/// audio output. Every method finishes its state update before returning.
pub struct PlaybackController<A> {
    audio: A,
    catalog: Arc<dyn Catalog>,
    list: Option<ActiveList>,
    state: PlaybackState,
    progress: Progress,
}

impl<A: AudioOutput> PlaybackController<A> {
    pub fn new(audio: A, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            audio,
            catalog,
            list: None,
            state: PlaybackState::default(),
            progress: Progress::default(),
        }
    }

    /// Make `tracks` the active track list. Any selection is dropped and playback pauses.
    pub fn load_track_list(&mut self, artist: Artist, tracks: Vec<String>) {
        tracing::debug!("Loading {} tracks for {}", tracks.len(), artist.name);
        self.stop();
        self.state.artist = Some(artist.id);
        self.list = Some(ActiveList { artist, tracks });
    }

    /// Drop the active track list altogether
    pub fn clear(&mut self) {
        self.stop();
        self.state.artist = None;
        self.list = None;
    }

    /// Clear the active list if it belongs to `artist`
    pub fn forget_artist(&mut self, artist: ArtistId) {
        if self.list.as_ref().is_some_and(|list| list.artist.id == artist) {
            tracing::debug!("Active artist removed, clearing track list");
            self.clear();
        }
    }

    fn stop(&mut self) {
        if self.state.playing {
            self.audio.pause();
        }
        self.state.index = None;
        self.state.playing = false;
        self.progress = Progress::default();
    }

    /// Start playing track `index` of `artist`.
    ///
    /// Returns `None` without touching anything when `artist` is not the
    /// active artist or `index` is outside its track list.
    pub fn select_track(&mut self, artist: ArtistId, index: usize) -> Option<Playback> {
        let list = self.list.as_ref()?;
        if list.artist.id != artist {
            tracing::debug!("Ignoring selection for inactive artist {}", artist);
            return None;
        }
        let track = list.tracks.get(index)?.clone();

        let playback = if list.artist.is_local() {
            // Nothing to stream, but whatever was playing must stop
            if self.state.playing {
                self.audio.pause();
            }
            Playback::Local { track }
        } else {
            let url = self.catalog.track_url(&list.artist.name, &track);
            self.audio.load(&url);
            self.audio.play();
            Playback::Streaming { track, url }
        };

        self.state = PlaybackState {
            artist: Some(artist),
            index: Some(index),
            playing: true,
        };
        self.progress = Progress::default();

        tracing::info!("Now playing #{}: {}", index, playback.track());
        Some(playback)
    }

    /// Flip between playing and paused. Returns the new `playing` flag.
    pub fn toggle_play_pause(&mut self) -> Result<bool> {
        if self.state.index.is_none() {
            tracing::warn!("Play/pause requested with no track loaded");
            return Err(PlayerError::NoTrackLoaded);
        }

        let streaming = !self.active_is_local();
        if self.state.playing {
            if streaming {
                self.audio.pause();
            }
        } else if streaming {
            self.audio.play();
        }
        self.state.playing = !self.state.playing;

        tracing::debug!("Playback {}", if self.state.playing { "resumed" } else { "paused" });
        Ok(self.state.playing)
    }

    pub fn next(&mut self) -> Option<Playback> {
        self.navigate(true)
    }

    pub fn previous(&mut self) -> Option<Playback> {
        self.navigate(false)
    }

    fn navigate(&mut self, forward: bool) -> Option<Playback> {
        match self.step(forward) {
            Ok(playback) => Some(playback),
            Err(e) => {
                tracing::debug!("Ignoring navigation: {}", e);
                None
            }
        }
    }

    fn step(&mut self, forward: bool) -> Result<Playback> {
        let (artist, len) = match &self.list {
            Some(list) => (list.artist.id, list.tracks.len()),
            None => return Err(PlayerError::OutOfRangeNavigation),
        };

        let target = match (self.state.index, forward) {
            (None, true) => 0,
            (Some(index), true) => index + 1,
            (Some(index), false) if index > 0 => index - 1,
            _ => return Err(PlayerError::OutOfRangeNavigation),
        };
        if target >= len {
            return Err(PlayerError::OutOfRangeNavigation);
        }

        self.select_track(artist, target)
            .ok_or(PlayerError::OutOfRangeNavigation)
    }

    /// Position update from the audio output. Returns false when the duration is unknown.
    pub fn on_progress(&mut self, position: f64, duration: f64) -> bool {
        if !duration.is_finite() || duration <= 0.0 {
            return false;
        }

        self.progress = Progress {
            percent: (position / duration * 100.0).clamp(0.0, 100.0),
            timer: format!("{} / {}", format_time(position), format_time(duration)),
        };
        true
    }

    /// Sample the audio output and refresh the progress indicator
    pub fn tick(&mut self) -> bool {
        if self.state.index.is_none() || self.active_is_local() {
            return false;
        }
        let position = self.audio.position();
        let duration = self.audio.duration().unwrap_or(f64::NAN);
        self.on_progress(position, duration)
    }

    /// Jump to `percent` (0-100) of the current track. No-op until the duration is known.
    pub fn seek(&mut self, percent: f64) -> bool {
        if self.state.index.is_none() || self.active_is_local() || !percent.is_finite() {
            return false;
        }
        let Some(duration) = self.audio.duration().filter(|d| d.is_finite() && *d > 0.0) else {
            tracing::debug!("Seek ignored, duration unknown");
            return false;
        };

        let position = percent.clamp(0.0, 100.0) / 100.0 * duration;
        self.audio.seek(position);
        self.on_progress(position, duration)
    }

    fn active_is_local(&self) -> bool {
        self.list.as_ref().is_some_and(|list| list.artist.is_local())
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn artist(&self) -> Option<&Artist> {
        self.list.as_ref().map(|list| &list.artist)
    }

    pub fn tracks(&self) -> &[String] {
        self.list.as_ref().map(|list| list.tracks.as_slice()).unwrap_or(&[])
    }

    /// Index carrying the now-playing marker
    pub fn now_playing(&self) -> Option<usize> {
        self.state.index
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn affordance(&self) -> Affordance {
        if self.state.playing {
            Affordance::Pause
        } else {
            Affordance::Play
        }
    }
}

/// Format seconds as zero-padded `mm:ss`, floored to whole seconds
pub fn format_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "00:00".to_string();
    }
    let total = secs.floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
