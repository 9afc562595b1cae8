#![allow(dead_code)]

use async_trait::async_trait;
use music_deck::player::audio::AudioOutput;
use music_deck::player::catalog::Catalog;
use music_deck::player::error::{PlayerError, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    Load(String),
    Play,
    Pause,
    Seek(f64),
}

#[derive(Default)]
struct FakeAudioState {
    calls: Vec<AudioCall>,
    position: f64,
    duration: Option<f64>,
}

/// Audio output that records every command; clones share state
#[derive(Clone, Default)]
pub struct FakeAudio {
    state: Rc<RefCell<FakeAudioState>>,
}

impl FakeAudio {
    pub fn calls(&self) -> Vec<AudioCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn set_clock(&self, position: f64, duration: Option<f64>) {
        let mut state = self.state.borrow_mut();
        state.position = position;
        state.duration = duration;
    }
}

impl AudioOutput for FakeAudio {
    fn load(&mut self, url: &str) {
        let mut state = self.state.borrow_mut();
        state.calls.push(AudioCall::Load(url.to_string()));
        state.position = 0.0;
        state.duration = None;
    }

    fn play(&mut self) {
        self.state.borrow_mut().calls.push(AudioCall::Play);
    }

    fn pause(&mut self) {
        self.state.borrow_mut().calls.push(AudioCall::Pause);
    }

    fn seek(&mut self, secs: f64) {
        let mut state = self.state.borrow_mut();
        state.calls.push(AudioCall::Seek(secs));
        state.position = secs;
    }

    fn position(&self) -> f64 {
        self.state.borrow().position
    }

    fn duration(&self) -> Option<f64> {
        self.state.borrow().duration
    }
}

/// In-memory catalog that counts track list requests
#[derive(Default)]
pub struct FakeCatalog {
    artists: Vec<String>,
    tracks: HashMap<String, Result<Vec<String>>>,
    requests: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artist(mut self, name: &str, tracks: &[&str]) -> Self {
        self.artists.push(name.to_string());
        self.tracks.insert(
            name.to_string(),
            Ok(tracks.iter().map(|t| t.to_string()).collect()),
        );
        self
    }

    pub fn with_failing_artist(mut self, name: &str, error: PlayerError) -> Self {
        self.artists.push(name.to_string());
        self.tracks.insert(name.to_string(), Err(error));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn artists(&self) -> Result<Vec<String>> {
        Ok(self.artists.clone())
    }

    async fn tracks(&self, artist: &str) -> Result<Vec<String>> {
        self.requests.lock().unwrap().push(artist.to_string());
        self.tracks
            .get(artist)
            .cloned()
            .unwrap_or_else(|| Err(PlayerError::ArtistNotFound(artist.to_string())))
    }

    fn track_url(&self, artist: &str, track: &str) -> String {
        format!("http://catalog/songs/{}/{}", artist, track)
    }
}
