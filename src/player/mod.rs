//! Player core: catalog browsing, playback state and transport controls
//!
//! A [`session::Session`] owns one [`browser::CatalogBrowser`] and one
//! [`controller::PlaybackController`] and feeds them user input events.
//! Nothing in here knows about terminals or HTTP servers; the catalog and
//! the audio device are reached through the [`catalog::Catalog`] and
//! [`audio::AudioOutput`] traits.

pub mod audio;
pub mod browser;
pub mod catalog;
pub mod controller;
pub mod error;
pub mod session;

use std::fmt;
use uuid::Uuid;

pub use error::PlayerError;

/// Identity of one entry in the visible artist set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtistId(Uuid);

impl ArtistId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArtistId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an artist's track list comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Listed by the catalog, tracks are fetched on selection
    Remote,
    /// Added during this session, tracks are held in memory
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub origin: Origin,
}

impl Artist {
    pub fn remote(name: impl Into<String>) -> Self {
        Self {
            id: ArtistId::new(),
            name: name.into(),
            origin: Origin::Remote,
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self {
            id: ArtistId::new(),
            name: name.into(),
            origin: Origin::Local,
        }
    }

    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }
}

/// What is playing and whether it is running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub artist: Option<ArtistId>,
    pub index: Option<usize>,
    pub playing: bool,
}

impl PlaybackState {
    /// The selected index with `-1` standing for "nothing selected"
    pub fn raw_index(&self) -> isize {
        self.index.map(|i| i as isize).unwrap_or(-1)
    }
}

/// How a selected track was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playback {
    /// Streaming from the catalog address
    Streaming { track: String, url: String },
    /// Session-only artist: acknowledged without touching the audio output
    Local { track: String },
}

impl Playback {
    pub fn track(&self) -> &str {
        match self {
            Playback::Streaming { track, .. } | Playback::Local { track } => track,
        }
    }
}

/// Icon shown on the play/pause control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    Play,
    Pause,
}

impl Affordance {
    pub fn icon(&self) -> &'static str {
        match self {
            Affordance::Play => "play_arrow",
            Affordance::Pause => "pause",
        }
    }
}
