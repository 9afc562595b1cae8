use std::collections::HashMap;
use std::sync::Arc;

use super::catalog::Catalog;
use super::error::{PlayerError, Result};
use super::{Artist, ArtistId};

/// What the track pane currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum TrackPane {
    Idle,
    Loading { artist: Artist },
    Loaded { artist: Artist, tracks: Vec<String> },
    Empty { artist: Artist },
    Error { artist: Artist, error: PlayerError },
}

impl TrackPane {
    pub fn artist(&self) -> Option<&Artist> {
        match self {
            TrackPane::Idle => None,
            TrackPane::Loading { artist }
            | TrackPane::Loaded { artist, .. }
            | TrackPane::Empty { artist }
            | TrackPane::Error { artist, .. } => Some(artist),
        }
    }

    pub fn tracks(&self) -> &[String] {
        match self {
            TrackPane::Loaded { tracks, .. } => tracks,
            _ => &[],
        }
    }

    /// Text shown in place of the track list, if any
    pub fn placeholder(&self) -> Option<String> {
        match self {
            TrackPane::Idle | TrackPane::Loaded { .. } => None,
            TrackPane::Loading { .. } => Some("Loading songs...".to_string()),
            TrackPane::Empty { artist } => Some(format!("No songs found for {}", artist.name)),
            TrackPane::Error { artist, .. } => {
                Some(format!("Error loading songs for {}", artist.name))
            }
        }
    }
}

/// One rendered row of the track pane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    pub index: usize,
    pub name: String,
    pub visible: bool,
    pub now_playing: bool,
}

#[derive(Debug)]
struct Entry {
    artist: Artist,
    /// In-memory track list of a local artist
    tracks: Option<Vec<String>>,
}

/// A track list fetch in flight. Only the most recently begun request may
/// change the pane once it completes.
#[derive(Debug)]
pub struct LoadRequest {
    ticket: u64,
    artist: Artist,
    local: Option<Vec<String>>,
}

impl LoadRequest {
    pub fn artist(&self) -> &Artist {
        &self.artist
    }

    /// Resolve the track list: in memory for local artists, otherwise from the catalog.
    ///
    /// Owns everything it needs so the fetch can be polled alongside other events.
    pub async fn run(self, catalog: Arc<dyn Catalog>) -> LoadResult {
        let result = match self.local {
            Some(tracks) => Ok(tracks),
            None => catalog.tracks(&self.artist.name).await,
        };
        LoadResult {
            ticket: self.ticket,
            artist: self.artist,
            result,
        }
    }
}

#[derive(Debug)]
pub struct LoadResult {
    ticket: u64,
    artist: Artist,
    result: Result<Vec<String>>,
}

/// Visible artist set, the track pane and the live search query
pub struct CatalogBrowser {
    catalog: Arc<dyn Catalog>,
    entries: Vec<Entry>,
    pane: TrackPane,
    query: String,
    ticket: u64,
}

impl CatalogBrowser {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            entries: Vec::new(),
            pane: TrackPane::Idle,
            query: String::new(),
            ticket: 0,
        }
    }

    pub fn catalog(&self) -> Arc<dyn Catalog> {
        Arc::clone(&self.catalog)
    }

    /// Replace the remote artists with the catalog's current list. Local
    /// artists are kept after them; remote artists that are still listed keep their id.
    pub async fn refresh_artists(&mut self) -> Result<usize> {
        let names = self.catalog.artists().await?;

        let mut known: HashMap<String, Artist> = HashMap::new();
        for entry in self.entries.iter().filter(|e| !e.artist.is_local()) {
            known
                .entry(entry.artist.name.clone())
                .or_insert_with(|| entry.artist.clone());
        }

        let remote: Vec<Entry> = names
            .into_iter()
            .map(|name| Entry {
                artist: known.remove(&name).unwrap_or_else(|| Artist::remote(name)),
                tracks: None,
            })
            .collect();
        let count = remote.len();

        self.entries.retain(|e| e.artist.is_local());
        self.entries.splice(0..0, remote);

        tracing::info!("Catalog lists {} artists", count);
        Ok(count)
    }

    pub fn artists(&self) -> impl Iterator<Item = &Artist> {
        self.entries.iter().map(|e| &e.artist)
    }

    pub fn artist(&self, id: ArtistId) -> Option<&Artist> {
        self.entries
            .iter()
            .find(|e| e.artist.id == id)
            .map(|e| &e.artist)
    }

    /// Add a session-only artist. Returns `None` if the name is blank.
    pub fn add_local_artist(&mut self, name: &str, tracks: Vec<String>) -> Option<ArtistId> {
        let name = name.trim();
        if name.is_empty() {
            tracing::debug!("Refusing local artist with empty name");
            return None;
        }

        let tracks: Vec<String> = tracks
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        let artist = Artist::local(name);
        let id = artist.id;
        tracing::info!("Added local artist {} with {} tracks", name, tracks.len());
        self.entries.push(Entry {
            artist,
            tracks: Some(tracks),
        });
        Some(id)
    }

    /// Remove an artist from the visible set after `confirm` agrees.
    ///
    /// Local artists are gone for good. A remote artist only disappears until
    /// the next [`refresh_artists`](Self::refresh_artists).
    pub fn remove_artist(&mut self, id: ArtistId, confirm: impl FnOnce(&Artist) -> bool) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.artist.id == id) else {
            return false;
        };

        if !confirm(&self.entries[pos].artist) {
            return false;
        }

        let entry = self.entries.remove(pos);
        if self.pane.artist().is_some_and(|a| a.id == id) {
            // A fetch still in flight for this artist must not bring the pane back
            self.ticket += 1;
            self.pane = TrackPane::Idle;
        }
        tracing::info!("Removed artist {}", entry.artist.name);
        true
    }

    /// Show the loading placeholder for `id` and hand out the fetch to run.
    /// Any earlier request still in flight loses its claim on the pane.
    pub fn begin_load(&mut self, id: ArtistId) -> Option<LoadRequest> {
        let entry = self.entries.iter().find(|e| e.artist.id == id)?;
        self.ticket += 1;

        let request = LoadRequest {
            ticket: self.ticket,
            artist: entry.artist.clone(),
            local: entry.tracks.clone(),
        };
        self.pane = TrackPane::Loading {
            artist: entry.artist.clone(),
        };
        Some(request)
    }

    /// Apply a completed fetch. Returns false if a newer selection superseded it.
    pub fn finish_load(&mut self, loaded: LoadResult) -> bool {
        if loaded.ticket != self.ticket {
            tracing::debug!(
                "Discarding stale track list for {} (request #{}, current #{})",
                loaded.artist.name,
                loaded.ticket,
                self.ticket
            );
            return false;
        }

        self.pane = match loaded.result {
            Ok(tracks) if tracks.is_empty() => TrackPane::Empty {
                artist: loaded.artist,
            },
            Ok(tracks) => TrackPane::Loaded {
                artist: loaded.artist,
                tracks,
            },
            Err(error) => {
                tracing::error!("Error loading songs for {}: {}", loaded.artist.name, error);
                TrackPane::Error {
                    artist: loaded.artist,
                    error,
                }
            }
        };
        true
    }

    /// Select `id` and wait for its track list
    pub async fn load_tracks_for(&mut self, id: ArtistId) -> Option<&TrackPane> {
        let request = self.begin_load(id)?;
        let loaded = request.run(self.catalog()).await;
        self.finish_load(loaded);
        Some(&self.pane)
    }

    pub fn pane(&self) -> &TrackPane {
        &self.pane
    }

    /// Set the search query. Only visibility changes, never the lists.
    pub fn filter(&mut self, query: &str) {
        self.query = query.trim().to_lowercase();
    }

    /// The active query, trimmed and lowercased
    pub fn query(&self) -> &str {
        &self.query
    }

    fn matches(&self, text: &str) -> bool {
        self.query.is_empty() || text.to_lowercase().contains(&self.query)
    }

    pub fn is_visible(&self, artist: &Artist) -> bool {
        self.matches(&artist.name)
    }

    pub fn visible_artists(&self) -> impl Iterator<Item = &Artist> {
        self.artists().filter(move |a| self.is_visible(a))
    }

    /// Rows of the track pane with visibility applied and the marker on `now_playing`
    pub fn track_rows(&self, now_playing: Option<usize>) -> Vec<TrackRow> {
        self.pane
            .tracks()
            .iter()
            .enumerate()
            .map(|(index, name)| TrackRow {
                index,
                name: name.clone(),
                visible: self.matches(name),
                now_playing: now_playing == Some(index),
            })
            .collect()
    }
}
