use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// File extensions served as playable tracks
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav"];

/// A folder of songs laid out as `<root>/<artist>/<track file>`
#[derive(Debug, Clone)]
pub struct SongLibrary {
    root: PathBuf,
}

impl SongLibrary {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Names of all artist folders, sorted
    pub async fn artists(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .with_context(|| format!("Failed to read songs folder: {}", self.root.display()))?;

        let mut artists = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                artists.push(name.to_string());
            }
        }

        artists.sort();
        tracing::debug!("Found {} artist folders", artists.len());
        Ok(artists)
    }

    /// Playable file names in an artist folder, sorted.
    ///
    /// Fails when the folder does not exist or cannot be read.
    pub async fn tracks(&self, artist: &str) -> Result<Vec<String>> {
        let folder = self
            .artist_folder(artist)
            .with_context(|| format!("Invalid artist name: {}", artist))?;

        let mut entries = tokio::fs::read_dir(&folder)
            .await
            .with_context(|| format!("Failed to read folder: {}", folder.display()))?;

        let mut tracks = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_audio_file(&path) || !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                tracks.push(name.to_string());
            }
        }

        tracks.sort();
        Ok(tracks)
    }

    /// Location of a playable track, if it exists
    pub async fn track_path(&self, artist: &str, track: &str) -> Option<PathBuf> {
        let path = self.artist_folder(artist)?.join(safe_segment(track)?);
        if !is_audio_file(&path) {
            return None;
        }

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Some(path),
            _ => None,
        }
    }

    fn artist_folder(&self, artist: &str) -> Option<PathBuf> {
        Some(self.root.join(safe_segment(artist)?))
    }
}

/// Accept a name only if it stays a single path component
fn safe_segment(name: &str) -> Option<&str> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid { None } else { Some(name) }
}

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// MIME type for a track file
pub fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}
