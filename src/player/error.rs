use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    #[error("Catalog unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Artist not found: {0}")]
    ArtistNotFound(String),

    #[error("Please select a song first!")]
    NoTrackLoaded,

    #[error("No track in that direction")]
    OutOfRangeNavigation,
}

impl From<reqwest::Error> for PlayerError {
    fn from(err: reqwest::Error) -> Self {
        PlayerError::CollaboratorUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
