//! Music Deck - an artist-folder music server and terminal player
//!
//! The server half lists artist folders and streams their songs, with
//! optional signup/login. The player half browses that catalog and drives
//! playback from a single session object.

pub mod auth;
pub mod library;
pub mod player;
pub mod server;
