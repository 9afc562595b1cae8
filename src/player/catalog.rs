//! Remote collaborators of the player
//!
//! The [`Catalog`] trait is the seam between the player core and whatever
//! answers "which tracks does this artist have" and "where are the bytes".
//! [`HttpCatalog`] talks to a `music-deck` server; tests plug in their own.

use super::error::{PlayerError, Result};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for one catalog or auth request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of artists and their playable tracks
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Names of the artists the catalog knows about
    async fn artists(&self) -> Result<Vec<String>>;

    /// Ordered track identifiers for one artist
    async fn tracks(&self, artist: &str) -> Result<Vec<String>>;

    /// Address of the playable resource for `track` of `artist`
    fn track_url(&self, artist: &str, track: &str) -> String;
}

/// Catalog backed by the `/artists` and `/songs` endpoints of a music-deck server
#[derive(Clone)]
pub struct HttpCatalog {
    base: Url,
    client: reqwest::Client,
}

impl HttpCatalog {
    pub fn new(server: &str) -> anyhow::Result<Self> {
        Ok(Self {
            base: parse_base(server)?,
            client: http_client()?,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        endpoint(&self.base, segments)
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn artists(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&["artists"]);
        tracing::debug!("Fetching artists from {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(PlayerError::CollaboratorUnavailable(format!(
                "server returned {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    async fn tracks(&self, artist: &str) -> Result<Vec<String>> {
        let url = self.endpoint(&["songs", artist]);
        tracing::debug!("Fetching tracks for {} from {}", artist, url);

        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::warn!("Artist {} not found on server", artist);
                Err(PlayerError::ArtistNotFound(artist.to_string()))
            }
            status if !status.is_success() => Err(PlayerError::CollaboratorUnavailable(
                format!("server returned {}", status),
            )),
            _ => Ok(response.json().await?),
        }
    }

    fn track_url(&self, artist: &str, track: &str) -> String {
        self.endpoint(&["songs", artist, track]).to_string()
    }
}

#[derive(Debug, Serialize)]
struct SignupRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Server answer to a signup or login attempt
#[derive(Debug, Clone, Deserialize)]
pub struct AuthReply {
    pub msg: String,
    pub token: Option<String>,
}

/// Client for the `/api/auth` endpoints
#[derive(Clone)]
pub struct AuthClient {
    base: Url,
    client: reqwest::Client,
}

impl AuthClient {
    pub fn new(server: &str) -> anyhow::Result<Self> {
        Ok(Self {
            base: parse_base(server)?,
            client: http_client()?,
        })
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> anyhow::Result<AuthReply> {
        let url = endpoint(&self.base, &["api", "auth", "signup"]);
        let body = SignupRequest {
            name,
            email,
            password,
        };
        self.post(url, &body).await
    }

    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<AuthReply> {
        let url = endpoint(&self.base, &["api", "auth", "login"]);
        let body = LoginRequest { email, password };
        self.post(url, &body).await
    }

    async fn post<B: Serialize>(&self, url: Url, body: &B) -> anyhow::Result<AuthReply> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to connect to server")?;

        // Rejections still carry a `msg` body, so only the status is logged here
        if !response.status().is_success() {
            tracing::debug!("Auth request rejected: {}", response.status());
        }

        response.json().await.context("Failed to parse response")
    }
}

fn http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

fn parse_base(server: &str) -> anyhow::Result<Url> {
    let base = Url::parse(server).with_context(|| format!("Invalid server URL: {}", server))?;
    if base.cannot_be_a_base() {
        anyhow::bail!("Server URL cannot carry a path: {}", server);
    }
    Ok(base)
}

fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
