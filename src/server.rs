use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::Response,
    routing::{get, post},
};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthError, AuthService, LoginRequest, SignupRequest};
use crate::library::{self, SongLibrary};

#[derive(Clone)]
pub struct AppState {
    pub library: SongLibrary,
}

/// Build the application router.
///
/// The auth endpoints are only mounted when an [`AuthService`] is given.
pub fn create_router(
    library: SongLibrary,
    auth: Option<AuthService>,
    public_dir: &std::path::Path,
) -> Router {
    let state = AppState { library };

    let mut router = Router::new()
        .route("/artists", get(list_artists))
        .route("/songs/:artist", get(list_songs))
        .route("/songs/:artist/:song", get(stream_song));

    match auth {
        Some(auth) => router = router.nest("/api/auth", auth_routes(auth)),
        None => tracing::info!("No token secret configured, auth endpoints disabled"),
    }

    router
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn auth_routes<S>(auth: AuthService) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .with_state(auth)
}

/// List all artist folders
async fn list_artists(State(state): State<AppState>) -> Result<Json<Vec<String>>, StatusCode> {
    tracing::debug!("Fetching all artists");
    let artists = state.library.artists().await.map_err(|e| {
        tracing::error!("Failed to list artists: {:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    tracing::debug!("Returning {} artists", artists.len());
    Ok(Json(artists))
}

/// List the playable files of one artist. Unknown artists get `404` with an empty array.
async fn list_songs(
    State(state): State<AppState>,
    Path(artist): Path<String>,
) -> (StatusCode, Json<Vec<String>>) {
    tracing::debug!("Fetching songs for artist: {}", artist);
    match state.library.tracks(&artist).await {
        Ok(tracks) => {
            tracing::debug!("Returning {} songs for {}", tracks.len(), artist);
            (StatusCode::OK, Json(tracks))
        }
        Err(e) => {
            tracing::warn!("Error reading folder: {:#}", e);
            (StatusCode::NOT_FOUND, Json(Vec::new()))
        }
    }
}

/// Stream a song with HTTP Range support
async fn stream_song(
    State(state): State<AppState>,
    Path((artist, song)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let path = state
        .library
        .track_path(&artist, &song)
        .await
        .ok_or_else(|| {
            tracing::warn!("Song {}/{} not found", artist, song);
            StatusCode::NOT_FOUND
        })?;

    tracing::debug!("Streaming file: {}", path.display());
    let content_type = library::content_type(&path);

    let file_size = tokio::fs::metadata(&path)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .len();
    let mut file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Invalid or unsatisfiable ranges fall back to the whole file
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_range(value, file_size));

    let response = match range {
        Some((start, end)) => {
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            let length = end - start + 1;
            tracing::debug!("Streaming range {}-{}/{} ({} bytes)", start, end, file_size, length);

            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, length)
                .header(header::ACCEPT_RANGES, "bytes")
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, file_size),
                )
                .body(Body::from_stream(ReaderStream::new(file.take(length))))
        }
        None => {
            tracing::debug!("Streaming {} bytes for {}/{}", file_size, artist, song);
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, file_size)
                .header(header::ACCEPT_RANGES, "bytes")
                .body(Body::from_stream(ReaderStream::new(file)))
        }
    };

    response.map_err(|e| {
        tracing::error!("Failed to build stream response: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Parse a `Range` header value into an inclusive `(start, end)` byte range
fn parse_range(range: &str, file_size: u64) -> Option<(u64, u64)> {
    // "bytes=start-end", "bytes=start-" or "bytes=-suffix"
    let (start, end) = range.strip_prefix("bytes=")?.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    match (start.is_empty(), end.is_empty()) {
        (false, false) => {
            let start = start.parse::<u64>().ok()?;
            let end = end.parse::<u64>().ok()?;
            if start > end || start >= file_size {
                return None;
            }
            Some((start, end.min(file_size - 1)))
        }
        (false, true) => {
            let start = start.parse::<u64>().ok()?;
            if start >= file_size {
                return None;
            }
            Some((start, file_size - 1))
        }
        (true, false) => {
            let suffix = end.parse::<u64>().ok()?;
            if suffix == 0 || file_size == 0 {
                return None;
            }
            Some((file_size.saturating_sub(suffix), file_size - 1))
        }
        (true, true) => None,
    }
}

// ========== AUTH ENDPOINTS ==========

#[derive(Debug, Serialize)]
struct AuthReply {
    msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

fn auth_reply(msg: &str, token: Option<String>) -> Json<AuthReply> {
    Json(AuthReply {
        msg: msg.to_string(),
        token,
    })
}

fn auth_failure(error: AuthError) -> (StatusCode, Json<AuthReply>) {
    let status = match &error {
        AuthError::MissingField
        | AuthError::UserExists
        | AuthError::UserNotFound
        | AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
        AuthError::Token(_) | AuthError::Internal(_) => {
            tracing::error!("Auth failure: {}", error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, auth_reply(&error.to_string(), None))
}

/// Unreadable request bodies still get a `{msg}` reply
fn bad_body(rejection: JsonRejection) -> (StatusCode, Json<AuthReply>) {
    tracing::debug!("Rejected auth body: {}", rejection.body_text());
    (rejection.status(), auth_reply(&rejection.body_text(), None))
}

/// Register a new user
async fn signup(
    State(auth): State<AuthService>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> (StatusCode, Json<AuthReply>) {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    tracing::debug!("Signup request for {}", request.email);
    match auth.signup(request).await {
        Ok(_) => (StatusCode::OK, auth_reply("Signup successful", None)),
        Err(e) => auth_failure(e),
    }
}

/// Check credentials and hand out a session token
async fn login(
    State(auth): State<AuthService>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> (StatusCode, Json<AuthReply>) {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    tracing::debug!("Login request for {}", request.email);
    match auth.login(request).await {
        Ok(token) => (StatusCode::OK, auth_reply("Login successful", Some(token))),
        Err(e) => auth_failure(e),
    }
}
