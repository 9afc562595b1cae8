use anyhow::{Context, Result};
use clap::Parser;
use music_deck::auth::token::TokenSigner;
use music_deck::auth::{AuthService, UserDatabase};
use music_deck::library::SongLibrary;
use music_deck::server;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "music-deck")]
#[command(about = "Music Deck Server", long_about = None)]
struct Cli {
    /// Folder holding one sub-folder of songs per artist
    #[arg(short, long, env = "SONGS_DIR", default_value = "songs")]
    songs: PathBuf,

    /// Folder of static files for the web front end
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    public: PathBuf,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Path of the SQLite user database
    #[arg(long, env = "AUTH_DB_PATH", default_value = "data/users.db")]
    auth_db: PathBuf,

    /// Secret for signing session tokens; auth endpoints are disabled without it
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine, the environment may already be set
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();

    // Validate songs path
    if !cli.songs.exists() {
        anyhow::bail!("Songs path does not exist: {}", cli.songs.display());
    }

    if !cli.songs.is_dir() {
        anyhow::bail!("Songs path is not a directory: {}", cli.songs.display());
    }

    tracing::info!("Starting Music Deck");
    tracing::info!("Songs path: {}", cli.songs.display());

    let library = SongLibrary::new(cli.songs);

    let auth = match cli.jwt_secret.filter(|s| !s.is_empty()) {
        Some(secret) => {
            let users = UserDatabase::new(&cli.auth_db)
                .await
                .context("Failed to open user database")?;
            Some(AuthService::new(users, TokenSigner::new(secret)))
        }
        None => {
            tracing::warn!("JWT_SECRET not set, running without signup/login");
            None
        }
    };
    let auth_enabled = auth.is_some();

    let app = server::create_router(library, auth, &cli.public);
    let addr = format!("0.0.0.0:{}", cli.port);

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /artists              - List artists");
    tracing::info!("  GET  /songs/:artist        - List songs of an artist");
    tracing::info!("  GET  /songs/:artist/:song  - Stream a song");
    if auth_enabled {
        tracing::info!("  POST /api/auth/signup      - Create an account");
        tracing::info!("  POST /api/auth/login       - Get a session token");
    }
    tracing::info!("Static files: {}", cli.public.display());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
