pub mod password;
pub mod token;

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use self::token::{TokenError, TokenSigner};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("All fields are required")]
    MissingField,
    #[error("User already exists")]
    UserExists,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Token(#[from] TokenError),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

/// Missing fields read as empty and are rejected by [`AuthService::signup`]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct UserDatabase {
    pool: SqlitePool,
}

impl UserDatabase {
    /// Create a new user database connection
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        tracing::debug!("Connecting to user database: {}", db_url);

        let pool = SqlitePool::connect(&db_url).await.with_context(|| {
            format!("Failed to connect to user database at: {}", db_path.display())
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("Failed to create users table")?;

        tracing::info!("User database initialized: {}", db_path.display());

        Ok(Self { pool })
    }

    /// Insert a user. Returns `None` if the email is already registered.
    pub async fn insert_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Some(User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                created_at: now,
            })),
            Err(e)
                if e.as_database_error()
                    .is_some_and(|db| db.is_unique_violation()) =>
            {
                Ok(None)
            }
            Err(e) => Err(e).context("Failed to insert user"),
        }
    }

    /// Look up a user and their stored password hash by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<(User, String)>> {
        let row = sqlx::query_as::<_, (String, String, String, String, String)>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        Ok(row.map(|(id, name, email, password_hash, created_at)| {
            (
                User {
                    id,
                    name,
                    email,
                    created_at,
                },
                password_hash,
            )
        }))
    }
}

/// Signup and login against the user database
#[derive(Clone)]
pub struct AuthService {
    users: UserDatabase,
    signer: Arc<TokenSigner>,
}

impl AuthService {
    pub fn new(users: UserDatabase, signer: TokenSigner) -> Self {
        Self {
            users,
            signer: Arc::new(signer),
        }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<User, AuthError> {
        let email = request.email.trim();
        if request.name.trim().is_empty() || email.is_empty() || request.password.is_empty() {
            return Err(AuthError::MissingField);
        }

        if self.users.find_by_email(email).await?.is_some() {
            tracing::debug!("Signup rejected, {} already registered", email);
            return Err(AuthError::UserExists);
        }

        let password = request.password;
        let hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
            .await
            .context("Password hashing task failed")??;

        let user = self
            .users
            .insert_user(request.name.trim(), email, &hash)
            .await?
            .ok_or(AuthError::UserExists)?;

        tracing::info!("Registered user {} ({})", user.email, user.id);
        Ok(user)
    }

    /// Check credentials and issue a session token
    pub async fn login(&self, request: LoginRequest) -> Result<String, AuthError> {
        let (user, hash) = self
            .users
            .find_by_email(request.email.trim())
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let password = request.password;
        let matches =
            tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
                .await
                .context("Password check task failed")?;
        if !matches {
            tracing::debug!("Wrong password for {}", user.email);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.signer.issue(&user.id)?;
        tracing::info!("User {} logged in", user.email);
        Ok(token)
    }
}
