use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand_core::OsRng;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AppError,
    models::{AuthResponse, Claims, Credentials, PublicUser, User},
};

pub fn issue_token(user_id: i64, config: &Config) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.token_ttl_hours);

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token creation failed: {}", e)))
}

fn normalize_credentials(payload: Credentials) -> Result<Credentials, AppError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    Ok(Credentials {
        email,
        password: payload.password,
    })
}

/// Inserts a user row. A concurrent registration that slipped past the
/// existence check still ends as "User already exists".
pub(crate) async fn insert_user(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
) -> Result<i64, AppError> {
    let result = sqlx::query("INSERT INTO users (email, hashed_password, created_at) VALUES (?, ?, ?)")
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(done.last_insert_rowid()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(AppError::Validation("User already exists".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = Credentials,
    responses(
        (status = 201, description = "User created", body = AuthResponse),
        (status = 400, description = "Missing fields or email already registered")
    ),
    tag = "auth"
)]
pub async fn register(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Json(payload): Json<Credentials>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let payload = normalize_credentials(payload)?;

    let user_exists = sqlx::query("SELECT 1 FROM users WHERE email = ?")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await?;

    if user_exists.is_some() {
        return Err(AppError::Validation("User already exists".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(AppError::PasswordHash)?
        .to_string();

    let id = insert_user(&pool, &payload.email, &password_hash).await?;

    tracing::info!(user_id = id, "registered new user");

    let token = issue_token(id, &config)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser {
                id,
                email: payload.email,
            },
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Json(payload): Json<Credentials>,
) -> Result<Json<AuthResponse>, AppError> {
    let payload = normalize_credentials(payload)?;
    let invalid = || AppError::Validation("Invalid credentials".to_string());

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(invalid)?;

    let parsed_hash = PasswordHash::new(&user.hashed_password)
        .map_err(|_| AppError::Internal("Invalid password hash in DB".to_string()))?;

    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    let token = issue_token(user.id, &config)?;
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}
