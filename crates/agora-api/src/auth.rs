use std::path::PathBuf;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use agora_db::Database;
use agora_types::api::{Claims, LoginRequest, RegisterRequest, SessionResponse};
use agora_types::models::MemberGroup;

use crate::dispatch::RequestParams;
use crate::error::ActionError;
use crate::run_blocking;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    /// Signs session tokens.
    pub jwt_secret: String,
    /// Keys unsubscribe-token HMACs.
    pub auth_secret: String,
    pub attachments_dir: PathBuf,
    /// Public URL of the dispatcher, used in emailed links.
    pub board_url: String,
}

// -- JSON endpoints --

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ActionError> {
    let session = run_blocking(move || {
        register_member(&state.db, &state.jwt_secret, &req.username, &req.password, &req.email)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ActionError> {
    let session =
        run_blocking(move || login_member(&state.db, &state.jwt_secret, &req.username, &req.password)).await?;
    Ok(Json(session))
}

// -- Dispatcher actions (form fields `user`, `passwrd`, `email`) --

pub(crate) async fn register_action(state: AppState, params: RequestParams) -> Result<Response, ActionError> {
    let username = params.get("user").unwrap_or_default().to_string();
    let password = params.get("passwrd").unwrap_or_default().to_string();
    let email = params.get("email").unwrap_or_default().to_string();

    let session =
        run_blocking(move || register_member(&state.db, &state.jwt_secret, &username, &password, &email)).await?;
    Ok((StatusCode::CREATED, Json(session)).into_response())
}

pub(crate) async fn login_action(state: AppState, params: RequestParams) -> Result<Response, ActionError> {
    let username = params.require("user")?.to_string();
    let password = params.require("passwrd")?.to_string();

    let session = run_blocking(move || login_member(&state.db, &state.jwt_secret, &username, &password)).await?;
    Ok(Json(session).into_response())
}

pub fn register_member(
    db: &Database,
    jwt_secret: &str,
    username: &str,
    password: &str,
    email: &str,
) -> Result<SessionResponse, ActionError> {
    let username = username.trim();
    let email = email.trim();

    let mut errors = Vec::new();
    let name_len = username.chars().count();
    if !(3..=32).contains(&name_len) {
        errors.push("username_invalid");
    }
    if password.len() < 8 {
        errors.push("password_too_short");
    }
    if !is_valid_email(email) {
        errors.push("email_invalid");
    }
    if !errors.is_empty() {
        return Err(ActionError::Validation(errors));
    }

    if db.get_member_by_name(username)?.is_some() {
        return Err(ActionError::fatal("username_taken", StatusCode::CONFLICT));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let member_id = db.create_member(username, email, &password_hash, MemberGroup::Member.id())?;
    info!("Registered member {} ({})", username, member_id);

    let token = create_token(jwt_secret, member_id, username)?;
    Ok(SessionResponse {
        member_id,
        member_name: username.to_string(),
        token,
    })
}

pub fn login_member(db: &Database, jwt_secret: &str, username: &str, password: &str) -> Result<SessionResponse, ActionError> {
    let member = db
        .get_member_by_name(username.trim())?
        .ok_or_else(|| ActionError::unauthorized("login_failed"))?;

    let parsed_hash =
        PasswordHash::new(&member.password).map_err(|e| anyhow::anyhow!("stored hash unreadable: {}", e))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ActionError::unauthorized("login_failed"))?;

    let token = create_token(jwt_secret, member.id, &member.name)?;
    info!("Member {} logged in", member.id);

    Ok(SessionResponse {
        member_id: member.id,
        member_name: member.name,
        token,
    })
}

pub fn create_token(secret: &str, member_id: i64, name: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: member_id.to_string(),
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
