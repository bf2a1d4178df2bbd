use crate::error::AppError;
use crate::settings::{DefaultUser, Settings};
use crate::state::SharedState;
use crate::store::Store;
use crate::world::{is_blank, User};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";

// ── Request/response types ─────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Session,
}

/// The signed-in identity as the views see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub name: String,
}

// ── JWT ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,        // user id
    pub email: String,
    pub name: String,
    pub exp: usize,       // expiry timestamp
    pub iat: usize,       // issued at
}

// ── Helpers ────────────────────────────────────────────────────

pub fn create_token(user: &User, settings: &Settings) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiry = now + Duration::minutes(i64::from(settings.jwt_expiration_in_minutes));

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        exp: expiry.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Token from `Authorization: Bearer …`, else from the session cookie.
fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })
}

/// Resolve the current session. Invalid or expired tokens and tokens for
/// deleted accounts read as signed out.
pub fn session_from_headers(store: &Store, settings: &Settings, headers: &HeaderMap) -> Option<Session> {
    let token = token_from_headers(headers)?;
    let claims = match verify_token(token, &settings.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring invalid session token");
            return None;
        }
    };
    let user = store.user(claims.sub)?;
    Some(Session { email: user.email, name: user.name })
}

fn session_cookie(token: &str, settings: &Settings) -> String {
    let max_age = u64::from(settings.jwt_expiration_in_minutes) * 60;
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}")
}

fn signed_in(user: &User, settings: &Settings) -> Result<Response, AppError> {
    let token = create_token(user, settings)?;
    let cookie = session_cookie(&token, settings);
    let body = LoginResponse {
        token,
        user: Session { email: user.email.clone(), name: user.name.clone() },
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Seed the configured default account if no users exist. Returns true if created.
pub fn ensure_default_user(store: &Store, default_user: &DefaultUser) -> Result<bool, AppError> {
    if store.has_users() {
        return Ok(false);
    }

    let user = User {
        id: Uuid::new_v4(),
        email: default_user.email.trim().to_lowercase(),
        name: default_user.name.clone(),
        password_hash: hash_password(&default_user.password)?,
    };
    Ok(store.insert_user(user)?)
}

// ── Middleware ─────────────────────────────────────────────────

/// Attach `Session` to the request extensions when the caller is signed in.
/// Never rejects: gating is up to each route.
pub async fn resolve_session(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(session) = session_from_headers(&state.store, &state.settings, request.headers()) {
        request.extensions_mut().insert(session);
    }
    next.run(request).await
}

// ── Handlers ───────────────────────────────────────────────────

pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let user = state
        .store
        .user_by_email(payload.email.trim())
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!(email = %user.email, "signed in");
    signed_in(&user, &state.settings)
}

pub async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let email = payload.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".into()));
    }
    if is_blank(&payload.name) {
        return Err(AppError::BadRequest("a display name is required".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::BadRequest("a password is required".into()));
    }

    let user = User {
        id: Uuid::new_v4(),
        email,
        name: payload.name.trim().to_string(),
        password_hash: hash_password(&payload.password)?,
    };
    if !state.store.insert_user(user.clone())? {
        return Err(AppError::EmailTaken);
    }

    tracing::info!(email = %user.email, "registered");
    let mut response = signed_in(&user, &state.settings)?;
    *response.status_mut() = StatusCode::CREATED;
    Ok(response)
}

pub async fn logout() -> impl IntoResponse {
    let cleared = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    (StatusCode::OK, [(header::SET_COOKIE, cleared)])
}
