use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::{Rng, distr::Alphanumeric};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::info;
use validator::Validate;

use orderhub_db::models::NewUser;
use orderhub_types::api::{
    Claims, ConfirmEmailRequest, LoginRequest, LoginResponse, PasswordResetConfirmRequest,
    PasswordResetRequest, RegisterRequest, RegisterResponse,
};
use orderhub_types::events::Notification;
use orderhub_types::models::UserType;

use crate::error::AppError;
use crate::extract::Json;
use crate::{AppState, blocking};

const TOKEN_LEN: usize = 48;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_SIMILARITY: f64 = 0.7;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "passw0rd", "12345678", "123456789", "1234567890",
    "qwertyuiop", "qwerty123", "1q2w3e4r", "1qaz2wsx", "abc12345", "iloveyou", "sunshine",
    "princess", "football", "baseball", "welcome1", "letmein1", "trustno1", "superman",
    "starwars", "whatever", "michael1", "charlie1", "dragon123", "monkey123", "computer",
    "internet", "admin123", "asdfghjkl", "zxcvbnm1", "11111111", "00000000", "88888888",
];

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let user_type: UserType = req
        .user_type
        .parse()
        .map_err(|_| AppError::field("type", "Must be one of: buyer, shop."))?;
    validate_password(&req.password, &req.email)?;

    let email = req.email.trim().to_string();
    let recipient = email.clone();
    let token = generate_token();
    let digest = token_digest(&token);

    let user_id = blocking(&state, move |s| {
        if s.db.get_user_by_email(&email)?.is_some() {
            return Err(AppError::field("email", "User with this email already exists."));
        }

        let user = NewUser {
            email,
            password_hash: hash_password(&req.password)?,
            first_name: req.first_name,
            last_name: req.last_name,
            company: req.company,
            position: req.position,
            user_type: user_type.as_str().to_string(),
        };
        let user_id = s.db.create_user(&user).map_err(AppError::from_db)?;
        s.db.store_confirm_token(user_id, &digest)?;
        Ok(user_id)
    })
    .await?;

    info!("Registered {} account {}", user_type, user_id);
    state.notifier.notify(Notification::AccountRegistered {
        email: recipient,
        token: token.clone(),
    });

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            status: true,
            user_id,
            confirmation_token: token,
        }),
    ))
}

pub async fn confirm_email(
    State(state): State<AppState>,
    Json(req): Json<ConfirmEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let digest = token_digest(req.token.trim());
    let email = req.email.trim().to_string();

    let confirmed = blocking(&state, move |s| Ok(s.db.consume_confirm_token(&email, &digest)?)).await?;

    match confirmed {
        Some(user_id) => {
            info!("Confirmed email of user {}", user_id);
            Ok(Json(json!({ "status": true })))
        }
        None => Err(AppError::BadRequest("Invalid email or token".into())),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = req.email.trim().to_string();
    let user = blocking(&state, move |s| Ok(s.db.get_user_by_email(&email)?))
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password)? {
        return Err(AppError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(AppError::Inactive);
    }

    let role: UserType = user
        .user_type
        .parse()
        .map_err(|e| AppError::Internal(format!("user {}: {}", user.id, e)))?;
    let token = create_token(&state.jwt_secret, user.id, &user.email, role)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(LoginResponse { status: true, token }))
}

/// Always answers success so the endpoint can't be used to check whether an account exists.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = req.email.trim().to_string();
    let token = generate_token();
    let digest = token_digest(&token);

    let recipient = blocking(&state, move |s| {
        let Some(user) = s.db.get_user_by_email(&email)? else {
            return Ok(None);
        };
        s.db.store_reset_token(user.id, &digest)?;
        Ok(Some(user.email))
    })
    .await?;

    if let Some(email) = recipient {
        state
            .notifier
            .notify(Notification::PasswordResetRequested { email, token });
    }

    Ok(Json(json!({ "status": true })))
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetConfirmRequest>,
) -> Result<impl IntoResponse, AppError> {
    // The owner is unknown until the token is consumed, so only the
    // account-independent rules apply here.
    validate_password(&req.password, "")?;
    let digest = token_digest(req.token.trim());

    let reset = blocking(&state, move |s| {
        let hash = hash_password(&req.password)?;
        Ok(s.db.consume_reset_token(&digest, s.reset_token_ttl_hours, &hash)?)
    })
    .await?;

    match reset {
        Some(user_id) => {
            info!("Password reset for user {}", user_id);
            Ok(Json(json!({ "status": true })))
        }
        None => Err(AppError::BadRequest("Invalid or expired token".into())),
    }
}

pub fn create_token(secret: &str, user_id: i64, email: &str, role: UserType) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Argon2id with a random salt, PHC string output.
pub(crate) fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, stored: &str) -> Result<bool, AppError> {
    let parsed_hash =
        PasswordHash::new(stored).map_err(|e| AppError::Internal(format!("corrupt password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Confirmation and reset tokens handed to the user by email.
fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Only digests are persisted; the raw token exists in the email alone.
pub(crate) fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Collects every rule the password breaks. `email` may be empty when the
/// account is not known yet.
pub(crate) fn validate_password(password: &str, email: &str) -> Result<(), AppError> {
    let mut problems = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LEN
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        problems.push("This password is too common.".to_string());
    }
    if let Some(local) = email.split('@').next().filter(|l| l.len() >= 3) {
        if similarity(&password.to_lowercase(), &local.to_lowercase()) >= MAX_SIMILARITY {
            problems.push("The password is too similar to the email.".to_string());
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Password(problems))
    }
}

/// Ratio of the longest common substring to the mean length, in `0.0..=1.0`.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut longest = 0;
    let mut prev = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut row = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                row[j + 1] = prev[j] + 1;
                longest = longest.max(row[j + 1]);
            }
        }
        prev = row;
    }

    (2 * longest) as f64 / (a.len() + b.len()) as f64
}
