use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use orderhub_types::api::Claims;
use orderhub_types::models::UserType;

use crate::AppState;
use crate::error::AppError;

/// Extract and validate the bearer JWT from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::NotAuthenticated)?;

    let token_data = decode::<Claims>(
        token.trim(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::NotAuthenticated)?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

pub fn require_shop(claims: &Claims) -> Result<(), AppError> {
    match claims.role {
        UserType::Shop => Ok(()),
        UserType::Buyer => Err(AppError::ShopsOnly),
    }
}
