use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

/// Field name -> messages, rendered as the `error` object of a failed response.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Only for shops")]
    ShopsOnly,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is not active")]
    Inactive,

    /// Missing, malformed or contradictory request fields.
    #[error("Invalid arguments")]
    InvalidArguments,

    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Password rejected")]
    Password(Vec<String>),

    /// A database constraint rejected the write.
    #[error("{0}")]
    Integrity(String),

    #[error("Catalog fetch failed: {0}")]
    CatalogFetch(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Single-field validation failure.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.to_string(), vec![message.into()]);
        Self::Validation(errors)
    }

    /// Constraint violations become `Integrity`, anything else stays a
    /// database failure.
    pub fn from_db(err: anyhow::Error) -> Self {
        if orderhub_db::is_constraint_violation(&err) {
            Self::Integrity(err.to_string())
        } else {
            Self::Database(err)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated | Self::ShopsOnly | Self::Inactive => StatusCode::FORBIDDEN,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InvalidArguments
            | Self::BadRequest(_)
            | Self::Validation(_)
            | Self::Password(_)
            | Self::Integrity(_) => StatusCode::BAD_REQUEST,
            Self::CatalogFetch(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Value {
        match self {
            Self::Validation(fields) => json!(fields),
            Self::Password(messages) => json!({ "password": messages }),
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => json!("Internal server error"),
            other => json!(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => format!("invalid {}", e.code),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Self::Validation(fields)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            error!(error = %self, "Request failed");
        }

        let body = json!({ "status": false, "error": self.detail() });
        (self.status_code(), axum::Json(body)).into_response()
    }
}
