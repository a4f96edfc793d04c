use serde::{Deserialize, Serialize};

use crate::models::OrderStatus;

/// Transactional notifications queued by the handlers and delivered by the
/// mailer task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Notification {
    /// A new account needs its email confirmed
    AccountRegistered { email: String, token: String },

    /// A password reset was requested for an existing account
    PasswordResetRequested { email: String, token: String },

    /// An order left the basket or changed state
    OrderStatusChanged {
        email: String,
        order_id: i64,
        status: OrderStatus,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Self::AccountRegistered { email, .. }
            | Self::PasswordResetRequested { email, .. }
            | Self::OrderStatusChanged { email, .. } => email,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Self::AccountRegistered { email, .. } => format!("Email confirmation token for {}", email),
            Self::PasswordResetRequested { email, .. } => format!("Password reset token for {}", email),
            Self::OrderStatusChanged { .. } => "Order status update".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self {
            Self::AccountRegistered { token, .. } | Self::PasswordResetRequested { token, .. } => {
                token.clone()
            }
            Self::OrderStatusChanged { order_id, status, .. } => {
                format!("Order #{} status: {}", order_id, status.label())
            }
        }
    }
}
