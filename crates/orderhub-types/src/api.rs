use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::UserType;

// -- JWT Claims --

/// Bearer token claims. Issued at login, checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub role: UserType,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[validate(length(max = 40))]
    pub company: String,
    #[validate(length(max = 40))]
    pub position: String,
    #[serde(rename = "type")]
    pub user_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub status: bool,
    pub user_id: i64,
    pub confirmation_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmEmailRequest {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub status: bool,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub password: String,
}

/// Partial account update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 150))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    #[validate(length(max = 40))]
    pub company: Option<String>,
    #[validate(length(max = 40))]
    pub position: Option<String>,
}

// -- Contacts --

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContactRequest {
    #[validate(length(min = 1, max = 50))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub street: String,
    #[serde(default)]
    #[validate(length(max = 15))]
    pub house: String,
    #[serde(default)]
    #[validate(length(max = 15))]
    pub structure: String,
    #[serde(default)]
    #[validate(length(max = 15))]
    pub building: String,
    #[serde(default)]
    #[validate(length(max = 15))]
    pub apartment: String,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateContactRequest {
    pub id: i64,
    #[validate(length(min = 1, max = 50))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub street: Option<String>,
    #[validate(length(max = 15))]
    pub house: Option<String>,
    #[validate(length(max = 15))]
    pub structure: Option<String>,
    #[validate(length(max = 15))]
    pub building: Option<String>,
    #[validate(length(max = 15))]
    pub apartment: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub phone: Option<String>,
}

/// Deletion by id set, sent as `"items": "3,4,7"`.
#[derive(Debug, Deserialize)]
pub struct DeleteItemsRequest {
    pub items: String,
}

impl DeleteItemsRequest {
    /// Numeric ids in the list; anything else is skipped.
    pub fn ids(&self) -> Vec<i64> {
        self.items
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|part| part.parse().ok())
            .collect()
    }
}

// -- Basket --

/// Basket items arrive either as a JSON array or as a string holding a
/// JSON-encoded array (form-style clients).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ItemsField<T> {
    List(Vec<T>),
    Encoded(String),
}

impl<T: DeserializeOwned> ItemsField<T> {
    pub fn into_items(self) -> Result<Vec<T>, serde_json::Error> {
        match self {
            Self::List(items) => Ok(items),
            Self::Encoded(raw) => serde_json::from_str(&raw),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BasketItemsRequest<T> {
    pub items: ItemsField<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBasketItem {
    pub product_info: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasketQuantityUpdate {
    pub id: i64,
    pub quantity: i64,
}

// -- Orders --

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub id: i64,
    pub contact: i64,
}

// -- Partner --

#[derive(Debug, Deserialize)]
pub struct PartnerUpdateRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct PartnerStatusRequest {
    pub status: StatusFlag,
}

/// Accepts `true`/`false` as JSON booleans or as the usual truthy strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatusFlag {
    Bool(bool),
    Text(String),
}

impl StatusFlag {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            Self::Text(text) => match text.trim().to_lowercase().as_str() {
                "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
                "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
                _ => None,
            },
        }
    }
}

// -- Catalog queries --

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub shop_id: Option<i64>,
    pub category_id: Option<i64>,
}
