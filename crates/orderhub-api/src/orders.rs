use axum::{Extension, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::info;

use orderhub_db::orders::{OrderScope, PlaceOutcome};
use orderhub_types::api::{Claims, PlaceOrderRequest};
use orderhub_types::events::Notification;
use orderhub_types::models::OrderStatus;

use crate::error::AppError;
use crate::extract::Json;
use crate::middleware::require_shop;
use crate::{AppState, blocking, views};

/// The caller's placed orders, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub;
    let orders = blocking(&state, move |s| {
        Ok(views::load_orders(&s.db, OrderScope::PlacedBy { user_id })?)
    })
    .await?;

    Ok(Json(orders))
}

/// Moves the basket to `new` with the chosen delivery contact.
pub async fn place_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub;
    let order_id = req.id;

    let email = blocking(&state, move |s| {
        match s.db.place_order(user_id, order_id, req.contact)? {
            PlaceOutcome::Placed => {}
            PlaceOutcome::OrderNotFound => {
                return Err(AppError::NotFound(format!("Order {} not found", order_id)));
            }
            PlaceOutcome::NotInBasket => {
                return Err(AppError::BadRequest(format!("Order {} has already been placed", order_id)));
            }
            PlaceOutcome::ContactNotFound => {
                return Err(AppError::field("contact", format!("Contact {} not found", req.contact)));
            }
            PlaceOutcome::EmptyBasket => return Err(AppError::BadRequest("Basket is empty".into())),
        }

        // Current address, in case it changed since the token was issued
        let user = s.db.get_user_by_id(user_id)?;
        Ok(user.map(|u| u.email))
    })
    .await?;

    info!("User {} placed order {}", user_id, order_id);
    state.notifier.notify(Notification::OrderStatusChanged {
        email: email.unwrap_or(claims.email),
        order_id,
        status: OrderStatus::New,
    });

    Ok(Json(json!({ "status": true })))
}

/// Placed orders that include at least one listing of the caller's shop.
pub async fn partner_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    require_shop(&claims)?;

    let user_id = claims.sub;
    let orders = blocking(&state, move |s| {
        Ok(views::load_orders(&s.db, OrderScope::ForShopOwner { user_id })?)
    })
    .await?;

    Ok(Json(orders))
}
