use axum::{Extension, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::debug;

use orderhub_db::orders::OrderScope;
use orderhub_types::api::{
    BasketItemsRequest, BasketQuantityUpdate, Claims, DeleteItemsRequest, NewBasketItem,
};

use crate::error::AppError;
use crate::extract::Json;
use crate::{AppState, blocking, views};

/// The caller's basket as a list of zero or one order.
pub async fn get_basket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub;
    let orders = blocking(&state, move |s| {
        Ok(views::load_orders(&s.db, OrderScope::Basket { user_id })?)
    })
    .await?;

    Ok(Json(orders))
}

pub async fn add_items(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BasketItemsRequest<NewBasketItem>>,
) -> Result<impl IntoResponse, AppError> {
    let items = req.items.into_items().map_err(|_| AppError::InvalidArguments)?;
    if items.is_empty() {
        return Err(AppError::InvalidArguments);
    }
    check_quantities(items.iter().map(|i| i.quantity))?;

    let user_id = claims.sub;
    let created = blocking(&state, move |s| {
        for item in &items {
            match s.db.product_info_shop_open(item.product_info)? {
                Some(true) => {}
                Some(false) => {
                    return Err(AppError::BadRequest(format!(
                        "Product {} is from a shop that is not accepting orders",
                        item.product_info
                    )));
                }
                None => return Err(AppError::NotFound(format!("Product {} not found", item.product_info))),
            }
        }

        let basket_id = s.db.get_or_create_basket(user_id)?;
        let lines: Vec<(i64, i64)> = items.iter().map(|i| (i.product_info, i.quantity)).collect();
        s.db.add_basket_items(basket_id, &lines).map_err(AppError::from_db)
    })
    .await?;

    debug!("User {} added {} basket lines", user_id, created);
    Ok(Json(json!({ "status": true, "objects_created": created })))
}

pub async fn update_items(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BasketItemsRequest<BasketQuantityUpdate>>,
) -> Result<impl IntoResponse, AppError> {
    let updates = req.items.into_items().map_err(|_| AppError::InvalidArguments)?;
    if updates.is_empty() {
        return Err(AppError::InvalidArguments);
    }
    check_quantities(updates.iter().map(|u| u.quantity))?;

    let user_id = claims.sub;
    let updated = blocking(&state, move |s| {
        let Some(basket_id) = s.db.find_basket(user_id)? else {
            return Ok(0);
        };
        let pairs: Vec<(i64, i64)> = updates.iter().map(|u| (u.id, u.quantity)).collect();
        Ok(s.db.update_basket_quantities(basket_id, &pairs)?)
    })
    .await?;

    Ok(Json(json!({ "status": true, "objects_updated": updated })))
}

pub async fn delete_items(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DeleteItemsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ids = req.ids();
    if ids.is_empty() {
        return Err(AppError::InvalidArguments);
    }

    let user_id = claims.sub;
    let deleted = blocking(&state, move |s| {
        let Some(basket_id) = s.db.find_basket(user_id)? else {
            return Ok(0);
        };
        Ok(s.db.delete_basket_items(basket_id, &ids)?)
    })
    .await?;

    Ok(Json(json!({ "status": true, "deleted_count": deleted })))
}

/// Largest quantity a single basket line may hold.
const MAX_QUANTITY: i64 = u32::MAX as i64;

fn check_quantities(quantities: impl Iterator<Item = i64>) -> Result<(), AppError> {
    for q in quantities {
        if q < 1 {
            return Err(AppError::field("quantity", "Ensure this value is greater than or equal to 1."));
        }
        if q > MAX_QUANTITY {
            return Err(AppError::field(
                "quantity",
                format!("Ensure this value is less than or equal to {}.", MAX_QUANTITY),
            ));
        }
    }
    Ok(())
}
