use axum::{Extension, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::{info, warn};

use orderhub_db::catalog::ProductFilter;
use orderhub_types::api::{Claims, PartnerStatusRequest, PartnerUpdateRequest, ProductQuery};
use orderhub_types::catalog::CatalogDocument;

use crate::error::AppError;
use crate::extract::{Json, Query};
use crate::fetch::parse_catalog_url;
use crate::middleware::require_shop;
use crate::{AppState, blocking, views};

// -- Public catalog --

pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let rows = blocking(&state, |s| Ok(s.db.list_categories()?)).await?;
    Ok(Json(rows.into_iter().map(views::category).collect::<Vec<_>>()))
}

/// Shops currently accepting orders.
pub async fn list_shops(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let rows = blocking(&state, |s| Ok(s.db.list_open_shops()?)).await?;
    Ok(Json(rows.into_iter().map(views::shop).collect::<Vec<_>>()))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ProductFilter {
        shop_id: query.shop_id,
        category_id: query.category_id,
    };

    let products = blocking(&state, move |s| {
        let rows = s.db.list_product_infos(filter)?;
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let params = s.db.get_parameters(&ids)?;
        Ok(views::product_infos(rows, params))
    })
    .await?;

    Ok(Json(products))
}

// -- Partner --

/// Replaces the caller's catalog with the YAML document at `url`.
pub async fn partner_update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PartnerUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_shop(&claims)?;
    let url = parse_catalog_url(&req.url)?;

    let body = state.fetcher.fetch(&url).await?;
    let doc = CatalogDocument::from_yaml(&body).map_err(|e| {
        warn!("Catalog at {} rejected: {}", url, e);
        AppError::BadRequest(format!("Invalid catalog: {}", e))
    })?;

    let user_id = claims.sub;
    let summary = blocking(&state, move |s| {
        s.db.import_catalog(user_id, &doc).map_err(AppError::from_db)
    })
    .await?;

    info!(
        "Imported catalog for shop {}: {} categories, {} goods, {} parameters",
        summary.shop_id, summary.categories, summary.goods, summary.parameters
    );

    Ok(Json(json!({
        "status": true,
        "shop_id": summary.shop_id,
        "categories": summary.categories,
        "goods": summary.goods,
    })))
}

pub async fn partner_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    require_shop(&claims)?;

    let shop = blocking(&state, move |s| Ok(s.db.get_shop_by_user(claims.sub)?))
        .await?
        .ok_or_else(|| AppError::NotFound("Shop not found".into()))?;

    Ok(Json(views::shop(shop)))
}

pub async fn set_partner_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PartnerStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_shop(&claims)?;
    let open = req.status.as_bool().ok_or(AppError::InvalidArguments)?;

    let updated = blocking(&state, move |s| Ok(s.db.set_shop_status(claims.sub, open)?)).await?;
    if !updated {
        return Err(AppError::NotFound("Shop not found".into()));
    }

    info!("Shop of user {} is now {}", claims.sub, if open { "open" } else { "closed" });
    Ok(Json(json!({ "status": true })))
}
