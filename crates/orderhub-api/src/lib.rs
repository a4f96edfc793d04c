pub mod account;
pub mod auth;
pub mod basket;
pub mod catalog;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod middleware;
pub mod notify;
pub mod orders;
mod views;

use std::sync::Arc;

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use orderhub_db::Database;

use crate::error::AppError;
use crate::fetch::CatalogFetcher;
use crate::middleware::require_auth;
use crate::notify::Notifier;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub notifier: Notifier,
    pub fetcher: CatalogFetcher,
    pub reset_token_ttl_hours: u32,
}

/// Every route under `/api/v1`, plus `/health`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/user/register", post(auth::register))
        .route("/user/register/confirm", post(auth::confirm_email))
        .route("/user/login", post(auth::login))
        .route("/user/password-reset", post(auth::request_password_reset))
        .route("/user/password-reset/confirm", post(auth::confirm_password_reset))
        .route("/categories", get(catalog::list_categories))
        .route("/shops", get(catalog::list_shops))
        .route("/products", get(catalog::list_products));

    let protected_routes = Router::new()
        .route("/user/details", get(account::get_details).post(account::update_details))
        .route(
            "/user/contact",
            get(account::list_contacts)
                .post(account::create_contact)
                .put(account::update_contact)
                .delete(account::delete_contacts),
        )
        .route("/partner/update", post(catalog::partner_update))
        .route("/partner/status", get(catalog::partner_status).post(catalog::set_partner_status))
        .route("/partner/orders", get(orders::partner_orders))
        .route(
            "/basket",
            get(basket::get_basket)
                .post(basket::add_items)
                .put(basket::update_items)
                .delete(basket::delete_items),
        )
        .route("/order", get(orders::list_orders).post(orders::place_order))
        .layer(from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Runs blocking store work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&AppStateInner) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal(e.to_string())
        })?
}
