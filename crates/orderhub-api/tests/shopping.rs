mod common;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use common::{TestApp, seed_catalog, spawn_app};
use orderhub_types::events::Notification;
use orderhub_types::models::OrderStatus;

/// A buyer token and the two listing ids of the seeded catalog (phone, earbuds).
async fn shop_with_buyer(app: &mut TestApp) -> (String, Vec<i64>) {
    let (shop_id, _) = app.active_account("shop@example.com", "shop").await;
    seed_catalog(app, shop_id);
    let buyer = app.active_user("buyer@example.com", "buyer").await;

    let (status, products) = app.get("/api/v1/products", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids = products
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    (buyer, ids)
}

async fn add_contact(app: &TestApp, token: &str) -> i64 {
    let (_, resp) = app
        .post(
            "/api/v1/user/contact",
            Some(token),
            json!({ "city": "Norilsk", "street": "Lenina", "phone": "88005553535" }),
        )
        .await;
    resp["id"].as_i64().unwrap()
}

async fn basket(app: &TestApp, token: &str) -> Value {
    let (status, body) = app.get("/api/v1/basket", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn public_catalog_listing() {
    let mut app = spawn_app();
    let (shop_user, _) = app.register("shop@example.com", "shop").await;
    seed_catalog(&app, shop_user);

    let (status, categories) = app.get("/api/v1/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(categories.as_array().unwrap().len(), 2);

    let (_, shops) = app.get("/api/v1/shops", None).await;
    assert_eq!(shops[0]["name"], "Connect");
    assert_eq!(shops[0]["status"], true);

    let (_, products) = app.get("/api/v1/products?category_id=224", None).await;
    let products = products.as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["product"]["category"], "Smartphones");
    assert_eq!(products[0]["price"], 110000);
    let params = products[0]["product_parameters"].as_array().unwrap();
    assert_eq!(params.len(), 4);
    assert!(params.iter().any(|p| p["parameter"] == "Screen (inch)" && p["value"] == "6.5"));

    let (status, _) = app.get("/api/v1/products?shop_id=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn basket_starts_empty() {
    let mut app = spawn_app();
    let (buyer, _) = shop_with_buyer(&mut app).await;
    assert_eq!(basket(&app, &buyer).await, json!([]));
}

#[tokio::test]
async fn basket_add_update_delete() {
    let mut app = spawn_app();
    let (buyer, ids) = shop_with_buyer(&mut app).await;

    let (status, resp) = app
        .post(
            "/api/v1/basket",
            Some(&buyer),
            json!({ "items": [
                { "product_info": ids[0], "quantity": 2 },
                { "product_info": ids[1], "quantity": 1 },
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["objects_created"], 2);

    let current = basket(&app, &buyer).await;
    assert_eq!(current.as_array().unwrap().len(), 1);
    assert_eq!(current[0]["status"], "basket");
    assert_eq!(current[0]["total_sum"], 2 * 110000 + 12000);
    let items = current[0]["ordered_items"].as_array().unwrap().clone();

    // Form-style clients send the list JSON-encoded
    let encoded = json!([{ "id": items[0]["id"], "quantity": 5 }]).to_string();
    let (status, resp) = app
        .request(Method::PUT, "/api/v1/basket", Some(&buyer), Some(json!({ "items": encoded })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["objects_updated"], 1);

    let (status, resp) = app
        .request(
            Method::DELETE,
            "/api/v1/basket",
            Some(&buyer),
            Some(json!({ "items": items[1]["id"].to_string() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["deleted_count"], 1);

    let current = basket(&app, &buyer).await;
    assert_eq!(current[0]["ordered_items"].as_array().unwrap().len(), 1);
    assert_eq!(current[0]["total_sum"], 5 * 110000);
}

#[tokio::test]
async fn basket_rejects_bad_items() {
    let mut app = spawn_app();
    let (buyer, ids) = shop_with_buyer(&mut app).await;

    let (status, _) = app
        .post("/api/v1/basket", Some(&buyer), json!({ "items": "not json" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/basket",
            Some(&buyer),
            json!({ "items": [{ "product_info": ids[0], "quantity": 0 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/basket",
            Some(&buyer),
            json!({ "items": [{ "product_info": 999_999, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let line = json!({ "items": [{ "product_info": ids[0], "quantity": 1 }] });
    let (status, _) = app.post("/api/v1/basket", Some(&buyer), line.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, resp) = app.post("/api/v1/basket", Some(&buyer), line).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["status"], false);
    assert!(resp["error"].as_str().unwrap().contains("UNIQUE"));
}

#[tokio::test]
async fn closed_shop_items_cannot_be_added() {
    let mut app = spawn_app();
    let (buyer, ids) = shop_with_buyer(&mut app).await;
    let shop = app.login("shop@example.com").await;
    let (status, _) = app
        .post("/api/v1/partner/status", Some(&shop), json!({ "status": "off" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/api/v1/basket",
            Some(&buyer),
            json!({ "items": [{ "product_info": ids[0], "quantity": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(basket(&app, &buyer).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_quantities_are_rejected() {
    let mut app = spawn_app();
    let (buyer, ids) = shop_with_buyer(&mut app).await;

    let (status, resp) = app
        .post(
            "/api/v1/basket",
            Some(&buyer),
            json!({ "items": [{ "product_info": ids[0], "quantity": i64::MAX / 1000 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{resp}");
    assert_eq!(resp["status"], false);
    assert!(basket(&app, &buyer).await.as_array().unwrap().is_empty());

    let (status, _) = app
        .post(
            "/api/v1/basket",
            Some(&buyer),
            json!({ "items": [{ "product_info": ids[0], "quantity": u32::MAX }] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let current = basket(&app, &buyer).await;
    let line = current[0]["ordered_items"][0]["id"].clone();
    assert_eq!(current[0]["total_sum"], i64::from(u32::MAX) * 110000);

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/basket",
            Some(&buyer),
            Some(json!({ "items": [{ "id": line, "quantity": i64::MAX }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let shop = app.login("shop@example.com").await;
    let (status, _) = app.get("/api/v1/partner/orders", Some(&shop)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn placing_an_order() {
    let mut app = spawn_app();
    let (buyer, ids) = shop_with_buyer(&mut app).await;
    let contact = add_contact(&app, &buyer).await;
    app.drain_mail();

    app.post(
        "/api/v1/basket",
        Some(&buyer),
        json!({ "items": [{ "product_info": ids[1], "quantity": 3 }] }),
    )
    .await;
    let order_id = basket(&app, &buyer).await[0]["id"].as_i64().unwrap();

    let (status, resp) = app
        .post(
            "/api/v1/order",
            Some(&buyer),
            json!({ "id": order_id, "contact": contact }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["status"], true);

    assert_eq!(
        app.drain_mail(),
        vec![Notification::OrderStatusChanged {
            email: "buyer@example.com".into(),
            order_id,
            status: OrderStatus::New,
        }]
    );

    let (status, orders) = app.get("/api/v1/order", Some(&buyer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders[0]["id"], order_id);
    assert_eq!(orders[0]["status"], "new");
    assert_eq!(orders[0]["total_sum"], 3 * 12000);
    assert_eq!(orders[0]["contact"]["city"], "Norilsk");

    // The placed order left the basket
    assert_eq!(basket(&app, &buyer).await, json!([]));

    let (status, _) = app
        .post(
            "/api/v1/order",
            Some(&buyer),
            json!({ "id": order_id, "contact": contact }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_needs_own_contact_and_items() {
    let mut app = spawn_app();
    let (buyer, ids) = shop_with_buyer(&mut app).await;
    let other = app.active_user("other@example.com", "buyer").await;
    let foreign_contact = add_contact(&app, &other).await;
    let contact = add_contact(&app, &buyer).await;

    app.post(
        "/api/v1/basket",
        Some(&buyer),
        json!({ "items": [{ "product_info": ids[0], "quantity": 1 }] }),
    )
    .await;
    let order_id = basket(&app, &buyer).await[0]["id"].as_i64().unwrap();

    let (status, resp) = app
        .post(
            "/api/v1/order",
            Some(&buyer),
            json!({ "id": order_id, "contact": foreign_contact }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"]["contact"].is_array());

    // Someone else's basket is not found
    let (status, _) = app
        .post("/api/v1/order", Some(&other), json!({ "id": order_id, "contact": foreign_contact }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/v1/order", Some(&buyer), json!({ "id": order_id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // An emptied basket cannot be placed
    let item_id = basket(&app, &buyer).await[0]["ordered_items"][0]["id"].to_string();
    app.request(Method::DELETE, "/api/v1/basket", Some(&buyer), Some(json!({ "items": item_id })))
        .await;
    let (status, resp) = app
        .post("/api/v1/order", Some(&buyer), json!({ "id": order_id, "contact": contact }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "Basket is empty");
}
