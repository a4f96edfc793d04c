mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{PASSWORD, spawn_app};
use orderhub_types::events::Notification;

#[tokio::test]
async fn health_check() {
    let app = spawn_app();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn register_queues_confirmation_email() {
    let mut app = spawn_app();
    let (user_id, token) = app.register("ann@example.com", "Buyer").await;
    assert!(user_id > 0);

    let mail = app.drain_mail();
    assert_eq!(
        mail,
        vec![Notification::AccountRegistered {
            email: "ann@example.com".into(),
            token,
        }]
    );
}

#[tokio::test]
async fn register_rejects_weak_password_and_unknown_type() {
    let app = spawn_app();
    let mut body = json!({
        "first_name": "Ann",
        "last_name": "Lee",
        "email": "ann@example.com",
        "password": "12345",
        "company": "Acme",
        "position": "Buyer",
        "type": "buyer",
    });

    let (status, resp) = app.post("/api/v1/user/register", None, body.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["status"], false);
    assert_eq!(resp["error"]["password"].as_array().unwrap().len(), 2);

    body["password"] = json!(PASSWORD);
    body["type"] = json!("admin");
    let (status, resp) = app.post("/api/v1/user/register", None, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"]["type"].is_array());
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let mut app = spawn_app();
    app.register("ann@example.com", "buyer").await;

    let (status, resp) = app
        .post(
            "/api/v1/user/register",
            None,
            json!({
                "first_name": "Ann",
                "last_name": "Lee",
                "email": "ANN@example.com",
                "password": PASSWORD,
                "company": "Acme",
                "position": "Buyer",
                "type": "buyer",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"]["email"].is_array());
}

#[tokio::test]
async fn malformed_body_is_invalid_arguments() {
    let app = spawn_app();
    let (status, resp) = app
        .post("/api/v1/user/login", None, json!({ "email": "ann@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp, json!({ "status": false, "error": "Invalid arguments" }));
}

#[tokio::test]
async fn login_requires_confirmed_email() {
    let mut app = spawn_app();
    let (_, token) = app.register("ann@example.com", "buyer").await;

    let credentials = json!({ "email": "ann@example.com", "password": PASSWORD });
    let (status, resp) = app.post("/api/v1/user/login", None, credentials.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp["error"], "Account is not active");

    let (status, _) = app
        .post(
            "/api/v1/user/register/confirm",
            None,
            json!({ "email": "ann@example.com", "token": "wrong" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/user/register/confirm",
            None,
            json!({ "email": "ann@example.com", "token": token }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, resp) = app.post("/api/v1/user/login", None, credentials).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["status"], true);
    assert!(resp["token"].as_str().unwrap().len() > 20);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let mut app = spawn_app();
    app.active_user("ann@example.com", "buyer").await;
    let (status, resp) = app
        .post(
            "/api/v1/user/login",
            None,
            json!({ "email": "ann@example.com", "password": "not-the-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["status"], false);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = spawn_app();
    let (status, resp) = app.get("/api/v1/user/details", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp, json!({ "status": false, "error": "Not authenticated" }));

    let (status, _) = app.get("/api/v1/basket", Some("garbage")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn details_can_be_read_and_updated() {
    let mut app = spawn_app();
    let token = app.active_user("ann@example.com", "buyer").await;

    let (status, user) = app.get("/api/v1/user/details", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "ann@example.com");
    assert_eq!(user["type"], "buyer");
    assert_eq!(user["is_active"], true);
    assert_eq!(user["contacts"], json!([]));

    let (status, resp) = app
        .post(
            "/api/v1/user/details",
            Some(&token),
            json!({ "company": "Globex", "position": "Manager" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        resp["message"],
        format!("user with id: {}, details updated", user["id"])
    );

    let (_, user) = app.get("/api/v1/user/details", Some(&token)).await;
    assert_eq!(user["company"], "Globex");
    assert_eq!(user["first_name"], "Ann");

    let (status, resp) = app
        .post("/api/v1/user/details", Some(&token), json!({ "password": "short" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"]["password"].is_array());
}

#[tokio::test]
async fn password_can_be_changed_through_details() {
    let mut app = spawn_app();
    let token = app.active_user("ann@example.com", "buyer").await;

    let (status, _) = app
        .post(
            "/api/v1/user/details",
            Some(&token),
            json!({ "password": "Brand-New-Secret-9" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/api/v1/user/login",
            None,
            json!({ "email": "ann@example.com", "password": "Brand-New-Secret-9" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn contacts_crud() {
    let mut app = spawn_app();
    let token = app.active_user("ann@example.com", "buyer").await;

    let (status, resp) = app
        .post(
            "/api/v1/user/contact",
            Some(&token),
            json!({
                "city": "Norilsk",
                "street": "Talnakhskaya",
                "house": "12",
                "apartment": "4",
                "phone": "88005553535",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resp["message"], "contacts created");
    let id = resp["id"].as_i64().unwrap();

    let (status, _) = app
        .post("/api/v1/user/contact", Some(&token), json!({ "city": "Norilsk" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/user/contact",
            Some(&token),
            Some(json!({ "id": id, "city": "Moscow" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, contacts) = app.get("/api/v1/user/contact", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contacts[0]["city"], "Moscow");
    assert_eq!(contacts[0]["street"], "Talnakhskaya");

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/user/contact",
            Some(&token),
            Some(json!({ "id": id + 100, "city": "Moscow" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, resp) = app
        .request(
            Method::DELETE,
            "/api/v1/user/contact",
            Some(&token),
            Some(json!({ "items": format!("{},abc", id) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["deleted_count"], 1);

    let (status, _) = app
        .request(
            Method::DELETE,
            "/api/v1/user/contact",
            Some(&token),
            Some(json!({ "items": "abc" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn contacts_are_private() {
    let mut app = spawn_app();
    let ann = app.active_user("ann@example.com", "buyer").await;
    let bob = app.active_user("bob@example.com", "buyer").await;

    let (_, resp) = app
        .post(
            "/api/v1/user/contact",
            Some(&ann),
            json!({ "city": "Norilsk", "street": "Lenina", "phone": "1" }),
        )
        .await;
    let id = resp["id"].as_i64().unwrap();

    let (_, contacts) = app.get("/api/v1/user/contact", Some(&bob)).await;
    assert_eq!(contacts, json!([]));

    let (_, resp) = app
        .request(
            Method::DELETE,
            "/api/v1/user/contact",
            Some(&bob),
            Some(json!({ "items": id.to_string() })),
        )
        .await;
    assert_eq!(resp["deleted_count"], 0);
}

#[tokio::test]
async fn password_reset_flow() {
    let mut app = spawn_app();
    app.active_user("ann@example.com", "buyer").await;
    app.drain_mail();

    // Unknown addresses get the same answer and no email
    let (status, resp) = app
        .post("/api/v1/user/password-reset", None, json!({ "email": "nobody@example.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["status"], true);
    assert!(app.drain_mail().is_empty());

    let (status, _) = app
        .post("/api/v1/user/password-reset", None, json!({ "email": "ann@example.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = match app.drain_mail().pop() {
        Some(Notification::PasswordResetRequested { token, .. }) => token,
        other => panic!("expected reset email, got {other:?}"),
    };

    let (status, _) = app
        .post(
            "/api/v1/user/password-reset/confirm",
            None,
            json!({ "token": token, "password": "Another-Secret-77" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/api/v1/user/password-reset/confirm",
            None,
            json!({ "token": token, "password": "Another-Secret-78" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/user/login",
            None,
            json!({ "email": "ann@example.com", "password": "Another-Secret-77" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}
