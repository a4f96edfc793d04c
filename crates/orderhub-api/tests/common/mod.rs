#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

use orderhub_api::fetch::CatalogFetcher;
use orderhub_api::notify::Notifier;
use orderhub_api::{AppState, AppStateInner, router};
use orderhub_db::Database;
use orderhub_types::events::Notification;

pub const PASSWORD: &str = "Tr1cky-Horse-42";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub mail: UnboundedReceiver<Notification>,
}

pub fn spawn_app() -> TestApp {
    let (notifier, mail) = Notifier::channel();
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: "test-secret".into(),
        notifier,
        fetcher: CatalogFetcher::new(Duration::from_secs(5)).unwrap(),
        reset_token_ttl_hours: 24,
    });

    TestApp {
        app: router(state.clone()),
        state,
        mail,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Registers an account and returns `(user_id, confirmation_token)`.
    pub async fn register(&mut self, email: &str, kind: &str) -> (i64, String) {
        let (status, body) = self
            .post(
                "/api/v1/user/register",
                None,
                json!({
                    "first_name": "Ann",
                    "last_name": "Lee",
                    "email": email,
                    "password": PASSWORD,
                    "company": "Acme",
                    "position": "Buyer",
                    "type": kind,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["user_id"].as_i64().unwrap(),
            body["confirmation_token"].as_str().unwrap().to_string(),
        )
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/user/login",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Registered, confirmed and logged in; returns `(user_id, bearer_token)`.
    pub async fn active_account(&mut self, email: &str, kind: &str) -> (i64, String) {
        let (user_id, token) = self.register(email, kind).await;
        let (status, body) = self
            .post(
                "/api/v1/user/register/confirm",
                None,
                json!({ "email": email, "token": token }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (user_id, self.login(email).await)
    }

    pub async fn active_user(&mut self, email: &str, kind: &str) -> String {
        self.active_account(email, kind).await.1
    }

    pub fn drain_mail(&mut self) -> Vec<Notification> {
        let mut mail = Vec::new();
        while let Ok(notification) = self.mail.try_recv() {
            mail.push(notification);
        }
        mail
    }
}

pub const CATALOG_YAML: &str = r#"
shop: Connect
categories:
  - id: 224
    name: Smartphones
  - id: 15
    name: Accessories
goods:
  - id: 4216292
    category: 224
    model: apple/iphone/xs-max
    name: Smartphone Apple iPhone XS Max 512GB (gold)
    price: 110000
    price_rrc: 116990
    quantity: 14
    parameters:
      "Screen (inch)": 6.5
      "Resolution (px)": 2688x1242
      "Built-in memory (GB)": 512
      Color: gold
  - id: 4672670
    category: 15
    model: apple/airpods
    name: Apple AirPods
    price: 12000
    price_rrc: 13990
    quantity: 30
    parameters:
      Color: white
"#;

/// Imports `CATALOG_YAML` for the shop owned by `user_id`, bypassing HTTP.
pub fn seed_catalog(app: &TestApp, user_id: i64) {
    let doc = orderhub_types::catalog::CatalogDocument::from_yaml(CATALOG_YAML.as_bytes()).unwrap();
    app.state.db.import_catalog(user_id, &doc).unwrap();
}
