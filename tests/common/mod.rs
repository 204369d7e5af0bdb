#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use storefront_api::{
    config::AppConfig,
    db,
    entities::commerce::{ProductCategory, ProductModel},
    services::{
        commerce::CreateProductInput,
        notifications::{Mailer, MailerError, NotificationDispatcher, OutgoingMessage},
    },
    AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const TEST_PASSWORD: &str = "sup3r-secret";

/// Mailer that keeps every message for assertions.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailerError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A registered account and its bearer token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

/// Helper harness for spinning up an application state backed by a SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    _data_dir: Option<TempDir>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        // One connection keeps the in-memory database alive and shared.
        Self::build("sqlite::memory:".to_string(), 1, None).await
    }

    /// Application on a SQLite file with a real pool, so transactions run side by side.
    pub async fn file_backed(max_connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir for database");
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("storefront.db").display()
        );
        Self::build(url, max_connections, Some(dir)).await
    }

    async fn build(database_url: String, max_connections: u32, data_dir: Option<TempDir>) -> Self {
        let mut cfg = AppConfig::new(
            database_url,
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = max_connections;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(
            Arc::new(pool),
            cfg,
            NotificationDispatcher::new(mailer.clone()),
        );
        let router = storefront_api::build_router(state.clone());

        Self {
            router,
            state,
            mailer,
            _data_dir: data_dir,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Send a plain-text body, e.g. a CSV upload.
    pub async fn request_text(
        &self,
        method: Method,
        uri: &str,
        text: &str,
        token: &str,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .header("content-type", "text/csv")
            .body(Body::from(text.to_string()))
            .expect("failed to build request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    /// Register a customer through the public endpoint.
    pub async fn register_user(&self, name: &str, email: &str) -> TestUser {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                Some(json!({
                    "name": name,
                    "email": email,
                    "password": TEST_PASSWORD,
                    "confirm_password": TEST_PASSWORD,
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        TestUser {
            id: body["data"]["user"]["id"]
                .as_str()
                .and_then(|id| Uuid::parse_str(id).ok())
                .expect("user id in register response"),
            email: email.to_string(),
            token: body["data"]["token"]["access_token"]
                .as_str()
                .expect("token in register response")
                .to_string(),
        }
    }

    /// Register an account and grant it admin rights.
    pub async fn create_admin(&self, email: &str) -> TestUser {
        let admin = self.register_user("Admin", email).await;
        self.state
            .services
            .users
            .make_admin(email)
            .await
            .expect("grant admin");
        admin
    }

    pub async fn seed_product(
        &self,
        name: &str,
        category: ProductCategory,
        price: Decimal,
        stock_level: i32,
    ) -> ProductModel {
        self.state
            .services
            .product_catalog
            .create_product(CreateProductInput {
                name: name.to_string(),
                category,
                price,
                stock_level,
                description: Some(format!("{name} seeded for integration tests")),
                image_url: None,
            })
            .await
            .expect("seed product for tests")
    }

    pub async fn fund_wallet(&self, user_id: Uuid, amount: Decimal) -> Decimal {
        self.state
            .services
            .wallet
            .top_up(user_id, amount)
            .await
            .expect("top up wallet")
    }

    pub async fn wallet_balance(&self, user_id: Uuid) -> Decimal {
        self.state
            .services
            .wallet
            .balance(user_id)
            .await
            .expect("wallet balance")
    }

    pub async fn stock_level(&self, product_id: Uuid) -> i32 {
        self.state
            .services
            .product_catalog
            .get_product(product_id)
            .await
            .expect("product exists")
            .stock_level
    }

    pub async fn add_to_cart(&self, user: &TestUser, product_id: Uuid, quantity: i32) {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/cart/items",
                Some(json!({ "product_id": product_id, "quantity": quantity })),
                Some(&user.token),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "add to cart failed: {body}");
    }

    pub async fn cart_line_count(&self, user_id: Uuid) -> usize {
        self.state
            .services
            .cart
            .get_cart(user_id)
            .await
            .expect("cart")
            .items
            .len()
    }
}

/// Parses an amount serialized by the API (decimals travel as strings).
pub fn amount(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not an amount: {other}"),
    }
}
