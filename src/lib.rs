//! Storefront API Library
//!
//! Catalog, per-user carts, wallet-funded checkout and an admin back-office
//! over a sea-orm store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod money;
pub mod services;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    auth::{AuthConfig, AuthService},
    services::notifications::NotificationDispatcher,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        notifications: NotificationDispatcher,
    ) -> Self {
        let auth = Arc::new(AuthService::new(
            AuthConfig::from(&config),
            db.clone(),
            notifications.clone(),
        ));
        Self {
            services: handlers::AppServices::new(db.clone(), notifications),
            db,
            config,
            auth,
        }
    }
}

// Common response wrappers
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Routes mounted under `/api/v1`.
pub fn api_v1_routes(state: &AppState) -> Router<AppState> {
    let authenticated = middleware::from_fn_with_state(state.auth.clone(), auth::auth_middleware);

    let customer = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .nest("/cart", handlers::commerce::carts_routes())
        .nest("/checkout", handlers::commerce::checkout_routes())
        .nest("/wallet", handlers::commerce::wallet_routes())
        .nest("/orders", handlers::orders::orders_routes())
        .route_layer(authenticated.clone());

    // Layers run bottom-up: authenticate first, then require the admin flag.
    let admin = handlers::admin::admin_routes()
        .route_layer(middleware::from_fn(auth::admin_middleware))
        .route_layer(authenticated);

    Router::new()
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/products", handlers::commerce::products_routes())
        .merge(customer)
        .nest("/admin", admin)
}

/// Full application router with the HTTP middleware stack.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes(&state))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.is_production() {
        warn!("No CORS origins configured; cross-origin requests will be rejected");
        CorsLayer::new()
    } else {
        CorsLayer::permissive()
    }
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.db.ping().await {
        Ok(()) => "healthy",
        Err(err) => {
            warn!(error = %err, "Database health check failed");
            "unhealthy"
        }
    };
    let status = if database == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse::success(json!({
            "status": database,
            "checks": { "database": database },
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
        }))),
    )
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn envelope_omits_absent_message() {
        let body = serde_json::to_value(ApiResponse::success(1)).unwrap();
        assert_eq!(body, json!({ "success": true, "data": 1 }));

        let body = serde_json::to_value(ApiResponse::success("ok").with_message("done")).unwrap();
        assert_eq!(body["message"], "done");
    }
}
