//! Back-office endpoints. Every route here sits behind the admin guard.

use crate::handlers::common::{
    created_response, map_service_error, message_response, success_response,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::{
        commerce::{CreateProductInput, ProductView, UpdateProductInput},
        order_status::parse_status,
        orders::OrderSummary,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Orders shown on the dashboard.
pub const RECENT_ORDERS_LIMIT: u64 = 5;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users))
        .route("/users/stats", get(user_stats))
        .route("/users/:id", axum::routing::delete(delete_user))
        .route("/products", post(create_product))
        .route("/products/import", post(import_products))
        .route("/products/:id", put(update_product).delete(delete_product))
        .route("/orders", get(list_orders))
        .route("/orders/stats", get(order_stats))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", put(update_order_status))
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub total_users: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub recent_orders: Vec<OrderSummary>,
}

async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let services = &state.services;
    let view = DashboardView {
        total_users: services.users.count_users().await.map_err(map_service_error)?,
        total_products: services
            .product_catalog
            .count_products()
            .await
            .map_err(map_service_error)?,
        total_orders: services.orders.count_orders().await.map_err(map_service_error)?,
        total_revenue: services
            .orders
            .completed_revenue()
            .await
            .map_err(map_service_error)?,
        recent_orders: services
            .orders
            .recent(RECENT_ORDERS_LIMIT)
            .await
            .map_err(map_service_error)?,
    };
    Ok(success_response(view))
}

async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .services
        .users
        .list_users()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(users))
}

async fn user_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.services.users.stats().await.map_err(map_service_error)?;
    Ok(success_response(stats))
}

async fn delete_user(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .users
        .delete_user(admin.id, id)
        .await
        .map_err(map_service_error)?;
    Ok(message_response(
        serde_json::json!({ "id": id }),
        "User and all associated data deleted.",
    ))
}

async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .product_catalog
        .create_product(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(ProductView::from(product)))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .product_catalog
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ProductView::from(product)))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .product_catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(message_response(
        serde_json::json!({ "id": id }),
        "Product deleted.",
    ))
}

/// Body is the raw CSV text
async fn import_products(
    State(state): State<AppState>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .services
        .product_import
        .import_csv(&body)
        .await
        .map_err(map_service_error)?;
    let message = match &report.error_summary {
        Some(summary) => format!("{} {}", report.message, summary),
        None => report.message.clone(),
    };
    Ok(message_response(report, message))
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_status(raw).map_err(map_service_error)?),
    };
    let orders = state
        .services
        .orders
        .list_all(status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

async fn order_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.services.orders.stats().await.map_err(map_service_error)?;
    Ok(success_response(stats))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_admin_details(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .order_status
        .update_status(id, &payload.status)
        .await
        .map_err(map_service_error)?;
    let message = format!("Order status updated to {}.", order.status);
    Ok(message_response(order, message))
}
