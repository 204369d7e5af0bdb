use crate::handlers::common::{map_service_error, message_response, success_response};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::commerce::cart_service::AddToCartInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Creates the router for the caller's cart
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_to_cart))
        .route("/items/:product_id", put(update_cart_item).delete(remove_cart_item))
}

/// Get the cart with totals
async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

/// Add item to cart
async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartInput>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .cart
        .add_item(user.id, payload.product_id, payload.quantity.unwrap_or(1))
        .await
        .map_err(map_service_error)?;

    let cart = state
        .services
        .cart
        .get_cart(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(message_response(cart, "Item added to your cart."))
}

/// Update cart item quantity
async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .services
        .cart
        .update_item_quantity(user.id, product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    let cart = state
        .services
        .cart
        .get_cart(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(match outcome.warning {
        Some(warning) => message_response(cart, warning),
        None => success_response(cart),
    })
}

/// Remove item from cart
async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .cart
        .remove_item(user.id, product_id)
        .await
        .map_err(map_service_error)?;

    let cart = state
        .services
        .cart
        .get_cart(user.id)
        .await
        .map_err(map_service_error)?;
    Ok(message_response(cart, "Item removed from your cart."))
}

/// Clear all items from cart
async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .services
        .cart
        .clear_cart(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(message_response(
        serde_json::json!({ "removed": removed }),
        "Cart cleared successfully",
    ))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}
