use crate::handlers::common::{created_response, map_service_error};
use crate::{auth::AuthUser, errors::ApiError, AppState};
use axum::{extract::State, response::IntoResponse, routing::post, Router};

/// Creates the router for checkout
pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/", post(checkout))
}

/// Pay for the caller's cart from their wallet
async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .checkout
        .checkout(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(order))
}
