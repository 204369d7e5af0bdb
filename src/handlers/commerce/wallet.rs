use crate::handlers::common::{map_service_error, message_response, success_response};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::wallet::{TopUpInput, WalletView},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};

/// Creates the router for the caller's wallet
pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_wallet))
        .route("/top-up", post(top_up))
}

async fn get_wallet(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state
        .services
        .wallet
        .balance(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(WalletView { balance }))
}

async fn top_up(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<TopUpInput>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state
        .services
        .wallet
        .top_up(user.id, payload.amount)
        .await
        .map_err(map_service_error)?;

    Ok(message_response(
        WalletView { balance },
        format!("Wallet topped up. New balance: {:.2}", balance),
    ))
}
