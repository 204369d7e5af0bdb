use crate::{
    auth::{AuthError, AuthUser, LoginRequest, RegisterRequest},
    handlers::common::success_response,
    ApiResponse, AppState,
};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use tracing::info;

/// Public sign-up and sign-in routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Create an account; responds with the user and an access token
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let registered = state.auth.register(payload).await?;
    info!(user_id = %registered.user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(
            ApiResponse::success(registered)
                .with_message("Registration successful! Welcome aboard."),
        ),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let signed_in = state.auth.login(payload).await?;
    Ok(success_response(signed_in))
}

/// The caller's own account
pub async fn me(user: AuthUser) -> impl IntoResponse {
    success_response(user)
}
