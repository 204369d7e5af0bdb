mod common;

use axum::http::{Method, StatusCode};
use common::{amount, TestApp, TEST_PASSWORD};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use storefront_api::entities::user;

#[tokio::test]
async fn registration_returns_token_and_empty_wallet() {
    let app = TestApp::new().await;
    let user = app.register_user("Ada Lovelace", "Ada@Example.com").await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&user.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "ada@example.com");
    assert_eq!(body["data"]["is_admin"], false);
    assert_eq!(app.wallet_balance(user.id).await, dec!(0));

    let (_, body) = app
        .request(Method::GET, "/api/v1/wallet", None, Some(&user.token))
        .await;
    assert_eq!(amount(&body["data"]["balance"]), dec!(0));
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::new().await;
    app.register_user("Ada", "ada@example.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "name": "Impostor",
                "email": "ADA@example.com",
                "password": TEST_PASSWORD,
                "confirm_password": TEST_PASSWORD,
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn mismatched_or_short_passwords_are_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "name": "Ada",
                "email": "ada@example.com",
                "password": TEST_PASSWORD,
                "confirm_password": "something-else",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "name": "Ada",
                "email": "ada@example.com",
                "password": "abc",
                "confirm_password": "abc",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.state.services.users.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn login_uses_one_message_for_every_failure() {
    let app = TestApp::new().await;
    app.register_user("Ada", "ada@example.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "ada@example.com", "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"]["access_token"].is_string());

    let (status, wrong_password) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "ada@example.com", "password": "not-it" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "nobody@example.com", "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["message"], unknown["message"]);
    assert_eq!(unknown["message"], "Invalid email or password");
}

#[tokio::test]
async fn deactivated_account_is_locked_out() {
    let app = TestApp::new().await;
    let ada = app.register_user("Ada", "ada@example.com").await;

    let account = user::Entity::find_by_id(ada.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    let mut account: user::ActiveModel = account.into();
    account.is_active = Set(false);
    account.update(&*app.state.db).await.unwrap();

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "ada@example.com", "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/api/v1/cart", None, Some(&ada.token))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/v1/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app
        .request(Method::POST, "/api/v1/checkout", None, Some("not-a-jwt"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The catalog stays public.
    let (status, _) = app.request(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
}
