mod common;

use axum::http::{Method, StatusCode};
use common::{amount, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use test_case::test_case;

#[tokio::test]
async fn top_up_adds_exact_amounts() {
    let app = TestApp::new().await;
    let user = app.register_user("Ada", "ada@example.com").await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/wallet", None, Some(&user.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&body["data"]["balance"]), dec!(0));

    for value in ["5.00", "10.00"] {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/v1/wallet/top-up",
                Some(json!({ "amount": value })),
                Some(&user.token),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = app
        .request(Method::GET, "/api/v1/wallet", None, Some(&user.token))
        .await;
    assert_eq!(amount(&body["data"]["balance"]), dec!(15.00));
}

#[tokio::test]
async fn hundred_cent_top_ups_sum_to_one() {
    let app = TestApp::new().await;
    let user = app.register_user("Ada", "ada@example.com").await;

    for _ in 0..100 {
        app.fund_wallet(user.id, dec!(0.01)).await;
    }

    assert_eq!(app.wallet_balance(user.id).await, dec!(1.00));
}

#[test_case("0" ; "zero")]
#[test_case("-5.00" ; "negative")]
#[test_case("0.001" ; "sub cent precision")]
#[tokio::test]
async fn invalid_top_up_is_rejected(value: &str) {
    let app = TestApp::new().await;
    let user = app.register_user("Ada", "ada@example.com").await;
    app.fund_wallet(user.id, dec!(3.00)).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/wallet/top-up",
            Some(json!({ "amount": value })),
            Some(&user.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "validation_error");
    assert_eq!(app.wallet_balance(user.id).await, dec!(3.00));
}

#[tokio::test]
async fn wallet_requires_authentication() {
    let app = TestApp::new().await;
    let (status, _) = app.request(Method::GET, "/api/v1/wallet", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
