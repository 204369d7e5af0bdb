mod common;

use axum::http::{Method, StatusCode};
use common::{amount, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::entities::commerce::ProductCategory;

#[tokio::test]
async fn adding_same_product_accumulates_quantity() {
    let app = TestApp::new().await;
    let user = app.register_user("Ada", "ada@example.com").await;
    let tote = app
        .seed_product("Tote", ProductCategory::Handbag, dec!(12.50), 5)
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": tote.id })),
            Some(&user.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Item added to your cart.");
    assert_eq!(body["data"]["items"][0]["quantity"], 1);

    app.add_to_cart(&user, tote.id, 2).await;

    let (_, body) = app
        .request(Method::GET, "/api/v1/cart", None, Some(&user.token))
        .await;
    let cart = &body["data"];
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(cart["item_count"], 3);
    assert_eq!(amount(&cart["items"][0]["line_total"]), dec!(37.50));
    assert_eq!(amount(&cart["totals"]["subtotal"]), dec!(37.50));
    assert_eq!(amount(&cart["totals"]["shipping"]), dec!(5.00));
    assert_eq!(amount(&cart["totals"]["grand_total"]), dec!(42.50));
}

#[tokio::test]
async fn adding_beyond_stock_is_refused() {
    let app = TestApp::new().await;
    let user = app.register_user("Ada", "ada@example.com").await;
    let tote = app
        .seed_product("Tote", ProductCategory::Handbag, dec!(12.50), 2)
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": tote.id, "quantity": 3 })),
            Some(&user.token),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(app.cart_line_count(user.id).await, 0);
}

#[tokio::test]
async fn quantity_update_clamps_to_stock_and_zero_removes() {
    let app = TestApp::new().await;
    let user = app.register_user("Ada", "ada@example.com").await;
    let watch = app
        .seed_product("Diver", ProductCategory::Watch, dec!(99.00), 3)
        .await;
    app.add_to_cart(&user, watch.id, 1).await;

    let uri = format!("/api/v1/cart/items/{}", watch.id);
    let (status, body) = app
        .request(Method::PUT, &uri, Some(json!({ "quantity": 10 })), Some(&user.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Sorry, only 3 of Diver are currently in stock.");
    assert_eq!(body["data"]["items"][0]["quantity"], 3);
    // 297.00 crosses the free-shipping threshold.
    assert_eq!(amount(&body["data"]["totals"]["shipping"]), dec!(0));

    let (status, body) = app
        .request(Method::PUT, &uri, Some(json!({ "quantity": 0 })), Some(&user.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"], json!([]));
    assert_eq!(amount(&body["data"]["totals"]["grand_total"]), dec!(0));
}

#[tokio::test]
async fn removing_absent_line_is_not_found() {
    let app = TestApp::new().await;
    let user = app.register_user("Ada", "ada@example.com").await;
    let tote = app
        .seed_product("Tote", ProductCategory::Handbag, dec!(12.50), 2)
        .await;

    let uri = format!("/api/v1/cart/items/{}", tote.id);
    let (status, _) = app
        .request(Method::DELETE, &uri, None, Some(&user.token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.add_to_cart(&user, tote.id, 1).await;
    let (status, body) = app
        .request(Method::DELETE, &uri, None, Some(&user.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Item removed from your cart.");
}

#[tokio::test]
async fn clearing_only_touches_own_cart() {
    let app = TestApp::new().await;
    let ada = app.register_user("Ada", "ada@example.com").await;
    let grace = app.register_user("Grace", "grace@example.com").await;
    let tote = app
        .seed_product("Tote", ProductCategory::Handbag, dec!(12.50), 10)
        .await;
    let watch = app
        .seed_product("Diver", ProductCategory::Watch, dec!(99.00), 10)
        .await;
    app.add_to_cart(&ada, tote.id, 1).await;
    app.add_to_cart(&ada, watch.id, 1).await;
    app.add_to_cart(&grace, tote.id, 4).await;

    let (status, body) = app
        .request(Method::DELETE, "/api/v1/cart", None, Some(&ada.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], 2);

    assert_eq!(app.cart_line_count(ada.id).await, 0);
    assert_eq!(app.cart_line_count(grace.id).await, 1);
}

#[tokio::test]
async fn unknown_product_cannot_be_added() {
    let app = TestApp::new().await;
    let user = app.register_user("Ada", "ada@example.com").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": uuid::Uuid::new_v4(), "quantity": 1 })),
            Some(&user.token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
