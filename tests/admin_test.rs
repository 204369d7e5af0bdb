mod common;

use axum::http::{Method, StatusCode};
use common::{amount, TestApp, TestUser};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use storefront_api::entities::commerce::ProductCategory;

/// Places one order for `buyer` and returns its id.
async fn place_order(app: &TestApp, buyer: &TestUser, product_id: uuid::Uuid) -> String {
    app.add_to_cart(buyer, product_id, 1).await;
    let (status, body) = app
        .request(Method::POST, "/api/v1/checkout", None, Some(&buyer.token))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn set_status(app: &TestApp, admin: &TestUser, order_id: &str, status: &str) -> (StatusCode, Value) {
    app.request(
        Method::PUT,
        &format!("/api/v1/admin/orders/{order_id}/status"),
        Some(json!({ "status": status })),
        Some(&admin.token),
    )
    .await
}

#[tokio::test]
async fn customers_cannot_reach_admin_routes() {
    let app = TestApp::new().await;
    let customer = app.register_user("Ada", "ada@example.com").await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/admin/dashboard", None, Some(&customer.token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = app
        .request(Method::GET, "/api/v1/admin/dashboard", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleting_a_user_removes_their_orders_and_cart() {
    let app = TestApp::new().await;
    let admin = app.create_admin("admin@example.com").await;
    let buyer = app.register_user("Ada", "ada@example.com").await;
    let bystander = app.register_user("Grace", "grace@example.com").await;
    let tote = app
        .seed_product("Tote", ProductCategory::Handbag, dec!(20.00), 10)
        .await;
    app.fund_wallet(buyer.id, dec!(100.00)).await;
    app.fund_wallet(bystander.id, dec!(100.00)).await;
    place_order(&app, &buyer, tote.id).await;
    place_order(&app, &bystander, tote.id).await;
    app.add_to_cart(&buyer, tote.id, 2).await;

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/admin/users/{}", buyer.id),
            None,
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let services = &app.state.services;
    assert!(services.users.find_by_email("ada@example.com").await.unwrap().is_none());
    assert_eq!(services.orders.count_orders().await.unwrap(), 1);
    assert_eq!(app.cart_line_count(buyer.id).await, 0);
    // The deleted account's token is no longer accepted.
    let (status, _) = app
        .request(Method::GET, "/api/v1/cart", None, Some(&buyer.token))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_cannot_delete_themselves() {
    let app = TestApp::new().await;
    let admin = app.create_admin("admin@example.com").await;

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/admin/users/{}", admin.id),
            None,
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("You cannot delete your own account."));
    assert!(app
        .state
        .services
        .users
        .find_by_email("admin@example.com")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn order_status_moves_forward_only() {
    let app = TestApp::new().await;
    let admin = app.create_admin("admin@example.com").await;
    let buyer = app.register_user("Ada", "ada@example.com").await;
    let tote = app
        .seed_product("Tote", ProductCategory::Handbag, dec!(20.00), 10)
        .await;
    app.fund_wallet(buyer.id, dec!(100.00)).await;
    let order_id = place_order(&app, &buyer, tote.id).await;

    let (status, body) = set_status(&app, &admin, &order_id, "shipped").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "shipped");
    assert_eq!(body["message"], "Order status updated to shipped.");

    let (status, body) = set_status(&app, &admin, &order_id, "pending").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_operation");

    let (status, body) = set_status(&app, &admin, &order_id, "lost").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = set_status(&app, &admin, &order_id, "completed").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = set_status(&app, &admin, &order_id, "cancelled").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(
            Method::GET,
            "/api/v1/admin/orders?status=completed",
            None,
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (status, body) = app
        .request(Method::GET, "/api/v1/admin/orders/stats", None, Some(&admin.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed"], 1);
    assert_eq!(amount(&body["data"]["total_revenue"]), dec!(25.00));
}

#[tokio::test]
async fn dashboard_reports_counts_and_revenue() {
    let app = TestApp::new().await;
    let admin = app.create_admin("admin@example.com").await;
    let buyer = app.register_user("Ada", "ada@example.com").await;
    let tote = app
        .seed_product("Tote", ProductCategory::Handbag, dec!(120.00), 10)
        .await;
    app.seed_product("Diver", ProductCategory::Watch, dec!(80.00), 10)
        .await;
    app.fund_wallet(buyer.id, dec!(500.00)).await;
    let order_id = place_order(&app, &buyer, tote.id).await;
    place_order(&app, &buyer, tote.id).await;
    set_status(&app, &admin, &order_id, "completed").await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/admin/dashboard", None, Some(&admin.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let dashboard = &body["data"];
    assert_eq!(dashboard["total_users"], 2);
    assert_eq!(dashboard["total_products"], 2);
    assert_eq!(dashboard["total_orders"], 2);
    // Only completed orders count as revenue.
    assert_eq!(amount(&dashboard["total_revenue"]), dec!(120.00));
    assert_eq!(dashboard["recent_orders"].as_array().map(Vec::len), Some(2));

    let (_, body) = app
        .request(Method::GET, "/api/v1/admin/users/stats", None, Some(&admin.token))
        .await;
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["admins"], 1);

    let (_, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/admin/orders/{order_id}"),
            None,
            Some(&admin.token),
        )
        .await;
    assert_eq!(body["data"]["customer"]["email"], "ada@example.com");
}

#[tokio::test]
async fn products_on_orders_cannot_be_deleted() {
    let app = TestApp::new().await;
    let admin = app.create_admin("admin@example.com").await;
    let buyer = app.register_user("Ada", "ada@example.com").await;
    let sold = app
        .seed_product("Tote", ProductCategory::Handbag, dec!(20.00), 10)
        .await;
    let unsold = app
        .seed_product("Diver", ProductCategory::Watch, dec!(80.00), 10)
        .await;
    app.fund_wallet(buyer.id, dec!(100.00)).await;
    place_order(&app, &buyer, sold.id).await;
    app.add_to_cart(&buyer, unsold.id, 1).await;

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/admin/products/{}", sold.id),
            None,
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/admin/products/{}", unsold.id),
            None,
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.cart_line_count(buyer.id).await, 0);
}

#[tokio::test]
async fn admin_creates_products_with_generated_sku() {
    let app = TestApp::new().await;
    let admin = app.create_admin("admin@example.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/admin/products",
            Some(json!({
                "name": "Heritage",
                "category": "watch",
                "price": "349.00",
                "stock_level": 5,
            })),
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["sku"], "watch_1");
    assert_eq!(body["data"]["in_stock"], true);

    let id = body["data"]["id"].as_str().unwrap().to_string();
    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/v1/admin/products/{id}"),
            Some(json!({ "stock_level": 0 })),
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["in_stock"], false);
    assert_eq!(body["data"]["sku"], "watch_1");
}
