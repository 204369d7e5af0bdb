pub mod admin;
pub mod auth;
pub mod commerce;
pub mod common;
pub mod orders;

use crate::{
    db::DbPool,
    services::{
        commerce::{
            CartService, CheckoutService, PricingService, ProductCatalogService,
            ProductImportService,
        },
        notifications::NotificationDispatcher,
        order_status::OrderStatusService,
        orders::OrderService,
        users::UserService,
        wallet::WalletService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub product_catalog: Arc<ProductCatalogService>,
    pub product_import: Arc<ProductImportService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub wallet: Arc<WalletService>,
    pub orders: Arc<OrderService>,
    pub order_status: Arc<OrderStatusService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, notifications: NotificationDispatcher) -> Self {
        let pricing = PricingService::default();
        Self {
            product_catalog: Arc::new(ProductCatalogService::new(db_pool.clone())),
            product_import: Arc::new(ProductImportService::new(db_pool.clone())),
            cart: Arc::new(CartService::new(db_pool.clone(), pricing)),
            checkout: Arc::new(CheckoutService::new(
                db_pool.clone(),
                pricing,
                notifications,
            )),
            wallet: Arc::new(WalletService::new(db_pool.clone())),
            orders: Arc::new(OrderService::new(db_pool.clone())),
            order_status: Arc::new(OrderStatusService::new(db_pool.clone())),
            users: Arc::new(UserService::new(db_pool)),
        }
    }
}
