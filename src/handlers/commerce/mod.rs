//! Commerce API handlers.

pub mod carts;
pub mod checkout;
pub mod products;
pub mod wallet;

// Re-export route builders
pub use carts::carts_routes;
pub use checkout::checkout_routes;
pub use products::products_routes;
pub use wallet::wallet_routes;
