// Storefront domain services
pub mod commerce;
pub mod orders;
pub mod users;
pub mod wallet;

// Admin-driven status changes
pub mod order_status;

// Customer messaging
pub mod notifications;
