pub mod commerce;
pub mod order;
pub mod order_item;
pub mod user;

pub use commerce::{cart_item, product};
