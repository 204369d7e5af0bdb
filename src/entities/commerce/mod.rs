/// Commerce entities module
pub mod cart_item;
pub mod product;

pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use product::{Entity as Product, Model as ProductModel, ProductCategory};
