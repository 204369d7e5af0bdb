//! Commerce services: catalog, cart, checkout and bulk import.

pub mod cart_service;
pub mod checkout_service;
pub mod pricing_service;
pub mod product_catalog_service;
pub mod product_import_service;
pub mod sku;

// Re-export services for convenience
pub use cart_service::{AddToCartInput, CartService, CartView};
pub use checkout_service::CheckoutService;
pub use pricing_service::{PricingService, Totals, TotalsView};
pub use product_catalog_service::{
    CreateProductInput, ProductCatalogService, ProductView, UpdateProductInput,
};
pub use product_import_service::{ImportReport, ProductImportService};
