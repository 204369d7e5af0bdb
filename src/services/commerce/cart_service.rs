use crate::{
    entities::commerce::{cart_item, product, CartItem, CartItemModel, ProductModel},
    errors::ServiceError,
    services::commerce::pricing_service::{PricingService, TotalsView},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Shopping cart service for a user's not-yet-purchased selections.
///
/// Each user has exactly one implicit cart: the set of `cart_items` rows
/// carrying their id. The service provides:
/// - Adding products (incrementing an existing line)
/// - Setting a line's quantity, removing lines at or below zero
/// - Removing a line or clearing the cart
/// - A priced view using the same totals rule as checkout
///
/// # Examples
///
/// ```ignore
/// use storefront_api::services::commerce::CartService;
///
/// let cart_service = CartService::new(db, PricingService::default());
/// cart_service.add_item(user_id, product_id, 1).await?;
/// let cart = cart_service.get_cart(user_id).await?;
/// println!("Grand total: {}", cart.totals.grand_total);
/// ```
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    pricing: PricingService,
}

impl CartService {
    /// Creates a new `CartService` instance.
    ///
    /// # Arguments
    ///
    /// * `db` - Database connection pool
    /// * `pricing` - Shipping rule shared with checkout
    pub fn new(db: Arc<DatabaseConnection>, pricing: PricingService) -> Self {
        Self { db, pricing }
    }

    /// Adds `quantity` units of a product to the user's cart.
    ///
    /// Increments the existing line for the product if there is one,
    /// otherwise creates it.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Owner of the cart
    /// * `product_id` - Product to add
    /// * `quantity` - Units to add (must be positive)
    ///
    /// # Returns
    ///
    /// * `Ok(CartItemModel)` - The resulting cart line
    /// * `Err(ServiceError::ValidationError)` - Non-positive quantity
    /// * `Err(ServiceError::NotFound)` - Product not found
    /// * `Err(ServiceError::InsufficientStock)` - Line would exceed current stock
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemModel, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let product = product::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let existing_item = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;

        let current_quantity = existing_item.as_ref().map_or(0, |item| item.quantity);
        let new_quantity = current_quantity.checked_add(quantity).ok_or_else(|| {
            ServiceError::ValidationError("Quantity is too large".to_string())
        })?;
        if new_quantity > product.stock_level {
            return Err(ServiceError::InsufficientStock(format!(
                "Sorry, only {} of {} are currently in stock.",
                product.stock_level, product.name
            )));
        }

        let item = match existing_item {
            Some(item) => {
                let mut item: cart_item::ActiveModel = item.into();
                item.quantity = Set(new_quantity);
                item.update(&txn).await?
            }
            None => {
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    product_id: Set(product_id),
                    quantity: Set(new_quantity),
                    added_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?
            }
        };

        txn.commit().await?;

        info!(
            "Added {} x{} to cart of user {}",
            product.name, quantity, user_id
        );
        Ok(item)
    }

    /// Sets the quantity of a cart line.
    ///
    /// Special handling:
    /// - If quantity is 0 or negative, removes the line
    /// - If quantity exceeds current stock, clamps to the stock level and
    ///   returns a warning; a product with no stock is removed
    ///
    /// # Returns
    ///
    /// * `Ok(CartItemUpdate)` - The remaining line (if any) plus an optional warning
    /// * `Err(ServiceError::NotFound)` - The user has no line for this product
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemUpdate, ServiceError> {
        let txn = self.db.begin().await?;

        let (item, product) = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .find_also_related(product::Entity)
            .one(&txn)
            .await?
            .and_then(|(item, product)| product.map(|p| (item, p)))
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} is not in your cart", product_id))
            })?;

        let mut warning = None;
        let target = if quantity > product.stock_level {
            warn!(
                product_id = %product_id,
                requested = quantity,
                available = product.stock_level,
                "Clamping cart quantity to available stock"
            );
            warning = Some(format!(
                "Sorry, only {} of {} are currently in stock.",
                product.stock_level, product.name
            ));
            product.stock_level
        } else {
            quantity
        };

        let item = if target <= 0 {
            CartItem::delete_by_id(item.id).exec(&txn).await?;
            None
        } else {
            let mut active: cart_item::ActiveModel = item.into();
            active.quantity = Set(target);
            Some(active.update(&txn).await?)
        };

        txn.commit().await?;

        Ok(CartItemUpdate { item, warning })
    }

    /// Removes the user's line for a product.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<(), ServiceError> {
        let result = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} is not in your cart",
                product_id
            )));
        }
        Ok(())
    }

    /// Removes every line from the user's cart.
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Number of lines removed
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        info!("Cleared {} line(s) from cart of user {}", result.rows_affected, user_id);
        Ok(result.rows_affected)
    }

    /// Retrieves the user's cart with current prices and totals.
    ///
    /// Totals come from [`PricingService::calculate_totals`], the same
    /// function checkout charges with.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::AddedAt)
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;

        let lines: Vec<CartLine> = rows
            .into_iter()
            .filter_map(|(item, product)| product.map(|p| CartLine::new(item, p)))
            .collect();

        let totals = self
            .pricing
            .calculate_totals(lines.iter().map(|l| (l.unit_price_cents, l.quantity)))?;

        Ok(CartView {
            item_count: lines.iter().map(|l| i64::from(l.quantity)).sum(),
            items: lines,
            totals: totals.into(),
        })
    }
}

/// Outcome of setting a line's quantity
#[derive(Debug, Clone, Serialize)]
pub struct CartItemUpdate {
    pub item: Option<CartItemModel>,
    pub warning: Option<String>,
}

/// Request body for adding to the cart
#[derive(Debug, Clone, Deserialize)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    pub quantity: Option<i32>,
}

/// One priced cart line
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub stock_level: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    #[serde(skip)]
    unit_price_cents: i64,
}

impl CartLine {
    fn new(item: CartItemModel, product: ProductModel) -> Self {
        Self {
            product_id: product.id,
            unit_price: product.price(),
            line_total: product.price() * Decimal::from(item.quantity),
            unit_price_cents: product.price_cents,
            name: product.name,
            sku: product.sku,
            image_url: product.image_url,
            stock_level: product.stock_level,
            quantity: item.quantity,
        }
    }
}

/// The user's cart with a totals preview
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub item_count: i64,
    pub totals: TotalsView,
}
