use crate::{
    entities::{
        commerce::{cart_item, product, CartItem, ProductModel},
        order::{self, OrderStatus, PAYMENT_METHOD_WALLET},
        order_item, user,
    },
    errors::ServiceError,
    money,
    services::{
        commerce::pricing_service::PricingService,
        notifications::{ConfirmationLine, Notification, NotificationDispatcher},
        orders::{OrderDetails, OrderLine},
    },
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, DbErr, EntityTrait, QueryFilter, QuerySelect, Select, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Turns a user's cart into a paid order in a single transaction.
///
/// Either every effect lands (wallet debited, order and lines written,
/// stock decremented, cart emptied) or none does. Stock and balance
/// changes are conditional updates, so two checkouts racing for the last
/// units cannot both succeed.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    pricing: PricingService,
    notifications: NotificationDispatcher,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        pricing: PricingService,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            db,
            pricing,
            notifications,
        }
    }

    /// Pays for the user's cart from their wallet.
    ///
    /// # Returns
    ///
    /// * `Ok(OrderDetails)` - The new pending order with its lines
    /// * `Err(ServiceError::EmptyCart)` - Nothing to buy
    /// * `Err(ServiceError::InsufficientStock)` - A line exceeds current stock
    /// * `Err(ServiceError::InsufficientFunds)` - Wallet balance below the grand total
    #[instrument(skip(self))]
    pub async fn checkout(&self, user_id: Uuid) -> Result<OrderDetails, ServiceError> {
        let txn = self.db.begin().await?;
        claim_write_lock(&txn, user_id).await?;

        let mut cart = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .all(&txn)
            .await?;
        if cart.is_empty() {
            return Err(ServiceError::EmptyCart);
        }
        // Fixed lock order across concurrent checkouts.
        cart.sort_by_key(|item| item.product_id);

        let mut purchases: Vec<(cart_item::Model, ProductModel)> = Vec::with_capacity(cart.len());
        for item in cart {
            let product = locked(&txn, product::Entity::find_by_id(item.product_id))
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;
            if item.quantity > product.stock_level {
                return Err(not_enough_stock(&product));
            }
            purchases.push((item, product));
        }

        let totals = self.pricing.calculate_totals(
            purchases
                .iter()
                .map(|(item, product)| (product.price_cents, item.quantity)),
        )?;

        let customer = locked(&txn, user::Entity::find_by_id(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
        if customer.wallet_balance_cents < totals.grand_total_cents {
            return Err(insufficient_funds(
                customer.wallet_balance_cents,
                totals.grand_total_cents,
            ));
        }

        let debited = user::Entity::update_many()
            .col_expr(
                user::Column::WalletBalanceCents,
                Expr::col(user::Column::WalletBalanceCents).sub(totals.grand_total_cents),
            )
            .filter(user::Column::Id.eq(user_id))
            .filter(user::Column::WalletBalanceCents.gte(totals.grand_total_cents))
            .exec(&txn)
            .await?;
        if debited.rows_affected == 0 {
            warn!(user_id = %user_id, "Wallet changed during checkout");
            return Err(insufficient_funds(
                customer.wallet_balance_cents,
                totals.grand_total_cents,
            ));
        }

        let placed = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            order_date: Set(Utc::now()),
            status: Set(OrderStatus::Pending),
            payment_method: Set(PAYMENT_METHOD_WALLET.to_string()),
            subtotal_cents: Set(totals.subtotal_cents),
            shipping_cents: Set(totals.shipping_cents),
            grand_total_cents: Set(totals.grand_total_cents),
        }
        .insert(&txn)
        .await?;

        let mut lines = Vec::with_capacity(purchases.len());
        for (item, product) in &purchases {
            let line = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(placed.id),
                product_id: Set(product.id),
                quantity: Set(item.quantity),
                price_at_purchase_cents: Set(product.price_cents),
            }
            .insert(&txn)
            .await?;

            let decremented = product::Entity::update_many()
                .col_expr(
                    product::Column::StockLevel,
                    Expr::col(product::Column::StockLevel).sub(item.quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(Some(Utc::now())))
                .filter(product::Column::Id.eq(product.id))
                .filter(product::Column::StockLevel.gte(item.quantity))
                .exec(&txn)
                .await?;
            if decremented.rows_affected == 0 {
                warn!(product_id = %product.id, "Stock changed during checkout");
                let current = product::Entity::find_by_id(product.id)
                    .one(&txn)
                    .await?
                    .unwrap_or_else(|| product.clone());
                return Err(not_enough_stock(&current));
            }

            lines.push(OrderLine::new(line, Some(product.clone())));
        }

        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(
            order_id = %placed.id,
            user_id = %user_id,
            grand_total = %placed.grand_total(),
            items = lines.len(),
            "Order placed"
        );

        self.notifications.dispatch(
            &customer.email,
            Notification::OrderConfirmation {
                name: customer.name.clone(),
                order_id: placed.id,
                order_date: placed.order_date,
                payment_method: placed.payment_method.clone(),
                lines: purchases
                    .iter()
                    .map(|(item, product)| ConfirmationLine {
                        name: product.name.clone(),
                        quantity: item.quantity,
                        unit_price: product.price(),
                    })
                    .collect(),
                subtotal: placed.subtotal(),
                shipping: placed.shipping_cost(),
                grand_total: placed.grand_total(),
            },
        );

        Ok(OrderDetails::new(placed, lines))
    }
}

/// Row lock on backends that support `SELECT ... FOR UPDATE`.
///
/// SQLite has no row locks; there [`claim_write_lock`] has already taken the
/// database write lock, so the plain read cannot go stale.
fn locked<E: EntityTrait>(txn: &DatabaseTransaction, query: Select<E>) -> Select<E> {
    match txn.get_database_backend() {
        DbBackend::Postgres | DbBackend::MySql => query.lock_exclusive(),
        DbBackend::Sqlite => query,
    }
}

/// Makes the first statement of a SQLite checkout a write.
///
/// A deferred transaction that reads first and upgrades later fails with
/// `SQLITE_BUSY` when another checkout holds the write lock. Writing up front
/// queues behind the busy timeout instead, like `BEGIN IMMEDIATE`.
async fn claim_write_lock(txn: &DatabaseTransaction, user_id: Uuid) -> Result<(), DbErr> {
    if txn.get_database_backend() != DbBackend::Sqlite {
        return Ok(());
    }
    user::Entity::update_many()
        .col_expr(
            user::Column::WalletBalanceCents,
            Expr::col(user::Column::WalletBalanceCents).into(),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(txn)
        .await?;
    Ok(())
}

fn not_enough_stock(product: &ProductModel) -> ServiceError {
    ServiceError::InsufficientStock(format!(
        "Sorry, not enough stock for {}. Only {} remaining.",
        product.name, product.stock_level
    ))
}

fn insufficient_funds(balance_cents: i64, total_cents: i64) -> ServiceError {
    ServiceError::InsufficientFunds(format!(
        "Insufficient funds. Your wallet balance is {:.2}, but the total is {:.2}. Please top up your wallet.",
        money::from_cents(balance_cents),
        money::from_cents(total_cents)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::commerce::ProductCategory;

    fn product(stock_level: i32) -> ProductModel {
        ProductModel {
            id: Uuid::new_v4(),
            name: "Classic Tote".into(),
            sku: "handbag_1".into(),
            description: None,
            price_cents: 2_000,
            stock_level,
            category: ProductCategory::Handbag,
            image_url: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn stock_message_names_product_and_remaining_units() {
        let err = not_enough_stock(&product(1));
        assert_eq!(
            err.to_string(),
            "Sorry, not enough stock for Classic Tote. Only 1 remaining."
        );
    }

    #[test]
    fn funds_message_reports_balance_and_total() {
        let err = insufficient_funds(5_000, 6_000);
        assert_eq!(
            err.to_string(),
            "Insufficient funds. Your wallet balance is 50.00, but the total is 60.00. Please top up your wallet."
        );
    }
}
