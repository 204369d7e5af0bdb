use crate::{
    entities::{
        order::{self, OrderStatus},
        order_item, product, user,
    },
    errors::ServiceError,
    money,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use sea_orm::sea_query::{Alias, Expr};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Read side of orders: customer history and admin listings.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// A customer's orders, newest first
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderDetails>, ServiceError> {
        let orders = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::OrderDate)
            .all(&*self.db)
            .await?;

        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            let lines = load_lines(&*self.db, order.id).await?;
            details.push(OrderDetails::new(order, lines));
        }
        Ok(details)
    }

    /// A single order, visible only to its owner
    #[instrument(skip(self))]
    pub async fn get_for_user(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderDetails, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let lines = load_lines(&*self.db, order.id).await?;
        Ok(OrderDetails::new(order, lines))
    }

    /// Every order, newest first, optionally filtered by status
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderSummary>, ServiceError> {
        let mut query = order::Entity::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        let orders = query
            .order_by_desc(order::Column::OrderDate)
            .all(&*self.db)
            .await?;
        Ok(orders.into_iter().map(OrderSummary::from).collect())
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<OrderSummary>, ServiceError> {
        let orders = order::Entity::find()
            .order_by_desc(order::Column::OrderDate)
            .limit(limit)
            .all(&*self.db)
            .await?;
        Ok(orders.into_iter().map(OrderSummary::from).collect())
    }

    /// Any order with its lines and customer, for the back-office
    #[instrument(skip(self))]
    pub async fn get_admin_details(&self, order_id: Uuid) -> Result<AdminOrderDetails, ServiceError> {
        let (order, customer) = order::Entity::find_by_id(order_id)
            .find_also_related(user::Entity)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let lines = load_lines(&*self.db, order.id).await?;
        Ok(AdminOrderDetails {
            customer: customer.map(|c| OrderCustomer {
                id: c.id,
                name: c.name,
                email: c.email,
            }),
            order: OrderDetails::new(order, lines),
        })
    }

    pub async fn count_orders(&self) -> Result<u64, ServiceError> {
        Ok(order::Entity::find().count(&*self.db).await?)
    }

    /// Sum of grand totals over completed orders
    pub async fn completed_revenue(&self) -> Result<Decimal, ServiceError> {
        #[derive(FromQueryResult)]
        struct Revenue {
            total: Option<i64>,
        }

        let revenue = order::Entity::find()
            .select_only()
            .column_as(
                Expr::col(order::Column::GrandTotalCents)
                    .sum()
                    .cast_as(Alias::new("BIGINT")),
                "total",
            )
            .filter(order::Column::Status.eq(OrderStatus::Completed))
            .into_model::<Revenue>()
            .one(&*self.db)
            .await?
            .and_then(|r| r.total)
            .unwrap_or(0);

        Ok(money::from_cents(revenue))
    }

    /// Order counts per status plus completed revenue
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<OrderStats, ServiceError> {
        let count = |status: OrderStatus| {
            order::Entity::find()
                .filter(order::Column::Status.eq(status))
                .count(&*self.db)
        };

        Ok(OrderStats {
            total: self.count_orders().await?,
            pending: count(OrderStatus::Pending).await?,
            processing: count(OrderStatus::Processing).await?,
            shipped: count(OrderStatus::Shipped).await?,
            completed: count(OrderStatus::Completed).await?,
            cancelled: count(OrderStatus::Cancelled).await?,
            total_revenue: self.completed_revenue().await?,
        })
    }
}

/// Loads an order's lines joined with their products.
pub(crate) async fn load_lines<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<OrderLine>, ServiceError> {
    let rows = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .find_also_related(product::Entity)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(item, product)| OrderLine::new(item, product))
        .collect())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub payment_method: String,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub grand_total: Decimal,
}

impl From<order::Model> for OrderSummary {
    fn from(model: order::Model) -> Self {
        Self {
            subtotal: model.subtotal(),
            shipping_cost: model.shipping_cost(),
            grand_total: model.grand_total(),
            id: model.id,
            user_id: model.user_id,
            order_date: model.order_date,
            status: model.status,
            payment_method: model.payment_method,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    /// Absent only if the product row no longer exists
    pub name: Option<String>,
    pub sku: Option<String>,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub line_total: Decimal,
}

impl OrderLine {
    pub(crate) fn new(item: order_item::Model, product: Option<product::Model>) -> Self {
        Self {
            product_id: item.product_id,
            name: product.as_ref().map(|p| p.name.clone()),
            sku: product.map(|p| p.sku),
            quantity: item.quantity,
            price_at_purchase: item.price_at_purchase(),
            line_total: item.line_total(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: OrderSummary,
    pub items: Vec<OrderLine>,
}

impl OrderDetails {
    pub fn new(order: order::Model, items: Vec<OrderLine>) -> Self {
        Self {
            order: order.into(),
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCustomer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOrderDetails {
    #[serde(flatten)]
    pub order: OrderDetails,
    pub customer: Option<OrderCustomer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderStats {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub shipped: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub total_revenue: Decimal,
}
