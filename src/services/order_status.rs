use std::{str::FromStr, sync::Arc};

use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, TransactionTrait};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::order::{self, OrderStatus},
    errors::ServiceError,
    services::orders::OrderSummary,
};

/// Back-office status changes for placed orders.
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
}

impl OrderStatusService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Moves an order to `raw_status`, parsed case-insensitively.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        raw_status: &str,
    ) -> Result<OrderSummary, ServiceError> {
        let new_status = parse_status(raw_status)?;

        let txn = self.db.begin().await?;
        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        if old_status == new_status {
            return Ok(order.into());
        }
        if !is_valid_transition(old_status, new_status) {
            warn!(%old_status, %new_status, "Rejected order status transition");
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot transition from status '{}' to '{}'",
                old_status, new_status
            )));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status);
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            "Order {} status updated from '{}' to '{}'",
            order_id, old_status, new_status
        );
        Ok(updated.into())
    }
}

/// Parses a status name, ignoring case and surrounding whitespace.
pub fn parse_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    OrderStatus::from_str(raw.trim())
        .map_err(|_| ServiceError::ValidationError("Invalid status".to_string()))
}

/// Forward moves along pending, processing, shipped, completed may skip
/// steps; any non-terminal order may be cancelled. Re-setting the current
/// status is always allowed.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    if from == to {
        return true;
    }
    match (rank(from), to) {
        (None, _) => false,
        (Some(_), OrderStatus::Cancelled) => from != OrderStatus::Completed,
        (Some(current), target) => rank(target).is_some_and(|next| next > current),
    }
}

/// Position on the fulfilment path; `None` for cancelled.
fn rank(status: OrderStatus) -> Option<u8> {
    match status {
        OrderStatus::Pending => Some(0),
        OrderStatus::Processing => Some(1),
        OrderStatus::Shipped => Some(2),
        OrderStatus::Completed => Some(3),
        OrderStatus::Cancelled => None,
    }
}
