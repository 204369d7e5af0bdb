use crate::{entities::user, errors::ServiceError, money};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Smallest accepted top-up, in cents.
pub const MIN_TOP_UP_CENTS: i64 = 1;

/// Stored-value balance each user pays checkouts from.
#[derive(Clone)]
pub struct WalletService {
    db: Arc<DatabaseConnection>,
}

impl WalletService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn balance(&self, user_id: Uuid) -> Result<Decimal, ServiceError> {
        let account = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
        Ok(account.wallet_balance())
    }

    /// Adds funds to the wallet and returns the new balance.
    ///
    /// The increment is applied in SQL, so concurrent top-ups never lose
    /// each other's credit.
    #[instrument(skip(self))]
    pub async fn top_up(&self, user_id: Uuid, amount: Decimal) -> Result<Decimal, ServiceError> {
        let cents = money::to_cents(amount)?;
        if cents < MIN_TOP_UP_CENTS {
            return Err(ServiceError::ValidationError(
                "Top-up amount must be at least 0.01".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let credited = user::Entity::update_many()
            .col_expr(
                user::Column::WalletBalanceCents,
                Expr::col(user::Column::WalletBalanceCents).add(cents),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec(&txn)
            .await?;
        if credited.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("User {} not found", user_id)));
        }

        let account = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
        txn.commit().await?;

        info!(user_id = %user_id, amount = %money::from_cents(cents), "Wallet topped up");
        Ok(account.wallet_balance())
    }
}

/// Request body for a top-up
#[derive(Debug, Clone, Deserialize)]
pub struct TopUpInput {
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletView {
    pub balance: Decimal,
}
